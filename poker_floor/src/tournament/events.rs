//! Events published to tournament watchers.

use super::{
    clock::ClockView,
    models::{PlayerId, TableId, Tournament},
    players::LeaderboardEntry,
    rebalance::RebalanceInstruction,
    seating::Seating,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Full aggregate plus the derived clock view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentSnapshot {
    #[serde(flatten)]
    pub tournament: Tournament,
    pub clock_view: Option<ClockView>,
}

impl TournamentSnapshot {
    pub fn at(tournament: &Tournament, now: DateTime<Utc>) -> Self {
        Self {
            clock_view: tournament.clock_view(now),
            tournament: tournament.clone(),
        }
    }
}

/// Wire events, `{"event": "...", "payload": ...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum TournamentEvent {
    TournamentStateUpdated(Box<TournamentSnapshot>),
    BlindsUp { level: usize },
    PlayerEliminated { player_id: PlayerId },
    PlayerRebought { player_id: PlayerId },
    RebalancingNeeded(RebalanceInstruction),
    LeaderboardUpdated(Vec<LeaderboardEntry>),
    PlayerTableChange {
        pseudo: String,
        table: TableId,
        seat: u32,
    },
    TableRedistributed { table_id: TableId },
    FinalTableRedistributed { table_id: TableId },
}

impl TournamentEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TournamentEvent::TournamentStateUpdated(_) => "tournamentStateUpdated",
            TournamentEvent::BlindsUp { .. } => "blindsUp",
            TournamentEvent::PlayerEliminated { .. } => "playerEliminated",
            TournamentEvent::PlayerRebought { .. } => "playerRebought",
            TournamentEvent::RebalancingNeeded(_) => "rebalancingNeeded",
            TournamentEvent::LeaderboardUpdated(_) => "leaderboardUpdated",
            TournamentEvent::PlayerTableChange { .. } => "playerTableChange",
            TournamentEvent::TableRedistributed { .. } => "tableRedistributed",
            TournamentEvent::FinalTableRedistributed { .. } => "finalTableRedistributed",
        }
    }
}

impl From<&Seating> for TournamentEvent {
    fn from(seating: &Seating) -> Self {
        TournamentEvent::PlayerTableChange {
            pseudo: seating.pseudo.clone(),
            table: seating.table_id,
            seat: seating.seat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::models::TournamentConfig;

    #[test]
    fn test_event_wire_shape() {
        let json = serde_json::to_value(TournamentEvent::BlindsUp { level: 3 }).unwrap();
        assert_eq!(json["event"], "blindsUp");
        assert_eq!(json["payload"]["level"], 3);

        let json = serde_json::to_value(TournamentEvent::PlayerEliminated { player_id: 9 }).unwrap();
        assert_eq!(json["event"], "playerEliminated");
    }

    #[test]
    fn test_name_matches_tag() {
        let events = vec![
            TournamentEvent::TableRedistributed { table_id: 2 },
            TournamentEvent::LeaderboardUpdated(Vec::new()),
            TournamentEvent::PlayerTableChange {
                pseudo: "ann".to_string(),
                table: 1,
                seat: 3,
            },
        ];
        for event in events {
            let json = serde_json::to_value(&event).unwrap();
            assert_eq!(json["event"], event.name());
        }
    }

    #[test]
    fn test_snapshot_flattens_aggregate() {
        let config = TournamentConfig::standard("Snap".to_string(), 2, 9);
        let mut t = Tournament::new("SNAP0001".to_string(), config, Utc::now());
        t.start(Utc::now()).unwrap();
        let snapshot = TournamentSnapshot::at(&t, Utc::now());
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["code"], "SNAP0001");
        assert_eq!(json["state"], "running");
        assert_eq!(json["clock_view"]["current_level"], 0);

        let back: TournamentSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back.tournament, t);
    }
}
