//! Periodic clock driver.

use crate::tournament::manager::{TickReport, TournamentManager};
use std::time::Duration;
use tokio::{
    sync::{oneshot, watch},
    task::JoinHandle,
    time::MissedTickBehavior,
};

/// Default tick period
pub const DEFAULT_TICK: Duration = Duration::from_secs(5);

/// Handle on a running scheduler. Dropping the handle stops the task after
/// the current pass; [`ClockScheduler::shutdown`] also waits for it.
pub struct ClockScheduler {
    stop: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
    reports: watch::Receiver<TickReport>,
}

impl ClockScheduler {
    /// Spawn the recurring `tick_all` job
    pub fn spawn(manager: TournamentManager, period: Duration) -> Self {
        let (stop_tx, mut stop_rx) = oneshot::channel();
        let (report_tx, reports) = watch::channel(TickReport::default());

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            log::info!("Clock scheduler started, period {:?}", period);

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = interval.tick() => {
                        match manager.tick_all().await {
                            Ok(report) => {
                                if report.advanced + report.finished + report.failed > 0 {
                                    log::debug!("Clock pass: {:?}", report);
                                }
                                let _ = report_tx.send(report);
                            }
                            Err(e) => log::warn!("Clock pass failed: {}", e),
                        }
                    }
                }
            }

            log::info!("Clock scheduler stopped");
        });

        Self {
            stop: Some(stop_tx),
            handle,
            reports,
        }
    }

    /// Report of the most recent pass
    pub fn last_report(&self) -> TickReport {
        *self.reports.borrow()
    }

    /// Follow pass reports as they come in
    pub fn reports(&self) -> watch::Receiver<TickReport> {
        self.reports.clone()
    }

    /// Stop after the pass in flight, if any, and wait for the task
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Err(e) = (&mut self.handle).await {
            log::warn!("Clock scheduler task ended abnormally: {}", e);
        }
    }
}
