//! Alert Poller
//!
//! A single worker thread drives every poll cycle. Scheduled ticks and manual
//! "check now" requests arrive on the same command channel, so two cycles can
//! never overlap and the seen set has exactly one writer.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{info, warn};

use crate::alert::Alert;
use crate::backend::BackendClient;
use crate::config::Config;
use crate::logger::AlertLogRecord;
use crate::notifier;
use crate::seen::SeenAlerts;

/// Commands accepted by the poller thread.
pub enum PollCommand {
    /// Run a cycle immediately (tray "Check for Alerts Now").
    CheckNow,
    Shutdown,
}

/// Cloneable handle for the tray controller and the shutdown path.
#[derive(Clone)]
pub struct PollerHandle {
    commands: Sender<PollCommand>,
    last_check: Arc<Mutex<Option<DateTime<Local>>>>,
}

impl PollerHandle {
    pub fn check_now(&self) {
        if self.commands.try_send(PollCommand::CheckNow).is_err() {
            warn!("Poller is not accepting commands");
        }
    }

    pub fn shutdown(&self) {
        let _ = self.commands.send(PollCommand::Shutdown);
    }

    /// Wall-clock time of the most recent successful poll. Advisory.
    pub fn last_check(&self) -> Option<DateTime<Local>> {
        *self.last_check.lock()
    }
}

/// Starts the poller thread. The returned join handle outlives the tray loop
/// and is joined on shutdown.
pub fn start(
    config: Arc<Config>,
    alert_log: Sender<AlertLogRecord>,
) -> Result<(PollerHandle, JoinHandle<()>)> {
    let (tx, rx) = bounded::<PollCommand>(8);
    let last_check = Arc::new(Mutex::new(None));

    let mut poller = Poller::new(config, alert_log, last_check.clone())?;
    let join = thread::spawn(move || {
        poller.run(rx);
    });

    Ok((
        PollerHandle {
            commands: tx,
            last_check,
        },
        join,
    ))
}

struct Poller {
    backend: BackendClient,
    seen: SeenAlerts,
    config: Arc<Config>,
    alert_log: Sender<AlertLogRecord>,
    last_check: Arc<Mutex<Option<DateTime<Local>>>>,
}

impl Poller {
    fn new(
        config: Arc<Config>,
        alert_log: Sender<AlertLogRecord>,
        last_check: Arc<Mutex<Option<DateTime<Local>>>>,
    ) -> Result<Self> {
        let backend = BackendClient::new(config.suspicious_events_url())
            .context("could not build backend client")?;

        Ok(Self {
            backend,
            seen: SeenAlerts::new(),
            config,
            alert_log,
            last_check,
        })
    }

    fn run(&mut self, rx: crossbeam_channel::Receiver<PollCommand>) {
        let interval = self.config.check_interval();
        info!(
            "Poller started ({}s interval, backend: {})",
            interval.as_secs(),
            self.config.backend_url
        );

        loop {
            match rx.recv_timeout(interval) {
                Ok(PollCommand::CheckNow) => {
                    info!("Manual alert check requested");
                    self.run_cycle();
                }
                Ok(PollCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => self.run_cycle(),
            }
        }

        info!("Poller ended ({} identities tracked)", self.seen.len());
    }

    /// One fetch-and-process cycle. Never panics; a failed fetch is logged
    /// and the loop simply waits for the next tick.
    fn run_cycle(&mut self) {
        match self.backend.fetch_suspicious() {
            Ok(alerts) => {
                for alert in filter_new(&alerts, &mut self.seen) {
                    warn!(
                        "New suspicious activity: {} (PID {})",
                        alert.process_name(),
                        alert.process_id
                    );
                    notifier::show_alert(&self.config, alert);
                    let _ = self.alert_log.try_send(AlertLogRecord::new(alert));
                }
                *self.last_check.lock() = Some(Local::now());
            }
            Err(e) => warn!("Alert check failed: {}", e),
        }
    }
}

/// Filters a fetched batch down to unseen alerts, recording their identities.
/// Backend order is preserved.
fn filter_new<'a>(alerts: &'a [Alert], seen: &mut SeenAlerts) -> Vec<&'a Alert> {
    alerts
        .iter()
        .filter(|alert| seen.insert(&alert.key()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(process_id: u32, timestamp: &str) -> Alert {
        Alert {
            process_id,
            timestamp: timestamp.into(),
            executable_path: r"C:\Windows\System32\certutil.exe".into(),
            ..Default::default()
        }
    }

    #[test]
    fn repeated_batches_notify_at_most_once() {
        let mut seen = SeenAlerts::new();
        let batch = vec![alert(1234, "t1")];

        assert_eq!(filter_new(&batch, &mut seen).len(), 1);
        // Identical second poll response: zero further notifications.
        assert_eq!(filter_new(&batch, &mut seen).len(), 0);
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn distinct_timestamps_are_separate_alerts() {
        let mut seen = SeenAlerts::new();
        let batch = vec![alert(1234, "t1"), alert(1234, "t2")];

        let fresh = filter_new(&batch, &mut seen);
        assert_eq!(fresh.len(), 2);
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn backend_order_is_preserved_within_a_batch() {
        let mut seen = SeenAlerts::new();
        let batch = vec![alert(3, "t1"), alert(1, "t1"), alert(2, "t1")];

        let fresh = filter_new(&batch, &mut seen);
        let pids: Vec<u32> = fresh.iter().map(|a| a.process_id).collect();
        assert_eq!(pids, vec![3, 1, 2]);
    }

    #[test]
    fn force_check_after_scheduled_check_adds_nothing() {
        let mut seen = SeenAlerts::new();
        let batch = vec![alert(1, "t1"), alert(2, "t1")];

        // Scheduled cycle, then an immediate manual cycle with the same data.
        filter_new(&batch, &mut seen);
        let fresh = filter_new(&batch, &mut seen);

        assert!(fresh.is_empty());
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn failed_cycle_does_not_advance_last_check() {
        let config = Arc::new(Config {
            // Port 0 is never connectable.
            backend_url: "http://127.0.0.1:0/api".into(),
            ..Default::default()
        });
        let (log_tx, _log_rx) = bounded(4);
        let last_check = Arc::new(Mutex::new(None));
        let mut poller = Poller::new(config, log_tx, last_check.clone()).unwrap();

        poller.run_cycle();

        assert!(last_check.lock().is_none());
        assert_eq!(poller.seen.len(), 0);
    }
}
