//! Session summary reporting.
//!
//! Summaries are handed to a background reporter thread over a crossbeam
//! channel so that a slow or failing endpoint never blocks a frame or a
//! session command. The thread tries the [`SummaryEndpoint`] first and falls
//! back to appending one JSON line per summary to a [`LocalSummaryLog`].
//!
//! Create the reporter once with [`SessionReporter::spawn`]; dropping it (or
//! calling [`SessionReporter::shutdown`]) drains the queue and joins the
//! thread.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use std::time::{SystemTime, UNIX_EPOCH};

use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::errors::ReportError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStatus {
    Started,
    Ended,
}

/// Record sent to the persistence collaborator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub user_id: String,
    pub status: SummaryStatus,
    pub coins_collected: u32,
    /// Metres.
    pub distance: f64,
    /// kWh.
    pub energy: f64,
    /// Seconds.
    pub duration: f64,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

/// Milliseconds since the Unix epoch, 0 if the clock is before it.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Remote persistence API.
pub trait SummaryEndpoint: Send {
    fn send(&mut self, summary: &SessionSummary) -> Result<(), ReportError>;
}

/// Append-only JSON-lines file of summaries that could not be delivered.
#[derive(Clone, Debug)]
pub struct LocalSummaryLog {
    path: PathBuf,
}

impl LocalSummaryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, summary: &SessionSummary) -> Result<(), ReportError> {
        let mut line = serde_json::to_vec(summary)?;
        line.push(b'\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(&line)?;
        Ok(())
    }

    /// Every summary in the log, oldest first. Unparseable lines are skipped.
    pub fn read_all(&self) -> Result<Vec<SessionSummary>, ReportError> {
        let file = std::fs::File::open(&self.path)?;
        let mut out = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            match serde_json::from_str(&line) {
                Ok(summary) => out.push(summary),
                Err(e) => warn!("Skipping malformed summary line: {}", e),
            }
        }
        Ok(out)
    }
}

/// What happened to one submitted summary.
#[derive(Clone, Debug, PartialEq)]
pub enum ReportOutcome {
    Delivered(SummaryStatus),
    StoredLocally(SummaryStatus),
    Lost { status: SummaryStatus, error: String },
}

enum ReportCmd {
    Submit(SessionSummary),
    Shutdown,
}

/// Handle to the background reporter thread.
pub struct SessionReporter {
    tx_cmd: Sender<ReportCmd>,
    rx_outcome: Receiver<ReportOutcome>,
    handle: Option<JoinHandle<()>>,
}

impl SessionReporter {
    /// Spawn the reporter thread. With no endpoint every summary goes to the
    /// local log.
    pub fn spawn(endpoint: Option<Box<dyn SummaryEndpoint>>, local: LocalSummaryLog) -> Self {
        let (tx_cmd, rx_cmd) = unbounded::<ReportCmd>();
        let (tx_outcome, rx_outcome) = unbounded::<ReportOutcome>();
        let handle =
            std::thread::spawn(move || reporter_thread(rx_cmd, tx_outcome, endpoint, local));
        Self {
            tx_cmd,
            rx_outcome,
            handle: Some(handle),
        }
    }

    /// Queue a summary. Never blocks.
    pub fn submit(&self, summary: SessionSummary) {
        if self.tx_cmd.send(ReportCmd::Submit(summary)).is_err() {
            warn!("Reporter thread is gone, summary dropped");
        }
    }

    /// Outcomes reported since the last call.
    pub fn outcomes(&self) -> Vec<ReportOutcome> {
        self.rx_outcome.try_iter().collect()
    }

    /// Process everything queued, then stop and join the thread.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.tx_cmd.send(ReportCmd::Shutdown);
            let _ = handle.join();
        }
    }
}

impl Drop for SessionReporter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn reporter_thread(
    rx_cmd: Receiver<ReportCmd>,
    tx_outcome: Sender<ReportOutcome>,
    mut endpoint: Option<Box<dyn SummaryEndpoint>>,
    local: LocalSummaryLog,
) {
    debug!(
        "Reporter thread starting (id={:?})",
        std::thread::current().id()
    );
    for cmd in rx_cmd.iter() {
        let summary = match cmd {
            ReportCmd::Submit(summary) => summary,
            ReportCmd::Shutdown => break,
        };
        let status = summary.status;
        let outcome = match endpoint.as_mut().map(|e| e.send(&summary)) {
            Some(Ok(())) => {
                info!("Session summary ({:?}) delivered", status);
                ReportOutcome::Delivered(status)
            }
            delivery => {
                if let Some(Err(e)) = delivery {
                    warn!("Summary endpoint failed, writing locally: {}", e);
                }
                match local.append(&summary) {
                    Ok(()) => {
                        info!(
                            "Session summary ({:?}) stored in {:?}",
                            status,
                            local.path()
                        );
                        ReportOutcome::StoredLocally(status)
                    }
                    Err(e) => {
                        warn!("Session summary ({:?}) lost: {}", status, e);
                        ReportOutcome::Lost {
                            status,
                            error: e.to_string(),
                        }
                    }
                }
            }
        };
        let _ = tx_outcome.send(outcome);
    }
    debug!("Reporter thread exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn summary(status: SummaryStatus) -> SessionSummary {
        SessionSummary {
            user_id: "u1".into(),
            status,
            coins_collected: 3,
            distance: 12.5,
            energy: 0.3,
            duration: 42.0,
            timestamp: 1_700_000_000_000,
        }
    }

    struct Recording(Arc<Mutex<Vec<SessionSummary>>>);

    impl SummaryEndpoint for Recording {
        fn send(&mut self, summary: &SessionSummary) -> Result<(), ReportError> {
            self.0.lock().unwrap().push(summary.clone());
            Ok(())
        }
    }

    struct Offline;

    impl SummaryEndpoint for Offline {
        fn send(&mut self, _summary: &SessionSummary) -> Result<(), ReportError> {
            Err(ReportError::Endpoint("network unreachable".into()))
        }
    }

    #[test]
    fn test_summary_json_uses_camel_case() {
        let json = serde_json::to_value(summary(SummaryStatus::Ended)).unwrap();
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["status"], "ended");
        assert_eq!(json["coinsCollected"], 3);
    }

    #[test]
    fn test_endpoint_receives_summaries() {
        let dir = tempfile::tempdir().unwrap();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let mut reporter = SessionReporter::spawn(
            Some(Box::new(Recording(sent.clone()))),
            LocalSummaryLog::new(dir.path().join("log.jsonl")),
        );
        reporter.submit(summary(SummaryStatus::Started));
        reporter.submit(summary(SummaryStatus::Ended));
        reporter.shutdown();
        assert_eq!(sent.lock().unwrap().len(), 2);
        assert_eq!(
            reporter.outcomes(),
            vec![
                ReportOutcome::Delivered(SummaryStatus::Started),
                ReportOutcome::Delivered(SummaryStatus::Ended)
            ]
        );
        assert!(!dir.path().join("log.jsonl").exists());
    }

    #[test]
    fn test_failed_endpoint_falls_back_to_local_log() {
        let dir = tempfile::tempdir().unwrap();
        let log = LocalSummaryLog::new(dir.path().join("log.jsonl"));
        let mut reporter = SessionReporter::spawn(Some(Box::new(Offline)), log.clone());
        reporter.submit(summary(SummaryStatus::Ended));
        reporter.shutdown();
        assert_eq!(
            reporter.outcomes(),
            vec![ReportOutcome::StoredLocally(SummaryStatus::Ended)]
        );
        assert_eq!(log.read_all().unwrap(), vec![summary(SummaryStatus::Ended)]);
    }

    #[test]
    fn test_unwritable_log_loses_summary_without_panicking() {
        let dir = tempfile::tempdir().unwrap();
        let log = LocalSummaryLog::new(dir.path().join("missing").join("log.jsonl"));
        let mut reporter = SessionReporter::spawn(None, log);
        reporter.submit(summary(SummaryStatus::Started));
        reporter.shutdown();
        assert!(matches!(
            reporter.outcomes().as_slice(),
            [ReportOutcome::Lost {
                status: SummaryStatus::Started,
                ..
            }]
        ));
    }
}
