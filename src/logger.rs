//! Logging System
//!
//! tracing setup (console or rolling file) plus a channel-fed worker that
//! appends every notified alert to a session log file.

use anyhow::Result;
use chrono::{DateTime, Local};
use crossbeam_channel::Receiver;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::alert::Alert;

/// Log directory (next to the EXE)
fn get_log_dir() -> PathBuf {
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            return exe_dir.join("logs");
        }
    }
    PathBuf::from(".").join("logs")
}

/// Initializes the console logger
pub fn init_console_logger() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).compact())
        .with(filter)
        .init();

    Ok(())
}

/// Initializes the file logger (app.log for debug messages)
pub fn init_file_logger() -> Result<()> {
    let log_dir = get_log_dir();
    fs::create_dir_all(&log_dir)?;

    // Clean up old app.log files (keep only 2)
    cleanup_old_logs(&log_dir, 2, "app.log");

    let file_appender = tracing_appender::rolling::daily(&log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Guard must stay alive - we intentionally leak it for app lifetime
    Box::leak(Box::new(_guard));

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(non_blocking).with_target(false))
        .with(filter)
        .init();

    Ok(())
}

/// One notified alert, as written to the session alert log.
#[derive(Debug, Clone)]
pub struct AlertLogRecord {
    pub notified_at: DateTime<Local>,
    pub key: String,
    pub process_name: String,
    pub process_id: u32,
    pub executable_path: String,
    pub command_line: String,
    pub reason: String,
}

impl AlertLogRecord {
    pub fn new(alert: &Alert) -> Self {
        Self {
            notified_at: Local::now(),
            key: alert.key(),
            process_name: alert.process_name().to_string(),
            process_id: alert.process_id,
            executable_path: alert.executable_path.clone(),
            command_line: alert.command_line.clone(),
            reason: alert.reason_text(),
        }
    }

    /// Formats the record for file output
    pub fn format_file(&self) -> String {
        let mut output = String::with_capacity(256);

        output.push_str(
            "────────────────────────────────────────────────────────────────────────────────\n",
        );
        output.push_str(&format!(
            "[{}] ══ LOLBIN ALERT ══\n",
            self.notified_at.format("%Y-%m-%d %H:%M:%S%.3f")
        ));
        output.push_str(&format!(
            "  Process:     {} (PID: {})\n",
            self.process_name, self.process_id
        ));
        output.push_str(&format!("  Path:        {}\n", self.executable_path));
        output.push_str(&format!("  Reason:      {}\n", self.reason));
        if !self.command_line.is_empty() {
            output.push_str(&format!("  Command:     {}\n", self.command_line));
        }
        output.push_str(&format!("  Alert ID:    {}\n", self.key));

        output
    }
}

/// Deletes old log files with specific prefix, keeps only the newest N
fn cleanup_old_logs(log_dir: &PathBuf, keep_count: usize, prefix: &str) {
    if let Ok(entries) = fs::read_dir(log_dir) {
        let mut log_files: Vec<_> = entries
            .filter_map(|e| e.ok())
            .filter(|e| {
                let path = e.path();
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    name.starts_with(prefix)
                } else {
                    false
                }
            })
            .collect();

        // Sort by modification time (newest first)
        log_files.sort_by(|a, b| {
            let time_a = a.metadata().and_then(|m| m.modified()).ok();
            let time_b = b.metadata().and_then(|m| m.modified()).ok();
            time_b.cmp(&time_a)
        });

        for old_file in log_files.iter().skip(keep_count) {
            if let Err(e) = fs::remove_file(old_file.path()) {
                error!("Could not delete old log file: {}", e);
            }
        }
    }
}

/// Alert log worker thread
pub fn alert_log_worker(receiver: Receiver<AlertLogRecord>) {
    info!("Alert log worker started");

    let log_dir = get_log_dir();
    if let Err(e) = fs::create_dir_all(&log_dir) {
        error!("Could not create log directory: {}", e);
        return;
    }

    // Clean up old alert logs (keep only 2)
    cleanup_old_logs(&log_dir, 2, "alerts_");

    let log_file_path = log_dir.join(format!(
        "alerts_{}.log",
        Local::now().format("%Y-%m-%d_%H-%M-%S")
    ));

    let file = match OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file_path)
    {
        Ok(f) => f,
        Err(e) => {
            error!("Could not open alert log: {}", e);
            return;
        }
    };

    let mut writer = BufWriter::new(file);

    let header = format!(
        "════════════════════════════════════════════════════════════════════════════════\n\
         LOLBin Monitor alert log started: {}\n\
         Computer: {}\n\
         User: {}\n\
         ════════════════════════════════════════════════════════════════════════════════\n\n",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_default(),
        std::env::var("USERNAME")
            .or_else(|_| std::env::var("USER"))
            .unwrap_or_default()
    );

    if let Err(e) = writer.write_all(header.as_bytes()) {
        error!("Error writing header: {}", e);
    }
    let _ = writer.flush();

    info!("Alert log: {}", log_file_path.display());

    // Alerts are rare; flush after every record so nothing is lost on kill.
    let mut record_count = 0u64;
    while let Ok(record) = receiver.recv() {
        if let Err(e) = writer.write_all(record.format_file().as_bytes()) {
            error!("Error writing alert record: {}", e);
        }
        let _ = writer.flush();
        record_count += 1;
    }

    let footer = format!(
        "\n════════════════════════════════════════════════════════════════════════════════\n\
         LOLBin Monitor alert log ended: {}\n\
         Total alerts: {}\n\
         ════════════════════════════════════════════════════════════════════════════════\n",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        record_count
    );

    let _ = writer.write_all(footer.as_bytes());
    let _ = writer.flush();

    info!("Alert log worker ended ({} alerts)", record_count);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_format_carries_the_alert_fields() {
        let alert = Alert {
            process_id: 1234,
            executable_path: r"C:\Windows\System32\certutil.exe".into(),
            command_line: "certutil -urlcache".into(),
            reason: "Suspicious certutil execution".into(),
            timestamp: "t1".into(),
        };
        let formatted = AlertLogRecord::new(&alert).format_file();

        assert!(formatted.contains("certutil.exe (PID: 1234)"));
        assert!(formatted.contains("Reason:      Suspicious certutil execution"));
        assert!(formatted.contains("Command:     certutil -urlcache"));
        assert!(formatted.contains("Alert ID:    alert-1234-t1"));
    }

    #[test]
    fn record_omits_empty_command_line() {
        let alert = Alert {
            process_id: 1,
            executable_path: r"C:\Windows\System32\mshta.exe".into(),
            ..Default::default()
        };
        let formatted = AlertLogRecord::new(&alert).format_file();
        assert!(!formatted.contains("Command:"));
    }
}
