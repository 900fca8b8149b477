/// Dispatch history
///
/// Every action a store applies is recorded with:
/// - Sequence number
/// - Timestamp
/// - Action type
/// - Outcome (applied, or failed with the error message)
///
/// The history can be exported as human-readable text or JSON.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "camelCase")]
pub enum Outcome {
    Applied,
    Failed(String),
}

/// One dispatched action
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionLogEntry {
    /// 1-based dispatch order
    pub sequence: usize,
    pub timestamp: DateTime<Local>,
    pub action_type: String,
    pub outcome: Outcome,
}

impl ActionLogEntry {
    pub fn to_text(&self) -> String {
        let outcome = match &self.outcome {
            Outcome::Applied => "applied".to_string(),
            Outcome::Failed(message) => format!("FAILED: {}", message),
        };
        format!(
            "[{:03}] {} | {} | {}",
            self.sequence,
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.action_type,
            outcome
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionLog {
    pub session_id: String,
    pub session_start: DateTime<Local>,
    pub software_version: String,
    pub entries: Vec<ActionLogEntry>,
}

impl ActionLog {
    pub fn new() -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            session_start: Local::now(),
            software_version: env!("CARGO_PKG_VERSION").to_string(),
            entries: Vec::new(),
        }
    }

    pub fn record(&mut self, action_type: &str, outcome: Outcome) {
        let sequence = self.entries.len() + 1;
        match &outcome {
            Outcome::Applied => log::debug!("[{:03}] {}", sequence, action_type),
            Outcome::Failed(message) => log::warn!("[{:03}] {} failed: {}", sequence, action_type, message),
        }
        self.entries.push(ActionLogEntry {
            sequence,
            timestamp: Local::now(),
            action_type: action_type.to_string(),
            outcome,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ActionLogEntry> {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, Outcome::Failed(_)))
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str("═══════════════════════════════════════════════════════════════\n");
        out.push_str("  NMR State Action History\n");
        out.push_str("═══════════════════════════════════════════════════════════════\n");
        out.push_str(&format!("  Session ID:  {}\n", self.session_id));
        out.push_str(&format!(
            "  Started:     {}\n",
            self.session_start.format("%Y-%m-%d %H:%M:%S")
        ));
        out.push_str(&format!("  Engine:      nmr_state v{}\n", self.software_version));
        out.push_str(&format!("  Actions:     {}\n", self.entries.len()));
        out.push_str("───────────────────────────────────────────────────────────────\n\n");
        for entry in &self.entries {
            out.push_str(&entry.to_text());
            out.push('\n');
        }
        out
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("JSON error: {}", e))
    }

    pub fn save_text(&self, path: &Path) -> io::Result<()> {
        std::fs::write(path, self.to_text())
    }

    pub fn save_json(&self, path: &Path) -> io::Result<()> {
        std::fs::write(path, self.to_json())
    }
}

impl Default for ActionLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_are_sequenced() {
        let mut log = ActionLog::new();
        assert!(log.is_empty());
        log.record("SET_ZOOM", Outcome::Applied);
        log.record("APPLY_FILTERS", Outcome::Failed("filter error".into()));
        assert_eq!(log.len(), 2);
        assert_eq!(log.entries[1].sequence, 2);
        assert_eq!(log.failures().count(), 1);
    }

    #[test]
    fn test_text_export() {
        let mut log = ActionLog::new();
        log.record("BRUSH_END", Outcome::Applied);
        log.record("APPLY_FILTERS", Outcome::Failed("requires FID".into()));
        let text = log.to_text();
        assert!(text.contains("BRUSH_END | applied"));
        assert!(text.contains("FAILED: requires FID"));
    }

    #[test]
    fn test_json_roundtrip() {
        let mut log = ActionLog::new();
        log.record("CLEAR_ERROR", Outcome::Applied);
        let parsed: ActionLog = serde_json::from_str(&log.to_json()).unwrap();
        assert_eq!(parsed.entries.len(), 1);
        assert_eq!(parsed.entries[0].outcome, Outcome::Applied);
    }
}
