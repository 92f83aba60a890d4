use std::fmt;

use serde::{Deserialize, Serialize};

/// What kind of event an entry records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Lifecycle events of the bridge itself (connect, disconnect)
    System,
    /// Failures worth showing to viewers
    Error,
    /// Inbound mesh traffic
    Received,
    /// Outbound text relayed on behalf of a viewer
    Sent,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match self {
            EntryKind::System => "system",
            EntryKind::Error => "error",
            EntryKind::Received => "received",
            EntryKind::Sent => "sent",
        };
        write!(f, "{}", label)
    }
}

/// One immutable journal entry.
///
/// The wire form uses `type` for the kind field, matching what viewers
/// already expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Human-readable summary shown in the viewer
    pub content: String,
    /// MQTT topic the event relates to, empty when not applicable
    pub topic: String,
    /// Verbatim inbound payload or encoded outbound body, empty when not
    /// applicable
    pub raw: String,
    /// Assigned exactly once, when the entry becomes visible
    pub timestamp: String,
}

impl LogEntry {
    /// Current local time in the journal's display format.
    pub(crate) fn format_timestamp() -> String {
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_serializes_lowercase_under_type_key() {
        let entry = LogEntry {
            kind: EntryKind::Received,
            content: "Text from 123: hi".to_string(),
            topic: "msh/chootka/2/json".to_string(),
            raw: "{}".to_string(),
            timestamp: "2026-08-23 12:00:00".to_string(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "received");
        assert_eq!(json["content"], "Text from 123: hi");
        assert_eq!(json["timestamp"], "2026-08-23 12:00:00");
    }

    #[test]
    fn kind_round_trips() {
        for kind in [
            EntryKind::System,
            EntryKind::Error,
            EntryKind::Received,
            EntryKind::Sent,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            let back: EntryKind = serde_json::from_str(&json).unwrap();
            assert_eq!(kind, back);
        }
    }

    #[test]
    fn timestamp_format_shape() {
        let ts = LogEntry::format_timestamp();
        // YYYY-MM-DD HH:MM:SS
        assert_eq!(ts.len(), 19);
        assert_eq!(&ts[4..5], "-");
        assert_eq!(&ts[10..11], " ");
        assert_eq!(&ts[13..14], ":");
    }
}
