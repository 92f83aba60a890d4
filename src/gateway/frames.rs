//! Wire frames exchanged with viewers over the WebSocket.

use serde::{Deserialize, Serialize};

use crate::journal::LogEntry;

/// Server-to-viewer frame
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerFrame {
    /// One journal entry, live or replayed
    NewMessage(LogEntry),
    /// The journal was emptied; the viewer discards its local view
    MessagesCleared,
    /// A request failed; `message` is human-readable
    Error { message: String },
}

impl ServerFrame {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// Viewer-to-server request.
///
/// Missing fields deserialize as empty strings so the handler can answer
/// with a proper error frame instead of a parse failure.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientRequest {
    SendMessage {
        #[serde(default)]
        device_id: String,
        #[serde(default)]
        message: String,
    },
    ClearMessages,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::EntryKind;

    #[test]
    fn new_message_frame_shape() {
        let frame = ServerFrame::NewMessage(LogEntry {
            kind: EntryKind::Received,
            content: "Text from 5: yo".to_string(),
            topic: "msh/chootka/2/json".to_string(),
            raw: "{}".to_string(),
            timestamp: "2026-08-23 12:00:00".to_string(),
        });
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["event"], "new_message");
        assert_eq!(json["data"]["type"], "received");
        assert_eq!(json["data"]["content"], "Text from 5: yo");
    }

    #[test]
    fn cleared_frame_carries_no_payload() {
        let json = serde_json::to_value(ServerFrame::MessagesCleared).unwrap();
        assert_eq!(json["event"], "messages_cleared");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn error_frame_shape() {
        let json = serde_json::to_value(ServerFrame::error("Unknown device ID: nope")).unwrap();
        assert_eq!(json["event"], "error");
        assert_eq!(json["data"]["message"], "Unknown device ID: nope");
    }

    #[test]
    fn send_message_request_parses() {
        let request: ClientRequest = serde_json::from_str(
            r#"{"type":"send_message","device_id":"fa6f1418","message":"hello"}"#,
        )
        .unwrap();
        assert_eq!(
            request,
            ClientRequest::SendMessage {
                device_id: "fa6f1418".to_string(),
                message: "hello".to_string(),
            }
        );
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let request: ClientRequest =
            serde_json::from_str(r#"{"type":"send_message"}"#).unwrap();
        assert_eq!(
            request,
            ClientRequest::SendMessage {
                device_id: String::new(),
                message: String::new(),
            }
        );
    }

    #[test]
    fn clear_messages_request_parses() {
        let request: ClientRequest =
            serde_json::from_str(r#"{"type":"clear_messages"}"#).unwrap();
        assert_eq!(request, ClientRequest::ClearMessages);
    }

    #[test]
    fn unknown_request_type_fails_to_parse() {
        let result: Result<ClientRequest, _> =
            serde_json::from_str(r#"{"type":"reboot_everything"}"#);
        assert!(result.is_err());
    }
}
