//! Classification of inbound broker payloads.
//!
//! Meshtastic gateways publish a mix of JSON shapes and the occasional
//! plain-text frame. Decoding never fails: anything unrecognized falls
//! through to a plainer representation, in strict precedence order.

use serde_json::Value;

/// An inbound payload, classified by shape.
///
/// Precedence of classification:
/// 1. JSON with `type == "sendtext"` → [`SendText`](Self::SendText)
/// 2. JSON with a nested `decoded.text` → [`DecodedText`](Self::DecodedText)
/// 3. any other JSON → [`Generic`](Self::Generic)
/// 4. not JSON at all → [`Unparseable`](Self::Unparseable)
#[derive(Debug, Clone, PartialEq)]
pub enum InboundPayload {
    /// Text frame in the bridge's own outbound encoding
    SendText { from: String, payload: String },
    /// Text frame decoded by a gateway node
    DecodedText { from: String, text: String },
    /// Some other JSON document
    Generic { from: String, document: Value },
    /// Not parseable as JSON
    Unparseable(String),
}

impl InboundPayload {
    /// Classifies a raw payload.
    pub fn classify(raw: &str) -> Self {
        let document: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(_) => return Self::Unparseable(raw.to_string()),
        };

        let from = from_field(&document);

        if document.get("type").and_then(Value::as_str) == Some("sendtext") {
            let payload = field_as_text(document.get("payload")).unwrap_or_default();
            return Self::SendText { from, payload };
        }

        if let Some(text) = document.get("decoded").and_then(|d| d.get("text")) {
            return Self::DecodedText {
                from,
                text: field_as_text(Some(text)).unwrap_or_default(),
            };
        }

        Self::Generic { from, document }
    }

    /// Human-readable summary for the journal.
    pub fn content(&self) -> String {
        match self {
            Self::SendText { from, payload } => format!("Text from {from}: {payload}"),
            Self::DecodedText { from, text } => format!("Text from {from}: {text}"),
            Self::Generic { from, document } => {
                let pretty =
                    serde_json::to_string_pretty(document).unwrap_or_else(|_| document.to_string());
                format!("Message from {from}: {pretty}")
            }
            Self::Unparseable(raw) => format!("Non-JSON message: {raw}"),
        }
    }
}

/// Sender field as display text; the literal `Unknown` when absent.
fn from_field(document: &Value) -> String {
    match document.get("from") {
        Some(value) => field_as_text(Some(value)).unwrap_or_else(|| "Unknown".to_string()),
        None => "Unknown".to_string(),
    }
}

/// Renders a JSON scalar the way a viewer expects: strings unquoted,
/// numbers as written.
fn field_as_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sendtext_frame() {
        let payload = InboundPayload::classify(r#"{"type":"sendtext","from":123,"payload":"hi"}"#);
        assert_eq!(payload.content(), "Text from 123: hi");
    }

    #[test]
    fn decoded_text_frame() {
        let payload = InboundPayload::classify(r#"{"from":5,"decoded":{"text":"yo"}}"#);
        assert_eq!(payload.content(), "Text from 5: yo");
    }

    #[test]
    fn generic_json_is_pretty_printed() {
        let payload = InboundPayload::classify(r#"{"foo":"bar"}"#);
        let content = payload.content();
        assert!(content.starts_with("Message from Unknown: "));
        assert!(content.contains("\"foo\": \"bar\""));
    }

    #[test]
    fn plain_text_falls_through() {
        let payload = InboundPayload::classify("not json at all");
        assert_eq!(payload.content(), "Non-JSON message: not json at all");
    }

    #[test]
    fn sendtext_wins_over_decoded_text() {
        let payload = InboundPayload::classify(
            r#"{"type":"sendtext","from":1,"payload":"a","decoded":{"text":"b"}}"#,
        );
        assert_eq!(payload.content(), "Text from 1: a");
    }

    #[test]
    fn missing_from_defaults_to_unknown() {
        let payload = InboundPayload::classify(r#"{"type":"sendtext","payload":"hi"}"#);
        assert_eq!(payload.content(), "Text from Unknown: hi");
    }

    #[test]
    fn string_from_is_rendered_unquoted() {
        let payload = InboundPayload::classify(r#"{"type":"sendtext","from":"!abc","payload":"x"}"#);
        assert_eq!(payload.content(), "Text from !abc: x");
    }

    #[test]
    fn missing_payload_defaults_to_empty() {
        let payload = InboundPayload::classify(r#"{"type":"sendtext","from":9}"#);
        assert_eq!(payload.content(), "Text from 9: ");
    }

    #[test]
    fn non_sendtext_type_without_decoded_is_generic() {
        let payload = InboundPayload::classify(r#"{"type":"position","from":7}"#);
        assert!(payload.content().starts_with("Message from 7: "));
    }

    #[test]
    fn json_array_is_generic() {
        let payload = InboundPayload::classify("[1,2,3]");
        assert!(payload.content().starts_with("Message from Unknown: "));
    }
}
