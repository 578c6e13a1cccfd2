use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde_json::value::RawValue;
use serde_json::Value;
use std::collections::HashMap;

/// A unit of transport: one line of a file or one Kafka record.
#[rustfmt::skip]
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RawRecord {
    pub key:       Vec<u8>,
    pub payload:   Vec<u8>,
    pub timestamp: i64,
    pub headers:   HashMap<String, String>,
}

impl RawRecord {
    pub fn from_payload(payload: Vec<u8>) -> Self {
        RawRecord {
            payload,
            timestamp: chrono::Utc::now().timestamp_millis(),
            ..RawRecord::default()
        }
    }
}

/// The `{msg, metadata, msgType}` triple handed from one rule stage to the next.
///
/// `metadata` and `msgType` are never inspected, so they are carried as raw JSON text and
/// written back exactly as they were read. A key absent on input stays absent on output.
#[derive(Debug, Serialize, Deserialize)]
pub struct RuleEnvelope<M = Value> {
    pub msg: M,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Box<RawValue>>,
    #[serde(rename = "msgType", default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub msg_type: Option<Box<RawValue>>,
}

impl<M> RuleEnvelope<M> {
    pub fn new(msg: M, metadata: Option<Box<RawValue>>, msg_type: Option<Box<RawValue>>) -> Self { RuleEnvelope { msg, metadata, msg_type } }
}

// An explicit `null` must survive the round trip, so a present key is always `Some`.
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Box<RawValue>>, D::Error> { Box::<RawValue>::deserialize(deserializer).map(Some) }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_keeps_raw_metadata_text() {
        let line = r#"{"msg":{"batch":3},"metadata":{"z":"1", "a":2.50},"msgType":"POST_TELEMETRY_REQUEST"}"#;
        let envelope: RuleEnvelope = serde_json::from_str(line).unwrap();
        assert_eq!(envelope.metadata.unwrap().get(), r#"{"z":"1", "a":2.50}"#);
        assert_eq!(envelope.msg_type.unwrap().get(), r#""POST_TELEMETRY_REQUEST""#);
    }

    #[test]
    fn test_envelope_distinguishes_null_from_missing() {
        let envelope: RuleEnvelope = serde_json::from_str(r#"{"msg":{},"metadata":null}"#).unwrap();
        assert_eq!(envelope.metadata.as_ref().map(|x| x.get()), Some("null"));
        assert!(envelope.msg_type.is_none());

        let written = serde_json::to_string(&envelope).unwrap();
        assert_eq!(written, r#"{"msg":{},"metadata":null}"#);
    }
}
