use crate::configs::CodecConfig;
use crate::configs::SerdeFormat;
use crate::message::RawRecord;
use crate::message::RuleEnvelope;
use crate::Result;
use serde::Serialize;
use serde_json::value::to_raw_value;
use serde_json::Value;

/// Turns transport records into envelopes and back, according to the configured formats.
#[derive(Debug, Clone)]
pub struct EnvelopeCoder {
    config: CodecConfig,
}

impl EnvelopeCoder {
    pub fn new(config: CodecConfig) -> Self { EnvelopeCoder { config } }

    /// Bare payload records get their metadata from the record headers and the configured msgType.
    pub fn decode(&self, record: &RawRecord) -> Result<RuleEnvelope> {
        match self.config.input_format {
            SerdeFormat::Envelope => Ok(serde_json::from_slice(&record.payload)?),
            SerdeFormat::Payload => {
                let msg: Value = serde_json::from_slice(&record.payload)?;
                let metadata = to_raw_value(&record.headers)?;
                let msg_type = to_raw_value(&self.config.msg_type)?;
                Ok(RuleEnvelope::new(msg, Some(metadata), Some(msg_type)))
            },
        }
    }

    pub fn encode<M: Serialize>(&self, envelope: &RuleEnvelope<M>) -> Result<Vec<u8>> {
        let encoded = match self.config.output_format {
            SerdeFormat::Envelope => serde_json::to_vec(envelope)?,
            SerdeFormat::Payload => serde_json::to_vec(&envelope.msg)?,
        };
        Ok(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn coder(input_format: SerdeFormat, output_format: SerdeFormat) -> EnvelopeCoder {
        EnvelopeCoder::new(CodecConfig {
            input_format,
            output_format,
            ..CodecConfig::default()
        })
    }

    #[test]
    fn test_decode_envelope() {
        let record = RawRecord::from_payload(br#"{"msg":{"batch":2},"metadata":{"deviceName":"machine_1"},"msgType":"POST_TELEMETRY_REQUEST"}"#.to_vec());
        let envelope = coder(SerdeFormat::Envelope, SerdeFormat::Envelope).decode(&record).unwrap();
        assert_eq!(envelope.msg, json!({"batch": 2}));
        assert_eq!(envelope.metadata.unwrap().get(), r#"{"deviceName":"machine_1"}"#);
    }

    #[test]
    fn test_decode_rejects_broken_json() {
        let record = RawRecord::from_payload(b"{\"msg\":".to_vec());
        assert!(coder(SerdeFormat::Envelope, SerdeFormat::Envelope).decode(&record).is_err());
    }

    #[test]
    fn test_decode_payload_builds_companions() {
        let mut record = RawRecord::from_payload(br#"{"machine_id":"machine_1","total_Count":5,"batch":0}"#.to_vec());
        record.headers = HashMap::from([("topic".to_owned(), "readings".to_owned())]);
        let envelope = coder(SerdeFormat::Payload, SerdeFormat::Envelope).decode(&record).unwrap();
        assert_eq!(envelope.msg["total_Count"], json!(5));
        assert_eq!(envelope.metadata.unwrap().get(), r#"{"topic":"readings"}"#);
        assert_eq!(envelope.msg_type.unwrap().get(), r#""POST_TELEMETRY_REQUEST""#);
    }

    #[test]
    fn test_encode_payload_writes_msg_only() {
        let envelope = RuleEnvelope::new(json!({"batch": 1}), Some(to_raw_value(&json!({"a": 1})).unwrap()), None);
        let bytes = coder(SerdeFormat::Envelope, SerdeFormat::Payload).encode(&envelope).unwrap();
        assert_eq!(bytes, br#"{"batch":1}"#.to_vec());

        let bytes = coder(SerdeFormat::Envelope, SerdeFormat::Envelope).encode(&envelope).unwrap();
        assert_eq!(bytes, br#"{"msg":{"batch":1},"metadata":{"a":1}}"#.to_vec());
    }
}
