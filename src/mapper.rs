use crate::message::RuleEnvelope;
use chrono::DateTime;
use chrono::SecondsFormat;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

/// One measurement event from a packaging machine, as handed to the downstream writer.
///
/// The four device fields are copied without inspection. Fields missing from the device
/// message serialize as `null` so every record carries all five keys.
#[rustfmt::skip]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceReading {
    #[serde(default)]
    pub machine_id:  Value,
    #[serde(rename = "total_Count", default)]
    pub total_count: Value,
    #[serde(default)]
    pub batch:       Value,
    #[serde(rename = "Flavor", default)]
    pub flavor:      Value,
    #[serde(rename = "Timestamp")]
    pub timestamp:   String,
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> { Utc::now() }
}

/// ISO-8601 with milliseconds and a `Z` designator, e.g. `2026-10-19T08:15:00.042Z`.
pub fn iso_timestamp(time: DateTime<Utc>) -> String { time.to_rfc3339_opts(SecondsFormat::Millis, true) }

#[derive(Debug, Clone, Default)]
pub struct PayloadMapper<C = SystemClock> {
    clock: C,
}

impl PayloadMapper {
    pub fn new() -> Self { Self::default() }
}

impl<C: Clock> PayloadMapper<C> {
    pub fn with_clock(clock: C) -> Self { PayloadMapper { clock } }

    pub fn map_reading(&self, msg: Value) -> DeviceReading {
        let mut fields = match msg {
            Value::Object(fields) => fields,
            _ => Map::new(),
        };
        let mut take = |name: &str| fields.remove(name).unwrap_or(Value::Null);
        DeviceReading {
            machine_id:  take("machine_id"),
            total_count: take("total_Count"),
            batch:       take("batch"),
            flavor:      take("Flavor"),
            timestamp:   iso_timestamp(self.clock.now()),
        }
    }

    /// Builds the reading and hands back both companion values untouched.
    pub fn map_parts<Meta, Kind>(&self, msg: Value, metadata: Meta, msg_type: Kind) -> (DeviceReading, Meta, Kind) { (self.map_reading(msg), metadata, msg_type) }

    pub fn map(&self, envelope: RuleEnvelope) -> RuleEnvelope<DeviceReading> {
        let (msg, metadata, msg_type) = self.map_parts(envelope.msg, envelope.metadata, envelope.msg_type);
        RuleEnvelope::new(msg, metadata, msg_type)
    }
}
