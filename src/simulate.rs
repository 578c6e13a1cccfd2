use crate::configs::SimulatorConfig;
use crate::configs::DEFAULT_MSG_TYPE;
use crate::interface::RecordSink;
use crate::message::RawRecord;
use crate::message::RuleEnvelope;
use crate::Result;
use serde_json::json;
use serde_json::value::to_raw_value;
use serde_json::Map;
use serde_json::Value;

/// Counters of a tea packaging machine: every sealed pack bumps the total, and every
/// `batch_size` packs start a new batch.
#[rustfmt::skip]
#[derive(Debug, Clone)]
pub struct PackagerSimulator {
    machine_id:    String,
    flavor:        Option<String>,
    batch_size:    u32,
    total_count:   u64,
    batch_count:   u32,
    batch_number:  u32,
}

impl PackagerSimulator {
    pub fn new(config: &SimulatorConfig) -> Self {
        PackagerSimulator {
            machine_id:   config.machine_id.clone(),
            flavor:       config.flavor.clone(),
            batch_size:   config.batch_size.max(1),
            total_count:  0,
            batch_count:  0,
            batch_number: 0,
        }
    }

    /// Seals one pack and returns the telemetry the machine publishes for it.
    pub fn seal_pack(&mut self) -> Value {
        self.total_count += 1;
        self.batch_count += 1;
        if self.batch_count >= self.batch_size {
            self.batch_count = 0;
            self.batch_number += 1;
        }

        let mut telemetry = Map::new();
        telemetry.insert("machine_id".to_owned(), json!(self.machine_id));
        telemetry.insert("total_Count".to_owned(), json!(self.total_count));
        telemetry.insert("batch".to_owned(), json!(self.batch_number));
        if let Some(flavor) = &self.flavor {
            telemetry.insert("Flavor".to_owned(), json!(flavor));
        }
        Value::Object(telemetry)
    }

    /// Wraps the next pack in the envelope a rule engine hands to its script stages.
    pub fn next_envelope(&mut self) -> Result<RuleEnvelope> {
        let msg = self.seal_pack();
        let metadata = json!({
            "deviceName": self.machine_id,
            "deviceType": "packager",
            "ts": chrono::Utc::now().timestamp_millis().to_string(),
        });
        Ok(RuleEnvelope::new(msg, Some(to_raw_value(&metadata)?), Some(to_raw_value(DEFAULT_MSG_TYPE)?)))
    }
}

pub async fn run_simulator<K: RecordSink + ?Sized>(config: &SimulatorConfig, sink: &mut K) -> Result<u64> {
    let mut simulator = PackagerSimulator::new(config);
    info!("Simulating {} packs for {}", config.count, config.machine_id);
    for sent in 0..config.count {
        if sent > 0 && !config.interval.is_zero() {
            tokio::time::sleep(config.interval).await;
        }
        let envelope = simulator.next_envelope()?;
        let mut record = RawRecord::from_payload(serde_json::to_vec(&envelope)?);
        record.key = config.machine_id.as_bytes().to_vec();
        sink.write_one(record).await?;
    }
    sink.flush().await?;
    Ok(config.count)
}
