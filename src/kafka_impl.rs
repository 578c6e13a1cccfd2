use crate::configs::KafkaConsumerConfig;
use crate::configs::KafkaOffset;
use crate::configs::KafkaProducerConfig;
use crate::interface::RecordSink;
use crate::interface::RecordSource;
use crate::message::RawRecord;
use crate::MapperError;
use crate::Result;
use backoff::ExponentialBackoff;
use kafka::consumer::Consumer;
use kafka::consumer::FetchOffset;
use kafka::producer::Producer;
use kafka::producer::Record;
use kafka::producer::RequiredAcks;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::spawn_blocking;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const EMPTY_POLL_DELAY: Duration = Duration::from_millis(200);

fn hosts(brokers: &str) -> Vec<String> {
    brokers
        .split(',')
        .map(str::trim)
        .filter(|x| !x.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Retries `op` with exponential backoff until it succeeds or `CONNECT_TIMEOUT` has passed.
/// Blocks the calling thread.
fn connect_with_backoff<T, F>(what: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> kafka::error::Result<T>,
{
    let policy = ExponentialBackoff {
        max_elapsed_time: Some(CONNECT_TIMEOUT),
        ..ExponentialBackoff::default()
    };
    backoff::retry(policy, || {
        op().map_err(|err| {
            warn!("{} connection failed, retrying: {}", what, err);
            backoff::Error::transient(err)
        })
    })
    .map_err(|err| match err {
        backoff::Error::Permanent(err) => MapperError::from(err),
        backoff::Error::Transient { err, .. } => MapperError::from(err),
    })
}

type Pending = Arc<Mutex<VecDeque<RawRecord>>>;

/// Queues records fetched by a blocking poll. Returns how many were queued; when the
/// source has already been dropped nobody will read them, so they are discarded.
fn stash(pending: &Pending, records: Vec<RawRecord>) -> usize {
    if Arc::strong_count(pending) == 1 {
        if !records.is_empty() {
            debug!("Consumer closed, discarding {} fetched records", records.len());
        }
        return 0;
    }
    let fetched = records.len();
    pending.blocking_lock().extend(records);
    fetched
}

pub struct KafkaSource {
    stream:  Arc<Mutex<Consumer>>,
    pending: Pending,
    config:  KafkaConsumerConfig,
}

impl KafkaSource {
    pub async fn connect(config: KafkaConsumerConfig) -> Result<Self> {
        info!("Connecting consumer to {} topic {} from {}", config.brokers, config.topic, config.offset);
        let cfg = config.clone();
        let consumer = spawn_blocking(move || {
            connect_with_backoff("consumer", || {
                let fallback = match cfg.offset {
                    KafkaOffset::Beginning => FetchOffset::Earliest,
                    KafkaOffset::End => FetchOffset::Latest,
                };
                let builder = Consumer::from_hosts(hosts(&cfg.brokers)).with_fallback_offset(fallback);
                let builder = match cfg.partition {
                    Some(partition) => builder.with_topic_partitions(cfg.topic.clone(), &[partition]),
                    None => builder.with_topic(cfg.topic.clone()),
                };
                builder.create()
            })
        })
        .await??;

        Ok(KafkaSource {
            stream: Arc::new(Mutex::new(consumer)),
            pending: Arc::new(Mutex::new(VecDeque::new())),
            config,
        })
    }

    /// Fetches into the pending queue, so a poll outliving a cancelled `recv` keeps its records.
    async fn poll(&self) -> Result<usize> {
        let mut consumer = Arc::clone(&self.stream).lock_owned().await;
        let pending = Arc::clone(&self.pending);
        let fetched = spawn_blocking(move || -> Result<usize> {
            let sets = consumer.poll()?;
            let now = chrono::Utc::now().timestamp_millis();
            let mut records = vec![];
            for set in sets.iter() {
                for msg in set.messages() {
                    let headers = HashMap::from([
                        ("topic".to_owned(), set.topic().to_owned()),
                        ("partition".to_owned(), set.partition().to_string()),
                        ("offset".to_owned(), msg.offset.to_string()),
                    ]);
                    records.push(RawRecord {
                        key: msg.key.to_vec(),
                        payload: msg.value.to_vec(),
                        timestamp: now,
                        headers,
                    });
                }
            }
            Ok(stash(&pending, records))
        })
        .await??;
        Ok(fetched)
    }
}

impl Drop for KafkaSource {
    fn drop(&mut self) {
        if let Ok(pending) = self.pending.try_lock() {
            if !pending.is_empty() {
                debug!("Discarding {} fetched records of {}", pending.len(), self.config.topic);
            }
        }
    }
}

#[async_trait]
impl RecordSource for KafkaSource {
    /// Kafka topics never end; this waits until a record arrives and the caller decides when to give up.
    async fn recv(&mut self) -> Result<Option<RawRecord>> {
        loop {
            let next = self.pending.lock().await.pop_front();
            if let Some(record) = next {
                return Ok(Some(record));
            }
            let fetched = self.poll().await?;
            if fetched == 0 {
                tokio::time::sleep(EMPTY_POLL_DELAY).await;
            } else {
                debug!("fetched {} records from {}", fetched, self.config.topic);
            }
        }
    }
}

pub struct KafkaSink {
    producer: Arc<Mutex<Producer>>,
    config:   KafkaProducerConfig,
}

impl KafkaSink {
    pub async fn connect(config: KafkaProducerConfig) -> Result<Self> {
        info!("Connecting producer to {} topic {}", config.brokers, config.topic);
        let brokers = config.brokers.clone();
        let producer = spawn_blocking(move || {
            connect_with_backoff("producer", || {
                Producer::from_hosts(hosts(&brokers))
                    .with_ack_timeout(Duration::from_secs(5))
                    .with_required_acks(RequiredAcks::One)
                    .create()
            })
        })
        .await??;
        Ok(KafkaSink {
            producer: Arc::new(Mutex::new(producer)),
            config,
        })
    }
}

#[async_trait]
impl RecordSink for KafkaSink {
    async fn write_one(&mut self, msg: RawRecord) -> Result<()> {
        let mut producer = Arc::clone(&self.producer).lock_owned().await;
        let topic = self.config.topic.clone();
        spawn_blocking(move || -> Result<()> {
            let payload = msg.payload.as_slice();
            if msg.key.is_empty() {
                producer.send(&Record::from_value(&topic, payload))?;
            } else {
                producer.send(&Record::from_key_value(&topic, msg.key.as_slice(), payload))?;
            }
            Ok(())
        })
        .await??;
        Ok(())
    }

    /// Every send waits for its acknowledgement, so there is nothing left to flush.
    async fn flush(&mut self) -> Result<()> { Ok(()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hosts_splits_broker_list() {
        assert_eq!(hosts("a:9092, b:9092,,"), vec!["a:9092".to_owned(), "b:9092".to_owned()]);
        assert_eq!(hosts("localhost:9092"), vec!["localhost:9092".to_owned()]);
    }

    #[test]
    fn test_stash_queues_while_source_is_alive() {
        let pending: Pending = Arc::new(Mutex::new(VecDeque::new()));
        let held = Arc::clone(&pending);
        let records = vec![RawRecord::from_payload(b"a".to_vec()), RawRecord::from_payload(b"b".to_vec())];
        assert_eq!(stash(&held, records), 2);
        assert_eq!(pending.blocking_lock().len(), 2);
    }

    #[test]
    fn test_stash_discards_after_source_dropped() {
        let pending: Pending = Arc::new(Mutex::new(VecDeque::new()));
        assert_eq!(stash(&pending, vec![RawRecord::from_payload(b"a".to_vec())]), 0);
        assert!(pending.blocking_lock().is_empty());
    }
}
