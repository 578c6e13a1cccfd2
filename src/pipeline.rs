use crate::coder::EnvelopeCoder;
use crate::interface::RecordSink;
use crate::interface::RecordSource;
use crate::mapper::Clock;
use crate::mapper::PayloadMapper;
use crate::message::RawRecord;
use crate::Result;
use std::time::Duration;
use tokio::time::timeout;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub mapped:  u64,
    pub skipped: u64,
}

/// Decodes, maps and re-encodes every record of `source` into `sink`.
///
/// Records that cannot be decoded are logged and skipped. The loop ends when the source is
/// exhausted or, with `idle` set, when no record arrives in time. The sink is flushed before
/// returning, also when the loop stops on an error.
pub async fn run_pipeline<S, K, C>(source: &mut S, sink: &mut K, coder: &EnvelopeCoder, mapper: &PayloadMapper<C>, idle: Option<Duration>) -> Result<PipelineStats>
where
    S: RecordSource + ?Sized,
    K: RecordSink + ?Sized,
    C: Clock,
{
    let mut stats = PipelineStats::default();
    let pumped = pump(source, sink, coder, mapper, idle, &mut stats).await;
    let flushed = sink.flush().await;
    if let Err(err) = &pumped {
        warn!("Stopped after {} records: {}", stats.mapped, err);
    }
    pumped?;
    flushed?;
    info!("Mapped {} records, skipped {}", stats.mapped, stats.skipped);
    Ok(stats)
}

async fn pump<S, K, C>(source: &mut S, sink: &mut K, coder: &EnvelopeCoder, mapper: &PayloadMapper<C>, idle: Option<Duration>, stats: &mut PipelineStats) -> Result<()>
where
    S: RecordSource + ?Sized,
    K: RecordSink + ?Sized,
    C: Clock,
{
    loop {
        let next = match idle {
            Some(delay) => match timeout(delay, source.recv()).await {
                Ok(next) => next?,
                Err(_) => {
                    info!("No record within {:?}, stopping", delay);
                    return Ok(());
                },
            },
            None => source.recv().await?,
        };
        let record = match next {
            Some(record) => record,
            None => return Ok(()),
        };

        let envelope = match coder.decode(&record) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!("Skipping undecodable record: {} ({})", err, String::from_utf8_lossy(&record.payload));
                stats.skipped += 1;
                continue;
            },
        };
        let mapped = mapper.map(envelope);
        let payload = coder.encode(&mapped)?;
        sink.write_one(RawRecord {
            key: record.key,
            payload,
            timestamp: chrono::Utc::now().timestamp_millis(),
            headers: record.headers,
        })
        .await?;
        stats.mapped += 1;
    }
}
