use crate::message::RawRecord;
use crate::Result;

#[async_trait]
pub trait RecordSource: Send {
    /// `None` once the source is exhausted.
    async fn recv(&mut self) -> Result<Option<RawRecord>>;
}

#[async_trait]
pub trait RecordSink: Send {
    async fn write_one(&mut self, record: RawRecord) -> Result<()>;
    async fn flush(&mut self) -> Result<()>;
}
