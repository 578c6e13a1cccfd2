use crate::interface::RecordSink;
use crate::interface::RecordSource;
use crate::message::RawRecord;
use crate::Result;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::io::BufWriter;
use tokio::io::Split;
use tokio::io::Stdin;
use tokio::io::Stdout;

/// One record per non-blank line. Lines are raw bytes, invalid UTF-8 is left for the decoder to reject.
pub struct LineSource<R> {
    lines: Split<R>,
}

impl<R: AsyncBufRead + Unpin> LineSource<R> {
    pub fn new(reader: R) -> Self { LineSource { lines: reader.split(b'\n') } }
}

fn trim_line(line: &[u8]) -> &[u8] {
    let start = line.iter().position(|x| !x.is_ascii_whitespace()).unwrap_or(line.len());
    let end = line.iter().rposition(|x| !x.is_ascii_whitespace()).map_or(start, |x| x + 1);
    &line[start..end]
}

impl LineSource<BufReader<Stdin>> {
    pub fn stdin() -> Self { LineSource::new(BufReader::new(tokio::io::stdin())) }
}

impl LineSource<BufReader<File>> {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path).await?;
        Ok(LineSource::new(BufReader::new(file)))
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> RecordSource for LineSource<R> {
    async fn recv(&mut self) -> Result<Option<RawRecord>> {
        while let Some(line) = self.lines.next_segment().await? {
            let line = trim_line(&line);
            if !line.is_empty() {
                return Ok(Some(RawRecord::from_payload(line.to_vec())));
            }
        }
        Ok(None)
    }
}

pub struct LineSink<W> {
    writer:    BufWriter<W>,
    msg_delim: String,
}

impl<W: AsyncWrite + Unpin> LineSink<W> {
    pub fn new(writer: W) -> Self {
        LineSink {
            writer:    BufWriter::new(writer),
            msg_delim: "\n".to_owned(),
        }
    }

    /// Any data not yet flushed is lost.
    pub fn into_inner(self) -> W { self.writer.into_inner() }
}

impl LineSink<Stdout> {
    pub fn stdout() -> Self { LineSink::new(tokio::io::stdout()) }
}

impl LineSink<File> {
    pub async fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::create(path).await?;
        Ok(LineSink::new(file))
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> RecordSink for LineSink<W> {
    async fn write_one(&mut self, record: RawRecord) -> Result<()> {
        self.writer.write_all(&record.payload).await?;
        self.writer.write_all(self.msg_delim.as_bytes()).await?;
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        self.writer.flush().await?;
        Ok(())
    }
}
