use payload_mapper::coder::EnvelopeCoder;
use payload_mapper::configs::AppConfig;
use payload_mapper::mapper::PayloadMapper;
use payload_mapper::pipeline::run_pipeline;
use payload_mapper::stdio_impl::LineSink;
use payload_mapper::stdio_impl::LineSource;
use payload_mapper::Result;

pub async fn run_async_map_stdin(config: AppConfig) -> Result<()> {
    let mut source = LineSource::stdin();
    let mut sink = LineSink::stdout();
    run_pipeline(&mut source, &mut sink, &EnvelopeCoder::new(config.codec), &PayloadMapper::new(), None).await?;
    Ok(())
}
