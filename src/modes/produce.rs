use payload_mapper::coder::EnvelopeCoder;
use payload_mapper::configs::AppConfig;
use payload_mapper::kafka_impl::KafkaSink;
use payload_mapper::mapper::PayloadMapper;
use payload_mapper::pipeline::run_pipeline;
use payload_mapper::stdio_impl::LineSource;
use payload_mapper::MapperError;
use payload_mapper::Result;

pub async fn run_async_produce_topic(config: AppConfig) -> Result<()> {
    let producer_config = config.producer_kafka.ok_or_else(|| MapperError::Config("Must specify output kafka config".to_owned()))?;
    let mut producer = KafkaSink::connect(producer_config).await?;
    let mut stdin = LineSource::stdin();
    run_pipeline(&mut stdin, &mut producer, &EnvelopeCoder::new(config.codec), &PayloadMapper::new(), None).await?;
    Ok(())
}
