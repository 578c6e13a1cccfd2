use payload_mapper::coder::EnvelopeCoder;
use payload_mapper::configs::AppConfig;
use payload_mapper::kafka_impl::KafkaSource;
use payload_mapper::mapper::PayloadMapper;
use payload_mapper::pipeline::run_pipeline;
use payload_mapper::stdio_impl::LineSink;
use payload_mapper::MapperError;
use payload_mapper::Result;

pub async fn run_async_consume_topic(config: AppConfig) -> Result<()> {
    let input_config = config.consumer_kafka.ok_or_else(|| MapperError::Config("Must specify input kafka config".to_owned()))?;
    let idle = input_config.idle_timeout();
    let mut consumer = KafkaSource::connect(input_config).await?;
    let mut stdout = LineSink::stdout();
    run_pipeline(&mut consumer, &mut stdout, &EnvelopeCoder::new(config.codec), &PayloadMapper::new(), Some(idle)).await?;
    Ok(())
}
