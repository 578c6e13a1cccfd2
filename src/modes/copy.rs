use payload_mapper::coder::EnvelopeCoder;
use payload_mapper::configs::AppConfig;
use payload_mapper::kafka_impl::KafkaSink;
use payload_mapper::kafka_impl::KafkaSource;
use payload_mapper::mapper::PayloadMapper;
use payload_mapper::pipeline::run_pipeline;
use payload_mapper::MapperError;
use payload_mapper::Result;

pub async fn run_async_copy_topic(config: AppConfig) -> Result<()> {
    let input_config = config.consumer_kafka.ok_or_else(|| MapperError::Config("Must specify input kafka config".to_owned()))?;
    let output_config = config.producer_kafka.ok_or_else(|| MapperError::Config("Must specify output kafka config".to_owned()))?;
    let idle = input_config.idle_timeout();
    let mut consumer = KafkaSource::connect(input_config).await?;
    let mut producer = KafkaSink::connect(output_config).await?;
    run_pipeline(&mut consumer, &mut producer, &EnvelopeCoder::new(config.codec), &PayloadMapper::new(), Some(idle)).await?;
    Ok(())
}
