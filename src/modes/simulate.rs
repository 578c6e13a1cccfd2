use payload_mapper::configs::AppConfig;
use payload_mapper::interface::RecordSink;
use payload_mapper::kafka_impl::KafkaSink;
use payload_mapper::simulate::run_simulator;
use payload_mapper::stdio_impl::LineSink;
use payload_mapper::MapperError;
use payload_mapper::Result;

pub async fn run_async_simulate(config: AppConfig) -> Result<()> {
    let simulator = config.simulator.ok_or_else(|| MapperError::Config("Must specify simulator config".to_owned()))?;
    let mut sink: Box<dyn RecordSink> = match config.producer_kafka {
        Some(producer_config) => Box::new(KafkaSink::connect(producer_config).await?),
        None => Box::new(LineSink::stdout()),
    };
    let sent = run_simulator(&simulator, sink.as_mut()).await?;
    info!("Simulated {} packs", sent);
    Ok(())
}
