#![deny(unsafe_code)]

#[macro_use]
extern crate log;

mod modes;

use chrono::DateTime;
use chrono::Local;
use env_logger::fmt::Formatter;
use env_logger::Builder;
use env_logger::Target;
use log::LevelFilter;
use log::Record;
use modes::*;
use payload_mapper::configs::AppConfig;
use payload_mapper::configs::WorkingMode;
use payload_mapper::jobs::JobsConfig;
use payload_mapper::MapperError;
use std::io::Write;
use std::thread;

pub fn setup_logger(log_thread: bool, level: LevelFilter) {
    let output_format = move |formatter: &mut Formatter, record: &Record| {
        let thread_name = if log_thread {
            format!("(t: {}) ", thread::current().name().unwrap_or("unknown"))
        } else {
            "".to_string()
        };

        let local_time: DateTime<Local> = Local::now();
        let time_str = local_time.format("%H:%M:%S%.3f").to_string();
        writeln!(formatter, "{} {}{} - {} - {}", time_str, thread_name, record.level(), record.target(), record.args())
    };

    let mut builder = Builder::new();
    builder.format(output_format).filter(None, level);
    builder.target(Target::Stderr);
    builder.init();
}

#[tokio::main]
async fn main() -> Result<(), MapperError> {
    let args = std::env::args().collect::<Vec<String>>();
    let config = AppConfig::from_args(args.iter().map(|x| x.as_str()).collect())?;
    setup_logger(true, config.log_level);

    info!("Starting {}", config.working_mode);

    match config.working_mode {
        WorkingMode::Map => run_async_map_stdin(config).await?,
        WorkingMode::Consume => run_async_consume_topic(config).await?,
        WorkingMode::Produce => run_async_produce_topic(config).await?,
        WorkingMode::Copy => run_async_copy_topic(config).await?,
        WorkingMode::Simulate => run_async_simulate(config).await?,
        WorkingMode::Jobs => {
            let path = config.jobs_file.ok_or_else(|| MapperError::Config("Must specify a jobs file".to_owned()))?;
            let stats = JobsConfig::from_config_file(&path)?.run().await?;
            info!("Jobs finished: {} mapped, {} skipped", stats.mapped, stats.skipped);
        },
    }
    Ok(())
}
