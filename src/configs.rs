use crate::error::MapperError;
use crate::Result;
use clap::crate_version;
use clap::Arg;
use clap::ArgMatches;
use clap::Command;
use log::LevelFilter;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use strum::Display;
use strum::EnumString;

pub const DEFAULT_MSG_TYPE: &str = "POST_TELEMETRY_REQUEST";
pub const DEFAULT_BROKERS: &str = "localhost:9092";

pub fn topic() -> Arg<'static> { Arg::new("topic").short('t').long("topic").help("Topic").takes_value(true) }
pub fn brokers() -> Arg<'static> { Arg::new("brokers").short('b').long("brokers").help("Broker list in kafka format").default_value(DEFAULT_BROKERS) }
pub fn partition() -> Arg<'static> { Arg::new("partition").short('p').long("partition").help("Partition").takes_value(true) }
pub fn exit() -> Arg<'static> { Arg::new("exit").short('e').long("exit").help("Exit successfully when last message received") }
pub fn offset() -> Arg<'static> {
    Arg::new("offset")
        .short('o')
        .long("offset")
        .takes_value(true)
        .default_value("beginning")
        .possible_values(["beginning", "end"])
        .help("Offset to start consuming from")
}
pub fn format_args() -> Vec<Arg<'static>> {
    vec![
        Arg::new("input-format")
            .long("input-format")
            .takes_value(true)
            .default_value("envelope")
            .possible_values(["envelope", "payload"])
            .help("How incoming records are shaped: a full {msg, metadata, msgType} envelope or the bare msg"),
        Arg::new("output-format")
            .long("output-format")
            .takes_value(true)
            .default_value("envelope")
            .possible_values(["envelope", "payload"])
            .help("Write the whole envelope or only the mapped msg"),
        Arg::new("msg-type")
            .long("msg-type")
            .takes_value(true)
            .default_value(DEFAULT_MSG_TYPE)
            .help("msgType attached to bare payload input"),
    ]
}

pub fn map_subcommand() -> Command<'static> { Command::new("map").about("Map envelopes read from stdin and write them to stdout").args(format_args()) }
pub fn consume_subcommand() -> Command<'static> {
    Command::new("consume")
        .short_flag('C')
        .about("Map records of a kafka topic and write them to stdout")
        .args(vec![brokers(), topic().required(true), partition(), offset(), exit()])
        .args(format_args())
}
pub fn produce_subcommand() -> Command<'static> {
    Command::new("produce")
        .short_flag('P')
        .about("Map envelopes read from stdin and write them to a kafka topic")
        .args(vec![brokers(), topic().required(true)])
        .args(format_args())
}
pub fn copy_subcommand() -> Command<'static> {
    Command::new("copy")
        .about("Map records of one kafka topic into another")
        .args(vec![brokers(), topic().required(true), partition(), offset(), exit()])
        .arg(Arg::new("to-topic").long("to-topic").takes_value(true).required(true).help("Destination topic"))
        .arg(Arg::new("to-brokers").long("to-brokers").takes_value(true).help("Destination broker list, defaults to --brokers"))
        .args(format_args())
}
pub fn simulate_subcommand() -> Command<'static> {
    Command::new("simulate")
        .about("Emit packaging machine telemetry envelopes to stdout, or to a topic when --topic is given")
        .arg(Arg::new("machine-id").long("machine-id").takes_value(true).default_value("machine_1").help("Machine identifier"))
        .arg(Arg::new("flavor").long("flavor").takes_value(true).help("Flavor reported with every pack"))
        .arg(Arg::new("batch-size").long("batch-size").takes_value(true).default_value("24").help("Packs per batch"))
        .arg(Arg::new("count").short('n').long("count").takes_value(true).default_value("10").help("Number of packs to emit"))
        .arg(Arg::new("interval-ms").long("interval-ms").takes_value(true).default_value("0").help("Delay between packs"))
        .args(vec![brokers(), topic()])
}
pub fn jobs_subcommand() -> Command<'static> {
    Command::new("jobs")
        .about("Run the mapping jobs described in a YAML file")
        .arg(Arg::new("config").required(true).help("Path of the jobs file"))
}
pub fn get_arg_matches() -> Command<'static> {
    Command::new("payload-mapper")
        .version(crate_version!())
        .about("Reshape device telemetry envelopes for downstream writers")
        .subcommands(vec![
            map_subcommand(),
            consume_subcommand(),
            produce_subcommand(),
            copy_subcommand(),
            simulate_subcommand(),
            jobs_subcommand(),
        ])
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("log")
                .long("log")
                .help("Configure the logging format: Off, Error, Warn, Info, Debug, Trace")
                .takes_value(true)
                .global(true),
        )
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum WorkingMode {
    Map,
    Consume,
    Produce,
    Copy,
    Simulate,
    Jobs,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, EnumString, Display, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SerdeFormat {
    #[default]
    Envelope,
    Payload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum KafkaOffset {
    #[default]
    Beginning,
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CodecConfig {
    pub input_format:  SerdeFormat,
    pub output_format: SerdeFormat,
    pub msg_type:      String,
}

impl Default for CodecConfig {
    fn default() -> Self {
        CodecConfig {
            input_format:  SerdeFormat::Envelope,
            output_format: SerdeFormat::Envelope,
            msg_type:      DEFAULT_MSG_TYPE.to_owned(),
        }
    }
}

impl CodecConfig {
    pub fn from_matches(matches: &ArgMatches) -> Result<CodecConfig> {
        Ok(CodecConfig {
            input_format:  parse_value(matches, "input-format")?.unwrap_or_default(),
            output_format: parse_value(matches, "output-format")?.unwrap_or_default(),
            msg_type:      matches.value_of("msg-type").unwrap_or(DEFAULT_MSG_TYPE).to_owned(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KafkaConsumerConfig {
    pub brokers:      String,
    pub offset:       KafkaOffset,
    pub partition:    Option<i32>,
    pub topic:        String,
    pub exit_on_done: bool,
}

impl KafkaConsumerConfig {
    pub fn from_matches(matches: &ArgMatches) -> Result<KafkaConsumerConfig> {
        Ok(KafkaConsumerConfig {
            brokers:      matches.value_of("brokers").unwrap_or(DEFAULT_BROKERS).to_owned(),
            offset:       parse_value(matches, "offset")?.unwrap_or_default(),
            partition:    parse_value(matches, "partition")?,
            topic:        required(matches, "topic")?,
            exit_on_done: matches.is_present("exit"),
        })
    }

    /// How long to wait for the next record before the stream counts as drained.
    pub fn idle_timeout(&self) -> Duration {
        if self.exit_on_done {
            Duration::from_millis(3000)
        } else {
            Duration::from_secs(3600)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KafkaProducerConfig {
    pub brokers: String,
    pub topic:   String,
}

impl KafkaProducerConfig {
    pub fn new(brokers: &str, topic: &str) -> Self {
        KafkaProducerConfig {
            brokers: brokers.to_owned(),
            topic:   topic.to_owned(),
        }
    }

    pub fn from_matches(matches: &ArgMatches) -> Result<KafkaProducerConfig> {
        let brokers = matches.value_of("brokers").unwrap_or(DEFAULT_BROKERS);
        Ok(KafkaProducerConfig::new(brokers, &required(matches, "topic")?))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorConfig {
    pub machine_id: String,
    pub flavor:     Option<String>,
    pub batch_size: u32,
    pub count:      u64,
    pub interval:   Duration,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        SimulatorConfig {
            machine_id: "machine_1".to_owned(),
            flavor:     None,
            batch_size: 24,
            count:      10,
            interval:   Duration::ZERO,
        }
    }
}

impl SimulatorConfig {
    pub fn from_matches(matches: &ArgMatches) -> Result<SimulatorConfig> {
        let defaults = SimulatorConfig::default();
        let batch_size = parse_value(matches, "batch-size")?.unwrap_or(defaults.batch_size);
        if batch_size == 0 {
            return Err(MapperError::Config("batch-size must be at least 1".to_owned()));
        }
        Ok(SimulatorConfig {
            machine_id: matches.value_of("machine-id").map(str::to_owned).unwrap_or(defaults.machine_id),
            flavor: matches.value_of("flavor").map(str::to_owned),
            batch_size,
            count: parse_value(matches, "count")?.unwrap_or(defaults.count),
            interval: parse_value(matches, "interval-ms")?.map(Duration::from_millis).unwrap_or(defaults.interval),
        })
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub working_mode:   WorkingMode,
    pub log_level:      LevelFilter,
    pub codec:          CodecConfig,
    pub consumer_kafka: Option<KafkaConsumerConfig>,
    pub producer_kafka: Option<KafkaProducerConfig>,
    pub simulator:      Option<SimulatorConfig>,
    pub jobs_file:      Option<String>,
}

impl AppConfig {
    pub fn from_args(args: Vec<&str>) -> Result<Self> {
        let matches = get_arg_matches().get_matches_from(args);
        let mapper_log_env = std::env::var("MAPPER_LOG").ok();
        let log_level = match matches.value_of("log").or(mapper_log_env.as_deref()) {
            Some(level) => LevelFilter::from_str(level).map_err(|_| MapperError::Config(format!("Cannot parse log level {}", level)))?,
            None => LevelFilter::Warn,
        };
        let (name, sub) = matches.subcommand().ok_or_else(|| MapperError::Config("Must specify a working mode".to_owned()))?;
        let working_mode = WorkingMode::from_str(name).map_err(|_| MapperError::Config(format!("Unknown working mode {}", name)))?;

        let mut this = AppConfig {
            working_mode,
            log_level,
            codec: CodecConfig::default(),
            consumer_kafka: None,
            producer_kafka: None,
            simulator: None,
            jobs_file: None,
        };
        match working_mode {
            WorkingMode::Map => {
                this.codec = CodecConfig::from_matches(sub)?;
            },
            WorkingMode::Consume => {
                this.codec = CodecConfig::from_matches(sub)?;
                this.consumer_kafka = Some(KafkaConsumerConfig::from_matches(sub)?);
            },
            WorkingMode::Produce => {
                this.codec = CodecConfig::from_matches(sub)?;
                this.producer_kafka = Some(KafkaProducerConfig::from_matches(sub)?);
            },
            WorkingMode::Copy => {
                let consumer = KafkaConsumerConfig::from_matches(sub)?;
                let brokers = sub.value_of("to-brokers").unwrap_or(&consumer.brokers).to_owned();
                this.producer_kafka = Some(KafkaProducerConfig::new(&brokers, &required(sub, "to-topic")?));
                this.consumer_kafka = Some(consumer);
                this.codec = CodecConfig::from_matches(sub)?;
            },
            WorkingMode::Simulate => {
                this.simulator = Some(SimulatorConfig::from_matches(sub)?);
                if sub.is_present("topic") {
                    this.producer_kafka = Some(KafkaProducerConfig::from_matches(sub)?);
                }
            },
            WorkingMode::Jobs => {
                this.jobs_file = Some(required(sub, "config")?);
            },
        }

        Ok(this)
    }
}

fn required(matches: &ArgMatches, name: &str) -> Result<String> {
    matches
        .value_of(name)
        .map(str::to_owned)
        .ok_or_else(|| MapperError::Config(format!("Must specify {}", name)))
}

fn parse_value<T: FromStr>(matches: &ArgMatches, name: &str) -> Result<Option<T>> {
    match matches.value_of(name) {
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| MapperError::Config(format!("Cannot parse {} as {}", value, name))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_defaults() {
        let config = AppConfig::from_args(vec!["payload-mapper", "map"]).unwrap();
        assert_eq!(config.working_mode, WorkingMode::Map);
        assert_eq!(config.codec, CodecConfig::default());
        assert!(config.consumer_kafka.is_none());
        assert!(config.producer_kafka.is_none());
    }

    #[test]
    fn test_map_formats_and_log_level() {
        let config = AppConfig::from_args(vec![
            "payload-mapper",
            "--log",
            "debug",
            "map",
            "--input-format",
            "payload",
            "--output-format",
            "payload",
            "--msg-type",
            "reading",
        ])
        .unwrap();
        assert_eq!(config.log_level, LevelFilter::Debug);
        assert_eq!(config.codec.input_format, SerdeFormat::Payload);
        assert_eq!(config.codec.output_format, SerdeFormat::Payload);
        assert_eq!(config.codec.msg_type, "reading");
    }

    #[test]
    fn test_consume_short_flag() {
        let config = AppConfig::from_args(vec!["payload-mapper", "-C", "-t", "readings", "-p", "2", "-o", "end", "-e"]).unwrap();
        let consumer = config.consumer_kafka.unwrap();
        assert_eq!(consumer.topic, "readings");
        assert_eq!(consumer.brokers, DEFAULT_BROKERS);
        assert_eq!(consumer.partition, Some(2));
        assert_eq!(consumer.offset, KafkaOffset::End);
        assert!(consumer.exit_on_done);
        assert_eq!(consumer.idle_timeout(), Duration::from_millis(3000));
    }

    #[test]
    fn test_copy_defaults_destination_brokers() {
        let config = AppConfig::from_args(vec!["payload-mapper", "copy", "-b", "kafka:9092", "-t", "raw", "--to-topic", "mapped"]).unwrap();
        assert_eq!(config.working_mode, WorkingMode::Copy);
        assert_eq!(config.consumer_kafka.unwrap().topic, "raw");
        assert_eq!(config.producer_kafka, Some(KafkaProducerConfig::new("kafka:9092", "mapped")));
    }

    #[test]
    fn test_simulate_options() {
        let config = AppConfig::from_args(vec!["payload-mapper", "simulate", "--flavor", "honey", "-n", "48", "--batch-size", "12"]).unwrap();
        let simulator = config.simulator.unwrap();
        assert_eq!(simulator.flavor.as_deref(), Some("honey"));
        assert_eq!(simulator.count, 48);
        assert_eq!(simulator.batch_size, 12);
        assert_eq!(simulator.machine_id, "machine_1");
        assert!(config.producer_kafka.is_none());
    }

    #[test]
    fn test_simulate_rejects_empty_batches() {
        let result = AppConfig::from_args(vec!["payload-mapper", "simulate", "--batch-size", "0"]);
        assert!(matches!(result, Err(MapperError::Config(_))));
    }

    #[test]
    fn test_jobs_file() {
        let config = AppConfig::from_args(vec!["payload-mapper", "jobs", "jobs.yaml"]).unwrap();
        assert_eq!(config.working_mode, WorkingMode::Jobs);
        assert_eq!(config.jobs_file.as_deref(), Some("jobs.yaml"));
    }

    #[test]
    fn test_formats_parse_lowercase() {
        assert_eq!("payload".parse::<SerdeFormat>().unwrap(), SerdeFormat::Payload);
        assert_eq!(SerdeFormat::Envelope.to_string(), "envelope");
        assert!("xml".parse::<SerdeFormat>().is_err());
    }
}
