use crate::coder::EnvelopeCoder;
use crate::configs::CodecConfig;
use crate::configs::KafkaProducerConfig;
use crate::configs::SerdeFormat;
use crate::configs::DEFAULT_BROKERS;
use crate::configs::DEFAULT_MSG_TYPE;
use crate::interface::RecordSink;
use crate::kafka_impl::KafkaSink;
use crate::mapper::PayloadMapper;
use crate::pipeline::run_pipeline;
use crate::pipeline::PipelineStats;
use crate::stdio_impl::LineSink;
use crate::stdio_impl::LineSource;
use crate::MapperError;
use crate::Result;
use serde::Deserialize;

/// Maps one file of records into a file, a kafka topic, or stdout when neither is given.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct MapJob {
    name: String,

    /// The file path, `~` and `$VAR` are expanded.
    input: String,

    #[serde(default)]
    output: Option<String>,

    #[serde(default)]
    topic: Option<String>,

    #[serde(default = "default_brokers")]
    brokers: String,

    #[serde(default)]
    input_format: SerdeFormat,

    #[serde(default)]
    output_format: SerdeFormat,

    #[serde(default = "default_msg_type")]
    msg_type: String,
}

fn default_brokers() -> String { DEFAULT_BROKERS.to_owned() }

fn default_msg_type() -> String { DEFAULT_MSG_TYPE.to_owned() }

fn expand(path: &str) -> Result<String> {
    shellexpand::full(path)
        .map(|x| x.into_owned())
        .map_err(|e| MapperError::Config(format!("Cannot expand path {}: {}", path, e)))
}

impl MapJob {
    pub fn name(&self) -> &str { &self.name }

    fn codec(&self) -> CodecConfig {
        CodecConfig {
            input_format:  self.input_format,
            output_format: self.output_format,
            msg_type:      self.msg_type.clone(),
        }
    }

    async fn open_sink(&self) -> Result<Box<dyn RecordSink>> {
        let sink: Box<dyn RecordSink> = match (&self.output, &self.topic) {
            (Some(_), Some(_)) => {
                return Err(MapperError::Config(format!("Job {} sets both output and topic", self.name)));
            },
            (Some(output), None) => Box::new(LineSink::create(expand(output)?).await?),
            (None, Some(topic)) => Box::new(KafkaSink::connect(KafkaProducerConfig::new(&self.brokers, topic)).await?),
            (None, None) => Box::new(LineSink::stdout()),
        };
        Ok(sink)
    }

    pub async fn run(&self) -> Result<PipelineStats> {
        let input = expand(&self.input)?;
        info!("Processing job {} from {}", self.name, input);
        let mut source = LineSource::open(&input).await?;
        let mut sink = self.open_sink().await?;
        run_pipeline(&mut source, sink.as_mut(), &EnvelopeCoder::new(self.codec()), &PayloadMapper::new(), None).await
    }
}

/// The jobs config. The jobs will be executed sequentially.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct JobsConfig {
    jobs: Vec<MapJob>,
}

impl JobsConfig {
    pub fn from_yaml(text: &str) -> Result<Self> { Ok(serde_yaml::from_str(text)?) }

    /// Read YAML config from file path.
    pub fn from_config_file(path: &str) -> Result<Self> {
        let path = expand(path)?;
        let text = std::fs::read_to_string(&path)?;
        Self::from_yaml(&text)
    }

    pub fn jobs(&self) -> &[MapJob] { &self.jobs }

    pub async fn run(&self) -> Result<PipelineStats> {
        let mut total = PipelineStats::default();
        for job in &self.jobs {
            let stats = job.run().await?;
            info!("Job {} mapped {} records, skipped {}", job.name, stats.mapped, stats.skipped);
            total.mapped += stats.mapped;
            total.skipped += stats.skipped;
        }
        Ok(total)
    }
}
