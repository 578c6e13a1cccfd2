use std::fmt::Debug;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MapperError {
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Kafka(#[from] kafka::error::Error),
    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, MapperError>;
