pub mod coder;
pub mod configs;
pub mod error;
pub mod interface;
pub mod jobs;
pub mod kafka_impl;
pub mod mapper;
pub mod message;
pub mod pipeline;
pub mod simulate;
pub mod stdio_impl;

pub use error::MapperError;
pub use error::Result;

#[macro_use]
extern crate async_trait;

#[macro_use]
extern crate log;
