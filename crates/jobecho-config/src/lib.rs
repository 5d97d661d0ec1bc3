//! Echo configuration for jobecho
//!
//! This crate turns loosely typed configuration (TOML or command-line values)
//! into validated router settings. All errors surface here, before polling.

mod convert;
mod error;
mod file;

pub use convert::{EchoTypes, JobsValue, TypesValue, expand_numbers};
pub use error::ConfigError;
pub use file::{ConfigFile, EchoConfig};
