//! Client configuration loading and validation.
//!
//! - [`types`]: the [`ClientConfig`] struct, TOML loading and builders
//! - [`validation`]: checks run before a client is allowed to connect

mod defaults;
mod types;
mod validation;

pub use types::{ClientConfig, ConfigError};
pub use validation::ValidationError;
