//! Configuration validation.
//!
//! Catches mistakes before connecting, where they would otherwise surface as
//! confusing server replies.

use asif_proto::{ChannelExt, DEFAULT_CHANTYPES, LineCodec, NickExt};
use thiserror::Error;

use super::ClientConfig;

/// Validation errors for configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("host is required")]
    MissingHost,
    #[error("port must be non-zero")]
    InvalidPort,
    #[error("invalid nickname: '{0}'")]
    InvalidNick(String),
    #[error("user must be a single non-empty word, got '{0}'")]
    InvalidUser(String),
    #[error("realname is required")]
    MissingRealname,
    #[error("realname must not contain line breaks")]
    InvalidRealname,
    #[error("password must not contain line breaks")]
    InvalidPassword,
    #[error("unknown encoding: '{0}'")]
    UnknownEncoding(String),
    #[error("invalid channel name: '{0}'")]
    InvalidChannel(String),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.host.trim().is_empty() {
        errors.push(ValidationError::MissingHost);
    }
    if config.port == 0 {
        errors.push(ValidationError::InvalidPort);
    }
    if !config.nick.is_valid_nick() {
        errors.push(ValidationError::InvalidNick(config.nick.clone()));
    }
    if config.user.is_empty() || config.user.contains([' ', '\r', '\n', '\0', '@']) {
        errors.push(ValidationError::InvalidUser(config.user.clone()));
    }
    if config.realname.trim().is_empty() {
        errors.push(ValidationError::MissingRealname);
    }
    if config.realname.contains(['\r', '\n', '\0']) {
        errors.push(ValidationError::InvalidRealname);
    }
    if let Some(ref password) = config.password
        && password.contains(['\r', '\n', '\0'])
    {
        errors.push(ValidationError::InvalidPassword);
    }
    if LineCodec::new(&config.encoding).is_err() {
        errors.push(ValidationError::UnknownEncoding(config.encoding.clone()));
    }
    for channel in &config.channels {
        if !channel.is_channel_name_in(DEFAULT_CHANTYPES) {
            errors.push(ValidationError::InvalidChannel(channel.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
