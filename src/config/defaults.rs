//! Default value functions for configuration.

pub fn default_port() -> u16 {
    6667
}

pub fn default_user() -> String {
    "bot".to_string()
}

pub fn default_realname() -> String {
    "The Bot".to_string()
}

pub fn default_encoding() -> String {
    "utf-8".to_string()
}
