//! Integration test common infrastructure.
//!
//! Provides a scripted IRC server for driving a real `Client` over TCP and
//! asserting on the lines it sends.

pub mod server;

#[allow(unused_imports)]
pub use server::{MockConnection, MockServer};

use asif::ClientConfig;

/// Config pointing at a mock server.
#[allow(dead_code)]
pub fn config_for(server: &MockServer, nick: &str) -> ClientConfig {
    ClientConfig::new("127.0.0.1", server.port(), nick)
}
