//! Drives an execution client binary through its lifecycle: build, initialize from a genesis and a
//! chain fixture, start, wait for its JSON-RPC endpoint and tear it down again.
//!
//! Only geth is supported; other clients plug in by implementing `GenericExecutionClient`.

pub mod build_utils;
mod config;
mod error;
mod execution_client;
mod geth;
pub mod rpc;
pub mod test_utils;

pub use config::{
    ClientArgs, Config, LogLevel, NetworkConfig, DEFAULT_HTTP_ADDRESS, DEFAULT_HTTP_PORT,
    DEFAULT_LISTEN_PORT, DEFAULT_SHUTDOWN_TIMEOUT_SECS,
};
pub use error::Error;
pub use execution_client::{
    Client, ClientProcess, ClientState, GenericExecutionClient, InitStep, READY_POLL_INTERVAL,
};
pub use geth::Geth;
pub use rpc::{HttpJsonRpc, RpcBlock};

use serde::{Deserialize, Serialize};
use slog::Logger;
use std::fmt;
use std::str::FromStr;

/// The supported client families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientType {
    #[default]
    Geth,
}

impl FromStr for ClientType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "geth" | "go-ethereum" => Ok(ClientType::Geth),
            _ => Err(Error::UnknownClientType(s.to_string())),
        }
    }
}

impl fmt::Display for ClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientType::Geth => f.write_str("geth"),
        }
    }
}

/// Construct the controller for `config.client_type`.
pub fn new_client(config: &Config, log: Logger) -> Result<Box<dyn Client>, Error> {
    match config.client_type {
        ClientType::Geth => Ok(Box::new(ClientProcess::new(Geth, config, log)?)),
    }
}
