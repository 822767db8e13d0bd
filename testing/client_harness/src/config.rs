use crate::ClientType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_LISTEN_PORT: u16 = 33333;
pub const DEFAULT_HTTP_ADDRESS: &str = "localhost";
pub const DEFAULT_HTTP_PORT: u16 = 8545;
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 10;

/// Logging verbosity, shared by the harness logger and the client's `--verbosity` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    None,
    #[default]
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// The numeric verbosity understood by geth, `0` (silent) to `5` (trace).
    pub fn verbosity(self) -> u8 {
        match self {
            LogLevel::None => 0,
            LogLevel::Error => 1,
            LogLevel::Warn => 2,
            LogLevel::Info => 3,
            LogLevel::Debug => 4,
            LogLevel::Trace => 5,
        }
    }

    pub fn as_slog(self) -> Option<slog::Level> {
        match self {
            LogLevel::None => None,
            LogLevel::Error => Some(slog::Level::Error),
            LogLevel::Warn => Some(slog::Level::Warning),
            LogLevel::Info => Some(slog::Level::Info),
            LogLevel::Debug => Some(slog::Level::Debug),
            LogLevel::Trace => Some(slog::Level::Trace),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "off" | "silent" => Ok(LogLevel::None),
            "error" | "crit" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("unknown log level: {}", other)),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::None => "none",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };
        f.write_str(s)
    }
}

/// Arguments passed to the client on `init`, `import` and start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientArgs {
    /// Skip proof-of-work verification of imported blocks.
    pub fakepow: bool,
    pub log_level: LogLevel,
    /// A fresh temporary directory is used when unset.
    pub datadir: Option<PathBuf>,
    pub genesis_path: PathBuf,
    pub chain_path: PathBuf,
}

impl Default for ClientArgs {
    fn default() -> Self {
        Self {
            fakepow: true,
            log_level: LogLevel::default(),
            datadir: None,
            genesis_path: PathBuf::from("genesis.json"),
            chain_path: PathBuf::from("chain.rlp"),
        }
    }
}

/// Where the client listens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub listen_port: u16,
    pub http_address: String,
    pub http_port: u16,
    pub http_api: Vec<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_port: DEFAULT_LISTEN_PORT,
            http_address: DEFAULT_HTTP_ADDRESS.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            http_api: vec!["admin".into(), "eth".into(), "debug".into()],
        }
    }
}

impl NetworkConfig {
    pub fn http_endpoint(&self) -> String {
        format!("http://{}:{}", self.http_address, self.http_port)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub client_type: ClientType,
    /// Root of the client's source tree.
    pub client_path: PathBuf,
    pub args: ClientArgs,
    pub network: NetworkConfig,
    /// Stream the client's output instead of capturing or discarding it.
    pub verbose: bool,
    /// How long to wait for the client to exit after SIGTERM before sending SIGKILL.
    pub shutdown_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_type: ClientType::Geth,
            client_path: PathBuf::from("go-ethereum"),
            args: ClientArgs::default(),
            network: NetworkConfig::default(),
            verbose: false,
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
        }
    }
}

impl Config {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_mapping() {
        let levels = [
            LogLevel::None,
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Trace,
        ];
        for (i, level) in levels.iter().enumerate() {
            assert_eq!(level.verbosity() as usize, i);
            assert_eq!(level.to_string().parse::<LogLevel>(), Ok(*level));
        }
        assert_eq!(LogLevel::None.as_slog(), None);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn defaults_match_fixed_harness_values() {
        let config = Config::default();
        assert_eq!(config.network.listen_port, 33333);
        assert_eq!(config.network.http_endpoint(), "http://localhost:8545");
        assert_eq!(config.network.http_api.join(","), "admin,eth,debug");
        assert!(config.args.fakepow);
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(10));
    }
}
