use crate::config::{Config, Expectation};
use clap::{Arg, ArgAction, ArgMatches, Command};
use client_harness::LogLevel;
use ethers_core::types::H256;
use logging::LogFormat;
use std::path::PathBuf;
use std::str::FromStr;

pub const CMD: &str = "wrong-price";
pub const CONFIG_FLAG: &str = "config";
pub const CLIENT_PATH_FLAG: &str = "client-path";
pub const CLIENT_TYPE_FLAG: &str = "client";
pub const GENESIS_FLAG: &str = "genesis";
pub const CHAIN_FLAG: &str = "chain";
pub const DATADIR_FLAG: &str = "datadir";
pub const LOGLEVEL_FLAG: &str = "loglevel";
pub const LOG_FORMAT_FLAG: &str = "log-format";
pub const QUIET_FLAG: &str = "quiet";
pub const VERBOSE_FLAG: &str = "verbose";
pub const SKIP_BUILD_FLAG: &str = "skip-build";
pub const DISABLE_FAKEPOW_FLAG: &str = "disable-fakepow";
pub const PORT_FLAG: &str = "port";
pub const HTTP_ADDRESS_FLAG: &str = "http-address";
pub const HTTP_PORT_FLAG: &str = "http-port";
pub const TIMEOUT_FLAG: &str = "timeout";
pub const EXPECT_HEAD_FLAG: &str = "expect-head";
pub const EXPECT_BLOCK_HASH_FLAG: &str = "expect-block-hash";

pub fn cli_app() -> Command {
    Command::new(CMD)
        .about(
            "Imports a chain fixture into an execution client and checks the client serves \
            the expected block. Prints \"Flag captured.\" on success.",
        )
        .arg(
            Arg::new(CONFIG_FLAG)
                .long(CONFIG_FLAG)
                .value_name("TOML_FILE")
                .help(
                    "A TOML file providing defaults for every other option. Flags given on \
                    the command line take precedence.",
                )
                .action(ArgAction::Set)
                .display_order(0),
        )
        .arg(
            Arg::new(CLIENT_PATH_FLAG)
                .long(CLIENT_PATH_FLAG)
                .value_name("DIR")
                .help("Root of the client's source tree. [default: go-ethereum]")
                .action(ArgAction::Set)
                .display_order(0),
        )
        .arg(
            Arg::new(CLIENT_TYPE_FLAG)
                .long(CLIENT_TYPE_FLAG)
                .value_name("CLIENT")
                .help("The client family under test.")
                .value_parser(["geth"])
                .action(ArgAction::Set)
                .display_order(0),
        )
        .arg(
            Arg::new(GENESIS_FLAG)
                .long(GENESIS_FLAG)
                .value_name("FILE")
                .help("Path to the genesis JSON. [default: genesis.json]")
                .action(ArgAction::Set)
                .display_order(0),
        )
        .arg(
            Arg::new(CHAIN_FLAG)
                .long(CHAIN_FLAG)
                .value_name("FILE")
                .help(
                    "Path to the RLP chain file. A .gz, .sz or .snappy suffix is \
                    decompressed transparently. [default: chain.rlp]",
                )
                .action(ArgAction::Set)
                .display_order(0),
        )
        .arg(
            Arg::new(DATADIR_FLAG)
                .long(DATADIR_FLAG)
                .value_name("DIR")
                .help(
                    "Data directory for the client. Removed when the check finishes. A \
                    temporary directory is used if unset.",
                )
                .action(ArgAction::Set)
                .display_order(0),
        )
        .arg(
            Arg::new(LOGLEVEL_FLAG)
                .long(LOGLEVEL_FLAG)
                .value_name("LEVEL")
                .help("Log level for the harness and the client. [default: error]")
                .value_parser(["none", "error", "warn", "info", "debug", "trace"])
                .action(ArgAction::Set)
                .display_order(0),
        )
        .arg(
            Arg::new(LOG_FORMAT_FLAG)
                .long(LOG_FORMAT_FLAG)
                .value_name("FORMAT")
                .help("Format of the harness logs.")
                .value_parser(["terminal", "json"])
                .default_value("terminal")
                .action(ArgAction::Set)
                .display_order(0),
        )
        .arg(
            Arg::new(QUIET_FLAG)
                .long(QUIET_FLAG)
                .help("Don't print any logs.")
                .action(ArgAction::SetTrue)
                .display_order(0),
        )
        .arg(
            Arg::new(VERBOSE_FLAG)
                .long(VERBOSE_FLAG)
                .help("Stream the client's own output instead of capturing it.")
                .action(ArgAction::SetTrue)
                .display_order(0),
        )
        .arg(
            Arg::new(SKIP_BUILD_FLAG)
                .long(SKIP_BUILD_FLAG)
                .help("Use the client binary from a previous build.")
                .action(ArgAction::SetTrue)
                .display_order(0),
        )
        .arg(
            Arg::new(DISABLE_FAKEPOW_FLAG)
                .long(DISABLE_FAKEPOW_FLAG)
                .help("Verify proof-of-work of imported blocks.")
                .action(ArgAction::SetTrue)
                .display_order(0),
        )
        .arg(
            Arg::new(PORT_FLAG)
                .long(PORT_FLAG)
                .value_name("PORT")
                .help("The client's p2p listen port. [default: 33333]")
                .action(ArgAction::Set)
                .display_order(0),
        )
        .arg(
            Arg::new(HTTP_ADDRESS_FLAG)
                .long(HTTP_ADDRESS_FLAG)
                .value_name("ADDRESS")
                .help("Address the client's HTTP RPC listens on. [default: localhost]")
                .action(ArgAction::Set)
                .display_order(0),
        )
        .arg(
            Arg::new(HTTP_PORT_FLAG)
                .long(HTTP_PORT_FLAG)
                .value_name("PORT")
                .help("Port of the client's HTTP RPC. [default: 8545]")
                .action(ArgAction::Set)
                .display_order(0),
        )
        .arg(
            Arg::new(TIMEOUT_FLAG)
                .long(TIMEOUT_FLAG)
                .value_name("MILLISECONDS")
                .help("How long to wait for the client's RPC to come up. [default: 3000]")
                .action(ArgAction::Set)
                .display_order(0),
        )
        .arg(
            Arg::new(EXPECT_HEAD_FLAG)
                .long(EXPECT_HEAD_FLAG)
                .value_name("NUMBER")
                .help("Expect the client's head block to have this number.")
                .conflicts_with(EXPECT_BLOCK_HASH_FLAG)
                .action(ArgAction::Set)
                .display_order(0),
        )
        .arg(
            Arg::new(EXPECT_BLOCK_HASH_FLAG)
                .long(EXPECT_BLOCK_HASH_FLAG)
                .value_name("NUMBER:HASH")
                .help("Expect block NUMBER to have HASH. [default: the flag block]")
                .action(ArgAction::Set)
                .display_order(0),
        )
}

/// Everything the binary needs: the check's configuration plus how to log.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    pub config: Config,
    pub log_format: LogFormat,
    pub quiet: bool,
}

impl RunOptions {
    pub fn from_cli(matches: &ArgMatches) -> Result<Self, String> {
        let mut config = match parse_optional::<PathBuf>(matches, CONFIG_FLAG)? {
            Some(path) => Config::read_from_file(path)?,
            None => Config::default(),
        };

        let harness = &mut config.harness;
        if let Some(client_type) = parse_optional(matches, CLIENT_TYPE_FLAG)? {
            harness.client_type = client_type;
        }
        if let Some(path) = parse_optional(matches, CLIENT_PATH_FLAG)? {
            harness.client_path = path;
        }
        if let Some(path) = parse_optional(matches, GENESIS_FLAG)? {
            harness.args.genesis_path = path;
        }
        if let Some(path) = parse_optional(matches, CHAIN_FLAG)? {
            harness.args.chain_path = path;
        }
        if let Some(path) = parse_optional(matches, DATADIR_FLAG)? {
            harness.args.datadir = Some(path);
        }
        if let Some(level) = parse_optional::<LogLevel>(matches, LOGLEVEL_FLAG)? {
            harness.args.log_level = level;
        }
        if matches.get_flag(DISABLE_FAKEPOW_FLAG) {
            harness.args.fakepow = false;
        }
        if matches.get_flag(VERBOSE_FLAG) {
            harness.verbose = true;
        }
        if let Some(port) = parse_optional(matches, PORT_FLAG)? {
            harness.network.listen_port = port;
        }
        if let Some(address) = parse_optional(matches, HTTP_ADDRESS_FLAG)? {
            harness.network.http_address = address;
        }
        if let Some(port) = parse_optional(matches, HTTP_PORT_FLAG)? {
            harness.network.http_port = port;
        }

        if matches.get_flag(SKIP_BUILD_FLAG) {
            config.skip_build = true;
        }
        if let Some(millis) = parse_optional(matches, TIMEOUT_FLAG)? {
            config.ready_timeout_millis = millis;
        }
        if let Some(number) = parse_optional(matches, EXPECT_HEAD_FLAG)? {
            config.expectation = Expectation::HeadNumber { number };
        }
        if let Some(value) = parse_optional::<String>(matches, EXPECT_BLOCK_HASH_FLAG)? {
            config.expectation = parse_block_hash_expectation(&value)?;
        }

        Ok(Self {
            config,
            log_format: parse_optional(matches, LOG_FORMAT_FLAG)?.unwrap_or_default(),
            quiet: matches.get_flag(QUIET_FLAG),
        })
    }
}

/// Parse an optional flag value with `FromStr`.
pub fn parse_optional<T>(matches: &ArgMatches, name: &str) -> Result<Option<T>, String>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    matches
        .get_one::<String>(name)
        .map(|value| {
            value
                .parse()
                .map_err(|e| format!("Unable to parse --{}: {}", name, e))
        })
        .transpose()
}

fn parse_block_hash_expectation(value: &str) -> Result<Expectation, String> {
    let (number, hash) = value
        .split_once(':')
        .ok_or_else(|| format!("Expected NUMBER:HASH, got {}", value))?;
    Ok(Expectation::BlockHash {
        number: number
            .parse()
            .map_err(|e| format!("Invalid block number {}: {}", number, e))?,
        hash: H256::from_str(hash).map_err(|e| format!("Invalid block hash {}: {}", hash, e))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FLAG_BLOCK_HASH;

    fn parse_args(args: &[&str]) -> Result<RunOptions, String> {
        let matches = cli_app()
            .try_get_matches_from(std::iter::once(CMD).chain(args.iter().copied()))
            .map_err(|e| e.to_string())?;
        RunOptions::from_cli(&matches)
    }

    #[test]
    fn defaults() {
        let options = parse_args(&[]).unwrap();
        assert_eq!(options.config, Config::default());
        assert_eq!(options.log_format, LogFormat::Terminal);
        assert!(!options.quiet);
        assert_eq!(
            options.config.expectation,
            Expectation::BlockHash {
                number: 1,
                hash: FLAG_BLOCK_HASH
            }
        );
    }

    #[test]
    fn flags_override() {
        let options = parse_args(&[
            "--client-path",
            "/src/geth",
            "--genesis",
            "g.json",
            "--chain",
            "c.rlp.gz",
            "--datadir",
            "/tmp/d",
            "--loglevel",
            "trace",
            "--log-format",
            "json",
            "--quiet",
            "--verbose",
            "--skip-build",
            "--disable-fakepow",
            "--port",
            "30303",
            "--http-address",
            "127.0.0.1",
            "--http-port",
            "18545",
            "--timeout",
            "250",
            "--expect-head",
            "7",
        ])
        .unwrap();

        let config = &options.config;
        assert_eq!(config.harness.client_path, PathBuf::from("/src/geth"));
        assert_eq!(config.harness.args.genesis_path, PathBuf::from("g.json"));
        assert_eq!(config.harness.args.chain_path, PathBuf::from("c.rlp.gz"));
        assert_eq!(config.harness.args.datadir, Some(PathBuf::from("/tmp/d")));
        assert_eq!(config.harness.args.log_level, LogLevel::Trace);
        assert!(!config.harness.args.fakepow);
        assert!(config.harness.verbose);
        assert_eq!(config.harness.network.listen_port, 30303);
        assert_eq!(config.harness.network.http_address, "127.0.0.1");
        assert_eq!(config.harness.network.http_port, 18545);
        assert!(config.skip_build);
        assert_eq!(config.ready_timeout_millis, 250);
        assert_eq!(config.expectation, Expectation::HeadNumber { number: 7 });
        assert_eq!(options.log_format, LogFormat::Json);
        assert!(options.quiet);
    }

    #[test]
    fn block_hash_expectation() {
        let hash = format!("{:?}", H256::repeat_byte(0xab));
        let options = parse_args(&["--expect-block-hash", format!("5:{}", hash).as_str()]).unwrap();
        assert_eq!(
            options.config.expectation,
            Expectation::BlockHash {
                number: 5,
                hash: H256::repeat_byte(0xab)
            }
        );

        assert!(parse_args(&["--expect-block-hash", "5"]).is_err());
        assert!(parse_args(&["--expect-block-hash", "x:0x00"]).is_err());
    }

    #[test]
    fn invalid_values() {
        assert!(parse_args(&["--http-port", "99999"]).is_err());
        assert!(parse_args(&["--loglevel", "loud"]).is_err());
        assert!(parse_args(&["--expect-head", "1", "--expect-block-hash", "1:0x00"]).is_err());
    }

    #[test]
    fn config_file_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "skip_build = true\n[harness.network]\nhttp_port = 9000\nlisten_port = 40000\n",
        )
        .unwrap();

        let options = parse_args(&[
            "--config",
            path.to_str().unwrap(),
            "--http-port",
            "9001",
        ])
        .unwrap();
        assert!(options.config.skip_build);
        assert_eq!(options.config.harness.network.http_port, 9001);
        assert_eq!(options.config.harness.network.listen_port, 40000);

        assert!(parse_args(&["--config", "/no/such/config.toml"]).is_err());
    }
}
