//! The `wrong-price` flag check.
//!
//! Loads the chain fixture, drives a client through build, init and start, then makes exactly one
//! RPC call and compares the answer with the expected value. The flag is captured when they match.

pub mod cli;
mod config;
mod error;

pub use config::{Config, Expectation, DEFAULT_READY_TIMEOUT_MILLIS, FLAG_BLOCK_HASH};
pub use error::Error;

use chain_fixture::{load_chain, Chain};
use client_harness::rpc::DEFAULT_RPC_TIMEOUT;
use client_harness::{new_client, Client, HttpJsonRpc};
use futures::FutureExt;
use slog::{debug, info, warn, Logger};

/// Load the fixture, construct the configured client and check the flag against it.
///
/// A fixture which fails to load is reported before any client is constructed.
pub async fn run(config: &Config, log: &Logger, exit: Option<exit_future::Exit>) -> Result<(), Error> {
    let args = &config.harness.args;
    let chain = load_chain(&args.chain_path, &args.genesis_path)?;
    info!(
        log,
        "Loaded chain fixture";
        "blocks" => chain.len(),
        "head" => chain.head().number(),
        "chain_id" => chain.genesis().chain_id(),
    );
    log_fixture_expectation(&chain, &config.expectation, log);

    let mut client = new_client(&config.harness, log.clone())?;
    check_flag(client.as_mut(), config, exit, log).await
}

/// Drive `client` through its lifecycle and verify the expectation.
///
/// The client is closed on every path; a close failure is reported only if the check itself
/// succeeded.
pub async fn check_flag(
    client: &mut dyn Client,
    config: &Config,
    exit: Option<exit_future::Exit>,
    log: &Logger,
) -> Result<(), Error> {
    let result = drive(client, config, exit, log).await;
    let closed = client.close().await;

    match (result, closed) {
        (Err(e), Err(close_error)) => {
            warn!(log, "Failed to close client"; "error" => %close_error);
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
        (Ok(()), Err(e)) => Err(Error::Client(e)),
        (Ok(()), Ok(())) => Ok(()),
    }
}

async fn drive(
    client: &mut dyn Client,
    config: &Config,
    exit: Option<exit_future::Exit>,
    log: &Logger,
) -> Result<(), Error> {
    if config.skip_build {
        client.mark_built()?;
    } else {
        client.build().await?;
    }
    client.init().await?;
    client.start().await?;

    let timeout = config.ready_timeout();
    if !client.wait_until_ready(timeout, exit.clone()).await {
        if exit.map_or(false, |exit| exit.now_or_never().is_some()) {
            return Err(Error::Cancelled);
        }
        return Err(Error::Unreachable {
            endpoint: client.rpc().url().to_string(),
            timeout,
        });
    }

    verify(client.rpc(), &config.expectation, log).await
}

/// Make the single assertion call.
pub async fn verify(rpc: &HttpJsonRpc, expectation: &Expectation, log: &Logger) -> Result<(), Error> {
    match expectation {
        Expectation::HeadNumber { number } => {
            let head = rpc.block_number(DEFAULT_RPC_TIMEOUT).await?;
            debug!(log, "Client head"; "number" => head);
            if head != *number {
                return Err(Error::AssertionFailed {
                    expected: format!("head block {}", number),
                    actual: format!("head block {}", head),
                });
            }
        }
        Expectation::BlockHash { number, hash } => {
            let block = rpc.block_by_number(*number, DEFAULT_RPC_TIMEOUT).await?;
            match block {
                Some(block) if block.hash == *hash => {
                    debug!(log, "Client block"; "number" => number, "hash" => ?block.hash);
                }
                Some(block) => {
                    return Err(Error::AssertionFailed {
                        expected: format!("block {} with hash {:?}", number, hash),
                        actual: format!("hash {:?}", block.hash),
                    })
                }
                None => {
                    return Err(Error::AssertionFailed {
                        expected: format!("block {} with hash {:?}", number, hash),
                        actual: format!("no block {}", number),
                    })
                }
            }
        }
    }

    info!(log, "Expectation met"; "expectation" => ?expectation);
    Ok(())
}

/// Say up front whether the fixture itself satisfies a hash expectation.
fn log_fixture_expectation(chain: &Chain, expectation: &Expectation, log: &Logger) {
    if let Expectation::BlockHash { number, hash } = expectation {
        match chain.block(*number) {
            Some(block) if block.hash() == *hash => {
                debug!(log, "Fixture contains the expected block"; "number" => number)
            }
            Some(block) => warn!(
                log,
                "Fixture block differs from the expected block";
                "number" => number,
                "fixture_hash" => ?block.hash(),
                "expected_hash" => ?hash,
            ),
            None => warn!(log, "Fixture does not contain the expected block"; "number" => number),
        }
    }
}
