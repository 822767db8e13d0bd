#![cfg(unix)]

use chain_fixture::test_utils::{block_with_number, build_chain, test_genesis, write_fixture};
use client_harness::test_utils::{unused_tcp_port, FakeBehaviour, FakeClient, MockRpcServer};
use client_harness::{ClientArgs, NetworkConfig};
use ethers_core::types::H256;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::{tempdir, TempDir};
use wrong_price::{run, verify, Config, Error, Expectation, FLAG_BLOCK_HASH};

struct Scenario {
    scratch: TempDir,
    fake: FakeClient,
    config: Config,
}

impl Scenario {
    /// A fixture of genesis plus one block, and a scripted client answering on `http_port`.
    fn new(behaviour: FakeBehaviour, http_port: u16) -> Self {
        let scratch = tempdir().unwrap();
        let genesis = test_genesis();
        let blocks = build_chain(&genesis, 1);
        let (chain_path, genesis_path) =
            write_fixture(scratch.path(), "chain.rlp.gz", &genesis, &blocks).unwrap();
        Self::with_fixture(scratch, chain_path, genesis_path, behaviour, http_port)
    }

    fn with_fixture(
        scratch: TempDir,
        chain_path: PathBuf,
        genesis_path: PathBuf,
        behaviour: FakeBehaviour,
        http_port: u16,
    ) -> Self {
        let fake = FakeClient::new(behaviour).unwrap();
        let config = Config {
            harness: client_harness::Config {
                client_path: fake.path().to_path_buf(),
                args: ClientArgs {
                    datadir: Some(scratch.path().join("datadir")),
                    genesis_path,
                    chain_path,
                    ..Default::default()
                },
                network: NetworkConfig {
                    http_address: "127.0.0.1".into(),
                    http_port,
                    ..Default::default()
                },
                shutdown_timeout_secs: 2,
                ..Default::default()
            },
            skip_build: true,
            ready_timeout_millis: 3_000,
            expectation: Expectation::default(),
        };
        Self {
            scratch,
            fake,
            config,
        }
    }

    fn datadir(&self) -> PathBuf {
        self.scratch.path().join("datadir")
    }
}

fn log() -> slog::Logger {
    logging::test_logger()
}

fn assert_datadir_removed(path: &Path) {
    assert!(!path.exists(), "{} still exists", path.display());
}

#[tokio::test]
async fn head_number_after_full_lifecycle() {
    let server = MockRpcServer::new();
    server.set_head(1);
    let mut scenario = Scenario::new(FakeBehaviour::Healthy, server.port());
    scenario.config.expectation = Expectation::HeadNumber { number: 1 };

    run(&scenario.config, &log(), None).await.unwrap();

    let invocations = scenario.fake.invocations();
    assert!(invocations[0].contains(" init "), "{:?}", invocations);
    assert!(invocations[0].ends_with("genesis.json"));
    assert!(invocations[1].contains(" import "));
    assert!(invocations[1].ends_with("chain.rlp.gz"));
    assert_datadir_removed(&scenario.datadir());
}

#[tokio::test]
async fn flag_block_hash_matches() {
    let server = MockRpcServer::new();
    server.set_head(1);
    server.insert_block(1, FLAG_BLOCK_HASH);
    let scenario = Scenario::new(FakeBehaviour::Healthy, server.port());

    run(&scenario.config, &log(), None).await.unwrap();
    assert_datadir_removed(&scenario.datadir());
}

#[tokio::test]
async fn sequence_error_never_touches_the_client() {
    let scratch = tempdir().unwrap();
    let genesis = test_genesis();
    let block_two = block_with_number(&genesis.to_block(), 2);
    let (chain_path, genesis_path) =
        write_fixture(scratch.path(), "chain.rlp", &genesis, &[block_two]).unwrap();
    let scenario = Scenario::with_fixture(
        scratch,
        chain_path,
        genesis_path,
        FakeBehaviour::Healthy,
        8545,
    );

    let result = run(&scenario.config, &log(), None).await;

    assert!(
        matches!(
            result,
            Err(Error::Fixture(chain_fixture::Error::Sequence {
                index: 0,
                expected: 1,
                got: 2
            }))
        ),
        "{:?}",
        result
    );
    assert!(scenario.fake.invocations().is_empty());
    assert!(!scenario.datadir().exists());
}

#[tokio::test]
async fn hash_mismatch_fails_and_cleans_up() {
    let server = MockRpcServer::new();
    server.set_head(1);
    server.insert_block(1, H256::repeat_byte(0x11));
    let scenario = Scenario::new(FakeBehaviour::Healthy, server.port());

    let result = run(&scenario.config, &log(), None).await;

    match result {
        Err(Error::AssertionFailed { expected, actual }) => {
            assert!(expected.contains(&format!("{:?}", FLAG_BLOCK_HASH)));
            assert!(actual.contains(&format!("{:?}", H256::repeat_byte(0x11))));
        }
        other => panic!("unexpected result {:?}", other),
    }
    assert_datadir_removed(&scenario.datadir());
}

#[tokio::test]
async fn missing_block_is_a_mismatch() {
    let server = MockRpcServer::new();
    let scenario = Scenario::new(FakeBehaviour::Healthy, server.port());

    match run(&scenario.config, &log(), None).await {
        Err(Error::AssertionFailed { actual, .. }) => assert_eq!(actual, "no block 1"),
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn unreachable_client() {
    let mut scenario = Scenario::new(FakeBehaviour::Healthy, unused_tcp_port().unwrap());
    scenario.config.ready_timeout_millis = 300;

    let result = run(&scenario.config, &log(), None).await;

    assert!(
        matches!(result, Err(Error::Unreachable { timeout, .. }) if timeout == Duration::from_millis(300)),
        "{:?}",
        result
    );
    assert_datadir_removed(&scenario.datadir());
}

#[tokio::test]
async fn init_failure_is_propagated() {
    let server = MockRpcServer::new();
    let scenario = Scenario::new(
        FakeBehaviour::FailOn(client_harness::InitStep::Import),
        server.port(),
    );

    let result = run(&scenario.config, &log(), None).await;

    assert!(
        matches!(
            result,
            Err(Error::Client(client_harness::Error::Init {
                step: client_harness::InitStep::Import,
                ..
            }))
        ),
        "{:?}",
        result
    );
    assert_eq!(server.request_count(), 0);
    assert_datadir_removed(&scenario.datadir());
}

#[tokio::test]
async fn build_failure_is_propagated() {
    let mut scenario = Scenario::new(FakeBehaviour::Healthy, 8545);
    scenario.config.skip_build = false;

    let result = run(&scenario.config, &log(), None).await;

    assert!(
        matches!(result, Err(Error::Client(client_harness::Error::Build(_)))),
        "{:?}",
        result
    );
    assert!(scenario.fake.invocations().is_empty());
}

#[tokio::test]
async fn shutdown_signal_cancels_the_wait() {
    let mut scenario = Scenario::new(FakeBehaviour::Healthy, unused_tcp_port().unwrap());
    scenario.config.ready_timeout_millis = 30_000;

    let (signal, exit) = exit_future::signal();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        signal.fire().ok();
    });

    let result = run(&scenario.config, &log(), Some(exit)).await;

    assert!(matches!(result, Err(Error::Cancelled)), "{:?}", result);
    assert_datadir_removed(&scenario.datadir());
}

#[tokio::test]
async fn verify_makes_one_call() {
    let server = MockRpcServer::new();
    server.set_head(4);
    let rpc = client_harness::HttpJsonRpc::new(server.url()).unwrap();

    verify(&rpc, &Expectation::HeadNumber { number: 4 }, &log())
        .await
        .unwrap();
    assert_eq!(server.request_count(), 1);

    assert!(matches!(
        verify(&rpc, &Expectation::HeadNumber { number: 5 }, &log()).await,
        Err(Error::AssertionFailed { .. })
    ));
}
