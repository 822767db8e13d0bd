//! Stand-ins for a real client: a mock JSON-RPC endpoint and a scripted client binary.

use crate::execution_client::InitStep;
use ethers_core::types::H256;
use reqwest::Url;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::net::{SocketAddr, TcpListener};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use warp::http::StatusCode;
use warp::Filter;

struct MockState {
    head: AtomicU64,
    blocks: Mutex<HashMap<u64, H256>>,
    ready_at: Instant,
    requests: AtomicUsize,
}

impl MockState {
    fn handle(&self, body: Value) -> (StatusCode, Value) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if Instant::now() < self.ready_at {
            return (StatusCode::SERVICE_UNAVAILABLE, json!({}));
        }

        let id = body.get("id").cloned().unwrap_or(Value::Null);
        let method = body.get("method").and_then(Value::as_str).unwrap_or_default();
        let result = match method {
            "eth_blockNumber" => Ok(json!(format!(
                "{:#x}",
                self.head.load(Ordering::SeqCst)
            ))),
            "eth_getBlockByNumber" => {
                let number = body["params"][0]
                    .as_str()
                    .and_then(|n| n.strip_prefix("0x"))
                    .and_then(|n| u64::from_str_radix(n, 16).ok());
                let blocks = self.blocks.lock().expect("mock state lock poisoned");
                Ok(match number.and_then(|n| blocks.get(&n).map(|hash| (n, hash))) {
                    Some((number, hash)) => json!({
                        "hash": format!("{:?}", hash),
                        "parentHash": format!("{:?}", H256::zero()),
                        "number": format!("{:#x}", number),
                    }),
                    None => Value::Null,
                })
            }
            other => Err(json!({
                "code": -32601,
                "message": format!("the method {} does not exist/is not available", other),
            })),
        };

        let response = match result {
            Ok(result) => json!({"jsonrpc": "2.0", "id": id, "result": result}),
            Err(error) => json!({"jsonrpc": "2.0", "id": id, "error": error}),
        };
        (StatusCode::OK, response)
    }
}

/// A JSON-RPC server answering `eth_blockNumber` and `eth_getBlockByNumber` from in-memory state.
///
/// Must be created inside a tokio runtime. The server stops when this is dropped.
pub struct MockRpcServer {
    addr: SocketAddr,
    state: Arc<MockState>,
    _shutdown: exit_future::Signal,
}

impl MockRpcServer {
    pub fn new() -> Self {
        Self::ready_after(Duration::ZERO)
    }

    /// Respond with `503 Service Unavailable` until `delay` has elapsed.
    pub fn ready_after(delay: Duration) -> Self {
        let state = Arc::new(MockState {
            head: AtomicU64::new(0),
            blocks: Mutex::new(HashMap::new()),
            ready_at: Instant::now() + delay,
            requests: AtomicUsize::new(0),
        });

        let filter_state = state.clone();
        let routes = warp::post()
            .and(warp::body::json())
            .map(move |body: Value| {
                let (status, response) = filter_state.handle(body);
                warp::reply::with_status(warp::reply::json(&response), status)
            });

        let (shutdown, exit) = exit_future::signal();
        let (addr, server) = warp::serve(routes)
            .try_bind_with_graceful_shutdown(([127, 0, 0, 1], 0), async move {
                exit.await;
            })
            .expect("mock rpc server should bind to an ephemeral port");
        tokio::spawn(server);

        Self {
            addr,
            state,
            _shutdown: shutdown,
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn url(&self) -> Url {
        Url::parse(&format!("http://{}", self.addr)).expect("socket address is a valid url")
    }

    pub fn set_head(&self, number: u64) {
        self.state.head.store(number, Ordering::SeqCst);
    }

    pub fn insert_block(&self, number: u64, hash: H256) {
        self.state
            .blocks
            .lock()
            .expect("mock state lock poisoned")
            .insert(number, hash);
    }

    pub fn request_count(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }
}

impl Default for MockRpcServer {
    fn default() -> Self {
        Self::new()
    }
}

/// A bit of hack to find an unused TCP port.
///
/// Does not guarantee that the given port is unused after the function exits, just that it was
/// unused before the function started (i.e., it does not reserve a port).
pub fn unused_tcp_port() -> Result<u16, String> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .map_err(|e| format!("Failed to create TCP listener to find unused port: {:?}", e))?;
    let local_addr = listener.local_addr().map_err(|e| {
        format!(
            "Failed to read TCP listener local_addr to find unused port: {:?}",
            e
        )
    })?;
    Ok(local_addr.port())
}

/// How a scripted client binary behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeBehaviour {
    /// `init`/`import` succeed, anything else runs until signalled.
    Healthy,
    /// The given step exits non-zero.
    FailOn(InitStep),
    /// Like `Healthy` but the long-running process ignores SIGTERM.
    IgnoreSigterm,
    /// The long-running process exits immediately.
    ExitOnStart,
}

/// A client source tree holding a shell script at `build/bin/geth`.
///
/// Every invocation appends its arguments to `invocations.log` in the tree's root.
pub struct FakeClient {
    dir: TempDir,
}

impl FakeClient {
    pub fn new(behaviour: FakeBehaviour) -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("fake-client-").tempdir()?;
        let bin = dir.path().join("build").join("bin");
        fs::create_dir_all(&bin)?;

        let log = dir.path().join("invocations.log");
        let (preamble, fail_on, long_running) = match behaviour {
            FakeBehaviour::Healthy => ("", "", "exec sleep 60"),
            FakeBehaviour::FailOn(step) => ("", step_name(step), "exec sleep 60"),
            FakeBehaviour::IgnoreSigterm => ("trap '' TERM", "", "exec sleep 60"),
            FakeBehaviour::ExitOnStart => ("", "", "exit 0"),
        };
        let script = format!(
            r#"#!/bin/sh
{preamble}
echo "$@" >> "{log}"
for arg in "$@"; do
    case "$arg" in
        init|import)
            if [ "$arg" = "{fail_on}" ]; then
                echo "Fatal: $arg failed" >&2
                exit 1
            fi
            exit 0
            ;;
    esac
done
{long_running}
"#,
            preamble = preamble,
            log = log.display(),
            fail_on = fail_on,
            long_running = long_running,
        );

        let binary = bin.join("geth");
        fs::write(&binary, script)?;
        make_executable(&binary)?;

        Ok(Self { dir })
    }

    /// Use as `Config::client_path`.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn binary(&self) -> PathBuf {
        self.dir.path().join("build").join("bin").join("geth")
    }

    /// Wait until the binary has been invoked `count` times. The long-running invocation is
    /// logged only once the script is up, so this also waits for it to install its traps.
    pub async fn wait_for_invocations(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.invocations().len() < count {
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        true
    }

    /// The argument lists the binary has been invoked with, oldest first.
    pub fn invocations(&self) -> Vec<String> {
        fs::read_to_string(self.dir.path().join("invocations.log"))
            .map(|log| log.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

fn step_name(step: InitStep) -> &'static str {
    match step {
        InitStep::Init => "init",
        InitStep::Import => "import",
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}
