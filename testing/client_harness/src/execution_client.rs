use crate::build_utils::{build_stdio, run_to_completion, CommandLine};
use crate::config::{ClientArgs, Config, NetworkConfig};
use crate::error::Error;
use crate::rpc::HttpJsonRpc;
use async_trait::async_trait;
use reqwest::Url;
use slog::{debug, info, trace, warn, Logger};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Stdio};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::{sleep, Instant};

/// Delay between readiness attempts.
pub const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Delay between checks for process exit during shutdown.
const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Lifecycle of a client process. `Closed` is terminal and reachable from every state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Uninitialized,
    Built,
    Initialized,
    Running,
    Closed,
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ClientState::Uninitialized => "uninitialized",
            ClientState::Built => "built",
            ClientState::Initialized => "initialized",
            ClientState::Running => "running",
            ClientState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// The one-shot commands run during initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStep {
    /// Write the genesis block into the data directory.
    Init,
    /// Import the chain file.
    Import,
}

impl fmt::Display for InitStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitStep::Init => f.write_str("init"),
            InitStep::Import => f.write_str("import"),
        }
    }
}

/// Defined for each client family (e.g., geth). Produces the command lines, nothing more.
pub trait GenericExecutionClient: Send + Sync {
    fn name(&self) -> &'static str;
    fn build_command(&self, client_path: &Path) -> CommandLine;
    fn binary_path(&self, client_path: &Path) -> PathBuf;
    fn init_commands(
        &self,
        binary: &Path,
        datadir: &Path,
        args: &ClientArgs,
    ) -> Vec<(InitStep, CommandLine)>;
    fn start_command(
        &self,
        binary: &Path,
        datadir: &Path,
        args: &ClientArgs,
        network: &NetworkConfig,
    ) -> CommandLine;
}

/// A client under test.
///
/// Operations must be called in lifecycle order; an out-of-order call returns
/// `Error::InvalidTransition` and leaves the state untouched. `close` may be called at any time and
/// any number of times.
#[async_trait]
pub trait Client: Send {
    fn name(&self) -> &'static str;

    fn state(&self) -> ClientState;

    fn datadir(&self) -> &Path;

    /// Compile the client from source.
    async fn build(&mut self) -> Result<(), Error>;

    /// Trust a previously built binary instead of building.
    fn mark_built(&mut self) -> Result<(), Error>;

    /// Create the data directory, then run `init` with the genesis and `import` with the chain.
    async fn init(&mut self) -> Result<(), Error>;

    /// Spawn the long-running client. Does not wait for it to serve requests.
    async fn start(&mut self) -> Result<(), Error>;

    /// Poll the RPC endpoint until it answers, `timeout` elapses or `exit` fires.
    async fn wait_until_ready(&mut self, timeout: Duration, exit: Option<exit_future::Exit>)
        -> bool;

    fn rpc(&self) -> &HttpJsonRpc;

    /// Stop the process and remove the data directory.
    async fn close(&mut self) -> Result<(), Error>;
}

/// Holds the handle to a client process plus everything needed to drive it.
pub struct ClientProcess<E> {
    client: E,
    client_path: PathBuf,
    args: ClientArgs,
    network: NetworkConfig,
    verbose: bool,
    shutdown_timeout: Duration,
    datadir: PathBuf,
    temp_datadir: Option<TempDir>,
    rpc: HttpJsonRpc,
    child: Option<Child>,
    state: ClientState,
    log: Logger,
}

impl<E: GenericExecutionClient> ClientProcess<E> {
    pub fn new(client: E, config: &Config, log: Logger) -> Result<Self, Error> {
        let url = Url::parse(&config.network.http_endpoint())
            .map_err(|e| Error::InvalidEndpoint(format!("{}: {}", config.network.http_endpoint(), e)))?;
        let rpc = HttpJsonRpc::new(url)?;

        let (datadir, temp_datadir) = match &config.args.datadir {
            Some(datadir) => (datadir.clone(), None),
            None => {
                let temp = tempfile::Builder::new()
                    .prefix("client-harness-")
                    .tempdir()
                    .map_err(|error| Error::Io {
                        path: std::env::temp_dir(),
                        error,
                    })?;
                (temp.path().to_path_buf(), Some(temp))
            }
        };

        let log = log.new(slog::o!("client" => client.name()));

        Ok(Self {
            client,
            client_path: config.client_path.clone(),
            args: config.args.clone(),
            network: config.network.clone(),
            verbose: config.verbose,
            shutdown_timeout: config.shutdown_timeout(),
            datadir,
            temp_datadir,
            rpc,
            child: None,
            state: ClientState::Uninitialized,
            log,
        })
    }

    pub fn binary_path(&self) -> PathBuf {
        self.client.binary_path(&self.client_path)
    }

    fn require(&self, expected: ClientState, operation: &'static str) -> Result<(), Error> {
        if self.state == expected {
            Ok(())
        } else {
            Err(Error::InvalidTransition {
                state: self.state,
                operation,
            })
        }
    }

    /// `true` if the process was started and has since exited.
    fn has_exited(&mut self) -> bool {
        match self.child.as_mut().map(Child::try_wait) {
            Some(Ok(Some(status))) => {
                warn!(self.log, "Client process exited"; "status" => %status);
                true
            }
            _ => false,
        }
    }
}

impl<E> ClientProcess<E> {
    /// Remove the datadir, then mark the client `Closed`. On failure the state is left as is so a
    /// later `close` retries the removal.
    fn finish_close(&mut self) -> Result<(), Error> {
        let removed = match self.temp_datadir.take() {
            Some(temp) => temp.close(),
            None => fs::remove_dir_all(&self.datadir),
        };
        match removed {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(error) => {
                return Err(Error::Io {
                    path: self.datadir.clone(),
                    error,
                })
            }
        }

        self.state = ClientState::Closed;
        info!(self.log, "Client closed"; "datadir" => %self.datadir.display());
        Ok(())
    }
}

#[async_trait]
impl<E: GenericExecutionClient> Client for ClientProcess<E> {
    fn name(&self) -> &'static str {
        self.client.name()
    }

    fn state(&self) -> ClientState {
        self.state
    }

    fn datadir(&self) -> &Path {
        &self.datadir
    }

    async fn build(&mut self) -> Result<(), Error> {
        self.require(ClientState::Uninitialized, "build")?;

        let command = self.client.build_command(&self.client_path);
        info!(self.log, "Building client"; "path" => %self.client_path.display());
        debug!(self.log, "Running command"; "command" => %command);

        let verbose = self.verbose;
        tokio::task::spawn_blocking(move || run_to_completion(&command, verbose))
            .await
            .map_err(|e| Error::Build(format!("build task failed: {}", e)))?
            .map_err(Error::Build)?;

        self.state = ClientState::Built;
        Ok(())
    }

    fn mark_built(&mut self) -> Result<(), Error> {
        self.require(ClientState::Uninitialized, "skip building")?;

        let binary = self.binary_path();
        if binary.exists() {
            info!(self.log, "Using existing client binary"; "binary" => %binary.display());
        } else {
            warn!(
                self.log,
                "Client binary not found, continuing anyway";
                "binary" => %binary.display()
            );
        }

        self.state = ClientState::Built;
        Ok(())
    }

    async fn init(&mut self) -> Result<(), Error> {
        self.require(ClientState::Built, "initialize")?;

        fs::create_dir_all(&self.datadir).map_err(|error| Error::Io {
            path: self.datadir.clone(),
            error,
        })?;

        let binary = self.binary_path();
        for (step, command) in self
            .client
            .init_commands(&binary, &self.datadir, &self.args)
        {
            info!(self.log, "Initializing client"; "step" => %step);
            debug!(self.log, "Running command"; "command" => %command);

            let verbose = self.verbose;
            tokio::task::spawn_blocking(move || run_to_completion(&command, verbose))
                .await
                .map_err(|e| Error::Init {
                    step,
                    cause: format!("task failed: {}", e),
                })?
                .map_err(|cause| Error::Init { step, cause })?;
        }

        self.state = ClientState::Initialized;
        Ok(())
    }

    async fn start(&mut self) -> Result<(), Error> {
        self.require(ClientState::Initialized, "start")?;

        let command =
            self.client
                .start_command(&self.binary_path(), &self.datadir, &self.args, &self.network);
        debug!(self.log, "Running command"; "command" => %command);

        let child = command
            .to_command()
            .stdin(Stdio::null())
            .stdout(build_stdio(self.verbose))
            .stderr(build_stdio(self.verbose))
            .spawn()
            .map_err(Error::Start)?;

        info!(
            self.log,
            "Client started";
            "pid" => child.id(),
            "endpoint" => %self.rpc.url()
        );

        self.child = Some(child);
        self.state = ClientState::Running;
        Ok(())
    }

    async fn wait_until_ready(
        &mut self,
        timeout: Duration,
        exit: Option<exit_future::Exit>,
    ) -> bool {
        if self.state != ClientState::Running {
            warn!(self.log, "Readiness requested for a client which is not running"; "state" => %self.state);
            return false;
        }

        let deadline = Instant::now() + timeout;
        let mut exit = Box::pin(async move {
            match exit {
                Some(exit) => exit.await,
                None => futures::future::pending().await,
            }
        });

        let mut attempts = 0u64;
        loop {
            if self.has_exited() {
                return false;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                info!(self.log, "Client did not become ready"; "attempts" => attempts);
                return false;
            }

            attempts += 1;
            tokio::select! {
                result = self.rpc.block_number(remaining) => match result {
                    Ok(head) => {
                        info!(self.log, "Client ready"; "head" => head, "attempts" => attempts);
                        return true;
                    }
                    Err(e) => trace!(self.log, "Client not ready"; "attempt" => attempts, "error" => %e),
                },
                _ = &mut exit => {
                    info!(self.log, "Readiness poll cancelled");
                    return false;
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            tokio::select! {
                _ = sleep(READY_POLL_INTERVAL.min(remaining)) => {},
                _ = &mut exit => {
                    info!(self.log, "Readiness poll cancelled");
                    return false;
                }
            }
        }
    }

    fn rpc(&self) -> &HttpJsonRpc {
        &self.rpc
    }

    async fn close(&mut self) -> Result<(), Error> {
        if self.state == ClientState::Closed {
            return Ok(());
        }

        if let Some(mut child) = self.child.take() {
            terminate(&mut child, &self.log);
            let deadline = Instant::now() + self.shutdown_timeout;
            while !reap(&mut child, Instant::now() >= deadline, &self.log) {
                sleep(SHUTDOWN_POLL_INTERVAL).await;
            }
        }

        self.finish_close()
    }
}

impl<E> Drop for ClientProcess<E> {
    fn drop(&mut self) {
        if self.state == ClientState::Closed {
            return;
        }

        // Kill and reap without waiting out the shutdown timeout.
        if let Some(mut child) = self.child.take() {
            if let Ok(None) = child.try_wait() {
                if let Err(e) = child.kill() {
                    warn!(self.log, "Failed to kill client"; "error" => %e);
                }
            }
            if let Err(e) = child.wait() {
                warn!(self.log, "Failed to reap client"; "error" => %e);
            }
        }

        if let Err(e) = self.finish_close() {
            warn!(self.log, "Failed to clean up client"; "error" => %e);
        }
    }
}

/// Ask the process to exit.
#[cfg(unix)]
fn terminate(child: &mut Child, log: &Logger) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    if let Ok(Some(status)) = child.try_wait() {
        debug!(log, "Client already exited"; "status" => %status);
        return;
    }

    debug!(log, "Sending SIGTERM"; "pid" => child.id());
    if let Err(e) = kill(Pid::from_raw(child.id() as i32), Signal::SIGTERM) {
        warn!(log, "Failed to signal client"; "error" => %e);
    }
}

#[cfg(not(unix))]
fn terminate(child: &mut Child, log: &Logger) {
    if let Err(e) = child.kill() {
        warn!(log, "Failed to kill client"; "error" => %e);
    }
}

/// Returns `true` once the process has been reaped. When `give_up` is set a process which is
/// still alive is killed and reaped.
fn reap(child: &mut Child, give_up: bool, log: &Logger) -> bool {
    match child.try_wait() {
        Ok(Some(status)) => {
            debug!(log, "Client exited"; "status" => %status);
            true
        }
        Ok(None) if !give_up => false,
        other => {
            match other {
                Err(e) => warn!(log, "Failed to query client process"; "error" => %e),
                _ => warn!(log, "Client did not stop in time, killing it"),
            }
            if let Err(e) = child.kill() {
                warn!(log, "Failed to kill client"; "error" => %e);
            }
            if let Err(e) = child.wait() {
                warn!(log, "Failed to reap client"; "error" => %e);
            }
            true
        }
    }
}
