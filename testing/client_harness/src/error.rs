use crate::execution_client::{ClientState, InitStep};
use crate::rpc;
use std::fmt;
use std::io;
use std::path::PathBuf;

#[derive(Debug)]
pub enum Error {
    /// An operation was requested in a state which does not permit it. The state is unchanged.
    InvalidTransition {
        state: ClientState,
        operation: &'static str,
    },
    /// The client's build tooling failed; carries any captured output.
    Build(String),
    /// `init` or `import` failed.
    Init { step: InitStep, cause: String },
    /// The long-running client could not be spawned.
    Start(io::Error),
    Io { path: PathBuf, error: io::Error },
    Rpc(rpc::Error),
    UnknownClientType(String),
    InvalidEndpoint(String),
}

impl From<rpc::Error> for Error {
    fn from(e: rpc::Error) -> Self {
        Error::Rpc(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidTransition { state, operation } => {
                write!(f, "cannot {} a client which is {}", operation, state)
            }
            Error::Build(output) => write!(f, "build failed: {}", output),
            Error::Init { step, cause } => write!(f, "{} failed: {}", step, cause),
            Error::Start(e) => write!(f, "failed to start client: {}", e),
            Error::Io { path, error } => write!(f, "{}: {}", path.display(), error),
            Error::Rpc(e) => write!(f, "{}", e),
            Error::UnknownClientType(name) => write!(f, "unknown client type: {}", name),
            Error::InvalidEndpoint(e) => write!(f, "invalid rpc endpoint: {}", e),
        }
    }
}

impl std::error::Error for Error {}
