use std::fmt;
use std::time::Duration;

#[derive(Debug)]
pub enum Error {
    /// The fixture could not be loaded; the client was never touched.
    Fixture(chain_fixture::Error),
    /// A lifecycle stage of the client failed.
    Client(client_harness::Error),
    /// The client never answered on its RPC endpoint.
    Unreachable { endpoint: String, timeout: Duration },
    /// The readiness poll was cancelled by a shutdown signal.
    Cancelled,
    /// The single assertion call itself failed.
    Rpc(client_harness::rpc::Error),
    AssertionFailed { expected: String, actual: String },
}

impl From<chain_fixture::Error> for Error {
    fn from(e: chain_fixture::Error) -> Self {
        Error::Fixture(e)
    }
}

impl From<client_harness::Error> for Error {
    fn from(e: client_harness::Error) -> Self {
        Error::Client(e)
    }
}

impl From<client_harness::rpc::Error> for Error {
    fn from(e: client_harness::rpc::Error) -> Self {
        Error::Rpc(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Fixture(e) => write!(f, "could not load chain: {}", e),
            Error::Client(e) => write!(f, "{}", e),
            Error::Unreachable { endpoint, timeout } => write!(
                f,
                "client unreachable at {} after {:?}",
                endpoint, timeout
            ),
            Error::Cancelled => write!(f, "cancelled"),
            Error::Rpc(e) => write!(f, "rpc call failed: {}", e),
            Error::AssertionFailed { expected, actual } => {
                write!(f, "expected {}, got {}", expected, actual)
            }
        }
    }
}

impl std::error::Error for Error {}
