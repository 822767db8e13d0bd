//! A minimal JSON-RPC client for the `eth_` namespace.

use ethers_core::types::H256;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::time::Duration;

pub const JSONRPC_VERSION: &str = "2.0";
pub const STATIC_ID: u32 = 1;

pub const ETH_BLOCK_NUMBER: &str = "eth_blockNumber";
pub const ETH_GET_BLOCK_BY_NUMBER: &str = "eth_getBlockByNumber";

/// Timeout for requests made outside of the readiness poll.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub enum Error {
    HttpClient(reqwest::Error),
    Json(serde_json::Error),
    ServerMessage { code: i64, message: String },
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::HttpClient(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::HttpClient(e) => write!(f, "http request failed: {}", e),
            Error::Json(e) => write!(f, "invalid response: {}", e),
            Error::ServerMessage { code, message } => {
                write!(f, "server error {}: {}", code, message)
            }
        }
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct JsonRequestBody<'a> {
    pub jsonrpc: &'a str,
    pub method: &'a str,
    pub params: serde_json::Value,
    pub id: serde_json::Value,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct JsonError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct JsonResponseBody {
    pub jsonrpc: String,
    #[serde(default)]
    pub error: Option<JsonError>,
    #[serde(default)]
    pub result: serde_json::Value,
    pub id: serde_json::Value,
}

/// The fields of an `eth_getBlockByNumber` response the harness inspects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcBlock {
    pub hash: H256,
    pub parent_hash: H256,
    #[serde(with = "eth_serde_utils::u64_quantity")]
    pub number: u64,
}

#[derive(Clone)]
pub struct HttpJsonRpc {
    client: Client,
    url: Url,
}

impl HttpJsonRpc {
    pub fn new(url: Url) -> Result<Self, Error> {
        Ok(Self {
            client: Client::builder().build()?,
            url,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub async fn rpc_request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
        timeout: Duration,
    ) -> Result<T, Error> {
        let body = JsonRequestBody {
            jsonrpc: JSONRPC_VERSION,
            method,
            params,
            id: json!(STATIC_ID),
        };

        let body: JsonResponseBody = self
            .client
            .post(self.url.clone())
            .timeout(timeout)
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match (body.result, body.error) {
            (_, Some(error)) => Err(Error::ServerMessage {
                code: error.code,
                message: error.message,
            }),
            (result, None) => serde_json::from_value(result).map_err(Into::into),
        }
    }

    pub async fn block_number(&self, timeout: Duration) -> Result<u64, Error> {
        let number: String = self
            .rpc_request(ETH_BLOCK_NUMBER, json!([]), timeout)
            .await?;
        parse_quantity(&number)
    }

    /// `None` when the client does not know the block.
    pub async fn block_by_number(
        &self,
        number: u64,
        timeout: Duration,
    ) -> Result<Option<RpcBlock>, Error> {
        self.rpc_request(
            ETH_GET_BLOCK_BY_NUMBER,
            json!([format!("{:#x}", number), false]),
            timeout,
        )
        .await
    }
}

fn parse_quantity(s: &str) -> Result<u64, Error> {
    #[derive(Deserialize)]
    #[serde(transparent)]
    struct Quantity(#[serde(with = "eth_serde_utils::u64_quantity")] u64);

    serde_json::from_value::<Quantity>(json!(s))
        .map(|q| q.0)
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_with_error() {
        let body: JsonResponseBody = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"no such method"}}"#,
        )
        .unwrap();
        assert_eq!(body.result, serde_json::Value::Null);
        assert_eq!(body.error.unwrap().code, -32601);
    }

    #[test]
    fn quantity() {
        assert_eq!(parse_quantity("0x1f").unwrap(), 31);
        assert!(parse_quantity("0x").is_err());
    }

    #[test]
    fn rpc_block_ignores_extra_fields() {
        let block: RpcBlock = serde_json::from_value(json!({
            "hash": format!("{:?}", H256::repeat_byte(1)),
            "parentHash": format!("{:?}", H256::zero()),
            "number": "0x1",
            "miner": "0x0000000000000000000000000000000000000000",
            "transactions": []
        }))
        .unwrap();
        assert_eq!(block.number, 1);
        assert_eq!(block.hash, H256::repeat_byte(1));
    }
}
