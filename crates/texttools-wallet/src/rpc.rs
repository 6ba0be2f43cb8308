//! Ethereum JSON-RPC wallet provider for a local dev node.
//!
//! The node manages the accounts (anvil, hardhat), so the only connector is
//! an injected one backed by `eth_accounts`. Transactions go out unsigned
//! through `eth_sendTransaction` and the node signs them.

use std::sync::Arc;
use std::time::Duration;

use alloy::network::TransactionBuilder;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::client::RpcClient;
use alloy::rpc::types::TransactionRequest;
use alloy::transports::http::Http;
use alloy::transports::{RpcError, TransportError};
use async_trait::async_trait;
use texttools_types::{Result, TextToolsError};
use tracing::debug;

use crate::*;

pub const NODE_CONNECTOR_ID: &str = "injected";

/// EIP-1193 "user rejected request".
const USER_REJECTED_CODE: i64 = 4001;

fn provider_error(err: TransportError) -> ProviderError {
    match err {
        RpcError::ErrorResp(payload) => {
            let kind = if payload.code == USER_REJECTED_CODE {
                ProviderErrorKind::Rejected
            } else {
                ProviderErrorKind::Unknown
            };
            let short = payload.message.lines().next().unwrap_or_default().trim().to_string();
            ProviderError::new(kind, Some(short), Some(payload.message.to_string()))
        }
        RpcError::Transport(kind) => ProviderError::network(format!("rpc request failed: {}", kind)),
        other => ProviderError::unknown(other.to_string()),
    }
}

/// JSON-RPC provider talking to a node over HTTP.
pub struct RpcProvider {
    rpc_url: String,
    chain_id: Option<u64>,
    provider: Arc<dyn Provider + Send + Sync>,
}

impl RpcProvider {
    pub fn new(rpc_url: &str, timeout_ms: Option<u64>) -> Result<Self> {
        let url = rpc_url
            .trim()
            .parse::<reqwest::Url>()
            .map_err(|e| TextToolsError::InvalidRpcUrl(format!("{rpc_url} ({e})")))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms.unwrap_or(30_000)))
            .build()
            .map_err(|e| TextToolsError::Other(format!("failed to build http client: {e}")))?;

        let client = RpcClient::new(Http::with_client(http, url.clone()), true);
        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .connect_client(client);

        Ok(Self {
            rpc_url: url.to_string(),
            chain_id: None,
            provider: Arc::new(provider),
        })
    }

    /// Refuse to connect unless the node reports `chain_id`.
    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    pub async fn chain_id(&self) -> ProviderResult<u64> {
        self.provider.get_chain_id().await.map_err(provider_error)
    }
}

#[async_trait]
impl WalletProvider for RpcProvider {
    fn list_connectors(&self) -> Vec<Connector> {
        vec![Connector::new(NODE_CONNECTOR_ID, "Node accounts", ConnectorKind::Injected)]
    }

    async fn connect(&self, connector: &Connector) -> ProviderResult<Address> {
        if connector.id != NODE_CONNECTOR_ID {
            return Err(ProviderError::unknown(format!("unsupported connector: {}", connector.id)));
        }
        debug!(url = %self.rpc_url, "requesting node accounts");

        if let Some(expected) = self.chain_id {
            let actual = self.chain_id().await?;
            if actual != expected {
                return Err(ProviderError::new(
                    ProviderErrorKind::Unknown,
                    Some(format!("wrong network: expected chain {}, node is on {}", expected, actual)),
                    None,
                ));
            }
        }

        let accounts = self.provider.get_accounts().await.map_err(provider_error)?;
        accounts
            .first()
            .copied()
            .ok_or_else(|| ProviderError::rejected("node exposes no accounts"))
    }

    fn disconnect(&self) {
        debug!(url = %self.rpc_url, "released node accounts");
    }

    async fn write_contract(&self, request: &WriteContractRequest) -> ProviderResult<TransactionHandle> {
        let tx = TransactionRequest::default()
            .with_from(request.account)
            .with_to(request.address)
            .with_input(request.calldata.clone());
        debug!(function = %request.function_name, to = %request.address, "eth_sendTransaction");

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(provider_error)?;
        Ok(TransactionHandle { hash: *pending.tx_hash() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Bytes;
    use serde_json::{json, Value};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const ACCOUNT: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    /// Serve one canned JSON-RPC reply per connection, in order, and hand
    /// back the request bodies that were received.
    async fn spawn_node(replies: Vec<Value>) -> (String, tokio::task::JoinHandle<Vec<Value>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let mut seen = Vec::new();
            for reply in replies {
                let (mut stream, _) = listener.accept().await.unwrap();
                let mut buf = Vec::new();
                let mut chunk = [0u8; 4096];
                let body = loop {
                    let n = stream.read(&mut chunk).await.unwrap();
                    buf.extend_from_slice(&chunk[..n]);
                    let text = String::from_utf8_lossy(&buf).to_string();
                    if let Some(split) = text.find("\r\n\r\n") {
                        let len = text[..split]
                            .lines()
                            .find_map(|l| {
                                let (k, v) = l.split_once(':')?;
                                k.eq_ignore_ascii_case("content-length")
                                    .then(|| v.trim().parse::<usize>().ok())
                                    .flatten()
                            })
                            .unwrap_or(0);
                        if buf.len() >= split + 4 + len {
                            break buf[split + 4..split + 4 + len].to_vec();
                        }
                    }
                    if n == 0 {
                        break Vec::new();
                    }
                };
                let request: Value = serde_json::from_slice(&body).unwrap();
                let mut response = reply.clone();
                response["jsonrpc"] = json!("2.0");
                response["id"] = request["id"].clone();
                seen.push(request);

                let payload = response.to_string();
                let http = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    payload.len(),
                    payload
                );
                stream.write_all(http.as_bytes()).await.unwrap();
                stream.shutdown().await.ok();
            }
            seen
        });

        (url, handle)
    }

    fn node_connector() -> Connector {
        RpcProvider::new("http://unused", None).unwrap().list_connectors().remove(0)
    }

    #[tokio::test]
    async fn test_connect_returns_first_account() {
        let (url, node) = spawn_node(vec![
            json!({ "result": "0x7a69" }),
            json!({ "result": [ACCOUNT, "0x70997970c51812dc3a010c7d01b50e0d17dc79c8"] }),
        ])
        .await;

        let provider = RpcProvider::new(&url, Some(5_000))
            .unwrap().with_chain_id(31337);
        let account = provider.connect(&node_connector()).await.unwrap();
        assert_eq!(account, ACCOUNT.parse::<Address>().unwrap());

        let seen = node.await.unwrap();
        assert_eq!(seen[0]["method"], "eth_chainId");
        assert_eq!(seen[1]["method"], "eth_accounts");
    }

    #[tokio::test]
    async fn test_connect_rejects_wrong_chain() {
        let (url, _node) = spawn_node(vec![json!({ "result": "0x1" })]).await;

        let provider = RpcProvider::new(&url, Some(5_000))
            .unwrap().with_chain_id(31337);
        let err = provider.connect(&node_connector()).await.unwrap_err();
        assert_eq!(
            err.user_message("failed"),
            "wrong network: expected chain 31337, node is on 1"
        );
    }

    #[tokio::test]
    async fn test_connect_without_accounts_is_rejection() {
        let (url, _node) = spawn_node(vec![json!({ "result": [] })]).await;

        let provider = RpcProvider::new(&url, Some(5_000))
            .unwrap();
        let err = provider.connect(&node_connector()).await.unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Rejected);
    }

    #[tokio::test]
    async fn test_write_contract_sends_calldata() {
        let hash = format!("0x{}", "ab".repeat(32));
        let (url, node) = spawn_node(vec![json!({ "result": hash.clone() })]).await;

        let account: Address = ACCOUNT.parse().unwrap();
        let input_box: Address = "0x59b22D57D4f067708AB0c00552767405926dc768".parse().unwrap();
        let dapp: Address = "0xab7528bb862fB57E8A2BCd567a2e929a0Be56a5e".parse().unwrap();
        let call = addInputCall { appContract: dapp, payload: Bytes::from_static(b"hi") };
        let request = WriteContractRequest::new(account, input_box, &call);

        let provider = RpcProvider::new(&url, Some(5_000)).unwrap();
        let handle = provider.write_contract(&request).await.unwrap();
        assert_eq!(handle.hash, hash.parse::<TxHash>().unwrap());

        let seen = node.await.unwrap();
        assert_eq!(seen[0]["method"], "eth_sendTransaction");
        let tx = &seen[0]["params"][0];
        let field = |name: &str| tx[name].as_str().unwrap().to_lowercase();
        assert_eq!(field("from"), ACCOUNT);
        assert_eq!(field("to").parse::<Address>().unwrap(), input_box);
        let data = tx.get("input").or_else(|| tx.get("data")).unwrap();
        assert_eq!(
            data.as_str().unwrap(),
            texttools_types::bytes_to_hex(&request.calldata)
        );
    }

    #[test]
    fn test_new_rejects_bad_url() {
        assert!(matches!(
            RpcProvider::new("not a url", None),
            Err(TextToolsError::InvalidRpcUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_rpc_error_user_rejected() {
        let (url, _node) = spawn_node(vec![json!({
            "error": { "code": 4001, "message": "User rejected the request.\nVersion: 2.0" }
        })])
        .await;

        let provider = RpcProvider::new(&url, Some(5_000))
            .unwrap();
        let err = provider.connect(&node_connector()).await.unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Rejected);
        assert_eq!(err.short_message.as_deref(), Some("User rejected the request."));
    }

    #[tokio::test]
    async fn test_unreachable_node_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let provider = RpcProvider::new(&url, Some(2_000)).unwrap();
        let err = provider.connect(&node_connector()).await.unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Network);
    }
}
