//! Wallet provider seam for the TextTools client.
//!
//! - `WalletProvider`: connectors, connect/disconnect, contract writes
//! - Connector selection policy (injected first, else first available)
//! - Typed contract calls (`sol!`) and the write request built from them
//! - `MemoryProvider` for tests, `RpcProvider` for a JSON-RPC dev node

use std::fmt;

use alloy::primitives::{Bytes, TxHash};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use texttools_types::{Address, TextToolsError};

pub mod contracts;
pub mod memory;
pub mod rpc;

pub use contracts::addInputCall;

/// How a connector reaches the user's wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorKind {
    /// Provided by the environment the client runs in (browser extension,
    /// node-managed accounts).
    Injected,
    WalletConnect,
    Other,
}

/// A wallet connector advertised by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connector {
    pub id: String,
    pub name: String,
    pub kind: ConnectorKind,
}

impl Connector {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: ConnectorKind) -> Self {
        Self { id: id.into(), name: name.into(), kind }
    }
}

/// Pick the first injected connector, falling back to the first one listed.
pub fn select_connector(connectors: &[Connector]) -> Option<&Connector> {
    connectors
        .iter()
        .find(|c| c.kind == ConnectorKind::Injected)
        .or_else(|| connectors.first())
}

/// A single contract write, as handed to the wallet for approval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteContractRequest {
    /// Account authorizing the call.
    pub account: Address,
    /// Contract being called.
    pub address: Address,
    pub function_name: String,
    /// Selector followed by the ABI-encoded arguments.
    pub calldata: Bytes,
}

impl WriteContractRequest {
    pub fn new<C: SolCall>(account: Address, address: Address, call: &C) -> Self {
        let name = C::SIGNATURE
            .split_once('(')
            .map_or(C::SIGNATURE, |(name, _)| name);
        Self {
            account,
            address,
            function_name: name.to_string(),
            calldata: call.abi_encode().into(),
        }
    }
}

/// Handle returned once the provider accepted a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionHandle {
    pub hash: TxHash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// The user (or the wallet on their behalf) declined the request.
    Rejected,
    Network,
    Unknown,
}

/// Failure reported by a wallet provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub short_message: Option<String>,
    pub message: Option<String>,
}

impl ProviderError {
    pub fn new(
        kind: ProviderErrorKind,
        short_message: Option<String>,
        message: Option<String>,
    ) -> Self {
        Self { kind, short_message, message }
    }

    pub fn rejected(short_message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Rejected, Some(short_message.into()), None)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Network, None, Some(message.into()))
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Unknown, None, Some(message.into()))
    }

    /// Text to show the user: short message, else long message, else `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        [self.short_message.as_deref(), self.message.as_deref()]
            .into_iter()
            .flatten()
            .find(|m| !m.trim().is_empty())
            .unwrap_or(fallback)
            .to_string()
    }

    pub fn into_error(self, fallback: &str) -> TextToolsError {
        let message = self.user_message(fallback);
        match self.kind {
            ProviderErrorKind::Rejected => TextToolsError::ProviderRejection(message),
            ProviderErrorKind::Network => TextToolsError::ProviderNetworkError(message),
            ProviderErrorKind::Unknown => TextToolsError::Unknown(message),
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            ProviderErrorKind::Rejected => "rejected",
            ProviderErrorKind::Network => "network error",
            ProviderErrorKind::Unknown => "provider error",
        };
        match self.message.as_deref().or(self.short_message.as_deref()) {
            Some(m) => write!(f, "{kind}: {m}"),
            None => f.write_str(kind),
        }
    }
}

impl std::error::Error for ProviderError {}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// The external wallet: holds the signing key and the network connection.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    fn list_connectors(&self) -> Vec<Connector>;

    /// Ask the wallet behind `connector` for an account. May wait on the user.
    async fn connect(&self, connector: &Connector) -> ProviderResult<Address>;

    fn disconnect(&self);

    /// Submit a contract write. Resolves once the wallet accepted and
    /// broadcast the transaction, not on finality.
    async fn write_contract(&self, request: &WriteContractRequest) -> ProviderResult<TransactionHandle>;
}
