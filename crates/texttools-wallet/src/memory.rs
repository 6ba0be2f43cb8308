//! In-memory wallet provider for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

use crate::*;

/// A call observed by [`MemoryProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    ListConnectors,
    Connect { connector_id: String },
    Disconnect,
    WriteContract(WriteContractRequest),
}

/// In-memory wallet provider that records calls and replays scripted results.
///
/// Scripted failures are claimed by the next call when it starts, so a held
/// call keeps the result it was issued with.
pub struct MemoryProvider {
    connectors: Vec<Connector>,
    account: Address,
    connect_failure: Mutex<Option<ProviderError>>,
    write_failure: Mutex<Option<ProviderError>>,
    connect_gate: Mutex<Option<Arc<Notify>>>,
    write_gate: Mutex<Option<Arc<Notify>>>,
    calls: Mutex<Vec<ProviderCall>>,
    next_tx: AtomicU64,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryProvider {
    /// A provider exposing a single injected connector that yields `account`.
    pub fn new(account: Address) -> Self {
        Self::with_connectors(
            account,
            vec![Connector::new("injected", "Injected", ConnectorKind::Injected)],
        )
    }

    pub fn with_connectors(account: Address, connectors: Vec<Connector>) -> Self {
        Self {
            connectors,
            account,
            connect_failure: Mutex::new(None),
            write_failure: Mutex::new(None),
            connect_gate: Mutex::new(None),
            write_gate: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            next_tx: AtomicU64::new(1),
        }
    }

    /// Fail the next `connect` with `err`.
    pub fn fail_connect(&self, err: ProviderError) {
        *lock(&self.connect_failure) = Some(err);
    }

    /// Fail the next `write_contract` with `err`.
    pub fn fail_write(&self, err: ProviderError) {
        *lock(&self.write_failure) = Some(err);
    }

    /// Hold every `connect` until the returned handle is notified.
    pub fn hold_connects(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *lock(&self.connect_gate) = Some(gate.clone());
        gate
    }

    /// Hold every `write_contract` until the returned handle is notified.
    pub fn hold_writes(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *lock(&self.write_gate) = Some(gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        lock(&self.calls).clone()
    }

    pub fn connect_calls(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| matches!(c, ProviderCall::Connect { .. }))
            .count()
    }

    pub fn write_calls(&self) -> Vec<WriteContractRequest> {
        lock(&self.calls)
            .iter()
            .filter_map(|c| match c {
                ProviderCall::WriteContract(req) => Some(req.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: ProviderCall) {
        lock(&self.calls).push(call);
    }
}

async fn pass(gate: &Mutex<Option<Arc<Notify>>>) {
    let gate = lock(gate).clone();
    if let Some(gate) = gate {
        gate.notified().await;
    }
}

#[async_trait]
impl WalletProvider for MemoryProvider {
    fn list_connectors(&self) -> Vec<Connector> {
        self.record(ProviderCall::ListConnectors);
        self.connectors.clone()
    }

    async fn connect(&self, connector: &Connector) -> ProviderResult<Address> {
        self.record(ProviderCall::Connect { connector_id: connector.id.clone() });
        let failure = lock(&self.connect_failure).take();
        pass(&self.connect_gate).await;
        match failure {
            Some(err) => Err(err),
            None => Ok(self.account),
        }
    }

    fn disconnect(&self) {
        self.record(ProviderCall::Disconnect);
    }

    async fn write_contract(&self, request: &WriteContractRequest) -> ProviderResult<TransactionHandle> {
        self.record(ProviderCall::WriteContract(request.clone()));
        let failure = lock(&self.write_failure).take();
        pass(&self.write_gate).await;
        if let Some(err) = failure {
            return Err(err);
        }
        let n = self.next_tx.fetch_add(1, Ordering::SeqCst);
        Ok(TransactionHandle { hash: TxHash::left_padding_from(&n.to_be_bytes()) })
    }
}
