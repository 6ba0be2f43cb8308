//! Connection lifecycle for a single wallet account on a single network.
//!
//! Disconnected -> Connecting -> Connected(account) -> Disconnected
//!
//! `connect()` never fails to its caller: every failure is turned into an
//! Error outcome and the session stays Disconnected.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use texttools_types::{short_address, Address, OutcomeSlot, SubmissionOutcome, TextToolsError};
use texttools_wallet::{select_connector, WalletProvider};
use tracing::{debug, info, warn};

const CONNECT_FALLBACK: &str = "failed to connect";

/// The network the session is expected to live on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInfo {
    pub chain_id: u64,
    pub name: String,
}

impl NetworkInfo {
    pub fn new(chain_id: u64, name: impl Into<String>) -> Self {
        Self { chain_id, name: name.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// The account is only reachable through `Connected`. `Connecting` carries
/// the attempt number so a superseded attempt cannot touch a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Session {
    Disconnected,
    Connecting(u64),
    Connected(Address),
}

/// Outcome of one connect attempt, with the typed error when it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectReport {
    pub outcome: SubmissionOutcome,
    pub error: Option<TextToolsError>,
}

pub struct SessionManager {
    provider: Arc<dyn WalletProvider>,
    network: NetworkInfo,
    session: Mutex<Session>,
    attempts: AtomicU64,
    outcome: OutcomeSlot,
}

impl SessionManager {
    pub fn new(provider: Arc<dyn WalletProvider>, network: NetworkInfo, outcome: OutcomeSlot) -> Self {
        Self {
            provider,
            network,
            session: Mutex::new(Session::Disconnected),
            attempts: AtomicU64::new(0),
            outcome,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn network(&self) -> &NetworkInfo {
        &self.network
    }

    pub fn connection_state(&self) -> ConnectionState {
        match *self.lock() {
            Session::Disconnected => ConnectionState::Disconnected,
            Session::Connecting(_) => ConnectionState::Connecting,
            Session::Connected(_) => ConnectionState::Connected,
        }
    }

    pub fn account_address(&self) -> Option<Address> {
        match *self.lock() {
            Session::Connected(account) => Some(account),
            _ => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.account_address().is_some()
    }

    /// Connect through the first injected connector (else the first listed).
    pub async fn connect(&self) -> SubmissionOutcome {
        self.connect_with_report().await.outcome
    }

    /// Like [`connect`](Self::connect), also handing back the typed error.
    pub async fn connect_with_report(&self) -> ConnectReport {
        self.outcome.reset();

        let attempt = {
            let mut session = self.lock();
            match *session {
                Session::Connected(account) => {
                    let hint = format!("already connected as {}", short_address(&account));
                    return ConnectReport {
                        outcome: self.outcome.replace(SubmissionOutcome::hint(hint)),
                        error: None,
                    };
                }
                Session::Connecting(_) => return self.fail(TextToolsError::ConnectionInProgress),
                Session::Disconnected => {
                    let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
                    *session = Session::Connecting(attempt);
                    attempt
                }
            }
        };
        debug!(attempt, state = ?ConnectionState::Connecting, "session state");

        let connectors = self.provider.list_connectors();
        let Some(connector) = select_connector(&connectors).cloned() else {
            self.settle(attempt, Session::Disconnected);
            warn!("no wallet connector available");
            return self.fail(TextToolsError::NoConnector);
        };
        debug!(connector = %connector.id, "selected connector");

        let result = self.provider.connect(&connector).await;

        let next = match &result {
            Ok(account) => Session::Connected(*account),
            Err(_) => Session::Disconnected,
        };
        if !self.settle(attempt, next) {
            warn!(attempt, "connection attempt superseded; discarding result");
            let err = TextToolsError::ConnectionCancelled;
            // Only a session nobody else is driving gets to see the cancellation.
            if *self.lock() == Session::Disconnected {
                return self.fail(err);
            }
            return ConnectReport { outcome: SubmissionOutcome::from(&err), error: Some(err) };
        }

        match result {
            Ok(account) => {
                info!(account = %account, chain_id = self.network.chain_id, "wallet connected");
                ConnectReport {
                    outcome: self.outcome.replace(SubmissionOutcome::hint(format!(
                        "wallet connected to {} ({})",
                        self.network.name, self.network.chain_id
                    ))),
                    error: None,
                }
            }
            Err(err) => {
                warn!(error = %err, "wallet connection failed");
                self.fail(err.into_error(CONNECT_FALLBACK))
            }
        }
    }

    /// Move `Connecting(attempt)` to `next`. False when the attempt is no
    /// longer current.
    fn settle(&self, attempt: u64, next: Session) -> bool {
        let mut session = self.lock();
        if *session != Session::Connecting(attempt) {
            return false;
        }
        *session = next;
        true
    }

    fn fail(&self, err: TextToolsError) -> ConnectReport {
        ConnectReport {
            outcome: self.outcome.replace(SubmissionOutcome::from(&err)),
            error: Some(err),
        }
    }

    /// End the session. Safe to call in any state.
    pub fn disconnect(&self) {
        let previous = std::mem::replace(&mut *self.lock(), Session::Disconnected);
        self.provider.disconnect();
        if let Session::Connected(account) = previous {
            info!(account = %account, "wallet disconnected");
        }
    }

    /// Apply an account change reported by the provider.
    ///
    /// An empty list means access was revoked and ends the session.
    pub fn accounts_changed(&self, accounts: &[Address]) {
        let mut session = self.lock();
        let Session::Connected(current) = *session else {
            return;
        };
        match accounts.first() {
            None => {
                *session = Session::Disconnected;
                info!(account = %current, "wallet access revoked");
            }
            Some(&next) if next != current => {
                *session = Session::Connected(next);
                info!(from = %current, to = %next, "wallet account switched");
            }
            Some(_) => {}
        }
    }
}
