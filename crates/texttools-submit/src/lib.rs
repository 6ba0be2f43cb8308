//! Request submission: validate, encode, and hand a single `addInput` call to
//! the wallet.
//!
//! Idle -> Validating -> Encoding -> AwaitingWalletConfirmation -> Submitted | Failed
//!
//! "Submitted" means the wallet accepted the transaction. Finality and the
//! off-chain node's result are not tracked.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use texttools_session::SessionManager;
use texttools_types::{parse_address, Address, OutcomeSlot, Result, SubmissionOutcome, TextToolsError};
use texttools_wallet::{addInputCall, TransactionHandle, WalletProvider, WriteContractRequest};
use tracing::{debug, info, warn};

pub mod payload;

pub use payload::{decode_payload, encode, EncodedPayload, Operation};

pub const SUBMITTED_MESSAGE: &str =
    "input submitted! check the NOTICE output in the `cartesi run` terminal";

const SUBMIT_FALLBACK: &str = "failed to submit input";

/// A request built from the current user input at submit time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRequest {
    pub operation: Operation,
    pub text: String,
    /// Contract the payload is addressed to (the dApp).
    pub target_contract: String,
    /// Queue contract that is actually called (the InputBox).
    pub queue_contract: String,
}

impl SubmissionRequest {
    pub fn new(
        operation: Operation,
        text: impl Into<String>,
        target_contract: impl Into<String>,
        queue_contract: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            text: text.into(),
            target_contract: target_contract.into(),
            queue_contract: queue_contract.into(),
        }
    }

    /// Parse both addresses. Missing fields are reported before malformed ones.
    pub fn addresses(&self) -> Result<(Address, Address)> {
        if self.target_contract.trim().is_empty() || self.queue_contract.trim().is_empty() {
            return Err(TextToolsError::MissingAddress);
        }
        Ok((parse_address(&self.target_contract)?, parse_address(&self.queue_contract)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionPhase {
    Idle,
    Validating,
    Encoding,
    AwaitingWalletConfirmation,
    Submitted,
    Failed,
}

impl SubmissionPhase {
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Idle | Self::Submitted | Self::Failed)
    }
}

/// Outcome of one attempt, with the transaction handle when accepted and the
/// typed error when not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReport {
    pub outcome: SubmissionOutcome,
    pub transaction: Option<TransactionHandle>,
    pub error: Option<TextToolsError>,
}

/// Clears the in-flight flag when the attempt ends or its future is dropped.
/// An attempt dropped midway is recorded as Failed.
struct InFlight<'a> {
    flag: &'a AtomicBool,
    phase: &'a Mutex<SubmissionPhase>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        {
            let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
            if !phase.is_finished() {
                debug!(phase = ?*phase, "submission abandoned");
                *phase = SubmissionPhase::Failed;
            }
        }
        self.flag.store(false, Ordering::Release);
    }
}

pub struct RequestSubmitter {
    session: Arc<SessionManager>,
    provider: Arc<dyn WalletProvider>,
    phase: Mutex<SubmissionPhase>,
    in_flight: AtomicBool,
    outcome: OutcomeSlot,
}

impl RequestSubmitter {
    pub fn new(
        session: Arc<SessionManager>,
        provider: Arc<dyn WalletProvider>,
        outcome: OutcomeSlot,
    ) -> Self {
        Self {
            session,
            provider,
            phase: Mutex::new(SubmissionPhase::Idle),
            in_flight: AtomicBool::new(false),
            outcome,
        }
    }

    fn phase_lock(&self) -> MutexGuard<'_, SubmissionPhase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn phase(&self) -> SubmissionPhase {
        *self.phase_lock()
    }

    fn set_phase(&self, phase: SubmissionPhase) {
        *self.phase_lock() = phase;
        debug!(?phase, "submission phase");
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn try_begin(&self) -> Option<InFlight<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight { flag: &self.in_flight, phase: &self.phase })
    }

    pub async fn submit(&self, request: &SubmissionRequest) -> SubmissionOutcome {
        self.submit_with_report(request).await.outcome
    }

    /// Run one attempt. Never fails to the caller: every failure becomes an
    /// Error outcome. No retry is attempted.
    pub async fn submit_with_report(&self, request: &SubmissionRequest) -> SubmitReport {
        // A rejected overlap leaves the pending attempt's phase and outcome alone.
        let Some(_guard) = self.try_begin() else {
            warn!("submission rejected: another one is awaiting the wallet");
            let err = TextToolsError::SubmissionInFlight;
            return SubmitReport {
                outcome: SubmissionOutcome::from(&err),
                transaction: None,
                error: Some(err),
            };
        };

        self.outcome.reset();
        self.set_phase(SubmissionPhase::Validating);

        let (account, target, queue) = match self.validate(request) {
            Ok(v) => v,
            Err(err) => return self.fail(err),
        };

        self.set_phase(SubmissionPhase::Encoding);
        let payload = encode(request.operation, &request.text);
        debug!(op = %request.operation, payload = %payload, "encoded payload");

        let call = WriteContractRequest::new(
            account,
            queue,
            &addInputCall { appContract: target, payload: payload.into_bytes().into() },
        );

        self.set_phase(SubmissionPhase::AwaitingWalletConfirmation);
        match self.provider.write_contract(&call).await {
            Ok(tx) => {
                self.set_phase(SubmissionPhase::Submitted);
                info!(tx = %tx.hash, dapp = %target, input_box = %queue, "input submitted");
                SubmitReport {
                    outcome: self.outcome.replace(SubmissionOutcome::ok(SUBMITTED_MESSAGE)),
                    transaction: Some(tx),
                    error: None,
                }
            }
            Err(err) => {
                warn!(error = %err, "wallet did not accept the input");
                self.fail(err.into_error(SUBMIT_FALLBACK))
            }
        }
    }

    fn validate(&self, request: &SubmissionRequest) -> Result<(Address, Address, Address)> {
        let account = self
            .session
            .account_address()
            .ok_or(TextToolsError::NotConnected)?;
        let (target, queue) = request.addresses()?;
        Ok((account, target, queue))
    }

    fn fail(&self, err: TextToolsError) -> SubmitReport {
        self.set_phase(SubmissionPhase::Failed);
        debug!(error = %err, "submission failed");
        SubmitReport {
            outcome: self.outcome.replace(SubmissionOutcome::from(&err)),
            transaction: None,
            error: Some(err),
        }
    }
}
