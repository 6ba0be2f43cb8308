use std::sync::Arc;

use anyhow::{bail, Result};
use serde::Serialize;
use texttools_session::{NetworkInfo, SessionManager};
use texttools_submit::{decode_payload, encode, RequestSubmitter, SubmissionRequest, SubmitReport};
use texttools_types::{short_address, OutcomeKind, OutcomeSlot, SubmissionOutcome};
use texttools_wallet::rpc::RpcProvider;
use texttools_wallet::{select_connector, WalletProvider};
use tracing::info;

use crate::cli::{Command, SubmitArgs};
use crate::config::AppConfig;

/// Line printed to stdout after `submit`.
#[derive(Debug, Serialize)]
struct SubmitLine<'a> {
    kind: OutcomeKind,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    transaction: Option<String>,
}

pub async fn dispatch(command: Command, cfg: &AppConfig) -> Result<()> {
    match command {
        Command::Encode(args) => {
            println!("{}", encode(args.op, &args.text));
            Ok(())
        }
        Command::Decode { payload } => {
            let (op, text) = decode_payload(&payload)?;
            println!("{}", serde_json::json!({ "op": op, "text": text }));
            Ok(())
        }
        Command::Connectors => {
            let provider = rpc_provider(cfg)?;
            let connectors = provider.list_connectors();
            let selected = select_connector(&connectors).map(|c| c.id.clone());
            for c in &connectors {
                let mark = if Some(&c.id) == selected.as_ref() { "*" } else { " " };
                println!("{} {}\t{}\t{:?}", mark, c.id, c.name, c.kind);
            }
            Ok(())
        }
        Command::Submit(args) => {
            let provider: Arc<dyn WalletProvider> = Arc::new(rpc_provider(cfg)?);
            let report = run_submit(provider, cfg, &args).await?;
            print_report(&report)?;
            if report.outcome.is_error() {
                bail!("{}", report.outcome.message);
            }
            Ok(())
        }
    }
}

fn rpc_provider(cfg: &AppConfig) -> Result<RpcProvider> {
    Ok(RpcProvider::new(&cfg.network.rpc_url, Some(cfg.network.request_timeout_ms))?
        .with_chain_id(cfg.network.chain_id))
}

/// One session: connect, submit a single input, disconnect.
pub async fn run_submit(
    provider: Arc<dyn WalletProvider>,
    cfg: &AppConfig,
    args: &SubmitArgs,
) -> Result<SubmitReport> {
    let outcome = OutcomeSlot::new();
    let network = NetworkInfo::new(cfg.network.chain_id, cfg.network.chain_name.clone());
    let session = Arc::new(SessionManager::new(provider.clone(), network, outcome.clone()));
    let submitter = RequestSubmitter::new(session.clone(), provider, outcome);

    let connected = session.connect_with_report().await;
    if let Some(error) = connected.error {
        return Ok(SubmitReport { outcome: connected.outcome, transaction: None, error: Some(error) });
    }
    info!(account = ?session.account_address().map(|a| short_address(&a)), "{}", connected.outcome.message);

    let request = SubmissionRequest::new(
        args.payload.op,
        args.payload.text.clone(),
        args.dapp.clone().unwrap_or_else(|| cfg.contracts.dapp_address.clone()),
        args.input_box
            .clone()
            .unwrap_or_else(|| cfg.contracts.input_box_address.clone()),
    );
    let report = submitter.submit_with_report(&request).await;
    session.disconnect();
    Ok(report)
}

fn print_report(report: &SubmitReport) -> Result<()> {
    let SubmitReport { outcome, transaction, .. } = report;
    let SubmissionOutcome { kind, message } = outcome;
    let line = SubmitLine {
        kind: *kind,
        message,
        transaction: transaction.as_ref().map(|tx| tx.hash.to_string()),
    };
    println!("{}", serde_json::to_string(&line)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::PayloadArgs;
    use texttools_submit::Operation;
    use texttools_types::{Address, TextToolsError};
    use texttools_wallet::memory::{MemoryProvider, ProviderCall};
    use texttools_wallet::{addInputCall, ProviderError, WriteContractRequest};

    const ACCOUNT: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    fn args(dapp: Option<&str>) -> SubmitArgs {
        SubmitArgs {
            payload: PayloadArgs { op: Operation::Stats, text: "Cartesi top!".into() },
            dapp: dapp.map(str::to_string),
            input_box: None,
        }
    }

    #[tokio::test]
    async fn test_run_submit_uses_config_addresses() {
        let provider = Arc::new(MemoryProvider::new(ACCOUNT.parse().unwrap()));
        let cfg = AppConfig::default();

        let report = run_submit(provider.clone(), &cfg, &args(None)).await.unwrap();
        assert_eq!(report.outcome.kind, OutcomeKind::Ok);

        let calls = provider.write_calls();
        assert_eq!(calls.len(), 1);
        let input_box: Address = cfg.contracts.input_box_address.parse().unwrap();
        assert_eq!(calls[0].address, input_box);
        let call = addInputCall {
            appContract: cfg.contracts.dapp_address.parse().unwrap(),
            payload: encode(Operation::Stats, "Cartesi top!").into_bytes().into(),
        };
        assert_eq!(calls[0], WriteContractRequest::new(calls[0].account, input_box, &call));
        assert_eq!(provider.calls().last(), Some(&ProviderCall::Disconnect));
    }

    #[tokio::test]
    async fn test_run_submit_reports_bad_address_as_outcome() {
        let provider = Arc::new(MemoryProvider::new(ACCOUNT.parse().unwrap()));
        let cfg = AppConfig::default();

        let report = run_submit(provider.clone(), &cfg, &args(Some(""))).await.unwrap();
        assert_eq!(report.outcome, SubmissionOutcome::error("addresses required"));
        assert!(provider.write_calls().is_empty());
    }

    #[tokio::test]
    async fn test_run_submit_stops_when_connect_fails() {
        let provider = Arc::new(MemoryProvider::new(ACCOUNT.parse().unwrap()));
        provider.fail_connect(ProviderError::network("connection refused"));
        let cfg = AppConfig::default();

        let report = run_submit(provider.clone(), &cfg, &args(None)).await.unwrap();
        assert_eq!(report.outcome, SubmissionOutcome::error("connection refused"));
        assert_eq!(
            report.error,
            Some(TextToolsError::ProviderNetworkError("connection refused".into()))
        );
        assert!(provider.write_calls().is_empty());
    }
}
