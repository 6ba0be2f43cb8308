//! Shared types for the TextTools client: address parsing, hex helpers,
//! errors and the user-facing outcome of connect/submit attempts.

use thiserror::Error;

pub mod outcome;

pub use alloy_primitives::Address;
pub use outcome::{OutcomeKind, OutcomeSlot, SubmissionOutcome};

/// 0x-prefixed hex string (e.g. "0x1234...").
pub type Hex = String;

/// TextTools client error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TextToolsError {
    #[error("wallet not connected")]
    NotConnected,

    #[error("addresses required")]
    MissingAddress,

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    #[error("no wallet connector available")]
    NoConnector,

    #[error("connection already in progress")]
    ConnectionInProgress,

    #[error("connection cancelled")]
    ConnectionCancelled,

    #[error("invalid rpc url: {0}")]
    InvalidRpcUrl(String),

    #[error("a submission is already in flight")]
    SubmissionInFlight,

    #[error("{0}")]
    ProviderRejection(String),

    #[error("{0}")]
    ProviderNetworkError(String),

    #[error("{0}")]
    Unknown(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, TextToolsError>;

/// Parse a user-entered address: `0x` followed by exactly 40 hex digits,
/// either case. Checksums are not enforced.
pub fn parse_address(s: &str) -> Result<Address> {
    let s = s.trim();
    if s.is_empty() {
        return Err(TextToolsError::MissingAddress);
    }
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or_else(|| TextToolsError::InvalidAddress(format!("{s} (missing 0x prefix)")))?;
    if digits.len() != 40 {
        return Err(TextToolsError::InvalidAddress(format!(
            "{s} (expected 40 hex digits, got {})",
            digits.len()
        )));
    }
    digits
        .parse::<Address>()
        .map_err(|e| TextToolsError::InvalidAddress(format!("{s} ({e})")))
}

/// Abbreviated form for display, e.g. `0xab75…5a5e`.
pub fn short_address(address: &Address) -> String {
    let full = bytes_to_hex(address.as_slice());
    format!("{}…{}", &full[..6], &full[full.len() - 4..])
}

/// Parse a hex string (with or without 0x) to bytes.
pub fn hex_to_bytes(hex_str: &str) -> Result<Vec<u8>> {
    let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    hex::decode(hex_str).map_err(|e| TextToolsError::InvalidHex(e.to_string()))
}

/// Convert bytes to a 0x-prefixed lowercase hex string.
pub fn bytes_to_hex(bytes: &[u8]) -> Hex {
    format!("0x{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAPP: &str = "0xab7528bb862fB57E8A2BCd567a2e929a0Be56a5e";

    #[test]
    fn test_parse_address_mixed_case() {
        let addr = parse_address(DAPP).unwrap();
        assert_eq!(bytes_to_hex(addr.as_slice()), DAPP.to_lowercase());
        assert_eq!(short_address(&addr), "0xab75…5a5e");
        assert_eq!(parse_address(&format!("  {}  ", DAPP.to_lowercase())).unwrap(), addr);
    }

    #[test]
    fn test_parse_address_rejects_malformed() {
        assert_eq!(parse_address(""), Err(TextToolsError::MissingAddress));
        assert_eq!(parse_address("   "), Err(TextToolsError::MissingAddress));
        assert!(matches!(
            parse_address("ab7528bb862fB57E8A2BCd567a2e929a0Be56a5e"),
            Err(TextToolsError::InvalidAddress(_))
        ));
        assert!(matches!(parse_address("0x1234"), Err(TextToolsError::InvalidAddress(_))));
        assert!(matches!(
            parse_address("0xzz7528bb862fB57E8A2BCd567a2e929a0Be56a5e"),
            Err(TextToolsError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_hex_helpers() {
        assert_eq!(bytes_to_hex(&[0x7b, 0x00, 0xff]), "0x7b00ff");
        assert_eq!(hex_to_bytes("0x7b00ff").unwrap(), vec![0x7b, 0x00, 0xff]);
        assert_eq!(hex_to_bytes("7b").unwrap(), vec![0x7b]);
        assert!(matches!(hex_to_bytes("0x7"), Err(TextToolsError::InvalidHex(_))));
    }
}
