//! Canonical request payload: the wire contract with the off-chain node.
//!
//! payload = utf8(`{"op":<op>,"text":<text>}`), compact, keys in that order,
//! rendered as 0x-prefixed lowercase hex.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use texttools_types::{bytes_to_hex, hex_to_bytes, Hex, Result, TextToolsError};

/// Text operation understood by the off-chain node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Stats,
    Shout,
    Palindrome,
}

impl Operation {
    pub const ALL: [Operation; 3] = [Operation::Stats, Operation::Shout, Operation::Palindrome];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Stats => "stats",
            Operation::Shout => "shout",
            Operation::Palindrome => "palindrome",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = TextToolsError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        Operation::ALL
            .into_iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| TextToolsError::UnknownOperation(name.to_string()))
    }
}

/// Encoded request bytes, ready to be passed as the `bytes payload` argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EncodedPayload(Vec<u8>);

impl EncodedPayload {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn to_hex(&self) -> Hex {
        bytes_to_hex(&self.0)
    }
}

impl fmt::Display for EncodedPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Encode `{op, text}`. Total over all text, including the empty string.
pub fn encode(operation: Operation, text: &str) -> EncodedPayload {
    // Value's Display is compact JSON with standard string escaping.
    let json = format!(
        r#"{{"op":{},"text":{}}}"#,
        Value::from(operation.as_str()),
        Value::from(text)
    );
    EncodedPayload(json.into_bytes())
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct WirePayload {
    op: String,
    text: String,
}

/// Decode a hex payload back into its operation and text.
pub fn decode_payload(hex_str: &str) -> Result<(Operation, String)> {
    let bytes = hex_to_bytes(hex_str)?;
    let wire: WirePayload = serde_json::from_slice(&bytes)
        .map_err(|e| TextToolsError::Other(format!("invalid payload json: {}", e)))?;
    let op = wire.op.parse()?;
    Ok((op, wire.text))
}
