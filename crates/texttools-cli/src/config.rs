use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

pub const DEFAULT_RPC_URL: &str = "http://localhost:8545";
pub const DEFAULT_CHAIN_ID: u64 = 31337;
pub const DEFAULT_CHAIN_NAME: &str = "Cartesi Local";
pub const DEFAULT_DAPP_ADDRESS: &str = "0xab7528bb862fB57E8A2BCd567a2e929a0Be56a5e";
pub const DEFAULT_INPUT_BOX_ADDRESS: &str = "0x59b22D57D4f067708AB0c00552767405926dc768";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub network: NetworkConfig,
    pub contracts: ContractsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub chain_name: String,
    pub request_timeout_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            chain_id: DEFAULT_CHAIN_ID,
            chain_name: DEFAULT_CHAIN_NAME.to_string(),
            request_timeout_ms: 30_000,
        }
    }
}

/// Addresses stay raw strings: they are validated per submission so that a
/// bad value is reported as a submission error, not a startup failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractsConfig {
    pub dapp_address: String,
    pub input_box_address: String,
}

impl Default for ContractsConfig {
    fn default() -> Self {
        Self {
            dapp_address: DEFAULT_DAPP_ADDRESS.to_string(),
            input_box_address: DEFAULT_INPUT_BOX_ADDRESS.to_string(),
        }
    }
}

impl AppConfig {
    /// Defaults, then the TOML file if given, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, |name| env::var(name).ok())
    }

    /// [`load`](Self::load) with variables read through `lookup`.
    pub fn load_with(path: Option<&Path>, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut cfg = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("failed reading config file: {}", path.display()))?;
                Self::parse(&raw)?
            }
            None => Self::default(),
        };
        cfg.apply_env(&lookup)?;
        Ok(cfg)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let cfg: AppConfig = toml::from_str(raw).context("failed parsing config toml")?;
        if cfg.network.rpc_url.trim().is_empty() {
            return Err(anyhow!("network.rpc_url must not be empty"));
        }
        if cfg.network.request_timeout_ms == 0 {
            return Err(anyhow!("network.request_timeout_ms must be > 0"));
        }
        Ok(cfg)
    }

    fn apply_env(&mut self, lookup: &impl Fn(&str) -> Option<String>) -> Result<()> {
        for (name, slot) in [
            ("TEXTTOOLS_RPC_URL", &mut self.network.rpc_url),
            ("TEXTTOOLS_DAPP_ADDRESS", &mut self.contracts.dapp_address),
            ("TEXTTOOLS_INPUT_BOX_ADDRESS", &mut self.contracts.input_box_address),
        ] {
            if let Some(v) = lookup(name).filter(|v| !v.trim().is_empty()) {
                *slot = v;
            }
            *slot = resolve_env_ref(slot, lookup)?;
        }
        Ok(())
    }
}

/// Resolve `env:VAR` to the value of `VAR`; other values pass through.
fn resolve_env_ref(value: &str, lookup: &impl Fn(&str) -> Option<String>) -> Result<String> {
    const PREFIX: &str = "env:";
    if let Some(var) = value.strip_prefix(PREFIX) {
        let var = var.trim();
        if var.is_empty() {
            return Err(anyhow!("invalid env ref: {value}"));
        }
        return lookup(var).ok_or_else(|| anyhow!("missing env var {var} for {value}"));
    }
    Ok(value.to_string())
}
