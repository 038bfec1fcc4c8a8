//! User settings persistence.
//!
//! Stores mediator preferences in ~/.approval-mediator/config.toml.
//! Settings are loaded with env var > config.toml > default priority.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Origin tag of transactions the wallet creates itself.
pub const DEFAULT_INTERNAL_ORIGIN: &str = "MMM";

/// Mediator settings persisted to disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub wallet: WalletSettings,

    #[serde(default)]
    pub swaps: SwapsSettings,

    /// Tokens the user has added to the wallet.
    #[serde(default)]
    pub tokens: Vec<TokenSettings>,

    /// Cached token metadata keyed by contract address.
    #[serde(default)]
    pub token_registry: Vec<TokenSettings>,

    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Wallet identity and origin tags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletSettings {
    #[serde(default = "default_internal_origin")]
    pub internal_origin: String,

    /// Origin tag of the first-party swap aggregator.
    #[serde(default)]
    pub swap_origin: Option<String>,

    /// Active chain id, hex (`0x1`) or decimal.
    #[serde(default = "default_chain_id")]
    pub chain_id: String,

    #[serde(default)]
    pub selected_address: Option<String>,
}

fn default_internal_origin() -> String {
    DEFAULT_INTERNAL_ORIGIN.to_string()
}

fn default_chain_id() -> String {
    "0x1".to_string()
}

impl Default for WalletSettings {
    fn default() -> Self {
        Self {
            internal_origin: default_internal_origin(),
            swap_origin: None,
            chain_id: default_chain_id(),
            selected_address: None,
        }
    }
}

/// Swap aggregator contracts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapsSettings {
    /// Chain id (hex) to aggregator contract address.
    #[serde(default = "default_swap_contracts")]
    pub contracts: BTreeMap<String, String>,
}

fn default_swap_contracts() -> BTreeMap<String, String> {
    [
        ("0x1", "0x881d40237659c251811cec9c364ef91dc08d300c"),
        ("0x38", "0x1a1ec25dc08e98e5e93f1104b5e5cdd298707d31"),
        ("0x89", "0x1a1ec25dc08e98e5e93f1104b5e5cdd298707d31"),
        ("0xa86a", "0x1a1ec25dc08e98e5e93f1104b5e5cdd298707d31"),
    ]
    .into_iter()
    .map(|(chain, contract)| (chain.to_string(), contract.to_string()))
    .collect()
}

impl Default for SwapsSettings {
    fn default() -> Self {
        Self {
            contracts: default_swap_contracts(),
        }
    }
}

/// One token entry as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSettings {
    pub address: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Logging output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,

    #[serde(default)]
    pub json: bool,
}

fn default_log_filter() -> String {
    "approval_mediator=info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

impl Settings {
    /// Default TOML config file path (~/.approval-mediator/config.toml).
    pub fn default_toml_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".approval-mediator")
            .join("config.toml")
    }

    /// Load settings from a TOML file.
    ///
    /// Returns `None` if the file doesn't exist. Returns an error only
    /// if the file exists but can't be parsed.
    pub fn load_toml(path: &std::path::Path) -> Result<Option<Self>, String> {
        let data = match std::fs::read_to_string(path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(format!("failed to read {}: {}", path.display(), e)),
        };

        let settings: Self = toml::from_str(&data)
            .map_err(|e| format!("invalid TOML in {}: {}", path.display(), e))?;
        Ok(Some(settings))
    }

    /// Write a TOML config file with current settings.
    pub fn save_toml(&self, path: &std::path::Path) -> Result<(), String> {
        let raw = toml::to_string_pretty(self)
            .map_err(|e| format!("failed to serialize settings: {}", e))?;

        let content = format!(
            "# approval-mediator configuration file.\n\
             #\n\
             # Priority: env var > this file > defaults.\n\
             # Run `approval-mediator config init` to regenerate this file.\n\
             \n\
             {raw}"
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("failed to create {}: {}", parent.display(), e))?;
        }

        std::fs::write(path, content)
            .map_err(|e| format!("failed to write {}: {}", path.display(), e))
    }

    /// Merge values from `other` into `self`, preferring `other` for
    /// fields that differ from the default.
    pub fn merge_from(&mut self, other: &Self) {
        let default_json = match serde_json::to_value(Self::default()) {
            Ok(v) => v,
            Err(_) => return,
        };
        let other_json = match serde_json::to_value(other) {
            Ok(v) => v,
            Err(_) => return,
        };
        let mut self_json = match serde_json::to_value(&*self) {
            Ok(v) => v,
            Err(_) => return,
        };

        merge_non_default(&mut self_json, &other_json, &default_json);

        if let Ok(merged) = serde_json::from_value(self_json) {
            *self = merged;
        }
    }
}

fn merge_non_default(
    target: &mut serde_json::Value,
    other: &serde_json::Value,
    defaults: &serde_json::Value,
) {
    match (target, other, defaults) {
        (
            serde_json::Value::Object(t),
            serde_json::Value::Object(o),
            serde_json::Value::Object(d),
        ) => {
            for (key, other_val) in o {
                let default_val = d.get(key).cloned().unwrap_or(serde_json::Value::Null);
                if let Some(target_val) = t.get_mut(key) {
                    merge_non_default(target_val, other_val, &default_val);
                } else if other_val != &default_val {
                    t.insert(key.clone(), other_val.clone());
                }
            }
        }
        (target, other, defaults) => {
            if other != defaults {
                *target = other.clone();
            }
        }
    }
}
