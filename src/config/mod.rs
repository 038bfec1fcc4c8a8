//! Configuration for the approval mediator.
//!
//! Settings are loaded with priority: env var > TOML config file > default.
//! `.env` in the working directory is loaded via dotenvy before resolution.

pub(crate) mod helpers;

use std::collections::BTreeMap;
use std::path::Path;

use alloy_primitives::Address;
use serde::Serialize;

use crate::error::ConfigError;
use crate::settings::{Settings, TokenSettings};
use crate::token::{TokenAsset, TokenList, TokenRegistry};

/// Resolved mediator configuration.
#[derive(Debug, Clone, Serialize)]
pub struct MediatorConfig {
    /// Origin tag of wallet-internal transactions; these are never surfaced.
    pub internal_origin: String,
    /// Origin tag of the trusted swap aggregator.
    pub swap_origin: Option<String>,
    pub chain_id: u64,
    pub selected_address: Option<Address>,
    pub swap_contracts: BTreeMap<u64, Address>,
    pub tokens: TokenList,
    #[serde(skip)]
    pub token_registry: TokenRegistry,
    pub logging: LoggingConfig,
}

/// Logging output configuration.
#[derive(Debug, Clone, Serialize)]
pub struct LoggingConfig {
    pub filter: String,
    pub json: bool,
}

impl LoggingConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let json = helpers::optional_env("MEDIATOR_LOG_JSON")?
            .map(|s| s.parse())
            .transpose()
            .map_err(|e| ConfigError::InvalidValue {
                key: "MEDIATOR_LOG_JSON".to_string(),
                message: format!("must be true or false: {e}"),
            })?
            .unwrap_or(settings.logging.json);

        Ok(Self {
            filter: settings.logging.filter.clone(),
            json,
        })
    }
}

impl MediatorConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let internal_origin = helpers::optional_env("MEDIATOR_INTERNAL_ORIGIN")?
            .unwrap_or_else(|| settings.wallet.internal_origin.clone());
        if internal_origin.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "MEDIATOR_INTERNAL_ORIGIN".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        let swap_origin = helpers::optional_env("SWAPS_ORIGIN")?
            .or_else(|| settings.wallet.swap_origin.clone())
            .filter(|origin| !origin.trim().is_empty());

        let chain_id = helpers::parse_chain_id(
            &helpers::optional_env("MEDIATOR_CHAIN_ID")?
                .unwrap_or_else(|| settings.wallet.chain_id.clone()),
            "MEDIATOR_CHAIN_ID",
        )?;

        let selected_address = helpers::optional_env("MEDIATOR_SELECTED_ADDRESS")?
            .or_else(|| settings.wallet.selected_address.clone())
            .map(|s| helpers::parse_address(&s, "MEDIATOR_SELECTED_ADDRESS"))
            .transpose()?;

        let mut swap_contracts = BTreeMap::new();
        for (chain, contract) in &settings.swaps.contracts {
            let key = format!("swaps.contracts.{chain}");
            swap_contracts.insert(
                helpers::parse_chain_id(chain, &key)?,
                helpers::parse_address(contract, &key)?,
            );
        }

        let tokens = TokenList::new(resolve_tokens(&settings.tokens, "tokens")?);
        let token_registry = resolve_tokens(&settings.token_registry, "token_registry")?
            .into_iter()
            .collect();

        Ok(Self {
            internal_origin,
            swap_origin,
            chain_id,
            selected_address,
            swap_contracts,
            tokens,
            token_registry,
            logging: LoggingConfig::resolve(settings)?,
        })
    }

    /// Load configuration from environment variables and the default TOML file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with_toml(None)
    }

    /// Load from env with an optional explicit TOML config file.
    ///
    /// An explicit path must exist and parse. The default path
    /// `~/.approval-mediator/config.toml` is optional.
    pub fn from_env_with_toml(toml_path: Option<&Path>) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let mut settings = Settings::default();
        Self::apply_toml_overlay(&mut settings, toml_path)?;
        Self::resolve(&settings)
    }

    fn apply_toml_overlay(
        settings: &mut Settings,
        explicit_path: Option<&Path>,
    ) -> Result<(), ConfigError> {
        let path = explicit_path
            .map(Path::to_path_buf)
            .unwrap_or_else(Settings::default_toml_path);

        match Settings::load_toml(&path) {
            Ok(Some(toml_settings)) => {
                settings.merge_from(&toml_settings);
                tracing::debug!("Loaded TOML config from {}", path.display());
            }
            Ok(None) => {
                if explicit_path.is_some() {
                    return Err(ConfigError::ParseError(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
            }
            Err(e) => {
                if explicit_path.is_some() {
                    return Err(ConfigError::ParseError(format!(
                        "Failed to load config file {}: {}",
                        path.display(),
                        e
                    )));
                }
                tracing::warn!("Failed to load default config file: {}", e);
            }
        }
        Ok(())
    }

    /// Aggregator contract for a chain, if swaps are supported there.
    pub fn swap_contract(&self, chain_id: u64) -> Option<Address> {
        self.swap_contracts.get(&chain_id).copied()
    }
}

fn resolve_tokens(entries: &[TokenSettings], key: &str) -> Result<Vec<TokenAsset>, ConfigError> {
    entries
        .iter()
        .map(|entry| {
            let address = helpers::parse_address(&entry.address, key)?;
            Ok(TokenAsset::new(address, entry.symbol.clone(), entry.decimals))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use alloy_primitives::address;

    use super::*;
    use crate::settings::TokenSettings;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn clear_mediator_env() {
        // SAFETY: Guarded by ENV_MUTEX in tests.
        unsafe {
            std::env::remove_var("MEDIATOR_INTERNAL_ORIGIN");
            std::env::remove_var("SWAPS_ORIGIN");
            std::env::remove_var("MEDIATOR_CHAIN_ID");
            std::env::remove_var("MEDIATOR_SELECTED_ADDRESS");
            std::env::remove_var("MEDIATOR_LOG_JSON");
        }
    }

    #[test]
    fn resolver_uses_safe_defaults() {
        let _guard = ENV_MUTEX.lock().expect("env mutex poisoned");
        clear_mediator_env();

        let config = MediatorConfig::resolve(&Settings::default()).expect("defaults resolve");

        assert_eq!(config.internal_origin, "MMM");
        assert_eq!(config.swap_origin, None);
        assert_eq!(config.chain_id, 1);
        assert_eq!(
            config.swap_contract(1),
            Some(address!("0x881d40237659c251811cec9c364ef91dc08d300c"))
        );
        assert_eq!(
            config.swap_contract(56),
            Some(address!("0x1a1ec25dc08e98e5e93f1104b5e5cdd298707d31"))
        );
        assert_eq!(config.swap_contract(10), None);
        assert!(config.tokens.is_empty());
        assert!(!config.logging.json);
    }

    #[test]
    fn resolver_applies_env_overrides() {
        let _guard = ENV_MUTEX.lock().expect("env mutex poisoned");
        clear_mediator_env();

        // SAFETY: Guarded by ENV_MUTEX in tests.
        unsafe {
            std::env::set_var("SWAPS_ORIGIN", "swaps.example");
            std::env::set_var("MEDIATOR_CHAIN_ID", "0x89");
            std::env::set_var(
                "MEDIATOR_SELECTED_ADDRESS",
                "0x2222222222222222222222222222222222222222",
            );
            std::env::set_var("MEDIATOR_LOG_JSON", "true");
        }

        let config = MediatorConfig::resolve(&Settings::default()).expect("env resolves");
        clear_mediator_env();

        assert_eq!(config.swap_origin.as_deref(), Some("swaps.example"));
        assert_eq!(config.chain_id, 137);
        assert_eq!(
            config.selected_address,
            Some(address!("0x2222222222222222222222222222222222222222"))
        );
        assert!(config.logging.json);
    }

    #[test]
    fn resolver_rejects_invalid_chain_id() {
        let _guard = ENV_MUTEX.lock().expect("env mutex poisoned");
        clear_mediator_env();

        // SAFETY: Guarded by ENV_MUTEX in tests.
        unsafe {
            std::env::set_var("MEDIATOR_CHAIN_ID", "ethereum");
        }

        let err = MediatorConfig::resolve(&Settings::default()).unwrap_err();
        clear_mediator_env();

        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref key, .. } if key == "MEDIATOR_CHAIN_ID"
        ));
    }

    #[test]
    fn resolver_rejects_invalid_token_address() {
        let _guard = ENV_MUTEX.lock().expect("env mutex poisoned");
        clear_mediator_env();

        let mut settings = Settings::default();
        settings.tokens.push(TokenSettings {
            address: "not-an-address".to_string(),
            symbol: "BAD".to_string(),
            decimals: 18,
        });

        let err = MediatorConfig::resolve(&settings).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref key, .. } if key == "tokens"
        ));
    }

    #[test]
    fn explicit_missing_toml_is_fatal() {
        let _guard = ENV_MUTEX.lock().expect("env mutex poisoned");
        clear_mediator_env();

        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");

        let err = MediatorConfig::from_env_with_toml(Some(&missing)).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn explicit_toml_feeds_token_sources() {
        let _guard = ENV_MUTEX.lock().expect("env mutex poisoned");
        clear_mediator_env();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[wallet]\nchain_id = \"0x38\"\n\n\
             [[token_registry]]\naddress = \"0x6b175474e89094c44da98b954eedeac495271d0f\"\nsymbol = \"DAI\"\ndecimals = 18\n",
        )
        .unwrap();

        let config = MediatorConfig::from_env_with_toml(Some(&path)).expect("toml resolves");

        assert_eq!(config.chain_id, 56);
        assert_eq!(
            config
                .token_registry
                .get(address!("0x6b175474e89094c44da98b954eedeac495271d0f"))
                .map(|t| t.symbol.as_str()),
            Some("DAI")
        );
    }
}
