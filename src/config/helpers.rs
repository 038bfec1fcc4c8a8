use std::str::FromStr;

use alloy_primitives::Address;

use crate::error::ConfigError;

/// Read an env var, treating unset and blank values the same.
pub(crate) fn optional_env(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value.trim().to_string())),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "not valid unicode".to_string(),
        }),
    }
}

/// Parse a chain id written as `0x`-hex or decimal.
pub(crate) fn parse_chain_id(value: &str, key: &str) -> Result<u64, ConfigError> {
    let value = value.trim();
    let parsed = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("must be a hex or decimal chain id: {e}"),
    })
}

pub(crate) fn parse_address(value: &str, key: &str) -> Result<Address, ConfigError> {
    Address::from_str(value.trim()).map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("must be a 20-byte hex address: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_ids_parse_from_hex_and_decimal() {
        assert_eq!(parse_chain_id("0x1", "k").unwrap(), 1);
        assert_eq!(parse_chain_id("0xa86a", "k").unwrap(), 43114);
        assert_eq!(parse_chain_id("56", "k").unwrap(), 56);
        assert!(parse_chain_id("mainnet", "k").is_err());
    }

    #[test]
    fn bad_addresses_name_their_key() {
        let err = parse_address("0x1234", "MEDIATOR_SELECTED_ADDRESS").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref key, .. } if key == "MEDIATOR_SELECTED_ADDRESS"
        ));
    }
}
