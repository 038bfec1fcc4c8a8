//! Token metadata sources: the user's token list and the cached registry.

use std::collections::HashMap;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// Symbol used when token metadata cannot be resolved.
pub const UNKNOWN_TOKEN_SYMBOL: &str = "ERC20";

/// Resolved token asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAsset {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
}

impl TokenAsset {
    pub fn new(address: Address, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            address,
            symbol: symbol.into(),
            decimals,
        }
    }

    /// Placeholder for a token whose metadata lookup failed.
    pub fn unknown(address: Address) -> Self {
        Self::new(address, UNKNOWN_TOKEN_SYMBOL, 0)
    }

    pub fn is_unknown(&self) -> bool {
        self.symbol == UNKNOWN_TOKEN_SYMBOL && self.decimals == 0
    }
}

/// Tokens the user has added to the wallet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenList(Vec<TokenAsset>);

impl TokenList {
    pub fn new(tokens: Vec<TokenAsset>) -> Self {
        Self(tokens)
    }

    /// Address comparison is on raw bytes, so checksum casing never matters.
    pub fn find(&self, address: Address) -> Option<&TokenAsset> {
        self.0.iter().find(|token| token.address == address)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Cached token registry keyed by contract address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenRegistry(HashMap<Address, TokenAsset>);

impl TokenRegistry {
    pub fn get(&self, address: Address) -> Option<&TokenAsset> {
        self.0.get(&address)
    }

    pub fn insert(&mut self, asset: TokenAsset) {
        self.0.insert(asset.address, asset);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<TokenAsset> for TokenRegistry {
    fn from_iter<I: IntoIterator<Item = TokenAsset>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|asset| (asset.address, asset))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn token_list_lookup_ignores_checksum_casing() {
        let checksummed = Address::from_str("0x6B175474E89094C44Da98b954EedeAC495271d0F").unwrap();
        let lowercase = Address::from_str("0x6b175474e89094c44da98b954eedeac495271d0f").unwrap();
        let list = TokenList::new(vec![TokenAsset::new(checksummed, "DAI", 18)]);

        assert_eq!(list.find(lowercase).map(|t| t.symbol.as_str()), Some("DAI"));
    }

    #[test]
    fn unknown_asset_defaults() {
        let asset = TokenAsset::unknown(Address::ZERO);
        assert_eq!(asset.symbol, "ERC20");
        assert_eq!(asset.decimals, 0);
        assert!(asset.is_unknown());
    }
}
