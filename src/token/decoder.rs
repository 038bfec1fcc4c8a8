//! Standard token call decoding and base-unit amount formatting.

use alloy_primitives::{Address, U256, hex};
use alloy_sol_types::{SolCall, sol};
use serde::Serialize;

use crate::error::DecodeError;

sol! {
    interface IERC20 {
        function transfer(address to, uint256 value) external returns (bool);
        function approve(address spender, uint256 value) external returns (bool);
        function transferFrom(address from, address to, uint256 value) external returns (bool);

        event Transfer(address indexed from, address indexed to, uint256 value);
    }
}

/// Selector of `approve(address,uint256)`.
pub const APPROVE_FUNCTION_SIGNATURE: [u8; 4] = [0x09, 0x5e, 0xa7, 0xb3];

/// Decimals of the chain's native currency.
pub const NATIVE_DECIMALS: u8 = 18;

/// Recognized standard token methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenMethod {
    #[serde(rename = "transfer")]
    Transfer,
    #[serde(rename = "approve")]
    Approve,
    #[serde(rename = "transferFrom")]
    TransferFrom,
}

impl TokenMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transfer => "transfer",
            Self::Approve => "approve",
            Self::TransferFrom => "transferFrom",
        }
    }
}

/// Decoded parameters of a standard token call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedTokenCall {
    pub method: TokenMethod,
    /// Amount in the token's base unit.
    pub amount: U256,
    /// Recipient for transfers, spender for approvals.
    pub address: Address,
    /// Source account for `transferFrom`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
}

impl DecodedTokenCall {
    /// Amount as a `0x`-prefixed hex quantity.
    pub fn amount_hex(&self) -> String {
        format!("{:#x}", self.amount)
    }
}

/// Decoded `approve` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApproveData {
    pub spender: Address,
    pub amount: U256,
}

fn selector_of(data: &[u8]) -> Result<[u8; 4], DecodeError> {
    data.get(..4)
        .and_then(|bytes| <[u8; 4]>::try_from(bytes).ok())
        .ok_or_else(|| DecodeError::UnrecognizedSelector {
            selector: format!("0x{}", hex::encode(data)),
        })
}

/// True when call data starts with the `approve` selector. No full decode.
pub fn is_approve_call(data: &[u8]) -> bool {
    data.starts_with(&APPROVE_FUNCTION_SIGNATURE)
}

/// Decode call data of a standard token method.
pub fn decode_token_call(data: &[u8]) -> Result<DecodedTokenCall, DecodeError> {
    let selector = selector_of(data)?;

    if selector == IERC20::transferCall::SELECTOR {
        let call = IERC20::transferCall::abi_decode(data).map_err(|e| DecodeError::Malformed {
            method: TokenMethod::Transfer.as_str(),
            reason: e.to_string(),
        })?;
        return Ok(DecodedTokenCall {
            method: TokenMethod::Transfer,
            amount: call.value,
            address: call.to,
            from: None,
        });
    }

    if selector == IERC20::approveCall::SELECTOR {
        let call = IERC20::approveCall::abi_decode(data).map_err(|e| DecodeError::Malformed {
            method: TokenMethod::Approve.as_str(),
            reason: e.to_string(),
        })?;
        return Ok(DecodedTokenCall {
            method: TokenMethod::Approve,
            amount: call.value,
            address: call.spender,
            from: None,
        });
    }

    if selector == IERC20::transferFromCall::SELECTOR {
        let call =
            IERC20::transferFromCall::abi_decode(data).map_err(|e| DecodeError::Malformed {
                method: TokenMethod::TransferFrom.as_str(),
                reason: e.to_string(),
            })?;
        return Ok(DecodedTokenCall {
            method: TokenMethod::TransferFrom,
            amount: call.value,
            address: call.to,
            from: Some(call.from),
        });
    }

    Err(DecodeError::UnrecognizedSelector {
        selector: format!("0x{}", hex::encode(selector)),
    })
}

/// Decode spender and amount of an `approve` call.
pub fn decode_approve_data(data: &[u8]) -> Result<ApproveData, DecodeError> {
    let call = decode_token_call(data)?;
    if call.method != TokenMethod::Approve {
        return Err(DecodeError::UnrecognizedSelector {
            selector: format!("0x{}", hex::encode(&data[..4])),
        });
    }
    Ok(ApproveData {
        spender: call.address,
        amount: call.amount,
    })
}

/// Render a base-unit amount as a plain decimal string, trailing zeros trimmed.
pub fn calc_token_amount(amount: U256, decimals: u8) -> String {
    let digits = amount.to_string();
    let decimals = usize::from(decimals);
    if decimals == 0 {
        return digits;
    }

    let (int_part, frac_part) = if digits.len() > decimals {
        let split = digits.len() - decimals;
        (digits[..split].to_string(), digits[split..].to_string())
    } else {
        ("0".to_string(), format!("{digits:0>decimals$}"))
    };

    let frac_part = frac_part.trim_end_matches('0');
    if frac_part.is_empty() {
        int_part
    } else {
        format!("{int_part}.{frac_part}")
    }
}

/// Render a native amount (wei) in whole units.
pub fn from_wei(value: U256) -> String {
    calc_token_amount(value, NATIVE_DECIMALS)
}
