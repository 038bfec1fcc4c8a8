//! Token call decoding and token metadata.

mod asset;
pub mod decoder;

pub use self::asset::{TokenAsset, TokenList, TokenRegistry, UNKNOWN_TOKEN_SYMBOL};
pub use self::decoder::{
    APPROVE_FUNCTION_SIGNATURE, ApproveData, DecodedTokenCall, IERC20, NATIVE_DECIMALS,
    TokenMethod, calc_token_amount, decode_approve_data, decode_token_call, from_wei,
    is_approve_call,
};
