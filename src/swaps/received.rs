use alloy_primitives::{Address, U256};
use alloy_sol_types::SolEvent;

use super::DestinationToken;
use crate::gateway::TransactionReceipt;
use crate::token::IERC20;
use crate::transaction::TransactionParams;

/// Best-effort amount of destination token the user received, in base units.
///
/// Native destinations use the balance difference with the swap's and the
/// approval's gas costs added back. Token destinations read the destination
/// token's `Transfer` log addressed to the user.
#[allow(clippy::too_many_arguments)]
pub fn tokens_received(
    receipt: &TransactionReceipt,
    approval_receipt: Option<&TransactionReceipt>,
    transaction: &TransactionParams,
    approval_transaction: Option<&TransactionParams>,
    destination: &DestinationToken,
    user: Address,
    pre_balance: U256,
    post_balance: U256,
) -> Option<U256> {
    if destination.is_native() {
        let swap_gas_cost = receipt.gas_cost(transaction.gas_price)?;
        let approval_gas_cost = match approval_receipt {
            Some(approval) => {
                approval.gas_cost(approval_transaction.and_then(|tx| tx.gas_price))?
            }
            None => U256::ZERO,
        };
        return post_balance
            .checked_add(swap_gas_cost)?
            .checked_add(approval_gas_cost)?
            .checked_sub(pre_balance);
    }

    let recipient = user.into_word();
    receipt
        .logs
        .iter()
        .find(|log| {
            log.address == destination.address
                && log.topics.first() == Some(&IERC20::Transfer::SIGNATURE_HASH)
                && log.topics.get(2) == Some(&recipient)
        })
        .and_then(|log| log.data.get(..32))
        .map(U256::from_be_slice)
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{B256, Bytes, address};

    use super::*;
    use crate::gateway::Log;

    const USER: Address = address!("0x2222222222222222222222222222222222222222");
    const DAI: Address = address!("0x6b175474e89094c44da98b954eedeac495271d0f");

    fn receipt(gas_used: u64, price: u64, logs: Vec<Log>) -> TransactionReceipt {
        TransactionReceipt {
            transaction_hash: B256::repeat_byte(0x01),
            block_hash: B256::repeat_byte(0x02),
            gas_used: U256::from(gas_used),
            effective_gas_price: Some(U256::from(price)),
            logs,
        }
    }

    fn transfer_log(token: Address, to: Address, amount: u64) -> Log {
        Log {
            address: token,
            topics: vec![
                IERC20::Transfer::SIGNATURE_HASH,
                Address::ZERO.into_word(),
                to.into_word(),
            ],
            data: Bytes::from(U256::from(amount).to_be_bytes::<32>().to_vec()),
        }
    }

    #[test]
    fn native_received_adds_back_gas_costs() {
        let eth = DestinationToken {
            address: Address::ZERO,
            symbol: "ETH".to_string(),
            decimals: 18,
        };
        let swap = receipt(100, 10, Vec::new());
        let approval = receipt(50, 10, Vec::new());

        let received = tokens_received(
            &swap,
            Some(&approval),
            &TransactionParams::default(),
            None,
            &eth,
            USER,
            U256::from(10_000u64),
            U256::from(10_500u64),
        );

        // 10_500 + 1_000 + 500 - 10_000
        assert_eq!(received, Some(U256::from(2_000u64)));
    }

    #[test]
    fn token_received_reads_transfer_to_user() {
        let dai = DestinationToken {
            address: DAI,
            symbol: "DAI".to_string(),
            decimals: 18,
        };
        let other = address!("0x3333333333333333333333333333333333333333");
        let swap = receipt(
            100,
            1,
            vec![transfer_log(DAI, other, 1), transfer_log(DAI, USER, 42)],
        );

        let received = tokens_received(
            &swap,
            None,
            &TransactionParams::default(),
            None,
            &dai,
            USER,
            U256::ZERO,
            U256::ZERO,
        );
        assert_eq!(received, Some(U256::from(42u64)));
    }

    #[test]
    fn token_without_matching_log_is_unknown() {
        let dai = DestinationToken {
            address: DAI,
            symbol: "DAI".to_string(),
            decimals: 18,
        };
        let swap = receipt(100, 1, Vec::new());

        assert_eq!(
            tokens_received(
                &swap,
                None,
                &TransactionParams::default(),
                None,
                &dai,
                USER,
                U256::ZERO,
                U256::ZERO,
            ),
            None
        );
    }
}
