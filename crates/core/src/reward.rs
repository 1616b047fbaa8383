//! Miner and uncle reward computation.
//!
//! Rewards are recorded with header and uncle rows so consumers can read
//! them without re-executing fee math. The block reward is the era subsidy
//! plus transaction fees plus the inclusion bonus per uncle; the uncle
//! reward decays with the distance between the uncle and the including
//! block.

use alloy::{
    consensus::{Header, ReceiptEnvelope, Transaction, TxEnvelope, TxReceipt},
    primitives::U256,
};

/// First block of the Byzantium era (3 ETH subsidy).
const BYZANTIUM_BLOCK: u64 = 4_370_000;
/// First block of the Constantinople era (2 ETH subsidy).
const CONSTANTINOPLE_BLOCK: u64 = 7_280_000;

const WEI_PER_ETH: u64 = 1_000_000_000_000_000_000;

/// The static mining subsidy for a block at the given height.
pub fn static_subsidy(block_number: u64) -> U256 {
    let eth = if block_number < BYZANTIUM_BLOCK {
        5
    } else if block_number < CONSTANTINOPLE_BLOCK {
        3
    } else {
        2
    };
    U256::from(eth) * U256::from(WEI_PER_ETH)
}

/// The full miner reward for a block: subsidy, fees, uncle bonuses.
pub fn block_reward(
    header: &Header,
    uncle_count: usize,
    transactions: &[TxEnvelope],
    receipts: &[ReceiptEnvelope],
) -> U256 {
    let subsidy = static_subsidy(header.number);
    let fees = transaction_fees(header, transactions, receipts);
    let uncle_bonus = U256::from(uncle_count as u64) * (subsidy / U256::from(32));
    subsidy + fees + uncle_bonus
}

/// The reward paid to the miner of an uncle included at `block_number`.
///
/// `(uncle_number + 8 - block_number) * subsidy / 8`, floored at zero for
/// uncles older than the inclusion horizon.
pub fn uncle_reward(block_number: u64, uncle_number: u64) -> U256 {
    let numerator = (uncle_number + 8).saturating_sub(block_number);
    U256::from(numerator) * static_subsidy(block_number) / U256::from(8)
}

fn transaction_fees(
    header: &Header,
    transactions: &[TxEnvelope],
    receipts: &[ReceiptEnvelope],
) -> U256 {
    let mut fees = U256::ZERO;
    let mut prev_cumulative = 0u64;
    for (tx, receipt) in transactions.iter().zip(receipts) {
        let cumulative = receipt.cumulative_gas_used();
        let gas_used = cumulative.saturating_sub(prev_cumulative);
        prev_cumulative = cumulative;
        let price = tx.effective_gas_price(header.base_fee_per_gas);
        fees += U256::from(price) * U256::from(gas_used);
    }
    fees
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subsidy_follows_the_eras() {
        assert_eq!(static_subsidy(0), U256::from(5u64) * U256::from(WEI_PER_ETH));
        assert_eq!(
            static_subsidy(BYZANTIUM_BLOCK),
            U256::from(3u64) * U256::from(WEI_PER_ETH)
        );
        assert_eq!(
            static_subsidy(CONSTANTINOPLE_BLOCK),
            U256::from(2u64) * U256::from(WEI_PER_ETH)
        );
    }

    #[test]
    fn uncle_reward_decays_with_distance() {
        let one_back = uncle_reward(100, 99);
        let seven_back = uncle_reward(100, 93);
        assert!(one_back > seven_back);
        assert_eq!(one_back, U256::from(7u64) * static_subsidy(100) / U256::from(8));
    }

    #[test]
    fn stale_uncle_earns_nothing() {
        assert_eq!(uncle_reward(100, 80), U256::ZERO);
    }

    #[test]
    fn empty_block_reward_is_the_subsidy() {
        let header = Header { number: 1, ..Default::default() };
        assert_eq!(block_reward(&header, 0, &[], &[]), static_subsidy(1));
    }
}
