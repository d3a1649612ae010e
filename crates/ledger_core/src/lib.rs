//! The remote ledger capability consumed by the execution engine.
//!
//! The engine never talks to a chain directly; it reads protocol state and
//! submits state-changing calls through [`RemoteLedger`]. `submit` blocks
//! until the network reports a final status and returns the confirmation
//! receipt with its ordered event logs. Implementations own signing,
//! nonce management, and transport.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use common::{AccountState, BondMetrics, BondTarget, Result, RewardSource, TxStatus};

/// A token the account may grant spending rights on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Token {
    /// OHM.
    Native,
    /// FRAX.
    Reserve,
    /// OHM-FRAX pool token.
    PoolToken,
}

/// A contract granted spending rights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Spender {
    SwapRouter,
    Bond(BondTarget),
}

/// One state-changing call, fully described.
///
/// The engine builds these; the ledger implementation encodes, signs, and
/// submits them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCall {
    /// Claim a bond's accrued reward. With `autostake` the payout lands in
    /// the staked position, otherwise it stays liquid.
    RedeemReward {
        source: RewardSource,
        autostake: bool,
    },
    /// Unstake sOHM back to liquid OHM.
    Unstake { amount: u128 },
    /// Grant `spender` the right to move `amount` of `token`.
    Approve {
        token: Token,
        spender: Spender,
        amount: u128,
    },
    /// Swap OHM for FRAX through the router.
    SwapForReserve {
        amount_in: u128,
        min_amount_out: u128,
        deadline: u64,
    },
    /// Add OHM-FRAX liquidity through the router.
    AddLiquidity {
        native_desired: u128,
        reserve_desired: u128,
        native_min: u128,
        reserve_min: u128,
    },
    /// Deposit principal into a bond at no worse than `max_price`.
    DepositBond {
        target: BondTarget,
        amount: u128,
        max_price: u128,
    },
}

/// One entry of a confirmation's ordered event log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// 32-byte big-endian data word.
    pub data: Vec<u8>,
}

impl LogEntry {
    /// Build a log entry carrying a single amount word.
    pub fn amount(value: u128) -> Self {
        let mut data = vec![0u8; 32];
        data[16..].copy_from_slice(&value.to_be_bytes());
        Self { data }
    }
}

/// Final confirmation of one submitted call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: String,
    pub status: TxStatus,
    pub logs: Vec<LogEntry>,
}

impl Receipt {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Decode the trailing amount word of a log's data field.
///
/// Wider values than `u128` saturate; real payouts never approach that.
pub fn decode_amount_word(data: &[u8]) -> u128 {
    let start = data.len().saturating_sub(16);
    data[start..]
        .iter()
        .fold(0u128, |value, byte| (value << 8) | *byte as u128)
}

/// Bond discount derived from two independent live price reads.
///
/// Positive when the bond undercuts market price; negative at a premium.
pub fn discount_percent(bond_price_usd: f64, market_price_usd: f64) -> f64 {
    100.0 - bond_price_usd * 100.0 / market_price_usd
}

/// Capability for reading protocol state and submitting signed calls.
#[async_trait]
pub trait RemoteLedger: Send + Sync {
    /// Current account balances.
    async fn account_state(&self) -> Result<AccountState>;

    /// Pending claimable reward for one bond contract.
    async fn pending_reward(&self, source: RewardSource) -> Result<u128>;

    /// Point-in-time discount snapshot for one bond.
    async fn bond_metrics(&self, target: BondTarget) -> Result<BondMetrics>;

    /// Live bond price in the bond contract's own units, read immediately
    /// before a deposit to bound its max price.
    async fn bond_price(&self, target: BondTarget) -> Result<u128>;

    /// Blocks remaining before the next rebase event.
    async fn blocks_until_rebase(&self) -> Result<u64>;

    /// Build, sign, submit, and block until `call` is finalized.
    ///
    /// Confirmed-but-reverted calls return a `Failed` receipt, not an
    /// error; `Err` means the ledger itself was unreachable.
    async fn submit(&self, call: LedgerCall, gas: u64, gas_price: u64) -> Result<Receipt>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_word_round_trips() {
        let entry = LogEntry::amount(123_456_789_000);
        assert_eq!(entry.data.len(), 32);
        assert_eq!(decode_amount_word(&entry.data), 123_456_789_000);
    }

    #[test]
    fn amount_word_decodes_short_data() {
        assert_eq!(decode_amount_word(&[0x01, 0x00]), 256);
        assert_eq!(decode_amount_word(&[]), 0);
    }

    #[test]
    fn discount_is_positive_below_market() {
        let d = discount_percent(95.0, 100.0);
        assert!((d - 5.0).abs() < 1e-9);
        assert!(discount_percent(110.0, 100.0) < 0.0);
    }
}
