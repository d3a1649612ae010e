//! Core domain types.
//!
//! Amounts are `u128` base units throughout. OHM and sOHM carry nine
//! decimals; FRAX and the OHM-FRAX pool token carry eighteen. Config
//! thresholds are entered in whole tokens and converted once at startup.

use serde::{Deserialize, Serialize};

/// One whole OHM (or sOHM) in base units.
pub const ONE_NATIVE: u128 = 1_000_000_000;

/// One whole FRAX (or pool token) in base units.
pub const ONE_RESERVE: u128 = 1_000_000_000_000_000_000;

/// Convert a whole-token OHM amount to base units.
pub fn native_units(amount: f64) -> u128 {
    (amount * ONE_NATIVE as f64).round() as u128
}

/// Convert OHM base units to whole tokens for display and comparisons.
pub fn native_tokens(units: u128) -> f64 {
    units as f64 / ONE_NATIVE as f64
}

/// Convert FRAX base units to whole tokens for display.
pub fn reserve_tokens(units: u128) -> f64 {
    units as f64 / ONE_RESERVE as f64
}

// ── Protocol positions ────────────────────────────────────────────────

/// A bond contract the account accrues claimable rewards from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardSource {
    Frax,
    OhmFraxLp,
    Gohm,
}

impl RewardSource {
    pub const ALL: [RewardSource; 3] = [
        RewardSource::Frax,
        RewardSource::OhmFraxLp,
        RewardSource::Gohm,
    ];

    pub fn label(self) -> &'static str {
        match self {
            RewardSource::Frax => "FRAX",
            RewardSource::OhmFraxLp => "OHM-FRAX LP",
            RewardSource::Gohm => "gOHM",
        }
    }
}

/// A bond the engine can deposit principal into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BondTarget {
    Frax,
    OhmFraxLp,
}

impl BondTarget {
    pub fn label(self) -> &'static str {
        match self {
            BondTarget::Frax => "FRAX",
            BondTarget::OhmFraxLp => "OHM-FRAX LP",
        }
    }

    /// The reward source backed by this bond's own contract.
    pub fn reward_source(self) -> RewardSource {
        match self {
            BondTarget::Frax => RewardSource::Frax,
            BondTarget::OhmFraxLp => RewardSource::OhmFraxLp,
        }
    }
}

/// Per-source pending rewards, recomputed fresh on every poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRewards {
    pub frax: u128,
    pub ohm_frax_lp: u128,
    pub gohm: u128,
}

impl PendingRewards {
    pub fn get(&self, source: RewardSource) -> u128 {
        match source {
            RewardSource::Frax => self.frax,
            RewardSource::OhmFraxLp => self.ohm_frax_lp,
            RewardSource::Gohm => self.gohm,
        }
    }

    /// Sum across all sources.
    pub fn total(&self) -> u128 {
        self.frax + self.ohm_frax_lp + self.gohm
    }
}

/// Live account balances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccountState {
    /// sOHM balance.
    pub staked_balance: u128,
    /// Liquid OHM balance.
    pub native_balance: u128,
    /// OHM-FRAX pool token balance.
    pub pool_token_balance: u128,
}

/// Point-in-time bond pricing snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BondMetrics {
    /// Percentage by which the bond price undercuts market price.
    pub discount_percent: f64,
}

// ── Execution results ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    Success,
    Failed,
}

impl TxStatus {
    pub fn is_success(self) -> bool {
        matches!(self, TxStatus::Success)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    ClaimReward,
    Unstake,
    Swap,
    AddLiquidity,
    DepositBond,
    Approve,
}

/// Outcome of one remote state-changing operation.
///
/// `amount` carries the operation's economic effect when a later step
/// depends on it: OHM claimed or unstaked, FRAX received from a swap,
/// pool tokens minted. Absent on failure and for approvals/deposits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResult {
    pub kind: TxKind,
    pub tx_hash: String,
    pub status: TxStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<u128>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Rebase,
    Bond,
}

/// The unit handed to the audit sink after one strategy run.
///
/// Immutable once constructed. `completed` is false when a failed step
/// aborted the remaining sequence; `steps` then holds whatever ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub operation: OperationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<BondTarget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<f64>,
    pub steps: Vec<TransactionResult>,
    pub completed: bool,
}
