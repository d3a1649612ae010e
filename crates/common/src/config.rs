//! Bot configuration types.
//!
//! Thresholds are entered in whole tokens; the engines convert to base
//! units once at startup via [`StrategyConfig::thresholds`].

use serde::{Deserialize, Serialize};

use crate::types::{native_units, ONE_RESERVE};

/// Top-level bot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Run against the in-process simulated ledger.
    #[serde(default = "default_true")]
    pub paper_mode: bool,

    /// Strategy thresholds.
    #[serde(default)]
    pub strategy: StrategyConfig,

    /// Submission gas parameters.
    #[serde(default)]
    pub gas: GasConfig,

    /// Timing parameters (seconds unless noted).
    #[serde(default)]
    pub timing: TimingConfig,

    /// Seed state for the simulated ledger.
    #[serde(default)]
    pub paper: PaperConfig,
}

/// Strategy thresholds and the funding-source preference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Minimum pending reward (OHM) worth a claim transaction.
    #[serde(default = "default_min_claim")]
    pub min_pending_reward_to_claim: f64,

    /// Minimum sOHM balance (OHM) required to bond from the staked position.
    #[serde(default = "default_min_to_bond")]
    pub min_staked_balance_to_bond: f64,

    /// Minimum bond discount (percent) worth bonding at.
    #[serde(default = "default_min_discount")]
    pub min_bond_discount_percent: f64,

    /// Allow funding bonds from pending rewards instead of unstaking.
    #[serde(default = "default_true")]
    pub use_pending_rewards: bool,
}

/// Base-unit thresholds derived from [`StrategyConfig`] at startup.
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    pub min_pending_reward_to_claim: u128,
    pub min_staked_balance_to_bond: u128,
    pub min_bond_discount_percent: f64,
    pub use_pending_rewards: bool,
}

impl StrategyConfig {
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            min_pending_reward_to_claim: native_units(self.min_pending_reward_to_claim),
            min_staked_balance_to_bond: native_units(self.min_staked_balance_to_bond),
            min_bond_discount_percent: self.min_bond_discount_percent,
            use_pending_rewards: self.use_pending_rewards,
        }
    }
}

/// Initial gas parameters for every submission; escalated on retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasConfig {
    /// Gas limit for the first attempt of each call.
    #[serde(default = "default_gas")]
    pub default_gas: u64,

    /// Gas price (gwei) for the first attempt of each call.
    #[serde(default = "default_gas_price")]
    pub default_gas_price: u64,
}

/// Timing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Claim-and-autostake when fewer blocks than this remain to rebase.
    #[serde(default = "default_rebase_proximity")]
    pub rebase_proximity_blocks: u64,

    /// Bonding evaluation interval.
    #[serde(default = "default_bond_poll")]
    pub bond_poll_interval_secs: u64,

    /// Rebase proximity poll interval.
    #[serde(default = "default_rebase_poll")]
    pub rebase_poll_interval_secs: u64,

    /// Sleep after a compounding pass, long enough to skip the rebase
    /// event itself.
    #[serde(default = "default_cooldown")]
    pub post_rebase_cooldown_secs: u64,

    /// Max wait per submission attempt before it counts as a retryable
    /// failure.
    #[serde(default = "default_confirm_timeout")]
    pub confirm_timeout_secs: u64,
}

/// Seed state for the simulated ledger (paper mode and dry runs).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperConfig {
    /// sOHM balance (OHM).
    #[serde(default = "default_paper_staked")]
    pub staked_balance: f64,

    /// Liquid OHM balance.
    #[serde(default)]
    pub native_balance: f64,

    /// FRAX balance.
    #[serde(default)]
    pub reserve_balance: f64,

    /// OHM-FRAX pool token balance.
    #[serde(default)]
    pub pool_token_balance: f64,

    /// Pending rewards (OHM) per source.
    #[serde(default = "default_paper_pending")]
    pub frax_pending: f64,
    #[serde(default = "default_paper_pending")]
    pub lp_pending: f64,
    #[serde(default)]
    pub gohm_pending: f64,

    /// OHM market price in USD.
    #[serde(default = "default_market_price")]
    pub market_price_usd: f64,

    /// Bond prices in USD.
    #[serde(default = "default_frax_bond_price")]
    pub frax_bond_price_usd: f64,
    #[serde(default = "default_lp_bond_price")]
    pub lp_bond_price_usd: f64,

    /// Blocks remaining until the next rebase event.
    #[serde(default = "default_paper_blocks")]
    pub blocks_until_rebase: u64,
}

impl PaperConfig {
    /// Reserve-side base units for a whole-token FRAX amount.
    pub fn reserve_units(amount: f64) -> u128 {
        (amount * ONE_RESERVE as f64).round() as u128
    }
}

// ── Defaults ──────────────────────────────────────────────────────────

fn default_true() -> bool {
    true
}

fn default_min_claim() -> f64 {
    0.1
}
fn default_min_to_bond() -> f64 {
    1.0
}
fn default_min_discount() -> f64 {
    4.0
}

fn default_gas() -> u64 {
    500_000
}
fn default_gas_price() -> u64 {
    1
}

fn default_rebase_proximity() -> u64 {
    30
}
fn default_bond_poll() -> u64 {
    2
}
fn default_rebase_poll() -> u64 {
    5
}
fn default_cooldown() -> u64 {
    300
}
fn default_confirm_timeout() -> u64 {
    180
}

fn default_paper_staked() -> f64 {
    10.0
}
fn default_paper_pending() -> f64 {
    0.5
}
fn default_market_price() -> f64 {
    120.0
}
fn default_frax_bond_price() -> f64 {
    114.0
}
fn default_lp_bond_price() -> f64 {
    117.0
}
fn default_paper_blocks() -> u64 {
    600
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            min_pending_reward_to_claim: default_min_claim(),
            min_staked_balance_to_bond: default_min_to_bond(),
            min_bond_discount_percent: default_min_discount(),
            use_pending_rewards: default_true(),
        }
    }
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            default_gas: default_gas(),
            default_gas_price: default_gas_price(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            rebase_proximity_blocks: default_rebase_proximity(),
            bond_poll_interval_secs: default_bond_poll(),
            rebase_poll_interval_secs: default_rebase_poll(),
            post_rebase_cooldown_secs: default_cooldown(),
            confirm_timeout_secs: default_confirm_timeout(),
        }
    }
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            staked_balance: default_paper_staked(),
            native_balance: 0.0,
            reserve_balance: 0.0,
            pool_token_balance: 0.0,
            frax_pending: default_paper_pending(),
            lp_pending: default_paper_pending(),
            gohm_pending: 0.0,
            market_price_usd: default_market_price(),
            frax_bond_price_usd: default_frax_bond_price(),
            lp_bond_price_usd: default_lp_bond_price(),
            blocks_until_rebase: default_paper_blocks(),
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            paper_mode: default_true(),
            strategy: StrategyConfig::default(),
            gas: GasConfig::default(),
            timing: TimingConfig::default(),
            paper: PaperConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ONE_NATIVE;

    #[test]
    fn thresholds_convert_to_base_units() {
        let cfg = StrategyConfig {
            min_pending_reward_to_claim: 0.25,
            min_staked_balance_to_bond: 2.0,
            min_bond_discount_percent: 5.0,
            use_pending_rewards: false,
        };
        let t = cfg.thresholds();
        assert_eq!(t.min_pending_reward_to_claim, ONE_NATIVE / 4);
        assert_eq!(t.min_staked_balance_to_bond, 2 * ONE_NATIVE);
        assert!(!t.use_pending_rewards);
    }
}
