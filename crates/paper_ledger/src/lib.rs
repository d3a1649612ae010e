//! Simulated in-memory ledger.
//!
//! Implements [`RemoteLedger`] against a mutable protocol snapshot:
//! balances move, rewards zero out on claims, swaps convert at the
//! configured market price, and receipts carry the same log layout the
//! engine's extractors expect (claim payout in the last log, swap output
//! in the third). Backend for paper mode, dry runs, and tests.
//!
//! Failure injection (`fail_next_submits`) makes the next N submissions
//! confirm with `Failed`, which is how retry and short-circuit paths are
//! exercised without a network.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use common::config::PaperConfig;
use common::{
    native_units, AccountState, BondMetrics, BondTarget, PendingRewards, Result, RewardSource,
    TxStatus, ONE_NATIVE, ONE_RESERVE,
};
use ledger_core::{discount_percent, LedgerCall, LogEntry, Receipt, RemoteLedger, Spender, Token};

/// Simulated epoch length in blocks; the countdown wraps here after
/// reaching zero.
const EPOCH_BLOCKS: u64 = 2200;

struct PaperState {
    staked: u128,
    native: u128,
    reserve: u128,
    pool: u128,
    pending: PendingRewards,
    market_price_usd: f64,
    bond_price_usd: HashMap<BondTarget, f64>,
    blocks_until_rebase: u64,
    allowances: HashMap<(Token, Spender), u128>,
    fail_next_submits: u32,
    next_tx: u64,
}

/// In-memory [`RemoteLedger`] implementation.
pub struct PaperLedger {
    state: Mutex<PaperState>,
}

impl PaperLedger {
    pub fn new(cfg: &PaperConfig) -> Self {
        let mut bond_price_usd = HashMap::new();
        bond_price_usd.insert(BondTarget::Frax, cfg.frax_bond_price_usd);
        bond_price_usd.insert(BondTarget::OhmFraxLp, cfg.lp_bond_price_usd);

        Self {
            state: Mutex::new(PaperState {
                staked: native_units(cfg.staked_balance),
                native: native_units(cfg.native_balance),
                reserve: PaperConfig::reserve_units(cfg.reserve_balance),
                pool: PaperConfig::reserve_units(cfg.pool_token_balance),
                pending: PendingRewards {
                    frax: native_units(cfg.frax_pending),
                    ohm_frax_lp: native_units(cfg.lp_pending),
                    gohm: native_units(cfg.gohm_pending),
                },
                market_price_usd: cfg.market_price_usd,
                bond_price_usd,
                blocks_until_rebase: cfg.blocks_until_rebase,
                allowances: HashMap::new(),
                fail_next_submits: 0,
                next_tx: 0,
            }),
        }
    }

    // ── Test and scenario controls ────────────────────────────────────

    /// Make the next `count` submissions confirm with `Failed`.
    pub async fn fail_next_submits(&self, count: u32) {
        self.state.lock().await.fail_next_submits = count;
    }

    pub async fn set_pending(&self, source: RewardSource, amount: u128) {
        let mut state = self.state.lock().await;
        match source {
            RewardSource::Frax => state.pending.frax = amount,
            RewardSource::OhmFraxLp => state.pending.ohm_frax_lp = amount,
            RewardSource::Gohm => state.pending.gohm = amount,
        }
    }

    pub async fn set_bond_price(&self, target: BondTarget, price_usd: f64) {
        self.state
            .lock()
            .await
            .bond_price_usd
            .insert(target, price_usd);
    }

    pub async fn set_blocks_until_rebase(&self, blocks: u64) {
        self.state.lock().await.blocks_until_rebase = blocks;
    }

    pub async fn staked_balance(&self) -> u128 {
        self.state.lock().await.staked
    }

    pub async fn native_balance(&self) -> u128 {
        self.state.lock().await.native
    }

    pub async fn reserve_balance(&self) -> u128 {
        self.state.lock().await.reserve
    }

    pub async fn pool_token_balance(&self) -> u128 {
        self.state.lock().await.pool
    }
}

impl PaperState {
    fn next_hash(&mut self) -> String {
        self.next_tx += 1;
        format!("0xpaper{:08x}", self.next_tx)
    }

    fn failed_receipt(&mut self) -> Receipt {
        Receipt {
            tx_hash: self.next_hash(),
            status: TxStatus::Failed,
            logs: Vec::new(),
        }
    }

    /// FRAX base units received for an OHM amount at the market price.
    fn swap_output(&self, amount_in: u128) -> u128 {
        let ohm = amount_in as f64 / ONE_NATIVE as f64;
        (ohm * self.market_price_usd * ONE_RESERVE as f64) as u128
    }

    /// Spend an allowance, or reject the call when the grant is missing
    /// or too small.
    fn spend_allowance(&mut self, token: Token, spender: Spender, amount: u128) -> bool {
        match self.allowances.get_mut(&(token, spender)) {
            Some(granted) if *granted >= amount => {
                *granted -= amount;
                true
            }
            _ => {
                debug!("paper: insufficient {:?} allowance for {:?}", token, spender);
                false
            }
        }
    }

    fn apply(&mut self, call: &LedgerCall) -> Receipt {
        let tx_hash = self.next_hash();
        let logs = match *call {
            LedgerCall::RedeemReward { source, autostake } => {
                let payout = match source {
                    RewardSource::Frax => std::mem::take(&mut self.pending.frax),
                    RewardSource::OhmFraxLp => std::mem::take(&mut self.pending.ohm_frax_lp),
                    RewardSource::Gohm => std::mem::take(&mut self.pending.gohm),
                };
                if autostake {
                    self.staked += payout;
                } else {
                    self.native += payout;
                }
                debug!(
                    "paper: redeemed {} from {} (autostake={})",
                    payout,
                    source.label(),
                    autostake
                );
                vec![LogEntry::amount(0), LogEntry::amount(payout)]
            }
            LedgerCall::Unstake { amount } => {
                let amount = amount.min(self.staked);
                self.staked -= amount;
                self.native += amount;
                debug!("paper: unstaked {}", amount);
                vec![LogEntry::amount(amount)]
            }
            LedgerCall::Approve {
                token,
                spender,
                amount,
            } => {
                self.allowances.insert((token, spender), amount);
                vec![LogEntry::amount(amount)]
            }
            LedgerCall::SwapForReserve { amount_in, .. } => {
                let amount_in = amount_in.min(self.native);
                if !self.spend_allowance(Token::Native, Spender::SwapRouter, amount_in) {
                    return Receipt {
                        tx_hash,
                        status: TxStatus::Failed,
                        logs: Vec::new(),
                    };
                }
                let out = self.swap_output(amount_in);
                self.native -= amount_in;
                self.reserve += out;
                debug!("paper: swapped {} OHM units for {} FRAX units", amount_in, out);
                vec![
                    LogEntry::amount(amount_in),
                    LogEntry::amount(0),
                    LogEntry::amount(out),
                ]
            }
            LedgerCall::AddLiquidity {
                native_desired,
                reserve_desired,
                ..
            } => {
                let native_in = native_desired.min(self.native);
                let reserve_in = reserve_desired.min(self.reserve);
                if !self.spend_allowance(Token::Native, Spender::SwapRouter, native_in) {
                    return Receipt {
                        tx_hash,
                        status: TxStatus::Failed,
                        logs: Vec::new(),
                    };
                }
                self.native -= native_in;
                self.reserve -= reserve_in;
                // Pool token minting simplified to one token per paired FRAX.
                let minted = reserve_in;
                self.pool += minted;
                debug!("paper: added liquidity, minted {} pool units", minted);
                vec![LogEntry::amount(minted)]
            }
            LedgerCall::DepositBond { target, amount, .. } => {
                let token = match target {
                    BondTarget::Frax => Token::Reserve,
                    BondTarget::OhmFraxLp => Token::PoolToken,
                };
                if !self.spend_allowance(token, Spender::Bond(target), amount) {
                    return Receipt {
                        tx_hash,
                        status: TxStatus::Failed,
                        logs: Vec::new(),
                    };
                }
                match target {
                    BondTarget::Frax => self.reserve = self.reserve.saturating_sub(amount),
                    BondTarget::OhmFraxLp => self.pool = self.pool.saturating_sub(amount),
                }
                debug!("paper: deposited {} into {} bond", amount, target.label());
                vec![LogEntry::amount(amount)]
            }
        };

        Receipt {
            tx_hash,
            status: TxStatus::Success,
            logs,
        }
    }
}

#[async_trait]
impl RemoteLedger for PaperLedger {
    async fn account_state(&self) -> Result<AccountState> {
        let state = self.state.lock().await;
        Ok(AccountState {
            staked_balance: state.staked,
            native_balance: state.native,
            pool_token_balance: state.pool,
        })
    }

    async fn pending_reward(&self, source: RewardSource) -> Result<u128> {
        Ok(self.state.lock().await.pending.get(source))
    }

    async fn bond_metrics(&self, target: BondTarget) -> Result<BondMetrics> {
        let state = self.state.lock().await;
        let bond_price = state.bond_price_usd[&target];
        Ok(BondMetrics {
            discount_percent: discount_percent(bond_price, state.market_price_usd),
        })
    }

    async fn bond_price(&self, target: BondTarget) -> Result<u128> {
        let state = self.state.lock().await;
        Ok((state.bond_price_usd[&target] * ONE_RESERVE as f64) as u128)
    }

    async fn blocks_until_rebase(&self) -> Result<u64> {
        let mut state = self.state.lock().await;
        let remaining = state.blocks_until_rebase;
        // Simulated chain advance: count down one block per poll and wrap
        // into the next epoch after the event passes.
        state.blocks_until_rebase = if remaining == 0 {
            EPOCH_BLOCKS
        } else {
            remaining - 1
        };
        Ok(remaining)
    }

    async fn submit(&self, call: LedgerCall, _gas: u64, _gas_price: u64) -> Result<Receipt> {
        let mut state = self.state.lock().await;
        if state.fail_next_submits > 0 {
            state.fail_next_submits -= 1;
            return Ok(state.failed_receipt());
        }
        Ok(state.apply(&call))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> PaperLedger {
        PaperLedger::new(&PaperConfig::default())
    }

    #[tokio::test]
    async fn redeem_moves_pending_to_native_without_autostake() {
        let ledger = ledger();
        ledger.set_pending(RewardSource::Frax, ONE_NATIVE).await;
        let before = ledger.native_balance().await;

        let receipt = ledger
            .submit(
                LedgerCall::RedeemReward {
                    source: RewardSource::Frax,
                    autostake: false,
                },
                500_000,
                1,
            )
            .await
            .unwrap();

        assert!(receipt.is_success());
        assert_eq!(ledger.native_balance().await, before + ONE_NATIVE);
        assert_eq!(ledger.pending_reward(RewardSource::Frax).await.unwrap(), 0);
        // Payout rides in the last log.
        let last = receipt.logs.last().unwrap();
        assert_eq!(ledger_core::decode_amount_word(&last.data), ONE_NATIVE);
    }

    #[tokio::test]
    async fn redeem_autostake_grows_staked_balance() {
        let ledger = ledger();
        ledger.set_pending(RewardSource::Gohm, 2 * ONE_NATIVE).await;
        let staked_before = ledger.staked_balance().await;

        ledger
            .submit(
                LedgerCall::RedeemReward {
                    source: RewardSource::Gohm,
                    autostake: true,
                },
                500_000,
                1,
            )
            .await
            .unwrap();

        assert_eq!(ledger.staked_balance().await, staked_before + 2 * ONE_NATIVE);
    }

    #[tokio::test]
    async fn swap_converts_at_market_price() {
        let ledger = ledger();
        ledger
            .submit(LedgerCall::Unstake { amount: ONE_NATIVE }, 500_000, 1)
            .await
            .unwrap();
        ledger
            .submit(
                LedgerCall::Approve {
                    token: Token::Native,
                    spender: Spender::SwapRouter,
                    amount: ONE_NATIVE,
                },
                500_000,
                1,
            )
            .await
            .unwrap();

        let receipt = ledger
            .submit(
                LedgerCall::SwapForReserve {
                    amount_in: ONE_NATIVE,
                    min_amount_out: 0,
                    deadline: 0,
                },
                500_000,
                1,
            )
            .await
            .unwrap();

        // 1 OHM at the default $120 market price.
        let out = ledger_core::decode_amount_word(&receipt.logs[2].data);
        assert_eq!(out, 120 * ONE_RESERVE);
        assert_eq!(ledger.reserve_balance().await, out);
    }

    #[tokio::test]
    async fn swap_without_approval_is_rejected() {
        let ledger = ledger();
        ledger
            .submit(LedgerCall::Unstake { amount: ONE_NATIVE }, 500_000, 1)
            .await
            .unwrap();

        let receipt = ledger
            .submit(
                LedgerCall::SwapForReserve {
                    amount_in: ONE_NATIVE,
                    min_amount_out: 0,
                    deadline: 0,
                },
                500_000,
                1,
            )
            .await
            .unwrap();

        assert_eq!(receipt.status, TxStatus::Failed);
        assert_eq!(ledger.reserve_balance().await, 0);
    }

    #[tokio::test]
    async fn injected_failures_consume_then_clear() {
        let ledger = ledger();
        ledger.fail_next_submits(1).await;

        let call = LedgerCall::Unstake { amount: 1 };
        let first = ledger.submit(call.clone(), 500_000, 1).await.unwrap();
        let second = ledger.submit(call, 500_000, 1).await.unwrap();
        assert_eq!(first.status, TxStatus::Failed);
        assert_eq!(second.status, TxStatus::Success);
    }

    #[tokio::test]
    async fn rebase_countdown_wraps_after_event() {
        let ledger = ledger();
        ledger.set_blocks_until_rebase(1).await;
        assert_eq!(ledger.blocks_until_rebase().await.unwrap(), 1);
        assert_eq!(ledger.blocks_until_rebase().await.unwrap(), 0);
        assert_eq!(ledger.blocks_until_rebase().await.unwrap(), EPOCH_BLOCKS);
    }
}
