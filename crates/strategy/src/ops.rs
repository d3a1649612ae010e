//! Named higher-level operations over the remote ledger.
//!
//! Each operation reads whatever live state it needs, runs a spend
//! approval first where the main call requires one, and pushes the main
//! call through [`submit_with_retry`]. A failed approval short-circuits
//! the operation and is returned as the operation's result. All
//! operations share the [`TransactionResult`] shape; the ones whose
//! economic effect feeds a later step carry it in `amount`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::info;

use common::config::GasConfig;
use common::{
    native_tokens, reserve_tokens, BondTarget, Result, RewardSource, TransactionResult, TxKind,
};
use ledger_core::{decode_amount_word, LedgerCall, LogEntry, Receipt, RemoteLedger, Spender, Token};

use crate::submit::submit_with_retry;

/// Seconds a swap or liquidity deadline stays valid.
const ROUTER_DEADLINE_SECS: i64 = 1200;

/// Claim payouts ride in the last confirmation log.
fn claim_payout(logs: &[LogEntry]) -> Option<u128> {
    logs.last().map(|log| decode_amount_word(&log.data))
}

/// Swap output rides in the third confirmation log.
fn swap_output(logs: &[LogEntry]) -> Option<u128> {
    logs.get(2).map(|log| decode_amount_word(&log.data))
}

fn result_of(kind: TxKind, receipt: Receipt, amount: Option<u128>) -> TransactionResult {
    let amount = if receipt.is_success() { amount } else { None };
    TransactionResult {
        kind,
        tx_hash: receipt.tx_hash,
        status: receipt.status,
        amount,
    }
}

/// The transaction handler strategies are built from.
pub struct TxExecutor<L> {
    ledger: Arc<L>,
    gas: GasConfig,
    confirm_timeout: Duration,
}

impl<L: RemoteLedger + 'static> TxExecutor<L> {
    pub fn new(ledger: Arc<L>, gas: GasConfig, confirm_timeout: Duration) -> Self {
        Self {
            ledger,
            gas,
            confirm_timeout,
        }
    }

    async fn submit_call(&self, call: LedgerCall) -> Result<Receipt> {
        let ledger = Arc::clone(&self.ledger);
        submit_with_retry(
            move |gas, gas_price| {
                let ledger = ledger.clone();
                let call = call.clone();
                async move { ledger.submit(call, gas, gas_price).await }
            },
            self.gas.default_gas,
            self.gas.default_gas_price,
            self.confirm_timeout,
        )
        .await
    }

    async fn approve(
        &self,
        token: Token,
        spender: Spender,
        amount: u128,
    ) -> Result<TransactionResult> {
        let receipt = self
            .submit_call(LedgerCall::Approve {
                token,
                spender,
                amount,
            })
            .await?;
        if receipt.is_success() {
            info!("spending approved");
        } else {
            info!("spending not approved");
        }
        Ok(result_of(TxKind::Approve, receipt, None))
    }

    // ── Redeem ────────────────────────────────────────────────────────

    /// Claim one bond's accrued reward. With `autostake` the payout
    /// compounds into the staked position; without it the funds stay
    /// liquid for a following swap.
    pub async fn claim_reward(
        &self,
        source: RewardSource,
        autostake: bool,
    ) -> Result<TransactionResult> {
        info!("redeeming {} bond reward...", source.label());
        let receipt = self
            .submit_call(LedgerCall::RedeemReward { source, autostake })
            .await?;

        let payout = claim_payout(&receipt.logs);
        if receipt.is_success() {
            info!(
                "successfully redeemed {:.4} OHM (tx {})",
                native_tokens(payout.unwrap_or(0)),
                receipt.tx_hash
            );
        }
        Ok(result_of(TxKind::ClaimReward, receipt, payout))
    }

    // ── Unstake ───────────────────────────────────────────────────────

    /// Unstake the entire sOHM balance back to liquid OHM.
    pub async fn unstake_all(&self) -> Result<TransactionResult> {
        let staked = self.ledger.account_state().await?.staked_balance;
        info!("unstaking {:.4} sOHM...", native_tokens(staked));

        let receipt = self.submit_call(LedgerCall::Unstake { amount: staked }).await?;
        Ok(result_of(TxKind::Unstake, receipt, Some(staked)))
    }

    // ── Swap ──────────────────────────────────────────────────────────

    /// Swap OHM for FRAX: the entire liquid balance, or half of it when
    /// the other half stays behind for a liquidity add.
    pub async fn swap_for_reserve(&self, entire_balance: bool) -> Result<TransactionResult> {
        let native = self.ledger.account_state().await?.native_balance;
        let amount_in = if entire_balance { native } else { native / 2 };
        if entire_balance {
            info!("swapping all OHM for FRAX ({:.4})...", native_tokens(amount_in));
        } else {
            info!("swapping half OHM for FRAX ({:.4})...", native_tokens(amount_in));
        }

        let approval = self
            .approve(Token::Native, Spender::SwapRouter, amount_in)
            .await?;
        if !approval.status.is_success() {
            return Ok(approval);
        }

        let deadline = (Utc::now().timestamp() + ROUTER_DEADLINE_SECS) as u64;
        let receipt = self
            .submit_call(LedgerCall::SwapForReserve {
                amount_in,
                min_amount_out: 0,
                deadline,
            })
            .await?;

        let received = swap_output(&receipt.logs);
        if receipt.is_success() {
            info!(
                "successfully swapped {:.4} OHM for {:.4} FRAX (tx {})",
                native_tokens(amount_in),
                reserve_tokens(received.unwrap_or(0)),
                receipt.tx_hash
            );
        }
        Ok(result_of(TxKind::Swap, receipt, received))
    }

    // ── Add liquidity ─────────────────────────────────────────────────

    /// Pair the full OHM balance with `reserve_amount` FRAX, declaring a
    /// 1% slippage tolerance on both amounts. Reports the pool-token
    /// balance after the add.
    pub async fn add_liquidity(&self, reserve_amount: u128) -> Result<TransactionResult> {
        let native_desired = self.ledger.account_state().await?.native_balance;
        let reserve_desired = reserve_amount;
        let native_min = native_desired - native_desired / 100;
        let reserve_min = reserve_desired - reserve_desired / 100;
        info!(
            "adding OHM-FRAX liquidity ({:.4} OHM, {:.4} FRAX)...",
            native_tokens(native_desired),
            reserve_tokens(reserve_desired)
        );

        let approval = self
            .approve(Token::Native, Spender::SwapRouter, native_desired)
            .await?;
        if !approval.status.is_success() {
            return Ok(approval);
        }

        let receipt = self
            .submit_call(LedgerCall::AddLiquidity {
                native_desired,
                reserve_desired,
                native_min,
                reserve_min,
            })
            .await?;

        let pool_balance = if receipt.is_success() {
            let balance = self.ledger.account_state().await?.pool_token_balance;
            info!(
                "successfully added liquidity, pool token balance {:.4} (tx {})",
                reserve_tokens(balance),
                receipt.tx_hash
            );
            Some(balance)
        } else {
            None
        };
        Ok(result_of(TxKind::AddLiquidity, receipt, pool_balance))
    }

    // ── Bond deposit ──────────────────────────────────────────────────

    /// Deposit principal into a bond: the given FRAX amount, or the whole
    /// pool-token balance when `amount` is absent. The live bond price is
    /// re-read inside every attempt as the deposit's max-price bound.
    pub async fn deposit_bond(
        &self,
        target: BondTarget,
        amount: Option<u128>,
    ) -> Result<TransactionResult> {
        let (token, to_bond) = match amount {
            Some(frax) => (Token::Reserve, frax),
            None => (
                Token::PoolToken,
                self.ledger.account_state().await?.pool_token_balance,
            ),
        };
        info!("bonding into {}...", target.label());

        let approval = self.approve(token, Spender::Bond(target), to_bond).await?;
        if !approval.status.is_success() {
            return Ok(approval);
        }

        let ledger = Arc::clone(&self.ledger);
        let receipt = submit_with_retry(
            move |gas, gas_price| {
                let ledger = ledger.clone();
                async move {
                    let max_price = ledger.bond_price(target).await?;
                    ledger
                        .submit(
                            LedgerCall::DepositBond {
                                target,
                                amount: to_bond,
                                max_price,
                            },
                            gas,
                            gas_price,
                        )
                        .await
                }
            },
            self.gas.default_gas,
            self.gas.default_gas_price,
            self.confirm_timeout,
        )
        .await?;

        if receipt.is_success() {
            info!("successfully bonded (tx {})", receipt.tx_hash);
        }
        Ok(result_of(TxKind::DepositBond, receipt, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::config::PaperConfig;
    use common::{TxStatus, ONE_NATIVE};
    use paper_ledger::PaperLedger;

    fn executor(ledger: Arc<PaperLedger>) -> TxExecutor<PaperLedger> {
        TxExecutor::new(ledger, GasConfig::default(), Duration::from_secs(5))
    }

    fn paper() -> Arc<PaperLedger> {
        Arc::new(PaperLedger::new(&PaperConfig::default()))
    }

    #[tokio::test]
    async fn claim_reports_redeemed_amount() {
        let ledger = paper();
        ledger.set_pending(RewardSource::Frax, 3 * ONE_NATIVE).await;
        let exec = executor(ledger.clone());

        let result = exec.claim_reward(RewardSource::Frax, false).await.unwrap();
        assert_eq!(result.kind, TxKind::ClaimReward);
        assert_eq!(result.status, TxStatus::Success);
        assert_eq!(result.amount, Some(3 * ONE_NATIVE));
    }

    #[tokio::test]
    async fn swap_half_leaves_half_behind() {
        let ledger = paper();
        let exec = executor(ledger.clone());
        exec.unstake_all().await.unwrap();
        let before = ledger.native_balance().await;

        let result = exec.swap_for_reserve(false).await.unwrap();
        assert_eq!(result.kind, TxKind::Swap);
        assert!(result.amount.unwrap() > 0);
        assert_eq!(ledger.native_balance().await, before - before / 2);
    }

    #[tokio::test]
    async fn failed_approval_short_circuits_swap() {
        let ledger = paper();
        let exec = executor(ledger.clone());
        exec.unstake_all().await.unwrap();

        // Enough injected failures to exhaust the approval's retries.
        ledger.fail_next_submits(crate::MAX_ATTEMPTS).await;
        let before = ledger.native_balance().await;

        let result = exec.swap_for_reserve(true).await.unwrap();
        assert_eq!(result.kind, TxKind::Approve);
        assert_eq!(result.status, TxStatus::Failed);
        // The swap itself never ran.
        assert_eq!(ledger.native_balance().await, before);
    }

    #[tokio::test]
    async fn approval_retry_recovers_from_one_failure() {
        let ledger = paper();
        let exec = executor(ledger.clone());
        exec.unstake_all().await.unwrap();
        ledger.fail_next_submits(1).await;

        let result = exec.swap_for_reserve(true).await.unwrap();
        assert_eq!(result.kind, TxKind::Swap);
        assert_eq!(result.status, TxStatus::Success);
    }

    #[tokio::test]
    async fn deposit_without_amount_bonds_full_pool_balance() {
        let ledger = paper();
        let exec = executor(ledger.clone());
        exec.unstake_all().await.unwrap();
        let swap = exec.swap_for_reserve(false).await.unwrap();
        exec.add_liquidity(swap.amount.unwrap()).await.unwrap();
        assert!(ledger.pool_token_balance().await > 0);

        let result = exec.deposit_bond(BondTarget::OhmFraxLp, None).await.unwrap();
        assert_eq!(result.status, TxStatus::Success);
        assert_eq!(ledger.pool_token_balance().await, 0);
    }
}
