//! Bonding path composer.
//!
//! Both bonding strategies share one shape and differ only in claim
//! order, swap fraction, and whether a liquidity add sits before the
//! final deposit, so a single composer runs either from its
//! [`StrategyProfile`]. Steps are strictly sequential: each later step
//! consumes an amount declared by an earlier one. A step that confirms
//! as failed stops the sequence; the record is emitted with
//! `completed = false` and whatever steps ran.

use tracing::{info, warn};

use common::{
    BondTarget, ExecutionRecord, OperationKind, PendingRewards, Result, RewardSource,
    TransactionResult,
};
use ledger_core::RemoteLedger;

use crate::ops::TxExecutor;

/// The fixed parameters distinguishing the two bonding strategies.
#[derive(Debug, Clone, Copy)]
pub struct StrategyProfile {
    pub target: BondTarget,
    /// Reward sources checked when funding from pending rewards, own
    /// bond last.
    pub claim_order: [RewardSource; 3],
    /// Swap the whole liquid balance, or half when the rest is paired
    /// into the pool.
    pub swap_entire_balance: bool,
    pub adds_liquidity: bool,
}

impl StrategyProfile {
    pub fn for_target(target: BondTarget) -> Self {
        match target {
            BondTarget::Frax => Self {
                target,
                claim_order: [
                    RewardSource::OhmFraxLp,
                    RewardSource::Gohm,
                    RewardSource::Frax,
                ],
                swap_entire_balance: true,
                adds_liquidity: false,
            },
            BondTarget::OhmFraxLp => Self {
                target,
                claim_order: [
                    RewardSource::Frax,
                    RewardSource::Gohm,
                    RewardSource::OhmFraxLp,
                ],
                swap_entire_balance: false,
                adds_liquidity: true,
            },
        }
    }
}

fn push_step(steps: &mut Vec<TransactionResult>, step: TransactionResult) -> bool {
    let ok = step.status.is_success();
    steps.push(step);
    ok
}

/// Run one bonding strategy end to end and return its record.
///
/// Funding branch: with `use_pending`, claim every source in profile
/// order whose pending amount clears the claim threshold (autostake off,
/// funds stay liquid). Otherwise claim only the target bond's own reward
/// if it clears the threshold, then unstake the whole staked balance.
/// Claims skipped for being under the threshold are omitted from the
/// record. The shared tail is swap, optional liquidity add, deposit.
pub async fn execute_bond_strategy<L: RemoteLedger + 'static>(
    executor: &TxExecutor<L>,
    profile: &StrategyProfile,
    pending: &PendingRewards,
    use_pending: bool,
    discount: f64,
    min_claim: u128,
) -> Result<ExecutionRecord> {
    let mut steps = Vec::new();
    let mut completed = true;

    'sequence: {
        if use_pending {
            info!("funding from pending rewards...");
            for source in profile.claim_order {
                if pending.get(source) <= min_claim {
                    continue;
                }
                let step = executor.claim_reward(source, false).await?;
                if !push_step(&mut steps, step) {
                    completed = false;
                    break 'sequence;
                }
            }
        } else {
            info!("funding from staked balance...");
            let own = profile.target.reward_source();
            if pending.get(own) > min_claim {
                let step = executor.claim_reward(own, false).await?;
                if !push_step(&mut steps, step) {
                    completed = false;
                    break 'sequence;
                }
            }
            let step = executor.unstake_all().await?;
            if !push_step(&mut steps, step) {
                completed = false;
                break 'sequence;
            }
        }

        let swap = executor.swap_for_reserve(profile.swap_entire_balance).await?;
        let reserve_received = swap.amount;
        if !push_step(&mut steps, swap) {
            completed = false;
            break 'sequence;
        }
        let Some(reserve_received) = reserve_received else {
            warn!("swap confirmed without an output amount; stopping sequence");
            completed = false;
            break 'sequence;
        };

        if profile.adds_liquidity {
            let step = executor.add_liquidity(reserve_received).await?;
            if !push_step(&mut steps, step) {
                completed = false;
                break 'sequence;
            }
        }

        let deposit_amount = if profile.adds_liquidity {
            None
        } else {
            Some(reserve_received)
        };
        let step = executor.deposit_bond(profile.target, deposit_amount).await?;
        if !push_step(&mut steps, step) {
            completed = false;
        }
    }

    Ok(ExecutionRecord {
        operation: OperationKind::Bond,
        strategy: Some(profile.target),
        discount: Some(discount),
        steps,
        completed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use common::config::{GasConfig, PaperConfig};
    use common::{TxKind, ONE_NATIVE};
    use paper_ledger::PaperLedger;

    const MIN_CLAIM: u128 = ONE_NATIVE / 10;

    fn setup() -> (Arc<PaperLedger>, TxExecutor<PaperLedger>) {
        let ledger = Arc::new(PaperLedger::new(&PaperConfig::default()));
        let executor = TxExecutor::new(
            ledger.clone(),
            GasConfig::default(),
            Duration::from_secs(5),
        );
        (ledger, executor)
    }

    fn kinds(record: &ExecutionRecord) -> Vec<TxKind> {
        record.steps.iter().map(|s| s.kind).collect()
    }

    #[tokio::test]
    async fn frax_path_from_staked_balance() {
        let (ledger, executor) = setup();
        ledger.set_pending(RewardSource::Frax, ONE_NATIVE).await;
        let pending = PendingRewards {
            frax: ONE_NATIVE,
            ohm_frax_lp: 0,
            gohm: 0,
        };

        let profile = StrategyProfile::for_target(BondTarget::Frax);
        let record = execute_bond_strategy(&executor, &profile, &pending, false, 5.0, MIN_CLAIM)
            .await
            .unwrap();

        assert!(record.completed);
        assert_eq!(record.strategy, Some(BondTarget::Frax));
        // Claim own reward, unstake, approve+swap, approve+deposit; no
        // liquidity step.
        assert_eq!(
            kinds(&record),
            vec![
                TxKind::ClaimReward,
                TxKind::Unstake,
                TxKind::Swap,
                TxKind::DepositBond,
            ]
        );
    }

    #[tokio::test]
    async fn lp_path_with_no_claimable_rewards() {
        let (ledger, executor) = setup();
        // Give the account liquid OHM to fund the tail.
        ledger.set_pending(RewardSource::Gohm, 5 * ONE_NATIVE).await;
        executor
            .claim_reward(RewardSource::Gohm, false)
            .await
            .unwrap();

        // Everything pending is now below the claim threshold.
        let pending = PendingRewards::default();
        let profile = StrategyProfile::for_target(BondTarget::OhmFraxLp);
        let record = execute_bond_strategy(&executor, &profile, &pending, true, 6.0, MIN_CLAIM)
            .await
            .unwrap();

        assert!(record.completed);
        assert_eq!(
            kinds(&record),
            vec![TxKind::Swap, TxKind::AddLiquidity, TxKind::DepositBond]
        );
    }

    #[tokio::test]
    async fn pending_claims_follow_profile_order_own_bond_last() {
        let (ledger, executor) = setup();
        for source in RewardSource::ALL {
            ledger.set_pending(source, 2 * ONE_NATIVE).await;
        }
        let pending = PendingRewards {
            frax: 2 * ONE_NATIVE,
            ohm_frax_lp: 2 * ONE_NATIVE,
            gohm: 2 * ONE_NATIVE,
        };

        let profile = StrategyProfile::for_target(BondTarget::Frax);
        let record = execute_bond_strategy(&executor, &profile, &pending, true, 5.0, MIN_CLAIM)
            .await
            .unwrap();

        assert!(record.completed);
        let claims: Vec<TxKind> = record.steps[..3].iter().map(|s| s.kind).collect();
        assert_eq!(
            claims,
            vec![TxKind::ClaimReward, TxKind::ClaimReward, TxKind::ClaimReward]
        );
        // No unstake in the pending-funded branch.
        assert!(record.steps.iter().all(|s| s.kind != TxKind::Unstake));
    }

    #[tokio::test]
    async fn failed_step_aborts_remaining_sequence() {
        let (ledger, executor) = setup();
        let pending = PendingRewards::default();

        // First submission is the unstake; make it fail through all
        // retries so the sequence stops there.
        ledger.fail_next_submits(crate::MAX_ATTEMPTS).await;
        let profile = StrategyProfile::for_target(BondTarget::Frax);
        let record = execute_bond_strategy(&executor, &profile, &pending, false, 5.0, MIN_CLAIM)
            .await
            .unwrap();

        assert!(!record.completed);
        assert_eq!(kinds(&record), vec![TxKind::Unstake]);
    }
}
