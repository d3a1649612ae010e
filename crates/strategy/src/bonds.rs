//! Bonding decision loop.
//!
//! Every iteration re-derives its decision from a fresh snapshot: which
//! bond (if either) shows a discount worth taking, and whether the bond
//! is funded from pending rewards or the staked balance. No state
//! carries between iterations, so an unchanged snapshot always yields
//! the same decision.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{info, warn};

use common::config::{BotConfig, Thresholds};
use common::{
    native_tokens, BondTarget, ExecutionRecord, PendingRewards, Result, RewardSource,
};
use ledger_core::RemoteLedger;

use crate::audit::{self, SharedAuditSink};
use crate::ops::TxExecutor;
use crate::path::{execute_bond_strategy, StrategyProfile};

/// Everything one bonding iteration decides from.
#[derive(Debug, Clone, Copy)]
pub struct BondSnapshot {
    pub frax_discount: f64,
    pub lp_discount: f64,
    pub staked_balance: u128,
    pub pending: PendingRewards,
}

impl BondSnapshot {
    pub fn discount_of(&self, target: BondTarget) -> f64 {
        match target {
            BondTarget::Frax => self.frax_discount,
            BondTarget::OhmFraxLp => self.lp_discount,
        }
    }
}

/// True iff the preference allows it and total pending rewards exceed
/// both the minimum-to-bond threshold and the staked balance.
pub fn use_pending_rewards(snapshot: &BondSnapshot, thresholds: &Thresholds) -> bool {
    thresholds.use_pending_rewards
        && snapshot.pending.total() > thresholds.min_staked_balance_to_bond
        && snapshot.pending.total() > snapshot.staked_balance
}

/// The bond whose discount strictly beats both the other bond's and the
/// configured minimum. Equal discounts select neither.
pub fn select_candidate(snapshot: &BondSnapshot, min_discount: f64) -> Option<BondTarget> {
    if snapshot.frax_discount > snapshot.lp_discount && snapshot.frax_discount > min_discount {
        Some(BondTarget::Frax)
    } else if snapshot.lp_discount > snapshot.frax_discount && snapshot.lp_discount > min_discount
    {
        Some(BondTarget::OhmFraxLp)
    } else {
        None
    }
}

/// True iff the staked balance plus the candidate bond's own pending
/// reward clears the minimum, or pending rewards fund the bond anyway.
pub fn funding_sufficient(
    snapshot: &BondSnapshot,
    target: BondTarget,
    use_pending: bool,
    thresholds: &Thresholds,
) -> bool {
    snapshot.staked_balance + snapshot.pending.get(target.reward_source())
        > thresholds.min_staked_balance_to_bond
        || use_pending
}

/// The bonding evaluation loop.
pub struct BondEngine<L> {
    ledger: Arc<L>,
    executor: TxExecutor<L>,
    thresholds: Thresholds,
    poll_interval: Duration,
    gate: Arc<Mutex<()>>,
    sink: SharedAuditSink,
}

impl<L: RemoteLedger + 'static> BondEngine<L> {
    pub fn new(
        ledger: Arc<L>,
        cfg: &BotConfig,
        gate: Arc<Mutex<()>>,
        sink: SharedAuditSink,
    ) -> Self {
        let executor = TxExecutor::new(
            ledger.clone(),
            cfg.gas.clone(),
            Duration::from_secs(cfg.timing.confirm_timeout_secs),
        );
        Self {
            ledger,
            executor,
            thresholds: cfg.strategy.thresholds(),
            poll_interval: Duration::from_secs(cfg.timing.bond_poll_interval_secs),
            gate,
            sink,
        }
    }

    /// Read everything one iteration decides from.
    pub async fn snapshot(&self) -> Result<BondSnapshot> {
        let frax = self.ledger.bond_metrics(BondTarget::Frax).await?;
        let lp = self.ledger.bond_metrics(BondTarget::OhmFraxLp).await?;
        let state = self.ledger.account_state().await?;
        let pending = PendingRewards {
            frax: self.ledger.pending_reward(RewardSource::Frax).await?,
            ohm_frax_lp: self.ledger.pending_reward(RewardSource::OhmFraxLp).await?,
            gohm: self.ledger.pending_reward(RewardSource::Gohm).await?,
        };
        Ok(BondSnapshot {
            frax_discount: frax.discount_percent,
            lp_discount: lp.discount_percent,
            staked_balance: state.staked_balance,
            pending,
        })
    }

    /// One evaluation: snapshot, decide, execute at most one strategy.
    pub async fn tick(&self) -> Result<Option<ExecutionRecord>> {
        let snapshot = self.snapshot().await?;
        info!(
            "FRAX: {:.2}% | OHM-FRAX LP: {:.2}% | pending rewards: {:.4} OHM | staked: {:.4} sOHM",
            snapshot.frax_discount,
            snapshot.lp_discount,
            native_tokens(snapshot.pending.total()),
            native_tokens(snapshot.staked_balance),
        );

        let use_pending = use_pending_rewards(&snapshot, &self.thresholds);
        let Some(target) = select_candidate(&snapshot, self.thresholds.min_bond_discount_percent)
        else {
            return Ok(None);
        };

        let discount = snapshot.discount_of(target);
        if !funding_sufficient(&snapshot, target, use_pending, &self.thresholds) {
            info!(
                "good discount found on {}: {:.2}%, but not enough sOHM balance",
                target.label(),
                discount
            );
            return Ok(None);
        }

        info!("good discount found on {}: {:.2}%", target.label(), discount);

        // One strategy in flight at a time across both loops.
        let _guard = self.gate.lock().await;
        let profile = StrategyProfile::for_target(target);
        let record = execute_bond_strategy(
            &self.executor,
            &profile,
            &snapshot.pending,
            use_pending,
            discount,
            self.thresholds.min_pending_reward_to_claim,
        )
        .await?;

        if record.completed {
            info!("{} bond successful", target.label());
        } else {
            warn!("{} bond stopped after a failed step", target.label());
        }
        audit::record(&self.sink, &record).await;
        Ok(Some(record))
    }

    /// Poll forever. A failed iteration is logged and skipped.
    pub async fn run(self) {
        loop {
            if let Err(e) = self.tick().await {
                warn!("bonding iteration failed: {}", e);
            }
            sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::config::StrategyConfig;
    use common::ONE_NATIVE;

    fn thresholds() -> Thresholds {
        StrategyConfig {
            min_pending_reward_to_claim: 0.1,
            min_staked_balance_to_bond: 1.0,
            min_bond_discount_percent: 4.0,
            use_pending_rewards: true,
        }
        .thresholds()
    }

    fn snapshot(frax: f64, lp: f64) -> BondSnapshot {
        BondSnapshot {
            frax_discount: frax,
            lp_discount: lp,
            staked_balance: 10 * ONE_NATIVE,
            pending: PendingRewards::default(),
        }
    }

    #[test]
    fn candidate_requires_strictly_higher_discount_than_rival_and_minimum() {
        let t = thresholds();
        assert_eq!(
            select_candidate(&snapshot(6.0, 5.0), t.min_bond_discount_percent),
            Some(BondTarget::Frax)
        );
        assert_eq!(
            select_candidate(&snapshot(5.0, 6.0), t.min_bond_discount_percent),
            Some(BondTarget::OhmFraxLp)
        );
        // Beats the rival but not the minimum.
        assert_eq!(select_candidate(&snapshot(3.0, 1.0), t.min_bond_discount_percent), None);
        // Equal discounts select neither.
        assert_eq!(select_candidate(&snapshot(6.0, 6.0), t.min_bond_discount_percent), None);
    }

    #[test]
    fn use_pending_needs_all_three_conditions() {
        let t = thresholds();
        let mut snap = snapshot(5.0, 4.0);
        snap.staked_balance = ONE_NATIVE;
        snap.pending = PendingRewards {
            frax: ONE_NATIVE,
            ohm_frax_lp: ONE_NATIVE,
            gohm: 0,
        };
        // total 2 OHM > 1 OHM minimum and > 1 OHM staked.
        assert!(use_pending_rewards(&snap, &t));

        // Preference disabled.
        let mut no_pref = t;
        no_pref.use_pending_rewards = false;
        assert!(!use_pending_rewards(&snap, &no_pref));

        // Total no longer above the staked balance.
        snap.staked_balance = 5 * ONE_NATIVE;
        assert!(!use_pending_rewards(&snap, &t));

        // Total under the minimum-to-bond threshold.
        snap.staked_balance = 0;
        snap.pending = PendingRewards {
            frax: ONE_NATIVE / 2,
            ohm_frax_lp: 0,
            gohm: 0,
        };
        assert!(!use_pending_rewards(&snap, &t));
    }

    #[test]
    fn funding_falls_back_to_pending_when_staked_is_thin() {
        let t = thresholds();
        let mut snap = snapshot(6.0, 5.0);
        snap.staked_balance = 0;
        snap.pending = PendingRewards::default();

        assert!(!funding_sufficient(&snap, BondTarget::Frax, false, &t));
        // use_pending overrides the staked-balance check.
        assert!(funding_sufficient(&snap, BondTarget::Frax, true, &t));

        // The candidate's own pending reward counts toward the minimum.
        snap.pending.frax = 2 * ONE_NATIVE;
        assert!(funding_sufficient(&snap, BondTarget::Frax, false, &t));
        // But another bond's pending reward does not.
        snap.pending = PendingRewards {
            frax: 0,
            ohm_frax_lp: 2 * ONE_NATIVE,
            gohm: 0,
        };
        assert!(!funding_sufficient(&snap, BondTarget::Frax, false, &t));
    }

    #[tokio::test]
    async fn tick_executes_the_discounted_strategy_and_audits_it() {
        use crate::audit::AuditSink;
        use common::TxKind;
        use paper_ledger::PaperLedger;

        struct CollectSink(Vec<ExecutionRecord>);
        impl AuditSink for CollectSink {
            fn record(&mut self, record: &ExecutionRecord) {
                self.0.push(record.clone());
            }
        }

        // Default seed: FRAX bond at 5% discount, LP at 2.5%, 10 sOHM
        // staked, 0.5 OHM pending on each bondable source.
        let cfg = BotConfig::default();
        let ledger = Arc::new(PaperLedger::new(&cfg.paper));
        let collected = Arc::new(Mutex::new(CollectSink(Vec::new())));
        let sink: SharedAuditSink = collected.clone();
        let engine = BondEngine::new(ledger.clone(), &cfg, Arc::new(Mutex::new(())), sink);

        let record = engine.tick().await.unwrap().expect("strategy should run");

        assert_eq!(record.strategy, Some(BondTarget::Frax));
        assert!(record.completed);
        assert!((record.discount.unwrap() - 5.0).abs() < 1e-9);
        let kinds: Vec<TxKind> = record.steps.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TxKind::ClaimReward,
                TxKind::Unstake,
                TxKind::Swap,
                TxKind::DepositBond,
            ]
        );
        // The whole staked position was unstaked and swapped away.
        assert_eq!(ledger.staked_balance().await, 0);
        assert_eq!(ledger.native_balance().await, 0);
        assert_eq!(collected.lock().await.0.len(), 1);
    }

    #[test]
    fn decisions_are_pure_functions_of_the_snapshot() {
        let t = thresholds();
        let snap = snapshot(6.5, 5.5);
        let first = (
            select_candidate(&snap, t.min_bond_discount_percent),
            use_pending_rewards(&snap, &t),
        );
        for _ in 0..10 {
            assert_eq!(
                first,
                (
                    select_candidate(&snap, t.min_bond_discount_percent),
                    use_pending_rewards(&snap, &t),
                )
            );
        }
    }
}
