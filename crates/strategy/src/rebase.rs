//! Rebase compounding loop.
//!
//! Waits for the next rebase event to come close, then claims every
//! reward source above the claim threshold with autostake enabled, so
//! the payouts compound into the staked position before the event. A
//! long cool-down after each pass skips past the event itself instead
//! of re-triggering on the same countdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{info, warn};

use common::config::BotConfig;
use common::{ExecutionRecord, OperationKind, Result, RewardSource, TransactionResult};
use ledger_core::RemoteLedger;

use crate::audit::{self, SharedAuditSink};
use crate::ops::TxExecutor;

/// The rebase-proximity evaluation loop.
pub struct RebaseEngine<L> {
    ledger: Arc<L>,
    executor: TxExecutor<L>,
    min_claim: u128,
    proximity_blocks: u64,
    poll_interval: Duration,
    cooldown: Duration,
    gate: Arc<Mutex<()>>,
    sink: SharedAuditSink,
}

impl<L: RemoteLedger + 'static> RebaseEngine<L> {
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
            min_claim: cfg.strategy.thresholds().min_pending_reward_to_claim,
            proximity_blocks: cfg.timing.rebase_proximity_blocks,
            poll_interval: Duration::from_secs(cfg.timing.rebase_poll_interval_secs),
            cooldown: Duration::from_secs(cfg.timing.post_rebase_cooldown_secs),
            gate,
            sink,
        }
    }

    /// One evaluation: when the event is close, run the compounding pass
    /// and return its record.
    pub async fn tick(&self) -> Result<Option<ExecutionRecord>> {
        let remaining = self.ledger.blocks_until_rebase().await?;
        info!("{} blocks before rebase", remaining);
        if remaining >= self.proximity_blocks {
            return Ok(None);
        }

        // One strategy in flight at a time across both loops.
        let _guard = self.gate.lock().await;
        let mut steps: Vec<TransactionResult> = Vec::new();
        let mut completed = true;

        for source in RewardSource::ALL {
            let pending = self.ledger.pending_reward(source).await?;
            if pending <= self.min_claim {
                continue;
            }
            let step = self.executor.claim_reward(source, true).await?;
            let ok = step.status.is_success();
            steps.push(step);
            if !ok {
                completed = false;
                break;
            }
        }

        let record = ExecutionRecord {
            operation: OperationKind::Rebase,
            strategy: None,
            discount: None,
            steps,
            completed,
        };
        if record.completed {
            info!("successfully claimed and autostaked");
        } else {
            warn!("compounding pass stopped after a failed claim");
        }
        audit::record(&self.sink, &record).await;
        Ok(Some(record))
    }

    /// Poll forever. A failed iteration is logged and skipped; a
    /// compounding pass is followed by the long cool-down.
    pub async fn run(self) {
        loop {
            match self.tick().await {
                Ok(Some(_)) => sleep(self.cooldown).await,
                Ok(None) => sleep(self.poll_interval).await,
                Err(e) => {
                    warn!("rebase iteration failed: {}", e);
                    sleep(self.poll_interval).await;
                }
            }
        }
    }
}
