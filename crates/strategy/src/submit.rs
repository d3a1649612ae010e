//! Bounded retry with gas escalation around one remote submission.
//!
//! The attempt closure builds, signs, submits, and blocks for confirmation
//! of a single call at the given gas parameters; live reads that must be
//! fresh per attempt (a deposit's max-price bound) happen inside it. A
//! confirmed failure escalates gas by a fifth and gas price by one unit
//! and tries again, up to [`MAX_ATTEMPTS`]. Exhaustion returns the last
//! failed receipt rather than an error: the caller decides what a dead
//! step means for the rest of its sequence.

use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;
use tracing::warn;

use common::{Result, TxStatus};
use ledger_core::Receipt;

/// Submission attempts per call, confirmed failures included.
pub const MAX_ATTEMPTS: u32 = 3;

fn escalate(gas: u64, gas_price: u64) -> (u64, u64) {
    (gas + gas / 5, gas_price + 1)
}

/// Drive `attempt` to a confirmed success or `MAX_ATTEMPTS` confirmed
/// failures.
///
/// Each attempt's confirmation wait is bounded by `confirm_timeout`;
/// expiry counts as a retryable failure with an unknown transaction hash.
/// `Err` from the closure means the ledger was unreachable and is
/// propagated immediately.
pub async fn submit_with_retry<F, Fut>(
    mut attempt: F,
    mut gas: u64,
    mut gas_price: u64,
    confirm_timeout: Duration,
) -> Result<Receipt>
where
    F: FnMut(u64, u64) -> Fut,
    Fut: Future<Output = Result<Receipt>>,
{
    let mut try_no = 1;
    loop {
        let receipt = match timeout(confirm_timeout, attempt(gas, gas_price)).await {
            Ok(outcome) => outcome?,
            Err(_) => {
                warn!(
                    "confirmation wait exceeded {}s on attempt {}/{}",
                    confirm_timeout.as_secs(),
                    try_no,
                    MAX_ATTEMPTS
                );
                Receipt {
                    tx_hash: String::new(),
                    status: TxStatus::Failed,
                    logs: Vec::new(),
                }
            }
        };

        if receipt.is_success() || try_no == MAX_ATTEMPTS {
            return Ok(receipt);
        }

        warn!(
            "transaction failed (attempt {}/{}, tx {}): retrying with more gas",
            try_no, MAX_ATTEMPTS, receipt.tx_hash
        );
        (gas, gas_price) = escalate(gas, gas_price);
        try_no += 1;
    }
}
