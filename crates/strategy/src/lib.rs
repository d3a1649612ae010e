//! Strategy decision and resilient execution engine.
//!
//! Two independent evaluation loops ([`BondEngine`], [`RebaseEngine`]) poll
//! the remote ledger, decide which multi-step operation sequence to run,
//! and execute it through the operation library ([`TxExecutor`]), with
//! every submission wrapped in bounded retry-with-escalation
//! ([`submit_with_retry`]). Completed runs are handed to an [`AuditSink`].

pub mod audit;
pub mod bonds;
pub mod ops;
pub mod path;
pub mod rebase;
pub mod submit;

pub use audit::{AuditSink, NullSink, SharedAuditSink};
pub use bonds::{funding_sufficient, select_candidate, use_pending_rewards, BondEngine, BondSnapshot};
pub use ops::TxExecutor;
pub use path::{execute_bond_strategy, StrategyProfile};
pub use rebase::RebaseEngine;
pub use submit::{submit_with_retry, MAX_ATTEMPTS};
