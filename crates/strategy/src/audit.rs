//! Durable audit of completed strategy executions.
//!
//! The sink is fire-and-forget: implementations swallow their own write
//! failures, and nothing here can abort a strategy that already ran
//! on-chain.

use std::sync::Arc;

use tokio::sync::Mutex;

use common::ExecutionRecord;

pub trait AuditSink: Send {
    fn record(&mut self, record: &ExecutionRecord);
}

pub type SharedAuditSink = Arc<Mutex<dyn AuditSink>>;

/// Sink that drops every record. Used by dry runs and tests.
pub struct NullSink;

impl AuditSink for NullSink {
    fn record(&mut self, _record: &ExecutionRecord) {}
}

pub(crate) async fn record(sink: &SharedAuditSink, record: &ExecutionRecord) {
    sink.lock().await.record(record);
}
