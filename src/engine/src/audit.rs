use crate::context::Context;
use crate::engine::Layer;
use crate::error::AuditError;
use chrono::{DateTime, Utc};
use log::info;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc::{self, Receiver, Sender, error::TrySendError};

/// How one resolution was reached. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecisionRecord {
    pub capability: String,
    pub context: Context,
    pub value: bool,
    pub decided_by: Layer,
    pub timestamp: DateTime<Utc>,
}

impl DecisionRecord {
    pub fn new(capability: &str, context: &Context, value: bool, decided_by: Layer) -> Self {
        Self {
            capability: capability.to_owned(),
            context: context.clone(),
            value,
            decided_by,
            timestamp: Utc::now(),
        }
    }
}

/// Receives one record per successful resolution.
///
/// Called on the resolving thread; implementations must not block. Errors
/// are logged and dropped by the engine.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: DecisionRecord) -> Result<(), AuditError>;
}

impl<F> AuditSink for F
where
    F: Fn(DecisionRecord) + Send + Sync,
{
    fn record(&self, record: DecisionRecord) -> Result<(), AuditError> {
        self(record);
        Ok(())
    }
}

/// Append-only in-memory trail.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<DecisionRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<DecisionRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl AuditSink for MemorySink {
    fn record(&self, record: DecisionRecord) -> Result<(), AuditError> {
        self.records.lock().push(record);
        Ok(())
    }
}

/// One log line per decision.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl AuditSink for LogSink {
    fn record(&self, record: DecisionRecord) -> Result<(), AuditError> {
        info!(
            "{} -> {} ({}) in {}",
            record.capability, record.value, record.decided_by, record.context
        );
        Ok(())
    }
}

/// Hands records to a bounded queue. A full or closed queue drops the record.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<DecisionRecord>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> (Self, Receiver<DecisionRecord>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl AuditSink for ChannelSink {
    fn record(&self, record: DecisionRecord) -> Result<(), AuditError> {
        self.tx.try_send(record).map_err(|err| match err {
            TrySendError::Full(_) => AuditError::Full,
            TrySendError::Closed(_) => AuditError::Closed,
        })
    }
}
