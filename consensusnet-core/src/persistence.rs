//! Optional persistence sink (spec §6): fire-and-forget recording of
//! verdicts, debates and reputation events. Must never block the request path.

use async_trait::async_trait;

use crate::types::{DebateOutcome, Verdict};

#[derive(Debug, Clone)]
pub enum PersistedRecord {
    Verdict(Verdict),
    Debate(DebateOutcome),
    ReputationEvent { agent_id: String, kind: String },
}

#[async_trait]
pub trait PersistenceSink: Send + Sync {
    async fn record(&self, record: PersistedRecord);
}

/// Default sink: discards everything. Used when no persistence backend is
/// configured so the rest of the core never special-cases "nothing to record".
pub struct NoopSink;

#[async_trait]
impl PersistenceSink for NoopSink {
    async fn record(&self, _record: PersistedRecord) {}
}

/// In-memory recorder used by integration tests to assert on what would
/// have been persisted without standing up a real database crate.
pub struct InMemorySink {
    records: parking_lot::Mutex<Vec<PersistedRecord>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self {
            records: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub fn drain(&self) -> Vec<PersistedRecord> {
        std::mem::take(&mut self.records.lock())
    }
}

impl Default for InMemorySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PersistenceSink for InMemorySink {
    async fn record(&self, record: PersistedRecord) {
        self.records.lock().push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn in_memory_sink_records_what_it_is_given() {
        let sink = InMemorySink::new();
        sink.record(PersistedRecord::ReputationEvent {
            agent_id: "a".to_string(),
            kind: "verification_correct".to_string(),
        })
        .await;
        let drained = sink.drain();
        assert_eq!(drained.len(), 1);
        assert!(sink.drain().is_empty());
    }

    #[tokio::test]
    async fn noop_sink_accepts_everything_without_panicking() {
        let sink = NoopSink;
        sink.record(PersistedRecord::ReputationEvent {
            agent_id: "a".to_string(),
            kind: "k".to_string(),
        })
        .await;
        let _ = Uuid::new_v4();
    }
}
