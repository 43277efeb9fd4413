use std::collections::HashMap;
use std::sync::RwLock;

use stockledger_events::TenantScoped;
use stockledger_inventory::{StockEvent, StockKey, StockSnapshot};

use super::r#trait::{StockPersistence, StockStoreError};

/// In-memory stock persistence.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryStockPersistence {
    streams: RwLock<HashMap<StockKey, Vec<StockEvent>>>,
    snapshots: RwLock<HashMap<StockKey, StockSnapshot>>,
}

impl InMemoryStockPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    fn current_sequence(stream: &[StockEvent]) -> u64 {
        stream.last().map(|e| e.sequence_number).unwrap_or(0)
    }
}

impl StockPersistence for InMemoryStockPersistence {
    fn load_snapshot(&self, key: StockKey) -> Result<Option<StockSnapshot>, StockStoreError> {
        let snapshots = self
            .snapshots
            .read()
            .map_err(|_| StockStoreError::Storage("lock poisoned".to_string()))?;

        Ok(snapshots.get(&key).cloned())
    }

    fn load_events_since(
        &self,
        key: StockKey,
        since_sequence: u64,
    ) -> Result<Vec<StockEvent>, StockStoreError> {
        let streams = self
            .streams
            .read()
            .map_err(|_| StockStoreError::Storage("lock poisoned".to_string()))?;

        Ok(streams
            .get(&key)
            .map(|stream| {
                stream
                    .iter()
                    .filter(|e| e.sequence_number > since_sequence)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn last_sequence(&self, key: StockKey) -> Result<u64, StockStoreError> {
        let streams = self
            .streams
            .read()
            .map_err(|_| StockStoreError::Storage("lock poisoned".to_string()))?;

        Ok(streams
            .get(&key)
            .map(|stream| Self::current_sequence(stream))
            .unwrap_or(0))
    }

    fn persist_events(&self, events: &[StockEvent]) -> Result<(), StockStoreError> {
        if events.is_empty() {
            return Ok(());
        }

        // All events must target the same tenant + stream.
        let key = events[0].key();
        for (idx, e) in events.iter().enumerate() {
            if e.tenant_id() != key.tenant_id {
                return Err(StockStoreError::TenantIsolation(format!(
                    "batch contains multiple tenants (index {idx})"
                )));
            }
            if e.key() != key {
                return Err(StockStoreError::InvalidAppend(format!(
                    "batch contains multiple aggregate streams (index {idx})"
                )));
            }
        }

        let mut streams = self
            .streams
            .write()
            .map_err(|_| StockStoreError::Storage("lock poisoned".to_string()))?;

        let stream = streams.entry(key).or_default();
        let current = Self::current_sequence(stream);

        // Validate the whole batch before touching the stream (atomicity).
        let mut expected = current + 1;
        for e in events {
            if e.sequence_number <= current {
                return Err(StockStoreError::DuplicateSequence {
                    stream: key.to_string(),
                    sequence: e.sequence_number,
                });
            }
            if e.sequence_number != expected {
                return Err(StockStoreError::InvalidAppend(format!(
                    "sequence gap in batch for stream {key}: expected {expected}, found {}",
                    e.sequence_number
                )));
            }
            expected += 1;
        }

        stream.extend(events.iter().cloned());
        Ok(())
    }

    fn save_snapshot(&self, snapshot: StockSnapshot) -> Result<(), StockStoreError> {
        let mut snapshots = self
            .snapshots
            .write()
            .map_err(|_| StockStoreError::Storage("lock poisoned".to_string()))?;

        snapshots.insert(snapshot.key, snapshot);
        Ok(())
    }
}
