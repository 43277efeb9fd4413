use std::sync::Arc;

use thiserror::Error;

use stockledger_inventory::{StockEvent, StockKey, StockSnapshot};

/// Stock store operation error.
///
/// These are **infrastructure errors** (storage, uniqueness, isolation) as
/// opposed to domain errors (validation, invariants).
///
/// ## Error Categories
///
/// - **DuplicateSequence**: the uniqueness constraint on
///   `(tenant, product, warehouse, sequence_number)` rejected an append;
///   this is what absorbs duplicate deliveries under at-least-once commit
/// - **TenantIsolation**: a batch mixed events from multiple tenants
/// - **InvalidAppend**: invalid event data or stream state (gap, mixed
///   streams within one tenant)
/// - **Storage**: the backing store itself failed
#[derive(Debug, Error)]
pub enum StockStoreError {
    #[error("duplicate sequence number {sequence} for stream {stream}")]
    DuplicateSequence { stream: String, sequence: u64 },

    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),

    #[error("invalid append: {0}")]
    InvalidAppend(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

/// Durable, tenant-scoped storage for stock streams and snapshots.
///
/// The engine core (append buffer, replay, point-in-time queries) performs
/// no IO; this trait is the single collaborator it delegates durability to.
///
/// ## Streams
///
/// Events are organized into streams, one per `StockKey`
/// (tenant + product + warehouse). Within a stream, sequence numbers are
/// gapless and strictly increasing from 1; the store enforces a uniqueness
/// constraint on `(key, sequence_number)` so a retried commit can never
/// write the same fact twice.
///
/// ## Implementation Requirements
///
/// Implementations must:
/// - enforce tenant isolation (reject batches mixing tenants)
/// - enforce the sequence uniqueness constraint
/// - persist batches atomically (all events or none)
/// - return events in ascending sequence order from
///   [`load_events_since`](Self::load_events_since)
///
/// Retry, timeout, and cancellation policy live behind this trait; the
/// callers treat every method as a synchronous, fallible call.
pub trait StockPersistence: Send + Sync {
    /// Latest snapshot for the stream, if one has been saved.
    fn load_snapshot(&self, key: StockKey) -> Result<Option<StockSnapshot>, StockStoreError>;

    /// All events with `sequence_number > since_sequence`, ascending.
    /// `since_sequence = 0` loads the full stream.
    fn load_events_since(
        &self,
        key: StockKey,
        since_sequence: u64,
    ) -> Result<Vec<StockEvent>, StockStoreError>;

    /// The stream's durable high-water mark (0 for an empty stream).
    ///
    /// Append buffers are seeded from this value so sequence numbers
    /// continue across units of work instead of restarting per batch.
    fn last_sequence(&self, key: StockKey) -> Result<u64, StockStoreError>;

    /// Durably write a batch of already-sequenced events, atomically.
    fn persist_events(&self, events: &[StockEvent]) -> Result<(), StockStoreError>;

    /// Save (or replace) the stream's snapshot checkpoint.
    fn save_snapshot(&self, snapshot: StockSnapshot) -> Result<(), StockStoreError>;
}

impl<S> StockPersistence for Arc<S>
where
    S: StockPersistence + ?Sized,
{
    fn load_snapshot(&self, key: StockKey) -> Result<Option<StockSnapshot>, StockStoreError> {
        (**self).load_snapshot(key)
    }

    fn load_events_since(
        &self,
        key: StockKey,
        since_sequence: u64,
    ) -> Result<Vec<StockEvent>, StockStoreError> {
        (**self).load_events_since(key, since_sequence)
    }

    fn last_sequence(&self, key: StockKey) -> Result<u64, StockStoreError> {
        (**self).last_sequence(key)
    }

    fn persist_events(&self, events: &[StockEvent]) -> Result<(), StockStoreError> {
        (**self).persist_events(events)
    }

    fn save_snapshot(&self, snapshot: StockSnapshot) -> Result<(), StockStoreError> {
        (**self).save_snapshot(snapshot)
    }
}
