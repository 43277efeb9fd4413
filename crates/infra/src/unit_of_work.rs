//! Unit-of-work orchestration for stock streams.
//!
//! This module wires the pure engine pieces to the persistence boundary:
//! load snapshot + tail, replay to a current state, buffer appends, persist,
//! commit. One unit of work owns one aggregate's append buffer for its
//! lifetime; callers serialize writers per aggregate (the store's uniqueness
//! constraint catches the ones that don't).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;

use stockledger_core::DomainError;
use stockledger_events::Event;
use stockledger_inventory::{
    StockEvent, StockEventStore, StockKey, StockMovementSummaryProjection, StockOperations,
    StockSnapshot, StockStateProjection, balance_at, movement_summary, replay_from_snapshot,
};
use stockledger_observability::MetricsRegistry;

use crate::stock_store::{StockPersistence, StockStoreError};

/// Unit-of-work error: a domain failure (validation, invariant, sequencing)
/// or a persistence failure.
#[derive(Debug, Error)]
pub enum UnitOfWorkError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StockStoreError),
}

/// One transactional write scope over a single stock stream.
///
/// ## Lifecycle
///
/// 1. [`begin`](Self::begin) loads the snapshot and event tail, replays to
///    the current state, and opens an append buffer seeded with the stream's
///    durable high-water mark.
/// 2. [`operations`](Self::operations) hands out the typed write surface;
///    every append stays in the buffer.
/// 3. [`commit`](Self::commit) persists the buffer atomically and only then
///    marks it committed. On failure the buffer is untouched, so the caller
///    can retry the commit or drop the unit of work to abort.
///
/// Do not share an instance across concurrent units of work.
pub struct StockUnitOfWork<P: StockPersistence> {
    persistence: P,
    metrics: Arc<MetricsRegistry>,
    store: StockEventStore,
    state: StockStateProjection,
}

impl<P: StockPersistence> StockUnitOfWork<P> {
    /// Open a unit of work for `key`, replaying the stream to its current
    /// state.
    pub fn begin(
        persistence: P,
        metrics: Arc<MetricsRegistry>,
        key: StockKey,
    ) -> Result<Self, UnitOfWorkError> {
        let last_sequence = persistence.last_sequence(key)?;
        let snapshot = persistence.load_snapshot(key)?;
        let since = snapshot
            .as_ref()
            .map(|s| s.last_event_sequence)
            .unwrap_or(0);
        let events = persistence.load_events_since(key, since)?;

        let state = replay_from_snapshot(snapshot.as_ref(), &events)?;
        if state.last_sequence != last_sequence {
            return Err(StockStoreError::Storage(format!(
                "stream {key} high-water mismatch: replay reached {}, store reports {last_sequence}",
                state.last_sequence
            ))
            .into());
        }

        metrics.set("stock.replay.events_applied", state.event_count as i64);
        tracing::debug!(
            stream = %key,
            last_sequence,
            replayed = state.event_count,
            from_snapshot = snapshot.is_some(),
            "opened stock unit of work"
        );

        Ok(Self {
            persistence,
            metrics,
            store: StockEventStore::new(key, last_sequence),
            state,
        })
    }

    pub fn key(&self) -> StockKey {
        self.store.key()
    }

    /// Current replayed state, including uncommitted operations.
    pub fn current_state(&self) -> &StockStateProjection {
        &self.state
    }

    /// Typed write surface over the open buffer.
    pub fn operations(&mut self) -> StockOperations<'_> {
        StockOperations::new(&mut self.store, &mut self.state)
    }

    /// Events buffered but not yet durably written.
    pub fn uncommitted_events(&self) -> &[StockEvent] {
        self.store.uncommitted_events()
    }

    /// Persist the buffered events and clear the buffer.
    ///
    /// Returns the number of events committed (0 for an empty buffer). On a
    /// persistence error the buffer survives for retry.
    pub fn commit(&mut self) -> Result<usize, UnitOfWorkError> {
        let events = self.store.uncommitted_events();
        if events.is_empty() {
            return Ok(0);
        }

        for event in events {
            tracing::debug!(
                stream = %self.store.key(),
                event_type = event.event_type(),
                sequence = event.sequence_number,
                "persisting stock event"
            );
        }

        self.persistence.persist_events(events)?;
        let committed = events.len();
        self.store.mark_committed();

        self.metrics.add("stock.commit.batches", 1);
        self.metrics.add("stock.commit.events", committed as i64);
        tracing::info!(stream = %self.store.key(), committed, "committed stock events");

        Ok(committed)
    }

    /// Materialize the current state as a snapshot checkpoint and save it.
    ///
    /// Refused while uncommitted events are pending: a snapshot must never
    /// account for events the durable store has not seen.
    pub fn snapshot_now(&mut self, at: DateTime<Utc>) -> Result<StockSnapshot, UnitOfWorkError> {
        if !self.store.is_empty() {
            return Err(DomainError::invariant(
                "cannot snapshot while uncommitted events are pending",
            )
            .into());
        }

        let snapshot = StockSnapshot::capture(self.store.key(), &self.state, at);
        self.persistence.save_snapshot(snapshot.clone())?;

        tracing::debug!(
            stream = %self.store.key(),
            last_event_sequence = snapshot.last_event_sequence,
            "saved stock snapshot"
        );
        Ok(snapshot)
    }

    /// Quantity on hand as of `point_in_time`, from the full durable stream.
    pub fn balance_at(&self, point_in_time: DateTime<Utc>) -> Result<Decimal, UnitOfWorkError> {
        let events = self.persistence.load_events_since(self.store.key(), 0)?;
        Ok(balance_at(&events, point_in_time))
    }

    /// Movement totals between `from_date` and `to_date` (inclusive), from
    /// the full durable stream.
    pub fn movement_summary(
        &self,
        from_date: DateTime<Utc>,
        to_date: DateTime<Utc>,
    ) -> Result<StockMovementSummaryProjection, UnitOfWorkError> {
        let events = self.persistence.load_events_since(self.store.key(), 0)?;
        Ok(movement_summary(&events, from_date, to_date))
    }
}
