use uuid::Uuid;

use stockledger_core::{DomainError, DomainResult};

use crate::event::{NewStockEvent, StockEvent, StockKey};

/// Append-only buffer of stock events for one aggregate within one unit of
/// work.
///
/// The store assigns sequence numbers and holds events until the persistence
/// collaborator has durably written them; it performs no IO itself and
/// cannot fail beyond rejecting events for the wrong aggregate.
///
/// ## Sequence assignment
///
/// The store is constructed with the aggregate's last durably-known sequence
/// number and continues from there, so appends across multiple units of work
/// (or after a partially drained buffer) never collide. Within one buffer,
/// sequence numbers are contiguous.
///
/// ## Commit protocol
///
/// 1. A collaborator drains [`uncommitted_events`](Self::uncommitted_events)
///    and writes them durably.
/// 2. Only after the write is confirmed, [`mark_committed`](Self::mark_committed)
///    clears the buffer and advances the committed high-water mark.
/// 3. If persistence fails, the buffer is left intact so the enclosing
///    transaction can retry or abort as a whole (at-least-once; the durable
///    store's uniqueness constraint on `(key, sequence_number)` absorbs
///    duplicate deliveries).
///
/// One instance must not be shared across concurrent units of work; callers
/// serialize writers per aggregate.
#[derive(Debug)]
pub struct StockEventStore {
    key: StockKey,
    last_committed_sequence: u64,
    uncommitted: Vec<StockEvent>,
}

impl StockEventStore {
    /// Open a buffer for `key`, continuing after `last_committed_sequence`
    /// (0 for a stream with no history).
    pub fn new(key: StockKey, last_committed_sequence: u64) -> Self {
        Self {
            key,
            last_committed_sequence,
            uncommitted: Vec::new(),
        }
    }

    pub fn key(&self) -> StockKey {
        self.key
    }

    /// Sequence number the next appended event will receive.
    pub fn next_sequence(&self) -> u64 {
        self.last_committed_sequence + self.uncommitted.len() as u64 + 1
    }

    /// Construct the event, assign the next sequence number, and buffer it.
    ///
    /// No quantity/balance consistency validation happens here; callers are
    /// responsible for supplying a correct `balance_after`.
    pub fn append(&mut self, new_event: NewStockEvent) -> DomainResult<&StockEvent> {
        if new_event.key != self.key {
            return Err(DomainError::invariant(format!(
                "aggregate key mismatch: store is open for {}, event targets {}",
                self.key, new_event.key
            )));
        }

        let event = StockEvent {
            event_id: Uuid::now_v7(),
            tenant_id: new_event.key.tenant_id,
            product_id: new_event.key.product_id,
            warehouse_id: new_event.key.warehouse_id,
            event_type: new_event.event_type,
            quantity: new_event.quantity,
            balance_after: new_event.balance_after,
            reference: new_event.reference,
            user_id: new_event.user_id,
            metadata: new_event.metadata,
            occurred_at: new_event.occurred_at,
            sequence_number: self.next_sequence(),
        };

        self.uncommitted.push(event);
        Ok(self.uncommitted.last().expect("just pushed"))
    }

    /// Read-only view of buffered events, in append order, for the
    /// persistence collaborator to drain.
    pub fn uncommitted_events(&self) -> &[StockEvent] {
        &self.uncommitted
    }

    pub fn is_empty(&self) -> bool {
        self.uncommitted.is_empty()
    }

    /// Clear the buffer after the persistence collaborator confirms the
    /// durable write. Never call this on a failed write.
    pub fn mark_committed(&mut self) {
        self.last_committed_sequence += self.uncommitted.len() as u64;
        self.uncommitted.clear();
    }
}
