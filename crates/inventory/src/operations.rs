use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;

use stockledger_core::{DomainError, DomainResult, UserId};

use crate::event::{NewStockEvent, StockEvent, StockEventType};
use crate::replay::StockStateProjection;
use crate::store::StockEventStore;

/// Optional provenance recorded on an event, never interpreted by the engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Provenance {
    pub reference: Option<String>,
    pub user_id: Option<UserId>,
    pub metadata: Option<JsonValue>,
}

impl Provenance {
    pub fn reference(reference: impl Into<String>) -> Self {
        Self {
            reference: Some(reference.into()),
            ..Self::default()
        }
    }
}

/// Typed write surface over one aggregate's stock.
///
/// Wraps the current replayed state and the open append buffer for one unit
/// of work. Each operation validates against the running state, computes the
/// resulting `balance_after`, appends the fact, and folds it into the local
/// state so later operations in the same unit of work see earlier writes.
///
/// Returns an owned copy of the appended event; the buffer keeps the
/// original for the persistence collaborator to drain.
#[derive(Debug)]
pub struct StockOperations<'a> {
    store: &'a mut StockEventStore,
    state: &'a mut StockStateProjection,
}

impl<'a> StockOperations<'a> {
    pub fn new(store: &'a mut StockEventStore, state: &'a mut StockStateProjection) -> Self {
        Self { store, state }
    }

    /// Current view, including operations performed through this handle.
    pub fn state(&self) -> &StockStateProjection {
        self.state
    }

    /// Record the opening balance of a stream. Rejected once any event
    /// exists for the aggregate.
    pub fn initialize(
        &mut self,
        quantity: Decimal,
        occurred_at: DateTime<Utc>,
        provenance: Provenance,
    ) -> DomainResult<StockEvent> {
        if self.store.next_sequence() != 1 {
            return Err(DomainError::conflict("stock already initialized"));
        }
        if quantity < Decimal::ZERO {
            return Err(DomainError::validation("opening quantity cannot be negative"));
        }
        self.emit(
            StockEventType::StockInitialized,
            quantity,
            quantity,
            occurred_at,
            provenance,
        )
    }

    /// Goods received: on-hand increases by `quantity`.
    pub fn receive(
        &mut self,
        quantity: Decimal,
        occurred_at: DateTime<Utc>,
        provenance: Provenance,
    ) -> DomainResult<StockEvent> {
        self.ensure_positive(quantity)?;
        self.emit(
            StockEventType::StockIncreased,
            quantity,
            self.state.quantity + quantity,
            occurred_at,
            provenance,
        )
    }

    /// Goods shipped: on-hand decreases by `quantity`. Cannot ship more than
    /// is available (on-hand minus reserved).
    pub fn ship(
        &mut self,
        quantity: Decimal,
        occurred_at: DateTime<Utc>,
        provenance: Provenance,
    ) -> DomainResult<StockEvent> {
        self.ensure_positive(quantity)?;
        self.ensure_available(quantity)?;
        self.emit(
            StockEventType::StockDecreased,
            quantity,
            self.state.quantity - quantity,
            occurred_at,
            provenance,
        )
    }

    /// Hold `quantity` against future shipment. On-hand is unchanged.
    pub fn reserve(
        &mut self,
        quantity: Decimal,
        occurred_at: DateTime<Utc>,
        provenance: Provenance,
    ) -> DomainResult<StockEvent> {
        self.ensure_positive(quantity)?;
        if quantity > self.state.available_quantity() {
            return Err(DomainError::invariant(
                "cannot reserve more than available stock",
            ));
        }
        self.emit(
            StockEventType::StockReserved,
            quantity,
            self.state.quantity,
            occurred_at,
            provenance,
        )
    }

    /// Release a previously placed reservation.
    pub fn release(
        &mut self,
        quantity: Decimal,
        occurred_at: DateTime<Utc>,
        provenance: Provenance,
    ) -> DomainResult<StockEvent> {
        self.ensure_positive(quantity)?;
        if quantity > self.state.reserved_quantity {
            return Err(DomainError::invariant(
                "cannot release more than reserved stock",
            ));
        }
        self.emit(
            StockEventType::StockReservationReleased,
            quantity,
            self.state.quantity,
            occurred_at,
            provenance,
        )
    }

    /// Stock leaving for another warehouse. Same availability rule as
    /// shipping.
    pub fn transfer_out(
        &mut self,
        quantity: Decimal,
        occurred_at: DateTime<Utc>,
        provenance: Provenance,
    ) -> DomainResult<StockEvent> {
        self.ensure_positive(quantity)?;
        self.ensure_available(quantity)?;
        self.emit(
            StockEventType::StockTransferOut,
            quantity,
            self.state.quantity - quantity,
            occurred_at,
            provenance,
        )
    }

    /// Stock arriving from another warehouse.
    pub fn transfer_in(
        &mut self,
        quantity: Decimal,
        occurred_at: DateTime<Utc>,
        provenance: Provenance,
    ) -> DomainResult<StockEvent> {
        self.ensure_positive(quantity)?;
        self.emit(
            StockEventType::StockTransferIn,
            quantity,
            self.state.quantity + quantity,
            occurred_at,
            provenance,
        )
    }

    /// Set on-hand to an absolute value (manual adjustment). The recorded
    /// `quantity` is the delta from the current state, informative only.
    pub fn adjust(
        &mut self,
        new_balance: Decimal,
        occurred_at: DateTime<Utc>,
        provenance: Provenance,
    ) -> DomainResult<StockEvent> {
        self.set_absolute(StockEventType::StockAdjusted, new_balance, occurred_at, provenance)
    }

    /// Record a physical count result as the authoritative on-hand quantity.
    pub fn count(
        &mut self,
        counted_quantity: Decimal,
        occurred_at: DateTime<Utc>,
        provenance: Provenance,
    ) -> DomainResult<StockEvent> {
        self.set_absolute(
            StockEventType::StockCounted,
            counted_quantity,
            occurred_at,
            provenance,
        )
    }

    /// Correct an erroneous balance after the fact.
    pub fn correct(
        &mut self,
        corrected_balance: Decimal,
        occurred_at: DateTime<Utc>,
        provenance: Provenance,
    ) -> DomainResult<StockEvent> {
        self.set_absolute(
            StockEventType::StockCorrected,
            corrected_balance,
            occurred_at,
            provenance,
        )
    }

    fn set_absolute(
        &mut self,
        event_type: StockEventType,
        new_balance: Decimal,
        occurred_at: DateTime<Utc>,
        provenance: Provenance,
    ) -> DomainResult<StockEvent> {
        if new_balance < Decimal::ZERO {
            return Err(DomainError::validation("balance cannot be negative"));
        }
        let delta = new_balance - self.state.quantity;
        self.emit(event_type, delta, new_balance, occurred_at, provenance)
    }

    fn ensure_positive(&self, quantity: Decimal) -> DomainResult<()> {
        if quantity <= Decimal::ZERO {
            return Err(DomainError::validation("quantity must be positive"));
        }
        Ok(())
    }

    fn ensure_available(&self, quantity: Decimal) -> DomainResult<()> {
        if quantity > self.state.available_quantity() {
            return Err(DomainError::invariant("insufficient available stock"));
        }
        Ok(())
    }

    fn emit(
        &mut self,
        event_type: StockEventType,
        quantity: Decimal,
        balance_after: Decimal,
        occurred_at: DateTime<Utc>,
        provenance: Provenance,
    ) -> DomainResult<StockEvent> {
        let key = self.store.key();
        let event = self
            .store
            .append(NewStockEvent {
                key,
                event_type,
                quantity,
                balance_after,
                reference: provenance.reference,
                user_id: provenance.user_id,
                metadata: provenance.metadata,
                occurred_at,
            })?
            .clone();

        self.state.apply(&event);
        Ok(event)
    }
}
