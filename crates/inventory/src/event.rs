use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use stockledger_core::{ProductId, TenantId, UserId, WarehouseId};
use stockledger_events::{Event, TenantScoped};

/// Aggregate key of a stock stream.
///
/// One (tenant, product, warehouse) triple is the unit of consistency and
/// sequencing: sequence numbers are assigned per key, and every query is
/// scoped to one key.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StockKey {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
}

impl StockKey {
    pub fn new(tenant_id: TenantId, product_id: ProductId, warehouse_id: WarehouseId) -> Self {
        Self {
            tenant_id,
            product_id,
            warehouse_id,
        }
    }
}

impl core::fmt::Display for StockKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.tenant_id, self.product_id, self.warehouse_id
        )
    }
}

/// Kind of state change a stock event records.
///
/// Closed set: interpreting code matches exhaustively, so adding a variant
/// forces every fold to handle it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockEventType {
    StockInitialized,
    StockIncreased,
    StockDecreased,
    StockReserved,
    StockReservationReleased,
    StockTransferOut,
    StockTransferIn,
    StockAdjusted,
    StockCounted,
    StockCorrected,
}

impl StockEventType {
    /// Stable dotted event-type name, for logs and persisted metadata.
    pub fn name(self) -> &'static str {
        match self {
            StockEventType::StockInitialized => "inventory.stock.initialized",
            StockEventType::StockIncreased => "inventory.stock.increased",
            StockEventType::StockDecreased => "inventory.stock.decreased",
            StockEventType::StockReserved => "inventory.stock.reserved",
            StockEventType::StockReservationReleased => "inventory.stock.reservation_released",
            StockEventType::StockTransferOut => "inventory.stock.transfer_out",
            StockEventType::StockTransferIn => "inventory.stock.transfer_in",
            StockEventType::StockAdjusted => "inventory.stock.adjusted",
            StockEventType::StockCounted => "inventory.stock.counted",
            StockEventType::StockCorrected => "inventory.stock.corrected",
        }
    }
}

/// An event ready to be appended to a stream (not yet assigned a sequence
/// number or event id).
///
/// Callers supply `balance_after` themselves; the append buffer records it
/// as-is and never recomputes it. The domain operations layer
/// ([`crate::operations::StockOperations`]) is the intended producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewStockEvent {
    pub key: StockKey,
    pub event_type: StockEventType,
    pub quantity: Decimal,
    pub balance_after: Decimal,
    pub reference: Option<String>,
    pub user_id: Option<UserId>,
    pub metadata: Option<JsonValue>,
    pub occurred_at: DateTime<Utc>,
}

/// An immutable fact describing one state change to one product's stock in
/// one warehouse.
///
/// Events are append-only: once a `StockEvent` exists it is never updated or
/// deleted. `sequence_number` is the ordering authority for all replay and
/// point-in-time logic; `occurred_at` is business time and may be out of
/// order relative to sequence (e.g. a backdated correction).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockEvent {
    pub event_id: Uuid,
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,

    pub event_type: StockEventType,

    /// Delta for increase/decrease/reserve/release events; recorded delta for
    /// absolute events (adjusted/counted/corrected), where it is informative
    /// only and `balance_after` is authoritative.
    pub quantity: Decimal,

    /// Quantity on hand immediately after this event, recorded at append time.
    pub balance_after: Decimal,

    pub reference: Option<String>,
    pub user_id: Option<UserId>,
    pub metadata: Option<JsonValue>,

    pub occurred_at: DateTime<Utc>,

    /// Strictly increasing position in the aggregate stream, gapless from 1.
    pub sequence_number: u64,
}

impl StockEvent {
    pub fn key(&self) -> StockKey {
        StockKey {
            tenant_id: self.tenant_id,
            product_id: self.product_id,
            warehouse_id: self.warehouse_id,
        }
    }
}

impl Event for StockEvent {
    fn event_type(&self) -> &'static str {
        self.event_type.name()
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

impl TenantScoped for StockEvent {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}
