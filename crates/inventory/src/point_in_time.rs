//! Historical-analysis queries over one aggregate's event history.
//!
//! Callers supply the full, already-scoped event slice for a single
//! (tenant, product, warehouse) stream; no tenant filtering happens here.
//!
//! Ordering rule: balance lookups select by **sequence number** among events
//! passing the timestamp filter. The timestamp only filters; it never
//! orders. A backdated correction (sequence-late, timestamp-early) therefore
//! wins over earlier-sequenced events with later timestamps, keeping
//! historical answers consistent with replay's ordering authority.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::event::{StockEvent, StockEventType};

/// Derived, ephemeral movement totals over a date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMovementSummaryProjection {
    pub from_date: DateTime<Utc>,
    pub to_date: DateTime<Utc>,

    /// Sum of quantities of increase and transfer-in events in range.
    pub total_incoming: Decimal,

    /// Sum of quantities of decrease and transfer-out events in range.
    pub total_outgoing: Decimal,

    /// `total_incoming - total_outgoing`.
    pub net_change: Decimal,

    /// Count of adjustment and correction events in range.
    pub total_adjustments: u64,

    /// Count of transfer events (either direction) in range.
    pub total_transfers: u64,

    /// Count of all events in range, regardless of type.
    pub event_count: u64,
}

/// Quantity on hand as of `point_in_time`.
///
/// Among events with `occurred_at <= point_in_time`, returns the
/// `balance_after` of the sequence-maximal one; zero if none qualify.
pub fn balance_at(events: &[StockEvent], point_in_time: DateTime<Utc>) -> Decimal {
    events
        .iter()
        .filter(|e| e.occurred_at <= point_in_time)
        .max_by_key(|e| e.sequence_number)
        .map(|e| e.balance_after)
        .unwrap_or(Decimal::ZERO)
}

/// Movement totals for events with `occurred_at` in `[from_date, to_date]`
/// inclusive.
pub fn movement_summary(
    events: &[StockEvent],
    from_date: DateTime<Utc>,
    to_date: DateTime<Utc>,
) -> StockMovementSummaryProjection {
    let mut summary = StockMovementSummaryProjection {
        from_date,
        to_date,
        total_incoming: Decimal::ZERO,
        total_outgoing: Decimal::ZERO,
        net_change: Decimal::ZERO,
        total_adjustments: 0,
        total_transfers: 0,
        event_count: 0,
    };

    for event in events
        .iter()
        .filter(|e| e.occurred_at >= from_date && e.occurred_at <= to_date)
    {
        summary.event_count += 1;

        match event.event_type {
            StockEventType::StockIncreased | StockEventType::StockTransferIn => {
                summary.total_incoming += event.quantity;
            }
            StockEventType::StockDecreased | StockEventType::StockTransferOut => {
                summary.total_outgoing += event.quantity;
            }
            StockEventType::StockAdjusted | StockEventType::StockCorrected => {
                summary.total_adjustments += 1;
            }
            StockEventType::StockInitialized
            | StockEventType::StockReserved
            | StockEventType::StockReservationReleased
            | StockEventType::StockCounted => {}
        }

        if matches!(
            event.event_type,
            StockEventType::StockTransferIn | StockEventType::StockTransferOut
        ) {
            summary.total_transfers += 1;
        }
    }

    summary.net_change = summary.total_incoming - summary.total_outgoing;
    summary
}
