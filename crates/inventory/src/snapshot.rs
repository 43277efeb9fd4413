use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::event::StockKey;
use crate::replay::StockStateProjection;

/// A point-in-time materialized balance, used to bound replay cost.
///
/// Invariant: replaying all events with `sequence_number >
/// last_event_sequence` on top of this snapshot yields exactly the state of
/// replaying the full history from sequence 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub key: StockKey,
    pub quantity: Decimal,
    pub reserved_quantity: Decimal,

    /// Sequence number through which this snapshot already accounts.
    pub last_event_sequence: u64,

    pub snapshot_at: DateTime<Utc>,
}

impl StockSnapshot {
    /// Materialize a replayed state as a checkpoint for `key`.
    pub fn capture(key: StockKey, state: &StockStateProjection, at: DateTime<Utc>) -> Self {
        Self {
            key,
            quantity: state.quantity,
            reserved_quantity: state.reserved_quantity,
            last_event_sequence: state.last_sequence,
            snapshot_at: at,
        }
    }
}
