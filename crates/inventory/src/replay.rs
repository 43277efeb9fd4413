//! Deterministic replay of a stock event stream into a state projection.
//!
//! Replay is a pure fold: no IO, no side effects, identical inputs produce
//! bit-identical projections. That determinism is the correctness anchor of
//! the whole engine; everything downstream (current balances, snapshots)
//! derives from it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockledger_core::{DomainError, DomainResult};

use crate::event::{StockEvent, StockEventType};
use crate::snapshot::StockSnapshot;

/// Derived, ephemeral stock state. Constructed fresh on every read, never
/// persisted by this engine, never incrementally mutated in place by callers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StockStateProjection {
    pub quantity: Decimal,
    pub reserved_quantity: Decimal,

    /// Sequence number of the last event folded into this state.
    pub last_sequence: u64,

    /// Number of events folded in (excludes events covered by the seed
    /// snapshot).
    pub event_count: u64,
}

impl StockStateProjection {
    /// Quantity on hand minus reserved. Always computed, never stored.
    pub fn available_quantity(&self) -> Decimal {
        self.quantity - self.reserved_quantity
    }

    fn seeded_from(snapshot: &StockSnapshot) -> Self {
        Self {
            quantity: snapshot.quantity,
            reserved_quantity: snapshot.reserved_quantity,
            last_sequence: snapshot.last_event_sequence,
            event_count: 0,
        }
    }

    /// Fold one event into the state.
    ///
    /// Delta events move `quantity` or `reserved_quantity` by
    /// `event.quantity`; corrective events (adjusted/counted/corrected) set
    /// `quantity` to `balance_after` and ignore `quantity` entirely.
    pub(crate) fn apply(&mut self, event: &StockEvent) {
        match event.event_type {
            StockEventType::StockInitialized => {
                self.quantity = event.quantity;
            }
            StockEventType::StockIncreased | StockEventType::StockTransferIn => {
                self.quantity += event.quantity;
            }
            StockEventType::StockDecreased | StockEventType::StockTransferOut => {
                self.quantity -= event.quantity;
            }
            StockEventType::StockReserved => {
                self.reserved_quantity += event.quantity;
            }
            StockEventType::StockReservationReleased => {
                self.reserved_quantity -= event.quantity;
            }
            StockEventType::StockAdjusted
            | StockEventType::StockCounted
            | StockEventType::StockCorrected => {
                self.quantity = event.balance_after;
            }
        }

        self.last_sequence = event.sequence_number;
        self.event_count += 1;
    }
}

/// Replay an ordered event slice, optionally seeded from a snapshot.
///
/// Events already covered by the snapshot (`sequence_number <=
/// last_event_sequence`) are skipped, so passing a tail that overlaps the
/// snapshot is fine. Past the seed, the stream must be strictly contiguous:
/// a gap, duplicate, or out-of-order event is a data-integrity fault from
/// the persistence layer and fails the whole replay rather than silently
/// producing a wrong balance.
pub fn replay_from_snapshot(
    snapshot: Option<&StockSnapshot>,
    events: &[StockEvent],
) -> DomainResult<StockStateProjection> {
    let mut state = match snapshot {
        Some(snapshot) => StockStateProjection::seeded_from(snapshot),
        None => StockStateProjection::default(),
    };
    let seed_sequence = state.last_sequence;

    for event in events
        .iter()
        .filter(|e| e.sequence_number > seed_sequence)
    {
        let expected = state.last_sequence + 1;
        if event.sequence_number != expected {
            return Err(DomainError::invariant(format!(
                "sequencing violation in stream {}: expected sequence {}, found {}",
                event.key(),
                expected,
                event.sequence_number
            )));
        }
        state.apply(event);
    }

    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::StockKey;
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use stockledger_core::{ProductId, TenantId, WarehouseId};
    use uuid::Uuid;

    fn test_key() -> StockKey {
        StockKey::new(TenantId::new(), ProductId::new(), WarehouseId::new())
    }

    fn event(
        key: StockKey,
        sequence: u64,
        event_type: StockEventType,
        quantity: Decimal,
        balance_after: Decimal,
    ) -> StockEvent {
        StockEvent {
            event_id: Uuid::now_v7(),
            tenant_id: key.tenant_id,
            product_id: key.product_id,
            warehouse_id: key.warehouse_id,
            event_type,
            quantity,
            balance_after,
            reference: None,
            user_id: None,
            metadata: None,
            occurred_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
                + Duration::minutes(sequence as i64),
            sequence_number: sequence,
        }
    }

    #[test]
    fn fold_matches_worked_example() {
        let key = test_key();
        let events = vec![
            event(key, 1, StockEventType::StockInitialized, dec!(100), dec!(100)),
            event(key, 2, StockEventType::StockIncreased, dec!(50), dec!(150)),
            event(key, 3, StockEventType::StockReserved, dec!(20), dec!(150)),
            event(key, 4, StockEventType::StockDecreased, dec!(30), dec!(120)),
        ];

        let state = replay_from_snapshot(None, &events).unwrap();

        assert_eq!(state.quantity, dec!(120));
        assert_eq!(state.reserved_quantity, dec!(20));
        assert_eq!(state.available_quantity(), dec!(100));
        assert_eq!(state.last_sequence, 4);
        assert_eq!(state.event_count, 4);
    }

    #[test]
    fn corrective_events_set_balance_and_ignore_quantity() {
        let key = test_key();
        let events = vec![
            event(key, 1, StockEventType::StockInitialized, dec!(100), dec!(100)),
            // quantity is deliberately nonsense; balance_after wins.
            event(key, 2, StockEventType::StockAdjusted, dec!(9999), dec!(42)),
            event(key, 3, StockEventType::StockCounted, dec!(-1), dec!(40)),
            event(key, 4, StockEventType::StockCorrected, dec!(0), dec!(41)),
        ];

        let state = replay_from_snapshot(None, &events).unwrap();
        assert_eq!(state.quantity, dec!(41));
    }

    #[test]
    fn empty_history_without_snapshot_is_zero_state() {
        let state = replay_from_snapshot(None, &[]).unwrap();
        assert_eq!(state, StockStateProjection::default());
        assert_eq!(state.available_quantity(), Decimal::ZERO);
    }

    #[test]
    fn snapshot_seed_skips_covered_events() {
        let key = test_key();
        let events = vec![
            event(key, 1, StockEventType::StockInitialized, dec!(10), dec!(10)),
            event(key, 2, StockEventType::StockIncreased, dec!(5), dec!(15)),
            event(key, 3, StockEventType::StockIncreased, dec!(5), dec!(20)),
        ];

        let full = replay_from_snapshot(None, &events).unwrap();
        let snapshot = StockSnapshot::capture(
            key,
            &replay_from_snapshot(None, &events[..2]).unwrap(),
            Utc::now(),
        );

        // Pass the full overlapping slice; events 1-2 must be skipped.
        let seeded = replay_from_snapshot(Some(&snapshot), &events).unwrap();

        assert_eq!(seeded.quantity, full.quantity);
        assert_eq!(seeded.reserved_quantity, full.reserved_quantity);
        assert_eq!(seeded.last_sequence, full.last_sequence);
        assert_eq!(seeded.event_count, 1);
    }

    #[test]
    fn gap_in_sequence_fails_loudly() {
        let key = test_key();
        let events = vec![
            event(key, 1, StockEventType::StockInitialized, dec!(10), dec!(10)),
            event(key, 3, StockEventType::StockIncreased, dec!(5), dec!(15)),
        ];

        let err = replay_from_snapshot(None, &events).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn duplicate_sequence_in_tail_fails_loudly() {
        let key = test_key();
        let events = vec![
            event(key, 1, StockEventType::StockInitialized, dec!(10), dec!(10)),
            event(key, 2, StockEventType::StockIncreased, dec!(5), dec!(15)),
            event(key, 2, StockEventType::StockIncreased, dec!(5), dec!(20)),
        ];

        let err = replay_from_snapshot(None, &events).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn stream_not_starting_at_one_fails_without_snapshot() {
        let key = test_key();
        let events = vec![event(
            key,
            5,
            StockEventType::StockIncreased,
            dec!(5),
            dec!(5),
        )];

        let err = replay_from_snapshot(None, &events).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    /// Generator for arbitrary-but-contiguous event histories.
    fn arb_history() -> impl Strategy<Value = Vec<StockEvent>> {
        let arb_type = prop::sample::select(vec![
            StockEventType::StockInitialized,
            StockEventType::StockIncreased,
            StockEventType::StockDecreased,
            StockEventType::StockReserved,
            StockEventType::StockReservationReleased,
            StockEventType::StockTransferOut,
            StockEventType::StockTransferIn,
            StockEventType::StockAdjusted,
            StockEventType::StockCounted,
            StockEventType::StockCorrected,
        ]);

        prop::collection::vec((arb_type, 0i64..10_000, 0i64..10_000), 1..60).prop_map(|entries| {
            let key = test_key();
            entries
                .into_iter()
                .enumerate()
                .map(|(i, (event_type, quantity, balance))| {
                    event(
                        key,
                        (i + 1) as u64,
                        event_type,
                        Decimal::from(quantity),
                        Decimal::from(balance),
                    )
                })
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: replaying the same inputs twice yields identical
        /// projections.
        #[test]
        fn replay_is_deterministic(events in arb_history()) {
            let a = replay_from_snapshot(None, &events).unwrap();
            let b = replay_from_snapshot(None, &events).unwrap();
            prop_assert_eq!(a, b);
        }

        /// Property: snapshotting at any index k and replaying the tail from
        /// the snapshot equals a full replay.
        #[test]
        fn snapshot_at_any_index_is_equivalent_to_full_replay(
            events in arb_history(),
            split in 0usize..60,
        ) {
            let k = split.min(events.len());
            let full = replay_from_snapshot(None, &events).unwrap();

            let head = replay_from_snapshot(None, &events[..k]).unwrap();
            let snapshot = StockSnapshot::capture(events[0].key(), &head, Utc::now());
            let seeded = replay_from_snapshot(Some(&snapshot), &events[k..]).unwrap();

            prop_assert_eq!(seeded.quantity, full.quantity);
            prop_assert_eq!(seeded.reserved_quantity, full.reserved_quantity);
            prop_assert_eq!(seeded.last_sequence, full.last_sequence);
        }

        /// Property: replaying E1 ++ E2 equals replaying E1, snapshotting,
        /// then replaying E2 on top.
        #[test]
        fn replay_is_additive_across_a_checkpoint(
            events in arb_history(),
            split in 0usize..60,
        ) {
            let k = split.min(events.len());
            let (e1, e2) = events.split_at(k);

            let whole = replay_from_snapshot(None, &events).unwrap();

            let first = replay_from_snapshot(None, e1).unwrap();
            let checkpoint = StockSnapshot::capture(events[0].key(), &first, Utc::now());
            let resumed = replay_from_snapshot(Some(&checkpoint), e2).unwrap();

            prop_assert_eq!(resumed.quantity, whole.quantity);
            prop_assert_eq!(resumed.reserved_quantity, whole.reserved_quantity);
            prop_assert_eq!(resumed.last_sequence, whole.last_sequence);
        }

        /// Property: available quantity is always on-hand minus reserved.
        #[test]
        fn available_is_quantity_minus_reserved(events in arb_history()) {
            let state = replay_from_snapshot(None, &events).unwrap();
            prop_assert_eq!(
                state.available_quantity(),
                state.quantity - state.reserved_quantity
            );
        }
    }
}
