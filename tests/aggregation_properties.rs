//! Property tests for the aggregation engine
//!
//! These tests verify invariants that must hold for any price history:
//! extraction length, zero-open sanitization, bucketing under splits and
//! order independence of the cross-sectional average.

use std::collections::BTreeMap;

use approx::assert_relative_eq;
use proptest::prelude::*;
use seasonality_core::analytics::{average, bucket_all, extract, percent_change};
use seasonality_core::{
    BucketScheme, BucketVector, CrossSectionalAggregator, DivisorPolicy, PriceHistory,
    PriceRecord, Symbol,
};
use time::macros::date;
use time::Duration;

fn open_strategy() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![
        1 => Just(None),
        1 => Just(Some(0.0)),
        8 => (0.5f64..500.0).prop_map(Some),
    ]
}

fn history_strategy() -> impl Strategy<Value = PriceHistory> {
    prop::collection::btree_map(0i64..4_000, (open_strategy(), 0.0f64..500.0), 1..120).prop_map(
        |sessions: BTreeMap<i64, (Option<f64>, f64)>| {
            let base = date!(2012 - 01 - 02);
            let records = sessions
                .into_iter()
                .map(|(offset, (open, close))| {
                    PriceRecord::new(base + Duration::days(offset), open, close).expect("record")
                })
                .collect();
            PriceHistory::new(Symbol::parse("PROP").expect("symbol"), records)
                .expect("ordered history")
        },
    )
}

fn assert_slots_close(left: &BucketVector, right: &BucketVector) {
    assert_eq!(left.scheme(), right.scheme());
    for (a, b) in left.slots().iter().zip(right.slots()) {
        assert_relative_eq!(*a, *b, epsilon = 1e-6, max_relative = 1e-9);
    }
}

proptest! {
    #[test]
    fn extraction_preserves_length_and_order(history in history_strategy()) {
        let series = extract(&history);

        prop_assert_eq!(series.len(), history.len());
        for (change, record) in series.iter().zip(history.records()) {
            prop_assert_eq!(change.date, record.date);
            prop_assert!(change.value.is_finite());
        }
    }

    #[test]
    fn zero_open_yields_zero_change_for_any_close(close in -1.0e6f64..1.0e6) {
        prop_assert_eq!(percent_change(Some(0.0), close), None);
        prop_assert_eq!(percent_change(None, close), None);

        let record = PriceRecord::new(date!(2024 - 01 - 02), Some(0.0), close).expect("record");
        let history = PriceHistory::new(Symbol::parse("ZERO").expect("symbol"), vec![record])
            .expect("single record");
        let series = extract(&history);
        prop_assert_eq!(series.changes[0].value, 0.0);
        prop_assert_eq!(series.sanitized, 1);
    }

    #[test]
    fn bucketing_is_additive_under_any_split(history in history_strategy(), split in 0usize..150) {
        let (head, tail) = history.split_at(split);
        let whole = bucket_all(&extract(&history));
        let head = bucket_all(&extract(&head));
        let tail = bucket_all(&extract(&tail));

        for scheme in BucketScheme::ALL {
            let mut combined = tail.get(scheme).clone();
            combined.try_add(head.get(scheme)).expect("same scheme");
            assert_slots_close(&combined, whole.get(scheme));
        }
        prop_assert_eq!(head.dropped_records + tail.dropped_records, whole.dropped_records);
    }

    #[test]
    fn bucketing_is_deterministic(history in history_strategy()) {
        let series = extract(&history);
        prop_assert_eq!(bucket_all(&series), bucket_all(&series));
    }

    #[test]
    fn every_trading_day_maps_inside_its_scheme(offset in 0i64..20_000) {
        let day = date!(1990 - 01 - 01) + Duration::days(offset);
        for scheme in BucketScheme::ALL {
            match scheme.slot_index(day) {
                Some(index) => {
                    prop_assert!(index < scheme.slot_count());
                }
                None => {
                    prop_assert!(scheme == BucketScheme::Day);
                    prop_assert_eq!(day.weekday(), time::Weekday::Sunday);
                }
            }
        }
    }

    #[test]
    fn average_does_not_depend_on_instrument_order(
        histories in prop::collection::vec(history_strategy(), 1..6)
    ) {
        let symbols: Vec<Symbol> = (0..histories.len())
            .map(|index| Symbol::parse(&format!("S{index}")).expect("symbol"))
            .collect();
        let buckets: Vec<_> = histories.iter().map(|h| bucket_all(&extract(h))).collect();

        for scheme in BucketScheme::ALL {
            let forward = average(
                scheme,
                symbols.iter().zip(buckets.iter().map(|b| b.get(scheme))),
                DivisorPolicy::TotalConsidered,
            )
            .expect("non-empty universe");
            let backward = average(
                scheme,
                symbols.iter().rev().zip(buckets.iter().rev().map(|b| b.get(scheme))),
                DivisorPolicy::TotalConsidered,
            )
            .expect("non-empty universe");
            assert_slots_close(&forward, &backward);
        }
    }
}

#[test]
fn month_average_with_one_nan_vector_divides_by_every_instrument() {
    // Given: Month vectors [12,..], [6,..] and [NaN,..]
    let month = |first: f64| {
        let mut slots = vec![0.0; 12];
        slots[0] = first;
        BucketVector::from_slots(BucketScheme::Month, slots).expect("month length")
    };
    let vectors = [month(12.0), month(6.0), month(f64::NAN)];
    let symbols = ["AAA", "BBB", "CCC"].map(|raw| Symbol::parse(raw).expect("symbol"));

    // When: They are averaged with the default divisor
    let mut aggregator = CrossSectionalAggregator::new(BucketScheme::Month);
    for (symbol, vector) in symbols.iter().zip(&vectors) {
        aggregator.include(symbol, vector).expect("same scheme");
    }
    let result = aggregator
        .finish(DivisorPolicy::default())
        .expect("non-empty universe");

    // Then: (12 + 6) / 3 = 6
    assert_eq!(result.slots()[0], 6.0);
    assert!(result.slots()[1..].iter().all(|value| *value == 0.0));
}

#[test]
fn day_vectors_average_slot_wise() {
    let a = BucketVector::from_slots(BucketScheme::Day, vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0])
        .expect("day length");
    let b = BucketVector::from_slots(BucketScheme::Day, vec![3.0, 0.0, 0.0, 0.0, 0.0, 0.0])
        .expect("day length");
    let symbols = ["AAA", "BBB"].map(|raw| Symbol::parse(raw).expect("symbol"));

    let result = average(
        BucketScheme::Day,
        symbols.iter().zip([&a, &b]),
        DivisorPolicy::TotalConsidered,
    )
    .expect("non-empty universe");

    assert_eq!(result.slots(), &[2.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
}
