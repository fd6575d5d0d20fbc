//! Property-based tests for movement plausibility and trust scoring.
//!
//! These tests use proptest to verify invariants hold for all inputs:
//! - Movement checks never accept a non-advancing clock
//! - Anything within both limits is accepted, anything over either is not
//! - Trust scores stay within [0, 1] whatever is observed
//! - Frame decoding never panics on arbitrary bytes

use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use vanet_common::{ManualClock, Timestamp, VehicleId};
use vanet_routing::kinematics::MS_TO_KMH;
use vanet_routing::protocol::decode_message;
use vanet_routing::services::TrustTable;
use vanet_routing::{
    check_movement, is_valid_movement, KinematicLimits, MemoryTransport, MovementVerdict, Position,
    ProtocolConfig, SecureRoutingEngine, VehicleInfo,
};

const T0: u64 = 1_700_000_000_000;

fn at(x: f64, y: f64, ms: u64) -> Position {
    Position::new(x, y, 0.0, Timestamp::from_millis(ms))
}

// Strategy for coordinates within a city-sized area
fn coordinate_strategy() -> impl Strategy<Value = f64> {
    -10_000.0f64..10_000.0
}

// Strategy for sampling intervals (1 ms to 60 s)
fn interval_strategy() -> impl Strategy<Value = u64> {
    1u64..=60_000
}

// Strategy for observations, including out-of-range and NaN
fn observation_strategy() -> impl Strategy<Value = f64> {
    prop_oneof![
        0.0f64..=1.0,
        -5.0f64..5.0,
        Just(f64::NAN),
        Just(f64::INFINITY),
    ]
}

#[test]
fn prop_non_advancing_clock_is_rejected() {
    proptest!(|(x1 in coordinate_strategy(), x2 in coordinate_strategy(), back in 0u64..=10_000)| {
        let limits = KinematicLimits::default();
        let old = at(x1, 0.0, T0);
        let new = at(x2, 0.0, T0 - back);

        prop_assert!(matches!(
            check_movement(&old, &new, &limits),
            MovementVerdict::NonPositiveInterval { .. }
        ), "expected NonPositiveInterval verdict");
    });
}

#[test]
fn prop_verdict_matches_limits() {
    proptest!(|(
        x in coordinate_strategy(),
        y in coordinate_strategy(),
        dx in -500.0f64..500.0,
        dy in -500.0f64..500.0,
        interval in interval_strategy()
    )| {
        let limits = KinematicLimits::default();
        let old = at(x, y, T0);
        let new = at(x + dx, y + dy, T0 + interval);

        let seconds = interval as f64 / 1000.0;
        let speed = old.distance_to(&new) / seconds;
        let expected = speed * MS_TO_KMH <= limits.max_speed_kmh
            && speed / seconds <= limits.max_acceleration;

        prop_assert_eq!(is_valid_movement(&old, &new, &limits), expected);
    });
}

#[test]
fn prop_standing_still_is_always_valid() {
    proptest!(|(x in coordinate_strategy(), y in coordinate_strategy(), interval in interval_strategy())| {
        let limits = KinematicLimits::default();
        prop_assert!(is_valid_movement(&at(x, y, T0), &at(x, y, T0 + interval), &limits));
    });
}

#[test]
fn prop_trust_stays_in_unit_interval() {
    proptest!(|(
        alpha in 0.01f64..=1.0,
        observations in prop::collection::vec(observation_strategy(), 1..50)
    )| {
        let mut table = TrustTable::new(alpha);
        let id = VehicleId::new("veh-p").unwrap();

        for observed in observations {
            let score = table.update(&id, observed);
            prop_assert!((0.0..=1.0).contains(&score), "score {} escaped [0, 1]", score);
        }
    });
}

#[test]
fn prop_decode_never_panics() {
    proptest!(|(bytes in prop::collection::vec(any::<u8>(), 0..256))| {
        let _ = decode_message(&bytes);
    });
}

#[test]
fn prop_engine_rejects_arbitrary_bytes() {
    proptest!(ProptestConfig::with_cases(32), |(bytes in prop::collection::vec(any::<u8>(), 0..512))| {
        let clock = Arc::new(ManualClock::new(Timestamp::from_millis(T0)));
        let id = VehicleId::new("veh-fuzz").unwrap();
        let mut engine = SecureRoutingEngine::new(
            id.clone(),
            ProtocolConfig::default(),
            clock.clone(),
            Box::new(MemoryTransport::new()),
        )
        .unwrap();
        engine
            .initialize_vehicle(VehicleInfo::new(id, at(0.0, 0.0, T0)))
            .unwrap();

        prop_assert!(engine.receive_message(&bytes).is_err());
        prop_assert_eq!(engine.stats().received, 0);

        clock.advance(Duration::from_secs(1));
        prop_assert!(engine.routes().next().is_none());
    });
}
