//! Property-based tests for the debounce gate.
//!
//! - A different code is always accepted
//! - A repeated code is accepted only once the cooldown has elapsed
//! - Accepted repeats of one code are spaced by more than the cooldown
//! - Recorded times never move backwards

#![allow(clippy::expect_used, clippy::unwrap_used)]

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use proptest::prelude::*;
use scangate::pipeline::{DebounceGate, DebounceState};

fn at(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(1_700_000_000_000 + millis).unwrap()
}

proptest! {
    /// Property: a code other than the last accepted one passes at any time.
    #[test]
    fn prop_different_code_always_accepted(
        last in "[A-Z0-9]{1,8}",
        other in "[a-z]{1,8}",
        recorded_ms in 0i64..100_000,
        offset_ms in 0i64..100_000,
        cooldown_ms in 1i64..10_000,
    ) {
        let mut state = DebounceState::new(TimeDelta::milliseconds(cooldown_ms));
        state.record(&last, at(recorded_ms));
        prop_assert!(DebounceGate::accept(&other, at(recorded_ms + offset_ms), &state));
    }

    /// Property: the same code passes iff strictly more than the cooldown elapsed.
    #[test]
    fn prop_same_code_waits_for_cooldown(
        code in "[A-Z0-9]{1,8}",
        recorded_ms in 0i64..100_000,
        offset_ms in 0i64..20_000,
        cooldown_ms in 1i64..10_000,
    ) {
        let mut state = DebounceState::new(TimeDelta::milliseconds(cooldown_ms));
        state.record(&code, at(recorded_ms));
        let accepted = DebounceGate::accept(&code, at(recorded_ms + offset_ms), &state);
        prop_assert_eq!(accepted, offset_ms > cooldown_ms);
    }

    /// Property: over any frame stream, accepted repeats are spaced by more than the cooldown.
    #[test]
    fn prop_accepted_repeats_are_spaced(
        frames in prop::collection::vec((prop::sample::select(vec!["A1", "B2"]), 0i64..700), 1..60),
        cooldown_ms in 100i64..3_000,
    ) {
        let mut state = DebounceState::new(TimeDelta::milliseconds(cooldown_ms));
        let mut clock = 0i64;
        let mut accepted: Vec<(&str, DateTime<Utc>)> = Vec::new();
        for (code, gap) in frames {
            clock += gap;
            let now = state.monotonic(at(clock));
            if DebounceGate::accept(code, now, &state) {
                state.record(code, now);
                accepted.push((code, now));
            }
        }
        for pair in accepted.windows(2) {
            let (previous, current) = (pair[0], pair[1]);
            if previous.0 == current.0 {
                prop_assert!(current.1 - previous.1 > TimeDelta::milliseconds(cooldown_ms));
            }
        }
    }

    /// Property: recording an older timestamp never rewinds the state.
    #[test]
    fn prop_recorded_time_is_monotonic(
        first_ms in 0i64..100_000,
        second_ms in 0i64..100_000,
    ) {
        let mut state = DebounceState::new(TimeDelta::seconds(2));
        state.record("A1", at(first_ms));
        state.record("B2", at(second_ms));
        prop_assert_eq!(state.last_time(), Some(at(first_ms.max(second_ms))));
    }
}
