//! Property-based tests for the gate state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::*;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        "[ \t\n]{1,4}",
        "[a-zA-Z0-9 ]{1,30}",
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        arb_text().prop_map(|text| Event::Submit { text }),
        Just(Event::AppendSucceeded),
        Just(Event::AppendFailed),
        Just(Event::AppendAbandoned),
    ]
}

fn arb_state() -> impl Strategy<Value = GateState> {
    prop_oneof![Just(GateState::Idle), Just(GateState::Busy)]
}

fn is_completion(event: &Event) -> bool {
    matches!(
        event,
        Event::AppendSucceeded | Event::AppendFailed | Event::AppendAbandoned
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    // Every state change is published, and only state changes are published
    #[test]
    fn prop_publish_matches_state_change(
        state in arb_state(),
        event in arb_event(),
    ) {
        match transition(state, event) {
            Ok(result) => {
                let published: Vec<_> = result
                    .effects
                    .iter()
                    .filter_map(|e| match e {
                        Effect::Publish(t) => Some(*t),
                        Effect::AppendTurn { .. } => None,
                    })
                    .collect();
                prop_assert_ne!(state, result.new_state);
                prop_assert_eq!(published.len(), 1);
                prop_assert_eq!(published[0].target(), result.new_state);
            }
            Err(_) => { /* Rejected events change nothing */ }
        }
    }

    // A submit while busy never produces a service call
    #[test]
    fn prop_busy_never_appends(text in arb_text()) {
        let result = transition(GateState::Busy, Event::Submit { text });
        prop_assert!(result.is_err());
    }

    // Blank text never reaches the service, whatever the state
    #[test]
    fn prop_blank_never_appends(state in arb_state(), text in "[ \t\n]{0,6}") {
        prop_assert_eq!(
            transition(state, Event::Submit { text }).unwrap_err(),
            TransitionError::EmptyInput
        );
    }

    // Any completion event from busy lands in idle (no stuck state)
    #[test]
    fn prop_completion_always_releases(event in arb_event()) {
        prop_assume!(is_completion(&event));
        let result = transition(GateState::Busy, event).unwrap();
        prop_assert_eq!(result.new_state, GateState::Idle);
    }

    // Driving the machine like the runtime does: at most one append in
    // flight, and each accepted submit is paired with exactly one release.
    #[test]
    fn prop_appends_never_overlap(events in proptest::collection::vec(arb_event(), 0..40)) {
        let mut state = GateState::Idle;
        let mut in_flight = 0u32;
        let mut accepted = 0u32;
        let mut released = 0u32;

        for event in events {
            if let Ok(result) = transition(state, event) {
                for effect in &result.effects {
                    match effect {
                        Effect::AppendTurn { .. } => {
                            in_flight += 1;
                            accepted += 1;
                        }
                        Effect::Publish(GateTransition::BecameIdle { .. }) => {
                            in_flight -= 1;
                            released += 1;
                        }
                        Effect::Publish(GateTransition::BecameBusy) => {}
                    }
                }
                prop_assert!(in_flight <= 1);
                prop_assert_eq!(in_flight == 1, result.new_state.is_busy());
                state = result.new_state;
            }
        }

        prop_assert!(accepted - released <= 1);
    }
}
