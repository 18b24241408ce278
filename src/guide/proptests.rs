//! Property-based tests for the guide state machine

use super::selection::{toggle_multi, MultiSelectState, SelectionError};
use super::sequencer::StepSequencer;
use super::state::{GuideContext, GuideSession};
use super::transition::transition;
use super::turn::{ChoiceOption, TurnId};
use super::Event;
use proptest::prelude::*;
use std::sync::Arc;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context() -> GuideContext {
    GuideContext::new("prop-session", Arc::new(StepSequencer::blueprint()))
}

const OPTION_IDS: [&str; 8] = [
    "lamp", "nginx", "custom", "web", "db", "cache", "monitoring", "missing",
];

fn deck(max: usize) -> MultiSelectState {
    let options = ["web", "db", "cache", "queue", "search", "monitoring"]
        .iter()
        .map(|id| ChoiceOption::new(*id, id.to_uppercase(), "component"))
        .collect();
    MultiSelectState::new(options, max)
}

fn is_valid(state: &GuideSession, ctx: &GuideContext) -> bool {
    let terminal = ctx.sequencer.terminal_index();
    let turns = state.turns.turns();
    let ids_increase = turns.windows(2).all(|pair| pair[0].id < pair[1].id);
    let decks_bounded = turns.iter().filter_map(|t| t.multi_select.as_ref()).all(|d| {
        d.selected().len() <= d.max_selections()
            && d.selected()
                .iter()
                .all(|id| d.options().iter().any(|o| &o.id == id))
    });
    let completion_matches = state.complete == (state.step_index == terminal);
    let prompt_present = state.complete || state.active_prompt().is_some();

    state.step_index <= terminal
        && ids_increase
        && decks_bounded
        && completion_matches
        && prompt_present
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_turn_id() -> impl Strategy<Value = TurnId> {
    1u64..40
}

fn arb_option_id() -> impl Strategy<Value = String> {
    proptest::sample::select(OPTION_IDS.to_vec()).prop_map(String::from)
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        "[a-z ,]{0,30}".prop_map(|raw| Event::UserText { raw }),
        (arb_turn_id(), arb_option_id())
            .prop_map(|(turn_id, option_id)| Event::PickOption { turn_id, option_id }),
        (arb_turn_id(), arb_option_id())
            .prop_map(|(turn_id, option_id)| Event::ToggleOption { turn_id, option_id }),
        arb_turn_id().prop_map(|turn_id| Event::ConfirmSelection { turn_id }),
        Just(Event::GoBack),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Invariant 1: every reachable state is consistent
    #[test]
    fn prop_transitions_preserve_validity(events in proptest::collection::vec(arb_event(), 0..40)) {
        let ctx = test_context();
        let mut state = GuideSession::start(&ctx.sequencer, None);

        for event in events {
            if let Ok(result) = transition(&state, &ctx, event) {
                state = result.new_state;
                prop_assert!(is_valid(&state, &ctx), "Invalid state: {:?}", state);
            }
        }
    }

    // Invariant 2: an accepted event moves the step by at most one
    #[test]
    fn prop_step_only_moves_by_one(events in proptest::collection::vec(arb_event(), 0..40)) {
        let ctx = test_context();
        let mut state = GuideSession::start(&ctx.sequencer, None);

        for event in events {
            let before = state.step_index;
            let is_back = matches!(event, Event::GoBack);
            if let Ok(result) = transition(&state, &ctx, event) {
                let after = result.new_state.step_index;
                if is_back {
                    prop_assert!(after == before || after + 1 == before);
                } else {
                    prop_assert!(after == before || after == before + 1);
                }
                state = result.new_state;
            }
        }
    }

    // Invariant 3: back-navigation drops exactly the last user turn and what follows
    #[test]
    fn prop_back_truncates_at_last_user(answers in proptest::collection::vec("[a-z]{1,10}", 1..8)) {
        let ctx = test_context();
        let mut state = GuideSession::start(&ctx.sequencer, None);
        for answer in answers {
            if let Ok(result) = transition(&state, &ctx, Event::UserText { raw: answer }) {
                state = result.new_state;
            }
        }

        let turns = state.turns.turns();
        let cut = turns.iter().rposition(|t| t.is_user());
        let result = transition(&state, &ctx, Event::GoBack).unwrap().new_state;

        match cut {
            Some(index) if state.step_index > 0 => {
                prop_assert_eq!(result.step_index, state.step_index - 1);
                prop_assert_eq!(result.turns.len(), index);
                prop_assert!(!result.complete);
            }
            _ => {
                prop_assert_eq!(result.step_index, state.step_index);
                prop_assert_eq!(result.turns.len(), state.turns.len());
            }
        }
    }

    // Invariant 4: removing is always allowed; adding at the cap never changes the deck
    #[test]
    fn prop_toggle_respects_cap(
        max in 1usize..6,
        toggles in proptest::collection::vec(0usize..6, 0..30),
    ) {
        let mut state = deck(max);
        let ids: Vec<String> = state.options().iter().map(|o| o.id.clone()).collect();

        for index in toggles {
            let id = &ids[index];
            let before = state.selected().clone();
            match toggle_multi(&mut state, id) {
                Ok(_) if before.contains(id) => prop_assert!(!state.is_selected(id)),
                Ok(_) => prop_assert!(state.is_selected(id)),
                Err(SelectionError::SelectionCapReached { .. }) => {
                    prop_assert_eq!(before.len(), max);
                    prop_assert_eq!(state.selected(), &before);
                }
                Err(e) => prop_assert!(false, "unexpected error {:?}", e),
            }
            prop_assert!(state.selected().len() <= max);
        }
    }
}
