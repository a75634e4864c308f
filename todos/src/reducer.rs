//! Reducer logic for the todo list.
//!
//! Commands are validated, turned into events, and the events are applied
//! to state. No todo command produces side effects.

use crate::error::TodoError;
use crate::types::{SEED_TODO_ID, TodoAction, TodoId, TodoItem, TodoState};
use rand::Rng;
use std::sync::Arc;
use todo_store_core::{
    SmallVec,
    effect::Effect,
    environment::{IdGenerator, SequentialIdGenerator},
    reducer::Reducer,
};

/// Exclusive upper bound of ids drawn by [`RandomIdGenerator`]
pub const RANDOM_ID_BOUND: u64 = 1_000_000_000;

/// Draws from the generator before falling back to a free id from the list
const MAX_ID_ATTEMPTS: usize = 16;

/// Id generator drawing uniformly from `[0, RANDOM_ID_BOUND)`
///
/// Not cryptographically random. Collisions with existing items are
/// resolved by the reducer, not here.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn next_id(&self) -> u64 {
        rand::thread_rng().gen_range(0..RANDOM_ID_BOUND)
    }
}

/// Environment dependencies for the todo reducer
#[derive(Clone)]
pub struct TodoEnvironment {
    /// Source of ids for new todos
    pub ids: Arc<dyn IdGenerator>,
}

impl TodoEnvironment {
    /// Creates a new `TodoEnvironment`
    #[must_use]
    pub fn new(ids: Arc<dyn IdGenerator>) -> Self {
        Self { ids }
    }

    /// Environment handing out random ids below [`RANDOM_ID_BOUND`]
    #[must_use]
    pub fn with_random_ids() -> Self {
        Self::new(Arc::new(RandomIdGenerator))
    }
}

impl Default for TodoEnvironment {
    /// Sequential ids, starting right after the seed item
    fn default() -> Self {
        Self::new(Arc::new(SequentialIdGenerator::starting_at(
            SEED_TODO_ID.value() + 1,
        )))
    }
}

impl std::fmt::Debug for TodoEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TodoEnvironment").finish_non_exhaustive()
    }
}

/// Reducer for the todo list
#[derive(Clone, Debug)]
pub struct TodoReducer;

impl TodoReducer {
    /// Creates a new `TodoReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Picks an id no current todo uses
    fn fresh_id(state: &TodoState, env: &TodoEnvironment) -> TodoId {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = TodoId::new(env.ids.next_id());
            if !state.exists(id) {
                return id;
            }
            tracing::debug!(%id, "Generated id already in use, drawing again");
        }

        let id = match state.max_id() {
            None => SEED_TODO_ID,
            Some(max) => max
                .value()
                .checked_add(1)
                .map_or_else(|| Self::smallest_unused_id(state), TodoId::new),
        };
        tracing::warn!(%id, "Id generator kept colliding, using a free id from the list");
        id
    }

    /// Smallest id no current todo uses
    ///
    /// The list holds fewer than `u64::MAX` items, so a gap always exists.
    fn smallest_unused_id(state: &TodoState) -> TodoId {
        let mut used: Vec<u64> = state.todos.iter().map(|t| t.id.value()).collect();
        used.sort_unstable();
        used.dedup();

        let mut candidate = 0;
        for id in used {
            if id != candidate {
                break;
            }
            candidate += 1;
        }
        TodoId::new(candidate)
    }

    /// Returns why a replayed `TodoAdded` cannot be applied, if it cannot
    fn reject_added(state: &TodoState, id: TodoId, text: &str) -> Option<&'static str> {
        if text.trim().is_empty() {
            Some("empty text")
        } else if state.exists(id) {
            Some("id already in use")
        } else {
            None
        }
    }

    /// Applies an event to state
    fn apply_event(state: &mut TodoState, action: &TodoAction) {
        match action {
            TodoAction::TodoAdded { id, text } => {
                state.todos.push(TodoItem::new(*id, text.clone()));
            },
            TodoAction::TodoToggled { id, is_finished } => {
                if let Some(todo) = state.todos.iter_mut().find(|t| t.id == *id) {
                    todo.is_finished = *is_finished;
                }
            },
            TodoAction::FilterUpdated { filter } => {
                state.filter = *filter;
            },
            // Commands are not applied to state
            TodoAction::AddTodo { .. }
            | TodoAction::ToggleTodo { .. }
            | TodoAction::UpdateFilter { .. } => {},
        }
    }
}

impl Default for TodoReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl Reducer for TodoReducer {
    type State = TodoState;
    type Action = TodoAction;
    type Environment = TodoEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Commands ==========
            TodoAction::AddTodo { text } => {
                if text.trim().is_empty() {
                    tracing::debug!("Ignoring todo with empty text");
                    return SmallVec::new();
                }

                let event = TodoAction::TodoAdded {
                    id: Self::fresh_id(state, env),
                    text,
                };
                Self::apply_event(state, &event);
            },

            TodoAction::ToggleTodo { id } => {
                let Some(todo) = state.get(id) else {
                    // Missing ids leave the list untouched
                    let error = TodoError::NotFound(id);
                    tracing::warn!(%error, "Ignoring toggle");
                    return SmallVec::new();
                };

                let event = TodoAction::TodoToggled {
                    id,
                    is_finished: !todo.is_finished,
                };
                Self::apply_event(state, &event);
            },

            TodoAction::UpdateFilter { filter } => {
                Self::apply_event(state, &TodoAction::FilterUpdated { filter });
            },

            // ========== Events ==========
            TodoAction::TodoAdded { id, ref text } => {
                if let Some(reason) = Self::reject_added(state, id, text) {
                    tracing::warn!(%id, reason, "Ignoring replayed TodoAdded");
                    return SmallVec::new();
                }
                Self::apply_event(state, &action);
            },

            TodoAction::TodoToggled { .. } | TodoAction::FilterUpdated { .. } => {
                Self::apply_event(state, &action);
            },
        }

        SmallVec::new()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::types::Filter;
    use proptest::prelude::*;
    use todo_store_testing::{ReducerTest, ScriptedIdGenerator, assertions};

    fn create_test_env() -> TodoEnvironment {
        TodoEnvironment::default()
    }

    fn two_unfinished() -> TodoState {
        TodoState {
            todos: vec![
                TodoItem::new(TodoId::new(1), "clean room".to_string()),
                TodoItem::new(TodoId::new(2), "buy milk".to_string()),
            ],
            filter: Filter::All,
        }
    }

    #[test]
    fn test_add_todo_appends() {
        ReducerTest::new(TodoReducer::new())
            .with_env(create_test_env())
            .given_state(TodoState::new())
            .when_action(TodoAction::AddTodo {
                text: "buy milk".to_string(),
            })
            .then_state(|state| {
                assert_eq!(state.count(), 2);
                let todo = state.todos.last().unwrap();
                assert_eq!(todo.text, "buy milk");
                assert!(!todo.is_finished);
                assert_eq!(todo.id, TodoId::new(2));
                assert!(todo.id.value() < RANDOM_ID_BOUND);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_add_todo_keeps_text_as_given() {
        ReducerTest::new(TodoReducer::new())
            .with_env(create_test_env())
            .given_state(TodoState::empty())
            .when_action(TodoAction::AddTodo {
                text: "  padded  ".to_string(),
            })
            .then_state(|state| {
                assert_eq!(state.todos[0].text, "  padded  ");
            })
            .run();
    }

    #[test]
    fn test_add_todo_empty_text_is_ignored() {
        for text in ["", "   "] {
            ReducerTest::new(TodoReducer::new())
                .with_env(create_test_env())
                .given_state(TodoState::new())
                .when_action(TodoAction::AddTodo {
                    text: text.to_string(),
                })
                .then_state(|state| {
                    assert_eq!(*state, TodoState::new());
                })
                .then_effects(assertions::assert_no_effects)
                .run();
        }
    }

    #[test]
    fn test_add_todo_absent_text_is_ignored() {
        ReducerTest::new(TodoReducer::new())
            .with_env(create_test_env())
            .given_state(TodoState::new())
            .when_action(TodoAction::add_todo(None::<&str>))
            .then_state(|state| {
                assert_eq!(*state, TodoState::new());
            })
            .run();
    }

    #[test]
    fn test_add_todo_skips_colliding_ids() {
        let ids = Arc::new(ScriptedIdGenerator::new([1, 2, 1, 5]));
        let env = TodoEnvironment::new(ids.clone());

        ReducerTest::new(TodoReducer::new())
            .with_env(env)
            .given_state(TodoState::new())
            .when_action(TodoAction::AddTodo {
                text: "second".to_string(),
            })
            .when_action(TodoAction::AddTodo {
                text: "third".to_string(),
            })
            .then_state(|state| {
                let ids: Vec<u64> = state.todos.iter().map(|t| t.id.value()).collect();
                assert_eq!(ids, vec![1, 2, 5]);
            })
            .run();

        assert_eq!(ids.calls(), 4);
    }

    #[test]
    fn test_add_todo_falls_back_after_repeated_collisions() {
        let env = TodoEnvironment::new(Arc::new(ScriptedIdGenerator::new(
            [1; MAX_ID_ATTEMPTS],
        )));

        ReducerTest::new(TodoReducer::new())
            .with_env(env)
            .given_state(two_unfinished())
            .when_action(TodoAction::AddTodo {
                text: "third".to_string(),
            })
            .then_state(|state| {
                assert_eq!(state.todos[2].id, TodoId::new(3));
            })
            .run();
    }

    #[test]
    fn test_add_todo_fallback_skips_used_max_id() {
        let env = TodoEnvironment::new(Arc::new(ScriptedIdGenerator::new(
            [u64::MAX; MAX_ID_ATTEMPTS],
        )));

        ReducerTest::new(TodoReducer::new())
            .with_env(env)
            .given_state(TodoState {
                todos: vec![
                    TodoItem::new(TodoId::new(0), "zero".to_string()),
                    TodoItem::new(TodoId::new(u64::MAX), "max".to_string()),
                ],
                filter: Filter::All,
            })
            .when_action(TodoAction::AddTodo {
                text: "y".to_string(),
            })
            .then_state(|state| {
                let ids: Vec<u64> = state.todos.iter().map(|t| t.id.value()).collect();
                assert_eq!(ids, vec![0, u64::MAX, 1]);
            })
            .run();
    }

    #[test]
    fn test_smallest_unused_id_fills_first_gap() {
        let state = TodoState {
            todos: [3, 0, 1, 1]
                .into_iter()
                .map(|id| TodoItem::new(TodoId::new(id), "t".to_string()))
                .collect(),
            filter: Filter::All,
        };
        assert_eq!(TodoReducer::smallest_unused_id(&state), TodoId::new(2));
        assert_eq!(
            TodoReducer::smallest_unused_id(&TodoState::empty()),
            TodoId::new(0)
        );
    }

    #[test]
    fn test_replayed_todo_added_with_used_id_is_ignored() {
        ReducerTest::new(TodoReducer::new())
            .with_env(create_test_env())
            .given_state(TodoState::new())
            .when_action(TodoAction::TodoAdded {
                id: TodoId::new(1),
                text: "again".to_string(),
            })
            .then_state(|state| {
                assert_eq!(*state, TodoState::new());
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_replayed_todo_added_with_blank_text_is_ignored() {
        for text in ["", "  "] {
            ReducerTest::new(TodoReducer::new())
                .with_env(create_test_env())
                .given_state(TodoState::new())
                .when_action(TodoAction::TodoAdded {
                    id: TodoId::new(7),
                    text: text.to_string(),
                })
                .then_state(|state| {
                    assert_eq!(*state, TodoState::new());
                })
                .run();
        }
    }

    #[test]
    fn test_random_ids_stay_in_range_and_unique() {
        let mut state = TodoState::new();
        let env = TodoEnvironment::with_random_ids();
        let reducer = TodoReducer::new();

        for n in 0..200 {
            reducer.reduce(
                &mut state,
                TodoAction::AddTodo {
                    text: format!("todo {n}"),
                },
                &env,
            );
        }

        assert_eq!(state.count(), 201);
        let mut ids: Vec<u64> = state.todos.iter().map(|t| t.id.value()).collect();
        assert!(ids.iter().all(|id| *id < RANDOM_ID_BOUND));
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 201);
    }

    #[test]
    fn test_toggle_todo_flips_exactly_one() {
        ReducerTest::new(TodoReducer::new())
            .with_env(create_test_env())
            .given_state(two_unfinished())
            .when_action(TodoAction::ToggleTodo { id: TodoId::new(2) })
            .then_state(|state| {
                assert!(!state.todos[0].is_finished);
                assert!(state.todos[1].is_finished);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_toggle_todo_twice_restores() {
        ReducerTest::new(TodoReducer::new())
            .with_env(create_test_env())
            .given_state(two_unfinished())
            .when_action(TodoAction::ToggleTodo { id: TodoId::new(2) })
            .when_action(TodoAction::ToggleTodo { id: TodoId::new(2) })
            .then_state(|state| {
                assert_eq!(*state, two_unfinished());
            })
            .run();
    }

    #[test]
    fn test_toggle_todo_not_found_is_noop() {
        ReducerTest::new(TodoReducer::new())
            .with_env(create_test_env())
            .given_state(TodoState::new())
            .when_action(TodoAction::ToggleTodo {
                id: TodoId::new(9999),
            })
            .then_state(|state| {
                assert_eq!(*state, TodoState::new());
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_update_filter() {
        ReducerTest::new(TodoReducer::new())
            .with_env(create_test_env())
            .given_state(TodoState::new())
            .when_action(TodoAction::UpdateFilter {
                filter: Filter::Finished,
            })
            .then_state(|state| {
                assert_eq!(state.filter, Filter::Finished);
                assert_eq!(state.filtered_todos().count(), 0);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_update_filter_unknown_value_shows_all() {
        ReducerTest::new(TodoReducer::new())
            .with_env(create_test_env())
            .given_state(two_unfinished())
            .when_action(TodoAction::UpdateFilter {
                filter: Filter::Unfinished,
            })
            .when_action(TodoAction::ToggleTodo { id: TodoId::new(1) })
            .when_action(TodoAction::update_filter("bogus"))
            .then_state(|state| {
                assert_eq!(state.filter, Filter::All);
                let visible: Vec<&TodoItem> = state.filtered_todos().collect();
                let all: Vec<&TodoItem> = state.todos.iter().collect();
                assert_eq!(visible, all);
            })
            .run();
    }

    #[test]
    fn test_event_application() {
        ReducerTest::new(TodoReducer::new())
            .with_env(create_test_env())
            .given_state(TodoState::empty())
            .when_action(TodoAction::TodoAdded {
                id: TodoId::new(40),
                text: "Test".to_string(),
            })
            .when_action(TodoAction::TodoToggled {
                id: TodoId::new(40),
                is_finished: true,
            })
            .when_action(TodoAction::TodoToggled {
                id: TodoId::new(40),
                is_finished: true,
            })
            .when_action(TodoAction::FilterUpdated {
                filter: Filter::Finished,
            })
            .then_state(|state| {
                assert_eq!(state.count(), 1);
                assert!(state.todos[0].is_finished);
                assert_eq!(state.filter, Filter::Finished);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[derive(Clone, Debug)]
    enum Op {
        Add(String),
        Toggle(usize),
        Filter(Filter),
    }

    fn arb_filter() -> impl Strategy<Value = Filter> {
        prop_oneof![
            Just(Filter::All),
            Just(Filter::Finished),
            Just(Filter::Unfinished),
        ]
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            "[a-z ]{0,8}".prop_map(Op::Add),
            (0usize..12).prop_map(Op::Toggle),
            arb_filter().prop_map(Op::Filter),
        ]
    }

    proptest! {
        #[test]
        fn prop_filtered_todos_partition_the_list(ops in prop::collection::vec(arb_op(), 0..40)) {
            let reducer = TodoReducer::new();
            let env = create_test_env();
            let mut state = TodoState::new();

            for op in ops {
                let action = match op {
                    Op::Add(text) => TodoAction::AddTodo { text },
                    // Indexes past the end become ids that do not exist
                    Op::Toggle(index) => TodoAction::ToggleTodo {
                        id: state.todos.get(index).map_or(TodoId::new(u64::MAX), |t| t.id),
                    },
                    Op::Filter(filter) => TodoAction::UpdateFilter { filter },
                };
                reducer.reduce(&mut state, action, &env);
            }

            let all: Vec<TodoItem> = state.todos.clone();

            state.filter = Filter::All;
            let shown: Vec<TodoItem> = state.filtered_todos().cloned().collect();
            prop_assert_eq!(&shown, &all);

            state.filter = Filter::Finished;
            let finished: Vec<TodoItem> = state.filtered_todos().cloned().collect();
            prop_assert!(finished.iter().all(|t| t.is_finished));

            state.filter = Filter::Unfinished;
            let unfinished: Vec<TodoItem> = state.filtered_todos().cloned().collect();
            prop_assert!(unfinished.iter().all(|t| !t.is_finished));

            prop_assert_eq!(finished.len() + unfinished.len(), all.len());
            prop_assert_eq!(finished.len(), state.finished_count());

            let expected_finished: Vec<TodoItem> =
                all.iter().filter(|t| t.is_finished).cloned().collect();
            prop_assert_eq!(finished, expected_finished);

            let expected_unfinished: Vec<TodoItem> =
                all.iter().filter(|t| !t.is_finished).cloned().collect();
            prop_assert_eq!(unfinished, expected_unfinished);
        }
    }
}
