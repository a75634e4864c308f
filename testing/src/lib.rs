//! # todo-store testing
//!
//! Testing utilities and helpers for the todo store.
//!
//! This crate provides:
//! - [`ReducerTest`], a Given-When-Then harness for reducers
//! - Effect assertion helpers
//! - Deterministic implementations of Environment traits
//!
//! ## Example
//!
//! ```ignore
//! use todo_store_testing::{assertions, ReducerTest};
//!
//! ReducerTest::new(TodoReducer::new())
//!     .with_env(test_environment())
//!     .given_state(TodoState::new())
//!     .when_action(TodoAction::AddTodo { text: "buy milk".into() })
//!     .then_state(|state| assert_eq!(state.count(), 2))
//!     .then_effects(assertions::assert_no_effects)
//!     .run();
//! ```


pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of Environment traits
pub mod mocks {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use todo_store_core::environment::IdGenerator;

    /// Id generator that replays a fixed script
    ///
    /// Hands out the scripted ids in order. Once the script is exhausted it
    /// keeps counting up from the last scripted value, so tests can force a
    /// collision and still get a fresh id afterwards.
    ///
    /// # Example
    ///
    /// ```
    /// use todo_store_core::environment::IdGenerator;
    /// use todo_store_testing::mocks::ScriptedIdGenerator;
    ///
    /// let ids = ScriptedIdGenerator::new([1, 1, 7]);
    /// assert_eq!(ids.next_id(), 1);
    /// assert_eq!(ids.next_id(), 1);
    /// assert_eq!(ids.next_id(), 7);
    /// assert_eq!(ids.next_id(), 8);
    /// ```
    #[derive(Debug)]
    pub struct ScriptedIdGenerator {
        script: Vec<u64>,
        cursor: AtomicUsize,
    }

    impl ScriptedIdGenerator {
        /// Create a generator that replays `script`
        #[must_use]
        pub fn new(script: impl IntoIterator<Item = u64>) -> Self {
            Self {
                script: script.into_iter().collect(),
                cursor: AtomicUsize::new(0),
            }
        }

        /// Number of ids handed out so far
        #[must_use]
        pub fn calls(&self) -> usize {
            self.cursor.load(Ordering::SeqCst)
        }
    }

    impl IdGenerator for ScriptedIdGenerator {
        fn next_id(&self) -> u64 {
            let index = self.cursor.fetch_add(1, Ordering::SeqCst);
            if let Some(id) = self.script.get(index) {
                return *id;
            }

            let last = self.script.last().copied().unwrap_or(0);
            let past_end = (index - self.script.len()) as u64;
            last.wrapping_add(past_end + 1)
        }
    }
}

pub use mocks::ScriptedIdGenerator;
