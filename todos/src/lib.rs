//! In-memory todo list store.
//!
//! Holds an ordered list of todo items, each with a text label and a
//! finished flag, plus the filter (all / finished / unfinished) that selects
//! which items the list view shows.
//!
//! - `AddTodo` appends an unfinished item; blank text is ignored
//! - `ToggleTodo` flips one item; unknown ids are ignored
//! - `UpdateFilter` changes the active filter
//! - [`TodoState::filtered_todos`] is the derived view
//!
//! # Quick Start
//!
//! ```no_run
//! use todos::{Filter, TodoAction, TodoEnvironment, TodoId};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = todos::create_store(TodoEnvironment::default());
//!
//! store.send(TodoAction::AddTodo { text: "buy milk".to_string() }).await?;
//! store.send(TodoAction::ToggleTodo { id: TodoId::new(1) }).await?;
//! store.send(TodoAction::UpdateFilter { filter: Filter::Unfinished }).await?;
//!
//! let visible: Vec<String> = store
//!     .state(|s| s.filtered_todos().map(|t| t.text.clone()).collect())
//!     .await;
//! assert_eq!(visible, vec!["buy milk".to_string()]);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod reducer;
pub mod types;

use todo_store_runtime::Store;

// Re-export commonly used types
pub use error::TodoError;
pub use reducer::{RANDOM_ID_BOUND, RandomIdGenerator, TodoEnvironment, TodoReducer};
pub use types::{Filter, SEED_TODO_ID, SEED_TODO_TEXT, TodoAction, TodoId, TodoItem, TodoState};

/// The todo list store: state, reducer and environment wired together
pub type TodoStore = Store<TodoState, TodoAction, TodoEnvironment, TodoReducer>;

/// Creates a store holding the starting list (one "clean room" item)
///
/// Call once per session and pass clones of the handle to whatever reads or
/// changes the list.
#[must_use]
pub fn create_store(env: TodoEnvironment) -> TodoStore {
    Store::new(TodoState::new(), TodoReducer::new(), env)
}
