//! Domain types for the todo list.
//!
//! A todo list is an ordered collection of items that can be added and
//! toggled between finished and unfinished, plus the filter that selects
//! which items the list view shows.

use crate::error::TodoError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Id of the item every fresh list starts with
pub const SEED_TODO_ID: TodoId = TodoId::new(1);

/// Text of the item every fresh list starts with
pub const SEED_TODO_TEXT: &str = "clean room";

/// Unique identifier for a todo item
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(u64);

impl TodoId {
    /// Creates a `TodoId` from its numeric value
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the numeric value
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for TodoId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for TodoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single todo item
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    /// Unique identifier
    pub id: TodoId,
    /// Label shown for the todo
    pub text: String,
    /// Whether the todo is finished
    pub is_finished: bool,
}

impl TodoItem {
    /// Creates a new, unfinished todo item
    #[must_use]
    pub const fn new(id: TodoId, text: String) -> Self {
        Self {
            id,
            text,
            is_finished: false,
        }
    }

    /// Flips the finished flag and returns the new value
    pub const fn toggle(&mut self) -> bool {
        self.is_finished = !self.is_finished;
        self.is_finished
    }
}

/// View selector over the todo list
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    /// Every item
    #[default]
    All,
    /// Items marked finished
    Finished,
    /// Items not yet finished
    Unfinished,
}

impl Filter {
    /// Every filter, in display order
    pub const VARIANTS: [Self; 3] = [Self::All, Self::Finished, Self::Unfinished];

    /// Name used in the host interface and in serialized state
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Finished => "finished",
            Self::Unfinished => "unfinished",
        }
    }

    /// Returns true if `item` is visible under this filter
    #[must_use]
    pub const fn matches(self, item: &TodoItem) -> bool {
        match self {
            Self::All => true,
            Self::Finished => item.is_finished,
            Self::Unfinished => !item.is_finished,
        }
    }

    /// Parses a filter name, falling back to [`Filter::All`] for anything unknown
    ///
    /// Unknown names are logged at `warn` level rather than rejected, so a
    /// stale or mistyped selector from the host shows the whole list.
    #[must_use]
    pub fn parse_or_all(value: &str) -> Self {
        value.parse().unwrap_or_else(|error: TodoError| {
            tracing::warn!(%error, "Falling back to the `all` filter");
            Self::All
        })
    }
}

impl FromStr for Filter {
    type Err = TodoError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::VARIANTS
            .into_iter()
            .find(|filter| filter.as_str() == value)
            .ok_or_else(|| TodoError::UnknownFilter(value.to_string()))
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of the todo list
///
/// Items keep insertion order. Nothing removes an item once added.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoState {
    /// All todos in insertion order
    pub todos: Vec<TodoItem>,
    /// Active view filter
    pub filter: Filter,
}

impl TodoState {
    /// Creates the starting state: one unfinished "clean room" item, showing all
    #[must_use]
    pub fn new() -> Self {
        Self {
            todos: vec![TodoItem::new(SEED_TODO_ID, SEED_TODO_TEXT.to_string())],
            filter: Filter::All,
        }
    }

    /// Creates a state with no items
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            todos: Vec::new(),
            filter: Filter::All,
        }
    }

    /// Items visible under the active filter, in insertion order
    ///
    /// Recomputed on every call; the items are borrowed from the state.
    pub fn filtered_todos(&self) -> impl Iterator<Item = &TodoItem> {
        let filter = self.filter;
        self.todos.iter().filter(move |item| filter.matches(item))
    }

    /// Returns the number of todos
    #[must_use]
    pub fn count(&self) -> usize {
        self.todos.len()
    }

    /// Returns the number of finished todos
    #[must_use]
    pub fn finished_count(&self) -> usize {
        self.todos.iter().filter(|t| t.is_finished).count()
    }

    /// Returns the number of unfinished todos
    #[must_use]
    pub fn unfinished_count(&self) -> usize {
        self.count() - self.finished_count()
    }

    /// Index of the first todo with this id
    #[must_use]
    pub fn position(&self, id: TodoId) -> Option<usize> {
        self.todos.iter().position(|t| t.id == id)
    }

    /// Returns the first todo with this id
    #[must_use]
    pub fn get(&self, id: TodoId) -> Option<&TodoItem> {
        self.todos.iter().find(|t| t.id == id)
    }

    /// Checks if a todo exists
    #[must_use]
    pub fn exists(&self, id: TodoId) -> bool {
        self.position(id).is_some()
    }

    /// Largest id in the list
    #[must_use]
    pub fn max_id(&self) -> Option<TodoId> {
        self.todos.iter().map(|t| t.id).max()
    }

    /// Flips the first todo with this id and returns its new flag
    ///
    /// # Errors
    ///
    /// Returns [`TodoError::NotFound`] if no todo has this id; the state is
    /// left untouched.
    pub fn toggle(&mut self, id: TodoId) -> Result<bool, TodoError> {
        self.todos
            .iter_mut()
            .find(|t| t.id == id)
            .map(TodoItem::toggle)
            .ok_or(TodoError::NotFound(id))
    }
}

impl Default for TodoState {
    fn default() -> Self {
        Self::new()
    }
}

/// Actions representing commands and events for todos
///
/// Commands are requests sent by the host; the reducer validates them and
/// records what happened as events. Sending an event applies it as-is.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TodoAction {
    // ========== Commands ==========
    /// Command: Append a new todo. Blank text is ignored.
    AddTodo {
        /// Label of the todo
        text: String,
    },

    /// Command: Flip a todo between finished and unfinished
    ToggleTodo {
        /// Todo to toggle
        id: TodoId,
    },

    /// Command: Change the active filter
    UpdateFilter {
        /// New filter
        filter: Filter,
    },

    // ========== Events ==========
    /// Event: Todo was added
    TodoAdded {
        /// Id assigned to the todo
        id: TodoId,
        /// Label of the todo
        text: String,
    },

    /// Event: Todo was toggled
    TodoToggled {
        /// Todo identifier
        id: TodoId,
        /// Flag value after the toggle
        is_finished: bool,
    },

    /// Event: Filter was changed
    FilterUpdated {
        /// New filter
        filter: Filter,
    },
}

impl TodoAction {
    /// `AddTodo` from text that may be absent
    ///
    /// `None` yields a command with empty text, which the reducer ignores.
    #[must_use]
    pub fn add_todo<T: Into<String>>(text: Option<T>) -> Self {
        Self::AddTodo {
            text: text.map(Into::into).unwrap_or_default(),
        }
    }

    /// `UpdateFilter` from a raw filter name, see [`Filter::parse_or_all`]
    #[must_use]
    pub fn update_filter(value: &str) -> Self {
        Self::UpdateFilter {
            filter: Filter::parse_or_all(value),
        }
    }

    /// Returns true if this action is a command
    #[must_use]
    pub const fn is_command(&self) -> bool {
        matches!(
            self,
            Self::AddTodo { .. } | Self::ToggleTodo { .. } | Self::UpdateFilter { .. }
        )
    }

    /// Returns true if this action is an event
    #[must_use]
    pub const fn is_event(&self) -> bool {
        !self.is_command()
    }

    /// Returns the event type name for serialization
    ///
    /// Only events have type names. Commands return "unknown".
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::TodoAdded { .. } => "TodoAdded.v1",
            Self::TodoToggled { .. } => "TodoToggled.v1",
            Self::FilterUpdated { .. } => "FilterUpdated.v1",
            Self::AddTodo { .. } | Self::ToggleTodo { .. } | Self::UpdateFilter { .. } => {
                "unknown"
            },
        }
    }
}
