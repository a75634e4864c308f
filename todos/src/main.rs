//! Todo store demo binary
//!
//! Walks the store through adding, toggling and filtering todos and prints
//! each view. Set `RUST_LOG` to change log verbosity.

use std::time::Duration;
use todos::{Filter, TodoAction, TodoEnvironment, TodoStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

async fn print_view(store: &TodoStore) {
    let (filter, lines) = store
        .state(|s| {
            let lines: Vec<String> = s
                .filtered_todos()
                .map(|todo| {
                    let status = if todo.is_finished { "✓" } else { " " };
                    format!("  [{status}] #{} {}", todo.id, todo.text)
                })
                .collect();
            (s.filter, lines)
        })
        .await;

    println!("\nFilter: {filter} ({} shown)", lines.len());
    for line in lines {
        println!("{line}");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "todos=debug,todo_store_runtime=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("=== Todo Store ===");

    let store = todos::create_store(TodoEnvironment::default());
    print_view(&store).await;

    println!("\nAdding todos...");
    for text in ["buy milk", "write documentation", ""] {
        store.send(TodoAction::AddTodo { text: text.to_string() }).await?;
    }
    print_view(&store).await;

    let first_new = store
        .state(|s| s.todos.get(1).map(|todo| todo.id))
        .await
        .ok_or("expected an added todo")?;

    println!("\nToggling the seed todo and #{first_new}...");
    store.send(TodoAction::ToggleTodo { id: todos::SEED_TODO_ID }).await?;
    store.send(TodoAction::ToggleTodo { id: first_new }).await?;

    for filter in [Filter::Finished, Filter::Unfinished] {
        store.send(TodoAction::UpdateFilter { filter }).await?;
        print_view(&store).await;
    }

    println!("\nSelecting filter \"bogus\"...");
    store.send(TodoAction::update_filter("bogus")).await?;
    print_view(&store).await;

    let state = store.state(Clone::clone).await;
    println!("\nFinal state:\n{}", serde_json::to_string_pretty(&state)?);

    store.shutdown(Duration::from_secs(1)).await?;
    println!("\n=== Demo Complete ===");
    Ok(())
}
