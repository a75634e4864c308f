use crate::{PendingGuard, StoreConfig, StoreError};
use futures::future::{BoxFuture, join_all};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use todo_store_core::{effect::Effect, reducer::Reducer};
use tokio::sync::{RwLock, broadcast};

/// How often `settle` and `shutdown` check the pending-effect counter
const POLL_INTERVAL: Duration = Duration::from_millis(10);

struct Shared<S, A, E, R> {
    state: RwLock<S>,
    reducer: R,
    environment: E,
    shutdown: AtomicBool,
    pending_effects: Arc<AtomicUsize>,
    action_broadcast: broadcast::Sender<A>,
    shutdown_timeout: Duration,
}

/// The Store - runtime coordinator for a reducer
///
/// The Store owns:
/// 1. State (behind an async `RwLock`)
/// 2. Reducer (business logic)
/// 3. Environment (injected dependencies)
/// 4. Effect execution (with feedback loop)
///
/// A `Store` is a handle: cloning it is cheap and every clone sees the same
/// state. The host creates one store per session and hands clones to the
/// parts of the program that read or change it.
///
/// # Type Parameters
///
/// - `S`: State type
/// - `A`: Action type
/// - `E`: Environment type
/// - `R`: Reducer implementation
pub struct Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    shared: Arc<Shared<S, A, E, R>>,
}

impl<S, A, E, R> Clone for Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S, A, E, R> Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
    A: Send + Clone + 'static,
    S: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    /// Create a new store with initial state, reducer, and environment
    ///
    /// Uses [`StoreConfig::default`].
    #[must_use]
    pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
        Self::with_config(initial_state, reducer, environment, StoreConfig::default())
    }

    /// Create a new Store with custom configuration
    #[must_use]
    pub fn with_config(initial_state: S, reducer: R, environment: E, config: StoreConfig) -> Self {
        let (action_broadcast, _) = broadcast::channel(config.action_broadcast_capacity.max(1));

        Self {
            shared: Arc::new(Shared {
                state: RwLock::new(initial_state),
                reducer,
                environment,
                shutdown: AtomicBool::new(false),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                action_broadcast,
                shutdown_timeout: config.shutdown_timeout,
            }),
        }
    }

    /// Send an action to the store
    ///
    /// 1. Acquires the write lock on state
    /// 2. Calls the reducer with (state, action, environment)
    /// 3. Broadcasts the action to subscribers, still holding the lock, so
    ///    delivery order matches the order the reducer applied actions in
    /// 4. Starts the returned effects in background tasks
    ///
    /// The reducer has finished and its state changes are visible when this
    /// returns. Effects may still be running; use [`Store::settle`] to wait
    /// for them.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
    #[tracing::instrument(skip(self, action), name = "store_send")]
    pub async fn send(&self, action: A) -> Result<(), StoreError> {
        if self.shared.shutdown.load(Ordering::Acquire) {
            tracing::warn!("Rejected action: store is shutting down");
            metrics::counter!("store.shutdown.rejected_actions").increment(1);
            return Err(StoreError::ShutdownInProgress);
        }

        tracing::debug!("Processing action");
        metrics::counter!("store.actions.processed").increment(1);

        let observed = action.clone();
        let effects = {
            let mut state = self.shared.state.write().await;
            tracing::trace!("Acquired write lock on state");
            let effects = self
                .shared
                .reducer
                .reduce(&mut *state, action, &self.shared.environment);

            // Broadcast under the lock so subscribers see reducer order.
            // No subscribers is not an error.
            let _ = self.shared.action_broadcast.send(observed);
            effects
        };

        tracing::trace!("Reducer returned {} effects", effects.len());
        for effect in effects {
            self.execute_effect(effect);
        }

        Ok(())
    }

    /// Read current state via a closure
    ///
    /// The read lock is released as soon as the closure returns:
    ///
    /// ```ignore
    /// let count = store.state(|s| s.todos.len()).await;
    /// ```
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&S) -> T,
    {
        let state = self.shared.state.read().await;
        f(&*state)
    }

    /// Subscribe to every action the store processes
    ///
    /// Each action is delivered after the reducer has applied it, so a
    /// subscriber that reads state on receipt sees the change.
    #[must_use]
    pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
        self.shared.action_broadcast.subscribe()
    }

    /// Number of effects currently running
    #[must_use]
    pub fn pending_effects(&self) -> usize {
        self.shared.pending_effects.load(Ordering::Acquire)
    }

    /// Returns true once shutdown has been initiated
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.shared.shutdown.load(Ordering::Acquire)
    }

    /// Wait until no effects are running
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] with the number of running effects if
    /// they have not finished within `timeout`.
    pub async fn settle(&self, timeout: Duration) -> Result<(), StoreError> {
        let start = Instant::now();

        loop {
            let pending = self.pending_effects();
            if pending == 0 {
                return Ok(());
            }

            if start.elapsed() >= timeout {
                return Err(StoreError::Timeout(pending));
            }

            tracing::trace!(pending_effects = pending, "Waiting for effects to complete");
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Initiate graceful shutdown of the store
    ///
    /// Sets the shutdown flag (rejecting new actions, including actions fed
    /// back by running effects) and waits for pending effects to complete.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if the timeout expires before all
    /// pending effects complete.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        tracing::info!("Initiating graceful shutdown");
        metrics::counter!("store.shutdown.initiated").increment(1);

        self.shared.shutdown.store(true, Ordering::Release);

        match self.settle(timeout).await {
            Ok(()) => {
                tracing::info!("All effects completed, shutdown successful");
                metrics::counter!("store.shutdown.completed").increment(1);
                Ok(())
            },
            Err(StoreError::Timeout(pending)) => {
                tracing::error!(pending_effects = pending, "Shutdown timed out");
                metrics::counter!("store.shutdown.timeout").increment(1);
                Err(StoreError::ShutdownTimeout(pending))
            },
            Err(other) => Err(other),
        }
    }

    /// Graceful shutdown using the timeout from [`StoreConfig`]
    ///
    /// # Errors
    ///
    /// Same as [`Store::shutdown`].
    pub async fn shutdown_with_default_timeout(&self) -> Result<(), StoreError> {
        self.shutdown(self.shared.shutdown_timeout).await
    }

    /// Start one effect returned by the reducer
    fn execute_effect(&self, effect: Effect<A>) {
        if effect.is_none() {
            tracing::trace!("Skipping no-op effect");
            metrics::counter!("store.effects.executed", "type" => "none").increment(1);
            return;
        }

        self.shared.pending_effects.fetch_add(1, Ordering::SeqCst);
        let guard = PendingGuard(Arc::clone(&self.shared.pending_effects));
        let task = self.run_effect(effect);

        tokio::spawn(async move {
            let _guard = guard;
            task.await;
        });
    }

    fn run_effect(&self, effect: Effect<A>) -> BoxFuture<'static, ()> {
        let store = self.clone();

        Box::pin(async move {
            match effect {
                Effect::None => {},
                Effect::Future(fut) => {
                    metrics::counter!("store.effects.executed", "type" => "future").increment(1);
                    if let Some(action) = fut.await {
                        tracing::trace!("Effect::Future produced an action, sending to store");
                        store.feed_back(action).await;
                    }
                },
                Effect::Delay { duration, action } => {
                    metrics::counter!("store.effects.executed", "type" => "delay").increment(1);
                    tokio::time::sleep(duration).await;
                    store.feed_back(*action).await;
                },
                Effect::Parallel(effects) => {
                    metrics::counter!("store.effects.executed", "type" => "parallel").increment(1);
                    join_all(effects.into_iter().map(|effect| store.run_effect(effect))).await;
                },
                Effect::Sequential(effects) => {
                    metrics::counter!("store.effects.executed", "type" => "sequential")
                        .increment(1);
                    for effect in effects {
                        store.run_effect(effect).await;
                    }
                },
            }
        })
    }

    async fn feed_back(&self, action: A) {
        if let Err(error) = self.send(action).await {
            tracing::warn!(%error, "Dropped action produced by effect");
        }
    }
}
