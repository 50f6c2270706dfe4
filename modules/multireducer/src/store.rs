//! Minimal single-writer store.
//!
//! Holds one state value and one reducer, runs thunks with itself as the
//! dispatcher, and notifies listeners after every reduction. Enough to
//! drive the scoped dispatchers end to end.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::action::Action;
use crate::combine::Reducer;
use crate::dispatch::{raw_to_action, Dispatch, Dispatchable, Dispatcher, GetState};

/// Called with the new state after each reduction.
pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Unique identifier for a store listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct StoreInner<T> {
    state: RwLock<T>,
    reducer: Arc<dyn Reducer<T>>,
    listeners: RwLock<Vec<(SubscriptionId, Listener<T>)>>,
    next_id: AtomicU64,
}

/// Cheap-to-clone store handle. Clones share the same state.
pub struct Store<T> {
    inner: Arc<StoreInner<T>>,
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Store<T> {
    /// Create a store seeded with the reducer's initial state.
    pub fn new<R>(reducer: R) -> Self
    where
        R: Reducer<T> + 'static,
    {
        let state: T = reducer.initial_state();
        Self::with_state(reducer, state)
    }

    pub fn with_state<R>(reducer: R, state: T) -> Self
    where
        R: Reducer<T> + 'static,
    {
        Self {
            inner: Arc::new(StoreInner {
                state: RwLock::new(state),
                reducer: Arc::new(reducer),
                listeners: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Current state (a clone; cheap when `T` is an `Arc`).
    pub fn state(&self) -> T {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The store as a shared dispatcher.
    pub fn dispatcher(&self) -> Dispatcher<T> {
        Arc::new(self.clone())
    }

    pub fn get_state(&self) -> GetState<T> {
        let store = self.clone();
        Arc::new(move || store.state())
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(existing, _)| *existing != id);
    }

    /// Reduce one action and replace the state.
    ///
    /// If the reducer panics the previous state is left in place and the
    /// panic continues to the caller.
    fn apply(&self, action: Action) {
        let next = {
            let mut state = self
                .inner
                .state
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let next = self.inner.reducer.reduce(&*state, &action);
            *state = next.clone();
            next
        };
        debug!(action_type = action.kind(), "state replaced");

        // Listeners run without any lock held so they may read or dispatch.
        let listeners: Vec<Listener<T>> = self
            .inner
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(&next);
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Dispatch<T> for Store<T> {
    fn dispatch(&self, item: Dispatchable<T>) {
        match item {
            Dispatchable::Action(action) => self.apply(action),
            Dispatchable::Thunk(thunk) => thunk(self.dispatcher(), self.get_state()),
            Dispatchable::Raw(value) => {
                if let Some(action) = raw_to_action(value) {
                    self.apply(action);
                }
            }
        }
    }
}
