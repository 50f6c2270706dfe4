//! Instance-scoped accessors for view layers.
//!
//! A `Connector` turns one instance key into a `(state, dispatch)` pair:
//! `props` selects from the store state with the key, and `dispatch_props`
//! is derived once from a dispatcher and the key. Changing the key derives
//! a fresh pair; setting the same key again keeps the old one, so views that
//! compare by reference see no change.

use std::sync::Arc;

use tracing::debug;

use crate::combine::CompositeState;
use crate::dispatch::Dispatcher;
use crate::key::InstanceKey;

pub type MapState<T, P> = Arc<dyn Fn(&T, &InstanceKey) -> P + Send + Sync>;
pub type MapDispatch<T, D> = Arc<dyn Fn(Dispatcher<T>, &InstanceKey) -> D + Send + Sync>;

pub struct Connector<T, P, D> {
    map_state: MapState<T, P>,
    map_dispatch: MapDispatch<T, D>,
    dispatch: Dispatcher<T>,
    key: InstanceKey,
    dispatch_props: Arc<D>,
}

impl<T: 'static, P, D> Connector<T, P, D> {
    pub fn new<MS, MD>(
        dispatch: Dispatcher<T>,
        key: impl Into<InstanceKey>,
        map_state: MS,
        map_dispatch: MD,
    ) -> Self
    where
        MS: Fn(&T, &InstanceKey) -> P + Send + Sync + 'static,
        MD: Fn(Dispatcher<T>, &InstanceKey) -> D + Send + Sync + 'static,
    {
        let key = key.into();
        let map_dispatch: MapDispatch<T, D> = Arc::new(map_dispatch);
        let dispatch_props = Arc::new(map_dispatch(Arc::clone(&dispatch), &key));
        Self {
            map_state: Arc::new(map_state),
            map_dispatch,
            dispatch,
            key,
            dispatch_props,
        }
    }

    pub fn key(&self) -> &InstanceKey {
        &self.key
    }

    /// State-derived props for the current key.
    pub fn props(&self, state: &T) -> P {
        (self.map_state)(state, &self.key)
    }

    /// Dispatch-derived props; stable until the key changes.
    pub fn dispatch_props(&self) -> Arc<D> {
        Arc::clone(&self.dispatch_props)
    }

    /// Switch to `key`. Returns `true` if the pair was re-derived.
    pub fn set_key(&mut self, key: impl Into<InstanceKey>) -> bool {
        let key = key.into();
        if key == self.key {
            return false;
        }
        debug!(from = %self.key, to = %key, "instance key changed, re-deriving");
        self.dispatch_props = Arc::new((self.map_dispatch)(Arc::clone(&self.dispatch), &key));
        self.key = key;
        true
    }
}

/// Sub-state of one instance, if configured.
pub fn instance_state<S>(state: &CompositeState<S>, key: &InstanceKey) -> Option<Arc<S>> {
    state.get(key.as_str()).cloned()
}
