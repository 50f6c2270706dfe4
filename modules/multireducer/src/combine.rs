//! The multireducer combinator.
//!
//! Composes `instance key -> reducer` into one reducer over a
//! `CompositeState`. Tagged actions are decoded, stripped of their tag and
//! handed to the matching sub-reducer; everything else leaves the state
//! untouched and returns the very same `Arc`.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use tracing::trace;

use crate::action::Action;
use crate::key::{InstanceKey, KeyCodec};

/// Pure state transition.
///
/// `initial_state` is what the reducer returns when it has no prior state.
/// A panic inside `reduce` is not caught anywhere in this crate.
pub trait Reducer<S>: Send + Sync {
    fn initial_state(&self) -> S;

    fn reduce(&self, state: &S, action: &Action) -> S;
}

impl<S, R: Reducer<S> + ?Sized> Reducer<S> for Arc<R> {
    fn initial_state(&self) -> S {
        (**self).initial_state()
    }

    fn reduce(&self, state: &S, action: &Action) -> S {
        (**self).reduce(state, action)
    }
}

/// Closure reducer whose initial state is `S::default()`.
pub struct FnReducer<S, F> {
    f: F,
    _state: PhantomData<fn() -> S>,
}

pub fn reducer_fn<S, F>(f: F) -> FnReducer<S, F>
where
    S: Default,
    F: Fn(&S, &Action) -> S + Send + Sync,
{
    FnReducer {
        f,
        _state: PhantomData,
    }
}

impl<S, F> Reducer<S> for FnReducer<S, F>
where
    S: Default,
    F: Fn(&S, &Action) -> S + Send + Sync,
{
    fn initial_state(&self) -> S {
        S::default()
    }

    fn reduce(&self, state: &S, action: &Action) -> S {
        (self.f)(state, action)
    }
}

/// Per-instance sub-states. Each entry is shared, so a transition only
/// allocates the entry it changes.
#[derive(Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CompositeState<S> {
    instances: BTreeMap<InstanceKey, Arc<S>>,
}

impl<S> Clone for CompositeState<S> {
    fn clone(&self) -> Self {
        Self {
            instances: self.instances.clone(),
        }
    }
}

impl<S> Default for CompositeState<S> {
    fn default() -> Self {
        Self {
            instances: BTreeMap::new(),
        }
    }
}

impl<S> CompositeState<S> {
    pub fn get(&self, key: &str) -> Option<&Arc<S>> {
        self.instances.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &InstanceKey> {
        self.instances.keys()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, InstanceKey, Arc<S>> {
        self.instances.iter()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Copy of `self` with `key` replaced; every other entry is shared.
    fn with_instance(&self, key: InstanceKey, sub_state: S) -> Self {
        let mut instances = self.instances.clone();
        instances.insert(key, Arc::new(sub_state));
        Self { instances }
    }
}

impl<K: Into<InstanceKey>, S> FromIterator<(K, S)> for CompositeState<S> {
    fn from_iter<I: IntoIterator<Item = (K, S)>>(iter: I) -> Self {
        Self {
            instances: iter
                .into_iter()
                .map(|(k, s)| (k.into(), Arc::new(s)))
                .collect(),
        }
    }
}

/// One reducer over many keyed instances.
///
/// Implements `Reducer<Arc<CompositeState<S>>>`, so a multireducer can be
/// an instance of another one.
pub struct Multireducer<S> {
    codec: KeyCodec,
    reducers: BTreeMap<InstanceKey, Arc<dyn Reducer<S>>>,
    initial: Arc<CompositeState<S>>,
}

impl<S: Send + Sync + 'static> Multireducer<S> {
    pub fn builder() -> MultireducerBuilder<S> {
        MultireducerBuilder {
            codec: KeyCodec::default(),
            reducers: BTreeMap::new(),
        }
    }

    /// Combine with an explicit codec. A repeated key keeps the last reducer.
    pub fn new<I, K>(codec: KeyCodec, reducers: I) -> Self
    where
        I: IntoIterator<Item = (K, Arc<dyn Reducer<S>>)>,
        K: Into<InstanceKey>,
    {
        let reducers: BTreeMap<InstanceKey, Arc<dyn Reducer<S>>> =
            reducers.into_iter().map(|(k, r)| (k.into(), r)).collect();
        let initial = reducers
            .iter()
            .map(|(key, reducer)| (key.clone(), reducer.initial_state()))
            .collect::<CompositeState<S>>();
        Self {
            codec,
            reducers,
            initial: Arc::new(initial),
        }
    }

    pub fn codec(&self) -> &KeyCodec {
        &self.codec
    }

    pub fn keys(&self) -> impl Iterator<Item = &InstanceKey> {
        self.reducers.keys()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.reducers.contains_key(key)
    }
}

impl<S: Send + Sync + 'static> Reducer<Arc<CompositeState<S>>> for Multireducer<S> {
    fn initial_state(&self) -> Arc<CompositeState<S>> {
        Arc::clone(&self.initial)
    }

    fn reduce(&self, state: &Arc<CompositeState<S>>, action: &Action) -> Arc<CompositeState<S>> {
        let Some(decoded) = self.codec.decode(action.kind()) else {
            trace!(action_type = action.kind(), "untagged action ignored");
            return Arc::clone(state);
        };

        let Some(reducer) = self.reducers.get(&decoded.instance_key) else {
            trace!(instance = %decoded.instance_key, "no reducer for instance");
            return Arc::clone(state);
        };

        let mut untagged = action.clone();
        untagged.kind = Some(decoded.base_type);

        let next = match state.get(decoded.instance_key.as_str()) {
            Some(prev) => {
                let prev: &S = prev;
                reducer.reduce(prev, &untagged)
            }
            None => {
                let fresh: S = reducer.initial_state();
                reducer.reduce(&fresh, &untagged)
            }
        };

        Arc::new(state.with_instance(decoded.instance_key, next))
    }
}

pub struct MultireducerBuilder<S> {
    codec: KeyCodec,
    reducers: BTreeMap<InstanceKey, Arc<dyn Reducer<S>>>,
}

impl<S: Send + Sync + 'static> MultireducerBuilder<S> {
    pub fn codec(mut self, codec: KeyCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn instance<R>(mut self, key: impl Into<InstanceKey>, reducer: R) -> Self
    where
        R: Reducer<S> + 'static,
    {
        self.reducers.insert(key.into(), Arc::new(reducer));
        self
    }

    /// Register one shared reducer under every key in `keys`.
    pub fn instances<I, K>(mut self, keys: I, reducer: Arc<dyn Reducer<S>>) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<InstanceKey>,
    {
        for key in keys {
            self.reducers.insert(key.into(), Arc::clone(&reducer));
        }
        self
    }

    pub fn build(self) -> Multireducer<S> {
        Multireducer::new(self.codec, self.reducers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter() -> impl Reducer<i64> {
        reducer_fn(|count: &i64, action: &Action| match action.kind() {
            "INC" => count + 1,
            "DEC" => count - 1,
            _ => *count,
        })
    }

    #[test]
    fn initial_state_is_computed_once() {
        let reducer = Multireducer::<i64>::builder()
            .instance("x", counter())
            .instance("y", counter())
            .build();
        let first = reducer.initial_state();
        let second = reducer.initial_state();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn missing_sub_state_starts_from_initial() {
        let reducer = Multireducer::<i64>::builder().instance("x", counter()).build();
        let empty = Arc::new(CompositeState::<i64>::default());
        let inc = Action::new(reducer.codec().encode("INC", &"x".into()));

        let next = reducer.reduce(&empty, &inc);
        assert_eq!(next.get("x").map(|c| **c), Some(1));
    }

    #[test]
    fn sub_reducer_sees_untagged_type_and_payload() {
        let seen = Arc::new(std::sync::Mutex::new(None));
        let capture = Arc::clone(&seen);
        let reducer = Multireducer::<i64>::builder()
            .instance(
                "x",
                reducer_fn(move |s: &i64, action: &Action| {
                    *capture.lock().unwrap() = Some(action.clone());
                    *s
                }),
            )
            .build();

        let tagged = Action::new(reducer.codec().encode("PING", &"x".into())).with("n", 3);
        reducer.reduce(&reducer.initial_state(), &tagged);

        let seen = seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen, Action::new("PING").with("n", 3));
    }

    #[test]
    fn multi_type_actions_are_not_routed() {
        let reducer = Multireducer::<i64>::builder().instance("x", counter()).build();
        let state = reducer.initial_state();
        let key: InstanceKey = "x".into();
        let action = Action::multi([
            reducer.codec().encode("INC", &key),
            reducer.codec().encode("DEC", &key),
        ]);
        assert!(Arc::ptr_eq(&reducer.reduce(&state, &action), &state));
    }

    #[test]
    fn shared_reducer_serves_every_key() {
        let shared: Arc<dyn Reducer<i64>> = Arc::new(counter());
        let reducer = Multireducer::<i64>::builder()
            .instances(["p", "q", "r"], shared)
            .build();
        assert_eq!(reducer.keys().count(), 3);
        assert!(reducer.contains_key("q"));
        assert!(!reducer.contains_key("s"));
    }

    #[test]
    fn multireducers_nest() {
        let inner = || Multireducer::<i64>::builder().instance("x", counter()).build();
        let outer = Multireducer::<Arc<CompositeState<i64>>>::builder()
            .codec(KeyCodec::new("/").unwrap())
            .instance("left", inner())
            .instance("right", inner())
            .build();

        // Outer tag is added last, so it is split off first.
        let inner_type = KeyCodec::default().encode("INC", &"x".into());
        let action = Action::new(format!("{inner_type}/left"));
        let state = outer.reduce(&outer.initial_state(), &action);

        assert_eq!(state.get("left").unwrap().get("x").map(|c| **c), Some(1));
        assert_eq!(state.get("right").unwrap().get("x").map(|c| **c), Some(0));
    }
}
