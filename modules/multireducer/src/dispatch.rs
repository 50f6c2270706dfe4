//! Scoped dispatch.
//!
//! A `ScopedDispatch` sits in front of a store's dispatcher and tags every
//! plain action with one instance key. Thunks are re-wrapped so the
//! dispatcher they receive is the scoped one, which carries the key through
//! any depth of nested or asynchronous thunks.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::warn;

use crate::action::Action;
use crate::error::{MultireducerError, Result};
use crate::key::{InstanceKey, KeyCodec};
use crate::wrap::{wrap_action, ActionCreator};

/// Shared handle to something that accepts dispatches.
pub type Dispatcher<T> = Arc<dyn Dispatch<T>>;

/// Reads the store's current state.
pub type GetState<T> = Arc<dyn Fn() -> T + Send + Sync>;

/// Deferred computation run with `(dispatch, get_state)`.
///
/// Asynchronous thunks move the dispatcher into whatever task they spawn.
pub type Thunk<T> = Box<dyn FnOnce(Dispatcher<T>, GetState<T>) + Send>;

/// Bound action creator: call it and exactly one dispatch happens.
pub type BoundActionCreator = Arc<dyn Fn(&[Value]) + Send + Sync>;

/// Everything a dispatcher accepts.
pub enum Dispatchable<T> {
    Action(Action),
    Thunk(Thunk<T>),
    /// Untyped value from outside, e.g. decoded JSON. Objects are treated
    /// as actions; anything else is dropped.
    Raw(Value),
}

impl<T> fmt::Debug for Dispatchable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dispatchable::Action(action) => f.debug_tuple("Action").field(action).finish(),
            Dispatchable::Thunk(_) => f.write_str("Thunk(..)"),
            Dispatchable::Raw(value) => f.debug_tuple("Raw").field(value).finish(),
        }
    }
}

impl<T> From<Action> for Dispatchable<T> {
    fn from(action: Action) -> Self {
        Dispatchable::Action(action)
    }
}

impl<T> From<Value> for Dispatchable<T> {
    fn from(value: Value) -> Self {
        Dispatchable::Raw(value)
    }
}

/// Build a `Dispatchable::Thunk` from a closure.
pub fn thunk<T, F>(f: F) -> Dispatchable<T>
where
    F: FnOnce(Dispatcher<T>, GetState<T>) + Send + 'static,
{
    Dispatchable::Thunk(Box::new(f))
}

/// Accepts actions and thunks.
///
/// Implemented by `Store` and `ScopedDispatch`. A dispatcher assumes a
/// single writer: one dispatch runs to completion before the next begins.
pub trait Dispatch<T>: Send + Sync {
    fn dispatch(&self, item: Dispatchable<T>);
}

impl<T, D: Dispatch<T> + ?Sized> Dispatch<T> for Arc<D> {
    fn dispatch(&self, item: Dispatchable<T>) {
        (**self).dispatch(item)
    }
}

/// Interpret a raw dispatched value as an action.
///
/// A scalar `type` (number, bool) is read as its string form, so
/// `{"type": 7}` becomes an action of type `"7"`. A `null` type counts as
/// missing.
pub fn parse_raw(mut value: Value) -> Result<Action> {
    if !value.is_object() {
        return Err(MultireducerError::MalformedAction(format!(
            "expected an object or a thunk, got {value}"
        )));
    }
    if let Some(object) = value.as_object_mut() {
        normalize_type(object);
    }
    Ok(Action::from_value(value)?)
}

fn normalize_type(object: &mut Map<String, Value>) {
    let kind = match object.get("type") {
        Some(Value::Number(n)) => Some(Value::String(n.to_string())),
        Some(Value::Bool(b)) => Some(Value::String(b.to_string())),
        _ => None,
    };
    if let Some(kind) = kind {
        object.insert("type".into(), kind);
    }
}

/// `parse_raw`, logging and dropping anything that is not an action.
pub(crate) fn raw_to_action(value: Value) -> Option<Action> {
    match parse_raw(value) {
        Ok(action) => Some(action),
        Err(e) => {
            warn!(error = %e, "dropping dispatched value");
            None
        }
    }
}

/// Dispatcher that tags everything passing through with one instance key.
pub struct ScopedDispatch<T> {
    codec: KeyCodec,
    key: InstanceKey,
    inner: Dispatcher<T>,
}

impl<T> Clone for ScopedDispatch<T> {
    fn clone(&self) -> Self {
        Self {
            codec: self.codec.clone(),
            key: self.key.clone(),
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: 'static> ScopedDispatch<T> {
    pub fn new(codec: KeyCodec, key: impl Into<InstanceKey>, inner: Dispatcher<T>) -> Self {
        Self {
            codec,
            key: key.into(),
            inner,
        }
    }

    pub fn key(&self) -> &InstanceKey {
        &self.key
    }

    pub fn codec(&self) -> &KeyCodec {
        &self.codec
    }
}

impl<T: 'static> Dispatch<T> for ScopedDispatch<T> {
    fn dispatch(&self, item: Dispatchable<T>) {
        match item {
            Dispatchable::Thunk(original) => {
                let scoped: Dispatcher<T> = Arc::new(self.clone());
                let wrapped: Thunk<T> =
                    Box::new(move |_store: Dispatcher<T>, get_state: GetState<T>| {
                        original(scoped, get_state)
                    });
                self.inner.dispatch(Dispatchable::Thunk(wrapped));
            }
            Dispatchable::Action(action) => {
                let tagged = wrap_action(&self.codec, action, &self.key);
                self.inner.dispatch(Dispatchable::Action(tagged));
            }
            Dispatchable::Raw(value) => {
                if let Some(action) = raw_to_action(value) {
                    let tagged = wrap_action(&self.codec, action, &self.key);
                    self.inner.dispatch(Dispatchable::Action(tagged));
                }
            }
        }
    }
}

/// Scoped dispatcher as a shared handle.
pub fn scoped<T: 'static>(
    codec: &KeyCodec,
    key: impl Into<InstanceKey>,
    inner: Dispatcher<T>,
) -> Dispatcher<T> {
    Arc::new(ScopedDispatch::new(codec.clone(), key, inner))
}

/// Bind every creator to a dispatcher scoped to `key`.
///
/// Each bound function calls its creator and forwards a `Some` result to the
/// scoped dispatcher; a creator returning `None` dispatches nothing.
pub fn bind_action_creators<T: 'static>(
    codec: &KeyCodec,
    creators: &BTreeMap<String, ActionCreator<T>>,
    key: impl Into<InstanceKey>,
    dispatch: Dispatcher<T>,
) -> BTreeMap<String, BoundActionCreator> {
    let scoped = ScopedDispatch::new(codec.clone(), key, dispatch);
    creators
        .iter()
        .map(|(name, creator)| {
            let creator = Arc::clone(creator);
            let scoped = scoped.clone();
            let bound: BoundActionCreator = Arc::new(move |args: &[Value]| {
                if let Some(item) = creator(args) {
                    scoped.dispatch(item);
                }
            });
            (name.clone(), bound)
        })
        .collect()
}
