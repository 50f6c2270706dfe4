//! Multireducer: many keyed instances of one reducer in one store.
//!
//! Reducers and action creators are written with no knowledge of instance
//! keys. At the dispatch boundary a `ScopedDispatch` tags action types with
//! a key (`INCREMENT` becomes `INCREMENT__@@MULTIREDUCER@@a`); at the store
//! boundary a `Multireducer` decodes the tag, strips it and routes the
//! action to the reducer registered under that key.
//!
//! Thunks dispatched through a scoped dispatcher receive the scoped
//! dispatcher themselves, so the key follows every nested or asynchronous
//! dispatch they make.
//!
//! ```
//! use multireducer::{reducer_fn, scoped, Action, Dispatch, KeyCodec, Multireducer, Store};
//!
//! let counter = || {
//!     reducer_fn(|n: &i64, action: &Action| match action.kind() {
//!         "INCREMENT" => n + 1,
//!         _ => *n,
//!     })
//! };
//! let counters = Multireducer::<i64>::builder()
//!     .instance("a", counter())
//!     .instance("b", counter())
//!     .build();
//! let store = Store::new(counters);
//!
//! let a = scoped(&KeyCodec::default(), "a", store.dispatcher());
//! a.dispatch(Action::new("INCREMENT").into());
//!
//! assert_eq!(store.state().get("a").map(|n| **n), Some(1));
//! assert_eq!(store.state().get("b").map(|n| **n), Some(0));
//! ```

pub mod action;
pub mod combine;
pub mod config;
pub mod connect;
pub mod dispatch;
pub mod error;
pub mod key;
pub mod store;
pub mod wrap;

pub use action::Action;
pub use combine::{
    reducer_fn, CompositeState, FnReducer, Multireducer, MultireducerBuilder, Reducer,
};
pub use config::Config;
pub use connect::{instance_state, Connector};
pub use dispatch::{
    bind_action_creators, parse_raw, scoped, thunk, BoundActionCreator, Dispatch, Dispatchable,
    Dispatcher, GetState, ScopedDispatch, Thunk,
};
pub use error::{MultireducerError, Result};
pub use key::{DecodedType, InstanceKey, KeyCodec, DEFAULT_DELIMITER};
pub use store::{Store, SubscriptionId};
pub use wrap::{
    action_creator, wrap_action, wrap_action_creator, wrap_action_creators, ActionCreator,
};
