//! Tagging actions and action creators with an instance key.
//!
//! Pure transformations: nothing here dispatches.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::action::Action;
use crate::dispatch::{parse_raw, Dispatchable};
use crate::key::{InstanceKey, KeyCodec};

/// Action creator over JSON arguments. `None` means "nothing to dispatch".
pub type ActionCreator<T> = Arc<dyn Fn(&[Value]) -> Option<Dispatchable<T>> + Send + Sync>;

pub fn action_creator<T, F>(f: F) -> ActionCreator<T>
where
    F: Fn(&[Value]) -> Option<Dispatchable<T>> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Tag `action` for `key`.
///
/// A `types` sequence wins over `type`: every entry is tagged and `type` is
/// left as is. Otherwise `type` is tagged, a missing one counting as `""`.
pub fn wrap_action(codec: &KeyCodec, mut action: Action, key: &InstanceKey) -> Action {
    match action.types.take() {
        Some(types) => {
            action.types = Some(types.iter().map(|t| codec.encode(t, key)).collect());
        }
        None => {
            let tagged = codec.encode(action.kind(), key);
            action.kind = Some(tagged);
        }
    }
    action
}

/// Wrap a creator so that typed actions it returns come back tagged.
///
/// Raw JSON objects with a `type` are parsed and tagged the same way.
/// Thunks, `None`, untyped actions and other raw values pass through
/// unchanged.
pub fn wrap_action_creator<T: 'static>(
    codec: &KeyCodec,
    creator: ActionCreator<T>,
    key: impl Into<InstanceKey>,
) -> ActionCreator<T> {
    let codec = codec.clone();
    let key = key.into();
    Arc::new(move |args: &[Value]| match creator(args) {
        Some(Dispatchable::Action(action)) if action.is_typed() => {
            Some(Dispatchable::Action(wrap_action(&codec, action, &key)))
        }
        Some(Dispatchable::Raw(value)) if has_type(&value) => match parse_raw(value.clone()) {
            Ok(action) => Some(Dispatchable::Action(wrap_action(&codec, action, &key))),
            Err(e) => {
                warn!(error = %e, "leaving creator result untagged");
                Some(Dispatchable::Raw(value))
            }
        },
        other => other,
    })
}

fn has_type(value: &Value) -> bool {
    match value.get("type") {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64() != Some(0.0),
        Some(_) => true,
    }
}

/// `wrap_action_creator` over every entry, names preserved.
pub fn wrap_action_creators<T: 'static>(
    codec: &KeyCodec,
    creators: &BTreeMap<String, ActionCreator<T>>,
    key: impl Into<InstanceKey>,
) -> BTreeMap<String, ActionCreator<T>> {
    let key = key.into();
    creators
        .iter()
        .map(|(name, creator)| {
            (
                name.clone(),
                wrap_action_creator(codec, Arc::clone(creator), key.clone()),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn action_of(item: Option<Dispatchable<()>>) -> Action {
        match item {
            Some(Dispatchable::Action(action)) => action,
            other => panic!("expected an action, got {other:?}"),
        }
    }

    #[test]
    fn wraps_single_type_and_keeps_payload() {
        let codec = KeyCodec::default();
        let wrapped = wrap_action(
            &codec,
            Action::new("T").with("dog", 7).with("cat", "Felix"),
            &"foo".into(),
        );
        assert_eq!(wrapped.kind(), codec.encode("T", &"foo".into()));
        assert_eq!(wrapped.field("dog"), Some(&json!(7)));
        assert_eq!(wrapped.field("cat"), Some(&json!("Felix")));
    }

    #[test]
    fn wraps_every_entry_of_types() {
        let codec = KeyCodec::default();
        let key: InstanceKey = "list".into();
        let wrapped = wrap_action(&codec, Action::multi(["LOAD", "LOAD_OK", "LOAD_FAIL"]), &key);
        assert_eq!(
            wrapped.types.unwrap(),
            vec![
                codec.encode("LOAD", &key),
                codec.encode("LOAD_OK", &key),
                codec.encode("LOAD_FAIL", &key),
            ]
        );
        assert_eq!(wrapped.kind, None);
    }

    #[test]
    fn missing_type_is_tagged_as_empty() {
        let codec = KeyCodec::default();
        let wrapped = wrap_action(&codec, Action::default(), &"k".into());
        assert_eq!(wrapped.kind(), codec.encode("", &"k".into()));
    }

    #[test]
    fn creator_result_is_tagged() {
        let codec = KeyCodec::default();
        let creator: ActionCreator<()> =
            action_creator(|_| Some(Action::new("T").with("dog", 7).into()));
        let wrapped = wrap_action_creator(&codec, creator, "foo");

        let action = action_of(wrapped(&[]));
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({ "type": codec.encode("T", &"foo".into()), "dog": 7 })
        );
    }

    #[test]
    fn creator_arguments_are_forwarded() {
        let codec = KeyCodec::default();
        let creator: ActionCreator<()> = action_creator(|args| {
            Some(Action::new("ADD").with("amount", args.first().cloned().unwrap_or(Value::Null)).into())
        });
        let action = action_of(wrap_action_creator(&codec, creator, "a")(&[json!(5)]));
        assert_eq!(action.field("amount"), Some(&json!(5)));
    }

    #[test]
    fn untyped_results_pass_through() {
        let codec = KeyCodec::default();
        let nothing: ActionCreator<()> = action_creator(|_| None);
        assert!(wrap_action_creator(&codec, nothing, "a")(&[]).is_none());

        let typeless: ActionCreator<()> =
            action_creator(|_| Some(Action::default().with("note", "x").into()));
        let action = action_of(wrap_action_creator(&codec, typeless, "a")(&[]));
        assert_eq!(action.kind, None);

        let deferred: ActionCreator<()> =
            action_creator(|_| Some(crate::dispatch::thunk(|_, _| {})));
        assert!(matches!(
            wrap_action_creator(&codec, deferred, "a")(&[]),
            Some(Dispatchable::Thunk(_))
        ));
    }

    #[test]
    fn raw_results_with_a_type_are_tagged() {
        let codec = KeyCodec::default();
        let creator: ActionCreator<()> =
            action_creator(|_| Some(json!({ "type": "T", "dog": 7 }).into()));

        let action = action_of(wrap_action_creator(&codec, creator, "foo")(&[]));
        assert_eq!(action.kind(), codec.encode("T", &"foo".into()));
        assert_eq!(action.field("dog"), Some(&json!(7)));
    }

    #[test]
    fn other_raw_results_pass_through() {
        let codec = KeyCodec::default();
        for raw in [json!("T"), json!(12), json!({ "dog": 7 }), json!({ "type": "" })] {
            let expected = raw.clone();
            let creator: ActionCreator<()> = action_creator(move |_| Some(raw.clone().into()));
            match wrap_action_creator(&codec, creator, "foo")(&[]) {
                Some(Dispatchable::Raw(value)) => assert_eq!(value, expected),
                other => panic!("expected the raw value back, got {other:?}"),
            }
        }
    }

    #[test]
    fn wraps_a_map_of_creators() {
        let codec = KeyCodec::default();
        let mut creators: BTreeMap<String, ActionCreator<()>> = BTreeMap::new();
        creators.insert(
            "a".into(),
            action_creator(|_| Some(Action::new("testaction").with("dog", 7).into())),
        );
        creators.insert(
            "b".into(),
            action_creator(|_| {
                Some(Action::new("testaction").with("age", 69).with("name", "Bobby Tables").into())
            }),
        );

        let wrapped = wrap_action_creators(&codec, &creators, "bar");
        assert_eq!(wrapped.keys().collect::<Vec<_>>(), vec!["a", "b"]);

        let b = action_of(wrapped["b"](&[]));
        assert_eq!(b.kind(), codec.encode("testaction", &"bar".into()));
        assert_eq!(b.field("name"), Some(&json!("Bobby Tables")));
    }
}
