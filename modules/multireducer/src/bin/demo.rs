//! Counter widgets sharing one reducer, one store, one instance key each.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use multireducer::{
    action_creator, bind_action_creators, reducer_fn, thunk, Action, ActionCreator,
    CompositeState, Config, Dispatch, Dispatcher, GetState, Multireducer, Reducer, Store,
};

#[derive(Debug, Clone, Default, Serialize)]
struct Counter {
    count: i64,
}

type Counters = Arc<CompositeState<Counter>>;

fn counter() -> impl Reducer<Counter> {
    reducer_fn(|state: &Counter, action: &Action| match action.kind() {
        "INCREMENT" => Counter {
            count: state.count + 1,
        },
        "DECREMENT" => Counter {
            count: state.count - 1,
        },
        _ => state.clone(),
    })
}

fn creators() -> BTreeMap<String, ActionCreator<Counters>> {
    let mut creators: BTreeMap<String, ActionCreator<Counters>> = BTreeMap::new();
    creators.insert(
        "increment".into(),
        action_creator(|_| Some(Action::new("INCREMENT").into())),
    );
    creators.insert(
        "decrement".into(),
        action_creator(|_| Some(Action::new("DECREMENT").into())),
    );
    // Waits `args[0]` milliseconds on the runtime, then increments twice
    // through a nested thunk.
    creators.insert(
        "increment_later".into(),
        action_creator(|args: &[Value]| {
            let delay = args.first().and_then(Value::as_u64).unwrap_or(50);
            Some(thunk(move |dispatch: Dispatcher<Counters>, _: GetState<Counters>| {
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    dispatch.dispatch(thunk(|inner: Dispatcher<Counters>, _| {
                        inner.dispatch(Action::new("INCREMENT").into());
                        inner.dispatch(Action::new("INCREMENT").into());
                    }));
                });
            }))
        }),
    );
    creators
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("multireducer=info".parse()?),
        )
        .init();

    let config = Config::from_env()?;
    let codec = config.codec()?;

    let shared: Arc<dyn Reducer<Counter>> = Arc::new(counter());
    let counters = Multireducer::builder()
        .codec(codec.clone())
        .instances(config.instances.iter().cloned(), shared)
        .build();
    let store: Store<Counters> = Store::new(counters);

    let (tx, mut rx) = mpsc::unbounded_channel::<Counters>();
    let subscription = store.subscribe(move |state: &Counters| {
        if tx.send(Arc::clone(state)).is_err() {
            debug!("state receiver closed");
        }
    });

    let creators = creators();
    let bound: Vec<_> = config
        .instances
        .iter()
        .map(|key| {
            (
                key.clone(),
                bind_action_creators(&codec, &creators, key.clone(), store.dispatcher()),
            )
        })
        .collect();

    for (i, (key, actions)) in bound.iter().enumerate() {
        for _ in 0..=i {
            actions["increment"](&[]);
        }
        info!(instance = %key, "incremented {} time(s)", i + 1);
    }

    let Some((first, actions)) = bound.first() else {
        bail!("no instances configured");
    };
    actions["decrement"](&[]);
    actions["increment_later"](&[Value::from(20)]);

    let before = store.state().get(first.as_str()).map(|c| c.count).unwrap_or(0);
    let wait = async {
        while let Some(state) = rx.recv().await {
            let now = state.get(first.as_str()).map(|c| c.count).unwrap_or(0);
            if now >= before + 2 {
                break;
            }
        }
    };
    let waited = tokio::time::timeout(Duration::from_secs(2), wait).await;
    store.unsubscribe(subscription);
    waited?;
    info!(instance = %first, "deferred increments arrived");

    println!("{}", serde_json::to_string_pretty(&*store.state())?);
    Ok(())
}
