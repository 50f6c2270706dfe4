use std::env;

use typed_builder::TypedBuilder;

use crate::error::{MultireducerError, Result};
use crate::key::{InstanceKey, KeyCodec, DEFAULT_DELIMITER};

/// Configuration loaded from environment variables.
#[derive(Debug, Clone, TypedBuilder)]
pub struct Config {
    /// Delimiter between base action type and instance key.
    #[builder(default = DEFAULT_DELIMITER.to_string(), setter(into))]
    pub delimiter: String,

    /// Instance keys the demo wires up.
    #[builder(default = default_instances())]
    pub instances: Vec<InstanceKey>,
}

impl Config {
    /// Load from `MULTIREDUCER_DELIMITER` and `MULTIREDUCER_INSTANCES`
    /// (comma separated). Both are optional.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let delimiter =
            lookup("MULTIREDUCER_DELIMITER").unwrap_or_else(|| DEFAULT_DELIMITER.to_string());
        let instances = match lookup("MULTIREDUCER_INSTANCES") {
            Some(raw) => parse_instances(&raw)?,
            None => default_instances(),
        };
        Ok(Self {
            delimiter,
            instances,
        })
    }

    pub fn codec(&self) -> Result<KeyCodec> {
        KeyCodec::new(self.delimiter.clone())
    }
}

fn default_instances() -> Vec<InstanceKey> {
    ["a", "b", "c"].into_iter().map(InstanceKey::from).collect()
}

fn parse_instances(raw: &str) -> Result<Vec<InstanceKey>> {
    let keys: Vec<InstanceKey> = raw
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(InstanceKey::from)
        .collect();
    if keys.is_empty() {
        return Err(MultireducerError::Config(
            "MULTIREDUCER_INSTANCES must name at least one instance".to_string(),
        ));
    }
    Ok(keys)
}
