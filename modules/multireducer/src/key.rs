//! Instance keys and the codec that embeds them in action-type strings.
//!
//! A tagged type is `base + delimiter + key`. Decoding splits at the first
//! delimiter occurrence, so a key or base type that itself contains the
//! delimiter decodes ambiguously. Callers pick keys that avoid it.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MultireducerError, Result};

/// Reserved marker separating a base action type from its instance key.
pub const DEFAULT_DELIMITER: &str = "__@@MULTIREDUCER@@";

/// Caller-chosen identifier for one instance of a shared reducer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceKey(String);

impl InstanceKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InstanceKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for InstanceKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl Borrow<str> for InstanceKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for InstanceKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A tagged type split back into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedType {
    pub base_type: String,
    pub instance_key: InstanceKey,
}

/// Encodes and decodes instance keys using a fixed delimiter.
///
/// The codec is a plain value handed to every wrapper and combinator, so
/// composites with different delimiters can live side by side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCodec {
    delimiter: String,
}

impl KeyCodec {
    pub fn new(delimiter: impl Into<String>) -> Result<Self> {
        let delimiter = delimiter.into();
        if delimiter.is_empty() {
            return Err(MultireducerError::EmptyDelimiter);
        }
        Ok(Self { delimiter })
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// `base + delimiter + key`. No character validation.
    pub fn encode(&self, base_type: &str, key: &InstanceKey) -> String {
        let mut tagged =
            String::with_capacity(base_type.len() + self.delimiter.len() + key.as_str().len());
        tagged.push_str(base_type);
        tagged.push_str(&self.delimiter);
        tagged.push_str(key.as_str());
        tagged
    }

    /// Split at the first delimiter occurrence. `None` if there is none.
    pub fn decode(&self, tagged: &str) -> Option<DecodedType> {
        let (base, key) = tagged.split_once(self.delimiter.as_str())?;
        Some(DecodedType {
            base_type: base.to_string(),
            instance_key: InstanceKey::from(key),
        })
    }

    pub fn is_tagged(&self, action_type: &str) -> bool {
        action_type.contains(self.delimiter.as_str())
    }
}

impl Default for KeyCodec {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_string(),
        }
    }
}
