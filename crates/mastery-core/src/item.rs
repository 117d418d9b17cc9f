use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::UNCATEGORIZED;
use crate::error::{EngineError, Result};

/// Stable, validated identifier of a trackable item (e.g. `verbs_たべます`).
///
/// Opaque to the engine apart from the optional `<category>_` prefix used
/// for per-category reporting.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn parse(id: &str) -> Result<Self> {
        if is_valid_id(id) {
            Ok(Self(id.to_string()))
        } else {
            Err(EngineError::InvalidItemId(id.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Text before the first `_`, or `uncategorized`.
    pub fn category(&self) -> &str {
        match self.0.split_once('_') {
            Some((prefix, _)) if !prefix.is_empty() => prefix,
            _ => UNCATEGORIZED,
        }
    }
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.trim() == id && !id.chars().any(char::is_control)
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ItemId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ItemId::parse(&raw).map_err(serde::de::Error::custom)
    }
}
