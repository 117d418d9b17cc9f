use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, StoreError};

pub const CONFIG_FILE: &str = "config.toml";
pub const DEFAULT_SESSION_LIMIT: usize = 20;

/// Optional `<base>/config.toml`. Every key may be omitted.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Deck used when no `--deck` is given.
    pub default_deck: Option<String>,
    /// Most items shown in one interactive review.
    pub session_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_deck: None,
            session_limit: DEFAULT_SESSION_LIMIT,
        }
    }
}

impl Config {
    /// Load from `<base_dir>/config.toml`; a missing file yields defaults.
    pub fn load(base_dir: &Path) -> Result<Self> {
        let path = base_dir.join(CONFIG_FILE);
        match fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content)
                .map_err(|e| StoreError::Config(format!("{}: {e}", path.display()))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(StoreError::Config(format!(
                "failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
