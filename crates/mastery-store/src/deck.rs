use std::path::{Path, PathBuf};
use std::{env, fs};

use mastery_core::ProgressEngine;

use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::store::Store;

pub const DEFAULT_DECK: &str = "default";

/// `~/.mastery`, falling back to the working directory without a home.
pub fn default_base_dir() -> PathBuf {
    dirs_home().join(".mastery")
}

fn dirs_home() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Map a deck name onto `[A-Za-z0-9_-]` for use as a filename.
pub fn sanitize_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Explicit name, else the configured default, else `default`.
fn resolve_deck_id(deck: Option<&str>, config: &Config) -> String {
    [deck, config.default_deck.as_deref()]
        .into_iter()
        .flatten()
        .map(sanitize_name)
        .find(|n| !n.is_empty())
        .unwrap_or_else(|| DEFAULT_DECK.to_string())
}

/// One named deck under the data directory.
///
/// Layout:
/// ```text
/// ~/.mastery/
/// ├── config.toml
/// └── decks/
///     ├── default.db
///     └── <deck>.db
/// ```
pub struct DeckStore {
    store: Store,
    deck_id: String,
    config: Config,
}

impl DeckStore {
    /// Open (creating directories as needed) the deck's database.
    /// `base_dir` overrides `~/.mastery`.
    pub fn open(deck: Option<&str>, base_dir: Option<&Path>) -> Result<Self> {
        let base = base_dir.map(PathBuf::from).unwrap_or_else(default_base_dir);
        let decks_dir = base.join("decks");
        fs::create_dir_all(&decks_dir).map_err(|e| {
            StoreError::InvalidData(format!("failed to create {}: {e}", decks_dir.display()))
        })?;

        let config = Config::load(&base)?;
        let deck_id = resolve_deck_id(deck, &config);
        let store = Store::open(&decks_dir.join(format!("{deck_id}.db")))?;
        tracing::info!(deck = %deck_id, "opened deck");

        Ok(Self {
            store,
            deck_id,
            config,
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            store: Store::open_in_memory()?,
            deck_id: "test".to_string(),
            config: Config::default(),
        })
    }

    pub fn deck_id(&self) -> &str {
        &self.deck_id
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn load_engine(&self) -> Result<ProgressEngine> {
        self.store.load_engine()
    }

    pub fn save_engine(&self, engine: &ProgressEngine) -> Result<()> {
        self.store.save_engine(engine)
    }
}
