pub mod config;
pub mod deck;
pub mod error;
pub mod json_bridge;
pub mod schema;
pub mod store;

pub use config::Config;
pub use deck::{DeckStore, default_base_dir, sanitize_name};
pub use error::{Result, StoreError};
pub use store::Store;
