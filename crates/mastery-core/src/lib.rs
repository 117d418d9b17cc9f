//! Three-tier spaced-repetition progress engine.
//!
//! Tracks each item's mastery tier (new → learning → mastered) from recall
//! outcomes, with separate promotion and demotion thresholds, derives a
//! difficulty and next review time, and ranks due items for review.
//!
//! Pure logic with no opinions about transport or persistence; the only
//! outside input is the wall clock read by `record_outcome`.

pub mod constants;
pub mod engine;
pub mod error;
pub mod item;
pub mod priority;
pub mod record;
pub mod schedule;
pub mod serde_compat;
pub mod session;
pub mod stats;
pub mod time;

pub use constants::SECS_PER_DAY;
pub use engine::ProgressEngine;
pub use error::EngineError;
pub use item::ItemId;
pub use priority::{ReviewQueueEntry, priority_score};
pub use record::{Difficulty, ProgressRecord, Tier, Transition};
pub use serde_compat::{CURRENT_VERSION, export_json, import_json};
pub use session::StudySession;
pub use stats::{StudyStats, Summary};
pub use time::{MAX_TIMESTAMP, Timestamp, iso8601_to_unix, now_unix_secs, unix_to_iso8601};
