//! JSON serde for the portable export format.
//!
//! The wire format uses camelCase field names, lowercase tier/difficulty
//! names, and ISO-8601 UTC strings for timestamps. Items are listed in
//! registration order so the review-queue tie-break survives a round trip.

use serde::{Deserialize, Serialize};

use crate::engine::ProgressEngine;
use crate::error::{EngineError, Result};
use crate::item::ItemId;
use crate::record::{Difficulty, ProgressRecord, Tier};
use crate::time::{Timestamp, iso8601_to_unix, now_unix_secs, unix_to_iso8601};

pub const CURRENT_VERSION: &str = "1.0";

// --- Wire format types ---

#[derive(Serialize, Deserialize, Debug)]
pub struct WireExport {
    pub version: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(rename = "longestStreak", default)]
    pub longest_streak: u32,
    pub items: Vec<WireItem>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct WireItem {
    pub id: ItemId,
    pub tier: Tier,
    #[serde(default)]
    pub error_count: u32,
    #[serde(default)]
    pub correct_streak: u32,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub next_review_at: Option<String>,
    #[serde(default)]
    pub last_seen_at: Option<String>,
}

// --- Conversion: Wire → Domain ---

impl WireExport {
    /// Convert wire format to a validated engine.
    pub fn into_engine(self) -> Result<ProgressEngine> {
        let records = self
            .items
            .into_iter()
            .map(|item| {
                let record = ProgressRecord {
                    tier: item.tier,
                    error_count: item.error_count,
                    correct_streak: item.correct_streak,
                    difficulty: item.difficulty,
                    next_review_at: parse_opt_ts(&item.id, item.next_review_at.as_deref())?,
                    last_seen_at: parse_opt_ts(&item.id, item.last_seen_at.as_deref())?,
                };
                Ok((item.id, record))
            })
            .collect::<Result<Vec<_>>>()?;

        ProgressEngine::from_records(records, self.longest_streak)
    }

    /// Create a wire export from an engine.
    pub fn from_engine(engine: &ProgressEngine) -> Self {
        let items = engine
            .iter()
            .map(|(id, r)| WireItem {
                id: id.clone(),
                tier: r.tier,
                error_count: r.error_count,
                correct_streak: r.correct_streak,
                difficulty: r.difficulty,
                next_review_at: r.next_review_at.map(unix_to_iso8601),
                last_seen_at: r.last_seen_at.map(unix_to_iso8601),
            })
            .collect();

        WireExport {
            version: CURRENT_VERSION.to_string(),
            timestamp: unix_to_iso8601(now_unix_secs()),
            longest_streak: engine.longest_streak(),
            items,
        }
    }
}

fn parse_opt_ts(id: &ItemId, value: Option<&str>) -> Result<Option<Timestamp>> {
    value
        .map(|s| {
            iso8601_to_unix(s).ok_or_else(|| {
                EngineError::InvalidState(format!("item {id} has invalid timestamp {s:?}"))
            })
        })
        .transpose()
}

/// Export engine state as pretty-printed JSON.
pub fn export_json(engine: &ProgressEngine) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&WireExport::from_engine(engine))
}

/// Import engine state from JSON.
pub fn import_json(json: &str) -> Result<ProgressEngine> {
    let wire: WireExport = serde_json::from_str(json)
        .map_err(|e| EngineError::InvalidState(format!("invalid JSON: {e}")))?;
    wire.into_engine()
}
