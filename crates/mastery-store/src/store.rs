use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use mastery_core::{
    Difficulty, ItemId, ProgressEngine, ProgressRecord, StudySession, StudyStats, Tier,
};

use crate::error::{Result, StoreError};
use crate::schema;

const LONGEST_STREAK_KEY: &str = "longest_streak";

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        tracing::debug!(path = %path.display(), "opened store");
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // --- Metadata ---

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM metadata WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        set_metadata_on(&self.conn, key, value)
    }

    // --- Save ---

    /// Replace every stored item with the engine's records, in registration order.
    pub fn save_engine(&self, engine: &ProgressEngine) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM items", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO items (id, position, tier, error_count, correct_streak,
                                    difficulty, next_review_at, last_seen_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for (position, (id, record)) in engine.iter().enumerate() {
                stmt.execute(params![
                    id.as_str(),
                    position as i64,
                    record.tier.as_str(),
                    record.error_count,
                    record.correct_streak,
                    record.difficulty.map(|d| d.as_str()),
                    record.next_review_at,
                    record.last_seen_at,
                ])?;
            }
        }
        set_metadata_on(&tx, LONGEST_STREAK_KEY, &engine.longest_streak().to_string())?;
        tx.commit()?;

        tracing::debug!(items = engine.len(), "saved engine");
        Ok(())
    }

    /// Upsert one item after an outcome. New ids are appended after every
    /// stored position; existing ids keep theirs.
    pub fn save_record(&self, engine: &ProgressEngine, item_id: &str) -> Result<()> {
        let record = engine
            .record(item_id)
            .ok_or_else(|| StoreError::InvalidData(format!("item not tracked: {item_id}")))?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO items (id, position, tier, error_count, correct_streak,
                                difficulty, next_review_at, last_seen_at)
             VALUES (?1, (SELECT COALESCE(MAX(position) + 1, 0) FROM items),
                     ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                 tier = excluded.tier,
                 error_count = excluded.error_count,
                 correct_streak = excluded.correct_streak,
                 difficulty = excluded.difficulty,
                 next_review_at = excluded.next_review_at,
                 last_seen_at = excluded.last_seen_at",
            params![
                item_id,
                record.tier.as_str(),
                record.error_count,
                record.correct_streak,
                record.difficulty.map(|d| d.as_str()),
                record.next_review_at,
                record.last_seen_at,
            ],
        )?;
        set_metadata_on(&tx, LONGEST_STREAK_KEY, &engine.longest_streak().to_string())?;
        tx.commit()?;
        Ok(())
    }

    // --- Load ---

    pub fn load_engine(&self) -> Result<ProgressEngine> {
        let longest_streak = match self.get_metadata(LONGEST_STREAK_KEY)? {
            Some(v) => v.parse::<u32>().map_err(|e| {
                StoreError::InvalidData(format!("invalid longest_streak '{v}': {e}"))
            })?,
            None => 0,
        };

        let mut stmt = self.conn.prepare(
            "SELECT id, tier, error_count, correct_streak, difficulty, next_review_at, last_seen_at
             FROM items ORDER BY position",
        )?;
        let rows: Vec<ItemRow> = stmt
            .query_map([], ItemRow::from_row)?
            .collect::<std::result::Result<_, _>>()?;

        let records = rows
            .into_iter()
            .map(ItemRow::into_record)
            .collect::<Result<Vec<_>>>()?;

        let engine = ProgressEngine::from_records(records, longest_streak)?;
        tracing::debug!(items = engine.len(), "loaded engine");
        Ok(engine)
    }

    // --- Study sessions ---

    pub fn insert_session(&self, session: &StudySession) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sessions (id, started_at, ended_at, reviewed, correct)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                session.id.to_string(),
                session.started_at,
                session.ended_at,
                session.reviewed,
                session.correct,
            ],
        )?;
        Ok(())
    }

    /// Write the closing counters of a session previously inserted.
    pub fn finish_session(&self, session: &StudySession) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE sessions SET ended_at = ?1, reviewed = ?2, correct = ?3 WHERE id = ?4",
            params![
                session.ended_at,
                session.reviewed,
                session.correct,
                session.id.to_string(),
            ],
        )?;
        if rows == 0 {
            return Err(StoreError::InvalidData(format!(
                "session not found: {}",
                session.id
            )));
        }
        Ok(())
    }

    pub fn load_sessions(&self) -> Result<Vec<StudySession>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, ended_at, reviewed, correct
             FROM sessions ORDER BY started_at, rowid",
        )?;
        let rows: Vec<(String, u64, Option<u64>, u32, u32)> = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                ))
            })?
            .collect::<std::result::Result<_, _>>()?;

        rows.into_iter()
            .map(|(id, started_at, ended_at, reviewed, correct)| {
                Ok(StudySession {
                    id: parse_uuid(&id)?,
                    started_at,
                    ended_at,
                    reviewed,
                    correct,
                })
            })
            .collect()
    }

    pub fn study_stats(&self) -> Result<StudyStats> {
        let sessions = self.load_sessions()?;
        let longest_streak = self
            .get_metadata(LONGEST_STREAK_KEY)?
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        Ok(StudyStats::compute(&sessions, longest_streak))
    }

    // --- Maintenance ---

    /// Fold the WAL back into the main database file and truncate it.
    pub fn checkpoint_truncate(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        if let Err(e) = self.checkpoint_truncate() {
            tracing::warn!("WAL checkpoint on close failed: {e}");
        }
    }
}

fn set_metadata_on(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        params![key, value],
    )?;
    Ok(())
}

struct ItemRow {
    id: String,
    tier: String,
    error_count: u32,
    correct_streak: u32,
    difficulty: Option<String>,
    next_review_at: Option<u64>,
    last_seen_at: Option<u64>,
}

impl ItemRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            tier: row.get(1)?,
            error_count: row.get(2)?,
            correct_streak: row.get(3)?,
            difficulty: row.get(4)?,
            next_review_at: row.get(5)?,
            last_seen_at: row.get(6)?,
        })
    }

    fn into_record(self) -> Result<(ItemId, ProgressRecord)> {
        let id = ItemId::parse(&self.id)?;
        let tier = Tier::parse(&self.tier).ok_or_else(|| {
            StoreError::InvalidData(format!("item {id} has unknown tier '{}'", self.tier))
        })?;
        let difficulty = self
            .difficulty
            .as_deref()
            .map(|d| {
                Difficulty::parse(d).ok_or_else(|| {
                    StoreError::InvalidData(format!("item {id} has unknown difficulty '{d}'"))
                })
            })
            .transpose()?;

        let record = ProgressRecord {
            tier,
            error_count: self.error_count,
            correct_streak: self.correct_streak,
            difficulty,
            next_review_at: self.next_review_at,
            last_seen_at: self.last_seen_at,
        };
        Ok((id, record))
    }
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| StoreError::InvalidData(format!("invalid UUID '{s}': {e}")))
}
