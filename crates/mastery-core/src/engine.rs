use std::collections::{BTreeMap, HashMap};

use crate::error::{EngineError, Result};
use crate::item::ItemId;
use crate::priority::{self, ReviewQueueEntry};
use crate::record::{Difficulty, ProgressRecord, Tier, Transition};
use crate::schedule;
use crate::stats::{self, Summary};
use crate::time::{Timestamp, now_unix_secs};

/// Owns every `ProgressRecord` for one learner/deck.
///
/// Records are kept in first-registration order, which is also the
/// tie-break order of the review queue. `index` maps ids to positions in
/// `records` and is rebuilt whenever records are replaced wholesale.
/// All mutation goes through `record_outcome*`.
#[derive(Clone, Debug, Default)]
pub struct ProgressEngine {
    records: Vec<(ItemId, ProgressRecord)>,
    index: HashMap<ItemId, usize>,
    longest_streak: u32,
}

impl ProgressEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild an engine from persisted records (in registration order).
    ///
    /// Rejects duplicate ids and records whose derived fields disagree with
    /// their counters, since those could not have come from `record_outcome`.
    pub fn from_records(
        records: Vec<(ItemId, ProgressRecord)>,
        longest_streak: u32,
    ) -> Result<Self> {
        for (id, record) in &records {
            validate_record(id, record)?;
        }

        let mut engine = Self {
            records,
            index: HashMap::new(),
            longest_streak,
        };
        engine.rebuild_index()?;
        engine.longest_streak = engine
            .records
            .iter()
            .map(|(_, r)| r.correct_streak)
            .fold(longest_streak, u32::max);
        Ok(engine)
    }

    fn rebuild_index(&mut self) -> Result<()> {
        self.index.clear();
        for (pos, (id, _)) in self.records.iter().enumerate() {
            if self.index.insert(id.clone(), pos).is_some() {
                return Err(EngineError::InvalidState(format!("duplicate item id: {id}")));
            }
        }
        Ok(())
    }

    /// Get-or-create: unseen ids are registered as New with zero counters.
    fn entry(&mut self, id: ItemId) -> &mut ProgressRecord {
        let pos = match self.index.get(&id) {
            Some(&pos) => pos,
            None => {
                let pos = self.records.len();
                self.index.insert(id.clone(), pos);
                self.records.push((id, ProgressRecord::new()));
                pos
            }
        };
        &mut self.records[pos].1
    }

    /// Record a recall outcome at the current wall-clock time.
    pub fn record_outcome(&mut self, item_id: &str, correct: bool) -> Result<Option<Transition>> {
        self.record_outcome_at(item_id, correct, now_unix_secs())
    }

    /// Record a recall outcome observed at `now`. Returns the tier change, if any.
    pub fn record_outcome_at(
        &mut self,
        item_id: &str,
        correct: bool,
        now: Timestamp,
    ) -> Result<Option<Transition>> {
        let id = ItemId::parse(item_id)?;
        let record = self.entry(id);
        let transition = record.apply_outcome(correct, now);
        let streak = record.correct_streak;
        self.longest_streak = self.longest_streak.max(streak);
        Ok(transition)
    }

    /// Read-only lookup; never registers the id.
    pub fn record(&self, item_id: &str) -> Option<&ProgressRecord> {
        self.index.get(item_id).map(|&pos| &self.records[pos].1)
    }

    /// New for any id never passed to `record_outcome`.
    pub fn get_tier(&self, item_id: &str) -> Tier {
        self.record(item_id).map(|r| r.tier).unwrap_or_default()
    }

    pub fn get_difficulty(&self, item_id: &str) -> Option<Difficulty> {
        self.record(item_id).and_then(|r| r.difficulty)
    }

    pub fn get_next_review_at(&self, item_id: &str) -> Option<Timestamp> {
        self.record(item_id).and_then(|r| r.next_review_at)
    }

    /// Ids due at `now`, highest priority first.
    pub fn due_items(&self, now: Timestamp) -> Vec<ItemId> {
        self.review_queue(now)
            .into_iter()
            .map(|entry| entry.item)
            .collect()
    }

    /// Due entries with their priority scores.
    pub fn review_queue(&self, now: Timestamp) -> Vec<ReviewQueueEntry> {
        priority::review_queue(self.iter(), now)
    }

    pub fn summary(&self) -> Summary {
        Summary::from_tiers(self.records.iter().map(|(_, r)| r.tier))
    }

    pub fn category_summary(&self) -> BTreeMap<String, Summary> {
        stats::category_summaries(self.iter())
    }

    /// Highest correct streak any item has reached.
    pub fn longest_streak(&self) -> u32 {
        self.longest_streak
    }

    /// Records in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&ItemId, &ProgressRecord)> {
        self.records.iter().map(|(id, r)| (id, r))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn validate_record(id: &ItemId, record: &ProgressRecord) -> Result<()> {
    match (record.difficulty, record.next_review_at) {
        (None, None) => {
            if record.error_count > 0 || record.correct_streak > 0 {
                return Err(EngineError::InvalidState(format!(
                    "item {id} has counters but no schedule"
                )));
            }
        }
        (Some(difficulty), Some(_)) => {
            let expected = schedule::classify(record.error_count, record.correct_streak);
            if difficulty != expected {
                return Err(EngineError::InvalidState(format!(
                    "item {id} has difficulty {difficulty}, counters imply {expected}"
                )));
            }
        }
        _ => {
            return Err(EngineError::InvalidState(format!(
                "item {id} has only one of difficulty/next_review_at"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::SECS_PER_DAY;

    const T0: Timestamp = 1_771_632_000;

    #[test]
    fn test_empty_engine() {
        let engine = ProgressEngine::new();
        assert!(engine.is_empty());
        assert_eq!(engine.summary(), Summary::default());
        assert!(engine.due_items(u64::MAX).is_empty());
        assert_eq!(engine.longest_streak(), 0);
    }

    #[test]
    fn test_record_registers_lazily() {
        let mut engine = ProgressEngine::new();
        assert_eq!(engine.get_tier("x"), Tier::New);
        assert!(engine.record("x").is_none(), "get_tier must not register");
        assert_eq!(engine.len(), 0);

        engine.record_outcome_at("x", true, T0).unwrap();
        assert_eq!(engine.len(), 1);
        assert!(engine.record("x").is_some());
    }

    #[test]
    fn test_invalid_id_rejected_without_side_effects() {
        let mut engine = ProgressEngine::new();
        let err = engine.record_outcome_at("", true, T0).unwrap_err();
        assert_eq!(err, EngineError::InvalidItemId(String::new()));
        assert!(engine.is_empty());
    }

    #[test]
    fn test_getters_before_and_after_schedule() {
        let mut engine = ProgressEngine::new();
        assert_eq!(engine.get_difficulty("w"), None);
        assert_eq!(engine.get_next_review_at("w"), None);

        engine.record_outcome_at("w", false, T0).unwrap();
        assert_eq!(engine.get_difficulty("w"), Some(Difficulty::Hard));
        assert_eq!(engine.get_next_review_at("w"), Some(T0 + SECS_PER_DAY));
    }

    #[test]
    fn test_due_items_uses_insertion_tiebreak() {
        let mut engine = ProgressEngine::new();
        for id in ["b", "a", "c"] {
            engine.record_outcome_at(id, false, T0).unwrap();
        }
        let due = engine.due_items(T0 + SECS_PER_DAY);
        let order: Vec<&str> = due.iter().map(|i| i.as_str()).collect();
        assert_eq!(order, vec!["b", "a", "c"]);
        assert!(engine.due_items(T0 + SECS_PER_DAY - 1).is_empty());
    }

    #[test]
    fn test_longest_streak_survives_reset() {
        let mut engine = ProgressEngine::new();
        for _ in 0..4 {
            engine.record_outcome_at("x", true, T0).unwrap();
        }
        engine.record_outcome_at("x", false, T0).unwrap();
        engine.record_outcome_at("y", true, T0).unwrap();
        assert_eq!(engine.longest_streak(), 4);
    }

    #[test]
    fn test_from_records_roundtrip_preserves_order() {
        let mut engine = ProgressEngine::new();
        for id in ["z", "m", "a"] {
            engine.record_outcome_at(id, true, T0).unwrap();
        }
        let records: Vec<_> = engine.iter().map(|(i, r)| (i.clone(), r.clone())).collect();
        let rebuilt = ProgressEngine::from_records(records, engine.longest_streak()).unwrap();

        let ids: Vec<&str> = rebuilt.iter().map(|(i, _)| i.as_str()).collect();
        assert_eq!(ids, vec!["z", "m", "a"]);
        assert_eq!(rebuilt.get_tier("m"), Tier::New);
        assert_eq!(rebuilt.due_items(T0 + 3 * SECS_PER_DAY), engine.due_items(T0 + 3 * SECS_PER_DAY));
    }

    #[test]
    fn test_from_records_rejects_duplicates() {
        let id = ItemId::parse("dup").unwrap();
        let records = vec![
            (id.clone(), ProgressRecord::new()),
            (id, ProgressRecord::new()),
        ];
        assert!(matches!(
            ProgressEngine::from_records(records, 0),
            Err(EngineError::InvalidState(_))
        ));
    }

    #[test]
    fn test_from_records_rejects_inconsistent_difficulty() {
        let record = ProgressRecord {
            correct_streak: 0,
            difficulty: Some(Difficulty::Easy),
            next_review_at: Some(T0),
            last_seen_at: Some(T0),
            ..ProgressRecord::new()
        };
        let result = ProgressEngine::from_records(vec![(ItemId::parse("x").unwrap(), record)], 0);
        assert!(matches!(result, Err(EngineError::InvalidState(_))));
    }

    #[test]
    fn test_from_records_rejects_half_schedule() {
        let record = ProgressRecord {
            difficulty: Some(Difficulty::Hard),
            ..ProgressRecord::new()
        };
        let result = ProgressEngine::from_records(vec![(ItemId::parse("x").unwrap(), record)], 0);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_records_lifts_longest_streak() {
        let record = ProgressRecord {
            correct_streak: 6,
            difficulty: Some(Difficulty::Easy),
            next_review_at: Some(T0),
            ..ProgressRecord::new()
        };
        let engine =
            ProgressEngine::from_records(vec![(ItemId::parse("x").unwrap(), record)], 2).unwrap();
        assert_eq!(engine.longest_streak(), 6);
    }

    #[test]
    fn test_independent_instances() {
        let mut a = ProgressEngine::new();
        let b = ProgressEngine::new();
        a.record_outcome_at("x", true, T0).unwrap();
        a.record_outcome_at("x", true, T0).unwrap();
        assert_eq!(a.get_tier("x"), Tier::Learning);
        assert_eq!(b.get_tier("x"), Tier::New);
    }
}
