use serde::Serialize;

use crate::constants::{DIFFICULTY_PRIORITY_FACTOR, ERROR_PRIORITY_FACTOR};
use crate::item::ItemId;
use crate::record::ProgressRecord;
use crate::time::Timestamp;

/// A due item and the score that ranks it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReviewQueueEntry {
    pub item: ItemId,
    pub priority: u32,
}

/// `weight(difficulty) * 10 + errors * 5`, saturating at `u32::MAX`.
/// Unscheduled records score 0.
pub fn priority_score(record: &ProgressRecord) -> u32 {
    let weight = record.difficulty.map(|d| d.weight()).unwrap_or(0);
    (weight * DIFFICULTY_PRIORITY_FACTOR)
        .saturating_add(record.error_count.saturating_mul(ERROR_PRIORITY_FACTOR))
}

/// Due records ranked by descending priority. The sort is stable, so equal
/// scores keep the order in which `records` yields them.
pub fn review_queue<'a>(
    records: impl IntoIterator<Item = (&'a ItemId, &'a ProgressRecord)>,
    now: Timestamp,
) -> Vec<ReviewQueueEntry> {
    let mut queue: Vec<ReviewQueueEntry> = records
        .into_iter()
        .filter(|(_, record)| record.is_due(now))
        .map(|(item, record)| ReviewQueueEntry {
            item: item.clone(),
            priority: priority_score(record),
        })
        .collect();

    queue.sort_by(|a, b| b.priority.cmp(&a.priority));
    queue
}
