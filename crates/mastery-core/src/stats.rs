use std::collections::BTreeMap;

use serde::Serialize;

use crate::item::ItemId;
use crate::record::{ProgressRecord, Tier};
use crate::session::StudySession;

/// Tier partition sizes and overall progress.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub new_count: usize,
    pub learning_count: usize,
    pub mastered_count: usize,
    pub total: usize,
    /// round((learning + mastered) / total * 100), 0 when empty.
    pub progress_percent: u32,
}

impl Summary {
    pub fn from_tiers(tiers: impl IntoIterator<Item = Tier>) -> Self {
        let mut summary = Summary::default();
        for tier in tiers {
            summary.add(tier);
        }
        summary.finish()
    }

    fn add(&mut self, tier: Tier) {
        match tier {
            Tier::New => self.new_count += 1,
            Tier::Learning => self.learning_count += 1,
            Tier::Mastered => self.mastered_count += 1,
        }
    }

    fn finish(mut self) -> Self {
        self.total = self.new_count + self.learning_count + self.mastered_count;
        self.progress_percent = if self.total > 0 {
            let seen = (self.learning_count + self.mastered_count) as f64;
            (seen / self.total as f64 * 100.0).round() as u32
        } else {
            0
        };
        self
    }
}

/// One `Summary` per item category, keyed by category name.
pub fn category_summaries<'a>(
    records: impl IntoIterator<Item = (&'a ItemId, &'a ProgressRecord)>,
) -> BTreeMap<String, Summary> {
    let mut by_category: BTreeMap<String, Summary> = BTreeMap::new();
    for (id, record) in records {
        by_category
            .entry(id.category().to_string())
            .or_default()
            .add(record.tier);
    }
    by_category
        .into_iter()
        .map(|(category, summary)| (category, summary.finish()))
        .collect()
}

/// Aggregate study-time figures across finished sessions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyStats {
    pub total_sessions: usize,
    pub total_study_secs: u64,
    pub average_session_secs: f64,
    pub longest_streak: u32,
}

impl StudyStats {
    /// Unfinished sessions are ignored.
    pub fn compute(sessions: &[StudySession], longest_streak: u32) -> Self {
        let durations: Vec<u64> = sessions.iter().filter_map(|s| s.duration_secs()).collect();
        let total_study_secs: u64 = durations.iter().sum();
        let average_session_secs = if durations.is_empty() {
            0.0
        } else {
            total_study_secs as f64 / durations.len() as f64
        };
        Self {
            total_sessions: durations.len(),
            total_study_secs,
            average_session_secs,
            longest_streak,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_summary() {
        let s = Summary::from_tiers([]);
        assert_eq!(s, Summary::default());
        assert_eq!(s.progress_percent, 0);
    }

    #[test]
    fn test_one_of_each_rounds_up() {
        let s = Summary::from_tiers([Tier::New, Tier::Learning, Tier::Mastered]);
        assert_eq!(s.new_count, 1);
        assert_eq!(s.learning_count, 1);
        assert_eq!(s.mastered_count, 1);
        assert_eq!(s.total, 3);
        assert_eq!(s.progress_percent, 67);
    }

    #[test]
    fn test_half_rounds_up() {
        let s = Summary::from_tiers([Tier::New, Tier::Mastered]);
        assert_eq!(s.progress_percent, 50);
        let s = Summary::from_tiers([Tier::New; 7].into_iter().chain([Tier::Learning]));
        // 1/8 = 12.5% -> 13
        assert_eq!(s.progress_percent, 13);
    }

    #[test]
    fn test_all_new_is_zero_percent() {
        let s = Summary::from_tiers([Tier::New; 4]);
        assert_eq!(s.total, 4);
        assert_eq!(s.progress_percent, 0);
    }

    #[test]
    fn test_category_summaries() {
        let ids: Vec<ItemId> = ["verbs_a", "verbs_b", "nouns_c", "loose"]
            .iter()
            .map(|s| ItemId::parse(s).unwrap())
            .collect();
        let learning = ProgressRecord {
            tier: Tier::Learning,
            ..ProgressRecord::new()
        };
        let fresh = ProgressRecord::new();
        let records = [
            (&ids[0], &learning),
            (&ids[1], &fresh),
            (&ids[2], &fresh),
            (&ids[3], &learning),
        ];

        let cats = category_summaries(records);
        let names: Vec<&str> = cats.keys().map(|k| k.as_str()).collect();
        assert_eq!(names, vec!["nouns", "uncategorized", "verbs"]);
        assert_eq!(cats["verbs"].total, 2);
        assert_eq!(cats["verbs"].progress_percent, 50);
        assert_eq!(cats["nouns"].progress_percent, 0);
        assert_eq!(cats["uncategorized"].learning_count, 1);
    }

    #[test]
    fn test_study_stats() {
        let mut a = StudySession::start(1_000);
        a.finish(1_600);
        let mut b = StudySession::start(2_000);
        b.finish(2_200);
        let open = StudySession::start(3_000);

        let stats = StudyStats::compute(&[a, b, open], 7);
        assert_eq!(stats.total_sessions, 2);
        assert_eq!(stats.total_study_secs, 800);
        assert!((stats.average_session_secs - 400.0).abs() < 1e-9);
        assert_eq!(stats.longest_streak, 7);
    }

    #[test]
    fn test_study_stats_empty() {
        let stats = StudyStats::compute(&[], 0);
        assert_eq!(stats, StudyStats::default());
    }
}
