//! Difficulty classification and review scheduling.
//!
//! Difficulty is a pure function of the counters; the next review time is
//! that difficulty's interval measured from the instant of recomputation.

use crate::constants::{
    EASY_INTERVAL_DAYS, EASY_STREAK_THRESHOLD, HARD_ERROR_THRESHOLD, HARD_INTERVAL_DAYS,
    MEDIUM_ERROR_THRESHOLD, MEDIUM_INTERVAL_DAYS,
};
use crate::record::{Difficulty, ProgressRecord};
use crate::time::{Timestamp, add_days};

/// First match wins: Hard, then Medium, else Easy.
pub fn classify(error_count: u32, correct_streak: u32) -> Difficulty {
    if error_count >= HARD_ERROR_THRESHOLD || correct_streak == 0 {
        Difficulty::Hard
    } else if error_count >= MEDIUM_ERROR_THRESHOLD || correct_streak < EASY_STREAK_THRESHOLD {
        Difficulty::Medium
    } else {
        Difficulty::Easy
    }
}

/// Days until the next review for a difficulty.
pub fn interval_days(difficulty: Difficulty) -> u64 {
    match difficulty {
        Difficulty::Easy => EASY_INTERVAL_DAYS,
        Difficulty::Medium => MEDIUM_INTERVAL_DAYS,
        Difficulty::Hard => HARD_INTERVAL_DAYS,
    }
}

/// Rewrite `difficulty` and `next_review_at` from the record's counters.
pub fn recompute(record: &mut ProgressRecord, now: Timestamp) {
    let difficulty = classify(record.error_count, record.correct_streak);
    record.difficulty = Some(difficulty);
    record.next_review_at = Some(add_days(now, interval_days(difficulty)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::SECS_PER_DAY;

    #[test]
    fn test_zero_streak_is_hard() {
        for errors in [0, 1, 2, 4, 5, 100] {
            assert_eq!(classify(errors, 0), Difficulty::Hard, "errors={errors}");
        }
    }

    #[test]
    fn test_many_errors_is_hard() {
        assert_eq!(classify(5, 10), Difficulty::Hard);
        assert_eq!(classify(9, 1), Difficulty::Hard);
    }

    #[test]
    fn test_medium_band() {
        assert_eq!(classify(0, 1), Difficulty::Medium);
        assert_eq!(classify(0, 2), Difficulty::Medium);
        assert_eq!(classify(2, 3), Difficulty::Medium);
        assert_eq!(classify(4, 10), Difficulty::Medium);
    }

    #[test]
    fn test_easy() {
        assert_eq!(classify(0, 3), Difficulty::Easy);
        assert_eq!(classify(1, 20), Difficulty::Easy);
    }

    #[test]
    fn test_intervals() {
        assert_eq!(interval_days(Difficulty::Easy), 7);
        assert_eq!(interval_days(Difficulty::Medium), 3);
        assert_eq!(interval_days(Difficulty::Hard), 1);
    }

    #[test]
    fn test_recompute_from_now() {
        let now = 1_000_000;
        let mut r = ProgressRecord {
            correct_streak: 4,
            ..ProgressRecord::new()
        };
        recompute(&mut r, now);
        assert_eq!(r.difficulty, Some(Difficulty::Easy));
        assert_eq!(r.next_review_at, Some(now + 7 * SECS_PER_DAY));

        // Same counters, later instant: same difficulty, later schedule
        recompute(&mut r, now + 60);
        assert_eq!(r.difficulty, Some(Difficulty::Easy));
        assert_eq!(r.next_review_at, Some(now + 60 + 7 * SECS_PER_DAY));
    }
}
