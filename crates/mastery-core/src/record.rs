use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEMOTE_FROM_LEARNING_ERRORS, DEMOTE_FROM_MASTERED_ERRORS, PROMOTE_TO_LEARNING_STREAK,
    PROMOTE_TO_MASTERED_STREAK,
};
use crate::schedule;
use crate::time::Timestamp;

/// Mastery tier. Every tracked item is in exactly one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    New,
    Learning,
    Mastered,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::New => "new",
            Tier::Learning => "learning",
            Tier::Mastered => "mastered",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(Tier::New),
            "learning" => Some(Tier::Learning),
            "mastered" => Some(Tier::Mastered),
            _ => None,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Review difficulty, derived from error count and streak.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Priority weight: Easy=1, Medium=2, Hard=3.
    pub fn weight(&self) -> u32 {
        match self {
            Difficulty::Easy => 1,
            Difficulty::Medium => 2,
            Difficulty::Hard => 3,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tier change caused by one outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub from: Tier,
    pub to: Tier,
}

impl Transition {
    pub fn is_promotion(&self) -> bool {
        matches!(
            (self.from, self.to),
            (Tier::New, Tier::Learning) | (Tier::Learning, Tier::Mastered)
        )
    }
}

/// Per-item progress state.
///
/// `difficulty` and `next_review_at` are both None until the first outcome
/// and both Some afterwards; they are only written by `schedule::recompute`.
/// Counters survive tier changes, which gives promotion and demotion
/// different effective thresholds.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub tier: Tier,
    pub error_count: u32,
    pub correct_streak: u32,
    pub difficulty: Option<Difficulty>,
    pub next_review_at: Option<Timestamp>,
    pub last_seen_at: Option<Timestamp>,
}

impl ProgressRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one recall outcome observed at `now`, then reschedule.
    /// At most one tier transition fires, judged against the tier held
    /// before the call.
    pub fn apply_outcome(&mut self, correct: bool, now: Timestamp) -> Option<Transition> {
        let from = self.tier;
        let to = if correct {
            self.correct_streak = self.correct_streak.saturating_add(1);
            match from {
                Tier::New if self.correct_streak >= PROMOTE_TO_LEARNING_STREAK => Tier::Learning,
                Tier::Learning if self.correct_streak >= PROMOTE_TO_MASTERED_STREAK => {
                    Tier::Mastered
                }
                _ => from,
            }
        } else {
            self.error_count = self.error_count.saturating_add(1);
            self.correct_streak = 0;
            match from {
                Tier::Mastered if self.error_count >= DEMOTE_FROM_MASTERED_ERRORS => Tier::Learning,
                Tier::Learning if self.error_count >= DEMOTE_FROM_LEARNING_ERRORS => Tier::New,
                _ => from,
            }
        };
        self.tier = to;
        self.last_seen_at = Some(now);
        schedule::recompute(self, now);

        (from != to).then_some(Transition { from, to })
    }

    pub fn is_scheduled(&self) -> bool {
        self.next_review_at.is_some()
    }

    pub fn is_due(&self, now: Timestamp) -> bool {
        self.next_review_at.is_some_and(|at| at <= now)
    }
}
