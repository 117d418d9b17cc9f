/// Seconds in one day.
pub const SECS_PER_DAY: u64 = 86_400;

/// Correct streak that promotes New → Learning.
pub const PROMOTE_TO_LEARNING_STREAK: u32 = 2;

/// Correct streak that promotes Learning → Mastered.
pub const PROMOTE_TO_MASTERED_STREAK: u32 = 5;

/// Cumulative errors that demote Mastered → Learning.
pub const DEMOTE_FROM_MASTERED_ERRORS: u32 = 3;

/// Cumulative errors that demote Learning → New.
pub const DEMOTE_FROM_LEARNING_ERRORS: u32 = 5;

/// Errors at or above this are always Hard.
pub const HARD_ERROR_THRESHOLD: u32 = 5;

/// Errors at or above this are at least Medium.
pub const MEDIUM_ERROR_THRESHOLD: u32 = 2;

/// A streak below this is at least Medium.
pub const EASY_STREAK_THRESHOLD: u32 = 3;

/// Review intervals in days per difficulty.
pub const EASY_INTERVAL_DAYS: u64 = 7;
pub const MEDIUM_INTERVAL_DAYS: u64 = 3;
pub const HARD_INTERVAL_DAYS: u64 = 1;

/// Priority score multipliers: weight(difficulty) * 10 + errors * 5
pub const DIFFICULTY_PRIORITY_FACTOR: u32 = 10;
pub const ERROR_PRIORITY_FACTOR: u32 = 5;

/// Category assigned to ids without a `<category>_` prefix.
pub const UNCATEGORIZED: &str = "uncategorized";
