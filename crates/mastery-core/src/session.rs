use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::time::Timestamp;

/// One sitting of reviews, as reported by a presentation layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudySession {
    pub id: Uuid,
    pub started_at: Timestamp,
    pub ended_at: Option<Timestamp>,
    pub reviewed: u32,
    pub correct: u32,
}

impl StudySession {
    pub fn start(now: Timestamp) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: now,
            ended_at: None,
            reviewed: 0,
            correct: 0,
        }
    }

    pub fn note_outcome(&mut self, correct: bool) {
        self.reviewed += 1;
        if correct {
            self.correct += 1;
        }
    }

    /// Close the session. A clock that went backwards yields a zero-length session.
    pub fn finish(&mut self, now: Timestamp) {
        self.ended_at = Some(now.max(self.started_at));
    }

    pub fn duration_secs(&self) -> Option<u64> {
        self.ended_at.map(|end| end - self.started_at)
    }

    /// Fraction of reviews answered correctly, None before the first review.
    pub fn accuracy(&self) -> Option<f64> {
        (self.reviewed > 0).then(|| self.correct as f64 / self.reviewed as f64)
    }
}
