//! Cross-turn honesty tracking for one task.

/// Number of most recent turns averaged for the concern check.
pub const HONESTY_WINDOW: usize = 3;
/// Rolling averages below this flag sustained low honesty.
pub const HONESTY_CONCERN_THRESHOLD: f64 = 0.8;

/// Honesty scores of past turns, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HonestyHistory {
    scores: Vec<f64>,
}

impl HonestyHistory {
    pub fn new(scores: Vec<f64>) -> Self {
        Self { scores }
    }

    pub fn record(&mut self, score: f64) {
        self.scores.push(score);
    }

    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    /// Average of the last [`HONESTY_WINDOW`] scores, once that many exist.
    pub fn rolling_average(&self) -> Option<f64> {
        if self.scores.len() < HONESTY_WINDOW {
            return None;
        }
        let recent = &self.scores[self.scores.len() - HONESTY_WINDOW..];
        Some(recent.iter().sum::<f64>() / HONESTY_WINDOW as f64)
    }

    pub fn has_sustained_concern(&self) -> bool {
        self.rolling_average()
            .is_some_and(|avg| avg < HONESTY_CONCERN_THRESHOLD)
    }
}
