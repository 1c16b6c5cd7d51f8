//! Score tally for the current session.

/// Non-negative point counter, reset together with the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreAccumulator {
    value: u32,
}

impl ScoreAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds points. Saturates instead of wrapping.
    pub fn add(&mut self, points: u32) {
        self.value = self.value.saturating_add(points);
    }

    pub fn reset(&mut self) {
        self.value = 0;
    }

    pub fn value(&self) -> u32 {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulates() {
        let mut score = ScoreAccumulator::new();
        for _ in 0..3 {
            score.add(50);
        }
        assert_eq!(score.value(), 150);
    }

    #[test]
    fn test_reset() {
        let mut score = ScoreAccumulator::new();
        score.add(10);
        score.reset();
        assert_eq!(score.value(), 0);
    }

    #[test]
    fn test_saturates() {
        let mut score = ScoreAccumulator::new();
        score.add(u32::MAX);
        score.add(1);
        assert_eq!(score.value(), u32::MAX);
    }
}
