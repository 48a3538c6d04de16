//! Generator for `id|number` vertex files (trade-book investment amounts).

use std::fmt::Write as _;

use crate::{
    batch::{BatchJob, BatchWindow},
    error::GenerationError,
    random::RandomSource,
};

/// Produces lines `id|number` where each number is drawn uniformly from
/// `[lower, upper)` independently per line.
pub struct NumberedVertexGenerator {
    header: String,
    lower: u64,
    upper: u64,
}

impl NumberedVertexGenerator {
    /// Creates a generator that writes `header` before the first line and
    /// samples each value uniformly in `[lower, upper)`.
    ///
    /// # Panics
    /// Panics if `lower >= upper`.
    #[must_use]
    pub fn new(header: impl Into<String>, lower: u64, upper: u64) -> Self {
        assert!(lower < upper, "numbered vertex range must be non-empty");
        Self {
            header: header.into(),
            lower,
            upper,
        }
    }
}

impl BatchJob for NumberedVertexGenerator {
    fn header(&self) -> String {
        self.header.clone()
    }

    fn generate(&self, window: BatchWindow, rng: &mut RandomSource) -> Result<String, GenerationError> {
        let mut out = String::new();
        for id in window.start..window.end() {
            let value = rng.uniform_range(self.lower, self.upper);
            let _ = writeln!(out, "{id}|{value}");
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{BatchConfig, run_batch_engine};
    use std::sync::Arc;

    #[test]
    fn every_line_has_a_value_in_range() {
        let generator = NumberedVertexGenerator::new("tradeBookID|InvestmentAmount\n", 1, 10);
        let mut rng = RandomSource::seeded(50);
        let window = BatchWindow { start: 50, size: 60 };
        let body = generator.generate(window, &mut rng).expect("generation must succeed");

        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 60);
        for (offset, line) in lines.iter().enumerate() {
            let (id_str, value_str) = line.split_once('|').expect("line must contain a pipe");
            let id: u64 = id_str.parse().expect("id must parse");
            let value: u64 = value_str.parse().expect("value must parse");
            assert_eq!(id, 50 + offset as u64);
            assert!((1..10).contains(&value));
        }
    }

    #[test]
    #[should_panic(expected = "numbered vertex range must be non-empty")]
    fn empty_range_panics_at_construction() {
        let _ = NumberedVertexGenerator::new("header\n", 10, 10);
    }

    #[test]
    fn batch_engine_covers_every_id_exactly_once() {
        let dir = tempfile::tempdir().expect("tempdir must be creatable");
        let path = dir.path().join("tradebooks.csv");
        let generator = Arc::new(NumberedVertexGenerator::new(
            "tradeBookID|InvestmentAmount\n",
            1,
            10,
        ));
        let cfg = BatchConfig {
            thread_count: 4,
            batch_size: 23,
            start_id: 50,
            count: 60,
        };

        run_batch_engine(cfg, &path, generator).expect("run must succeed");

        let contents = std::fs::read_to_string(&path).expect("file must be readable");
        let mut lines = contents.lines();
        assert_eq!(lines.next(), Some("tradeBookID|InvestmentAmount"));
        let mut ids: Vec<u64> = lines
            .map(|line| line.split('|').next().expect("id prefix").parse().expect("id must parse"))
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (50..110).collect::<Vec<_>>());
    }
}
