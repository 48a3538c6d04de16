//! Permutation generation and persistence for the three ranked investor
//! lists (`follower_list`, `leader_list_1`, `leader_list_2`).

use std::fmt::Write as _;

use crate::{error::EngineError, batch::FileSink, random::RandomSource};

/// Produces a permutation of `[start_id, start_id + n)` and persists it, one
/// ID per line, under a caller-supplied header.
pub struct PermutationGenerator {
    start_id: u64,
    n: u64,
}

impl PermutationGenerator {
    /// Creates a generator over `[start_id, start_id + n)`.
    #[must_use]
    pub const fn new(start_id: u64, n: u64) -> Self {
        Self { start_id, n }
    }

    /// Draws and returns one permutation, with no side effects.
    #[must_use]
    pub fn generate(&self, rng: &mut RandomSource) -> Vec<u64> {
        rng.shuffled_range(self.start_id, self.n)
    }

    /// Draws one permutation and writes it to `path`, one ID per line, with
    /// `header` as the first line.
    ///
    /// # Errors
    /// Returns [`EngineError::Io`] if the file cannot be created or written.
    pub fn generate_and_save(
        &self,
        path: impl AsRef<std::path::Path>,
        header: &str,
        rng: &mut RandomSource,
    ) -> Result<Vec<u64>, EngineError> {
        let permutation = self.generate(rng);

        let mut body = String::new();
        for id in &permutation {
            let _ = writeln!(body, "{id}");
        }

        let sink = FileSink::create(path, header)?;
        sink.append(&body)?;
        sink.flush()?;

        Ok(permutation)
    }
}
