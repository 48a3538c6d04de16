//! Generator for `id|name` vertex files (investor and company names).

use std::fmt::Write as _;

use crate::{
    batch::{BatchJob, BatchWindow},
    error::GenerationError,
    random::RandomSource,
};

const ALPHA: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Produces lines `id|name` where every name in a batch shares one randomly
/// chosen length in `[16, 26)`, drawn fresh per batch.
pub struct NamedVertexGenerator {
    header: String,
    /// Whether the name alphabet includes digits.
    is_numeric: bool,
}

impl NamedVertexGenerator {
    /// Creates a generator that writes `header` before the first line.
    #[must_use]
    pub fn new(header: impl Into<String>, is_numeric: bool) -> Self {
        Self {
            header: header.into(),
            is_numeric,
        }
    }

    fn alphabet(&self) -> &'static [u8] {
        if self.is_numeric {
            ALPHANUMERIC
        } else {
            ALPHA
        }
    }
}

impl BatchJob for NamedVertexGenerator {
    fn header(&self) -> String {
        self.header.clone()
    }

    fn generate(&self, window: BatchWindow, rng: &mut RandomSource) -> Result<String, GenerationError> {
        let length = rng.uniform_range(16, 26);
        let alphabet = self.alphabet();

        let mut out = String::new();
        for id in window.start..window.end() {
            let mut name = String::with_capacity(length as usize);
            for _ in 0..length {
                let index = rng.uniform_range(0, alphabet.len() as u64) as usize;
                name.push(alphabet[index] as char);
            }
            let _ = writeln!(out, "{id}|{name}");
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
    fn every_line_has_a_name_of_correct_length_and_alphabet() {
        let generator = NamedVertexGenerator::new("investorID|Name\n", true);
        let mut rng = RandomSource::seeded(42);
        let window = BatchWindow { start: 67, size: 60 };
        let body = generator.generate(window, &mut rng).expect("generation must succeed");

        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 60);
        for (offset, line) in lines.iter().enumerate() {
            let (id_str, name) = line.split_once('|').expect("line must contain a pipe");
            let id: u64 = id_str.parse().expect("id must parse");
            assert_eq!(id, 67 + offset as u64);
            assert!((16..=25).contains(&name.len()));
            assert!(name.bytes().all(|b| ALPHANUMERIC.contains(&b)));
        }
    }

    #[test]
    fn alphabetic_mode_excludes_digits() {
        let generator = NamedVertexGenerator::new("companyID|Name\n", false);
        let mut rng = RandomSource::seeded(1);
        let window = BatchWindow { start: 0, size: 20 };
        let body = generator.generate(window, &mut rng).expect("generation must succeed");

        for line in body.lines() {
            let (_, name) = line.split_once('|').expect("line must contain a pipe");
            assert!(name.bytes().all(|b| ALPHA.contains(&b)));
        }
    }

    #[test]
    fn batch_engine_covers_every_id_exactly_once() {
        let dir = tempfile::tempdir().expect("tempdir must be creatable");
        let path = dir.path().join("investors.csv");
        let generator = Arc::new(NamedVertexGenerator::new("investorID|Name\n", true));
        let cfg = BatchConfig {
            thread_count: 4,
            batch_size: 17,
            start_id: 0,
            count: 200,
        };

        run_batch_engine(cfg, &path, generator).expect("run must succeed");

        let contents = std::fs::read_to_string(&path).expect("file must be readable");
        let mut lines = contents.lines();
        assert_eq!(lines.next(), Some("investorID|Name"));
        let mut ids: Vec<u64> = lines
            .map(|line| line.split('|').next().expect("id prefix").parse().expect("id must parse"))
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..200).collect::<Vec<_>>());
    }
}
