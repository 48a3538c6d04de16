//! The reusable parallel batch engine.
//!
//! A generic work-distribution skeleton: it partitions a linear ID range
//! into batches, dispatches them to a fixed worker pool, and serializes
//! output to a single append-only file. Generators that need more than one
//! output file or extra shared state (the friend and mirror edge
//! generators) build their own worker loop directly on top of
//! [`BatchDispenser`] and [`FileSink`] instead of going through
//! [`run_batch_engine`]; see `edges::friend` and `edges::mirror`.

use std::{
    fs::{File, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    thread,
};

use tracing::{debug, trace};

use crate::{
    error::{EngineError, GenerationError},
    random::RandomSource,
};

/// Fixed parameters describing one batch-engine run.
#[derive(Debug, Clone, Copy)]
pub struct BatchConfig {
    /// Number of worker threads to spawn.
    pub thread_count: usize,
    /// Number of IDs handed to a worker per `next_batch` call.
    pub batch_size: u64,
    /// Inclusive first ID in the range to cover.
    pub start_id: u64,
    /// Total number of IDs to cover, starting at `start_id`.
    pub count: u64,
}

/// A contiguous window `[start, start + size)` of output IDs assigned to one
/// worker for one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchWindow {
    /// First ID in the window.
    pub start: u64,
    /// Number of IDs in the window.
    pub size: u64,
}

impl BatchWindow {
    /// The ID one past the last ID in this window.
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.start + self.size
    }
}

struct DispenserState {
    next: u64,
    end: u64,
    batch_size: u64,
}

/// An atomic dispenser of non-overlapping, consecutive ID windows over
/// `[start_id, start_id + count)`.
///
/// Returns `None` permanently once the range is exhausted; the final window
/// may be smaller than `batch_size` if `count` is not an exact multiple.
pub struct BatchDispenser {
    state: Mutex<DispenserState>,
}

impl BatchDispenser {
    /// Creates a dispenser over `[cfg.start_id, cfg.start_id + cfg.count)`.
    #[must_use]
    pub fn new(cfg: &BatchConfig) -> Self {
        Self {
            state: Mutex::new(DispenserState {
                next: cfg.start_id,
                end: cfg.start_id.saturating_add(cfg.count),
                batch_size: cfg.batch_size.max(1),
            }),
        }
    }

    /// Returns the next window, or `None` if the range has been exhausted.
    ///
    /// # Errors
    /// Returns [`GenerationError::LockPoisoned`] if a previous holder of the
    /// internal mutex panicked while it was held.
    pub fn next_batch(&self) -> Result<Option<BatchWindow>, GenerationError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| GenerationError::LockPoisoned {
                resource: "batch dispenser",
            })?;

        if state.next >= state.end {
            return Ok(None);
        }

        let start = state.next;
        let remaining = state.end - start;
        let size = state.batch_size.min(remaining);
        state.next = start + size;

        Ok(Some(BatchWindow { start, size }))
    }
}

/// A single-writer-at-a-time append-only output file.
///
/// Every [`FileSink::append`] call is serialized behind one mutex, making
/// concurrent appends from multiple worker threads safe.
pub struct FileSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl FileSink {
    /// Truncates (or creates) `path` and writes `header` to it.
    ///
    /// # Errors
    /// Returns [`EngineError::Io`] if the file cannot be created or written.
    pub fn create(path: impl AsRef<Path>, header: &str) -> Result<Self, EngineError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(|source| EngineError::Io {
                path: path.clone(),
                source,
            })?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(header.as_bytes())
            .map_err(|source| EngineError::Io {
                path: path.clone(),
                source,
            })?;
        Ok(Self {
            path,
            writer: Mutex::new(writer),
        })
    }

    /// Appends `lines` to the file, serialized against other appends.
    ///
    /// # Errors
    /// Returns [`EngineError::Io`] if the write fails.
    pub fn append(&self, lines: &str) -> Result<(), EngineError> {
        if lines.is_empty() {
            return Ok(());
        }
        let mut writer = self.writer.lock().unwrap_or_else(|poison| {
            // A poisoned mutex here means another writer panicked mid-write;
            // best-effort continue rather than abandon a correct append.
            poison.into_inner()
        });
        writer
            .write_all(lines.as_bytes())
            .map_err(|source| EngineError::Io {
                path: self.path.clone(),
                source,
            })
    }

    /// Flushes buffered writes to the underlying file.
    ///
    /// # Errors
    /// Returns [`EngineError::Io`] if the flush fails.
    pub fn flush(&self) -> Result<(), EngineError> {
        let mut writer = self.writer.lock().unwrap_or_else(|poison| poison.into_inner());
        writer.flush().map_err(|source| EngineError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

/// The per-batch behaviour a generator supplies to [`run_batch_engine`].
///
/// Implementations are the "thin specialization" the vertex generators
/// provide: a header and a pure function from a batch window to output
/// lines. `generate` is called concurrently from every worker thread, so it
/// must not depend on ordering between calls.
pub trait BatchJob: Send + Sync {
    /// The header text written exactly once, before any worker starts.
    fn header(&self) -> String;

    /// Produces the body lines for one batch window.
    ///
    /// # Errors
    /// Returns [`GenerationError`] if sampling fails for this batch.
    fn generate(&self, window: BatchWindow, rng: &mut RandomSource) -> Result<String, GenerationError>;
}

/// Runs `job` across `cfg.thread_count` worker threads, each repeatedly
/// pulling batches from a [`BatchDispenser`] until exhausted and appending
/// its output to a freshly truncated `path`.
///
/// Returns only after every worker thread has observed the end of the range
/// and completed its last append — the engine's termination barrier.
///
/// # Errors
/// Returns [`EngineError::Io`] if the output file cannot be reset or
/// written, [`EngineError::WorkerPanicked`] if a worker thread panics, or
/// the [`EngineError::Generation`] a worker returned.
pub fn run_batch_engine<J>(
    cfg: BatchConfig,
    path: impl AsRef<Path>,
    job: Arc<J>,
) -> Result<(), EngineError>
where
    J: BatchJob + 'static,
{
    let sink = Arc::new(FileSink::create(path, &job.header())?);
    let dispenser = Arc::new(BatchDispenser::new(&cfg));

    debug!(
        thread_count = cfg.thread_count,
        batch_size = cfg.batch_size,
        start_id = cfg.start_id,
        count = cfg.count,
        "starting batch engine run"
    );

    let mut handles = Vec::with_capacity(cfg.thread_count);
    for worker_id in 0..cfg.thread_count {
        let dispenser = Arc::clone(&dispenser);
        let sink = Arc::clone(&sink);
        let job = Arc::clone(&job);
        handles.push(thread::spawn(move || -> Result<(), EngineError> {
            worker_loop(worker_id, dispenser.as_ref(), sink.as_ref(), job.as_ref())
        }));
    }

    for handle in handles {
        handle.join().map_err(|_| EngineError::WorkerPanicked)??;
    }

    sink.flush()?;
    debug!("batch engine run complete");
    Ok(())
}

fn worker_loop<J: BatchJob + ?Sized>(
    worker_id: usize,
    dispenser: &BatchDispenser,
    sink: &FileSink,
    job: &J,
) -> Result<(), EngineError> {
    let mut rng = RandomSource::from_entropy();
    loop {
        trace!(worker_id, "fetching next batch");
        let Some(window) = dispenser.next_batch()? else {
            trace!(worker_id, "no batches remain, worker done");
            return Ok(());
        };

        trace!(worker_id, start = window.start, size = window.size, "generating batch");
        let lines = job.generate(window, &mut rng)?;

        let generated = u64::try_from(lines.lines().count()).unwrap_or(u64::MAX);
        if generated != window.size {
            return Err(GenerationError::GeneratedCountMismatch {
                start: window.start,
                generated,
                expected: window.size,
            }
            .into());
        }

        trace!(worker_id, start = window.start, "appending batch");
        sink.append(&lines)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    #[test]
    fn dispenser_covers_range_without_overlap_or_gap() {
        let cfg = BatchConfig {
            thread_count: 1,
            batch_size: 10,
            start_id: 0,
            count: 25,
        };
        let dispenser = BatchDispenser::new(&cfg);

        let mut windows = Vec::new();
        while let Some(window) = dispenser.next_batch().expect("lock not poisoned") {
            windows.push(window);
        }

        assert_eq!(
            windows,
            vec![
                BatchWindow { start: 0, size: 10 },
                BatchWindow { start: 10, size: 10 },
                BatchWindow { start: 20, size: 5 },
            ]
        );
        assert!(dispenser.next_batch().expect("lock not poisoned").is_none());
        assert!(dispenser.next_batch().expect("lock not poisoned").is_none());
    }

    #[test]
    fn dispenser_is_thread_safe_under_contention() {
        let cfg = BatchConfig {
            thread_count: 8,
            batch_size: 7,
            start_id: 100,
            count: 1000,
        };
        let dispenser = Arc::new(BatchDispenser::new(&cfg));
        let covered: Arc<Mutex<BTreeSet<u64>>> = Arc::new(Mutex::new(BTreeSet::new()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let dispenser = Arc::clone(&dispenser);
                let covered = Arc::clone(&covered);
                thread::spawn(move || {
                    while let Some(window) = dispenser.next_batch().expect("lock not poisoned") {
                        let mut covered = covered.lock().expect("lock not poisoned");
                        for id in window.start..window.end() {
                            assert!(covered.insert(id), "id {id} covered twice");
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("worker thread must not panic");
        }

        let covered = covered.lock().expect("lock not poisoned");
        assert_eq!(covered.len(), 1000);
        assert_eq!(*covered.iter().next().expect("non-empty"), 100);
        assert_eq!(*covered.iter().next_back().expect("non-empty"), 1099);
    }

    proptest! {
        #[test]
        fn dispenser_partitions_any_range_exactly(
            start_id in 0u64..10_000,
            count in 0u64..5_000,
            batch_size in 1u64..500,
        ) {
            let cfg = BatchConfig { thread_count: 1, batch_size, start_id, count };
            let dispenser = BatchDispenser::new(&cfg);

            let mut covered = Vec::new();
            while let Some(window) = dispenser.next_batch().expect("lock not poisoned") {
                prop_assert!(window.size > 0);
                covered.push(window);
            }

            let total: u64 = covered.iter().map(|w| w.size).sum();
            prop_assert_eq!(total, count);

            let mut expected_next = start_id;
            for window in &covered {
                prop_assert_eq!(window.start, expected_next);
                expected_next = window.end();
            }
            prop_assert_eq!(expected_next, start_id + count);

            prop_assert!(dispenser.next_batch().expect("lock not poisoned").is_none());
            prop_assert!(dispenser.next_batch().expect("lock not poisoned").is_none());
        }
    }

    struct EchoJob;

    impl BatchJob for EchoJob {
        fn header(&self) -> String {
            "header\n".to_owned()
        }

        fn generate(&self, window: BatchWindow, _rng: &mut RandomSource) -> Result<String, GenerationError> {
            let mut out = String::new();
            for id in window.start..window.end() {
                out.push_str(&id.to_string());
                out.push('\n');
            }
            Ok(out)
        }
    }

    #[test]
    fn run_batch_engine_covers_every_id_exactly_once() {
        let dir = tempfile::tempdir().expect("tempdir must be creatable");
        let path = dir.path().join("echo.csv");
        let cfg = BatchConfig {
            thread_count: 4,
            batch_size: 3,
            start_id: 0,
            count: 37,
        };

        run_batch_engine(cfg, &path, Arc::new(EchoJob)).expect("run must succeed");

        let contents = std::fs::read_to_string(&path).expect("file must be readable");
        let mut lines = contents.lines();
        assert_eq!(lines.next(), Some("header"));
        let mut ids: Vec<u64> = lines.map(|line| line.parse().expect("line must be an id")).collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..37).collect::<Vec<_>>());
    }

    #[test]
    fn run_batch_engine_truncates_on_rerun() {
        let dir = tempfile::tempdir().expect("tempdir must be creatable");
        let path = dir.path().join("echo.csv");
        let cfg = BatchConfig {
            thread_count: 2,
            batch_size: 4,
            start_id: 0,
            count: 10,
        };

        run_batch_engine(cfg, &path, Arc::new(EchoJob)).expect("first run must succeed");
        let first_len = std::fs::read_to_string(&path).expect("file must be readable").lines().count();

        run_batch_engine(cfg, &path, Arc::new(EchoJob)).expect("second run must succeed");
        let second_len = std::fs::read_to_string(&path).expect("file must be readable").lines().count();

        assert_eq!(first_len, second_len);
    }

    struct ShortChangingJob;

    impl BatchJob for ShortChangingJob {
        fn header(&self) -> String {
            "header\n".to_owned()
        }

        fn generate(&self, window: BatchWindow, _rng: &mut RandomSource) -> Result<String, GenerationError> {
            let mut out = String::new();
            for id in window.start..window.end().saturating_sub(1) {
                out.push_str(&id.to_string());
                out.push('\n');
            }
            Ok(out)
        }
    }

    #[test]
    fn run_batch_engine_rejects_a_job_that_under_produces_lines() {
        let dir = tempfile::tempdir().expect("tempdir must be creatable");
        let path = dir.path().join("short.csv");
        let cfg = BatchConfig {
            thread_count: 1,
            batch_size: 5,
            start_id: 0,
            count: 5,
        };

        let err = run_batch_engine(cfg, &path, Arc::new(ShortChangingJob))
            .expect_err("a job producing too few lines must be rejected");
        assert!(matches!(
            err,
            EngineError::Generation(GenerationError::GeneratedCountMismatch { generated: 4, expected: 5, .. })
        ));
    }
}
