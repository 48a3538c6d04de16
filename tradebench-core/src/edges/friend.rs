//! Friend edge generation: power-law sampling over ranked investor lists,
//! deduplicated through a stripe-locked adjacency matrix.

use std::{
    collections::HashMap,
    fmt::Write as _,
    fs::{File, OpenOptions},
    io::{BufWriter, Write as _},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    thread,
};

use tracing::{debug, trace};

use crate::{
    batch::{BatchConfig, BatchDispenser, BatchWindow},
    edges::stripe_lock::StripedAdjacencyMatrix,
    error::{EngineError, GenerationError},
    random::RandomSource,
};

/// Symmetric `vertex -> neighbors` mapping produced by the friend phase and
/// handed, read-only, to the mirror phase.
pub type FriendAdjacency = HashMap<u64, Vec<u64>>;

/// The three ranked investor permutations fed to the friend sampler.
///
/// The sampler uses the raw power-law-scaled rank directly as a vertex ID
/// rather than indexing into these lists (see the friend edge generator's
/// sampling notes): the lists are accepted here, length-checked, and
/// available to be persisted by the caller, but are not read again once
/// construction succeeds.
pub struct FriendLists {
    /// Permutation of `[0, n_inv)` used to pick the follower's rank.
    pub follower_list: Vec<u64>,
    /// First leader permutation of `[0, n_inv)`.
    pub leader_list_1: Vec<u64>,
    /// Second leader permutation of `[0, n_inv)`.
    pub leader_list_2: Vec<u64>,
}

impl FriendLists {
    /// Checks that all three lists have length `n_inv`.
    ///
    /// # Panics
    /// Panics if any list's length differs from `n_inv`; a correctly
    /// constructed permutation generator can never produce this.
    fn assert_lengths(&self, n_inv: u64) {
        let n_inv = n_inv as usize;
        assert_eq!(self.follower_list.len(), n_inv, "follower_list length must equal n_inv");
        assert_eq!(self.leader_list_1.len(), n_inv, "leader_list_1 length must equal n_inv");
        assert_eq!(self.leader_list_2.len(), n_inv, "leader_list_2 length must equal n_inv");
    }
}

/// Parameters controlling one friend-edge generation run.
#[derive(Debug, Clone, Copy)]
pub struct FriendEdgeConfig {
    /// Number of investor vertices, `N_inv`.
    pub n_inv: u64,
    /// Target number of friend edges, `E_f`.
    pub number_of_friend_edges: u64,
    /// Power-law shape parameter for the follower rank.
    pub follower_shape: f64,
    /// Power-law shape parameter for `leader_list_1`'s rank.
    pub leader_1_shape: f64,
    /// Power-law shape parameter for `leader_list_2`'s rank.
    pub leader_2_shape: f64,
    /// Probability of drawing the leader rank from the `leader_1` parameter
    /// rather than `leader_2`.
    pub leader_1_probability: f64,
    /// Number of stripe locks guarding the adjacency matrix.
    pub stripe_lock_count: usize,
    /// Number of worker threads.
    pub thread_count: usize,
    /// Number of edges generated per batch window.
    pub batch_size: u64,
}

/// Shared state behind the single file-write lock: the output writer and the
/// global adjacency map, merged together as the data model requires.
struct WriteState {
    path: PathBuf,
    writer: BufWriter<File>,
    adjacency: FriendAdjacency,
}

/// Runs the friend edge generator to completion, writing `E_f` lines to
/// `path` and returning the resulting symmetric adjacency mapping.
///
/// # Errors
/// Returns [`EngineError::Io`] if the output file cannot be created or
/// written, [`EngineError::WorkerPanicked`] if a worker thread panics, or
/// the [`EngineError::Generation`] a worker returned.
///
/// # Panics
/// Panics if any of `lists`'s three permutations does not have length
/// `cfg.n_inv`.
pub fn run(
    cfg: FriendEdgeConfig,
    lists: &FriendLists,
    path: impl AsRef<Path>,
) -> Result<FriendAdjacency, EngineError> {
    lists.assert_lengths(cfg.n_inv);

    let path = path.as_ref();
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .map_err(|source| EngineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(b"Friend Edges\nSourceVertexID|DestinationVertexID\n")
        .map_err(|source| EngineError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let state = Arc::new(Mutex::new(WriteState {
        path: path.to_path_buf(),
        writer,
        adjacency: FriendAdjacency::new(),
    }));
    let matrix = Arc::new(StripedAdjacencyMatrix::new(cfg.n_inv, cfg.stripe_lock_count));
    let dispenser = Arc::new(BatchDispenser::new(&BatchConfig {
        thread_count: cfg.thread_count,
        batch_size: cfg.batch_size,
        start_id: 0,
        count: cfg.number_of_friend_edges,
    }));

    debug!(
        n_inv = cfg.n_inv,
        number_of_friend_edges = cfg.number_of_friend_edges,
        thread_count = cfg.thread_count,
        "starting friend edge generation"
    );

    let mut handles = Vec::with_capacity(cfg.thread_count);
    for worker_id in 0..cfg.thread_count {
        let dispenser = Arc::clone(&dispenser);
        let matrix = Arc::clone(&matrix);
        let state = Arc::clone(&state);
        handles.push(thread::spawn(move || -> Result<(), EngineError> {
            worker_loop(worker_id, cfg, dispenser.as_ref(), matrix.as_ref(), state.as_ref())
        }));
    }
    for handle in handles {
        handle.join().map_err(|_| EngineError::WorkerPanicked)??;
    }

    let mut state = state.lock().map_err(|_| EngineError::from(GenerationError::LockPoisoned {
        resource: "friend file-write lock",
    }))?;
    state.writer.flush().map_err(|source| EngineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let adjacency = std::mem::take(&mut state.adjacency);
    debug!(edges = cfg.number_of_friend_edges, "friend edge generation complete");
    Ok(adjacency)
}

fn worker_loop(
    worker_id: usize,
    cfg: FriendEdgeConfig,
    dispenser: &BatchDispenser,
    matrix: &StripedAdjacencyMatrix,
    state: &Mutex<WriteState>,
) -> Result<(), EngineError> {
    let mut rng = RandomSource::from_entropy();

    while let Some(window) = dispenser.next_batch()? {
        trace!(worker_id, start = window.start, size = window.size, "generating friend batch");
        let (lines, local_adjacency) = generate_batch(cfg, window, matrix, &mut rng)?;

        let mut state = state.lock().map_err(|_| GenerationError::LockPoisoned {
            resource: "friend file-write lock",
        })?;
        state.writer.write_all(lines.as_bytes()).map_err(|source| EngineError::Io {
            path: state.path.clone(),
            source,
        })?;
        for (vertex, neighbors) in local_adjacency {
            state.adjacency.entry(vertex).or_default().extend(neighbors);
        }
    }

    Ok(())
}

fn generate_batch(
    cfg: FriendEdgeConfig,
    window: BatchWindow,
    matrix: &StripedAdjacencyMatrix,
    rng: &mut RandomSource,
) -> Result<(String, FriendAdjacency), GenerationError> {
    let mut lines = String::new();
    let mut local_adjacency = FriendAdjacency::new();
    let mut generated: u64 = 0;

    while generated < window.size {
        let follower_rank = rng.power_law_rank(cfg.follower_shape, cfg.n_inv);
        let leader_1_rank = rng.power_law_rank(cfg.leader_1_shape, cfg.n_inv);
        let leader_2_rank = rng.power_law_rank(cfg.leader_2_shape, cfg.n_inv);

        let follower_id = follower_rank;
        let leader_id = if rng.uniform() < cfg.leader_1_probability {
            leader_1_rank
        } else {
            leader_2_rank
        };

        if follower_id == leader_id {
            continue;
        }

        let lo = follower_id.min(leader_id);
        let hi = follower_id.max(leader_id);
        let lock_index = matrix.lock_index_for(lo);
        let _guard = matrix.acquire_ordered(&[lock_index])?;

        if matrix.get(lo, hi)? {
            continue;
        }
        matrix.set(lo, hi)?;

        let _ = writeln!(lines, "{follower_id}|{leader_id}");
        local_adjacency.entry(lo).or_default().push(hi);
        local_adjacency.entry(hi).or_default().push(lo);
        generated += 1;
    }

    let emitted = u64::try_from(lines.lines().count()).unwrap_or(u64::MAX);
    if emitted != window.size {
        return Err(GenerationError::GeneratedCountMismatch {
            start: window.start,
            generated: emitted,
            expected: window.size,
        });
    }

    Ok((lines, local_adjacency))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn lists(n_inv: u64) -> FriendLists {
        let mut rng = RandomSource::seeded(1);
        FriendLists {
            follower_list: rng.shuffled_range(0, n_inv),
            leader_list_1: rng.shuffled_range(0, n_inv),
            leader_list_2: rng.shuffled_range(0, n_inv),
        }
    }

    #[test]
    fn emits_exact_edge_count_with_no_duplicates_and_consistent_adjacency() {
        let cfg = FriendEdgeConfig {
            n_inv: 1000,
            number_of_friend_edges: 1000,
            follower_shape: 2.0,
            leader_1_shape: 2.0,
            leader_2_shape: 2.0,
            leader_1_probability: 0.5,
            stripe_lock_count: 5,
            thread_count: 4,
            batch_size: 50,
        };
        let dir = tempfile::tempdir().expect("tempdir must be creatable");
        let path = dir.path().join("friend_edges.csv");

        let adjacency = run(cfg, &lists(cfg.n_inv), &path).expect("run must succeed");

        let contents = std::fs::read_to_string(&path).expect("file must be readable");
        let mut file_lines = contents.lines();
        assert_eq!(file_lines.next(), Some("Friend Edges"));
        assert_eq!(file_lines.next(), Some("SourceVertexID|DestinationVertexID"));

        let mut pairs = HashSet::new();
        let mut degree = 0u64;
        for line in file_lines {
            let (follower_str, leader_str) = line.split_once('|').expect("line must have a pipe");
            let follower: u64 = follower_str.parse().expect("follower must parse");
            let leader: u64 = leader_str.parse().expect("leader must parse");
            assert_ne!(follower, leader);
            let lo = follower.min(leader);
            let hi = follower.max(leader);
            assert!(lo < hi);
            assert!(hi < cfg.n_inv);
            assert!(pairs.insert((lo, hi)), "duplicate pair {lo},{hi}");
            degree += 1;
        }
        assert_eq!(degree, cfg.number_of_friend_edges);

        let total_degree: usize = adjacency.values().map(Vec::len).sum();
        assert_eq!(total_degree as u64, cfg.number_of_friend_edges * 2);
        for (&vertex, neighbors) in &adjacency {
            for &neighbor in neighbors {
                assert!(
                    adjacency.get(&neighbor).is_some_and(|back| back.contains(&vertex)),
                    "adjacency must be symmetric"
                );
            }
        }
    }

    #[test]
    fn small_graph_matches_end_to_end_expectations() {
        let cfg = FriendEdgeConfig {
            n_inv: 7,
            number_of_friend_edges: 15,
            follower_shape: 2.0,
            leader_1_shape: 2.0,
            leader_2_shape: 2.0,
            leader_1_probability: 0.5,
            stripe_lock_count: 5,
            thread_count: 4,
            batch_size: 4,
        };
        let dir = tempfile::tempdir().expect("tempdir must be creatable");
        let path = dir.path().join("friend_edges.csv");

        let adjacency = run(cfg, &lists(cfg.n_inv), &path).expect("run must succeed");

        let total_degree: usize = adjacency.values().map(Vec::len).sum();
        assert_eq!(total_degree, 30);
    }
}
