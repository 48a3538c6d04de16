//! Mirror edge generation: power-law follower sampling over the friend
//! adjacency handed off from the friend phase, deduplicated through a
//! second stripe-locked matrix with strict ascending lock acquisition as
//! its sole deadlock-avoidance mechanism.

use std::{
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
    edges::{friend::FriendAdjacency, stripe_lock::StripedAdjacencyMatrix},
    error::{EngineError, GenerationError},
    random::RandomSource,
};

/// Parameters controlling one mirror-edge generation run.
#[derive(Debug, Clone, Copy)]
pub struct MirrorEdgeConfig {
    /// Number of investor vertices, `N_inv`.
    pub n_inv: u64,
    /// Target number of mirror edges, `E_m`.
    pub number_of_mirror_edges: u64,
    /// Power-law shape parameter for the follower rank, `a_m`.
    pub follower_shape: f64,
    /// Probability a considered friend pair is mirrored, `P_mirror`.
    pub mirror_probability: f64,
    /// Probability a mirrored pair is also marked for removal, `P_remove`.
    pub remove_probability: f64,
    /// Number of stripe locks guarding the mirror adjacency matrix.
    pub stripe_lock_count: usize,
    /// Number of worker threads.
    pub thread_count: usize,
    /// Number of edges generated per batch window.
    pub batch_size: u64,
    /// Cap on consecutive unproductive candidate draws before a batch gives
    /// up and reports [`GenerationError::RetriesExhausted`] rather than
    /// looping forever (spec.md design note: pathological parameterization
    /// can make a follower's neighbourhood fully considered already).
    pub max_unproductive_attempts: u64,
}

/// Shared state behind the single file-write lock: both output writers,
/// flushed together so neither file can observe a partial batch from the
/// other.
struct WriteState {
    mirror_path: PathBuf,
    mirror_writer: BufWriter<File>,
    remove_path: PathBuf,
    remove_writer: BufWriter<File>,
}

/// Runs the mirror edge generator to completion, writing `E_m` lines to
/// `mirror_path` and a subset of them to `remove_path`.
///
/// Consumes `friend_adjacency` by value: the design note calls for an
/// explicit ownership move at the friend/mirror phase boundary, since the
/// mapping is never mutated again once handed off.
///
/// # Errors
/// Returns [`EngineError::Io`] if either output file cannot be created or
/// written, [`EngineError::WorkerPanicked`] if a worker thread panics, or
/// the [`EngineError::Generation`] a worker returned.
pub fn run(
    cfg: MirrorEdgeConfig,
    friend_adjacency: FriendAdjacency,
    mirror_path: impl AsRef<Path>,
    remove_path: impl AsRef<Path>,
) -> Result<(), EngineError> {
    let mirror_path = mirror_path.as_ref();
    let remove_path = remove_path.as_ref();

    let mirror_writer = create_truncated(
        mirror_path,
        "Mirror Edges\nSourceTradeBookID|DestinationTradeBookID\n",
    )?;
    let remove_writer = create_truncated(
        remove_path,
        "Remove Mirror Edge List\nSourceTradeBookID|DestinationTradeBookID\n",
    )?;

    let state = Arc::new(Mutex::new(WriteState {
        mirror_path: mirror_path.to_path_buf(),
        mirror_writer,
        remove_path: remove_path.to_path_buf(),
        remove_writer,
    }));
    let matrix = Arc::new(StripedAdjacencyMatrix::new(cfg.n_inv, cfg.stripe_lock_count));
    let adjacency = Arc::new(friend_adjacency);
    let dispenser = Arc::new(BatchDispenser::new(&BatchConfig {
        thread_count: cfg.thread_count,
        batch_size: cfg.batch_size,
        start_id: 0,
        count: cfg.number_of_mirror_edges,
    }));

    debug!(
        n_inv = cfg.n_inv,
        number_of_mirror_edges = cfg.number_of_mirror_edges,
        thread_count = cfg.thread_count,
        "starting mirror edge generation"
    );

    let mut handles = Vec::with_capacity(cfg.thread_count);
    for worker_id in 0..cfg.thread_count {
        let dispenser = Arc::clone(&dispenser);
        let matrix = Arc::clone(&matrix);
        let adjacency = Arc::clone(&adjacency);
        let state = Arc::clone(&state);
        handles.push(thread::spawn(move || -> Result<(), EngineError> {
            worker_loop(worker_id, cfg, dispenser.as_ref(), matrix.as_ref(), adjacency.as_ref(), state.as_ref())
        }));
    }
    for handle in handles {
        handle.join().map_err(|_| EngineError::WorkerPanicked)??;
    }

    let mut state = state.lock().map_err(|_| EngineError::from(GenerationError::LockPoisoned {
        resource: "mirror file-write lock",
    }))?;
    state.mirror_writer.flush().map_err(|source| EngineError::Io {
        path: state.mirror_path.clone(),
        source,
    })?;
    state.remove_writer.flush().map_err(|source| EngineError::Io {
        path: state.remove_path.clone(),
        source,
    })?;
    debug!(edges = cfg.number_of_mirror_edges, "mirror edge generation complete");
    Ok(())
}

fn create_truncated(path: &Path, header: &str) -> Result<BufWriter<File>, EngineError> {
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
        .write_all(header.as_bytes())
        .map_err(|source| EngineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(writer)
}

fn worker_loop(
    worker_id: usize,
    cfg: MirrorEdgeConfig,
    dispenser: &BatchDispenser,
    matrix: &StripedAdjacencyMatrix,
    adjacency: &FriendAdjacency,
    state: &Mutex<WriteState>,
) -> Result<(), EngineError> {
    let mut rng = RandomSource::from_entropy();

    while let Some(window) = dispenser.next_batch()? {
        trace!(worker_id, start = window.start, size = window.size, "generating mirror batch");
        let (mirror_lines, remove_lines) = generate_batch(cfg, window, matrix, adjacency, &mut rng)?;

        let mut state = state.lock().map_err(|_| GenerationError::LockPoisoned {
            resource: "mirror file-write lock",
        })?;
        state.mirror_writer.write_all(mirror_lines.as_bytes()).map_err(|source| EngineError::Io {
            path: state.mirror_path.clone(),
            source,
        })?;
        state.remove_writer.write_all(remove_lines.as_bytes()).map_err(|source| EngineError::Io {
            path: state.remove_path.clone(),
            source,
        })?;
    }

    Ok(())
}

fn generate_batch(
    cfg: MirrorEdgeConfig,
    window: BatchWindow,
    matrix: &StripedAdjacencyMatrix,
    adjacency: &FriendAdjacency,
    rng: &mut RandomSource,
) -> Result<(String, String), GenerationError> {
    let mut mirror_lines = String::new();
    let mut remove_lines = String::new();
    let mut generated: u64 = 0;
    let mut unproductive_attempts: u64 = 0;

    while generated < window.size {
        let follower_id = rng.power_law_rank(cfg.follower_shape, cfg.n_inv);

        let Some(neighbors) = adjacency.get(&follower_id) else {
            bump_retry(&mut unproductive_attempts, cfg.max_unproductive_attempts)?;
            continue;
        };

        let mut vertices = neighbors.clone();
        vertices.push(follower_id);
        vertices.sort_unstable();

        let lock_indices = matrix.lock_indices_for(&vertices);
        let _guards = matrix.acquire_ordered(&lock_indices)?;

        let mut considered_new = false;
        for &vertex in &vertices {
            if vertex == follower_id || matrix.get_symmetric(follower_id, vertex)? {
                continue;
            }
            considered_new = true;

            let mirror_roll = rng.uniform();
            let remove_roll = rng.uniform();

            if mirror_roll < cfg.mirror_probability {
                let source_tradebook_id = follower_id + cfg.n_inv;
                let destination_tradebook_id = vertex + cfg.n_inv;
                let _ = writeln!(mirror_lines, "{source_tradebook_id}|{destination_tradebook_id}");
                generated += 1;

                if remove_roll < cfg.remove_probability {
                    let _ = writeln!(remove_lines, "{source_tradebook_id}|{destination_tradebook_id}");
                }
            }

            matrix.set_symmetric(follower_id, vertex)?;

            if generated >= window.size {
                break;
            }
        }

        if considered_new {
            unproductive_attempts = 0;
        } else {
            bump_retry(&mut unproductive_attempts, cfg.max_unproductive_attempts)?;
        }
    }

    let emitted = u64::try_from(mirror_lines.lines().count()).unwrap_or(u64::MAX);
    if emitted != window.size {
        return Err(GenerationError::GeneratedCountMismatch {
            start: window.start,
            generated: emitted,
            expected: window.size,
        });
    }

    Ok((mirror_lines, remove_lines))
}

fn bump_retry(attempts: &mut u64, max: u64) -> Result<(), GenerationError> {
    *attempts += 1;
    if *attempts > max {
        return Err(GenerationError::RetriesExhausted { attempts: *attempts });
    }
    Ok(())
}
