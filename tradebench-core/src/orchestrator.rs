//! Top-level entry point: sequences every vertex, list, and edge generator
//! described by a [`Config`] and joins them into one completed dataset.

use std::sync::Arc;
use std::thread;

use tracing::{debug, info};

use crate::{
    batch::{BatchConfig, run_batch_engine},
    config::Config,
    edges::{friend, mirror},
    error::{BdgError, EngineError},
    permutation::PermutationGenerator,
    random::RandomSource,
    vertex::{NamedVertexGenerator, NumberedVertexGenerator},
};

/// Number of stripe locks guarding both edge generators' adjacency matrices.
const STRIPE_LOCK_COUNT: usize = 20;

/// Runs every generator described by `config`, writing the complete dataset
/// to the paths it names.
///
/// Investor names, trade-book amounts, company names, and the company list
/// run concurrently on their own threads. The three investor permutations
/// then run sequentially on the calling thread, matching the order the
/// friend generator depends on them being ready. Friend edges generate to
/// completion before mirror edges start, since the mirror phase consumes the
/// friend adjacency.
///
/// # Errors
/// Returns [`BdgError::Engine`] if any generator's output file cannot be
/// written, a worker thread panics, or a generator reports an internal
/// [`crate::error::GenerationError`].
pub fn run(config: &Config) -> Result<(), BdgError> {
    info!(
        number_of_investors = config.number_of_investors,
        number_of_companies = config.number_of_companies,
        number_of_friend_edges = config.number_of_friend_edges,
        number_of_mirror_edges = config.number_of_mirror_edges,
        "starting base data generator"
    );

    let n_inv = config.number_of_investors;
    let n_co = config.number_of_companies;

    let investor_names = spawn_vertex_job(
        Arc::new(NamedVertexGenerator::new("investorID|Name\n", true)),
        BatchConfig {
            thread_count: 10,
            batch_size: 80,
            start_id: 0,
            count: n_inv,
        },
        config.investor_name_file_name.clone(),
    );
    let tradebook_amounts = spawn_vertex_job(
        Arc::new(NumberedVertexGenerator::new(
            "tradeBookID|InvestmentAmount\n",
            15_000,
            1_600_000,
        )),
        BatchConfig {
            thread_count: 10,
            batch_size: 1_000,
            start_id: n_inv,
            count: n_inv,
        },
        config.tradebook_investment_amount_file_name.clone(),
    );
    let company_names = spawn_vertex_job(
        Arc::new(NamedVertexGenerator::new("companyID|Name\n", false)),
        BatchConfig {
            thread_count: 10,
            batch_size: 20,
            start_id: 2 * n_inv,
            count: n_co,
        },
        config.company_name_file_name.clone(),
    );
    let company_list = spawn_permutation_job(2 * n_inv, n_co, "Company List", config.company_list_file_name.clone());

    let mut rng = RandomSource::from_entropy();
    let follower_list = PermutationGenerator::new(0, n_inv).generate_and_save(
        &config.follower_list_file_name,
        "Follower List\n",
        &mut rng,
    )?;
    let leader_list_1 = PermutationGenerator::new(0, n_inv).generate_and_save(
        &config.leader_list_1_file_name,
        "Leader List 1\n",
        &mut rng,
    )?;
    let leader_list_2 = PermutationGenerator::new(0, n_inv).generate_and_save(
        &config.leader_list_2_file_name,
        "Leader List 2\n",
        &mut rng,
    )?;

    debug!("investor lists ready, starting friend edge generation");
    let friend_adjacency = friend::run(
        friend::FriendEdgeConfig {
            n_inv,
            number_of_friend_edges: config.number_of_friend_edges,
            follower_shape: config.follower_list_friend_power_dis_param,
            leader_1_shape: config.leader_list_1_friend_power_dis_param,
            leader_2_shape: config.leader_list_2_friend_power_dis_param,
            leader_1_probability: config.choose_leader_list_1_as_friend_prob,
            stripe_lock_count: STRIPE_LOCK_COUNT,
            thread_count: 10,
            batch_size: 1_000,
        },
        &friend::FriendLists {
            follower_list,
            leader_list_1,
            leader_list_2,
        },
        &config.friend_edges_file_name,
    )?;

    debug!("friend edges complete, starting mirror edge generation");
    mirror::run(
        mirror::MirrorEdgeConfig {
            n_inv,
            number_of_mirror_edges: config.number_of_mirror_edges,
            follower_shape: config.follower_list_mirror_power_dis_param,
            mirror_probability: config.follower_mirrors_a_friend_probability,
            remove_probability: config.follower_removes_a_mirror_probability,
            stripe_lock_count: STRIPE_LOCK_COUNT,
            thread_count: 5,
            batch_size: 1_000,
            max_unproductive_attempts: 1_000_000,
        },
        friend_adjacency,
        &config.mirror_edges_file_name,
        &config.remove_mirror_edges_file_name,
    )?;

    investor_names.join()?;
    tradebook_amounts.join()?;
    company_names.join()?;
    company_list.join()?;

    info!("data generation complete");
    Ok(())
}

/// A vertex or list generation job running on its own thread.
struct JoinableJob {
    handle: thread::JoinHandle<Result<(), EngineError>>,
}

impl JoinableJob {
    fn join(self) -> Result<(), EngineError> {
        self.handle.join().unwrap_or(Err(EngineError::WorkerPanicked))
    }
}

fn spawn_vertex_job<J>(job: Arc<J>, cfg: BatchConfig, path: String) -> JoinableJob
where
    J: crate::batch::BatchJob + 'static,
{
    JoinableJob {
        handle: thread::spawn(move || run_batch_engine(cfg, path, job)),
    }
}

fn spawn_permutation_job(start_id: u64, n: u64, header: &'static str, path: String) -> JoinableJob {
    JoinableJob {
        handle: thread::spawn(move || {
            let mut rng = RandomSource::from_entropy();
            PermutationGenerator::new(start_id, n)
                .generate_and_save(path, &format!("{header}\n"), &mut rng)
                .map(|_| ())
        }),
    }
}
