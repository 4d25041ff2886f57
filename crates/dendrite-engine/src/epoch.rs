use crate::organism::Organism;
use crate::population::Population;
use dendrite_core::thread_pool::ThreadPool;
use dendrite_core::{EpochExecutorKind, NeatOptions, random_provider};
use dendrite_error::NeatResult;
use std::sync::Arc;

/// Runs one generation transition.
///
/// Both variants execute the same population-level algorithm; the parallel
/// one fans per-species reproduction out onto a worker pool. Every species
/// reproduces under a scoped seed derived from an epoch-level draw and the
/// species id, so the two variants produce identical populations from the
/// same global seed.
pub enum EpochExecutor {
    Sequential,
    Parallel(ThreadPool),
}

impl EpochExecutor {
    pub fn from_options(opts: &NeatOptions) -> Self {
        match opts.epoch_executor {
            EpochExecutorKind::Sequential => EpochExecutor::Sequential,
            EpochExecutorKind::Parallel => {
                let workers = std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1);
                EpochExecutor::Parallel(ThreadPool::new(workers))
            }
        }
    }

    /// Produce and install the next generation.
    pub fn next_epoch(
        &self,
        generation: usize,
        population: &mut Population,
        opts: &NeatOptions,
    ) -> NeatResult<()> {
        population.prepare_reproduction(opts)?;

        let epoch_seed: u64 = random_provider::random();
        let champions = Arc::new(population.champions_snapshot());

        // id ranges are carved out serially, in species order, so baby
        // genome ids do not depend on worker scheduling
        let id_bases: Vec<i64> = population
            .species
            .iter()
            .map(|s| {
                population
                    .genome_ids()
                    .fetch_add(s.expected_offspring as i64, std::sync::atomic::Ordering::Relaxed)
            })
            .collect();

        let babies = match self {
            EpochExecutor::Sequential => {
                let mut all = Vec::with_capacity(opts.pop_size);
                for si in 0..population.species.len() {
                    let seed = species_seed(epoch_seed, population.species[si].id);
                    let brood = random_provider::scoped_seed(seed, || {
                        population.species[si].reproduce(
                            &population.organisms,
                            generation,
                            opts,
                            population.innovations(),
                            &champions,
                            id_bases[si],
                        )
                    })?;
                    all.extend(brood);
                }
                all
            }
            EpochExecutor::Parallel(pool) => {
                let arena: Arc<Vec<Organism>> =
                    Arc::new(std::mem::take(&mut population.organisms));

                let mut pending = Vec::with_capacity(population.species.len());
                for (si, species) in population.species.iter().enumerate() {
                    let species = species.clone();
                    let arena = Arc::clone(&arena);
                    let champions = Arc::clone(&champions);
                    let tracker = Arc::clone(population.innovations());
                    let opts = opts.clone();
                    let seed = species_seed(epoch_seed, species.id);
                    let id_base = id_bases[si];

                    pending.push(pool.submit_with_result(move || {
                        random_provider::scoped_seed(seed, || {
                            species.reproduce(
                                &arena,
                                generation,
                                &opts,
                                &tracker,
                                &champions,
                                id_base,
                            )
                        })
                    }));
                }

                let mut all = Vec::with_capacity(opts.pop_size);
                let mut first_error = None;
                for work in pending {
                    match work.result() {
                        Ok(brood) => all.extend(brood),
                        Err(err) => {
                            if first_error.is_none() {
                                first_error = Some(err);
                            }
                        }
                    }
                }

                population.organisms =
                    Arc::try_unwrap(arena).unwrap_or_else(|shared| (*shared).clone());

                if let Some(err) = first_error {
                    return Err(err);
                }
                all
            }
        };

        population.install_generation(babies, opts)
    }
}

/// A per-species reproduction seed: a function of nothing but the epoch
/// draw and the species id, so the schedule of workers cannot influence it.
fn species_seed(epoch_seed: u64, species_id: i64) -> u64 {
    epoch_seed
        .wrapping_mul(0x9E3779B97F4A7C15)
        .wrapping_add((species_id as u64).wrapping_mul(0xD1B54A32D192ED03))
}
