use crate::epoch::EpochExecutor;
use crate::population::Population;
use dendrite_core::{Genome, NeatOptions};
use dendrite_error::{NeatError, NeatResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// What the evaluator learned about one generation.
///
/// The evaluator fills in `solved` and the winner statistics; the driver
/// reads `solved` to decide whether to run another epoch.
#[derive(Clone, Debug, Default)]
pub struct Generation {
    pub id: usize,
    pub trial_id: usize,
    pub solved: bool,
    pub best_fitness: f64,
    pub winner_nodes: usize,
    pub winner_genes: usize,
    pub champion: Option<Genome>,
}

impl Generation {
    pub fn new(trial_id: usize, id: usize) -> Self {
        Generation {
            id,
            trial_id,
            ..Generation::default()
        }
    }
}

/// Scores every organism in the population once per generation. The
/// evaluator owns the problem: XOR tables, pole-balancing simulators, and
/// whatever else lives behind this seam.
pub trait GenerationEvaluator {
    fn evaluate(&self, population: &mut Population, generation: &mut Generation) -> NeatResult<()>;
}

/// Optional hooks around trial and generation boundaries.
pub trait TrialObserver {
    fn trial_started(&self, _trial: usize) {}
    fn trial_finished(&self, _trial: usize, _outcome: &TrialOutcome) {}
    fn generation_evaluated(&self, _generation: &Generation) {}
}

/// A do-nothing observer for callers that only want the return value.
pub struct NoopObserver;

impl TrialObserver for NoopObserver {}

/// What one trial produced. Completed trials stay valid even when a later
/// trial aborts the run.
#[derive(Clone, Debug)]
pub struct TrialOutcome {
    pub trial_id: usize,
    pub solved: bool,
    pub winner_generation: Option<usize>,
    pub generations_run: usize,
    pub best_fitness: f64,
    pub champion: Option<Genome>,
}

/// Everything a run of trials needs besides the seed genome and evaluator.
pub struct TrialContext {
    pub options: NeatOptions,
    cancel: Arc<AtomicBool>,
}

impl TrialContext {
    pub fn new(options: NeatOptions) -> Self {
        TrialContext {
            options,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A handle the caller can flip from another thread to abort between
    /// generations.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn canceled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }
}

/// Run `num_runs` independent trials of up to `num_generations` each.
///
/// Per trial: spawn a population from the seed, verify it, then alternate
/// evaluate and epoch until the evaluator reports a solution or the budget
/// runs out. Cancellation is observed between evaluate and the next epoch;
/// it aborts the current trial and surfaces as [NeatError::Canceled], with
/// every earlier trial's outcome already in the caller's hands.
pub fn run_trials(
    ctx: &TrialContext,
    seed: &Genome,
    evaluator: &dyn GenerationEvaluator,
    observer: &dyn TrialObserver,
) -> NeatResult<Vec<TrialOutcome>> {
    let opts = &ctx.options;
    let mut outcomes = Vec::with_capacity(opts.num_runs);

    for trial_id in 0..opts.num_runs {
        info!(trial = trial_id, "trial started");
        observer.trial_started(trial_id);

        let outcome = run_single_trial(ctx, seed, evaluator, observer, trial_id);
        match outcome {
            Ok(outcome) => {
                info!(
                    trial = trial_id,
                    solved = outcome.solved,
                    generations = outcome.generations_run,
                    best_fitness = outcome.best_fitness,
                    "trial finished"
                );
                observer.trial_finished(trial_id, &outcome);
                outcomes.push(outcome);
            }
            Err(err) => return Err(err),
        }
    }

    Ok(outcomes)
}

fn run_single_trial(
    ctx: &TrialContext,
    seed: &Genome,
    evaluator: &dyn GenerationEvaluator,
    observer: &dyn TrialObserver,
    trial_id: usize,
) -> NeatResult<TrialOutcome> {
    let opts = &ctx.options;
    let executor = EpochExecutor::from_options(opts);

    let mut population = Population::spawn(seed, opts)?;
    population.verify()?;

    let mut outcome = TrialOutcome {
        trial_id,
        solved: false,
        winner_generation: None,
        generations_run: 0,
        best_fitness: 0.0,
        champion: None,
    };

    for gen_id in 0..opts.num_generations {
        let mut generation = Generation::new(trial_id, gen_id);
        evaluator.evaluate(&mut population, &mut generation)?;
        observer.generation_evaluated(&generation);
        outcome.generations_run = gen_id + 1;

        if generation.best_fitness > outcome.best_fitness {
            outcome.best_fitness = generation.best_fitness;
        }
        if generation.champion.is_some() {
            outcome.champion = generation.champion.clone();
        }

        if opts.print_every > 0 && gen_id % opts.print_every == 0 {
            info!(
                trial = trial_id,
                generation = gen_id,
                species = population.species.len(),
                best_fitness = generation.best_fitness,
                "generation evaluated"
            );
        } else {
            debug!(
                trial = trial_id,
                generation = gen_id,
                best_fitness = generation.best_fitness,
                "generation evaluated"
            );
        }

        if generation.solved {
            population.winner_generation = Some(gen_id);
            outcome.solved = true;
            outcome.winner_generation = Some(gen_id);
            info!(trial = trial_id, generation = gen_id, "solver found");
            break;
        }

        if ctx.canceled() {
            return Err(NeatError::Canceled);
        }

        executor.next_epoch(gen_id + 1, &mut population, opts)?;
    }

    Ok(outcome)
}

#[cfg(test)]
mod test {
    use super::*;
    use dendrite_core::{LinkGene, NodeGene, random_provider};
    use dendrite_net::NeuronRole;
    use std::sync::Mutex;

    fn seed_genome() -> Genome {
        Genome::from_parts(
            1,
            Vec::new(),
            vec![
                NodeGene::new(1, NeuronRole::Bias),
                NodeGene::new(2, NeuronRole::Input),
                NodeGene::new(3, NeuronRole::Input),
                NodeGene::new(4, NeuronRole::Output),
            ],
            vec![
                LinkGene::new(1, 4, 0.0, false, 1),
                LinkGene::new(2, 4, 0.0, false, 2),
                LinkGene::new(3, 4, 0.0, false, 3),
            ],
        )
    }

    /// Scores the mean absolute weight; declares a solver once any organism
    /// crosses a threshold.
    struct WeightMassEvaluator {
        threshold: f64,
    }

    impl GenerationEvaluator for WeightMassEvaluator {
        fn evaluate(
            &self,
            population: &mut Population,
            generation: &mut Generation,
        ) -> NeatResult<()> {
            for org in population.organisms.iter_mut() {
                let mass: f64 = org.genome.genes.iter().map(|g| g.weight.abs()).sum();
                org.fitness = mass / (1.0 + org.genome.genes.len() as f64);
                if org.fitness > generation.best_fitness {
                    generation.best_fitness = org.fitness;
                    generation.champion = Some(org.genome.duplicate(org.genome.id));
                }
                if org.fitness >= self.threshold {
                    org.is_winner = true;
                    generation.solved = true;
                    generation.winner_nodes = org.genome.nodes.len();
                    generation.winner_genes = org.genome.enabled_gene_count();
                }
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingObserver {
        events: Mutex<Vec<String>>,
    }

    impl TrialObserver for CountingObserver {
        fn trial_started(&self, trial: usize) {
            self.events.lock().unwrap().push(format!("start {}", trial));
        }
        fn trial_finished(&self, trial: usize, _outcome: &TrialOutcome) {
            self.events.lock().unwrap().push(format!("end {}", trial));
        }
        fn generation_evaluated(&self, generation: &Generation) {
            self.events
                .lock()
                .unwrap()
                .push(format!("gen {}", generation.id));
        }
    }

    #[test]
    fn trials_run_to_budget_and_report() {
        random_provider::set_seed(300);
        let mut opts = NeatOptions::default();
        opts.pop_size = 30;
        opts.num_runs = 2;
        opts.num_generations = 4;
        let ctx = TrialContext::new(opts);

        let evaluator = WeightMassEvaluator { threshold: f64::MAX };
        let observer = CountingObserver::default();
        let outcomes = run_trials(&ctx, &seed_genome(), &evaluator, &observer).unwrap();

        assert_eq!(outcomes.len(), 2);
        for outcome in &outcomes {
            assert!(!outcome.solved);
            assert_eq!(outcome.generations_run, 4);
            assert!(outcome.best_fitness > 0.0);
        }
        let events = observer.events.lock().unwrap();
        assert!(events.contains(&"start 0".to_string()));
        assert!(events.contains(&"end 1".to_string()));
        assert_eq!(events.iter().filter(|e| e.starts_with("gen")).count(), 8);
    }

    #[test]
    fn solver_stops_the_generation_loop() {
        random_provider::set_seed(301);
        let mut opts = NeatOptions::default();
        opts.pop_size = 30;
        opts.num_runs = 1;
        opts.num_generations = 50;
        let ctx = TrialContext::new(opts);

        // trivially solvable: any weight mass clears it after spawn
        let evaluator = WeightMassEvaluator { threshold: 1e-6 };
        let outcomes = run_trials(&ctx, &seed_genome(), &evaluator, &NoopObserver).unwrap();
        assert!(outcomes[0].solved);
        assert_eq!(outcomes[0].winner_generation, Some(0));
        assert_eq!(outcomes[0].generations_run, 1);
    }

    #[test]
    fn cancellation_aborts_between_generations() {
        random_provider::set_seed(302);
        let mut opts = NeatOptions::default();
        opts.pop_size = 20;
        opts.num_runs = 1;
        opts.num_generations = 100;
        let ctx = TrialContext::new(opts);
        ctx.cancel_handle().store(true, Ordering::Relaxed);

        let evaluator = WeightMassEvaluator { threshold: f64::MAX };
        let err = run_trials(&ctx, &seed_genome(), &evaluator, &NoopObserver).unwrap_err();
        assert_eq!(err.code(), dendrite_error::ErrorCode::Canceled);
    }

    #[test]
    fn seeded_trials_reproduce_outcomes() {
        let mut opts = NeatOptions::default();
        opts.pop_size = 30;
        opts.num_runs = 1;
        opts.num_generations = 5;

        let evaluator = WeightMassEvaluator { threshold: f64::MAX };

        let run = |seed: u64| {
            random_provider::set_seed(seed);
            let ctx = TrialContext::new(opts.clone());
            run_trials(&ctx, &seed_genome(), &evaluator, &NoopObserver).unwrap()
        };

        let first = run(12345);
        let second = run(12345);
        assert_eq!(first[0].best_fitness, second[0].best_fitness);
        assert_eq!(first[0].generations_run, second[0].generations_run);
    }
}
