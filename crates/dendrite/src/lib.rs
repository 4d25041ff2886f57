//! A Rust library for NeuroEvolution of Augmenting Topologies (NEAT).
//!
//! dendrite evolves both the weights and the topology of small, sparse
//! neural networks. Callers supply a seed genome, a fitness evaluator and
//! an options file; the library drives trials of generations through
//! speciated reproduction until a solver appears or the budget runs out.

pub use dendrite_core::*;
pub use dendrite_engine::*;
pub use dendrite_error::{ErrorCode, NeatError, NeatResult, ResultExt};
pub use dendrite_net::*;

/// The commonly needed surface in one import.
pub mod prelude {
    pub use dendrite_core::{
        Genome, GenomeCompatMethod, InnovationTracker, NeatOptions, genome_from_str,
        genome_from_yaml_str, genome_to_string, genome_to_yaml_string, random_provider,
    };
    pub use dendrite_engine::{
        EpochExecutor, Generation, GenerationEvaluator, NoopObserver, Organism, Population,
        Species, TrialContext, TrialObserver, TrialOutcome, init_logging, run_trials,
    };
    pub use dendrite_error::{NeatError, NeatResult};
    pub use dendrite_net::{
        ActivationType, FastNetworkSolver, Network, NetworkSolver, NeuronRole,
    };
}
