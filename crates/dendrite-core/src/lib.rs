//! Genome representation, genetic operators and configuration for the
//! dendrite neuroevolution library.
//!
//! The genome side of NEAT lives here: [Genome] with its traits, node genes
//! and innovation-numbered link genes, the structural and weight mutation
//! operators, the three crossover operators, the per-generation
//! [InnovationTracker], and the [NeatOptions] carrier with its plain-text
//! and YAML parsers. Randomness flows through [random_provider] so whole
//! runs replay from a single seed.

pub mod genome;
pub mod innovation;
pub mod options;
pub mod random_provider;
pub mod thread_pool;

pub use genome::{Genome, LinkGene, NUM_TRAIT_PARAMS, NodeGene, TraitGene};
pub use genome::io::{genome_from_str, genome_to_string, read_genome, write_genome};
pub use genome::mating::{mate_multipoint, mate_multipoint_avg, mate_singlepoint};
pub use genome::mutation::{
    WeightMutationMode, mutate, mutate_add_link, mutate_add_node, mutate_connect_sensors,
    mutate_gene_reenable, mutate_link_trait, mutate_link_weights, mutate_node_trait,
    mutate_random_trait, mutate_toggle_enable,
};
pub use genome::yaml::{
    genome_from_yaml_str, genome_to_yaml_string, read_genome_yaml, write_genome_yaml,
};
pub use innovation::{AddLinkAlloc, AddNodeAlloc, Innovation, InnovationTracker};
pub use options::{EpochExecutorKind, GenomeCompatMethod, LogLevel, NeatOptions};
pub use thread_pool::{ThreadPool, WaitGroup};
