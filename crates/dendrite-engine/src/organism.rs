use dendrite_core::Genome;
use dendrite_error::NeatResult;
use dendrite_net::Network;
use std::cmp::Ordering;
use std::fmt::{self, Debug, Formatter};

/// A genome together with the phenotype expressed from it, plus the fitness
/// bookkeeping the population layer maintains.
///
/// `fitness` is raw as set by the evaluator until the organism's species
/// adjusts it in place; `original_fitness` keeps the pre-adjustment value
/// for reporting and improvement tracking.
#[derive(Clone)]
pub struct Organism {
    pub genome: Genome,
    pub net: Network,

    pub fitness: f64,
    pub original_fitness: f64,
    /// Scratch slot evaluators may use for a per-organism error measure.
    pub error: f64,
    pub expected_offspring: f64,

    pub generation: usize,
    pub species_id: Option<i64>,

    pub is_winner: bool,
    pub to_eliminate: bool,
    pub is_champion: bool,
    /// Extra champion clones granted by the stolen-babies redistribution.
    pub super_champ_offspring: usize,
    pub mut_struct_baby: bool,
    pub mate_baby: bool,
}

impl Organism {
    /// Express the genome and wrap it. Fails when the genome cannot build a
    /// phenotype (dangling gene endpoints).
    pub fn new(genome: Genome, generation: usize) -> NeatResult<Self> {
        let net = genome.genesis()?;
        Ok(Organism {
            genome,
            net,
            fitness: 0.0,
            original_fitness: 0.0,
            error: 0.0,
            expected_offspring: 0.0,
            generation,
            species_id: None,
            is_winner: false,
            to_eliminate: false,
            is_champion: false,
            super_champ_offspring: 0,
            mut_struct_baby: false,
            mate_baby: false,
        })
    }

    /// Rebuild the phenotype after the genome changed.
    pub fn update_phenotype(&mut self) -> NeatResult<()> {
        self.net = self.genome.genesis()?;
        Ok(())
    }

    pub fn complexity(&self) -> usize {
        self.genome.complexity()
    }

    /// Best-first ordering: fitness descending, complexity ascending on
    /// ties.
    pub fn cmp_best_first(&self, other: &Organism) -> Ordering {
        other
            .fitness
            .partial_cmp(&self.fitness)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.complexity().cmp(&other.complexity()))
    }
}

impl Debug for Organism {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Organism {{ genome: {}, fitness: {}, generation: {}, species: {:?} }}",
            self.genome.id, self.fitness, self.generation, self.species_id
        )
    }
}
