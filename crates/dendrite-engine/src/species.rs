use crate::organism::Organism;
use dendrite_core::genome::{mating, mutation};
use dendrite_core::{Genome, InnovationTracker, NeatOptions, random_provider};
use dendrite_error::NeatResult;
use std::fmt::{self, Debug, Formatter};

/// Species younger than this get the `age_significance` fitness boost.
const YOUTH_AGE: usize = 10;

/// Fitness multiplier applied to species that have stagnated past
/// `dropoff_age`.
const DROPOFF_PENALTY: f64 = 0.01;

/// A champion clone offspring is guaranteed once a species earns more than
/// this many babies.
const CHAMP_CLONE_MIN_OFFSPRING: usize = 5;

/// The champion genome of a species, snapshotted for interspecies mating.
#[derive(Clone, Debug)]
pub struct ChampionSnapshot {
    pub species_id: i64,
    pub genome: Genome,
    pub fitness: f64,
}

/// A group of mutually compatible organisms.
///
/// Members are indices into the population's organism arena, kept sorted
/// best-first after fitness adjustment. The representative genome is the
/// snapshot speciation compares against; it survives the purge of the old
/// generation.
#[derive(Clone)]
pub struct Species {
    pub id: i64,
    pub age: usize,
    pub age_of_last_improvement: usize,
    pub max_fitness_ever: f64,
    pub expected_offspring: usize,
    pub members: Vec<usize>,
    pub representative: Genome,
    pub obliterate: bool,
    pub novel: bool,
}

impl Species {
    pub fn new(id: i64, representative: Genome) -> Self {
        Species {
            id,
            age: 1,
            age_of_last_improvement: 1,
            max_fitness_ever: 0.0,
            expected_offspring: 0,
            members: Vec::new(),
            representative,
            obliterate: false,
            novel: true,
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Generations since the species last improved its best raw fitness.
    pub fn stagnation(&self) -> usize {
        self.age.saturating_sub(self.age_of_last_improvement)
    }

    pub fn champion_fitness(&self, organisms: &[Organism]) -> f64 {
        self.members
            .first()
            .map(|&i| organisms[i].original_fitness)
            .unwrap_or(0.0)
    }

    fn sort_members(&mut self, organisms: &[Organism]) {
        self.members
            .sort_by(|&a, &b| organisms[a].cmp_best_first(&organisms[b]));
    }

    /// Share fitness across the species, apply age boosts and stagnation
    /// penalties, mark the champion and flag everyone past the survival
    /// cutoff for elimination.
    pub fn adjust_fitness(&mut self, organisms: &mut [Organism], opts: &NeatOptions) {
        if self.members.is_empty() {
            return;
        }

        let age_debt =
            (self.age as i64 - self.age_of_last_improvement as i64 + 1) - opts.dropoff_age as i64;
        let age_debt = if age_debt == 0 { 1 } else { age_debt };
        let size = self.members.len() as f64;

        for &i in &self.members {
            let org = &mut organisms[i];
            org.original_fitness = org.fitness;

            if age_debt >= 1 || self.obliterate {
                org.fitness *= DROPOFF_PENALTY;
            }
            if self.age <= YOUTH_AGE {
                org.fitness *= opts.age_significance;
            }
            if org.fitness < 0.0 {
                org.fitness = 0.0001;
            }
            org.fitness /= size;
        }

        self.sort_members(organisms);

        let champ_idx = self.members[0];
        if organisms[champ_idx].original_fitness > self.max_fitness_ever {
            self.max_fitness_ever = organisms[champ_idx].original_fitness;
            self.age_of_last_improvement = self.age;
        }
        organisms[champ_idx].is_champion = true;

        let num_parents = (opts.survival_thresh * size + 1.0).floor() as usize;
        for &i in self.members.iter().skip(num_parents) {
            organisms[i].to_eliminate = true;
        }
    }

    /// Round the members' fractional expected offspring into this species'
    /// integer count, carrying the fractional skim to the next species so
    /// the population total stays exact.
    pub fn count_offspring(&mut self, organisms: &[Organism], mut skim: f64) -> f64 {
        let mut expected = 0usize;
        for &i in &self.members {
            let e = organisms[i].expected_offspring;
            expected += e.trunc() as usize;
            skim += e.fract();
            if skim >= 1.0 {
                let whole = skim.floor();
                expected += whole as usize;
                skim -= whole;
            }
        }
        self.expected_offspring = expected;
        skim
    }

    /// Produce this species' allotted offspring.
    ///
    /// The champion is cloned unchanged once when the allotment is large
    /// enough; super-champion grants produce weight-mutated champion copies;
    /// every other child either mutates a clone or mates two parents from
    /// the survivor pool, occasionally borrowing another species' champion.
    /// Baby genome ids are `id_base..id_base + expected_offspring`, assigned
    /// before dispatch so parallel reproduction stays deterministic.
    pub fn reproduce(
        &self,
        organisms: &[Organism],
        generation: usize,
        opts: &NeatOptions,
        tracker: &InnovationTracker,
        champions: &[ChampionSnapshot],
        id_base: i64,
    ) -> NeatResult<Vec<Organism>> {
        if self.expected_offspring == 0 || self.members.is_empty() {
            return Ok(Vec::new());
        }

        let pool: Vec<&Organism> = self
            .members
            .iter()
            .map(|&i| &organisms[i])
            .filter(|o| !o.to_eliminate)
            .collect();
        let pool: Vec<&Organism> = if pool.is_empty() {
            self.members.iter().map(|&i| &organisms[i]).collect()
        } else {
            pool
        };

        let champ = &organisms[self.members[0]];
        let others: Vec<&ChampionSnapshot> = champions
            .iter()
            .filter(|c| c.species_id != self.id)
            .collect();

        let mut super_champ_left = champ.super_champ_offspring;
        let mut champ_cloned = false;
        let mut babies = Vec::with_capacity(self.expected_offspring);

        for count in 0..self.expected_offspring {
            let baby_id = id_base + count as i64;
            let mut mut_struct_baby = false;
            let mut mate_baby = false;

            let baby_genome = if super_champ_left > 0 {
                let mut g = champ.genome.duplicate(baby_id);
                if super_champ_left > 1 {
                    mutation::mutate_link_weights(
                        &mut g,
                        opts.weight_mut_power,
                        1.0,
                        mutation::WeightMutationMode::Gaussian,
                    );
                }
                super_champ_left -= 1;
                g
            } else if !champ_cloned && self.expected_offspring > CHAMP_CLONE_MIN_OFFSPRING {
                champ_cloned = true;
                champ.genome.duplicate(baby_id)
            } else if random_provider::bool(opts.mutate_only_prob) || pool.len() == 1 {
                let mom = random_provider::choose(&pool);
                let mut g = mom.genome.duplicate(baby_id);
                let before = (g.nodes.len(), g.genes.len());
                mutation::mutate(&mut g, tracker, opts)?;
                mut_struct_baby = (g.nodes.len(), g.genes.len()) != before;
                g
            } else {
                let mom = random_provider::choose(&pool);
                let (dad_genome, dad_fitness) = if !others.is_empty()
                    && random_provider::bool(opts.interspecies_mate_rate)
                {
                    let snapshot = random_provider::choose(&others);
                    (&snapshot.genome, snapshot.fitness)
                } else {
                    let dad = random_provider::choose(&pool);
                    (&dad.genome, dad.fitness)
                };

                let mut g = self.cross(
                    &mom.genome,
                    mom.fitness,
                    dad_genome,
                    dad_fitness,
                    baby_id,
                    opts,
                )?;
                mate_baby = true;

                let parents_identical = mom.genome.id == dad_genome.id;
                if parents_identical || !random_provider::bool(opts.mate_only_prob) {
                    let before = (g.nodes.len(), g.genes.len());
                    mutation::mutate(&mut g, tracker, opts)?;
                    mut_struct_baby = (g.nodes.len(), g.genes.len()) != before;
                }
                g
            };

            let mut baby = Organism::new(baby_genome, generation)?;
            baby.mut_struct_baby = mut_struct_baby;
            baby.mate_baby = mate_baby;
            babies.push(baby);
        }

        Ok(babies)
    }

    fn cross(
        &self,
        mom: &Genome,
        mom_fitness: f64,
        dad: &Genome,
        dad_fitness: f64,
        child_id: i64,
        opts: &NeatOptions,
    ) -> NeatResult<Genome> {
        let total =
            opts.mate_multipoint_prob + opts.mate_multipoint_avg_prob + opts.mate_singlepoint_prob;
        if total <= 0.0 {
            return mating::mate_multipoint(mom, mom_fitness, dad, dad_fitness, child_id);
        }

        let roll = random_provider::random::<f64>() * total;
        if roll < opts.mate_multipoint_prob {
            mating::mate_multipoint(mom, mom_fitness, dad, dad_fitness, child_id)
        } else if roll < opts.mate_multipoint_prob + opts.mate_multipoint_avg_prob {
            mating::mate_multipoint_avg(mom, mom_fitness, dad, dad_fitness, child_id)
        } else {
            mating::mate_singlepoint(mom, mom_fitness, dad, dad_fitness, child_id)
        }
    }
}

impl Debug for Species {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Species {{ id: {}, age: {}, members: {}, expected: {}, stagnation: {} }}",
            self.id,
            self.age,
            self.members.len(),
            self.expected_offspring,
            self.stagnation()
        )
    }
}
