use crate::organism::Organism;
use crate::species::{ChampionSnapshot, Species};
use dendrite_core::genome::mutation::{self, WeightMutationMode};
use dendrite_core::{Genome, InnovationTracker, NeatOptions};
use dendrite_error::{NeatResult, dendrite_bail};
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;
use std::sync::atomic::AtomicI64;

/// Share of a stolen-babies pool granted to the best, second and third
/// ranked species.
const STOLEN_SHARES: [f64; 3] = [0.5, 0.25, 0.25];

/// The root object of a run: every organism, the species partition over
/// them, and the innovation bookkeeping for the current generation.
///
/// Organisms live in a flat arena; species hold indices into it. The arena
/// is rebuilt wholesale at each epoch, so indices never dangle across
/// generations.
pub struct Population {
    pub species: Vec<Species>,
    pub organisms: Vec<Organism>,
    pub innovations: Arc<InnovationTracker>,
    pub winner_generation: Option<usize>,

    next_species_id: i64,
    next_genome_id: Arc<AtomicI64>,
}

impl Population {
    /// Grow a population from a seed genome: `pop_size` clones with
    /// randomized link weights, expressed and speciated. Innovation and
    /// node-id counters start just past the seed's maxima.
    pub fn spawn(seed: &Genome, opts: &NeatOptions) -> NeatResult<Population> {
        let mut organisms = Vec::with_capacity(opts.pop_size);
        for count in 1..=opts.pop_size {
            let mut genome = seed.duplicate(count as i64);
            mutation::mutate_link_weights(&mut genome, 1.0, 1.0, WeightMutationMode::ColdGaussian);
            organisms.push(Organism::new(genome, 0)?);
        }

        let mut population = Population {
            species: Vec::new(),
            organisms,
            innovations: Arc::new(InnovationTracker::new(
                seed.max_node_id() + 1,
                seed.max_innovation() + 1,
            )),
            winner_generation: None,
            next_species_id: 1,
            next_genome_id: Arc::new(AtomicI64::new(opts.pop_size as i64 + 1)),
        };

        for idx in 0..population.organisms.len() {
            population.speciate_organism(idx, opts);
        }

        Ok(population)
    }

    pub fn innovations(&self) -> &Arc<InnovationTracker> {
        &self.innovations
    }

    pub(crate) fn genome_ids(&self) -> &Arc<AtomicI64> {
        &self.next_genome_id
    }

    /// The best organism by raw fitness, complexity breaking ties.
    pub fn best_organism(&self) -> Option<&Organism> {
        self.organisms
            .iter()
            .min_by(|a, b| a.cmp_best_first(b))
    }

    /// Walk the species list in stable id order; the first whose
    /// representative is within `compat_threshold` adopts the organism, and
    /// a miss founds a new species seeded with it.
    pub fn speciate_organism(&mut self, idx: usize, opts: &NeatOptions) {
        let genome = &self.organisms[idx].genome;

        for species in self.species.iter_mut() {
            let distance = genome.compatibility(&species.representative, opts);
            if distance <= opts.compat_threshold {
                species.members.push(idx);
                self.organisms[idx].species_id = Some(species.id);
                return;
            }
        }

        let id = self.next_species_id;
        self.next_species_id += 1;
        let mut species = Species::new(id, genome.duplicate(genome.id));
        species.members.push(idx);
        self.species.push(species);
        self.organisms[idx].species_id = Some(id);
    }

    /// Check the population invariants: every genome verifies, and the
    /// species partition covers every organism exactly once.
    pub fn verify(&self) -> NeatResult<()> {
        for organism in &self.organisms {
            organism.genome.verify()?;
        }

        let mut seen = vec![0usize; self.organisms.len()];
        for species in &self.species {
            if species.is_empty() {
                dendrite_bail!(GenomeInvariant: "species {} has no members", species.id);
            }
            for &idx in &species.members {
                if idx >= seen.len() {
                    dendrite_bail!(GenomeInvariant:
                        "species {} points past the organism arena", species.id);
                }
                seen[idx] += 1;
            }
        }
        for (idx, &count) in seen.iter().enumerate() {
            if count != 1 {
                dendrite_bail!(GenomeInvariant:
                    "organism {} belongs to {} species", idx, count);
            }
        }
        Ok(())
    }

    /// Steps 1-5 of the generation transition: fitness adjustment, expected
    /// offspring allocation with exact pop-size rounding, the stolen-babies
    /// redistribution and removal marking.
    pub(crate) fn prepare_reproduction(&mut self, opts: &NeatOptions) -> NeatResult<()> {
        for species in self.species.iter_mut() {
            species.adjust_fitness(&mut self.organisms, opts);
        }

        let total_adjusted: f64 = self.organisms.iter().map(|o| o.fitness).sum();
        let mean_adjusted = total_adjusted / self.organisms.len() as f64;

        for organism in self.organisms.iter_mut() {
            organism.expected_offspring = if mean_adjusted > 0.0 {
                // clip so one runaway organism cannot soak the whole budget
                (organism.fitness / mean_adjusted).min(opts.pop_size as f64)
            } else {
                1.0
            };
        }

        let mut skim = 0.0;
        for species in self.species.iter_mut() {
            skim = species.count_offspring(&self.organisms, skim);
        }

        // obliterated species surrender their allotment before accounting
        for species in self.species.iter_mut() {
            if species.obliterate {
                species.expected_offspring = 0;
            }
        }

        if opts.babies_stolen > 0 {
            self.steal_babies(opts);
        }

        self.rebalance_offspring(opts);

        Ok(())
    }

    /// Force the sum of species offspring counts to `pop_size` exactly,
    /// padding or trimming the best-endowed surviving species.
    fn rebalance_offspring(&mut self, opts: &NeatOptions) {
        loop {
            let total: usize = self.species.iter().map(|s| s.expected_offspring).sum();
            if total == opts.pop_size {
                return;
            }
            let best = self
                .species
                .iter()
                .enumerate()
                .filter(|(_, s)| !s.obliterate)
                .max_by_key(|(_, s)| s.expected_offspring)
                .map(|(i, _)| i)
                .or_else(|| {
                    self.species
                        .iter()
                        .enumerate()
                        .max_by_key(|(_, s)| s.expected_offspring)
                        .map(|(i, _)| i)
                });
            let Some(best) = best else { return };
            if total < opts.pop_size {
                self.species[best].expected_offspring += 1;
            } else if self.species[best].expected_offspring > 0 {
                self.species[best].expected_offspring -= 1;
            } else {
                return;
            }
        }
    }

    /// Species indices ranked by champion raw fitness, best first;
    /// obliterated species are left out entirely.
    fn ranked_species(&self) -> Vec<usize> {
        let mut ranked: Vec<usize> = (0..self.species.len())
            .filter(|&i| !self.species[i].obliterate)
            .collect();
        ranked.sort_by(|&a, &b| {
            let fa = self.species[a].champion_fitness(&self.organisms);
            let fb = self.species[b].champion_fitness(&self.organisms);
            fb.partial_cmp(&fa).unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked
    }

    /// The bottom species surrender up to `babies_stolen` offspring, which
    /// flow to the top three species in 50/25/25 shares; any residual goes
    /// to the overall fitness leader as super-champion grants.
    fn steal_babies(&mut self, opts: &NeatOptions) {
        let ranked = self.ranked_species();

        let mut pool = 0usize;
        for &si in ranked.iter().rev() {
            if pool >= opts.babies_stolen {
                break;
            }
            let species = &mut self.species[si];
            if species.age > 5 && species.expected_offspring > 1 {
                let take = (species.expected_offspring - 1).min(opts.babies_stolen - pool);
                species.expected_offspring -= take;
                pool += take;
            }
        }
        if pool == 0 {
            return;
        }

        let mut granted = 0usize;
        for (rank, share) in STOLEN_SHARES.iter().enumerate() {
            if let Some(&si) = ranked.get(rank) {
                let quota = (pool as f64 * share).floor() as usize;
                if quota == 0 {
                    continue;
                }
                let species = &mut self.species[si];
                species.expected_offspring += quota;
                if let Some(&champ) = species.members.first() {
                    self.organisms[champ].super_champ_offspring += quota;
                }
                granted += quota;
            }
        }

        let residual = pool - granted;
        if residual > 0 {
            if let Some(&si) = ranked.first() {
                let species = &mut self.species[si];
                species.expected_offspring += residual;
                if let Some(&champ) = species.members.first() {
                    self.organisms[champ].super_champ_offspring += residual;
                }
            }
        }
    }

    /// Champion genomes per species, used for interspecies mating while the
    /// arena is borrowed by reproduction workers.
    pub(crate) fn champions_snapshot(&self) -> Vec<ChampionSnapshot> {
        self.species
            .iter()
            .filter_map(|s| {
                s.members.first().map(|&i| ChampionSnapshot {
                    species_id: s.id,
                    genome: self.organisms[i].genome.duplicate(self.organisms[i].genome.id),
                    fitness: self.organisms[i].fitness,
                })
            })
            .collect()
    }

    /// Steps 7-8 of the generation transition: renumber this generation's
    /// innovations canonically, drop the old generation, refresh species
    /// representatives, re-speciate the newborns, drop species that adopted
    /// no one and advance the survivors' ages.
    pub(crate) fn install_generation(
        &mut self,
        mut babies: Vec<Organism>,
        opts: &NeatOptions,
    ) -> NeatResult<()> {
        let (innovation_map, node_id_map) = self.innovations.canonical_maps();
        if !innovation_map.is_empty() || !node_id_map.is_empty() {
            for baby in babies.iter_mut() {
                let mut touched = false;
                for node in baby.genome.nodes.iter_mut() {
                    if let Some(&id) = node_id_map.get(&node.id) {
                        node.id = id;
                        touched = true;
                    }
                }
                for gene in baby.genome.genes.iter_mut() {
                    if let Some(&num) = innovation_map.get(&gene.innovation) {
                        gene.innovation = num;
                        touched = true;
                    }
                    if let Some(&id) = node_id_map.get(&gene.in_node) {
                        gene.in_node = id;
                        touched = true;
                    }
                    if let Some(&id) = node_id_map.get(&gene.out_node) {
                        gene.out_node = id;
                        touched = true;
                    }
                }
                if touched {
                    baby.genome.nodes.sort_by_key(|n| n.id);
                    baby.genome.genes.sort_by_key(|g| g.innovation);
                    baby.update_phenotype()?;
                }
            }
        }

        for species in self.species.iter_mut() {
            if let Some(&first) = species.members.first() {
                let genome = &self.organisms[first].genome;
                species.representative = genome.duplicate(genome.id);
            }
            species.members.clear();
        }

        self.organisms = babies;
        for idx in 0..self.organisms.len() {
            self.speciate_organism(idx, opts);
        }

        self.species.retain(|s| !s.members.is_empty());
        for species in self.species.iter_mut() {
            // species founded during this re-speciation keep their age
            if species.novel {
                species.novel = false;
            } else {
                species.age += 1;
            }
            species.expected_offspring = 0;
        }

        self.innovations.reset();
        Ok(())
    }
}

impl Debug for Population {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Population {{ organisms: {}, species: {}, winner: {:?} }}",
            self.organisms.len(),
            self.species.len(),
            self.winner_generation
        )
    }
}
