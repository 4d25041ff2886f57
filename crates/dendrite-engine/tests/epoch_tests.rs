use dendrite_engine::{EpochExecutor, Population};
use dendrite_core::{Genome, LinkGene, NeatOptions, NodeGene, random_provider};
use dendrite_net::NeuronRole;

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

fn score_by_weight_mass(population: &mut Population) {
    for org in population.organisms.iter_mut() {
        let mass: f64 = org.genome.genes.iter().map(|g| g.weight.abs()).sum();
        org.fitness = 0.1 + mass / (1.0 + org.genome.genes.len() as f64);
    }
}

#[test]
fn stolen_babies_keep_the_population_size_exact() {
    random_provider::set_seed(1100);
    let mut opts = NeatOptions::default();
    opts.pop_size = 80;
    opts.babies_stolen = 10;
    // force many species so there are donors and receivers
    opts.compat_threshold = 0.2;
    opts.mutdiff_coeff = 1.0;

    let mut population = Population::spawn(&seed_genome(), &opts).unwrap();
    let executor = EpochExecutor::Sequential;

    for generation in 1..=8 {
        score_by_weight_mass(&mut population);
        executor
            .next_epoch(generation, &mut population, &opts)
            .unwrap();
        assert_eq!(population.organisms.len(), opts.pop_size);
        population.verify().unwrap();
    }
}

#[test]
fn stagnating_species_lose_ground_to_improving_ones() {
    random_provider::set_seed(1200);
    let mut opts = NeatOptions::default();
    opts.pop_size = 60;
    opts.dropoff_age = 4;
    opts.compat_threshold = 0.2;
    opts.mutdiff_coeff = 1.0;

    let mut population = Population::spawn(&seed_genome(), &opts).unwrap();
    let executor = EpochExecutor::Sequential;
    let initial_species = population.species.len();
    assert!(initial_species > 1);

    // constant fitness everywhere: every species stagnates together, and
    // the penalty plus re-speciation must still keep the partition legal
    for generation in 1..=10 {
        for org in population.organisms.iter_mut() {
            org.fitness = 1.0;
        }
        executor
            .next_epoch(generation, &mut population, &opts)
            .unwrap();
        population.verify().unwrap();
    }
}

#[test]
fn speciation_splits_and_adopts_by_threshold() {
    random_provider::set_seed(1300);
    let mut opts = NeatOptions::default();
    // the seed clones differ only in weights; a generous threshold puts
    // everyone in one species
    opts.pop_size = 25;
    opts.compat_threshold = 100.0;
    let population = Population::spawn(&seed_genome(), &opts).unwrap();
    assert_eq!(population.species.len(), 1);
    assert_eq!(population.species[0].members.len(), 25);

    // a strict threshold with a weight-sensitive metric shatters them
    opts.compat_threshold = 0.01;
    opts.mutdiff_coeff = 1.0;
    let population = Population::spawn(&seed_genome(), &opts).unwrap();
    assert!(population.species.len() > 5);
    population.verify().unwrap();
}

#[test]
fn champion_structure_survives_a_generation() {
    random_provider::set_seed(1400);
    let mut opts = NeatOptions::default();
    opts.pop_size = 40;
    // everyone lands in one species, so the champion clone is guaranteed
    opts.compat_threshold = 100.0;

    let mut population = Population::spawn(&seed_genome(), &opts).unwrap();
    score_by_weight_mass(&mut population);
    let champion_weights: Vec<f64> = {
        let best = population
            .organisms
            .iter()
            .min_by(|a, b| a.cmp_best_first(b))
            .unwrap();
        best.genome.genes.iter().map(|g| g.weight).collect()
    };

    let executor = EpochExecutor::Sequential;
    executor.next_epoch(1, &mut population, &opts).unwrap();

    let survived = population.organisms.iter().any(|org| {
        org.genome.genes.len() == champion_weights.len()
            && org
                .genome
                .genes
                .iter()
                .zip(&champion_weights)
                .all(|(g, &w)| g.weight == w)
    });
    assert!(survived, "the champion clone went missing");
}
