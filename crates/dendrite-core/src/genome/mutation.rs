use crate::genome::genome::Genome;
use crate::genome::link_gene::LinkGene;
use crate::genome::node_gene::NodeGene;
use crate::innovation::InnovationTracker;
use crate::options::NeatOptions;
use crate::random_provider;
use dendrite_error::NeatResult;
use dendrite_net::NeuronRole;

/// Weights either drift by a gaussian-style perturbation or get replaced
/// outright.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WeightMutationMode {
    Gaussian,
    ColdGaussian,
}

/// Hard cap on connection weights; perturbation can otherwise run away over
/// thousands of generations.
const WEIGHT_CAP: f64 = 500.0;

/// Genomes below this gene count pick their split gene by a biased scan
/// toward older genes instead of uniform probing.
const SMALL_GENOME_GENES: usize = 15;

/// Probes used to find a splittable gene in larger genomes.
const GENE_PROBE_TRIES: usize = 20;

/// Magnitude of freshly rolled link weights.
const NEW_WEIGHT_SPAN: f64 = 10.0;

/// Run the configured mutation cascade on a freshly reproduced genome.
///
/// Structural changes are exclusive: one roll decides between add-node,
/// add-link and connect-sensors. When none fires, each non-structural
/// operator rolls independently.
pub fn mutate(genome: &mut Genome, tracker: &InnovationTracker, opts: &NeatOptions) -> NeatResult<()> {
    if random_provider::bool(opts.mutate_add_node_prob) {
        mutate_add_node(genome, tracker, opts)?;
    } else if random_provider::bool(opts.mutate_add_link_prob) {
        mutate_add_link(genome, tracker, opts)?;
    } else if random_provider::bool(opts.mutate_connect_sensors) {
        mutate_connect_sensors(genome, tracker)?;
    } else {
        if random_provider::bool(opts.mutate_random_trait_prob) {
            mutate_random_trait(genome, opts);
        }
        if random_provider::bool(opts.mutate_link_trait_prob) {
            mutate_link_trait(genome);
        }
        if random_provider::bool(opts.mutate_node_trait_prob) {
            mutate_node_trait(genome);
        }
        if random_provider::bool(opts.mutate_link_weights_prob) {
            mutate_link_weights(
                genome,
                opts.weight_mut_power,
                1.0,
                WeightMutationMode::Gaussian,
            );
        }
        if random_provider::bool(opts.mutate_toggle_enable_prob) {
            mutate_toggle_enable(genome);
        }
        if random_provider::bool(opts.mutate_gene_reenable_prob) {
            mutate_gene_reenable(genome);
        }
    }
    Ok(())
}

/// Split an enabled link with a new hidden neuron.
///
/// The split link is disabled and replaced by `in -> new` with weight 1.0
/// and `new -> out` carrying the old weight and recurrency. An identical
/// split earlier in the same generation hands back its node id and
/// innovation pair.
pub fn mutate_add_node(
    genome: &mut Genome,
    tracker: &InnovationTracker,
    opts: &NeatOptions,
) -> NeatResult<bool> {
    if genome.genes.is_empty() {
        return Ok(false);
    }

    let splittable = |genome: &Genome, idx: usize| {
        let gene = &genome.genes[idx];
        let from_bias = genome
            .node_by_id(gene.in_node)
            .map(|n| n.role == NeuronRole::Bias)
            .unwrap_or(false);
        gene.enabled && !from_bias
    };

    let mut found = None;
    if genome.genes.len() < SMALL_GENOME_GENES {
        // favor older genes so early structure keeps getting refined
        for idx in 0..genome.genes.len() {
            if splittable(genome, idx) && random_provider::random::<f64>() >= 0.3 {
                found = Some(idx);
                break;
            }
        }
    } else {
        for _ in 0..GENE_PROBE_TRIES {
            let idx = random_provider::index(genome.genes.len());
            if splittable(genome, idx) {
                found = Some(idx);
                break;
            }
        }
    }

    let Some(idx) = found else {
        return Ok(false);
    };

    genome.genes[idx].enabled = false;
    let old_weight = genome.genes[idx].weight;
    let old_innovation = genome.genes[idx].innovation;
    let in_node = genome.genes[idx].in_node;
    let out_node = genome.genes[idx].out_node;
    let recurrent = genome.genes[idx].recurrent;
    let trait_id = genome.genes[idx].trait_id;

    let alloc = tracker.check_add_node(in_node, out_node, old_innovation);
    let activation = opts.random_node_activator()?;

    genome.insert_node(
        NodeGene::new(alloc.node_id, NeuronRole::Hidden)
            .with_activation(activation)
            .with_trait(trait_id),
    );
    genome.insert_gene(LinkGene::new(in_node, alloc.node_id, 1.0, false, alloc.innovation_a));
    genome.insert_gene(
        LinkGene::new(alloc.node_id, out_node, old_weight, recurrent, alloc.innovation_b)
            .with_trait(trait_id),
    );

    Ok(true)
}

/// Try to wire a new link between two previously unconnected nodes.
///
/// Candidate targets are never sensors. `recur_only_prob` steers the search
/// toward recurrent candidates, half of which are self-loops. Each candidate
/// is classified by the phenotype's backward walk; if the walk's visit
/// budget runs dry the mutation gives up entirely. Running out of tries is a
/// soft no-op.
pub fn mutate_add_link(
    genome: &mut Genome,
    tracker: &InnovationTracker,
    opts: &NeatOptions,
) -> NeatResult<bool> {
    let all: Vec<i64> = genome.nodes.iter().map(|n| n.id).collect();
    let neurons: Vec<i64> = genome
        .nodes
        .iter()
        .filter(|n| n.is_neuron())
        .map(|n| n.id)
        .collect();
    if all.is_empty() || neurons.is_empty() {
        return Ok(false);
    }

    let net = genome.genesis()?;
    let thresh = genome.nodes.len() * genome.nodes.len();
    let want_recurrent = random_provider::bool(opts.recur_only_prob);

    for _ in 0..opts.newlink_tries {
        let (from_id, to_id) = if want_recurrent && random_provider::bool(0.5) {
            // self-loop candidate
            let id = *random_provider::choose(&neurons);
            (id, id)
        } else {
            (
                *random_provider::choose(&all),
                *random_provider::choose(&neurons),
            )
        };

        if genome.has_link(from_id, to_id, want_recurrent) {
            continue;
        }

        let (from_idx, to_idx) = match (net.node_index_by_id(from_id), net.node_index_by_id(to_id))
        {
            (Some(f), Some(t)) => (f, t),
            _ => continue,
        };

        let Some(is_recurrent) = net.is_recurrent(from_idx, to_idx, thresh) else {
            // the backward walk hit its visit budget; bail out of the mutation
            return Ok(false);
        };

        if is_recurrent != want_recurrent {
            continue;
        }

        let weight = random_provider::pos_neg() * random_provider::random::<f64>() * NEW_WEIGHT_SPAN;
        let alloc = tracker.check_add_link(from_id, to_id, is_recurrent);

        let trait_id = if genome.traits.is_empty() {
            None
        } else {
            Some(random_provider::choose(&genome.traits).id)
        };

        genome.insert_gene(
            LinkGene::new(from_id, to_id, weight, is_recurrent, alloc.innovation)
                .with_trait(trait_id),
        );
        return Ok(true);
    }

    Ok(false)
}

/// Wire every sensor that has no outgoing enabled link to a randomly chosen
/// neuron. Returns whether any link was added.
pub fn mutate_connect_sensors(genome: &mut Genome, tracker: &InnovationTracker) -> NeatResult<bool> {
    let disconnected: Vec<i64> = genome
        .nodes
        .iter()
        .filter(|n| n.is_sensor())
        .filter(|sensor| {
            !genome
                .genes
                .iter()
                .any(|g| g.enabled && g.in_node == sensor.id)
        })
        .map(|n| n.id)
        .collect();

    if disconnected.is_empty() {
        return Ok(false);
    }

    let neurons: Vec<i64> = genome
        .nodes
        .iter()
        .filter(|n| n.is_neuron())
        .map(|n| n.id)
        .collect();
    if neurons.is_empty() {
        return Ok(false);
    }

    let mut connected = false;
    for sensor in disconnected {
        let target = *random_provider::choose(&neurons);
        if genome.has_link(sensor, target, false) {
            continue;
        }
        let weight = random_provider::pos_neg() * random_provider::random::<f64>() * NEW_WEIGHT_SPAN;
        let alloc = tracker.check_add_link(sensor, target, false);
        genome.insert_gene(LinkGene::new(sensor, target, weight, false, alloc.innovation));
        connected = true;
    }

    Ok(connected)
}

/// Flip the enabled flag of one random gene. Disabling is skipped when the
/// gene is the only enabled link into its out-node.
pub fn mutate_toggle_enable(genome: &mut Genome) -> bool {
    if genome.genes.is_empty() {
        return false;
    }

    let idx = random_provider::index(genome.genes.len());
    if genome.genes[idx].enabled {
        let out_node = genome.genes[idx].out_node;
        let innovation = genome.genes[idx].innovation;
        let has_other_inlet = genome
            .genes
            .iter()
            .any(|g| g.enabled && g.out_node == out_node && g.innovation != innovation);
        if !has_other_inlet {
            return false;
        }
        genome.genes[idx].enabled = false;
    } else {
        genome.genes[idx].enabled = true;
    }
    true
}

/// Re-enable the oldest disabled gene, if any.
pub fn mutate_gene_reenable(genome: &mut Genome) -> bool {
    for gene in genome.genes.iter_mut() {
        if !gene.enabled {
            gene.enabled = true;
            return true;
        }
    }
    false
}

/// Perturb or replace connection weights across the whole gene list.
///
/// A severe pass touches almost everything; otherwise the tail of a long
/// genome is perturbed harder than the head, keeping old structure stable.
/// `mutation_num` follows the weight so the compatibility metric sees the
/// drift.
pub fn mutate_link_weights(genome: &mut Genome, power: f64, rate: f64, mode: WeightMutationMode) {
    if genome.genes.is_empty() {
        return;
    }

    let severe = random_provider::bool(0.5);
    let gene_total = genome.genes.len() as f64;
    let end_part = gene_total * 0.8;
    let mut num = 0.0;

    for gene in genome.genes.iter_mut() {
        let (gauss_point, cold_gauss_point) = if severe {
            (0.3, 0.1)
        } else if gene_total >= 10.0 && num > end_part {
            (0.5, 0.3)
        } else if random_provider::bool(0.5) {
            (1.0 - rate, 1.0 - rate - 0.1)
        } else {
            (1.0 - rate, 1.0 - rate)
        };

        let rand_val = random_provider::pos_neg() * random_provider::random::<f64>() * power;
        match mode {
            WeightMutationMode::Gaussian => {
                let choice: f64 = random_provider::random();
                if choice > gauss_point {
                    gene.weight += rand_val;
                } else if choice > cold_gauss_point {
                    gene.weight = rand_val;
                }
            }
            WeightMutationMode::ColdGaussian => {
                gene.weight = rand_val;
            }
        }

        gene.weight = gene.weight.clamp(-WEIGHT_CAP, WEIGHT_CAP);
        gene.mutation_num = gene.weight;
        num += 1.0;
    }
}

/// Perturb the parameters of one random trait.
pub fn mutate_random_trait(genome: &mut Genome, opts: &NeatOptions) {
    if genome.traits.is_empty() {
        return;
    }
    let idx = random_provider::index(genome.traits.len());
    genome.traits[idx].mutate(opts.trait_mutation_power, opts.trait_param_mut_prob);
}

/// Point one random link gene at a random trait.
pub fn mutate_link_trait(genome: &mut Genome) {
    if genome.traits.is_empty() || genome.genes.is_empty() {
        return;
    }
    let trait_id = random_provider::choose(&genome.traits).id;
    let idx = random_provider::index(genome.genes.len());
    genome.genes[idx].trait_id = Some(trait_id);
}

/// Point one random node gene at a random trait.
pub fn mutate_node_trait(genome: &mut Genome) {
    if genome.traits.is_empty() || genome.nodes.is_empty() {
        return;
    }
    let trait_id = random_provider::choose(&genome.traits).id;
    let idx = random_provider::index(genome.nodes.len());
    genome.nodes[idx].trait_id = Some(trait_id);
}
