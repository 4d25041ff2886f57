use crate::genome::genome::Genome;
use crate::genome::link_gene::LinkGene;
use crate::genome::trait_gene::TraitGene;
use crate::random_provider;
use dendrite_error::NeatResult;

/// Chance that an inherited matching gene stays disabled when either parent
/// carried it disabled.
const DISABLE_INHERIT_PROB: f64 = 0.75;

/// Decide which parent is "better": higher fitness, with lower structural
/// complexity breaking ties.
fn p1_better(p1: &Genome, fitness1: f64, p2: &Genome, fitness2: f64) -> bool {
    if fitness1 > fitness2 {
        return true;
    }
    if fitness1 < fitness2 {
        return false;
    }
    p1.genes.len() < p2.genes.len()
}

/// Average the parents' traits pairwise; unmatched trailing traits come from
/// the longer list unchanged.
fn cross_traits(p1: &Genome, p2: &Genome) -> Vec<TraitGene> {
    let shared = p1.traits.len().min(p2.traits.len());
    let mut traits = Vec::with_capacity(p1.traits.len().max(p2.traits.len()));
    for i in 0..shared {
        traits.push(TraitGene::average(&p1.traits[i], &p2.traits[i]));
    }
    let longer = if p1.traits.len() > p2.traits.len() {
        &p1.traits
    } else {
        &p2.traits
    };
    for t in &longer[shared..] {
        traits.push(t.clone());
    }
    traits
}

/// Seed the child with every sensor and output node of the better parent so
/// no I/O node is stranded, regardless of which genes survive crossover.
fn seed_io_nodes(child: &mut Genome, better: &Genome) {
    for node in &better.nodes {
        if node.is_sensor() || node.role == dendrite_net::NeuronRole::Output {
            child.insert_node(node.clone());
        }
    }
}

/// Copy a chosen gene into the child, pulling in any endpoint node genes the
/// child is still missing. Genes expressing an edge the child already has
/// are dropped.
fn push_gene(child: &mut Genome, gene: &LinkGene, enabled: bool, p1: &Genome, p2: &Genome) {
    if child
        .genes
        .iter()
        .any(|existing| existing.same_edge(gene))
    {
        return;
    }

    for id in [gene.in_node, gene.out_node] {
        if child.node_by_id(id).is_none() {
            if let Some(node) = p1.node_by_id(id).or_else(|| p2.node_by_id(id)) {
                child.insert_node(node.clone());
            }
        }
    }

    let mut new_gene = gene.clone();
    new_gene.enabled = enabled;
    child.insert_gene(new_gene);
}

/// Multipoint crossover: matching genes pick a parent at random, disjoint
/// and excess genes come from the fitter parent.
pub fn mate_multipoint(
    p1: &Genome,
    fitness1: f64,
    p2: &Genome,
    fitness2: f64,
    child_id: i64,
) -> NeatResult<Genome> {
    mate_aligned(p1, fitness1, p2, fitness2, child_id, false)
}

/// Like multipoint, but matching genes average the parents' weights and
/// mutation numbers instead of picking a side.
pub fn mate_multipoint_avg(
    p1: &Genome,
    fitness1: f64,
    p2: &Genome,
    fitness2: f64,
    child_id: i64,
) -> NeatResult<Genome> {
    mate_aligned(p1, fitness1, p2, fitness2, child_id, true)
}

fn mate_aligned(
    p1: &Genome,
    fitness1: f64,
    p2: &Genome,
    fitness2: f64,
    child_id: i64,
    average_matching: bool,
) -> NeatResult<Genome> {
    let better_is_p1 = p1_better(p1, fitness1, p2, fitness2);

    let mut child = Genome::new(child_id);
    child.traits = cross_traits(p1, p2);
    seed_io_nodes(&mut child, if better_is_p1 { p1 } else { p2 });

    let size1 = p1.genes.len();
    let size2 = p2.genes.len();
    let (mut i1, mut i2) = (0usize, 0usize);

    while i1 < size1 || i2 < size2 {
        let mut skip = false;
        let mut disable = false;
        let chosen: LinkGene;

        if i1 >= size1 {
            chosen = p2.genes[i2].clone();
            i2 += 1;
            if better_is_p1 {
                skip = true;
            }
        } else if i2 >= size2 {
            chosen = p1.genes[i1].clone();
            i1 += 1;
            if !better_is_p1 {
                skip = true;
            }
        } else {
            let g1 = &p1.genes[i1];
            let g2 = &p2.genes[i2];
            if g1.innovation == g2.innovation {
                if average_matching {
                    let mut avg = g1.clone();
                    avg.weight = (g1.weight + g2.weight) / 2.0;
                    avg.mutation_num = (g1.mutation_num + g2.mutation_num) / 2.0;
                    if random_provider::bool(0.5) {
                        avg.trait_id = g2.trait_id;
                    }
                    if random_provider::bool(0.5) {
                        avg.recurrent = g2.recurrent;
                    }
                    chosen = avg;
                } else if random_provider::bool(0.5) {
                    chosen = g1.clone();
                } else {
                    chosen = g2.clone();
                }
                if !g1.enabled || !g2.enabled {
                    disable = random_provider::bool(DISABLE_INHERIT_PROB);
                }
                i1 += 1;
                i2 += 1;
            } else if g1.innovation < g2.innovation {
                chosen = g1.clone();
                i1 += 1;
                if !better_is_p1 {
                    skip = true;
                }
            } else {
                chosen = g2.clone();
                i2 += 1;
                if better_is_p1 {
                    skip = true;
                }
            }
        }

        if !skip {
            let enabled = if disable { false } else { chosen.enabled };
            push_gene(&mut child, &chosen, enabled, p1, p2);
        }
    }

    child.verify()?;
    Ok(child)
}

/// Singlepoint crossover: a split position is rolled inside the smaller
/// genome; aligned genes before it come from the smaller parent, genes after
/// it from the larger, and the gene at the split averages the two.
pub fn mate_singlepoint(
    p1: &Genome,
    fitness1: f64,
    p2: &Genome,
    fitness2: f64,
    child_id: i64,
) -> NeatResult<Genome> {
    let (smaller, larger) = if p1.genes.len() < p2.genes.len() {
        (p1, p2)
    } else {
        (p2, p1)
    };

    let mut child = Genome::new(child_id);
    child.traits = cross_traits(p1, p2);
    seed_io_nodes(&mut child, larger);

    if smaller.genes.is_empty() {
        for gene in &larger.genes {
            push_gene(&mut child, gene, gene.enabled, p1, p2);
        }
        child.verify()?;
        return Ok(child);
    }

    let cross_point = random_provider::index(smaller.genes.len());
    let (mut i1, mut i2) = (0usize, 0usize);
    let mut counter = 0usize;

    while i1 < smaller.genes.len() || i2 < larger.genes.len() {
        let mut skip = false;
        let mut disable = false;
        let chosen: LinkGene;

        if i1 >= smaller.genes.len() {
            chosen = larger.genes[i2].clone();
            i2 += 1;
            if counter <= cross_point {
                skip = true;
            }
        } else if i2 >= larger.genes.len() {
            chosen = smaller.genes[i1].clone();
            i1 += 1;
            counter += 1;
            if counter > cross_point + 1 {
                skip = true;
            }
        } else {
            let gs = &smaller.genes[i1];
            let gl = &larger.genes[i2];
            if gs.innovation == gl.innovation {
                if counter < cross_point {
                    chosen = gs.clone();
                } else if counter == cross_point {
                    let mut avg = gs.clone();
                    avg.weight = (gs.weight + gl.weight) / 2.0;
                    avg.mutation_num = (gs.mutation_num + gl.mutation_num) / 2.0;
                    chosen = avg;
                } else {
                    chosen = gl.clone();
                }
                if !gs.enabled || !gl.enabled {
                    disable = random_provider::bool(DISABLE_INHERIT_PROB);
                }
                i1 += 1;
                i2 += 1;
                counter += 1;
            } else if gs.innovation < gl.innovation {
                // disjoint gene of the smaller parent: kept only before the split
                chosen = gs.clone();
                i1 += 1;
                counter += 1;
                if counter > cross_point + 1 {
                    skip = true;
                }
            } else {
                // disjoint or excess gene of the larger parent: kept after the split
                chosen = gl.clone();
                i2 += 1;
                if counter <= cross_point {
                    skip = true;
                }
            }
        }

        if !skip {
            let enabled = if disable { false } else { chosen.enabled };
            push_gene(&mut child, &chosen, enabled, p1, p2);
        }
    }

    child.verify()?;
    Ok(child)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::genome::node_gene::NodeGene;
    use dendrite_net::NeuronRole;

    fn parent_pair() -> (Genome, Genome) {
        let nodes = vec![
            NodeGene::new(1, NeuronRole::Bias),
            NodeGene::new(2, NeuronRole::Input),
            NodeGene::new(3, NeuronRole::Input),
            NodeGene::new(4, NeuronRole::Output),
        ];

        let p1 = Genome::from_parts(
            1,
            vec![TraitGene::with_params(1, [0.2, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0])],
            nodes.clone(),
            vec![
                LinkGene::new(1, 4, 0.5, false, 1),
                LinkGene::new(2, 4, -1.0, false, 2),
                LinkGene::new(3, 4, 2.0, false, 3),
            ],
        );

        // p2 shares the early innovations but grew a hidden node on gene 2
        let mut p2_nodes = nodes;
        p2_nodes.push(NodeGene::new(5, NeuronRole::Hidden));
        let p2 = Genome::from_parts(
            2,
            vec![TraitGene::with_params(1, [0.4, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0])],
            p2_nodes,
            vec![
                LinkGene::new(1, 4, 0.7, false, 1),
                LinkGene::new(2, 4, -1.0, false, 2).disabled(),
                LinkGene::new(3, 4, 1.5, false, 3),
                LinkGene::new(2, 5, 1.0, false, 4),
                LinkGene::new(5, 4, -1.0, false, 5),
            ],
        );

        (p1, p2)
    }

    #[test]
    fn multipoint_children_verify() {
        crate::random_provider::set_seed(71);
        let (p1, p2) = parent_pair();
        for id in 0..20 {
            let child = mate_multipoint(&p1, 1.0, &p2, 2.0, 100 + id).unwrap();
            child.verify().unwrap();
            assert!(!child.genes.is_empty());
        }
    }

    #[test]
    fn fitter_parent_contributes_disjoint_genes() {
        crate::random_provider::set_seed(73);
        let (p1, p2) = parent_pair();
        // p2 is fitter: its hidden-node genes must always survive
        let child = mate_multipoint(&p1, 1.0, &p2, 5.0, 50).unwrap();
        assert!(child.genes.iter().any(|g| g.innovation == 4));
        assert!(child.genes.iter().any(|g| g.innovation == 5));
        assert!(child.node_by_id(5).is_some());
    }

    #[test]
    fn weaker_parent_keeps_disjoint_genes_out() {
        crate::random_provider::set_seed(79);
        let (p1, p2) = parent_pair();
        // p1 is fitter: the child never carries p2's hidden-node structure
        let child = mate_multipoint(&p1, 5.0, &p2, 1.0, 51).unwrap();
        assert!(child.genes.iter().all(|g| g.innovation <= 3));
        assert!(child.node_by_id(5).is_none());
    }

    #[test]
    fn multipoint_avg_averages_matching_weights() {
        crate::random_provider::set_seed(83);
        let (p1, p2) = parent_pair();
        let child = mate_multipoint_avg(&p1, 1.0, &p2, 1.0, 52).unwrap();
        let g1 = child.genes.iter().find(|g| g.innovation == 1).unwrap();
        assert!((g1.weight - 0.6).abs() < 1e-12);
    }

    #[test]
    fn equal_fitness_ties_break_on_complexity() {
        crate::random_provider::set_seed(89);
        let (p1, p2) = parent_pair();
        // equal fitness: p1 is smaller, so p2's excess genes are skipped
        let child = mate_multipoint(&p1, 3.0, &p2, 3.0, 53).unwrap();
        assert!(child.genes.iter().all(|g| g.innovation <= 3));
    }

    #[test]
    fn singlepoint_children_verify() {
        crate::random_provider::set_seed(97);
        let (p1, p2) = parent_pair();
        for id in 0..20 {
            let child = mate_singlepoint(&p1, 1.0, &p2, 2.0, 200 + id).unwrap();
            child.verify().unwrap();
            assert!(!child.genes.is_empty());
        }
    }

    #[test]
    fn traits_average_componentwise() {
        crate::random_provider::set_seed(101);
        let (p1, p2) = parent_pair();
        let child = mate_multipoint(&p1, 1.0, &p2, 2.0, 60).unwrap();
        assert!((child.traits[0].params[0] - 0.3).abs() < 1e-12);
    }
}
