use crate::genome::link_gene::LinkGene;
use crate::genome::node_gene::NodeGene;
use crate::genome::trait_gene::TraitGene;
use crate::options::{GenomeCompatMethod, NeatOptions};
use dendrite_error::{NeatResult, dendrite_bail};
use dendrite_net::{Link, NNode, Network};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};

/// The genetic description of a network: traits, node genes and link genes.
///
/// Node genes are kept sorted by id and link genes by innovation number;
/// every operator in this crate relies on that ordering. A genome is only
/// ever mutated right after reproduction produces it; once speciation has
/// read it, it is immutable.
#[derive(Clone, Serialize, Deserialize)]
pub struct Genome {
    pub id: i64,
    pub traits: Vec<TraitGene>,
    pub nodes: Vec<NodeGene>,
    pub genes: Vec<LinkGene>,
}

impl Genome {
    pub fn new(id: i64) -> Self {
        Genome {
            id,
            traits: Vec::new(),
            nodes: Vec::new(),
            genes: Vec::new(),
        }
    }

    pub fn from_parts(
        id: i64,
        traits: Vec<TraitGene>,
        mut nodes: Vec<NodeGene>,
        mut genes: Vec<LinkGene>,
    ) -> Self {
        nodes.sort_by_key(|n| n.id);
        genes.sort_by_key(|g| g.innovation);
        Genome {
            id,
            traits,
            nodes,
            genes,
        }
    }

    /// Deep clone under a new genome id.
    pub fn duplicate(&self, new_id: i64) -> Genome {
        Genome {
            id: new_id,
            traits: self.traits.clone(),
            nodes: self.nodes.clone(),
            genes: self.genes.clone(),
        }
    }

    /// Structural size, the tie-break when fitness compares equal.
    pub fn complexity(&self) -> usize {
        self.nodes.len() + self.genes.len()
    }

    pub fn node_by_id(&self, id: i64) -> Option<&NodeGene> {
        self.nodes
            .binary_search_by_key(&id, |n| n.id)
            .ok()
            .map(|i| &self.nodes[i])
    }

    pub fn trait_by_id(&self, id: i64) -> Option<&TraitGene> {
        self.traits.iter().find(|t| t.id == id)
    }

    pub fn max_node_id(&self) -> i64 {
        self.nodes.iter().map(|n| n.id).max().unwrap_or(0)
    }

    pub fn max_innovation(&self) -> i64 {
        self.genes.iter().map(|g| g.innovation).max().unwrap_or(0)
    }

    pub fn enabled_gene_count(&self) -> usize {
        self.genes.iter().filter(|g| g.enabled).count()
    }

    /// Is there already a gene expressing the edge `(in, out, recurrent)`?
    pub fn has_link(&self, in_node: i64, out_node: i64, recurrent: bool) -> bool {
        self.genes.iter().any(|g| {
            g.in_node == in_node && g.out_node == out_node && g.recurrent == recurrent
        })
    }

    /// Keep the node list sorted by id after an insertion.
    pub fn insert_node(&mut self, node: NodeGene) {
        let pos = self
            .nodes
            .binary_search_by_key(&node.id, |n| n.id)
            .unwrap_or_else(|p| p);
        self.nodes.insert(pos, node);
    }

    /// Keep the gene list sorted by innovation after an insertion.
    pub fn insert_gene(&mut self, gene: LinkGene) {
        let pos = self
            .genes
            .binary_search_by_key(&gene.innovation, |g| g.innovation)
            .unwrap_or_else(|p| p);
        self.genes.insert(pos, gene);
    }

    /// Build the phenotype network, copying every enabled gene into the
    /// arena in gene order so the first sensor-to-output path stays
    /// reproducible.
    pub fn genesis(&self) -> NeatResult<Network> {
        let mut net = Network::new();
        let mut index_of = HashMap::with_capacity(self.nodes.len());

        for node_gene in &self.nodes {
            let mut node = NNode::new(node_gene.id, node_gene.role, node_gene.activation);
            node.trait_id = node_gene.trait_id;
            node.params = node_gene.params.clone();
            let idx = net.add_node(node);
            index_of.insert(node_gene.id, idx);
        }

        for gene in &self.genes {
            if !gene.enabled {
                continue;
            }
            let (source, target) = match (index_of.get(&gene.in_node), index_of.get(&gene.out_node))
            {
                (Some(s), Some(t)) => (*s, *t),
                _ => {
                    dendrite_bail!(GenomeInvariant:
                        "genome {}: gene {} connects missing node {} -> {}",
                        self.id, gene.innovation, gene.in_node, gene.out_node)
                }
            };
            let mut link = Link::new(source, target, gene.weight, gene.recurrent)
                .time_delayed(gene.time_delayed);
            link.trait_id = gene.trait_id;
            net.connect(link);
        }

        Ok(net)
    }

    /// Check the genome invariants: link endpoints resolve, no duplicate
    /// `(in, out, recurrent)` edge, and sensors have no incoming enabled
    /// links.
    pub fn verify(&self) -> NeatResult<()> {
        for gene in &self.genes {
            if self.node_by_id(gene.in_node).is_none() {
                dendrite_bail!(GenomeInvariant:
                    "genome {}: gene {} references missing in-node {}",
                    self.id, gene.innovation, gene.in_node);
            }
            if self.node_by_id(gene.out_node).is_none() {
                dendrite_bail!(GenomeInvariant:
                    "genome {}: gene {} references missing out-node {}",
                    self.id, gene.innovation, gene.out_node);
            }
        }

        for (i, a) in self.genes.iter().enumerate() {
            for b in &self.genes[i + 1..] {
                if a.same_edge(b) {
                    dendrite_bail!(GenomeInvariant:
                        "genome {}: duplicate edge {} -> {} (recurrent: {})",
                        self.id, a.in_node, a.out_node, a.recurrent);
                }
            }
        }

        for gene in self.genes.iter().filter(|g| g.enabled) {
            if let Some(out) = self.node_by_id(gene.out_node) {
                if out.is_sensor() {
                    dendrite_bail!(GenomeInvariant:
                        "genome {}: sensor node {} has an incoming enabled link",
                        self.id, gene.out_node);
                }
            }
        }

        Ok(())
    }

    /// Compatibility distance to another genome under the configured method.
    pub fn compatibility(&self, other: &Genome, opts: &NeatOptions) -> f64 {
        match opts.genome_compat_method {
            GenomeCompatMethod::Linear => self.compat_linear(other, opts),
            GenomeCompatMethod::Fast => self.compat_fast(other, opts),
        }
    }

    /// Parallel walk over the two innovation-sorted gene lists.
    fn compat_linear(&self, other: &Genome, opts: &NeatOptions) -> f64 {
        let size1 = self.genes.len();
        let size2 = other.genes.len();

        let mut excess = 0.0;
        let mut disjoint = 0.0;
        let mut matching = 0.0;
        let mut mut_diff_total = 0.0;

        let (mut i1, mut i2) = (0usize, 0usize);
        while i1 < size1 || i2 < size2 {
            if i1 >= size1 {
                excess += 1.0;
                i2 += 1;
            } else if i2 >= size2 {
                excess += 1.0;
                i1 += 1;
            } else {
                let g1 = &self.genes[i1];
                let g2 = &other.genes[i2];
                if g1.innovation == g2.innovation {
                    matching += 1.0;
                    mut_diff_total += (g1.mutation_num - g2.mutation_num).abs();
                    i1 += 1;
                    i2 += 1;
                } else if g1.innovation < g2.innovation {
                    disjoint += 1.0;
                    i1 += 1;
                } else {
                    disjoint += 1.0;
                    i2 += 1;
                }
            }
        }

        Self::compat_score(size1, size2, excess, disjoint, matching, mut_diff_total, opts)
    }

    /// Index one side by innovation number for O(max + min) lookups.
    fn compat_fast(&self, other: &Genome, opts: &NeatOptions) -> f64 {
        let size1 = self.genes.len();
        let size2 = other.genes.len();

        let max1 = self.max_innovation();
        let max2 = other.max_innovation();

        let by_innovation: HashMap<i64, &LinkGene> =
            other.genes.iter().map(|g| (g.innovation, g)).collect();

        let mut excess = 0.0;
        let mut disjoint = 0.0;
        let mut matching = 0.0;
        let mut mut_diff_total = 0.0;

        for gene in &self.genes {
            if let Some(other_gene) = by_innovation.get(&gene.innovation) {
                matching += 1.0;
                mut_diff_total += (gene.mutation_num - other_gene.mutation_num).abs();
            } else if size2 == 0 || gene.innovation > max2 {
                excess += 1.0;
            } else {
                disjoint += 1.0;
            }
        }

        let mine: HashMap<i64, ()> = self.genes.iter().map(|g| (g.innovation, ())).collect();
        for gene in &other.genes {
            if !mine.contains_key(&gene.innovation) {
                if size1 == 0 || gene.innovation > max1 {
                    excess += 1.0;
                } else {
                    disjoint += 1.0;
                }
            }
        }

        Self::compat_score(size1, size2, excess, disjoint, matching, mut_diff_total, opts)
    }

    fn compat_score(
        size1: usize,
        size2: usize,
        excess: f64,
        disjoint: f64,
        matching: f64,
        mut_diff_total: f64,
        opts: &NeatOptions,
    ) -> f64 {
        // normalize by the larger gene count unless both lists are trivial
        let larger = size1.max(size2);
        let n = if larger < 2 { 1.0 } else { larger as f64 };
        let mean_diff = if matching > 0.0 {
            mut_diff_total / matching
        } else {
            0.0
        };

        opts.excess_coeff * excess / n + opts.disjoint_coeff * disjoint / n
            + opts.mutdiff_coeff * mean_diff
    }
}

impl Debug for Genome {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Genome {{ id: {}, traits: {}, nodes: {}, genes: {} ({} enabled) }}",
            self.id,
            self.traits.len(),
            self.nodes.len(),
            self.genes.len(),
            self.enabled_gene_count()
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use dendrite_net::{NetworkSolver, NeuronRole};

    pub(crate) fn three_input_genome(id: i64) -> Genome {
        let traits = vec![TraitGene::with_params(
            1,
            [0.1, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        )];
        let nodes = vec![
            NodeGene::new(1, NeuronRole::Bias),
            NodeGene::new(2, NeuronRole::Input),
            NodeGene::new(3, NeuronRole::Input),
            NodeGene::new(4, NeuronRole::Output),
        ];
        let genes = vec![
            LinkGene::new(1, 4, 0.5, false, 1),
            LinkGene::new(2, 4, -1.5, false, 2),
            LinkGene::new(3, 4, 2.0, false, 3),
        ];
        Genome::from_parts(id, traits, nodes, genes)
    }

    #[test]
    fn verify_accepts_well_formed_genome() {
        assert!(three_input_genome(1).verify().is_ok());
    }

    #[test]
    fn verify_rejects_dangling_endpoint() {
        let mut genome = three_input_genome(1);
        genome.genes.push(LinkGene::new(9, 4, 1.0, false, 4));
        assert!(genome.verify().is_err());
    }

    #[test]
    fn verify_rejects_duplicate_edge() {
        let mut genome = three_input_genome(1);
        genome.genes.push(LinkGene::new(1, 4, 0.9, false, 5));
        assert!(genome.verify().is_err());
    }

    #[test]
    fn verify_rejects_link_into_sensor() {
        let mut genome = three_input_genome(1);
        genome.genes.push(LinkGene::new(4, 2, 1.0, false, 6));
        assert!(genome.verify().is_err());
    }

    #[test]
    fn genesis_skips_disabled_genes() {
        let mut genome = three_input_genome(1);
        genome.genes[1].enabled = false;
        let net = genome.genesis().unwrap();
        assert_eq!(net.link_count(), 2);
        assert_eq!(net.node_count(), 4);
    }

    #[test]
    fn genesis_produces_activatable_network() {
        let genome = three_input_genome(1);
        let mut net = genome.genesis().unwrap();
        net.load_sensors(&[1.0, 0.0, 1.0]).unwrap();
        net.activate().unwrap();
        assert_eq!(net.read_outputs().len(), 1);
    }

    #[test]
    fn linear_and_fast_distances_agree() {
        let opts = NeatOptions::default();
        let a = three_input_genome(1);
        let mut b = three_input_genome(2);
        b.genes[0].mutation_num += 1.25;
        b.genes.push(LinkGene::new(2, 4, 0.1, true, 7));
        b.genes.sort_by_key(|g| g.innovation);

        let mut linear_opts = opts.clone();
        linear_opts.genome_compat_method = GenomeCompatMethod::Linear;
        let mut fast_opts = opts.clone();
        fast_opts.genome_compat_method = GenomeCompatMethod::Fast;

        let linear = a.compatibility(&b, &linear_opts);
        let fast = a.compatibility(&b, &fast_opts);
        assert!((linear - fast).abs() < 1e-12, "{} vs {}", linear, fast);
    }

    #[test]
    fn disjoint_distance_matches_hand_computation() {
        // 3 disjoint genes, 0 excess, identical matching weights, N = 5
        let mut a = three_input_genome(1);
        let mut b = three_input_genome(2);
        a.genes.push(LinkGene::new(1, 4, 1.0, true, 4));
        a.genes.push(LinkGene::new(2, 4, 1.0, true, 6));
        b.genes.push(LinkGene::new(3, 4, 1.0, true, 5));
        b.genes.push(LinkGene::new(1, 4, 1.0, true, 7));
        b.genes.sort_by_key(|g| g.innovation);
        a.genes.sort_by_key(|g| g.innovation);

        // innovations: a = {1,2,3,4,6}, b = {1,2,3,5,7}: disjoint 4,5,6; excess 7
        let mut opts = NeatOptions::default();
        opts.disjoint_coeff = 1.0;
        opts.excess_coeff = 1.0;
        opts.mutdiff_coeff = 0.4;

        let d = a.compatibility(&b, &opts);
        assert!((d - (3.0 / 5.0 + 1.0 / 5.0)).abs() < 1e-12, "got {}", d);
    }
}
