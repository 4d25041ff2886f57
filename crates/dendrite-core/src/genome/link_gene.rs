use serde::{Deserialize, Serialize};

/// The genetic description of one directed connection.
///
/// The innovation number is the historical marker that lets crossover align
/// genes between dissimilar genomes; `mutation_num` tracks where the weight
/// has drifted since the gene appeared, and feeds the W̄ term of the
/// compatibility distance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinkGene {
    pub in_node: i64,
    pub out_node: i64,
    pub weight: f64,
    #[serde(default)]
    pub recurrent: bool,
    #[serde(default)]
    pub time_delayed: bool,
    pub enabled: bool,
    pub innovation: i64,
    pub mutation_num: f64,
    #[serde(default)]
    pub trait_id: Option<i64>,
}

impl LinkGene {
    pub fn new(in_node: i64, out_node: i64, weight: f64, recurrent: bool, innovation: i64) -> Self {
        LinkGene {
            in_node,
            out_node,
            weight,
            recurrent,
            time_delayed: false,
            enabled: true,
            innovation,
            mutation_num: weight,
            trait_id: None,
        }
    }

    pub fn with_trait(mut self, trait_id: Option<i64>) -> Self {
        self.trait_id = trait_id;
        self
    }

    pub fn with_mutation_num(mut self, mutation_num: f64) -> Self {
        self.mutation_num = mutation_num;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Two genes express the same phenotype edge when they agree on both
    /// endpoints and recurrency.
    pub fn same_edge(&self, other: &LinkGene) -> bool {
        self.in_node == other.in_node
            && self.out_node == other.out_node
            && self.recurrent == other.recurrent
    }
}
