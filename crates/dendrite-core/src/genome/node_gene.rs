use dendrite_net::{ActivationType, NeuronRole};
use serde::{Deserialize, Serialize};

/// The genetic description of one network node.
///
/// `role` fixes both the node's place in the topology and its kind: input
/// and bias genes express sensors, output and hidden genes express neurons.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeGene {
    pub id: i64,
    pub role: NeuronRole,
    #[serde(default = "default_activation")]
    pub activation: ActivationType,
    #[serde(default)]
    pub trait_id: Option<i64>,
    #[serde(default)]
    pub params: Option<Vec<f64>>,
}

fn default_activation() -> ActivationType {
    ActivationType::SigmoidSteepened
}

impl NodeGene {
    pub fn new(id: i64, role: NeuronRole) -> Self {
        NodeGene {
            id,
            role,
            activation: ActivationType::SigmoidSteepened,
            trait_id: None,
            params: None,
        }
    }

    pub fn with_activation(mut self, activation: ActivationType) -> Self {
        self.activation = activation;
        self
    }

    pub fn with_trait(mut self, trait_id: Option<i64>) -> Self {
        self.trait_id = trait_id;
        self
    }

    pub fn is_sensor(&self) -> bool {
        self.role.is_sensor()
    }

    pub fn is_neuron(&self) -> bool {
        !self.role.is_sensor()
    }
}
