use crate::activation::{ActivationType, activate_scalar};
use dendrite_error::NeatResult;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Formatter};

/// Index of a node in its owning [crate::Network]'s arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct NodeIdx(pub usize);

impl NodeIdx {
    #[inline]
    pub fn as_usize(&self) -> usize {
        self.0
    }
}

/// Index of a link in its owning [crate::Network]'s link arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct LinkIdx(pub usize);

impl LinkIdx {
    #[inline]
    pub fn as_usize(&self) -> usize {
        self.0
    }
}

/// The role a node plays in the network topology. The numeric values are
/// fixed by the plain genome text format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NeuronRole {
    Hidden,
    Input,
    Output,
    Bias,
}

impl NeuronRole {
    pub fn from_code(code: u8) -> Option<NeuronRole> {
        match code {
            0 => Some(NeuronRole::Hidden),
            1 => Some(NeuronRole::Input),
            2 => Some(NeuronRole::Output),
            3 => Some(NeuronRole::Bias),
            _ => None,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            NeuronRole::Hidden => 0,
            NeuronRole::Input => 1,
            NeuronRole::Output => 2,
            NeuronRole::Bias => 3,
        }
    }

    /// Input and bias nodes are sensors; output and hidden nodes are neurons.
    pub fn is_sensor(&self) -> bool {
        matches!(self, NeuronRole::Input | NeuronRole::Bias)
    }
}

/// A network node: either a sensor carrying an externally loaded value or a
/// neuron summing its incoming links. Neurons keep one step of activation
/// history so recurrent and time-delayed links can read the previous value.
#[derive(Clone, Serialize, Deserialize)]
pub struct NNode {
    pub id: i64,
    pub role: NeuronRole,
    pub activation_type: ActivationType,
    pub trait_id: Option<i64>,
    pub params: Option<Vec<f64>>,

    pub(crate) incoming: Vec<LinkIdx>,
    pub(crate) outgoing: Vec<LinkIdx>,

    pub(crate) activation_sum: f64,
    pub(crate) activation: f64,
    pub(crate) last_activation: f64,
    pub(crate) last_activation2: f64,
    pub(crate) activation_count: u32,
    pub(crate) is_active: bool,
}

impl NNode {
    pub fn new(id: i64, role: NeuronRole, activation_type: ActivationType) -> Self {
        NNode {
            id,
            role,
            activation_type,
            trait_id: None,
            params: None,
            incoming: Vec::new(),
            outgoing: Vec::new(),
            activation_sum: 0.0,
            activation: 0.0,
            last_activation: 0.0,
            last_activation2: 0.0,
            activation_count: 0,
            is_active: false,
        }
    }

    pub fn is_sensor(&self) -> bool {
        self.role.is_sensor()
    }

    pub fn is_neuron(&self) -> bool {
        !self.role.is_sensor()
    }

    pub fn incoming(&self) -> &[LinkIdx] {
        &self.incoming
    }

    pub fn outgoing(&self) -> &[LinkIdx] {
        &self.outgoing
    }

    pub fn activation(&self) -> f64 {
        self.activation
    }

    pub fn activation_count(&self) -> u32 {
        self.activation_count
    }

    /// The value this node contributes downstream: zero until the node has
    /// activated at least once.
    #[inline]
    pub fn active_out(&self) -> f64 {
        if self.activation_count > 0 {
            self.activation
        } else {
            0.0
        }
    }

    /// The time-delayed output: the previous step's activation, available
    /// once the node has activated twice.
    #[inline]
    pub fn active_out_td(&self) -> f64 {
        if self.activation_count > 1 {
            self.last_activation
        } else {
            0.0
        }
    }

    /// Push a new activation value, shifting history down one step.
    pub(crate) fn set_activation(&mut self, value: f64) {
        self.last_activation2 = self.last_activation;
        self.last_activation = self.activation;
        self.activation = value;
        self.activation_count += 1;
    }

    /// Load an external sensor value. Only meaningful for sensors.
    pub(crate) fn sensor_load(&mut self, value: f64) {
        self.set_activation(value);
    }

    /// Run the node's scalar activator over the accumulated sum.
    pub(crate) fn activate(&mut self) -> NeatResult<()> {
        let out = activate_scalar(
            self.activation_type,
            self.activation_sum,
            self.params.as_deref(),
        )?;
        self.set_activation(out);
        Ok(())
    }

    pub(crate) fn flush(&mut self) {
        self.activation_sum = 0.0;
        self.activation = 0.0;
        self.last_activation = 0.0;
        self.last_activation2 = 0.0;
        self.activation_count = 0;
        self.is_active = false;
    }
}

impl Debug for NNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NNode {{ id: {}, role: {:?}, activation: {}, count: {} }}",
            self.id, self.role, self.activation, self.activation_count
        )
    }
}
