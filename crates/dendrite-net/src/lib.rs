//! Network substrate for the dendrite neuroevolution library.
//!
//! A [Network] is the runnable phenotype derived from a genome: an arena of
//! nodes and links addressed by index, activated one sample at a time. The
//! [FastNetworkSolver] is the same network flattened into parallel arrays
//! for repeated activations. Both implement [NetworkSolver].

pub mod activation;
pub mod fast;
pub mod link;
pub mod network;
pub mod node;
pub mod solver;

pub use activation::{
    ActivationType, SIGMOID_SHIFT, SIGMOID_STEEPNESS, activate_module, activate_scalar,
};
pub use fast::{FastConnection, FastModule, FastNetworkSolver};
pub use link::Link;
pub use network::{ControlNode, DEFAULT_ACTIVATION_STEPS, Network};
pub use node::{LinkIdx, NNode, NeuronRole, NodeIdx};
pub use solver::NetworkSolver;
