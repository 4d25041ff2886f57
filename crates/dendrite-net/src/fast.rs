use crate::activation::{ActivationType, activate_module, activate_scalar};
use crate::network::Network;
use crate::node::NeuronRole;
use crate::solver::NetworkSolver;
use dendrite_error::{NeatError, NeatResult, dendrite_err};
use smallvec::SmallVec;

/// A single flattened connection: `signal[target] += signal[source] * weight`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FastConnection {
    pub source: usize,
    pub target: usize,
    pub weight: f64,
}

/// A flattened control module: gather inputs from the scratch vector, apply
/// the module activator, scatter the outputs back.
#[derive(Clone, Debug)]
pub struct FastModule {
    pub activation_type: ActivationType,
    pub inputs: SmallVec<[usize; 8]>,
    pub input_weights: SmallVec<[f64; 8]>,
    pub outputs: SmallVec<[usize; 8]>,
}

/// Index-based network representation for repeated activations.
///
/// The signal vector is laid out `[bias…, input…, output…, hidden…]` so the
/// bias entries stay pinned to 1.0 for the life of the solver. Links leaving
/// a bias node are folded into per-neuron bias offsets at build time, which
/// keeps the hot loop to one multiply-add per connection.
#[derive(Clone, Debug)]
pub struct FastNetworkSolver {
    bias_count: usize,
    input_count: usize,
    output_count: usize,
    total_count: usize,

    signals: Vec<f64>,
    scratch: Vec<f64>,
    activations: Vec<ActivationType>,
    bias_list: Vec<f64>,
    connections: Vec<FastConnection>,
    modules: Vec<FastModule>,

    // reverse adjacency, used only by recursive activation
    reverse: Vec<Vec<(usize, f64)>>,
}

impl FastNetworkSolver {
    /// Flatten a phenotype network. Node order inside each role bucket is
    /// the network's declaration order.
    pub fn from_network(net: &Network) -> NeatResult<FastNetworkSolver> {
        let mut order: Vec<usize> = Vec::with_capacity(net.nodes().len());
        for role in [
            NeuronRole::Bias,
            NeuronRole::Input,
            NeuronRole::Output,
            NeuronRole::Hidden,
        ] {
            for (i, node) in net.nodes().iter().enumerate() {
                if node.role == role {
                    order.push(i);
                }
            }
        }

        let mut flat_of = vec![0usize; net.nodes().len()];
        for (flat, &arena) in order.iter().enumerate() {
            flat_of[arena] = flat;
        }

        let bias_count = net
            .nodes()
            .iter()
            .filter(|n| n.role == NeuronRole::Bias)
            .count();
        let input_count = net
            .nodes()
            .iter()
            .filter(|n| n.role == NeuronRole::Input)
            .count();
        let output_count = net.outputs().len();
        let total_count = net.nodes().len();

        let mut signals = vec![0.0; total_count];
        for slot in signals.iter_mut().take(bias_count) {
            *slot = 1.0;
        }

        let mut activations = vec![ActivationType::Linear; total_count];
        for (flat, &arena) in order.iter().enumerate() {
            activations[flat] = net.nodes()[arena].activation_type;
        }

        let mut bias_list = vec![0.0; total_count];
        let mut connections = Vec::with_capacity(net.links().len());
        for link in net.links() {
            let src = &net.nodes()[link.source.as_usize()];
            let target = flat_of[link.target.as_usize()];
            if src.role == NeuronRole::Bias {
                bias_list[target] += link.weight;
            } else {
                connections.push(FastConnection {
                    source: flat_of[link.source.as_usize()],
                    target,
                    weight: link.weight,
                });
            }
        }

        let modules = net
            .controls()
            .iter()
            .map(|control| FastModule {
                activation_type: control.activation_type,
                inputs: control
                    .inputs
                    .iter()
                    .map(|(idx, _)| flat_of[idx.as_usize()])
                    .collect(),
                input_weights: control.inputs.iter().map(|(_, w)| *w).collect(),
                outputs: control
                    .outputs
                    .iter()
                    .map(|idx| flat_of[idx.as_usize()])
                    .collect(),
            })
            .collect::<Vec<_>>();

        let mut reverse: Vec<Vec<(usize, f64)>> = vec![Vec::new(); total_count];
        for conn in &connections {
            reverse[conn.target].push((conn.source, conn.weight));
        }

        Ok(FastNetworkSolver {
            bias_count,
            input_count,
            output_count,
            total_count,
            signals,
            scratch: vec![0.0; total_count],
            activations,
            bias_list,
            connections,
            modules,
            reverse,
        })
    }

    #[inline]
    fn sensor_count(&self) -> usize {
        self.bias_count + self.input_count
    }

    pub fn is_modular(&self) -> bool {
        !self.modules.is_empty()
    }

    /// One propagation pass over the flattened arrays. When `max_delta` is
    /// positive the return value reports whether every signal moved by at
    /// most that much.
    fn forward_step(&mut self, max_delta: f64) -> NeatResult<bool> {
        for conn in &self.connections {
            self.scratch[conn.target] += self.signals[conn.source] * conn.weight;
        }

        for i in self.sensor_count()..self.total_count {
            self.scratch[i] =
                activate_scalar(self.activations[i], self.scratch[i] + self.bias_list[i], None)?;
        }

        for m in 0..self.modules.len() {
            let inputs = self.modules[m]
                .inputs
                .iter()
                .zip(self.modules[m].input_weights.iter())
                .map(|(&idx, &w)| w * self.scratch[idx])
                .collect::<Vec<f64>>();
            let outputs = activate_module(self.modules[m].activation_type, &inputs, None)?;
            if outputs.len() != self.modules[m].outputs.len() {
                return Err(
                    dendrite_err!(GenomeInvariant: "module produced {} outputs for {} targets",
                        outputs.len(), self.modules[m].outputs.len()),
                );
            }
            for (value, &idx) in outputs.into_iter().zip(self.modules[m].outputs.iter()) {
                self.scratch[idx] = value;
            }
        }

        let mut relaxed = true;
        for i in self.sensor_count()..self.total_count {
            if max_delta > 0.0 && (self.scratch[i] - self.signals[i]).abs() > max_delta {
                relaxed = false;
            }
            self.signals[i] = self.scratch[i];
            self.scratch[i] = 0.0;
        }
        Ok(relaxed)
    }
}

impl NetworkSolver for FastNetworkSolver {
    /// Loads the non-bias inputs; bias signals stay pinned to 1.0.
    fn load_sensors(&mut self, values: &[f64]) -> NeatResult<()> {
        if values.len() != self.input_count {
            return Err(NeatError::SensorArity {
                expected: self.input_count,
                actual: values.len(),
            });
        }
        self.signals[self.bias_count..self.bias_count + self.input_count].copy_from_slice(values);
        Ok(())
    }

    fn read_outputs(&self) -> Vec<f64> {
        let start = self.sensor_count();
        self.signals[start..start + self.output_count].to_vec()
    }

    fn forward_steps(&mut self, steps: usize) -> NeatResult<()> {
        for _ in 0..steps {
            self.forward_step(0.0)?;
        }
        Ok(())
    }

    fn recursive_steps(&mut self) -> NeatResult<()> {
        if self.is_modular() {
            return Err(NeatError::RecursiveModeOnModularNet);
        }

        let last = self.signals.clone();
        let mut activated = vec![false; self.total_count];
        let mut in_activation = vec![false; self.total_count];
        for flag in activated.iter_mut().take(self.sensor_count()) {
            *flag = true;
        }

        struct Frame {
            node: usize,
            cursor: usize,
            sum: f64,
        }

        let start = self.sensor_count();
        for out in start..start + self.output_count {
            if activated[out] {
                continue;
            }
            in_activation[out] = true;
            let mut stack = vec![Frame {
                node: out,
                cursor: 0,
                sum: 0.0,
            }];

            while let Some(frame) = stack.last_mut() {
                let node = frame.node;
                if frame.cursor < self.reverse[node].len() {
                    let (src, weight) = self.reverse[node][frame.cursor];
                    if in_activation[src] {
                        frame.sum += last[src] * weight;
                        frame.cursor += 1;
                    } else if activated[src] {
                        frame.sum += self.signals[src] * weight;
                        frame.cursor += 1;
                    } else {
                        in_activation[src] = true;
                        stack.push(Frame {
                            node: src,
                            cursor: 0,
                            sum: 0.0,
                        });
                    }
                } else {
                    let sum = frame.sum;
                    stack.pop();
                    in_activation[node] = false;
                    activated[node] = true;
                    self.signals[node] =
                        activate_scalar(self.activations[node], sum + self.bias_list[node], None)?;
                }
            }
        }
        Ok(())
    }

    fn relax(&mut self, max_steps: usize, max_delta: f64) -> NeatResult<bool> {
        for _ in 0..max_steps {
            if self.forward_step(max_delta)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn flush(&mut self) -> NeatResult<()> {
        for (i, slot) in self.signals.iter_mut().enumerate() {
            *slot = if i < self.bias_count { 1.0 } else { 0.0 };
        }
        self.scratch.iter_mut().for_each(|s| *s = 0.0);
        Ok(())
    }

    fn node_count(&self) -> usize {
        self.total_count + self.modules.len()
    }

    fn link_count(&self) -> usize {
        self.connections.len()
            + self
                .modules
                .iter()
                .map(|m| m.inputs.len() + m.outputs.len())
                .sum::<usize>()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::link::Link;
    use crate::node::NNode;

    fn layered_net() -> Network {
        let mut net = Network::new();
        let bias = net.add_node(NNode::new(1, NeuronRole::Bias, ActivationType::SigmoidSteepened));
        let i1 = net.add_node(NNode::new(2, NeuronRole::Input, ActivationType::SigmoidSteepened));
        let i2 = net.add_node(NNode::new(3, NeuronRole::Input, ActivationType::SigmoidSteepened));
        let out = net.add_node(NNode::new(4, NeuronRole::Output, ActivationType::SigmoidSteepened));
        let h = net.add_node(NNode::new(5, NeuronRole::Hidden, ActivationType::SigmoidSteepened));
        net.connect(Link::new(bias, h, 0.5, false));
        net.connect(Link::new(i1, h, 1.5, false));
        net.connect(Link::new(i2, h, -2.0, false));
        net.connect(Link::new(h, out, 2.5, false));
        net.connect(Link::new(i1, out, -0.5, false));
        net
    }

    #[test]
    fn layout_pins_bias_and_counts_links() {
        let net = layered_net();
        let solver = FastNetworkSolver::from_network(&net).unwrap();
        assert_eq!(solver.signals[0], 1.0);
        // the bias link folded into an offset, four connections remain
        assert_eq!(solver.link_count(), 4);
        assert_eq!(solver.node_count(), 5);
        assert_eq!(solver.bias_list[4], 0.5);
    }

    #[test]
    fn forward_matches_phenotype_after_depth_steps() {
        let mut net = layered_net();
        let depth = net.max_activation_depth(0).unwrap();
        let mut solver = FastNetworkSolver::from_network(&net).unwrap();

        for inputs in [[0.0, 0.0], [0.3, -0.7], [1.0, 1.0]] {
            net.flush().unwrap();
            solver.flush().unwrap();
            net.load_sensors(&[1.0, inputs[0], inputs[1]]).unwrap();
            solver.load_sensors(&inputs).unwrap();
            net.forward_steps(depth).unwrap();
            solver.forward_steps(depth).unwrap();
            let (a, b) = (net.read_outputs()[0], solver.read_outputs()[0]);
            assert!((a - b).abs() < 1e-12, "phenotype {} vs fast {}", a, b);
        }
    }

    #[test]
    fn recursive_matches_forward_on_acyclic_net() {
        let net = layered_net();
        let mut fwd = FastNetworkSolver::from_network(&net).unwrap();
        let mut rec = FastNetworkSolver::from_network(&net).unwrap();
        fwd.load_sensors(&[0.6, 0.2]).unwrap();
        rec.load_sensors(&[0.6, 0.2]).unwrap();
        fwd.forward_steps(2).unwrap();
        rec.recursive_steps().unwrap();
        let (a, b) = (fwd.read_outputs()[0], rec.read_outputs()[0]);
        assert!((a - b).abs() < 1e-12, "{} vs {}", a, b);
    }

    #[test]
    fn recursive_resolves_cycles_with_previous_step() {
        let mut net = Network::new();
        let i = net.add_node(NNode::new(1, NeuronRole::Input, ActivationType::Linear));
        let out = net.add_node(NNode::new(2, NeuronRole::Output, ActivationType::Linear));
        net.connect(Link::new(i, out, 1.0, false));
        net.connect(Link::new(out, out, 0.5, true));

        let mut solver = FastNetworkSolver::from_network(&net).unwrap();
        solver.load_sensors(&[2.0]).unwrap();
        solver.recursive_steps().unwrap();
        // first pass: out = 2.0 + 0.5 * 0 (previous step)
        assert_eq!(solver.read_outputs(), vec![2.0]);
        solver.recursive_steps().unwrap();
        assert_eq!(solver.read_outputs(), vec![3.0]);
    }

    #[test]
    fn modular_net_rejects_recursive_mode() {
        let mut net = Network::new();
        let i1 = net.add_node(NNode::new(1, NeuronRole::Input, ActivationType::Linear));
        let i2 = net.add_node(NNode::new(2, NeuronRole::Input, ActivationType::Linear));
        let out = net.add_node(NNode::new(3, NeuronRole::Output, ActivationType::Linear));
        net.add_control(crate::network::ControlNode {
            id: 4,
            activation_type: ActivationType::MaxModule,
            inputs: vec![(i1, 1.0), (i2, 1.0)],
            outputs: vec![out],
            params: None,
        });
        let mut solver = FastNetworkSolver::from_network(&net).unwrap();
        let err = solver.recursive_steps().unwrap_err();
        assert_eq!(
            err.code(),
            dendrite_error::ErrorCode::RecursiveModeOnModularNet
        );
    }

    #[test]
    fn relax_stops_on_small_deltas() {
        let net = layered_net();
        let mut solver = FastNetworkSolver::from_network(&net).unwrap();
        solver.load_sensors(&[0.5, 0.5]).unwrap();
        let relaxed = solver.relax(100, 1e-9).unwrap();
        assert!(relaxed);
        // a second relax from the settled state converges immediately
        assert!(solver.relax(1, 1e-9).unwrap());
    }

    #[test]
    fn flush_restores_initial_signals() {
        let net = layered_net();
        let mut solver = FastNetworkSolver::from_network(&net).unwrap();
        solver.load_sensors(&[0.9, -0.4]).unwrap();
        solver.forward_steps(3).unwrap();
        solver.flush().unwrap();
        assert_eq!(solver.signals[0], 1.0);
        assert!(solver.signals[1..].iter().all(|&s| s == 0.0));
    }
}
