use crate::activation::{ActivationType, activate_module};
use crate::link::Link;
use crate::node::{LinkIdx, NNode, NodeIdx};
use crate::solver::NetworkSolver;
use dendrite_error::{NeatError, NeatResult, dendrite_err};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Formatter};
use std::ops::{Index, IndexMut};

/// Default number of settling sub-steps [Network::activate] will run before
/// giving up on reaching every output.
pub const DEFAULT_ACTIVATION_STEPS: usize = 20;

/// A multi-input / multi-output control node. Control nodes live outside the
/// scalar arena and activate after every scalar pass, in declaration order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ControlNode {
    pub id: i64,
    pub activation_type: ActivationType,
    pub inputs: Vec<(NodeIdx, f64)>,
    pub outputs: Vec<NodeIdx>,
    pub params: Option<Vec<f64>>,
}

/// A phenotype network: an arena of [NNode]s plus an arena of [Link]s, with
/// every connection expressed as an index. The network exclusively owns its
/// nodes and links; genomes refer back to it only through indices.
///
/// Sensors are recorded in declaration order, which fixes the arity and
/// layout expected by [NetworkSolver::load_sensors].
#[derive(Clone, Serialize, Deserialize)]
pub struct Network {
    nodes: Vec<NNode>,
    links: Vec<Link>,
    controls: Vec<ControlNode>,
    sensors: Vec<NodeIdx>,
    outputs: Vec<NodeIdx>,
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

impl Network {
    pub fn new() -> Self {
        Network {
            nodes: Vec::new(),
            links: Vec::new(),
            controls: Vec::new(),
            sensors: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Add a node to the arena, tracking sensor and output declaration order.
    pub fn add_node(&mut self, node: NNode) -> NodeIdx {
        let idx = NodeIdx(self.nodes.len());
        if node.is_sensor() {
            self.sensors.push(idx);
        }
        if node.role == crate::node::NeuronRole::Output {
            self.outputs.push(idx);
        }
        self.nodes.push(node);
        idx
    }

    /// Connect two nodes, wiring the link into both endpoints' index lists.
    pub fn connect(&mut self, link: Link) -> LinkIdx {
        let idx = LinkIdx(self.links.len());
        self.nodes[link.source.as_usize()].outgoing.push(idx);
        self.nodes[link.target.as_usize()].incoming.push(idx);
        self.links.push(link);
        idx
    }

    pub fn add_control(&mut self, control: ControlNode) {
        self.controls.push(control);
    }

    pub fn nodes(&self) -> &[NNode] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn controls(&self) -> &[ControlNode] {
        &self.controls
    }

    pub fn sensors(&self) -> &[NodeIdx] {
        &self.sensors
    }

    pub fn outputs(&self) -> &[NodeIdx] {
        &self.outputs
    }

    pub fn is_modular(&self) -> bool {
        !self.controls.is_empty()
    }

    pub fn node_index_by_id(&self, id: i64) -> Option<NodeIdx> {
        self.nodes
            .iter()
            .position(|n| n.id == id)
            .map(NodeIdx)
    }

    /// Node count plus link count; the structural tie-break used when two
    /// organisms score equal fitness.
    pub fn complexity(&self) -> usize {
        self.node_count() + self.link_count()
    }

    fn outputs_off(&self) -> bool {
        self.outputs
            .iter()
            .any(|idx| self.nodes[idx.as_usize()].activation_count == 0)
    }

    /// Run settling sub-steps until every output has activated at least once,
    /// bounded by [DEFAULT_ACTIVATION_STEPS].
    pub fn activate(&mut self) -> NeatResult<()> {
        self.activate_steps(DEFAULT_ACTIVATION_STEPS)
    }

    /// Run settling sub-steps until every output has activated at least once,
    /// or fail once `max_steps` passes were not enough.
    pub fn activate_steps(&mut self, max_steps: usize) -> NeatResult<()> {
        let mut one_time = false;
        let mut tries = 0usize;
        while self.outputs_off() || !one_time {
            if tries >= max_steps {
                return Err(NeatError::ActivationStepsExceeded { steps: max_steps });
            }
            self.single_step()?;
            one_time = true;
            tries += 1;
        }
        Ok(())
    }

    /// One synchronous propagation pass: accumulate sums into every neuron,
    /// activate the neurons that saw an active input, then fire control
    /// nodes in declaration order.
    fn single_step(&mut self) -> NeatResult<()> {
        for i in 0..self.nodes.len() {
            if self.nodes[i].is_sensor() {
                continue;
            }
            let (sum, active) = {
                let node = &self.nodes[i];
                let mut sum = 0.0;
                let mut active = false;
                for &lidx in &node.incoming {
                    let link = &self.links[lidx.as_usize()];
                    let src = &self.nodes[link.source.as_usize()];
                    if !link.time_delayed {
                        sum += link.weight * src.active_out();
                        // a self-loop reads the node mid-reset, so it never flags activity
                        let src_active = link.source.as_usize() != i && src.is_active;
                        if src_active || src.is_sensor() {
                            active = true;
                        }
                    } else {
                        sum += link.weight * src.active_out_td();
                    }
                }
                (sum, active)
            };
            let node = &mut self.nodes[i];
            node.activation_sum = sum;
            node.is_active = active;
        }

        for i in 0..self.nodes.len() {
            if self.nodes[i].is_neuron() && self.nodes[i].is_active {
                self.nodes[i].activate()?;
            }
        }

        for c in 0..self.controls.len() {
            self.activate_control(c)?;
        }

        Ok(())
    }

    fn activate_control(&mut self, control_idx: usize) -> NeatResult<()> {
        let (outputs, targets) = {
            let control = &self.controls[control_idx];
            let inputs = control
                .inputs
                .iter()
                .map(|(idx, weight)| weight * self.nodes[idx.as_usize()].active_out())
                .collect::<Vec<f64>>();
            let outputs =
                activate_module(control.activation_type, &inputs, control.params.as_deref())?;
            if outputs.len() != control.outputs.len() {
                return Err(
                    dendrite_err!(GenomeInvariant: "control node {} produced {} outputs for {} targets",
                        control.id, outputs.len(), control.outputs.len()),
                );
            }
            (outputs, control.outputs.clone())
        };
        for (value, target) in outputs.into_iter().zip(targets) {
            let node = &mut self.nodes[target.as_usize()];
            node.set_activation(value);
            node.is_active = true;
        }
        Ok(())
    }

    /// Longest directed path from any sensor to any output, walked backward
    /// from each output. A ceiling of zero defaults to the node count, which
    /// any simple path cannot exceed, so loops always trip the error.
    pub fn max_activation_depth(&self, ceiling: usize) -> NeatResult<usize> {
        let ceiling = if ceiling == 0 {
            self.nodes.len().max(1)
        } else {
            ceiling
        };

        // Module edges count two hops: input -> control -> output.
        let mut extra: Vec<Vec<(usize, usize)>> = vec![Vec::new(); self.nodes.len()];
        for control in &self.controls {
            for out in &control.outputs {
                for (input, _) in &control.inputs {
                    extra[out.as_usize()].push((input.as_usize(), 2));
                }
            }
        }

        let mut max_depth = 0usize;
        let mut stack: Vec<(usize, usize)> = Vec::new();
        for out in &self.outputs {
            stack.clear();
            stack.push((out.as_usize(), 0));
            while let Some((idx, depth)) = stack.pop() {
                if depth > ceiling {
                    return Err(NeatError::ActivationDepthLoop { ceiling });
                }
                max_depth = max_depth.max(depth);
                let node = &self.nodes[idx];
                if node.is_sensor() {
                    continue;
                }
                for &lidx in &node.incoming {
                    let link = &self.links[lidx.as_usize()];
                    stack.push((link.source.as_usize(), depth + 1));
                }
                for &(src, hops) in &extra[idx] {
                    stack.push((src, depth + hops));
                }
            }
        }
        Ok(max_depth)
    }

    /// Would a new link `from -> to` close a cycle? Walks backward from
    /// `from` over non-recurrent links looking for `to`. Returns `None` when
    /// the visit budget is exhausted before an answer is found.
    pub fn is_recurrent(&self, from: NodeIdx, to: NodeIdx, thresh: usize) -> Option<bool> {
        let mut count = 0usize;
        let mut stack = vec![from];
        while let Some(idx) = stack.pop() {
            count += 1;
            if count > thresh {
                return None;
            }
            if idx == to {
                return Some(true);
            }
            for &lidx in &self.nodes[idx.as_usize()].incoming {
                let link = &self.links[lidx.as_usize()];
                if !link.recurrent {
                    stack.push(link.source);
                }
            }
        }
        Some(false)
    }
}

impl NetworkSolver for Network {
    fn load_sensors(&mut self, values: &[f64]) -> NeatResult<()> {
        if values.len() != self.sensors.len() {
            return Err(NeatError::SensorArity {
                expected: self.sensors.len(),
                actual: values.len(),
            });
        }
        for (idx, value) in self.sensors.clone().into_iter().zip(values) {
            self.nodes[idx.as_usize()].sensor_load(*value);
        }
        Ok(())
    }

    fn read_outputs(&self) -> Vec<f64> {
        self.outputs
            .iter()
            .map(|idx| self.nodes[idx.as_usize()].activation)
            .collect()
    }

    fn forward_steps(&mut self, steps: usize) -> NeatResult<()> {
        for _ in 0..steps {
            self.single_step()?;
        }
        Ok(())
    }

    /// Depth-first activation from each output. A link whose source is still
    /// being computed is a cycle; it reads the previous step's activation.
    fn recursive_steps(&mut self) -> NeatResult<()> {
        if self.is_modular() {
            return Err(NeatError::RecursiveModeOnModularNet);
        }

        let last: Vec<f64> = self.nodes.iter().map(|n| n.activation).collect();
        let mut activated: Vec<bool> = self.nodes.iter().map(|n| n.is_sensor()).collect();
        let mut in_activation = vec![false; self.nodes.len()];

        struct Frame {
            node: usize,
            cursor: usize,
            sum: f64,
        }

        let mut stack: Vec<Frame> = Vec::new();
        for out in self.outputs.clone() {
            let out = out.as_usize();
            if activated[out] {
                continue;
            }
            in_activation[out] = true;
            stack.push(Frame {
                node: out,
                cursor: 0,
                sum: 0.0,
            });

            while let Some(frame) = stack.last_mut() {
                let node = frame.node;
                if frame.cursor < self.nodes[node].incoming.len() {
                    let lidx = self.nodes[node].incoming[frame.cursor];
                    let link = &self.links[lidx.as_usize()];
                    let src = link.source.as_usize();
                    if in_activation[src] {
                        frame.sum += last[src] * link.weight;
                        frame.cursor += 1;
                    } else if activated[src] {
                        frame.sum += self.nodes[src].activation * link.weight;
                        frame.cursor += 1;
                    } else {
                        // descend; the cursor stays so this link is re-read
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
                    self.nodes[node].activation_sum = sum;
                    self.nodes[node].activate()?;
                }
            }
        }
        Ok(())
    }

    fn relax(&mut self, max_steps: usize, max_delta: f64) -> NeatResult<bool> {
        let mut before: Vec<f64> = self.nodes.iter().map(|n| n.activation).collect();
        for _ in 0..max_steps {
            self.single_step()?;
            let mut step_delta = 0.0f64;
            for (prev, node) in before.iter_mut().zip(self.nodes.iter()) {
                step_delta = step_delta.max((node.activation - *prev).abs());
                *prev = node.activation;
            }
            if step_delta <= max_delta {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn flush(&mut self) -> NeatResult<()> {
        for node in self.nodes.iter_mut() {
            node.flush();
        }
        debug_assert!(
            self.nodes
                .iter()
                .all(|n| n.activation == 0.0 && n.activation_count == 0),
            "flush left residual activation behind"
        );
        Ok(())
    }

    fn node_count(&self) -> usize {
        self.nodes.len() + self.controls.len()
    }

    fn link_count(&self) -> usize {
        self.links.len()
            + self
                .controls
                .iter()
                .map(|c| c.inputs.len() + c.outputs.len())
                .sum::<usize>()
    }
}

impl Index<NodeIdx> for Network {
    type Output = NNode;

    fn index(&self, index: NodeIdx) -> &Self::Output {
        &self.nodes[index.as_usize()]
    }
}

impl IndexMut<NodeIdx> for Network {
    fn index_mut(&mut self, index: NodeIdx) -> &mut Self::Output {
        &mut self.nodes[index.as_usize()]
    }
}

impl Debug for Network {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Network {{ nodes: {}, links: {}, controls: {}, sensors: {}, outputs: {} }}",
            self.nodes.len(),
            self.links.len(),
            self.controls.len(),
            self.sensors.len(),
            self.outputs.len()
        )
    }
}
