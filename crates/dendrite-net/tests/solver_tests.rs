use dendrite_net::{
    ActivationType, FastNetworkSolver, Link, NNode, Network, NetworkSolver, NeuronRole,
};

/// Bias + two inputs, two hidden layers, one output. Weights are arbitrary
/// but fixed so every test sees the same numbers.
fn two_layer_net() -> Network {
    let mut net = Network::new();
    let bias = net.add_node(NNode::new(1, NeuronRole::Bias, ActivationType::SigmoidSteepened));
    let i1 = net.add_node(NNode::new(2, NeuronRole::Input, ActivationType::SigmoidSteepened));
    let i2 = net.add_node(NNode::new(3, NeuronRole::Input, ActivationType::SigmoidSteepened));
    let out = net.add_node(NNode::new(4, NeuronRole::Output, ActivationType::SigmoidSteepened));
    let h1 = net.add_node(NNode::new(5, NeuronRole::Hidden, ActivationType::Tanh));
    let h2 = net.add_node(NNode::new(6, NeuronRole::Hidden, ActivationType::SigmoidPlain));

    for (src, dst, w) in [
        (bias, h1, 0.3),
        (i1, h1, 1.7),
        (i2, h1, -2.1),
        (bias, h2, -0.6),
        (h1, h2, 2.4),
        (i2, h2, 0.9),
        (h2, out, -1.8),
        (h1, out, 0.7),
        (bias, out, 0.2),
    ] {
        net.connect(Link::new(src, dst, w, false));
    }
    net
}

#[test]
fn solvers_agree_through_the_shared_interface() {
    let mut net = two_layer_net();
    let depth = net.max_activation_depth(0).unwrap();
    assert_eq!(depth, 3);

    let mut fast = FastNetworkSolver::from_network(&net).unwrap();
    let solvers: Vec<&mut dyn NetworkSolver> = vec![&mut net, &mut fast];
    let mut outputs = Vec::new();

    for (i, solver) in solvers.into_iter().enumerate() {
        let bias_aware = if i == 0 {
            vec![1.0, 0.4, -0.9]
        } else {
            vec![0.4, -0.9]
        };
        solver.load_sensors(&bias_aware).unwrap();
        solver.forward_steps(depth).unwrap();
        outputs.push(solver.read_outputs()[0]);
    }

    assert!(
        (outputs[0] - outputs[1]).abs() < 1e-12,
        "phenotype {} vs fast {}",
        outputs[0],
        outputs[1]
    );
}

#[test]
fn relax_agrees_between_solvers() {
    let mut net = two_layer_net();
    let mut fast = FastNetworkSolver::from_network(&net).unwrap();

    net.load_sensors(&[1.0, 0.2, 0.8]).unwrap();
    fast.load_sensors(&[0.2, 0.8]).unwrap();

    assert!(net.relax(100, 1e-10).unwrap());
    assert!(fast.relax(100, 1e-10).unwrap());

    let (a, b) = (net.read_outputs()[0], fast.read_outputs()[0]);
    assert!((a - b).abs() < 1e-9, "{} vs {}", a, b);
}

#[test]
fn flush_is_idempotent_across_both_solvers() {
    let mut net = two_layer_net();
    let mut fast = FastNetworkSolver::from_network(&net).unwrap();

    for solver in [&mut net as &mut dyn NetworkSolver, &mut fast] {
        solver.forward_steps(2).unwrap();
        solver.flush().unwrap();
        let first = solver.read_outputs();
        solver.flush().unwrap();
        assert_eq!(solver.read_outputs(), first);
        assert!(first.iter().all(|&o| o == 0.0));
    }
}

#[test]
fn node_and_link_counts_match_between_solvers() {
    let net = two_layer_net();
    let fast = FastNetworkSolver::from_network(&net).unwrap();
    assert_eq!(net.node_count(), 6);
    assert_eq!(net.link_count(), 9);
    // bias links fold into offsets in the flattened layout
    assert_eq!(fast.node_count(), 6);
    assert_eq!(fast.link_count(), 6);
}

#[test]
fn time_delayed_links_read_the_previous_activation() {
    let mut net = Network::new();
    let i = net.add_node(NNode::new(1, NeuronRole::Input, ActivationType::Linear));
    let a = net.add_node(NNode::new(2, NeuronRole::Hidden, ActivationType::Linear));
    let out = net.add_node(NNode::new(3, NeuronRole::Output, ActivationType::Linear));
    net.connect(Link::new(i, a, 1.0, false));
    net.connect(Link::new(a, out, 1.0, false).time_delayed(true));
    // a zero-weight live tap keeps the output switched on; the signal
    // itself arrives only through the delayed link
    net.connect(Link::new(i, out, 0.0, false));

    net.load_sensors(&[5.0]).unwrap();
    net.forward_steps(1).unwrap();
    // a has activated once; its time-delayed output is still zero
    assert_eq!(net.read_outputs(), vec![0.0]);
    net.forward_steps(1).unwrap();
    // still zero: the delayed tap needs two activations of history
    assert_eq!(net.read_outputs(), vec![0.0]);
    net.forward_steps(1).unwrap();
    assert_eq!(net.read_outputs(), vec![5.0]);
}

#[test]
fn recurrent_link_feeds_back_across_steps() {
    let mut net = Network::new();
    let i = net.add_node(NNode::new(1, NeuronRole::Input, ActivationType::Linear));
    let out = net.add_node(NNode::new(2, NeuronRole::Output, ActivationType::Linear));
    net.connect(Link::new(i, out, 1.0, false));
    net.connect(Link::new(out, out, 0.5, true));

    net.load_sensors(&[2.0]).unwrap();
    net.forward_steps(1).unwrap();
    assert_eq!(net.read_outputs(), vec![2.0]);
    net.forward_steps(1).unwrap();
    // 2.0 + 0.5 * previous 2.0
    assert_eq!(net.read_outputs(), vec![3.0]);
    net.forward_steps(1).unwrap();
    assert_eq!(net.read_outputs(), vec![3.5]);
}
