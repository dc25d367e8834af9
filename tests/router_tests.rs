//! Forwarding across a small simulated mesh of gateways.
//!
//! Every node has its own encoder, router and peer list; delivery to a
//! peer runs that node's dispatch and forwarding synchronously, the way a
//! peer handles an incoming HTTP post.

use std::cell::RefCell;

use ir_trainz::hal::{MockDelay, MockTransmitter};
use ir_trainz::ir::pulse::decode_ab_frame;
use ir_trainz::{
    forward_to_peers, CommandRouter, GatewayCommand, IrEncoder, LocoAddress, PeerTransport,
    StaticPeers,
};

struct Node {
    name: &'static str,
    encoder: IrEncoder<MockTransmitter, MockDelay>,
    router: CommandRouter,
    peers: StaticPeers,
    received: Vec<GatewayCommand>,
}

struct Mesh {
    nodes: Vec<RefCell<Node>>,
}

impl Mesh {
    fn new(links: &[(&'static str, &[&'static str])]) -> Self {
        let nodes = links
            .iter()
            .map(|&(name, peers)| {
                RefCell::new(Node {
                    name,
                    encoder: IrEncoder::new(MockTransmitter::new(), MockDelay::new()),
                    router: CommandRouter::new(LocoAddress::A),
                    peers: StaticPeers::new(peers.iter().copied()),
                    received: Vec::new(),
                })
            })
            .collect();
        Self { nodes }
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.borrow().name == name)
    }

    /// Execute on `name`, then forward from it.
    fn receive(&self, name: &str, command: &GatewayCommand) -> Result<(), String> {
        let index = self.index_of(name).ok_or_else(|| format!("no node {name}"))?;
        let peers = {
            let mut node = self.nodes[index].borrow_mut();
            let node = &mut *node;
            node.received.push(command.clone());
            node.router
                .dispatch(&mut node.encoder, command)
                .map_err(|_| "transmit failed".to_string())?;
            node.peers.clone()
        };
        forward_to_peers(command, &peers, &mut MeshTransport { mesh: self });
        Ok(())
    }

    fn node(&self, name: &str) -> std::cell::Ref<'_, Node> {
        self.nodes[self.index_of(name).unwrap()].borrow()
    }
}

struct MeshTransport<'a> {
    mesh: &'a Mesh,
}

impl PeerTransport for MeshTransport<'_> {
    type Error = String;

    fn forward(&mut self, peer: &str, command: &GatewayCommand) -> Result<(), String> {
        self.mesh.receive(peer, command)
    }
}

#[test]
fn ring_of_three_executes_each_command_once() {
    let mesh = Mesh::new(&[
        ("n0", &["n1", "n2"]),
        ("n1", &["n2", "n0"]),
        ("n2", &["n0", "n1"]),
    ]);

    mesh.receive("n0", &GatewayCommand::new("A", "light", ""))
        .unwrap();

    for name in ["n0", "n1", "n2"] {
        let node = mesh.node(name);
        assert_eq!(node.received.len(), 1, "{name}");
        assert_eq!(node.encoder.transmitter().frames.len(), 1, "{name}");
        assert_eq!(
            decode_ab_frame(&node.encoder.transmitter().frames[0]),
            Some(0x6161)
        );
    }
    assert!(!mesh.node("n0").received[0].repeated);
    assert!(mesh.node("n1").received[0].repeated);
    assert!(mesh.node("n2").received[0].repeated);
}

#[test]
fn chain_stops_after_one_hop() {
    let mesh = Mesh::new(&[("n0", &["n1"]), ("n1", &["n2"]), ("n2", &["n0"])]);

    mesh.receive("n0", &GatewayCommand::new("B", "stop", ""))
        .unwrap();

    assert_eq!(mesh.node("n0").received.len(), 1);
    assert_eq!(mesh.node("n1").received.len(), 1);
    assert!(mesh.node("n2").received.is_empty());
}

#[test]
fn channel_selection_travels_with_command() {
    let mesh = Mesh::new(&[("n0", &["n1"]), ("n1", &[])]);

    mesh.receive("n0", &GatewayCommand::new("D", "forward", ""))
        .unwrap();
    mesh.receive("n0", &GatewayCommand::new("", "stop", ""))
        .unwrap();

    assert_eq!(mesh.node("n1").router.current_address(), LocoAddress::D);
    assert_eq!(mesh.node("n1").encoder.transmitter().frames.len(), 2);
}

#[test]
fn unknown_peer_does_not_block_the_rest() {
    let mesh = Mesh::new(&[("n0", &["gone", "n1"]), ("n1", &[])]);

    mesh.receive("n0", &GatewayCommand::new("G", "speed", "2"))
        .unwrap();

    assert_eq!(mesh.node("n1").received.len(), 1);
    assert_eq!(mesh.node("n1").received[0].args, "2");
}
