use fxhash::FxHashMap;

use crate::problem::node::{Node, NodeIdx, NodeKind};

/// Immutable registry of every node in the instance. Built once from the
/// parsed inputs; routes and solutions only ever hold `NodeIdx` values.
#[derive(Debug)]
pub struct NodeCatalog {
    nodes: Vec<Node>,
    containers: Vec<NodeIdx>,
    dumps: Vec<NodeIdx>,
    depots: Vec<NodeIdx>,
}

impl NodeCatalog {
    pub fn new(nodes: Vec<Node>) -> Self {
        let mut containers = Vec::new();
        let mut dumps = Vec::new();
        let mut depots = Vec::new();

        for (index, node) in nodes.iter().enumerate() {
            let idx = NodeIdx::new(index);
            match node.kind() {
                NodeKind::Container => containers.push(idx),
                NodeKind::Dump => dumps.push(idx),
                NodeKind::Depot => depots.push(idx),
            }
        }

        NodeCatalog {
            nodes,
            containers,
            dumps,
            depots,
        }
    }

    pub fn get(&self, idx: NodeIdx) -> &Node {
        &self.nodes[idx]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn containers(&self) -> &[NodeIdx] {
        &self.containers
    }

    pub fn dumps(&self) -> &[NodeIdx] {
        &self.dumps
    }

    pub fn depots(&self) -> &[NodeIdx] {
        &self.depots
    }

    pub fn coordinates(&self) -> Vec<(f64, f64)> {
        self.nodes.iter().map(|node| (node.x(), node.y())).collect()
    }

    /// Maps external ids to indices, one entry per (id, kind) pair. An id
    /// referenced as both dump and depot yields two catalog records.
    pub fn external_index(&self) -> FxHashMap<(i64, NodeKind), NodeIdx> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| ((node.external_id(), node.kind()), NodeIdx::new(index)))
            .collect()
    }
}
