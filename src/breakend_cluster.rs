use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::genome_segment::GenomeSegment;

/// Directed breakend evidence from one node to a peer node in the same cluster
///
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ClusterEdge {
    pub count: usize,
}

impl ClusterEdge {
    pub fn merge(&mut self, other: &ClusterEdge) {
        self.count += other.count;
    }
}

/// One node of a breakend cluster
///
/// The node covers a genome segment, accumulates the observation count of all evidence reads
/// assigned to the segment, and records directed edges to peer nodes in the same cluster. Edges
/// are keyed by the peer's node index. If a node has an edge to a peer, the peer always has a
/// reciprocal edge back, though either direction may carry a zero count. Self edges are allowed,
/// they appear when two connected nodes are merged into one.
///
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ClusterNode {
    pub segment: GenomeSegment,
    pub count: usize,
    edges: BTreeMap<usize, ClusterEdge>,
}

impl ClusterNode {
    fn new(segment: GenomeSegment) -> Self {
        Self {
            segment,
            count: 0,
            edges: BTreeMap::new(),
        }
    }

    pub fn edges(&self) -> &BTreeMap<usize, ClusterEdge> {
        &self.edges
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

/// A connected set of breakend nodes
///
/// The cluster is a plain graph structure with no knowledge of the containing graph's node
/// index; all index maintenance is handled by the container when the cluster is stored in one.
/// Node slots are dense 0..N-1 indices. Node removal recycles slots by swapping the last node
/// into the removed slot, so only the last slot's index changes on removal.
///
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BreakendCluster {
    /// Slot of this cluster in the containing graph, reassigned whenever the cluster content
    /// moves to a different slot
    #[serde(skip)]
    index: usize,

    nodes: Vec<ClusterNode>,
}

impl BreakendCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn assign_index(&mut self, index: usize) {
        self.index = index;
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get_node(&self, node_index: usize) -> &ClusterNode {
        &self.nodes[node_index]
    }

    pub fn nodes(&self) -> &[ClusterNode] {
        &self.nodes
    }

    /// Append a new node covering `segment`, with no observations or edges, and return its slot
    pub fn add_node(&mut self, segment: GenomeSegment) -> usize {
        self.nodes.push(ClusterNode::new(segment));
        self.nodes.len() - 1
    }

    #[allow(dead_code)]
    pub fn increment_observations(&mut self, node_index: usize, count: usize) {
        self.nodes[node_index].count += count;
    }

    /// Connect two distinct nodes with an edge in each direction
    ///
    /// Counts accumulate if the nodes are already connected.
    ///
    #[allow(dead_code)]
    pub fn link_nodes(&mut self, node1: usize, node2: usize, count1: usize, count2: usize) {
        assert_ne!(node1, node2, "Can't link a cluster node to itself");
        self.nodes[node1]
            .edges
            .entry(node2)
            .or_default()
            .merge(&ClusterEdge { count: count1 });
        self.nodes[node2]
            .edges
            .entry(node1)
            .or_default()
            .merge(&ClusterEdge { count: count2 });
    }

    /// Append a copy of every node in `other`, translating edge targets to the new slots
    ///
    /// Returns the slot of the first appended node. `other` is not modified.
    ///
    pub fn copy_from(&mut self, other: &BreakendCluster) -> usize {
        let offset = self.nodes.len();
        for node in other.nodes.iter() {
            let mut new_node = node.clone();
            new_node.edges = node
                .edges
                .iter()
                .map(|(&target, edge)| (target + offset, edge.clone()))
                .collect();
            self.nodes.push(new_node);
        }
        offset
    }

    /// Merge node `from_index` into node `to_index`
    ///
    /// The target node's segment becomes the union of the two segments (which must be on the
    /// same chromosome), observation counts are summed, and every edge of the source is
    /// re-targeted onto the target with per-peer count summation. An edge between the two merged
    /// nodes becomes a self edge on the target. The source node is left in place with no
    /// observations or edges; callers remove it with `remove_node`.
    ///
    pub fn merge_node(&mut self, from_index: usize, to_index: usize) {
        assert_ne!(from_index, to_index);

        let from_edges = std::mem::take(&mut self.nodes[from_index].edges);
        let from_segment = self.nodes[from_index].segment.clone();
        let from_count = std::mem::take(&mut self.nodes[from_index].count);

        {
            let to_node = &mut self.nodes[to_index];
            to_node.segment.merge(&from_segment);
            to_node.count += from_count;
        }

        // Fold the source's outgoing edges into the target, mapping the source onto the target
        // at both endpoints:
        for (&target, edge) in from_edges.iter() {
            let new_target = if target == from_index {
                to_index
            } else {
                target
            };
            self.nodes[to_index]
                .edges
                .entry(new_target)
                .or_default()
                .merge(edge);
        }

        // Re-point each peer's reciprocal edge at the target:
        for &target in from_edges.keys() {
            if target == from_index {
                continue;
            }
            let back = self.nodes[target]
                .edges
                .remove(&from_index)
                .expect("cluster node edges must be reciprocal");
            self.nodes[target]
                .edges
                .entry(to_index)
                .or_default()
                .merge(&back);
        }
    }

    /// Remove one node, recycling its slot from the last node
    ///
    /// Any remaining edges between the removed node and its peers are unlinked first. If another
    /// node is moved into the vacated slot, its previous slot (the last slot) is returned so the
    /// caller can re-address it.
    ///
    pub fn remove_node(&mut self, node_index: usize) -> Option<usize> {
        let edges = std::mem::take(&mut self.nodes[node_index].edges);
        for &target in edges.keys() {
            if target == node_index {
                continue;
            }
            self.nodes[target].edges.remove(&node_index);
        }

        let last_index = self.nodes.len() - 1;
        self.nodes.swap_remove(node_index);
        if node_index == last_index {
            return None;
        }

        // The node swapped in from the last slot keeps its own edge targets, but every peer
        // referencing its old slot must be re-keyed, as must its own self edge:
        let moved_targets = self.nodes[node_index]
            .edges
            .keys()
            .copied()
            .collect::<Vec<_>>();
        for target in moved_targets {
            let peer = if target == last_index {
                node_index
            } else {
                target
            };
            let edge = self.nodes[peer]
                .edges
                .remove(&last_index)
                .expect("cluster node edges must be reciprocal");
            let prev = self.nodes[peer].edges.insert(node_index, edge);
            assert!(prev.is_none());
        }
        Some(last_index)
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Validate the cluster's local edge structure
    pub fn check(&self) -> Result<(), GraphError> {
        let node_count = self.nodes.len();
        for (node_index, node) in self.nodes.iter().enumerate() {
            for &target in node.edges.keys() {
                if target >= node_count {
                    return Err(GraphError::invariant(format!(
                        "cluster {} node {} has an edge to nonexistent node {}",
                        self.index, node_index, target
                    )));
                }
                if target != node_index && !self.nodes[target].edges.contains_key(&node_index) {
                    return Err(GraphError::invariant(format!(
                        "cluster {} node {} has no reciprocal edge from node {}",
                        self.index, node_index, target
                    )));
                }
            }
        }
        Ok(())
    }
}

impl PartialEq for BreakendCluster {
    /// Structural equality, ignoring the slot identity
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes
    }
}

impl Eq for BreakendCluster {}
