//! Online merging container for breakend evidence clusters
//!

mod merge;
mod persistence;

use std::collections::BTreeSet;
use std::fmt;
use std::io::Write;

use crate::breakend_cluster::{BreakendCluster, ClusterNode};
use crate::chrom_list::ChromList;
use crate::error::GraphError;
use crate::genome_segment::GenomeSegment;
use crate::int_range::IntRange;

/// Stable address of one node in the cluster graph
///
/// The cluster index is the cluster's slot in the graph's cluster list; the node index is the
/// node's slot within its cluster. Node slots can be recycled by node removal, so addresses are
/// only stable across operations which don't remove lower-indexed nodes.
///
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd)]
pub struct NodeAddress {
    pub cluster_index: usize,
    pub node_index: usize,
}

impl fmt::Debug for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.cluster_index, self.node_index)
    }
}

/// One entry of the graph's global node index
///
/// The referenced node's segment is embedded in the entry so the set orders by chromosome, then
/// start, then end, with the node address as the final tiebreak. Entries are re-keyed whenever
/// the referenced node's segment or address changes.
///
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct NodeIndexEntry {
    pub segment: GenomeSegment,
    pub addr: NodeAddress,
}

impl fmt::Debug for NodeIndexEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?} {:?}", self.addr, self.segment)
    }
}

/// All breakend evidence clusters discovered so far, merged so that clusters stay disjoint
///
/// The graph owns a slot list of clusters, an ordered free set of empty slots, and a global node
/// index keyed by genome segment. Segments of any two indexed nodes on the same chromosome are
/// disjoint except transiently within a single cluster while a merge is being consolidated.
///
pub struct ClusterGraph {
    chrom_list: ChromList,

    /// Label describing where this graph's content came from, used in merge diagnostics
    source: String,

    clusters: Vec<BreakendCluster>,
    empty_clusters: BTreeSet<usize>,
    node_index: BTreeSet<NodeIndexEntry>,
}

impl ClusterGraph {
    pub fn new(chrom_list: ChromList) -> Self {
        Self {
            chrom_list,
            source: "unknown".to_string(),
            clusters: Vec::new(),
            empty_clusters: BTreeSet::new(),
            node_index: BTreeSet::new(),
        }
    }

    pub fn chrom_list(&self) -> &ChromList {
        &self.chrom_list
    }

    #[allow(dead_code)]
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn set_source(&mut self, source: &str) {
        self.source = source.to_string();
    }

    /// Total cluster slot count, including empty slots
    #[allow(dead_code)]
    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    #[allow(dead_code)]
    pub fn get_cluster(&self, cluster_index: usize) -> &BreakendCluster {
        &self.clusters[cluster_index]
    }

    pub fn clusters(&self) -> &[BreakendCluster] {
        &self.clusters
    }

    #[allow(dead_code)]
    pub fn empty_clusters(&self) -> &BTreeSet<usize> {
        &self.empty_clusters
    }

    pub fn node_index(&self) -> &BTreeSet<NodeIndexEntry> {
        &self.node_index
    }

    pub fn get_node(&self, addr: NodeAddress) -> &ClusterNode {
        self.clusters[addr.cluster_index].get_node(addr.node_index)
    }

    fn index_entry(&self, addr: NodeAddress) -> NodeIndexEntry {
        NodeIndexEntry {
            segment: self.get_node(addr).segment.clone(),
            addr,
        }
    }

    /// Copy `input` into a free cluster slot and index all of its nodes
    ///
    /// The lowest empty slot is recycled if one exists, otherwise the slot list grows.
    ///
    fn insert_cluster(&mut self, input: &BreakendCluster) -> usize {
        let cluster_index = match self.empty_clusters.pop_first() {
            Some(x) => {
                assert!(self.clusters[x].is_empty());
                x
            }
            None => {
                self.clusters.push(BreakendCluster::new());
                self.clusters.len() - 1
            }
        };
        let cluster = &mut self.clusters[cluster_index];
        cluster.assign_index(cluster_index);
        let offset = cluster.copy_from(input);
        self.register_cluster_nodes(cluster_index, offset);
        cluster_index
    }

    /// Empty the cluster in `cluster_index` and return the slot to the free set
    fn clear_cluster(&mut self, cluster_index: usize) {
        for node_index in 0..self.clusters[cluster_index].node_count() {
            let entry = self.index_entry(NodeAddress {
                cluster_index,
                node_index,
            });
            let removed = self.node_index.remove(&entry);
            assert!(removed, "cleared cluster node was not indexed");
        }
        self.clusters[cluster_index].clear();
        self.empty_clusters.insert(cluster_index);
    }

    /// Append the content of cluster `from_index` onto cluster `to_index`
    ///
    /// No-op when the slots match, or the source slot is empty or out of range. The source is
    /// emptied afterwards iff `clear_source` is set.
    ///
    fn combine_clusters(&mut self, from_index: usize, to_index: usize, clear_source: bool) {
        if from_index == to_index {
            return;
        }
        if from_index >= self.clusters.len() {
            return;
        }
        if self.clusters[from_index].is_empty() {
            return;
        }

        let (from_cluster, to_cluster) = if from_index < to_index {
            let (left, right) = self.clusters.split_at_mut(to_index);
            (&left[from_index], &mut right[0])
        } else {
            let (left, right) = self.clusters.split_at_mut(from_index);
            (&right[0], &mut left[to_index])
        };
        let offset = to_cluster.copy_from(from_cluster);
        self.register_cluster_nodes(to_index, offset);
        if clear_source {
            self.clear_cluster(from_index);
        }
    }

    fn register_cluster_nodes(&mut self, cluster_index: usize, first_node_index: usize) {
        for node_index in first_node_index..self.clusters[cluster_index].node_count() {
            let entry = self.index_entry(NodeAddress {
                cluster_index,
                node_index,
            });
            let inserted = self.node_index.insert(entry);
            assert!(inserted, "registered cluster node was already indexed");
        }
    }

    /// Find every indexed node from another cluster whose segment intersects the node at `addr`
    ///
    /// Because indexed segments on one chromosome are disjoint outside the probe's own cluster,
    /// all hits sit in one contiguous index run around the probe entry. The scan extends in both
    /// directions from the probe, skipping entries of the probe's own cluster without
    /// terminating, and stops at the first non-intersecting entry from any other cluster.
    ///
    fn find_intersecting_nodes(&self, addr: NodeAddress) -> BTreeSet<NodeIndexEntry> {
        let mut intersect = BTreeSet::new();
        let probe = self.index_entry(addr);

        for entry in self.node_index.range(probe.clone()..) {
            if entry.addr.cluster_index == addr.cluster_index {
                continue;
            }
            if !probe.segment.intersect(&entry.segment) {
                break;
            }
            intersect.insert(entry.clone());
        }

        for entry in self.node_index.range(..probe.clone()).rev() {
            if entry.addr.cluster_index == addr.cluster_index {
                continue;
            }
            if !probe.segment.intersect(&entry.segment) {
                break;
            }
            intersect.insert(entry.clone());
        }

        intersect
    }

    /// Find every indexed node whose segment intersects the query region
    ///
    /// The query works by staging a throwaway single-node cluster covering the region and
    /// running the node intersection scan from it, so it briefly mutates the graph.
    ///
    pub fn get_region_intersect(
        &mut self,
        chrom_index: usize,
        start: i64,
        end: i64,
    ) -> BTreeSet<NodeIndexEntry> {
        let mut probe_cluster = BreakendCluster::new();
        probe_cluster.add_node(GenomeSegment {
            chrom_index,
            range: IntRange::from_pair(start, end),
        });

        let stage_index = self.insert_cluster(&probe_cluster);
        let intersect = self.find_intersecting_nodes(NodeAddress {
            cluster_index: stage_index,
            node_index: 0,
        });
        self.clear_cluster(stage_index);
        intersect
    }

    /// Merge graph node `from_addr` into `to_addr` and remove the source node
    ///
    /// Both nodes must be in the same cluster. Keeps the node index synchronized through the
    /// target's segment change, the source removal, and the slot recycling swap.
    ///
    fn coalesce_nodes(&mut self, from_addr: NodeAddress, to_addr: NodeAddress) {
        assert_eq!(from_addr.cluster_index, to_addr.cluster_index);
        let cluster_index = to_addr.cluster_index;

        let from_entry = self.index_entry(from_addr);
        let to_entry = self.index_entry(to_addr);

        self.clusters[cluster_index].merge_node(from_addr.node_index, to_addr.node_index);

        self.node_index.remove(&to_entry);
        let merged_entry = self.index_entry(to_addr);
        self.node_index.insert(merged_entry);
        self.node_index.remove(&from_entry);

        if let Some(old_node_index) = self.clusters[cluster_index].remove_node(from_addr.node_index)
        {
            // Another node was swapped into the source slot, re-address its index entry:
            let segment = self.get_node(from_addr).segment.clone();
            self.node_index.remove(&NodeIndexEntry {
                segment: segment.clone(),
                addr: NodeAddress {
                    cluster_index,
                    node_index: old_node_index,
                },
            });
            self.node_index.insert(NodeIndexEntry {
                segment,
                addr: from_addr,
            });
        }
    }

    fn format_segment(&self, segment: &GenomeSegment) -> String {
        format!(
            "{}:{}-{}",
            self.chrom_list.data[segment.chrom_index].label,
            segment.range.start,
            segment.range.end
        )
    }

    fn dump_node<W: Write>(&self, f: &mut W, addr: NodeAddress) -> std::io::Result<()> {
        let node = self.get_node(addr);
        writeln!(
            f,
            "node {:?} {} obs: {}",
            addr,
            self.format_segment(&node.segment),
            node.count
        )?;
        for (target, edge) in node.edges().iter() {
            writeln!(f, "\tedge to node {} obs: {}", target, edge.count)?;
        }
        Ok(())
    }

    /// Write a human-readable listing of every cluster and node
    pub fn dump<W: Write>(&self, f: &mut W) -> std::io::Result<()> {
        writeln!(f, "ClusterGraph start")?;
        for (cluster_index, cluster) in self.clusters.iter().enumerate() {
            for node_index in 0..cluster.node_count() {
                self.dump_node(
                    f,
                    NodeAddress {
                        cluster_index,
                        node_index,
                    },
                )?;
            }
        }
        writeln!(f, "ClusterGraph end")?;
        Ok(())
    }

    /// Write every node intersecting the query region
    pub fn dump_region<W: Write>(
        &mut self,
        f: &mut W,
        chrom_index: usize,
        start: i64,
        end: i64,
    ) -> std::io::Result<()> {
        let intersect = self.get_region_intersect(chrom_index, start, end);
        for entry in intersect.iter() {
            self.dump_node(f, entry.addr)?;
        }
        Ok(())
    }

    /// Write the node index entries in order
    pub fn dump_index<W: Write>(&self, f: &mut W) -> std::io::Result<()> {
        writeln!(f, "ClusterGraph index start")?;
        for entry in self.node_index.iter() {
            writeln!(f, "NodeIndex: {:?}", entry)?;
        }
        writeln!(f, "ClusterGraph index end")?;
        Ok(())
    }

    /// Write the per-slot statistics table
    ///
    /// One tab-separated row per cluster slot, empty slots included, header row first.
    ///
    pub fn dump_stats<W: Write>(&self, f: &mut W) -> std::io::Result<()> {
        const SEP: char = '\t';

        writeln!(
            f,
            "locusIndex{SEP}nodeCount{SEP}nodeObsCount{SEP}maxNodeObsCount{SEP}regionSize\
             {SEP}maxRegionSize{SEP}edgeCount{SEP}maxEdgeCount{SEP}edgeObsCount{SEP}maxEdgeObsCount"
        )?;

        for (cluster_index, cluster) in self.clusters.iter().enumerate() {
            let mut node_obs_count = 0;
            let mut max_node_obs_count = 0;
            let mut region_size = 0;
            let mut max_region_size = 0;
            let mut edge_count = 0;
            let mut max_edge_count = 0;
            let mut edge_obs_count = 0;
            let mut max_edge_obs_count = 0;
            for node in cluster.nodes().iter() {
                node_obs_count += node.count;
                max_node_obs_count = std::cmp::max(max_node_obs_count, node.count);

                let node_region_size = node.segment.size();
                region_size += node_region_size;
                max_region_size = std::cmp::max(max_region_size, node_region_size);

                edge_count += node.edge_count();
                max_edge_count = std::cmp::max(max_edge_count, node.edge_count());
                for edge in node.edges().values() {
                    edge_obs_count += edge.count;
                    max_edge_obs_count = std::cmp::max(max_edge_obs_count, edge.count);
                }
            }
            writeln!(
                f,
                "{cluster_index}{SEP}{}{SEP}{node_obs_count}{SEP}{max_node_obs_count}\
                 {SEP}{region_size}{SEP}{max_region_size}{SEP}{edge_count}{SEP}{max_edge_count}\
                 {SEP}{edge_obs_count}{SEP}{max_edge_obs_count}",
                cluster.node_count()
            )?;
        }
        Ok(())
    }

    /// Validate the full graph structure
    ///
    /// Checks that every node of every cluster has exactly one index entry, that entry and node
    /// counts agree, that the free set matches the empty slots, that each cluster's local edge
    /// structure is valid, and that every segment is non-degenerate. If `check_overlap` is set,
    /// additionally checks that no two indexed segments on one chromosome overlap.
    ///
    pub fn check_state(&self, check_overlap: bool) -> Result<(), GraphError> {
        let mut total_node_count = 0;
        for (cluster_index, cluster) in self.clusters.iter().enumerate() {
            cluster.check()?;

            if !cluster.is_empty() && cluster.index() != cluster_index {
                return Err(GraphError::invariant(format!(
                    "cluster in slot {} carries conflicting slot identity {}",
                    cluster_index,
                    cluster.index()
                )));
            }
            if cluster.is_empty() != self.empty_clusters.contains(&cluster_index) {
                return Err(GraphError::invariant(format!(
                    "free slot set disagrees with content of cluster slot {}",
                    cluster_index
                )));
            }

            total_node_count += cluster.node_count();
            for node_index in 0..cluster.node_count() {
                let addr = NodeAddress {
                    cluster_index,
                    node_index,
                };
                let segment = &cluster.get_node(node_index).segment;
                if segment.range.start >= segment.range.end {
                    return Err(GraphError::invariant(format!(
                        "node {:?} has degenerate segment {:?}",
                        addr, segment
                    )));
                }
                let entry = NodeIndexEntry {
                    segment: segment.clone(),
                    addr,
                };
                if !self.node_index.contains(&entry) {
                    return Err(GraphError::invariant(format!(
                        "node {:?} {:?} is missing from the node index",
                        addr, segment
                    )));
                }
            }
        }

        if total_node_count != self.node_index.len() {
            return Err(GraphError::invariant(format!(
                "conflicting node counts, clusters hold {} nodes but the node index holds {}",
                total_node_count,
                self.node_index.len()
            )));
        }

        if !check_overlap {
            return Ok(());
        }

        let mut last: Option<&NodeIndexEntry> = None;
        for entry in self.node_index.iter() {
            if let Some(last) = last {
                if last.segment.chrom_index == entry.segment.chrom_index
                    && last.segment.range.end > entry.segment.range.start
                {
                    return Err(GraphError::invariant(format!(
                        "overlapping indexed nodes, {:?} and {:?}",
                        last, entry
                    )));
                }
            }
            last = Some(entry);
        }
        Ok(())
    }
}
