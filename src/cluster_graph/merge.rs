//! Cluster merge protocol for the breakend graph
//!

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, error};

use super::{ClusterGraph, NodeAddress, NodeIndexEntry};
use crate::breakend_cluster::BreakendCluster;
use crate::error::GraphError;
use crate::genome_segment::GenomeSegment;

impl ClusterGraph {
    /// Merge one new breakend cluster into the graph
    ///
    /// The input is staged into a free cluster slot, then each input node is tested against the
    /// node index. Whenever an input node intersects nodes of existing clusters, all involved
    /// clusters are consolidated into the lowest-numbered involved slot and the mutually
    /// intersecting nodes are coalesced into the one node covering the input node. The staging
    /// slot keeps an unmodified copy of the input for the whole operation so every index probe
    /// can use a stable address; it is cleared at the end iff the content migrated into another
    /// slot.
    ///
    pub fn merge_cluster(&mut self, input: &BreakendCluster) -> Result<(), GraphError> {
        if input.is_empty() {
            return Ok(());
        }

        let stage_index = self.insert_cluster(input);
        let mut head_index = stage_index;

        debug!(
            "merging input cluster with {} nodes into stage slot {}",
            input.node_count(),
            stage_index
        );

        // The index scan is only contiguous around the probe, so input nodes are processed in
        // segment order to make each probe a local left-to-right extension on its chromosome:
        let input_nodes = {
            let mut x = BTreeMap::new();
            let stage = &self.clusters[stage_index];
            for node_index in 0..stage.node_count() {
                x.entry(stage.get_node(node_index).segment.clone())
                    .or_insert(node_index);
            }
            x
        };

        for (_, node_index) in input_nodes {
            let stage_addr = NodeAddress {
                cluster_index: stage_index,
                node_index,
            };
            let intersect = self.find_intersecting_nodes(stage_addr);
            debug!(
                "input node {:?} intersects {} indexed nodes",
                stage_addr,
                intersect.len()
            );

            if head_index == stage_index {
                // Consolidation hasn't started, a node without intersections stays where it is:
                if intersect.is_empty() {
                    continue;
                }
            } else {
                // Consolidation has started, so this input node's copy in the head cluster must
                // be found at minimum:
                if intersect.is_empty() {
                    return Err(GraphError::invariant(format!(
                        "no intersecting nodes found for input node {:?} {:?} after \
                         consolidation into cluster slot {}",
                        stage_addr,
                        self.get_node(stage_addr).segment,
                        head_index
                    )));
                }
                if intersect.len() == 1 {
                    continue;
                }
            }

            head_index = self.unify_intersecting_clusters(&intersect, stage_index, head_index);

            let intersect = self.find_intersecting_nodes(stage_addr);
            if intersect.is_empty() {
                return Err(GraphError::invariant(format!(
                    "input node {:?} has no intersecting nodes after cluster unification \
                     into slot {}",
                    stage_addr, head_index
                )));
            }

            self.coalesce_intersecting_nodes(&intersect, stage_addr, head_index)?;
        }

        if head_index != stage_index {
            debug!("clearing migrated stage slot {}", stage_index);
            self.clear_cluster(stage_index);
        }
        Ok(())
    }

    /// Fold every cluster of another graph into this one
    ///
    /// Both graphs must use the same chromosome list. A failed nested merge is reported with the
    /// other graph's source label and the offending cluster slot, then surfaced to the caller.
    ///
    pub fn merge_graph(&mut self, other: &ClusterGraph) -> Result<(), GraphError> {
        if other.chrom_list != self.chrom_list {
            return Err(GraphError::HeaderMismatch {
                graph_source: other.source.clone(),
            });
        }

        for cluster in other.clusters.iter() {
            self.merge_cluster(cluster).map_err(|err| {
                error!(
                    "cluster graph merge failed\n\tgraph source: {}\n\tcluster index: {}",
                    other.source,
                    cluster.index()
                );
                GraphError::MergeFailure {
                    graph_source: other.source.clone(),
                    cluster_index: cluster.index(),
                    inner: Box::new(err),
                }
            })?;
        }
        Ok(())
    }

    /// Move every cluster referenced by `intersect`, and the current head cluster, into the
    /// lowest-numbered slot among them
    ///
    /// The stage slot never appears in `intersect` (the index probe excludes the probe's own
    /// cluster), so its content is copied out but the slot itself is left populated; every other
    /// moved cluster is cleared as it is copied. Returns the new head slot.
    ///
    fn unify_intersecting_clusters(
        &mut self,
        intersect: &BTreeSet<NodeIndexEntry>,
        stage_index: usize,
        head_index: usize,
    ) -> usize {
        let new_head_index = intersect
            .iter()
            .map(|x| x.addr.cluster_index)
            .min()
            .unwrap();

        let clear_source = head_index != stage_index;
        self.combine_clusters(head_index, new_head_index, clear_source);
        for entry in intersect.iter() {
            self.combine_clusters(entry.addr.cluster_index, new_head_index, true);
        }

        debug!(
            "unified intersecting clusters into slot {} (previous head {})",
            new_head_index, head_index
        );
        new_head_index
    }

    /// Coalesce all nodes in `intersect` into the single node covering the input node
    ///
    /// Immediately after unification exactly the unified cluster holds every intersecting node,
    /// including a copy of the input node itself, so one entry must cover the input node's
    /// segment; that node is the merge target. The remaining nodes are merged into it from the
    /// highest node slot down, so that the slot recycling performed by each removal can't touch
    /// a slot that is still pending.
    ///
    fn coalesce_intersecting_nodes(
        &mut self,
        intersect: &BTreeSet<NodeIndexEntry>,
        stage_addr: NodeAddress,
        head_index: usize,
    ) -> Result<(), GraphError> {
        let input_segment: GenomeSegment = self.get_node(stage_addr).segment.clone();

        let mut merge_target: Option<NodeAddress> = None;
        let mut merge_sources = Vec::new();
        for entry in intersect.iter() {
            assert_eq!(entry.addr.cluster_index, head_index);
            if merge_target.is_none() && entry.segment.is_superset_of(&input_segment) {
                merge_target = Some(entry.addr);
            } else {
                merge_sources.push(entry.addr);
            }
        }
        let mut merge_target = match merge_target {
            Some(x) => x,
            None => {
                return Err(GraphError::invariant(format!(
                    "no node covering input node {:?} {:?} found in unified cluster slot {}",
                    stage_addr, input_segment, head_index
                )));
            }
        };

        merge_sources.sort();
        for mut source in merge_sources.into_iter().rev() {
            // Keep the lower-addressed node as the survivor so its slot stays stable:
            if source < merge_target {
                std::mem::swap(&mut source, &mut merge_target);
            }
            debug!("coalescing node {:?} into {:?}", source, merge_target);
            self.coalesce_nodes(source, merge_target);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chrom_list::ChromList;

    fn test_chrom_list() -> ChromList {
        let mut chrom_list = ChromList::default();
        chrom_list.add_chrom("chr1", 10000);
        chrom_list.add_chrom("chr2", 10000);
        chrom_list
    }

    fn single_node_cluster(chrom_index: usize, start: i64, end: i64) -> BreakendCluster {
        let mut cluster = BreakendCluster::new();
        let node = cluster.add_node(GenomeSegment::new(chrom_index, start, end));
        cluster.increment_observations(node, 1);
        cluster
    }

    fn non_empty_cluster_count(graph: &ClusterGraph) -> usize {
        graph.clusters().iter().filter(|x| !x.is_empty()).count()
    }

    #[test]
    fn test_merge_disjoint_clusters() {
        let mut graph = ClusterGraph::new(test_chrom_list());
        graph.merge_cluster(&single_node_cluster(0, 10, 20)).unwrap();
        graph
            .merge_cluster(&single_node_cluster(0, 100, 200))
            .unwrap();

        assert_eq!(non_empty_cluster_count(&graph), 2);
        assert_eq!(graph.node_index().len(), 2);
        assert_eq!(graph.get_region_intersect(0, 0, 1000).len(), 2);
        graph.check_state(true).unwrap();
    }

    #[test]
    fn test_merge_overlap_coalesces_to_one_node() {
        let mut graph = ClusterGraph::new(test_chrom_list());
        graph.merge_cluster(&single_node_cluster(0, 10, 30)).unwrap();
        graph.merge_cluster(&single_node_cluster(0, 20, 40)).unwrap();

        assert_eq!(non_empty_cluster_count(&graph), 1);
        assert_eq!(graph.node_index().len(), 1);

        let cluster = graph.get_cluster(0);
        assert_eq!(cluster.node_count(), 1);
        let node = cluster.get_node(0);
        assert_eq!(node.segment, GenomeSegment::new(0, 10, 40));
        assert_eq!(node.count, 2);
        graph.check_state(true).unwrap();
    }

    #[test]
    fn test_merge_chain_unifies_three_clusters() {
        let mut graph = ClusterGraph::new(test_chrom_list());
        graph.merge_cluster(&single_node_cluster(0, 0, 10)).unwrap();
        graph
            .merge_cluster(&single_node_cluster(0, 100, 110))
            .unwrap();
        graph.merge_cluster(&single_node_cluster(0, 5, 105)).unwrap();

        // Everything folds into the lowest involved slot, the other slots are freed
        assert_eq!(non_empty_cluster_count(&graph), 1);
        assert_eq!(graph.node_index().len(), 1);
        assert_eq!(
            graph.empty_clusters().iter().copied().collect::<Vec<_>>(),
            vec![1, 2]
        );

        let node = graph.get_cluster(0).get_node(0);
        assert_eq!(node.segment, GenomeSegment::new(0, 0, 110));
        assert_eq!(node.count, 3);
        graph.check_state(true).unwrap();

        // Region query resolves to the single surviving node
        let intersect = graph.get_region_intersect(0, 50, 60);
        assert_eq!(intersect.len(), 1);
        assert_eq!(
            intersect.first().unwrap().addr,
            NodeAddress {
                cluster_index: 0,
                node_index: 0
            }
        );
    }

    fn linked_pair_cluster(
        segment1: GenomeSegment,
        segment2: GenomeSegment,
    ) -> BreakendCluster {
        let mut cluster = BreakendCluster::new();
        let n0 = cluster.add_node(segment1);
        let n1 = cluster.add_node(segment2);
        cluster.increment_observations(n0, 1);
        cluster.increment_observations(n1, 1);
        cluster.link_nodes(n0, n1, 1, 0);
        cluster
    }

    #[test]
    fn test_merge_retargets_edges() {
        let mut graph = ClusterGraph::new(test_chrom_list());
        graph
            .merge_cluster(&linked_pair_cluster(
                GenomeSegment::new(0, 10, 20),
                GenomeSegment::new(0, 100, 110),
            ))
            .unwrap();
        graph
            .merge_cluster(&linked_pair_cluster(
                GenomeSegment::new(0, 15, 25),
                GenomeSegment::new(0, 105, 115),
            ))
            .unwrap();

        assert_eq!(non_empty_cluster_count(&graph), 1);
        let cluster = graph.get_cluster(0);
        assert_eq!(cluster.node_count(), 2);

        let node0 = cluster.get_node(0);
        let node1 = cluster.get_node(1);
        assert_eq!(node0.segment, GenomeSegment::new(0, 10, 25));
        assert_eq!(node1.segment, GenomeSegment::new(0, 100, 115));
        assert_eq!(node0.count, 2);
        assert_eq!(node1.count, 2);

        // The two input edges collapse onto one edge pair with summed counts
        assert_eq!(node0.edges()[&1].count, 2);
        assert_eq!(node1.edges()[&0].count, 0);
        graph.check_state(true).unwrap();
    }

    /// Re-merging a copy of an existing cluster must leave the structure unchanged while
    /// doubling the observation counts
    ///
    #[test]
    fn test_merge_of_contained_cluster_doubles_counts() {
        let input = linked_pair_cluster(
            GenomeSegment::new(0, 10, 20),
            GenomeSegment::new(0, 100, 110),
        );

        let mut graph = ClusterGraph::new(test_chrom_list());
        graph.merge_cluster(&input).unwrap();
        graph.merge_cluster(&input).unwrap();

        assert_eq!(non_empty_cluster_count(&graph), 1);
        let cluster = graph.get_cluster(0);
        assert_eq!(cluster.node_count(), 2);
        assert_eq!(cluster.get_node(0).count, 2);
        assert_eq!(cluster.get_node(1).count, 2);
        assert_eq!(cluster.get_node(0).edges()[&1].count, 2);
        graph.check_state(true).unwrap();
    }

    /// Merge order must not affect the structure built from non-touching inputs
    ///
    #[test]
    fn test_merge_order_of_disjoint_inputs() {
        let input_a = single_node_cluster(0, 10, 20);
        let input_b = linked_pair_cluster(
            GenomeSegment::new(0, 100, 110),
            GenomeSegment::new(1, 50, 60),
        );

        let mut graph1 = ClusterGraph::new(test_chrom_list());
        graph1.merge_cluster(&input_a).unwrap();
        graph1.merge_cluster(&input_b).unwrap();

        let mut graph2 = ClusterGraph::new(test_chrom_list());
        graph2.merge_cluster(&input_b).unwrap();
        graph2.merge_cluster(&input_a).unwrap();

        graph1.check_state(true).unwrap();
        graph2.check_state(true).unwrap();

        let sorted_clusters = |graph: &ClusterGraph| {
            let mut x = graph
                .clusters()
                .iter()
                .filter(|c| !c.is_empty())
                .cloned()
                .collect::<Vec<_>>();
            x.sort_by(|a, b| a.get_node(0).segment.cmp(&b.get_node(0).segment));
            x
        };
        assert_eq!(sorted_clusters(&graph1), sorted_clusters(&graph2));
    }

    #[test]
    fn test_merge_empty_cluster_is_a_no_op() {
        let mut graph = ClusterGraph::new(test_chrom_list());
        graph.merge_cluster(&BreakendCluster::new()).unwrap();

        assert_eq!(graph.cluster_count(), 0);
        graph.check_state(true).unwrap();
    }

    #[test]
    fn test_merge_graph_folds_all_clusters() {
        let mut graph1 = ClusterGraph::new(test_chrom_list());
        graph1.merge_cluster(&single_node_cluster(0, 10, 30)).unwrap();
        graph1
            .merge_cluster(&single_node_cluster(1, 10, 30))
            .unwrap();

        let mut graph2 = ClusterGraph::new(test_chrom_list());
        graph2.merge_cluster(&single_node_cluster(0, 20, 40)).unwrap();
        graph2
            .merge_cluster(&single_node_cluster(1, 100, 110))
            .unwrap();

        graph1.merge_graph(&graph2).unwrap();
        graph1.check_state(true).unwrap();

        assert_eq!(non_empty_cluster_count(&graph1), 3);
        let intersect = graph1.get_region_intersect(0, 0, 10000);
        assert_eq!(intersect.len(), 1);
        assert_eq!(
            intersect.first().unwrap().segment,
            GenomeSegment::new(0, 10, 40)
        );
    }

    #[test]
    fn test_merge_graph_rejects_chrom_list_mismatch() {
        let mut graph1 = ClusterGraph::new(test_chrom_list());

        let mut other_chrom_list = ChromList::default();
        other_chrom_list.add_chrom("chrX", 5000);
        let mut graph2 = ClusterGraph::new(other_chrom_list);
        graph2.set_source("mismatched_graph");
        graph2.merge_cluster(&single_node_cluster(0, 10, 30)).unwrap();

        let result = graph1.merge_graph(&graph2);
        assert!(matches!(result, Err(GraphError::HeaderMismatch { .. })));
    }

    /// A single input node overlapping several existing clusters at once must pull every
    /// involved cluster into one, keeping edges from all of them
    ///
    #[test]
    fn test_merge_spanning_node_collects_all_edges() {
        let mut graph = ClusterGraph::new(test_chrom_list());
        graph
            .merge_cluster(&linked_pair_cluster(
                GenomeSegment::new(0, 10, 20),
                GenomeSegment::new(1, 10, 20),
            ))
            .unwrap();
        graph
            .merge_cluster(&linked_pair_cluster(
                GenomeSegment::new(0, 30, 40),
                GenomeSegment::new(1, 30, 40),
            ))
            .unwrap();

        // One wide node covering both chr1 nodes of the existing clusters
        graph.merge_cluster(&single_node_cluster(0, 10, 40)).unwrap();
        graph.check_state(true).unwrap();

        assert_eq!(non_empty_cluster_count(&graph), 1);
        let cluster = graph.get_cluster(0);
        assert_eq!(cluster.node_count(), 3);

        // The wide surviving node keeps an edge to each chr2 partner
        let wide_node = cluster
            .nodes()
            .iter()
            .find(|x| x.segment == GenomeSegment::new(0, 10, 40))
            .unwrap();
        assert_eq!(wide_node.count, 3);
        assert_eq!(wide_node.edge_count(), 2);
    }
}
