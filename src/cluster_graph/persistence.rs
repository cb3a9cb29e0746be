//! Breakend graph file save/load
//!
//! A graph file is a single MessagePack stream holding the header followed by every non-empty
//! cluster in slot order. Values are self-describing, so clusters are read back until the stream
//! is exhausted with no explicit framing. Cluster slot numbering is not preserved by the file:
//! loading assigns fresh dense slots in file order.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};

use camino::Utf8Path;
use log::info;
use serde::{Deserialize, Serialize};

use super::{ClusterGraph, NodeAddress, NodeIndexEntry};
use crate::breakend_cluster::BreakendCluster;
use crate::chrom_list::ChromList;
use crate::error::GraphError;

pub const GRAPH_FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct GraphHeader {
    format_version: u32,
    chrom_list: ChromList,
}

impl ClusterGraph {
    pub fn save(&self, filename: &Utf8Path) -> Result<(), GraphError> {
        info!("Writing breakend graph to file: '{filename}'");

        let f = File::create(filename)?;
        let mut writer = BufWriter::new(f);
        {
            let mut serializer = rmp_serde::Serializer::new(&mut writer);
            let header = GraphHeader {
                format_version: GRAPH_FORMAT_VERSION,
                chrom_list: self.chrom_list.clone(),
            };
            header.serialize(&mut serializer)?;
            for cluster in self.clusters.iter() {
                if cluster.is_empty() {
                    continue;
                }
                cluster.serialize(&mut serializer)?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    /// Read a breakend graph file, rebuild the node index, and validate the result
    pub fn load(filename: &Utf8Path) -> Result<Self, GraphError> {
        info!("Reading breakend graph from file: '{filename}'");

        let f = File::open(filename)?;
        let mut reader = BufReader::new(f);

        let mut header: GraphHeader =
            Deserialize::deserialize(&mut rmp_serde::Deserializer::new(&mut reader))?;
        if header.format_version != GRAPH_FORMAT_VERSION {
            return Err(GraphError::UnsupportedFormatVersion(header.format_version));
        }
        header.chrom_list.rebuild_lookup();

        let mut graph = ClusterGraph::new(header.chrom_list);
        graph.set_source(filename.as_str());
        loop {
            if reader.fill_buf()?.is_empty() {
                break;
            }
            let mut cluster: BreakendCluster =
                Deserialize::deserialize(&mut rmp_serde::Deserializer::new(&mut reader))?;
            if cluster.is_empty() {
                continue;
            }
            let cluster_index = graph.clusters.len();
            cluster.assign_index(cluster_index);
            graph.clusters.push(cluster);
        }

        graph.reconstruct_index();
        graph.check_state(true)?;
        Ok(graph)
    }

    /// Rebuild the node index and the free slot set from cluster content alone
    fn reconstruct_index(&mut self) {
        self.node_index.clear();
        self.empty_clusters.clear();

        for (cluster_index, cluster) in self.clusters.iter().enumerate() {
            for node_index in 0..cluster.node_count() {
                self.node_index.insert(NodeIndexEntry {
                    segment: cluster.get_node(node_index).segment.clone(),
                    addr: NodeAddress {
                        cluster_index,
                        node_index,
                    },
                });
            }
            if cluster.is_empty() {
                self.empty_clusters.insert(cluster_index);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome_segment::GenomeSegment;

    fn test_chrom_list() -> ChromList {
        let mut chrom_list = ChromList::default();
        chrom_list.add_chrom("chr1", 10000);
        chrom_list.add_chrom("chr2", 10000);
        chrom_list
    }

    fn linked_pair_cluster() -> BreakendCluster {
        let mut cluster = BreakendCluster::new();
        let n0 = cluster.add_node(GenomeSegment::new(0, 10, 25));
        let n1 = cluster.add_node(GenomeSegment::new(0, 100, 115));
        cluster.increment_observations(n0, 2);
        cluster.increment_observations(n1, 2);
        cluster.link_nodes(n0, n1, 2, 0);
        cluster
    }

    #[test]
    fn test_save_load_round_trip() {
        let mut graph = ClusterGraph::new(test_chrom_list());
        graph.merge_cluster(&linked_pair_cluster()).unwrap();
        graph
            .merge_cluster(&{
                let mut x = BreakendCluster::new();
                x.add_node(GenomeSegment::new(1, 50, 60));
                x
            })
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let filename =
            camino::Utf8PathBuf::from_path_buf(dir.path().join("breakend.graph.mpack")).unwrap();

        graph.save(&filename).unwrap();
        let restored = ClusterGraph::load(&filename).unwrap();

        assert_eq!(restored.chrom_list(), graph.chrom_list());
        assert_eq!(restored.source(), filename.as_str());
        assert_eq!(restored.clusters(), graph.clusters());
        assert_eq!(restored.node_index().len(), graph.node_index().len());
        restored.check_state(true).unwrap();
    }

    /// Empty cluster slots are not written, so loading renumbers the surviving clusters densely
    ///
    #[test]
    fn test_load_renumbers_slots() {
        let mut graph = ClusterGraph::new(test_chrom_list());
        graph
            .merge_cluster(&{
                let mut x = BreakendCluster::new();
                x.add_node(GenomeSegment::new(0, 0, 10));
                x
            })
            .unwrap();
        graph
            .merge_cluster(&{
                let mut x = BreakendCluster::new();
                x.add_node(GenomeSegment::new(0, 100, 110));
                x
            })
            .unwrap();
        graph
            .merge_cluster(&{
                let mut x = BreakendCluster::new();
                x.add_node(GenomeSegment::new(0, 5, 105));
                x
            })
            .unwrap();

        // The chain merge leaves two empty slots behind
        assert_eq!(graph.cluster_count(), 3);
        assert_eq!(graph.empty_clusters().len(), 2);

        let dir = tempfile::tempdir().unwrap();
        let filename = camino::Utf8PathBuf::from_path_buf(dir.path().join("graph.mpack")).unwrap();

        graph.save(&filename).unwrap();
        let restored = ClusterGraph::load(&filename).unwrap();

        assert_eq!(restored.cluster_count(), 1);
        assert!(restored.empty_clusters().is_empty());
        assert_eq!(restored.get_cluster(0).index(), 0);
        assert_eq!(
            restored.get_cluster(0).get_node(0).segment,
            GenomeSegment::new(0, 0, 110)
        );
    }
}
