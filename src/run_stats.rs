//! Track stats for the whole grayling run
//!

use std::fs::File;

use camino::Utf8Path;
use log::info;
use serde::{Deserialize, Serialize};
use unwrap::unwrap;

use crate::cluster_graph::ClusterGraph;

pub const RUN_STATS_FILENAME: &str = "run.stats.json";

#[derive(Default, Deserialize, Serialize)]
pub struct MergeRunStats {
    pub input_graph_count: usize,
    pub cluster_count: usize,
    pub node_count: usize,
    pub edge_count: usize,
    pub node_observation_count: usize,
    pub edge_observation_count: usize,
}

pub fn get_merge_run_stats(graph: &ClusterGraph, input_graph_count: usize) -> MergeRunStats {
    let mut run_stats = MergeRunStats {
        input_graph_count,
        ..Default::default()
    };
    for cluster in graph.clusters().iter() {
        if cluster.is_empty() {
            continue;
        }
        run_stats.cluster_count += 1;
        for node in cluster.nodes().iter() {
            run_stats.node_count += 1;
            run_stats.node_observation_count += node.count;
            run_stats.edge_count += node.edge_count();
            for edge in node.edges().values() {
                run_stats.edge_observation_count += edge.count;
            }
        }
    }
    run_stats
}

/// Write run_stats structure out in json format
pub fn write_merge_run_stats(output_dir: &Utf8Path, run_stats: &MergeRunStats) {
    let filename = output_dir.join(RUN_STATS_FILENAME);

    info!("Writing run statistics to file: '{filename}'");

    let f = unwrap!(
        File::create(&filename),
        "Unable to create run statistics json file: '{filename}'"
    );

    serde_json::to_writer_pretty(&f, &run_stats).unwrap();
}
