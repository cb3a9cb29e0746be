use camino::Utf8Path;
use log::info;
use unwrap::unwrap;

use crate::cli;
use crate::cluster_graph::ClusterGraph;
use crate::error::GraphError;
use crate::run_stats::{get_merge_run_stats, write_merge_run_stats};

pub const BREAKEND_GRAPH_FILENAME: &str = "breakend.graph.mpack";
pub const GRAPH_STATS_FILENAME: &str = "graph.stats.tsv";

fn write_graph_stats(output_dir: &Utf8Path, graph: &ClusterGraph) {
    use std::io::BufWriter;

    let filename = output_dir.join(GRAPH_STATS_FILENAME);
    info!("Writing graph statistics to file: '{filename}'");

    let f = unwrap!(
        std::fs::File::create(&filename),
        "Unable to create graph statistics file: '{filename}'"
    );
    let mut f = BufWriter::new(f);
    graph.dump_stats(&mut f).unwrap();
}

/// Fold all input graph files into one consolidated graph and write it out with its statistics
///
pub fn run_merge(settings: &cli::MergeSettings) -> Result<(), GraphError> {
    let mut graph: Option<ClusterGraph> = None;
    for filename in settings.graph_filenames.iter() {
        let input = ClusterGraph::load(Utf8Path::new(filename))?;
        match graph.as_mut() {
            None => {
                graph = Some(input);
            }
            Some(graph) => {
                graph.merge_graph(&input)?;
            }
        }
    }

    // The settings validator requires at least one input graph
    let graph = graph.unwrap();
    graph.check_state(true)?;

    info!(
        "Merged {} input graphs into {} clusters",
        settings.graph_filenames.len(),
        graph.clusters().iter().filter(|x| !x.is_empty()).count()
    );

    graph.save(&settings.output_dir.join(BREAKEND_GRAPH_FILENAME))?;
    write_graph_stats(&settings.output_dir, &graph);

    let run_stats = get_merge_run_stats(&graph, settings.graph_filenames.len());
    write_merge_run_stats(&settings.output_dir, &run_stats);
    Ok(())
}
