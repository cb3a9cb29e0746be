use camino::Utf8Path;
use log::info;

use crate::cli;
use crate::cluster_graph::ClusterGraph;
use crate::error::GraphError;
use crate::genome_segment::parse_samtools_region_string;

/// Load one graph file and print the selected view of it to stdout
///
/// Loading already runs the full structure validation, so a plain `inspect --graph FILE` also
/// serves as a graph file integrity check.
///
pub fn run_inspect(settings: &cli::InspectSettings) -> Result<(), GraphError> {
    let mut graph = ClusterGraph::load(Utf8Path::new(&settings.graph_filename))?;

    info!(
        "Loaded breakend graph with {} clusters and {} indexed nodes",
        graph.clusters().iter().filter(|x| !x.is_empty()).count(),
        graph.node_index().len()
    );

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if let Some(region) = &settings.region {
        let (chrom_index, start, end) = parse_samtools_region_string(graph.chrom_list(), region);
        graph.dump_region(&mut out, chrom_index, start, end)?;
    } else if settings.stats {
        graph.dump_stats(&mut out)?;
    } else if settings.index {
        graph.dump_index(&mut out)?;
    } else {
        graph.dump(&mut out)?;
    }
    Ok(())
}
