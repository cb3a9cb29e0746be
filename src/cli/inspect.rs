use clap::Args;
use simple_error::{bail, SimpleResult};

#[derive(Args)]
pub struct InspectSettings {
    /// Breakend graph file to inspect
    #[arg(long = "graph", value_name = "FILE")]
    pub graph_filename: String,

    /// Restrict output to a samtools-style region (e.g. chr20:100-200)
    #[arg(long, value_name = "REGION")]
    pub region: Option<String>,

    /// Print the per-cluster statistics table instead of the graph listing
    #[arg(long)]
    pub stats: bool,

    /// Print the node index instead of the graph listing
    #[arg(long)]
    pub index: bool,
}

pub fn validate_and_fix_inspect_settings(
    settings: InspectSettings,
) -> SimpleResult<InspectSettings> {
    if !std::path::Path::new(&settings.graph_filename).exists() {
        bail!("Can't find input graph file: '{}'", settings.graph_filename);
    }
    if settings.stats && settings.index {
        bail!("Only one of --stats and --index can be selected");
    }
    Ok(settings)
}
