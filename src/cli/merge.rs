use camino::Utf8PathBuf;
use clap::Args;
use simple_error::{bail, SimpleResult};

#[derive(Args)]
pub struct MergeSettings {
    /// Directory for all merge command output (must not already exist)
    #[arg(long, value_name = "DIR", default_value = "grayling_merge_output")]
    pub output_dir: Utf8PathBuf,

    /// Breakend graph file to merge, repeat the option for each input graph
    #[arg(long = "graph", value_name = "FILE")]
    pub graph_filenames: Vec<String>,
}

pub fn validate_and_fix_merge_settings(settings: MergeSettings) -> SimpleResult<MergeSettings> {
    if settings.graph_filenames.is_empty() {
        bail!("At least one input graph file is required (--graph)");
    }
    for filename in settings.graph_filenames.iter() {
        if !std::path::Path::new(filename).exists() {
            bail!("Can't find input graph file: '{}'", filename);
        }
    }
    Ok(settings)
}
