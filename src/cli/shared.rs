use clap::Args;

#[derive(Args)]
pub struct SharedSettings {
    /// Allow the output directory to already exist, and overwrite files within it
    #[arg(long, global = true)]
    pub clobber: bool,

    /// Enable debug-level log output
    #[arg(long, global = true)]
    pub debug: bool,
}
