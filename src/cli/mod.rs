mod inspect;
mod merge;
mod shared;

use camino::Utf8Path;
use clap::{Parser, Subcommand};
use simple_error::{bail, SimpleResult};

use self::inspect::validate_and_fix_inspect_settings;
pub use self::inspect::InspectSettings;
use self::merge::validate_and_fix_merge_settings;
pub use self::merge::MergeSettings;
pub use self::shared::SharedSettings;

#[derive(Subcommand)]
pub enum Commands {
    /// Merge breakend graph files into one consolidated graph
    Merge(MergeSettings),

    /// Validate one breakend graph file and print graph views from it
    Inspect(InspectSettings),
}

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    help_template = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}"
)]
#[clap(propagate_version = true, rename_all = "kebab_case")]
pub struct Settings {
    #[command(flatten)]
    pub shared: SharedSettings,

    #[command(subcommand)]
    pub command: Commands,
}

impl Settings {
    /// Output directory of the selected command, if it has one
    pub fn get_output_dir(&self) -> Option<&Utf8Path> {
        match &self.command {
            Commands::Merge(x) => Some(&x.output_dir),
            Commands::Inspect(_) => None,
        }
    }
}

/// Checks if a directory does not exist
///
pub fn check_novel_dirname(dirname: &Utf8Path, label: &str) -> SimpleResult<()> {
    if dirname.exists() {
        bail!("{} already exists: \"{}\"", label, dirname);
    }
    Ok(())
}

/// Validate settings and update parameters that can't be processed by clap
///
/// Parts of this process assume logging is already setup
///
pub fn validate_and_fix_settings_impl(mut settings: Settings) -> SimpleResult<Settings> {
    settings.command = match settings.command {
        Commands::Merge(x) => {
            let x = validate_and_fix_merge_settings(x)?;
            Commands::Merge(x)
        }
        Commands::Inspect(x) => {
            let x = validate_and_fix_inspect_settings(x)?;
            Commands::Inspect(x)
        }
    };

    Ok(settings)
}

/// Validate settings and update to parameters that can't be processed automatically by clap.
///
pub fn validate_and_fix_settings(settings: Settings) -> Settings {
    match validate_and_fix_settings_impl(settings) {
        Ok(x) => x,
        Err(msg) => {
            eprintln!("Invalid command-line setting: {}", msg);
            std::process::exit(exitcode::USAGE);
        }
    }
}

pub fn parse_settings() -> Settings {
    Settings::parse()
}
