mod breakend_cluster;
mod chrom_list;
mod cli;
mod cluster_graph;
mod error;
mod genome_segment;
mod inspect_graph;
mod int_range;
mod merge_graphs;
mod run_stats;
mod version;

use std::process;

use camino::Utf8Path;
use hhmmss::Hhmmss;
use log::info;

use crate::cli::Commands;
use crate::inspect_graph::run_inspect;
use crate::merge_graphs::run_merge;
use crate::version::GRAYLING_VERSION;

static PROG_NAME: &str = env!("CARGO_PKG_NAME");

fn setup_logger(output_dir: Option<&Utf8Path>, debug: bool) -> Result<(), fern::InitError> {
    let level = if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let logger = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                PROG_NAME,
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr());

    let logger = if let Some(output_dir) = output_dir {
        let log_filename = output_dir.join(PROG_NAME.to_string() + ".log");
        logger.chain(fern::log_file(log_filename)?)
    } else {
        logger
    };

    logger.apply()?;
    Ok(())
}

/// Check and create output directory, then setup logger to write there
///
/// All error messaging in this method needs to account for no logger being setup yet.
///
fn setup_output_dir_and_logger(output_dir: &Utf8Path, clobber: bool, debug: bool) {
    let mut output_dir_exists = false;
    if let Err(msg) = cli::check_novel_dirname(output_dir, "Output directory") {
        if clobber && output_dir.is_dir() {
            output_dir_exists = true;
        } else {
            eprintln!("Invalid command-line setting: {}", msg);
            std::process::exit(exitcode::USAGE);
        }
    };
    if !output_dir_exists {
        match std::fs::create_dir_all(output_dir) {
            Ok(_) => {}
            Err(e) => {
                panic!("Can't create new output directory at '{}': {}", output_dir, e);
            }
        }
    }
    setup_logger(Some(output_dir), debug).unwrap();
}

fn run(settings: &cli::Settings) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting {PROG_NAME} {GRAYLING_VERSION}");
    info!(
        "cmdline: {}",
        std::env::args().collect::<Vec<_>>().join(" ")
    );

    let start = std::time::Instant::now();

    match &settings.command {
        Commands::Merge(x) => {
            run_merge(x)?;
        }
        Commands::Inspect(x) => {
            run_inspect(x)?;
        }
    }

    info!(
        "{PROG_NAME} completed. Total Runtime: {}",
        start.elapsed().hhmmssxxx()
    );
    Ok(())
}

fn main() {
    let settings = cli::parse_settings();

    // Validation of output_dir needs to be handled separately so that we don't log error messages
    // before logging is setup.
    match settings.get_output_dir() {
        Some(output_dir) => {
            setup_output_dir_and_logger(output_dir, settings.shared.clobber, settings.shared.debug);
        }
        None => {
            setup_logger(None, settings.shared.debug).unwrap();
        }
    }

    let settings = cli::validate_and_fix_settings(settings);

    if let Err(err) = run(&settings) {
        eprintln!("{}", err);
        process::exit(2);
    }
}
