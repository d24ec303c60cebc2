//! Main binary entry point for gdata-atom.

use clap::Parser;
use gdata_atom::errors::AtomError;
use gdata_atom::{Config, ReportFormat};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    #[arg(short, long, value_name = "FILE", help = "Write the parsed document back out")]
    output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    report: ReportFormat,

    #[arg(long, help = "Indent the written XML")]
    pretty: bool,

    #[arg(long, help = "Read batch:errors nested in batch:status")]
    batch_errors: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn setup_logging(verbose: bool) {
    let filter_level = if verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Warn
    };

    env_logger::Builder::new()
        .filter(None, filter_level)
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn run_app() -> Result<(), AtomError> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let config = Config {
        input_file: cli.input,
        output_file: cli.output,
        report: cli.report,
        pretty: cli.pretty,
        parse_batch_errors: cli.batch_errors,
    };

    gdata_atom::run(config)
}

fn main() -> ExitCode {
    match run_app() {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("A fatal error occurred:");
            log::error!("{}", e);
            let mut source = std::error::Error::source(&e);
            while let Some(s) = source {
                log::error!("  Caused by: {}", s);
                source = std::error::Error::source(s);
            }
            ExitCode::FAILURE
        }
    }
}
