//! Streaming Atom 1.0 / GData parser and serializer.
//!
//! An [`AtomFeedParser`] walks an XML stream once and builds a [`Feed`]:
//! typed fields for the Atom grammar, OpenSearch paging counters, GData
//! batch metadata, and an ordered extension list on every node for anything
//! it does not recognize. The tree tracks its own modifications so that
//! saving writes back what was loaded or changed, with foreign markup
//! preserved.

pub mod errors;
pub mod extensions;
pub mod model;
pub mod names;
pub mod parser;
pub mod primitives;
pub mod progress;
pub mod report;
pub mod writer;

pub use errors::AtomError;
pub use extensions::{Extension, ExtensionFactory, ExtensionRegistry, TypedExtension};
pub use model::{AtomNode, Entry, Feed, NodeKind};
pub use parser::{AtomFeedParser, EntryAction, ParseObserver, ParserOptions};
pub use writer::{AtomWriter, WriteOptions};

use clap::ValueEnum;
use log::info;
use report::FeedReport;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

/// How the CLI prints its summary of the parsed document.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReportFormat {
    None,
    /// Coloured terminal text
    #[default]
    Text,
    Json,
}

/// Top-level configuration for one CLI run.
#[derive(Debug)]
pub struct Config {
    pub input_file: PathBuf,
    pub output_file: Option<PathBuf>,
    pub report: ReportFormat,
    pub pretty: bool,
    pub parse_batch_errors: bool,
}

/// Parses the input document, re-serializes it when an output is given and
/// prints the report.
pub fn run(config: Config) -> Result<(), AtomError> {
    let start_time = Instant::now();
    info!("Reading {}", config.input_file.display());

    let input = File::open(&config.input_file)
        .map_err(|e| AtomError::Io(e, "Failed to open input file".to_string()))?;
    let parser = AtomFeedParser::with_options(ParserOptions {
        parse_batch_errors: config.parse_batch_errors,
        ..Default::default()
    });

    let mut feed = Feed::new();
    let mut progress = progress::ProgressTracker::new(parser.options().report_interval);
    parser.parse_with(BufReader::new(input), &mut feed, &mut progress)?;
    progress.finish();

    if let Some(ref output_path) = config.output_file {
        info!("Writing {}", output_path.display());
        let output = File::create(output_path)
            .map_err(|e| AtomError::Io(e, "Failed to create output file".to_string()))?;
        let options = WriteOptions {
            indent: config.pretty.then_some(2),
        };
        save_document(&feed, BufWriter::new(output), &options)?;
    }

    let report = FeedReport::analyze(&feed).with_file(&config.input_file);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match config.report {
        ReportFormat::None => {}
        ReportFormat::Text if colored::control::SHOULD_COLORIZE.should_colorize() => {
            write!(out, "{}", report.render_colored())?
        }
        ReportFormat::Text => write!(out, "{}", report.render_plain())?,
        ReportFormat::Json => writeln!(out, "{}", report.to_json()?)?,
    }

    info!("Total execution time: {:.2?}", start_time.elapsed());
    Ok(())
}

/// A single-entry document is written back as an entry document.
fn save_document<W: Write>(feed: &Feed, out: W, options: &WriteOptions) -> Result<(), AtomError> {
    match feed.entries().get(0) {
        Some(entry) if feed.entries().len() == 1 && !feed.source().has_content() => {
            entry.save_with(out, options)
        }
        _ => feed.save_with(out, options),
    }
}
