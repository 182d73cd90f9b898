//! Rescore aligned-document candidates by URL edit distance.
//!
//! Usage:
//!     urls-rescore --url docs.url.xz docs.ridx > docs.rescored.ridx
//!     zcat docs.ridx.gz | urls-rescore --url docs.url.gz --stats

use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use urlrescore_loader::{load_path, open_path, open_reader, Compression, LoaderConfig};
use urlrescore_rescore::Rescorer;

#[derive(Parser, Debug)]
#[command(name = "urls-rescore")]
#[command(about = "Append URL edit-distance ratios to reverse-index candidates")]
struct Cli {
    /// Reverse index (.ridx); read from standard input when omitted
    ridx: Option<PathBuf>,

    /// File with one URL per document, in document id order
    #[arg(long)]
    url: PathBuf,

    /// Compression of the URL file (auto, plain, gzip, xz)
    #[arg(long, default_value = "auto")]
    url_compression: Compression,

    /// Compression of the reverse index (auto, plain, gzip, xz)
    #[arg(long, default_value = "auto")]
    ridx_compression: Compression,

    /// Write to this file instead of standard output
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print run statistics as JSON on standard error
    #[arg(long)]
    stats: bool,
}

fn main() -> Result<()> {
    // Logs go to stderr, stdout carries records
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let config = LoaderConfig {
        compression: cli.url_compression,
    };
    let documents = load_path(&cli.url, &config)
        .with_context(|| format!("loading URLs from {}", cli.url.display()))?;

    let input: Box<dyn BufRead> = match &cli.ridx {
        Some(path) => open_path(path, cli.ridx_compression)?,
        None => open_reader(io::stdin().lock(), cli.ridx_compression)
            .context("opening standard input")?,
    };

    let output: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    info!(
        documents = documents.len(),
        input = %describe(cli.ridx.as_deref()),
        output = %describe(cli.output.as_deref()),
        "rescoring reverse index"
    );

    let stats = Rescorer::new(&documents)
        .run(input, output)
        .context("rescoring reverse index")?;

    if cli.stats {
        eprintln!("{}", serde_json::to_string(&stats)?);
    }

    Ok(())
}

fn describe(path: Option<&Path>) -> String {
    match path {
        Some(path) => path.display().to_string(),
        None => "-".to_string(),
    }
}
