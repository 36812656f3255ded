use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

use lemmatch_reference::{LoadMode, ReferenceSet, SourceFile};
use lemmatch_service::{DEFAULT_BATCH_SIZE, MatchingSession};

/// Match a Georgian word list against a lemmatised reference and print TSV.
#[derive(Parser, Debug)]
#[command(name = "lemmatch", version)]
struct Cli {
    /// Reference dictionary (CSV or TSV).
    #[arg(long, short)]
    reference: PathBuf,
    /// Word list with a `Word` column and an optional `Freq` column.
    #[arg(long, short)]
    words: PathBuf,
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: NonZeroUsize,
    /// Also write a row for every word without a match.
    #[arg(long)]
    include_unmatched: bool,
    /// Print match statistics to stderr.
    #[arg(long)]
    stats: bool,
    /// How input files are read: `mmap` or `owned`.
    #[arg(long, default_value = "mmap", value_parser = parse_mode)]
    mode: LoadMode,
    /// Write the export here instead of stdout.
    #[arg(long, short)]
    output: Option<PathBuf>,
}

fn parse_mode(raw: &str) -> Result<LoadMode, String> {
    LoadMode::parse(raw).ok_or_else(|| format!("unknown load mode `{raw}` (expected mmap or owned)"))
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let reference = ReferenceSet::from_path(&cli.reference, cli.mode)
        .with_context(|| format!("loading reference data from {}", cli.reference.display()))?;
    let mut session = MatchingSession::new(cli.batch_size);
    let summary = session.set_reference(reference.into());
    info!(
        "reference: {} entries, {} index keys ({})",
        summary.entries, summary.index_keys, summary.schema
    );

    let words = SourceFile::open(&cli.words, cli.mode)
        .with_context(|| format!("opening word list {}", cli.words.display()))?;
    let input = session
        .parse_word_list(words.text()?)
        .with_context(|| format!("parsing word list {}", cli.words.display()))?;
    info!("{} words in {} batches", input.total, input.batches);

    session.process_all()?;

    let tsv = session.export(cli.include_unmatched);
    match &cli.output {
        Some(path) => {
            let file =
                File::create(path).with_context(|| format!("creating {}", path.display()))?;
            let mut out = BufWriter::new(file);
            writeln!(out, "{tsv}")?;
            out.flush()?;
        }
        None => {
            let mut out = io::stdout().lock();
            writeln!(out, "{tsv}")?;
        }
    }

    if cli.stats {
        print_stats(&session);
    }
    Ok(())
}

fn print_stats(session: &MatchingSession) {
    let stats = session.statistics();
    eprintln!("Total     : {}", stats.total);
    eprintln!("Matched   : {}", stats.matched);
    eprintln!("Unmatched : {}", stats.unmatched);
    if stats.matched > 0 {
        eprintln!("Matches by POS:");
        for share in stats.pos_distribution() {
            eprintln!("  {:<12} {:>6} {:>3}%", share.pos, share.count, share.percentage);
        }
    }
}

/// Logs go to stderr so stdout stays a clean TSV stream.
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let max_level = env_filter
        .max_level_hint()
        .and_then(|hint| hint.into_level())
        .unwrap_or(Level::WARN);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_max_level(max_level)
        .with_writer(io::stderr)
        .init();
}
