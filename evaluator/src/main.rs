use anyhow::Result;
use clap::Parser;
use conjunct_core::persist::QueryLog;
use conjunct_core::{PipelineConfig, StemmerKind};
use evaluator::{open_evaluator, run_session, IndexDump, IndexSource};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "evaluator")]
#[command(about = "Answer two-term AND queries against an inverted index", long_about = None)]
struct Args {
    /// `<DOC>` collection to index at startup
    #[arg(long, required_unless_present = "index_dir", conflicts_with = "index_dir")]
    collection: Option<PathBuf>,
    /// Directory written by `indexer build`
    #[arg(long)]
    index_dir: Option<PathBuf>,
    /// Where to write the index text file (collection mode only).
    /// Defaults to InvertedIndex.txt next to the collection
    #[arg(long, requires = "collection", conflicts_with = "no_dump_index")]
    dump_index: Option<PathBuf>,
    /// Do not write the index text file
    #[arg(long, default_value_t = false)]
    no_dump_index: bool,
    /// File that every query and its result ids are appended to
    #[arg(long, default_value = "QueryResult.txt")]
    log: PathBuf,
    /// Stemmer, must match the one the index was built with
    #[arg(long, default_value = "english")]
    stemmer: StemmerKind,
    /// NFKC-fold tokens after lowercasing
    #[arg(long, default_value_t = false)]
    unicode_fold: bool,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(std::io::stderr).init();
    let args = Args::parse();

    let source = match (args.collection, args.index_dir) {
        (Some(path), _) => {
            let dump = match (args.dump_index, args.no_dump_index) {
                (_, true) => IndexDump::Skip,
                (Some(at), false) => IndexDump::At(at),
                (None, false) => IndexDump::BesideCollection,
            };
            IndexSource::Collection { path, dump }
        }
        (None, Some(dir)) => IndexSource::Persisted(dir),
        (None, None) => unreachable!("clap requires one index source"),
    };
    let config = PipelineConfig { stemmer: args.stemmer, unicode_fold: args.unicode_fold };
    let evaluator = open_evaluator(&source, config)?;
    tracing::info!(num_terms = evaluator.index().len(), num_docs = evaluator.index().num_docs(), "index ready");

    let mut log = QueryLog::new(&args.log);
    let stdin = std::io::stdin();
    let stats = run_session(&evaluator, &mut log, stdin.lock(), std::io::stdout())?;
    tracing::info!(queries = stats.queries, unanswered = stats.unanswered, log = %log.path().display(), "session finished");
    Ok(())
}
