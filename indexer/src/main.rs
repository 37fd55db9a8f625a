use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use conjunct_core::persist::{save_index_file, save_meta, save_snapshot, IndexPaths, MetaFile};
use conjunct_core::{read_collection_file, IndexBuilder, Pipeline, PipelineConfig, StemmerKind};
use tracing_subscriber::{EnvFilter, fmt};

use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build a boolean inverted index from a <DOC> collection", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a collection and write InvertedIndex.txt, index.bin and meta.json
    Build {
        /// Collection file
        #[arg(long)]
        collection: PathBuf,
        /// Output index directory
        #[arg(long)]
        output: PathBuf,
        /// Stemmer applied to every token (english or none)
        #[arg(long, default_value = "english")]
        stemmer: StemmerKind,
        /// NFKC-fold tokens after lowercasing
        #[arg(long, default_value_t = false)]
        unicode_fold: bool,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { collection, output, stemmer, unicode_fold } => {
            build_index(&collection, &output, PipelineConfig { stemmer, unicode_fold })
        }
    }
}

fn build_index(collection: &Path, output: &Path, config: PipelineConfig) -> Result<()> {
    // a malformed collection aborts before anything is written
    let docs = read_collection_file(collection)?;
    tracing::info!(num_docs = docs.len(), collection = %collection.display(), stemmer = %config.stemmer, "read collection");

    let pipeline = Pipeline::new(config);
    let index = IndexBuilder::from_documents(&docs, &pipeline);

    let out_paths = IndexPaths::new(output);
    let meta = MetaFile::describe(&index, &pipeline);
    let artifacts = [
        ("index file", save_index_file(&out_paths, &index)),
        ("snapshot", save_snapshot(&out_paths, &index)),
        ("meta", save_meta(&out_paths, &meta)),
    ];

    let mut failed = 0;
    for (name, outcome) in artifacts {
        if let Err(e) = outcome {
            tracing::error!(artifact = name, error = %e, "failed to persist");
            failed += 1;
        }
    }
    if failed > 0 {
        bail!("{failed} index artifact(s) could not be written to {}", output.display());
    }

    tracing::info!(output = %output.display(), num_terms = index.len(), "index build complete");
    Ok(())
}
