use anyhow::{Context, Result};
use conjunct_core::persist::{load_index, save_index_file_to, IndexPaths};
use conjunct_core::{read_collection_file, Evaluation, IndexBuilder, Pipeline, PipelineConfig, QueryEvaluator, ResultSink};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DEFAULT_DUMP_NAME: &str = "InvertedIndex.txt";

/// Where the evaluator gets its index from.
#[derive(Debug, Clone)]
pub enum IndexSource {
    /// Build from a `<DOC>` collection and write the index text file.
    Collection { path: PathBuf, dump: IndexDump },
    /// Load artifacts written by the indexer.
    Persisted(PathBuf),
}

/// Destination of the index text file written after a collection build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum IndexDump {
    /// `InvertedIndex.txt` in the collection's directory.
    #[default]
    BesideCollection,
    At(PathBuf),
    Skip,
}

impl IndexDump {
    pub fn resolve(&self, collection: &Path) -> Option<PathBuf> {
        match self {
            IndexDump::BesideCollection => {
                Some(collection.parent().unwrap_or(Path::new("")).join(DEFAULT_DUMP_NAME))
            }
            IndexDump::At(path) => Some(path.clone()),
            IndexDump::Skip => None,
        }
    }
}

pub fn open_evaluator(source: &IndexSource, config: PipelineConfig) -> Result<QueryEvaluator> {
    let pipeline = Arc::new(Pipeline::new(config));
    let index = match source {
        IndexSource::Collection { path, dump } => {
            let docs = read_collection_file(path)
                .with_context(|| format!("indexing collection {}", path.display()))?;
            let index = IndexBuilder::from_documents(&docs, &pipeline);
            if let Some(dump) = dump.resolve(path) {
                // the in-memory index is still good if the dump cannot be written
                match save_index_file_to(&dump, &index) {
                    Ok(()) => tracing::info!(path = %dump.display(), "wrote index file"),
                    Err(e) => tracing::warn!(path = %dump.display(), error = %e, "could not write index file"),
                }
            }
            index
        }
        IndexSource::Persisted(dir) => load_index(&IndexPaths::new(dir), &pipeline)
            .with_context(|| format!("loading index from {}", dir.display()))?,
    };
    Ok(QueryEvaluator::new(index, pipeline))
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub queries: usize,
    pub unanswered: usize,
}

/// Prompt/answer loop: one query line, then a continuation line where a
/// case-insensitive `yes` ends the session. End of input also ends it.
pub fn run_session<S, R, W>(evaluator: &QueryEvaluator, sink: &mut S, mut input: R, mut output: W) -> io::Result<SessionStats>
where
    S: ResultSink + ?Sized,
    R: BufRead,
    W: Write,
{
    let mut stats = SessionStats::default();
    loop {
        writeln!(output, "Enter query: ")?;
        output.flush()?;
        let Some(query) = next_line(&mut input)? else { break };

        let evaluation = evaluator.evaluate_and_record(&query, sink);
        stats.queries += 1;
        if !evaluation.is_clean() {
            stats.unanswered += 1;
        }
        report(&evaluation, &mut output)?;

        writeln!(output, "Exit? : (yes or no)")?;
        output.flush()?;
        let Some(answer) = next_line(&mut input)? else { break };
        if answer.trim().eq_ignore_ascii_case("yes") {
            break;
        }
    }
    Ok(stats)
}

fn next_line<R: BufRead>(input: &mut R) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    let trimmed = line.trim_end_matches(&['\n', '\r'][..]).len();
    line.truncate(trimmed);
    Ok(Some(line))
}

fn report<W: Write>(evaluation: &Evaluation, output: &mut W) -> io::Result<()> {
    for diagnostic in &evaluation.diagnostics {
        writeln!(output, "warning: {diagnostic}")?;
    }
    if evaluation.result.is_empty() {
        writeln!(output, "No matching documents.")
    } else {
        let ids: Vec<String> = evaluation.result.iter().map(|id| id.to_string()).collect();
        writeln!(output, "Matching documents: {}", ids.join(", "))
    }
}
