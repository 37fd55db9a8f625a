use crate::index::{DocId, InvertedIndex, PostingList};
use crate::query::ResultSink;
use crate::tokenizer::{Pipeline, PipelineConfig};
use anyhow::{bail, ensure, Context, Result};
use bincode;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

pub const INDEX_HEADER: &str = "word,docFrequency:docId ";
pub const META_VERSION: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: u32,
    pub created_at: String,
    pub version: u32,
    pub pipeline: PipelineConfig,
    /// `Stem::name` of the stemmer that produced the terms.
    pub stemmer_name: String,
}

impl MetaFile {
    pub fn describe(index: &InvertedIndex, pipeline: &Pipeline) -> Self {
        Self {
            num_docs: index.num_docs(),
            num_terms: index.len() as u32,
            created_at: time::OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_else(|_| "".into()),
            version: META_VERSION,
            pipeline: pipeline.config(),
            stemmer_name: pipeline.stemmer_name().to_string(),
        }
    }

    /// Refuses to pair an index with a query pipeline that produces different terms.
    pub fn ensure_pipeline(&self, query_side: &Pipeline) -> Result<()> {
        if self.pipeline != query_side.config() {
            bail!(
                "index was built with pipeline {:?} but queries would use {:?}",
                self.pipeline,
                query_side.config()
            );
        }
        if self.stemmer_name != query_side.stemmer_name() {
            bail!(
                "index was built with stemmer {:?} but queries would use {:?}",
                self.stemmer_name,
                query_side.stemmer_name()
            );
        }
        Ok(())
    }
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn index_file(&self) -> PathBuf { self.root.join("InvertedIndex.txt") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
    pub fn snapshot(&self) -> PathBuf { self.root.join("index.bin") }
}

/// Writes the text dump: a header line, then `term,df:id id ... ` per term.
pub fn write_index<W: Write>(index: &InvertedIndex, w: &mut W) -> io::Result<()> {
    writeln!(w, "{INDEX_HEADER}")?;
    for (term, plist) in index.iter() {
        write!(w, "{term},{}:", plist.len())?;
        for doc_id in plist {
            write!(w, "{doc_id} ")?;
        }
        writeln!(w)?;
    }
    Ok(())
}

pub fn save_index_file_to(path: &Path, index: &InvertedIndex) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        create_dir_all(dir)?;
    }
    let f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut w = BufWriter::new(f);
    write_index(index, &mut w).with_context(|| format!("writing {}", path.display()))?;
    w.flush()?;
    Ok(())
}

pub fn save_index_file(paths: &IndexPaths, index: &InvertedIndex) -> Result<()> {
    save_index_file_to(&paths.index_file(), index)
}

/// Parses the text dump back. The dump does not record documents without
/// terms, so `num_docs` is the number of distinct ids seen.
pub fn read_index<R: BufRead>(reader: R) -> Result<InvertedIndex> {
    let mut lines = reader.lines();
    match lines.next() {
        Some(header) => {
            let header = header?;
            ensure!(header == INDEX_HEADER, "unexpected index header {header:?}");
        }
        None => bail!("index file is empty"),
    }

    let mut postings: BTreeMap<String, PostingList> = BTreeMap::new();
    let mut seen: BTreeSet<DocId> = BTreeSet::new();
    for (idx, line) in lines.enumerate() {
        let line_no = idx + 2;
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let (term, rest) = line.split_once(',').with_context(|| format!("line {line_no}: missing ','"))?;
        let (df, ids) = rest.split_once(':').with_context(|| format!("line {line_no}: missing ':'"))?;
        let df: usize = df.parse().with_context(|| format!("line {line_no}: bad document frequency {df:?}"))?;
        let plist = ids
            .split_whitespace()
            .map(|id| id.parse::<DocId>())
            .collect::<Result<PostingList, _>>()
            .with_context(|| format!("line {line_no}: bad document id"))?;
        ensure!(plist.len() == df, "line {line_no}: frequency {df} but {} ids", plist.len());
        seen.extend(plist.iter().copied());
        ensure!(postings.insert(term.to_string(), plist).is_none(), "line {line_no}: duplicate term {term:?}");
    }
    Ok(InvertedIndex::from_postings(postings, seen.len() as u32)?)
}

pub fn load_index_file(paths: &IndexPaths) -> Result<InvertedIndex> {
    let path = paths.index_file();
    let f = File::open(&path).with_context(|| format!("opening {}", path.display()))?;
    read_index(BufReader::new(f))
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta()).with_context(|| format!("opening {}", paths.meta().display()))?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

pub fn save_snapshot(paths: &IndexPaths, index: &InvertedIndex) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.snapshot())?;
    let bytes = bincode::serialize(index)?;
    f.write_all(&bytes)?;
    Ok(())
}

pub fn load_snapshot(paths: &IndexPaths) -> Result<InvertedIndex> {
    let mut f = File::open(paths.snapshot())?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let index: InvertedIndex = bincode::deserialize(&buf)?;
    index.validate()?;
    Ok(index)
}

/// Loads a persisted index for serving queries built with `pipeline`.
/// Prefers the binary snapshot and falls back to the text dump.
pub fn load_index(paths: &IndexPaths, pipeline: &Pipeline) -> Result<InvertedIndex> {
    let meta = load_meta(paths)?;
    meta.ensure_pipeline(pipeline)?;
    if paths.snapshot().exists() {
        return load_snapshot(paths);
    }
    tracing::info!(path = %paths.index_file().display(), "no snapshot, reading text index");
    load_index_file(paths)
}

/// Appends one entry per query: the query line, `id,` per hit, then a blank line.
pub struct QueryLog {
    path: PathBuf,
}

impl QueryLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path { &self.path }
}

pub fn format_log_entry(query: &str, result: &[DocId]) -> String {
    let mut entry = String::with_capacity(query.len() + result.len() * 4 + 3);
    entry.push_str(query);
    entry.push('\n');
    for doc_id in result {
        entry.push_str(&doc_id.to_string());
        entry.push(',');
    }
    entry.push_str("\n\n");
    entry
}

impl ResultSink for QueryLog {
    fn record(&mut self, query: &str, result: &[DocId]) -> io::Result<()> {
        let f = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let mut w = BufWriter::new(f);
        w.write_all(format_log_entry(query, result).as_bytes())?;
        w.flush()
    }
}
