use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)[\p{L}\p{Nd}]+").expect("valid regex");
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &["the", "is", "at", "of", "on", "and", "a"];
        words.iter().copied().collect()
    };
}

pub fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

/// Maps a normalized token to its canonical stem.
///
/// Indexing and querying must go through the same implementation, otherwise
/// index keys and query terms silently stop matching.
pub trait Stem: Send + Sync {
    fn stem<'a>(&self, token: &'a str) -> Cow<'a, str>;

    fn name(&self) -> &str;
}

/// Snowball stemmer from `rust-stemmers`.
pub struct SnowballStemmer {
    inner: Stemmer,
    name: &'static str,
}

impl SnowballStemmer {
    pub fn english() -> Self {
        Self { inner: Stemmer::create(Algorithm::English), name: "english" }
    }
}

impl Stem for SnowballStemmer {
    fn stem<'a>(&self, token: &'a str) -> Cow<'a, str> { self.inner.stem(token) }

    fn name(&self) -> &str { self.name }
}

/// Leaves tokens untouched.
pub struct NoopStemmer;

impl Stem for NoopStemmer {
    fn stem<'a>(&self, token: &'a str) -> Cow<'a, str> { Cow::Borrowed(token) }

    fn name(&self) -> &str { "none" }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StemmerKind {
    #[default]
    English,
    None,
}

impl StemmerKind {
    pub fn create(self) -> Box<dyn Stem> {
        match self {
            StemmerKind::English => Box::new(SnowballStemmer::english()),
            StemmerKind::None => Box::new(NoopStemmer),
        }
    }
}

impl FromStr for StemmerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "english" | "porter2" => Ok(StemmerKind::English),
            "none" => Ok(StemmerKind::None),
            other => Err(format!("unknown stemmer {other:?} (expected english or none)")),
        }
    }
}

impl fmt::Display for StemmerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StemmerKind::English => f.write_str("english"),
            StemmerKind::None => f.write_str("none"),
        }
    }
}

/// Everything that determines the pipeline's output. Recorded next to a
/// persisted index so a mismatched query side can be refused at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub stemmer: StemmerKind,
    /// Apply NFKC compatibility folding to each token after lowercasing.
    #[serde(default)]
    pub unicode_fold: bool,
}

/// tokenize -> normalize -> stem -> stopword filter.
pub struct Pipeline {
    stemmer: Box<dyn Stem>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { stemmer: config.stemmer.create(), config }
    }

    /// Uses a custom stemmer. `config.stemmer` is kept only as a label.
    pub fn with_stemmer(config: PipelineConfig, stemmer: Box<dyn Stem>) -> Self {
        Self { stemmer, config }
    }

    pub fn config(&self) -> PipelineConfig { self.config }

    pub fn stemmer_name(&self) -> &str { self.stemmer.name() }

    pub fn process(&self, text: &str) -> Vec<String> {
        let tokens = tokenize(text);
        let normalized = normalize(&tokens, self.config.unicode_fold);
        normalized
            .iter()
            .map(|token| self.stemmer.stem(token).into_owned())
            .filter(|stem| !is_stopword(stem))
            .collect()
    }
}

impl Default for Pipeline {
    fn default() -> Self { Self::new(PipelineConfig::default()) }
}

/// Maximal runs of letters and decimal digits, case preserved. Other numeric
/// characters such as `²` or `½` separate tokens.
pub fn tokenize(text: &str) -> Vec<&str> {
    RE.find_iter(text).map(|m| m.as_str()).collect()
}

pub fn normalize(tokens: &[&str], unicode_fold: bool) -> Vec<String> {
    tokens
        .iter()
        .map(|token| {
            let lower = token.to_lowercase();
            if unicode_fold { lower.nfkc().collect() } else { lower }
        })
        .collect()
}
