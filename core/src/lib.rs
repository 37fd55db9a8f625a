//! Boolean AND retrieval over a small `<DOC>` collection.
//!
//! Indexing and querying share one [`Pipeline`]; terms only match when both
//! sides run the same configuration.

pub mod error;
pub mod index;
pub mod persist;
pub mod query;
pub mod reader;
pub mod tokenizer;

pub use error::{Error, Result};
pub use index::{DocId, IndexBuilder, InvertedIndex, PostingList};
pub use query::{intersect, Evaluation, QueryEvaluator, ResultSink};
pub use reader::{read_collection, read_collection_file, Document};
pub use tokenizer::{Pipeline, PipelineConfig, Stem, StemmerKind};
