use crate::error::{Error, Result};
use crate::reader::Document;
use crate::tokenizer::Pipeline;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

pub type DocId = u32;
/// Ascending, duplicate-free document ids.
pub type PostingList = Vec<DocId>;

/// Term -> posting list. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvertedIndex {
    postings: BTreeMap<String, PostingList>, // key order drives the dump order
    num_docs: u32,
}

impl InvertedIndex {
    /// Wraps already-built postings, checking the ordering invariant.
    pub fn from_postings(postings: BTreeMap<String, PostingList>, num_docs: u32) -> Result<Self> {
        let index = Self { postings, num_docs };
        index.validate()?;
        Ok(index)
    }

    pub fn get(&self, term: &str) -> Option<&[DocId]> {
        self.postings.get(term).map(Vec::as_slice)
    }

    pub fn contains(&self, term: &str) -> bool { self.postings.contains_key(term) }

    pub fn document_frequency(&self, term: &str) -> usize {
        self.postings.get(term).map_or(0, Vec::len)
    }

    /// Number of distinct terms.
    pub fn len(&self) -> usize { self.postings.len() }

    pub fn is_empty(&self) -> bool { self.postings.is_empty() }

    /// Distinct document ids that went into the build, including ones with no terms.
    pub fn num_docs(&self) -> u32 { self.num_docs }

    /// Terms in lexicographic order with their postings.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[DocId])> + '_ {
        self.postings.iter().map(|(t, p)| (t.as_str(), p.as_slice()))
    }

    pub fn validate(&self) -> Result<()> {
        for (term, plist) in &self.postings {
            if plist.is_empty() || plist.windows(2).any(|w| w[0] >= w[1]) {
                return Err(Error::InvalidPostings { term: term.clone() });
            }
        }
        Ok(())
    }
}

/// Accumulates per-document terms into an [`InvertedIndex`].
///
/// Feeding documents in ascending id order keeps every posting list sorted by
/// construction. Out-of-order input is tolerated and repaired in [`build`](Self::build).
#[derive(Debug, Default)]
pub struct IndexBuilder {
    postings: BTreeMap<String, PostingList>,
    doc_ids: HashSet<DocId>,
    last_doc: Option<DocId>,
    out_of_order: bool,
}

impl IndexBuilder {
    pub fn new() -> Self { Self::default() }

    pub fn add_document<S: AsRef<str>>(&mut self, doc_id: DocId, terms: &[S]) {
        if self.last_doc.is_some_and(|last| doc_id < last) {
            self.out_of_order = true;
        }
        self.last_doc = Some(doc_id);
        self.doc_ids.insert(doc_id);

        let distinct: HashSet<&str> = terms.iter().map(|t| t.as_ref()).collect();
        for term in distinct {
            match self.postings.get_mut(term) {
                Some(plist) => {
                    if plist.last() != Some(&doc_id) {
                        plist.push(doc_id);
                    }
                }
                None => {
                    self.postings.insert(term.to_string(), vec![doc_id]);
                }
            }
        }
    }

    pub fn build(mut self) -> InvertedIndex {
        if self.out_of_order {
            tracing::debug!("documents arrived out of id order, sorting posting lists");
            for plist in self.postings.values_mut() {
                plist.sort_unstable();
                plist.dedup();
            }
        }
        InvertedIndex { postings: self.postings, num_docs: self.doc_ids.len() as u32 }
    }

    /// Runs every document through `pipeline` in ascending id order.
    pub fn from_documents(documents: &[Document], pipeline: &Pipeline) -> InvertedIndex {
        let mut ordered: Vec<&Document> = documents.iter().collect();
        ordered.sort_by_key(|d| d.id);

        let mut builder = Self::new();
        for doc in ordered {
            let terms = pipeline.process(&doc.text);
            tracing::debug!(doc_id = doc.id, terms = terms.len(), "processed document");
            builder.add_document(doc.id, &terms);
        }
        let index = builder.build();
        tracing::info!(num_docs = index.num_docs(), num_terms = index.len(), "built inverted index");
        index
    }
}
