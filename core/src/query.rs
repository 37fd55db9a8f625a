use crate::error::{Error, Result};
use crate::index::{DocId, InvertedIndex};
use crate::tokenizer::Pipeline;
use std::sync::Arc;

/// Sorted two-pointer merge of two ascending posting lists.
pub fn intersect(a: &[DocId], b: &[DocId]) -> Vec<DocId> {
    let mut result = Vec::new();
    let mut i = 0;
    let mut j = 0;

    while i < a.len() && j < b.len() {
        let doc_a = a[i];
        let doc_b = b[j];
        if doc_a == doc_b {
            result.push(doc_a);
            i += 1;
            j += 1;
        } else if doc_a < doc_b {
            i += 1;
        } else {
            j += 1;
        }
    }
    result
}

/// Outcome of one query. `result` is empty whenever `diagnostics` holds an
/// arity or lookup error.
#[derive(Debug)]
pub struct Evaluation {
    pub query: String,
    pub terms: Vec<String>,
    pub result: Vec<DocId>,
    pub diagnostics: Vec<Error>,
}

impl Evaluation {
    pub fn is_clean(&self) -> bool { self.diagnostics.is_empty() }
}

/// Receives every evaluated query together with its result ids.
pub trait ResultSink {
    fn record(&mut self, query: &str, result: &[DocId]) -> std::io::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedQuery {
    pub query: String,
    pub result: Vec<DocId>,
}

impl ResultSink for Vec<RecordedQuery> {
    fn record(&mut self, query: &str, result: &[DocId]) -> std::io::Result<()> {
        self.push(RecordedQuery { query: query.to_string(), result: result.to_vec() });
        Ok(())
    }
}

/// Answers `term AND term` queries against an immutable index.
pub struct QueryEvaluator {
    index: InvertedIndex,
    pipeline: Arc<Pipeline>,
}

impl QueryEvaluator {
    pub fn new(index: InvertedIndex, pipeline: Arc<Pipeline>) -> Self {
        Self { index, pipeline }
    }

    pub fn index(&self) -> &InvertedIndex { &self.index }

    pub fn pipeline(&self) -> &Pipeline { &self.pipeline }

    pub fn evaluate(&self, query: &str) -> Evaluation {
        let terms = self.pipeline.process(query);
        let mut evaluation = Evaluation {
            query: query.to_string(),
            terms,
            result: Vec::new(),
            diagnostics: Vec::new(),
        };
        match self.resolve(&evaluation.terms) {
            Ok((a, b)) => {
                evaluation.result = intersect(a, b);
                tracing::debug!(query, hits = evaluation.result.len(), "evaluated query");
            }
            Err(err) => {
                tracing::info!(query, error = %err, "query not answered");
                evaluation.diagnostics.push(err);
            }
        }
        evaluation
    }

    /// Evaluates and hands the result to `sink`. A sink failure becomes an
    /// `Error::Io` diagnostic; the evaluation itself is unaffected.
    pub fn evaluate_and_record<S: ResultSink + ?Sized>(&self, query: &str, sink: &mut S) -> Evaluation {
        let mut evaluation = self.evaluate(query);
        if let Err(e) = sink.record(&evaluation.query, &evaluation.result) {
            tracing::warn!(error = %e, "failed to record query result");
            evaluation.diagnostics.push(Error::io("recording query result", e));
        }
        evaluation
    }

    /// Exactly two processed terms are required, but they need not differ:
    /// `dog dogs` resolves to `dog` twice and answers with `dog`'s postings.
    fn resolve(&self, terms: &[String]) -> Result<(&[DocId], &[DocId])> {
        let [first, second] = terms else {
            return Err(Error::Arity { found: terms.len(), terms: terms.to_vec() });
        };
        match (self.index.get(first), self.index.get(second)) {
            (Some(a), Some(b)) => Ok((a, b)),
            (a, b) => {
                let mut missing = Vec::new();
                if a.is_none() {
                    missing.push(first.clone());
                }
                if b.is_none() && !missing.contains(second) {
                    missing.push(second.clone());
                }
                Err(Error::TermNotFound { missing })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexBuilder;

    fn evaluator() -> QueryEvaluator {
        let pipeline = Arc::new(Pipeline::default());
        let mut b = IndexBuilder::new();
        b.add_document(1, &pipeline.process("The cat sat"));
        b.add_document(2, &pipeline.process("The dog sat"));
        b.add_document(3, &pipeline.process("A cat and a dog"));
        QueryEvaluator::new(b.build(), pipeline)
    }

    #[test]
    fn intersect_examples() {
        assert_eq!(intersect(&[1, 2, 3], &[2, 3, 4]), vec![2, 3]);
        assert_eq!(intersect(&[], &[1, 2]), Vec::<DocId>::new());
        assert_eq!(intersect(&[1, 2], &[]), Vec::<DocId>::new());
        assert_eq!(intersect(&[1, 5, 9], &[2, 6, 10]), Vec::<DocId>::new());
    }

    #[test]
    fn intersect_is_order_independent() {
        let a = [1, 4, 7, 8, 20, 31];
        let b = [4, 8, 9, 31];
        assert_eq!(intersect(&a, &b), vec![4, 8, 31]);
        assert_eq!(intersect(&b, &a), intersect(&a, &b));
    }

    #[test]
    fn and_query_intersects() {
        let ev = evaluator().evaluate("cat AND sat");
        assert!(ev.is_clean());
        assert_eq!(ev.terms, vec!["cat", "sat"]);
        assert_eq!(ev.result, vec![1]);
    }

    #[test]
    fn same_term_twice_returns_its_postings() {
        let ev = evaluator().evaluate("dog dogs");
        assert_eq!(ev.result, vec![2, 3]);
    }

    #[test]
    fn single_meaningful_term_is_arity_error() {
        let ev = evaluator().evaluate("the cat");
        assert!(ev.result.is_empty());
        assert!(matches!(&ev.diagnostics[..], [Error::Arity { found: 1, .. }]));
    }

    #[test]
    fn three_terms_is_arity_error() {
        let ev = evaluator().evaluate("cat dog sat");
        assert!(matches!(&ev.diagnostics[..], [Error::Arity { found: 3, .. }]));
    }

    #[test]
    fn empty_query_is_arity_error() {
        let ev = evaluator().evaluate("   ");
        assert!(matches!(&ev.diagnostics[..], [Error::Arity { found: 0, .. }]));
    }

    #[test]
    fn missing_terms_are_named() {
        let ev = evaluator().evaluate("zebra and yak");
        assert!(ev.result.is_empty());
        match &ev.diagnostics[..] {
            [Error::TermNotFound { missing }] => assert_eq!(missing, &vec!["zebra".to_string(), "yak".to_string()]),
            other => panic!("unexpected diagnostics: {other:?}"),
        }
    }

    #[test]
    fn repeated_missing_term_named_once() {
        let ev = evaluator().evaluate("zebra zebra");
        match &ev.diagnostics[..] {
            [Error::TermNotFound { missing }] => assert_eq!(missing, &vec!["zebra".to_string()]),
            other => panic!("unexpected diagnostics: {other:?}"),
        }
    }

    #[test]
    fn every_evaluation_is_recorded() {
        let ev = evaluator();
        let mut sink: Vec<RecordedQuery> = Vec::new();
        ev.evaluate_and_record("cat AND dog", &mut sink);
        ev.evaluate_and_record("cat", &mut sink);
        assert_eq!(sink, vec![
            RecordedQuery { query: "cat AND dog".into(), result: vec![3] },
            RecordedQuery { query: "cat".into(), result: vec![] },
        ]);
    }

    struct FailingSink;

    impl ResultSink for FailingSink {
        fn record(&mut self, _query: &str, _result: &[DocId]) -> std::io::Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"))
        }
    }

    #[test]
    fn sink_failure_is_a_diagnostic() {
        let ev = evaluator().evaluate_and_record("cat sat", &mut FailingSink);
        assert_eq!(ev.result, vec![1]);
        assert!(matches!(&ev.diagnostics[..], [Error::Io { .. }]));
    }
}
