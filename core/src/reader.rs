//! Reader for `<DOC n>` ... `</DOC>` delimited collections.
//!
//! Every decimal digit on an opening line contributes to the id, so `<DOC 12>`,
//! `<DOC id="12">`, `<DOC1-2>` and `<DOC ١٢>` all name document 12. Other
//! numeric characters such as `²` are ignored. Body lines are joined with no
//! separator.

use crate::error::{Error, Result};
use crate::DocId;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

const OPEN_PREFIX: &str = "<DOC";
const CLOSE_LINE: &str = "</DOC>";

lazy_static! {
    static ref DECIMAL_DIGIT: Regex = Regex::new(r"^\p{Nd}$").expect("valid regex");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: DocId,
    pub text: String,
}

struct OpenDoc {
    id: DocId,
    line: usize,
    text: String,
}

/// Parses a whole collection. Documents come back in the order their ids were
/// first opened; a repeated id replaces the earlier body in place.
pub fn read_collection<R: BufRead>(reader: R) -> Result<Vec<Document>> {
    let mut docs: Vec<Document> = Vec::new();
    let mut positions: HashMap<DocId, usize> = HashMap::new();
    let mut current: Option<OpenDoc> = None;

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|e| Error::io(format!("reading collection line {line_no}"), e))?;
        let line = line.strip_suffix('\r').unwrap_or(&line);

        if line.starts_with(OPEN_PREFIX) {
            if let Some(open) = &current {
                return Err(Error::format(
                    line_no,
                    format!("document {} opened at line {} is not closed", open.id, open.line),
                ));
            }
            let id = parse_doc_id(line, line_no)?;
            current = Some(OpenDoc { id, line: line_no, text: String::new() });
        } else if line == CLOSE_LINE {
            let Some(open) = current.take() else {
                return Err(Error::format(line_no, "closing tag without an open document"));
            };
            tracing::debug!(doc_id = open.id, bytes = open.text.len(), "read document");
            match positions.get(&open.id) {
                Some(&pos) => {
                    tracing::warn!(doc_id = open.id, line = open.line, "duplicate document id, replacing earlier body");
                    docs[pos].text = open.text;
                }
                None => {
                    positions.insert(open.id, docs.len());
                    docs.push(Document { id: open.id, text: open.text });
                }
            }
        } else if let Some(open) = current.as_mut() {
            open.text.push_str(line);
        } else if !line.trim().is_empty() {
            tracing::debug!(line = line_no, "ignoring text outside a document");
        }
    }

    if let Some(open) = current {
        return Err(Error::format(open.line, format!("document {} is never closed", open.id)));
    }
    Ok(docs)
}

pub fn read_collection_file<P: AsRef<Path>>(path: P) -> Result<Vec<Document>> {
    let path = path.as_ref();
    let f = File::open(path).map_err(|e| Error::io(format!("opening {}", path.display()), e))?;
    read_collection(BufReader::new(f))
}

fn parse_doc_id(line: &str, line_no: usize) -> Result<DocId> {
    let digits: Vec<u32> = line.chars().filter_map(digit_value).collect();
    if digits.is_empty() {
        return Err(Error::format(line_no, "opening line has no document id"));
    }
    digits
        .iter()
        .try_fold(0 as DocId, |id, &d| id.checked_mul(10)?.checked_add(d))
        .ok_or_else(|| {
            let rendered: String = digits.iter().map(|d| d.to_string()).collect();
            Error::format(line_no, format!("document id {rendered} is out of range"))
        })
}

fn is_decimal_digit(c: char) -> bool {
    let mut buf = [0u8; 4];
    DECIMAL_DIGIT.is_match(c.encode_utf8(&mut buf))
}

/// Value of a decimal digit in any script. Every `Nd` set is ten consecutive
/// code points running from zero to nine.
fn digit_value(c: char) -> Option<u32> {
    if let Some(d) = c.to_digit(10) {
        return Some(d);
    }
    if !is_decimal_digit(c) {
        return None;
    }
    let mut start = c as u32;
    while let Some(prev) = start.checked_sub(1).and_then(char::from_u32) {
        if !is_decimal_digit(prev) {
            break;
        }
        start -= 1;
    }
    Some((c as u32 - start) % 10)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read(input: &str) -> Result<Vec<Document>> {
        read_collection(Cursor::new(input))
    }

    #[test]
    fn reads_documents_in_opening_order() {
        let docs = read("<DOC 2>\nThe dog\n sat\n</DOC>\n<DOC 1>\nThe cat sat\n</DOC>\n").unwrap();
        assert_eq!(docs, vec![
            Document { id: 2, text: "The dog sat".into() },
            Document { id: 1, text: "The cat sat".into() },
        ]);
    }

    #[test]
    fn id_is_every_digit_on_the_line() {
        let docs = read("<DOC id=\"1\" rev=\"2\">\nx\n</DOC>\n").unwrap();
        assert_eq!(docs[0].id, 12);
    }

    #[test]
    fn body_lines_join_without_separator() {
        let docs = read("<DOC 7>\nab\ncd\n</DOC>\n").unwrap();
        assert_eq!(docs[0].text, "abcd");
    }

    #[test]
    fn close_must_match_whole_line() {
        let docs = read("<DOC 3>\n</DOC> trailing\n</DOC>\n").unwrap();
        assert_eq!(docs[0].text, "</DOC> trailing");
    }

    #[test]
    fn empty_document_is_kept() {
        let docs = read("<DOC 4>\n</DOC>\n").unwrap();
        assert_eq!(docs, vec![Document { id: 4, text: String::new() }]);
    }

    #[test]
    fn tolerates_crlf() {
        let docs = read("<DOC 5>\r\nhello\r\n</DOC>\r\n").unwrap();
        assert_eq!(docs[0].text, "hello");
    }

    #[test]
    fn duplicate_id_replaces_body() {
        let docs = read("<DOC 1>\nold\n</DOC>\n<DOC 2>\nb\n</DOC>\n<DOC 1>\nnew\n</DOC>\n").unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0], Document { id: 1, text: "new".into() });
    }

    #[test]
    fn unterminated_document_is_format_error() {
        let err = read("<DOC 1>\nbody\n").unwrap_err();
        assert!(matches!(err, Error::Format { line: 1, .. }), "{err}");
    }

    #[test]
    fn missing_id_is_format_error() {
        let err = read("<DOC>\nbody\n</DOC>\n").unwrap_err();
        assert!(matches!(err, Error::Format { line: 1, .. }));
    }

    #[test]
    fn nested_open_is_format_error() {
        let err = read("<DOC 1>\n<DOC 2>\n</DOC>\n").unwrap_err();
        assert!(matches!(err, Error::Format { line: 2, .. }));
    }

    #[test]
    fn stray_close_is_format_error() {
        let err = read("</DOC>\n").unwrap_err();
        assert!(matches!(err, Error::Format { line: 1, .. }));
    }

    #[test]
    fn decimal_digits_from_other_scripts_count() {
        let docs = read("<DOC ١٢>\nx\n</DOC>\n<DOC １３>\ny\n</DOC>\n<DOC 𝟗>\nz\n</DOC>\n").unwrap();
        let ids: Vec<DocId> = docs.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![12, 13, 9]);
    }

    #[test]
    fn non_decimal_numerals_are_not_ids() {
        let err = read("<DOC ²½Ⅻ>\nbody\n</DOC>\n").unwrap_err();
        assert!(matches!(err, Error::Format { line: 1, .. }), "{err}");
        let docs = read("<DOC 3²>\nbody\n</DOC>\n").unwrap();
        assert_eq!(docs[0].id, 3);
    }

    #[test]
    fn overflowing_id_is_format_error() {
        let err = read("<DOC 99999999999>\n</DOC>\n").unwrap_err();
        assert!(matches!(err, Error::Format { .. }));
    }
}
