//! Garden reader.
//!
//! Turns source text into nodes in a [`NodeStore`]. The reader is the only
//! producer of nodes in normal use; the evaluator consumes them by id.
//!
//! ```text
//! source ──tokenize──▶ lexemes ──Reader──▶ [Result<NodeId, ParseError>]
//! ```
//!
//! Re-reading edited source re-interns every form, but untouched subtrees
//! hash to the ids they had before, so the evaluator's cache still applies.

mod cursor;
mod error;
pub mod lexer;
mod reader;

use garden_ir::{NodeId, NodeStore};

pub use error::{ParseError, ParseErrorKind};

/// Result of reading a source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOutput {
    /// One entry per top-level datum, in source order.
    pub forms: Vec<Result<NodeId, ParseError>>,
}

impl ParseOutput {
    /// Ids of the forms that read successfully, in order.
    pub fn roots(&self) -> Vec<NodeId> {
        self.forms.iter().filter_map(|f| f.as_ref().ok().copied()).collect()
    }

    pub fn errors(&self) -> impl Iterator<Item = &ParseError> {
        self.forms.iter().filter_map(|f| f.as_ref().err())
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }
}

/// Read every top-level datum of `source` into `store`.
#[tracing::instrument(level = "debug", skip_all, fields(len = source.len()))]
pub fn parse(source: &str, store: &NodeStore) -> ParseOutput {
    let lexemes = lexer::tokenize(source);
    let cursor = cursor::Cursor::new(lexemes, source.len());
    let forms = reader::Reader::new(cursor, store).read_all();
    tracing::debug!(forms = forms.len(), "read source");
    ParseOutput { forms }
}

/// Read a single expression, failing if the source holds anything else.
pub fn parse_expr(source: &str, store: &NodeStore) -> Result<NodeId, ParseError> {
    let mut output = parse(source, store);
    match output.forms.len() {
        1 => output.forms.remove(0),
        0 => Err(ParseError::new(
            ParseErrorKind::UnexpectedEof {
                expected: "an expression",
            },
            garden_ir::Span::DUMMY,
        )),
        _ => {
            let extra = output
                .forms
                .get(1)
                .and_then(|f| match f {
                    Ok(id) => store.span(*id),
                    Err(e) => Some(e.span),
                })
                .unwrap_or(garden_ir::Span::DUMMY);
            Err(ParseError::new(
                ParseErrorKind::MalformedForm {
                    form: "expression",
                    expected: "exactly one datum",
                },
                extra,
            ))
        }
    }
}
