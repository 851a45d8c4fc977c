//! Parse error types.

use garden_ir::{Span, StoreError};

/// What went wrong while reading a form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("unexpected character `{0}`")]
    UnexpectedChar(String),
    #[error("unterminated or malformed string literal")]
    BadString,
    #[error("integer literal `{0}` does not fit in 64 bits")]
    IntOutOfRange(String),
    #[error("unexpected `{found}`, expected {expected}")]
    Unexpected {
        found: String,
        expected: &'static str,
    },
    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: &'static str },
    #[error("unclosed `{0}`")]
    Unclosed(&'static str),
    #[error("empty form `()`")]
    EmptyForm,
    #[error("the head of a form must be a symbol")]
    HeadNotSymbol,
    #[error("`{form}` expects {expected}")]
    MalformedForm {
        form: &'static str,
        expected: &'static str,
    },
    #[error("`def` is only allowed at top level")]
    NestedDef,
    #[error("map literal needs an even number of entries")]
    OddMap,
    #[error("`!` must follow an effect name")]
    EmptyEffect,
    #[error("`{0}` is reserved and cannot be bound")]
    ReservedBinder(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A parse error with the span it was found at.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
}

impl ParseError {
    #[cold]
    pub fn new(kind: ParseErrorKind, span: Span) -> Self {
        ParseError { kind, span }
    }

    /// Short label for the offending span, for diagnostic rendering.
    pub fn label(&self) -> &'static str {
        match self.kind {
            ParseErrorKind::UnexpectedChar(_)
            | ParseErrorKind::BadString
            | ParseErrorKind::IntOutOfRange(_) => "invalid token",
            ParseErrorKind::Unexpected { .. } | ParseErrorKind::UnexpectedEof { .. } => {
                "unexpected here"
            }
            ParseErrorKind::Unclosed(_) => "opened here",
            ParseErrorKind::EmptyForm
            | ParseErrorKind::HeadNotSymbol
            | ParseErrorKind::MalformedForm { .. }
            | ParseErrorKind::NestedDef
            | ParseErrorKind::OddMap
            | ParseErrorKind::EmptyEffect => "in this form",
            ParseErrorKind::ReservedBinder(_) => "reserved name",
            ParseErrorKind::Store(_) => "while interning this node",
        }
    }
}
