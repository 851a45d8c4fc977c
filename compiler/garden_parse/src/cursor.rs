//! Cursor over the lexeme stream.

use garden_ir::Span;

use crate::lexer::{Lexeme, Token};

pub struct Cursor {
    lexemes: Vec<Lexeme>,
    pos: usize,
    /// Zero-width span at the end of the source.
    eof: Span,
}

impl Cursor {
    pub fn new(lexemes: Vec<Lexeme>, source_len: usize) -> Self {
        let end = u32::try_from(source_len).unwrap_or(u32::MAX);
        Cursor {
            lexemes,
            pos: 0,
            eof: Span::new(end, end),
        }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn at_end(&self) -> bool {
        self.pos >= self.lexemes.len()
    }

    #[inline]
    pub fn eof_span(&self) -> Span {
        self.eof
    }

    pub fn peek(&self) -> Option<&Lexeme> {
        self.lexemes.get(self.pos)
    }

    /// True if the next lexeme is exactly `token`.
    pub fn peek_is(&self, token: &Token) -> bool {
        matches!(self.peek(), Some(Lexeme { token: Ok(t), .. }) if t == token)
    }

    pub fn next_lexeme(&mut self) -> Option<Lexeme> {
        let lexeme = self.lexemes.get(self.pos).cloned();
        if lexeme.is_some() {
            self.pos += 1;
        }
        lexeme
    }

    /// Rewind to `start` and skip past one whole datum.
    ///
    /// An opener skips to its matching closer (or the end of input); anything
    /// else skips a single lexeme. Used to resume after a failed top-level form.
    pub fn skip_datum_from(&mut self, start: usize) {
        self.pos = start;
        let mut depth = 0usize;
        while let Some(lexeme) = self.next_lexeme() {
            match &lexeme.token {
                Ok(t) if t.is_opener() => depth += 1,
                Ok(t) if t.is_closer() => depth = depth.saturating_sub(1),
                _ => {}
            }
            if depth == 0 {
                break;
            }
        }
    }
}
