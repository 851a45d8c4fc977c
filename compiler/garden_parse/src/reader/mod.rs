//! Reader: lexemes to interned nodes.
//!
//! Each top-level datum is read independently. A malformed datum yields a
//! [`ParseError`] for that slot only, and reading resumes at the next datum.
//!
//! Surface forms:
//!
//! ```text
//! (def name expr)          top-level declaration
//! (let name value body)    local binding
//! (if cond then else)
//! (recover expr fallback)
//! (+ a b ...)              operators: + - * / % = != < <= > >= and or not
//! (fs.read! arg ...)       effect call: trailing `!`
//! (str.upper arg ...)      builtin call
//! [a b] #{a b} {k v}       list, set, map
//! ```

use garden_ir::{Literal, Name, NodeId, NodeKind, NodeStore, Operator, Span};
use garden_stack::ensure_sufficient_stack;

use crate::cursor::Cursor;
use crate::error::{ParseError, ParseErrorKind};
use crate::lexer::{Lexeme, Token};

/// Where a datum appears.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Position {
    TopLevel,
    Nested,
}

/// Names that cannot be bound by `def` or `let`.
const RESERVED: [&str; 4] = ["def", "let", "if", "recover"];

pub struct Reader<'a> {
    cursor: Cursor,
    store: &'a NodeStore,
}

impl<'a> Reader<'a> {
    pub fn new(cursor: Cursor, store: &'a NodeStore) -> Self {
        Reader { cursor, store }
    }

    /// Read every top-level datum, recovering after each failure.
    pub fn read_all(mut self) -> Vec<Result<NodeId, ParseError>> {
        let mut forms = Vec::new();
        while !self.cursor.at_end() {
            let start = self.cursor.position();
            match self.read_expr(Position::TopLevel) {
                Ok(id) => forms.push(Ok(id)),
                Err(error) => {
                    tracing::debug!(%error, span = %error.span, "skipping malformed form");
                    self.cursor.skip_datum_from(start);
                    forms.push(Err(error));
                }
            }
        }
        forms
    }

    fn intern(&self, kind: NodeKind, children: &[NodeId], span: Span) -> Result<NodeId, ParseError> {
        self.store
            .intern(kind, children, span)
            .map_err(|e| ParseError::new(e.into(), span))
    }

    fn read_expr(&mut self, position: Position) -> Result<NodeId, ParseError> {
        ensure_sufficient_stack(|| {
            let Some(Lexeme { token, span }) = self.cursor.next_lexeme() else {
                return Err(ParseError::new(
                    ParseErrorKind::UnexpectedEof {
                        expected: "an expression",
                    },
                    self.cursor.eof_span(),
                ));
            };
            let token = token.map_err(|kind| ParseError::new(kind, span))?;

            match token {
                Token::LParen => self.read_form(span, position),
                Token::LBracket => self.read_collection(NodeKind::List, span),
                Token::HashBrace => self.read_collection(NodeKind::Set, span),
                Token::LBrace => self.read_collection(NodeKind::Map, span),
                Token::Int(v) => self.intern(NodeKind::Literal(Literal::Int(v)), &[], span),
                Token::Float(v) => self.intern(NodeKind::Literal(Literal::float(v)), &[], span),
                Token::True => self.intern(NodeKind::Literal(Literal::Bool(true)), &[], span),
                Token::False => self.intern(NodeKind::Literal(Literal::Bool(false)), &[], span),
                Token::Str(s) => {
                    let text = self.store.name(&s);
                    self.intern(NodeKind::Literal(Literal::Text(text)), &[], span)
                }
                Token::Symbol(s) => self.read_symbol(&s, span),
                Token::RParen | Token::RBracket | Token::RBrace | Token::Comment => Err(
                    ParseError::new(
                        ParseErrorKind::Unexpected {
                            found: token.describe(),
                            expected: "an expression",
                        },
                        span,
                    ),
                ),
            }
        })
    }

    /// Symbols that spell a signed number are numeric literals.
    fn read_symbol(&self, s: &str, span: Span) -> Result<NodeId, ParseError> {
        let signed_number = matches!(s.as_bytes(), [b'-' | b'+', d, ..] if d.is_ascii_digit());
        if signed_number {
            if let Ok(v) = s.parse::<i64>() {
                return self.intern(NodeKind::Literal(Literal::Int(v)), &[], span);
            }
            if let Ok(v) = s.parse::<f64>() {
                return self.intern(NodeKind::Literal(Literal::float(v)), &[], span);
            }
        }
        let name = self.store.name(s);
        self.intern(NodeKind::Symbol(name), &[], span)
    }

    fn read_form(&mut self, open: Span, position: Position) -> Result<NodeId, ParseError> {
        if self.cursor.peek_is(&Token::RParen) {
            let close = self.cursor.next_lexeme().map_or(open, |l| l.span);
            return Err(ParseError::new(ParseErrorKind::EmptyForm, open.merge(close)));
        }

        let head = match self.cursor.next_lexeme() {
            None => {
                return Err(ParseError::new(ParseErrorKind::Unclosed("("), open));
            }
            Some(Lexeme {
                token: Ok(Token::Symbol(s)),
                ..
            }) => s,
            Some(Lexeme { token: Err(kind), span }) => return Err(ParseError::new(kind, span)),
            Some(Lexeme { span, .. }) => {
                return Err(ParseError::new(ParseErrorKind::HeadNotSymbol, span));
            }
        };

        match head.as_str() {
            "def" => {
                if position != Position::TopLevel {
                    return Err(ParseError::new(ParseErrorKind::NestedDef, open));
                }
                let name = self.read_binder("def")?;
                let value = self.read_expr(Position::Nested)?;
                let close = self.expect_close(open, "def", "a name and one expression")?;
                self.intern(NodeKind::Def(name), &[value], open.merge(close))
            }
            "let" => {
                let name = self.read_binder("let")?;
                let value = self.read_expr(Position::Nested)?;
                let body = self.read_expr(Position::Nested)?;
                let close = self.expect_close(open, "let", "a name, a value, and a body")?;
                self.intern(NodeKind::Let(name), &[value, body], open.merge(close))
            }
            "if" => self.read_fixed(NodeKind::If, open, "if", 3, "a condition and two branches"),
            "recover" => self.read_fixed(
                NodeKind::Recover,
                open,
                "recover",
                2,
                "an expression and a fallback",
            ),
            s => {
                let kind = if let Some(op) = Operator::from_symbol(s) {
                    NodeKind::Op(op)
                } else if let Some(effect) = s.strip_suffix('!') {
                    if effect.is_empty() {
                        return Err(ParseError::new(ParseErrorKind::EmptyEffect, open));
                    }
                    NodeKind::Effect(self.store.name(effect))
                } else {
                    NodeKind::Call(self.store.name(s))
                };
                let (args, close) = self.read_until(&Token::RParen, "(", open)?;
                self.intern(kind, &args, open.merge(close))
            }
        }
    }

    fn read_fixed(
        &mut self,
        kind: NodeKind,
        open: Span,
        form: &'static str,
        arity: usize,
        expected: &'static str,
    ) -> Result<NodeId, ParseError> {
        let (args, close) = self.read_until(&Token::RParen, "(", open)?;
        let span = open.merge(close);
        if args.len() != arity {
            return Err(ParseError::new(
                ParseErrorKind::MalformedForm { form, expected },
                span,
            ));
        }
        self.intern(kind, &args, span)
    }

    fn read_collection(&mut self, kind: NodeKind, open: Span) -> Result<NodeId, ParseError> {
        let (closer, opener) = match kind {
            NodeKind::List => (Token::RBracket, "["),
            NodeKind::Set => (Token::RBrace, "#{"),
            _ => (Token::RBrace, "{"),
        };
        let (elements, close) = self.read_until(&closer, opener, open)?;
        let span = open.merge(close);
        if kind == NodeKind::Map && elements.len() % 2 != 0 {
            return Err(ParseError::new(ParseErrorKind::OddMap, span));
        }
        self.intern(kind, &elements, span)
    }

    /// Read expressions until `closer`, returning them and the closer's span.
    fn read_until(
        &mut self,
        closer: &Token,
        opener: &'static str,
        open: Span,
    ) -> Result<(Vec<NodeId>, Span), ParseError> {
        let mut items = Vec::new();
        loop {
            match self.cursor.peek() {
                None => return Err(ParseError::new(ParseErrorKind::Unclosed(opener), open)),
                Some(Lexeme { token: Ok(t), span }) if t == closer => {
                    let span = *span;
                    self.cursor.next_lexeme();
                    return Ok((items, span));
                }
                Some(Lexeme { token: Ok(t), span }) if t.is_closer() => {
                    return Err(ParseError::new(
                        ParseErrorKind::Unexpected {
                            found: t.describe(),
                            expected: "a matching closer",
                        },
                        *span,
                    ));
                }
                Some(_) => items.push(self.read_expr(Position::Nested)?),
            }
        }
    }

    fn read_binder(&mut self, form: &'static str) -> Result<Name, ParseError> {
        match self.cursor.next_lexeme() {
            Some(Lexeme {
                token: Ok(Token::Symbol(s)),
                span,
            }) => {
                if RESERVED.contains(&s.as_str())
                    || Operator::from_symbol(&s).is_some()
                    || s.ends_with('!')
                {
                    return Err(ParseError::new(ParseErrorKind::ReservedBinder(s), span));
                }
                Ok(self.store.name(&s))
            }
            Some(Lexeme { span, .. }) => Err(ParseError::new(
                ParseErrorKind::MalformedForm {
                    form,
                    expected: "a symbol to bind",
                },
                span,
            )),
            None => Err(ParseError::new(
                ParseErrorKind::UnexpectedEof {
                    expected: "a symbol to bind",
                },
                self.cursor.eof_span(),
            )),
        }
    }

    fn expect_close(
        &mut self,
        open: Span,
        form: &'static str,
        expected: &'static str,
    ) -> Result<Span, ParseError> {
        match self.cursor.next_lexeme() {
            Some(Lexeme {
                token: Ok(Token::RParen),
                span,
            }) => Ok(span),
            Some(Lexeme { span, .. }) => Err(ParseError::new(
                ParseErrorKind::MalformedForm { form, expected },
                open.merge(span),
            )),
            None => Err(ParseError::new(ParseErrorKind::Unclosed("("), open)),
        }
    }
}
