//! Tokenizer built on logos.
//!
//! Whitespace and `;` line comments are skipped. Lexing never stops early:
//! invalid input becomes an error lexeme and the reader decides how far to
//! skip.

use garden_ir::Span;
use logos::Logos;

use crate::error::ParseErrorKind;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token {
    #[regex(r";[^\n]*", logos::skip)]
    Comment,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("#{")]
    HashBrace,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,

    #[token("true")]
    True,
    #[token("false")]
    False,

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),

    #[regex(r#""([^"\\]|\\.)*""#, unescape)]
    Str(String),

    #[regex(r"[a-zA-Z_+\-*/%<>=!?.&|][a-zA-Z0-9_+\-*/%<>=!?.&|]*", |lex| lex.slice().to_owned())]
    Symbol(String),
}

impl Token {
    /// Surface text for error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Comment => ";".to_owned(),
            Token::LParen => "(".to_owned(),
            Token::RParen => ")".to_owned(),
            Token::LBracket => "[".to_owned(),
            Token::RBracket => "]".to_owned(),
            Token::HashBrace => "#{".to_owned(),
            Token::LBrace => "{".to_owned(),
            Token::RBrace => "}".to_owned(),
            Token::True => "true".to_owned(),
            Token::False => "false".to_owned(),
            Token::Int(v) => v.to_string(),
            Token::Float(v) => v.to_string(),
            Token::Str(s) => format!("{s:?}"),
            Token::Symbol(s) => s.clone(),
        }
    }

    pub fn is_opener(&self) -> bool {
        matches!(
            self,
            Token::LParen | Token::LBracket | Token::HashBrace | Token::LBrace
        )
    }

    pub fn is_closer(&self) -> bool {
        matches!(self, Token::RParen | Token::RBracket | Token::RBrace)
    }
}

fn unescape(lex: &mut logos::Lexer<'_, Token>) -> Option<String> {
    let slice = lex.slice();
    let body = &slice[1..slice.len() - 1];
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            '\\' => out.push('\\'),
            '"' => out.push('"'),
            _ => return None,
        }
    }
    Some(out)
}

/// A token, or the reason the text at `span` is not one.
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub token: Result<Token, ParseErrorKind>,
    pub span: Span,
}

/// Tokenize the whole source.
pub fn tokenize(source: &str) -> Vec<Lexeme> {
    let mut lexemes = Vec::new();
    let mut lexer = Token::lexer(source);

    while let Some(result) = lexer.next() {
        let range = lexer.span();
        let span = Span::try_from_range(range.clone()).unwrap_or(Span::DUMMY);
        let token = result.map_err(|()| classify_error(&source[range]));
        lexemes.push(Lexeme { token, span });
    }

    lexemes
}

fn classify_error(slice: &str) -> ParseErrorKind {
    if slice.starts_with('"') {
        ParseErrorKind::BadString
    } else if !slice.is_empty() && slice.bytes().all(|b| b.is_ascii_digit()) {
        ParseErrorKind::IntOutOfRange(slice.to_owned())
    } else {
        ParseErrorKind::UnexpectedChar(slice.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tokens(source: &str) -> Vec<Result<Token, ParseErrorKind>> {
        tokenize(source).into_iter().map(|l| l.token).collect()
    }

    #[test]
    fn test_basic_tokens() {
        assert_eq!(
            tokens("(def x [1 2.5]) ; trailing"),
            vec![
                Ok(Token::LParen),
                Ok(Token::Symbol("def".to_owned())),
                Ok(Token::Symbol("x".to_owned())),
                Ok(Token::LBracket),
                Ok(Token::Int(1)),
                Ok(Token::Float(2.5)),
                Ok(Token::RBracket),
                Ok(Token::RParen),
            ]
        );
    }

    #[test]
    fn test_collection_openers() {
        assert_eq!(
            tokens("#{ } { }"),
            vec![
                Ok(Token::HashBrace),
                Ok(Token::RBrace),
                Ok(Token::LBrace),
                Ok(Token::RBrace),
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            tokens(r#""a\"b\n\\""#),
            vec![Ok(Token::Str("a\"b\n\\".to_owned()))]
        );
    }

    #[test]
    fn test_invalid_escape_is_error() {
        assert_eq!(tokens(r#""\q""#), vec![Err(ParseErrorKind::BadString)]);
    }

    #[test]
    fn test_symbols_with_punctuation() {
        assert_eq!(
            tokens("str.upper fs.read! <= != -"),
            vec![
                Ok(Token::Symbol("str.upper".to_owned())),
                Ok(Token::Symbol("fs.read!".to_owned())),
                Ok(Token::Symbol("<=".to_owned())),
                Ok(Token::Symbol("!=".to_owned())),
                Ok(Token::Symbol("-".to_owned())),
            ]
        );
    }

    #[test]
    fn test_keywords_vs_symbols() {
        assert_eq!(
            tokens("true truthy false"),
            vec![
                Ok(Token::True),
                Ok(Token::Symbol("truthy".to_owned())),
                Ok(Token::False),
            ]
        );
    }

    #[test]
    fn test_int_out_of_range() {
        assert_eq!(
            tokens("99999999999999999999"),
            vec![Err(ParseErrorKind::IntOutOfRange(
                "99999999999999999999".to_owned()
            ))]
        );
    }

    #[test]
    fn test_unexpected_char() {
        let lexemes = tokenize("(@)");
        assert_eq!(lexemes.len(), 3);
        assert_eq!(
            lexemes[1].token,
            Err(ParseErrorKind::UnexpectedChar("@".to_owned()))
        );
        assert_eq!(lexemes[1].span, Span::new(1, 2));
    }
}
