//! A hand-written scanner implementing the ordered-pattern, longest-match
//! discipline described for the source language: each literal punctuation,
//! each keyword, `NAME`, `INT`, `FLOAT`, `STRING`, line/block comments, and
//! whitespace. Ties between a keyword and an identifier resolve to the
//! keyword.

mod token;
mod token_kind;
mod tokens;

pub use token::{Token, TokenValue};
pub use token_kind::TokenKind;
pub use tokens::Tokens;

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use once_cell::sync::Lazy;

use crate::span::SourceSpan;
use token_kind::KEYWORDS;

static KEYWORD_MAP: Lazy<HashMap<&'static str, TokenKind>> =
    Lazy::new(|| KEYWORDS.iter().cloned().collect());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub message: String,
    pub location: SourceSpan,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

impl Error for LexError {}

pub type LexResult<T> = Result<T, LexError>;

pub struct Lexer<'a> {
    file: String,
    tokens: Vec<Token>,
    iter: Peekable<Chars<'a>>,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(file: impl Into<String>, input: &'a str) -> Self {
        Lexer { file: file.into(), tokens: Vec::new(), iter: input.chars().peekable(), line: 1, col: 1 }
    }

    fn here(&self) -> SourceSpan {
        SourceSpan::point(self.file.clone(), self.line, self.col)
    }

    fn peek(&mut self) -> Option<char> {
        self.iter.peek().copied()
    }

    fn peek2(&self) -> Option<char> {
        let mut clone = self.iter.clone();
        clone.next();
        clone.next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.iter.next()?;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    /// Lexes the whole input, consuming `self`.
    pub fn lex(mut self) -> LexResult<Vec<Token>> {
        loop {
            self.skip_trivia()?;
            if self.peek().is_none() {
                break;
            }
            self.lex_one()?;
        }
        Ok(self.tokens)
    }

    fn skip_trivia(&mut self) -> LexResult<()> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek2() == Some('/') => {
                    while !matches!(self.peek(), Some('\n') | None) {
                        self.advance();
                    }
                }
                Some('/') if self.peek2() == Some('*') => {
                    self.skip_block_comment()?;
                }
                _ => return Ok(()),
            }
        }
    }

    fn skip_block_comment(&mut self) -> LexResult<()> {
        let start = self.here();
        self.advance();
        self.advance();
        loop {
            match self.peek() {
                None => {
                    return Err(LexError {
                        message: format!("unclosed comment starting at {start}"),
                        location: start,
                    })
                }
                Some('*') if self.peek2() == Some('/') => {
                    self.advance();
                    self.advance();
                    return Ok(());
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn lex_one(&mut self) -> LexResult<()> {
        match self.peek().expect("lex_one called at EOF") {
            c if c.is_ascii_alphabetic() => self.lex_name(),
            c if c.is_ascii_digit() => self.lex_number(),
            '"' => self.lex_string(),
            _ => self.lex_punctuation(),
        }
    }

    fn lex_name(&mut self) -> LexResult<()> {
        let start = self.here();
        let mut lexeme = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                lexeme.push(c);
                self.advance();
            } else {
                break;
            }
        }
        let end = self.here();
        let location = span_between(&start, &end);
        if let Some(kind) = KEYWORD_MAP.get(lexeme.as_str()) {
            self.tokens.push(Token::new(*kind, lexeme.clone(), TokenValue::Lexeme(lexeme), location));
        } else {
            self.tokens.push(Token::new(TokenKind::Name, lexeme.clone(), TokenValue::Str(lexeme), location));
        }
        Ok(())
    }

    fn lex_number(&mut self) -> LexResult<()> {
        let start = self.here();
        let mut lexeme = String::new();
        let mut is_float = false;

        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                lexeme.push(c);
                self.advance();
            } else {
                break;
            }
        }

        if self.peek() == Some('.') && self.peek2().is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            lexeme.push('.');
            self.advance();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    lexeme.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
        }

        if matches!(self.peek(), Some('e') | Some('E')) {
            let mut lookahead = self.iter.clone();
            let mut exp = String::new();
            exp.push(lookahead.next().unwrap());
            if matches!(lookahead.peek(), Some('+') | Some('-')) {
                exp.push(lookahead.next().unwrap());
            }
            if lookahead.peek().is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                lexeme.push_str(&exp);
                for _ in 0..exp.len() {
                    self.advance();
                }
                while let Some(c) = self.peek() {
                    if c.is_ascii_digit() {
                        lexeme.push(c);
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
        }

        let end = self.here();
        let location = span_between(&start, &end);

        if is_float {
            let v: f64 = lexeme.parse().map_err(|_| LexError {
                message: format!("malformed float literal '{lexeme}'"),
                location: location.clone(),
            })?;
            self.tokens.push(Token::new(TokenKind::Float, lexeme, TokenValue::Float(v), location));
        } else {
            let v: i64 = lexeme.parse().map_err(|_| LexError {
                message: format!("malformed integer literal '{lexeme}'"),
                location: location.clone(),
            })?;
            self.tokens.push(Token::new(TokenKind::Int, lexeme, TokenValue::Int(v), location));
        }
        Ok(())
    }

    /// Escapes are preserved as the literal two-byte sequence (`\` followed
    /// by the escaped char) in the stored value, matching the source
    /// scanner's behaviour — this is not real escape interpretation.
    fn lex_string(&mut self) -> LexResult<()> {
        let start = self.here();
        self.advance();
        let mut lexeme = String::from("\"");
        let mut value = String::new();
        loop {
            match self.peek() {
                None => {
                    return Err(LexError {
                        message: format!("unclosed string starting at {start}"),
                        location: start,
                    })
                }
                Some('"') => {
                    lexeme.push('"');
                    self.advance();
                    break;
                }
                Some('\\') => {
                    lexeme.push('\\');
                    self.advance();
                    if let Some(escaped) = self.peek() {
                        lexeme.push(escaped);
                        value.push('\\');
                        value.push(escaped);
                        self.advance();
                    }
                }
                Some(c) => {
                    lexeme.push(c);
                    value.push(c);
                    self.advance();
                }
            }
        }
        let end = self.here();
        let location = span_between(&start, &end);
        self.tokens.push(Token::new(TokenKind::Str, lexeme, TokenValue::Str(value), location));
        Ok(())
    }

    fn lex_punctuation(&mut self) -> LexResult<()> {
        let start = self.here();
        let two = self.peek2().map(|c2| {
            let c1 = self.peek().unwrap();
            (c1, c2)
        });
        let (kind, width) = match two {
            Some(('&', '&')) => (TokenKind::AndAnd, 2),
            Some(('|', '|')) => (TokenKind::OrOr, 2),
            Some(('<', '=')) => (TokenKind::Le, 2),
            Some(('>', '=')) => (TokenKind::Ge, 2),
            Some(('=', '=')) => (TokenKind::EqEq, 2),
            Some(('!', '=')) => (TokenKind::Ne, 2),
            _ => match self.peek() {
                Some('=') => (TokenKind::Eq, 1),
                Some('{') => (TokenKind::LBrace, 1),
                Some('}') => (TokenKind::RBrace, 1),
                Some('(') => (TokenKind::LParen, 1),
                Some(')') => (TokenKind::RParen, 1),
                Some('[') => (TokenKind::LBracket, 1),
                Some(']') => (TokenKind::RBracket, 1),
                Some('+') => (TokenKind::Plus, 1),
                Some('-') => (TokenKind::Minus, 1),
                Some('*') => (TokenKind::Star, 1),
                Some('/') => (TokenKind::Slash, 1),
                Some('%') => (TokenKind::Percent, 1),
                Some(',') => (TokenKind::Comma, 1),
                Some('!') => (TokenKind::Bang, 1),
                Some('<') => (TokenKind::Lt, 1),
                Some('>') => (TokenKind::Gt, 1),
                Some(other) => {
                    return Err(LexError {
                        message: format!("unexpected character '{other}'"),
                        location: start,
                    })
                }
                None => unreachable!("lex_punctuation called at EOF"),
            },
        };
        let mut lexeme = String::new();
        for _ in 0..width {
            lexeme.push(self.advance().unwrap());
        }
        let end = self.here();
        let location = span_between(&start, &end);
        self.tokens.push(Token::new(kind, lexeme.clone(), TokenValue::Lexeme(lexeme), location));
        Ok(())
    }
}

fn span_between(start: &SourceSpan, end: &SourceSpan) -> SourceSpan {
    SourceSpan {
        file: start.file.clone(),
        start_line: start.start_line,
        start_col: start.start_col,
        end_line: end.start_line,
        end_col: end.start_col,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new("<test>", src).lex().unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_keywords_over_identifiers() {
        assert_eq!(kinds("fn if else true false new"), vec![
            TokenKind::Fn,
            TokenKind::If,
            TokenKind::Else,
            TokenKind::True,
            TokenKind::False,
            TokenKind::New,
        ]);
        assert_eq!(kinds("iffy"), vec![TokenKind::Name]);
    }

    #[test]
    fn lexes_integers_and_floats() {
        let toks = Lexer::new("<test>", "42 3.14 2e10 5.0e-3").lex().unwrap();
        assert_eq!(toks[0].value, TokenValue::Int(42));
        assert_eq!(toks[1].value, TokenValue::Float(3.14));
        assert_eq!(toks[2].value, TokenValue::Float(2e10));
        assert_eq!(toks[3].value, TokenValue::Float(5.0e-3));
    }

    #[test]
    fn lexes_multi_char_operators_longest_match() {
        assert_eq!(kinds("<= >= == != && ||"), vec![
            TokenKind::Le,
            TokenKind::Ge,
            TokenKind::EqEq,
            TokenKind::Ne,
            TokenKind::AndAnd,
            TokenKind::OrOr,
        ]);
        assert_eq!(kinds("< > ! = "), vec![TokenKind::Lt, TokenKind::Gt, TokenKind::Bang, TokenKind::Eq]);
    }

    #[test]
    fn string_literal_preserves_escapes_literally() {
        let toks = Lexer::new("<test>", r#""a\nb""#).lex().unwrap();
        assert_eq!(toks[0].value, TokenValue::Str("a\\nb".to_string()));
    }

    #[test]
    fn unterminated_string_reports_opening_span() {
        let err = Lexer::new("<test>", "\"abc").lex().unwrap_err();
        assert_eq!(err.location.start_line, 1);
        assert_eq!(err.location.start_col, 1);
    }

    #[test]
    fn unterminated_block_comment_reports_opening_span() {
        let err = Lexer::new("<test>", "/* never closed").lex().unwrap_err();
        assert_eq!(err.location.start_col, 1);
    }

    #[test]
    fn line_comments_are_skipped() {
        assert_eq!(kinds("1 // trailing comment\n2"), vec![TokenKind::Int, TokenKind::Int]);
    }

    #[test]
    fn block_comments_are_skipped() {
        assert_eq!(kinds("1 /* inner */ 2"), vec![TokenKind::Int, TokenKind::Int]);
    }

    #[test]
    fn tracks_line_and_column_across_newlines() {
        let toks = Lexer::new("<test>", "a\nbb").lex().unwrap();
        assert_eq!(toks[0].location.start_line, 1);
        assert_eq!(toks[1].location.start_line, 2);
        assert_eq!(toks[1].location.start_col, 1);
    }
}
