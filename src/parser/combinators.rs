//! The generic packrat driver: `consume` matches one token; `alt` tries a
//! list of alternatives in order and returns the first success, tracking
//! the deepest failure both locally (returned to the caller) and globally
//! (for the final diagnostic if the whole parse fails). Sequencing
//! ("Concat") needs no separate combinator in Rust: a production's body is
//! simply a sequence of `?`-chained calls, each threading the next token
//! index through — idiomatic here where the teacher's combinator library
//! would use a `Sequence` variant.

use std::collections::HashMap;
use std::fmt;

use crate::lexer::{Token, TokenKind, TokenValue};
use crate::node::{Node, Value};
use crate::span::SourceSpan;

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub location: Option<SourceSpan>,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "{loc}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for ParseError {}

impl ParseError {
    /// The ordering used to pick the "deepest" of two candidate failures:
    /// later source position wins; among ties, the widest span.
    fn is_deeper_than(&self, other: &ParseError) -> bool {
        match (&self.location, &other.location) {
            (Some(a), Some(b)) => a.is_deeper_than(b),
            (Some(_), None) => true,
            _ => false,
        }
    }
}

type ProdResult = Result<(Node, usize), ParseError>;

pub struct Parser {
    file: String,
    tokens: Vec<Token>,
    memo: HashMap<(&'static str, usize), ProdResult>,
    top_err: Option<ParseError>,
}

impl Parser {
    pub fn new(file: impl Into<String>, tokens: Vec<Token>) -> Self {
        Parser { file: file.into(), tokens, memo: HashMap::new(), top_err: None }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    fn token_at(&self, pos: usize) -> Option<&Token> {
        self.tokens.get(pos)
    }

    fn end_of_input_location(&self) -> Option<SourceSpan> {
        self.tokens.last().map(|t| t.location.clone())
    }

    /// Builds a `ParseError` anchored at token `pos` (or end-of-input).
    pub fn fail(&self, pos: usize, message: impl Into<String>) -> ParseError {
        let location = self.token_at(pos).map(|t| t.location.clone()).or_else(|| self.end_of_input_location());
        ParseError { message: message.into(), location }
    }

    /// Folds a freshly observed failure into the run-global deepest error.
    pub fn record(&mut self, err: &ParseError) {
        let replace = match &self.top_err {
            None => true,
            Some(current) => err.is_deeper_than(current),
        };
        if replace {
            self.top_err = Some(err.clone());
        }
    }

    pub fn deepest_error(&self) -> ParseError {
        self.top_err.clone().unwrap_or_else(|| ParseError {
            message: "failed to parse".to_string(),
            location: self.end_of_input_location(),
        })
    }

    /// Packrat cache lookup, keyed by (production tag, starting token index).
    pub fn memo_get(&self, tag: &'static str, pos: usize) -> Option<ProdResult> {
        self.memo.get(&(tag, pos)).cloned()
    }

    pub fn memo_put(&mut self, tag: &'static str, pos: usize, result: ProdResult) {
        self.memo.insert((tag, pos), result);
    }

    /// `Consume(kind)`: matches one token of the given kind, building a leaf
    /// `Node` labelled `label` carrying the token's value and span.
    pub fn consume(&mut self, pos: usize, kind: TokenKind, label: &str) -> ProdResult {
        match self.token_at(pos) {
            Some(tok) if tok.kind == kind => {
                let mut node = Node::new(label).with_location(tok.location.clone());
                node = match &tok.value {
                    TokenValue::Int(v) => node.with_value(Value::Int(*v)),
                    TokenValue::Float(v) => node.with_value(Value::Float(*v)),
                    TokenValue::Str(v) if kind == TokenKind::Name => node.with_value(Value::Name(v.clone())),
                    TokenValue::Str(v) => node.with_value(Value::Str(v.clone())),
                    TokenValue::Lexeme(_) => node,
                };
                Ok((node, pos + 1))
            }
            Some(tok) => Err(self.fail(pos, format!("expected {kind}, found {}", tok.kind))),
            None => Err(self.fail(pos, format!("expected {kind}, found end of input"))),
        }
    }

    /// Bare token match without constructing a node — used when a
    /// production only needs to verify and skip a punctuation/keyword
    /// token (e.g. the `=` in `Assign`, the parens in `Apply`).
    pub fn expect(&mut self, pos: usize, kind: TokenKind) -> Result<usize, ParseError> {
        self.consume(pos, kind, "_").map(|(_, next)| next)
    }

    pub fn peek_kind(&self, pos: usize) -> Option<TokenKind> {
        self.token_at(pos).map(|t| t.kind)
    }
}

/// `Alt(p1,…,pn)`: ordered alternative; try each in turn, return the first
/// success. On total failure, fold every alternative's failure into a
/// single error (the lexically deepest one) and also record it globally.
pub fn alt(p: &mut Parser, pos: usize, alternatives: &[fn(&mut Parser, usize) -> ProdResult]) -> ProdResult {
    let mut deepest: Option<ParseError> = None;
    for alternative in alternatives {
        match alternative(p, pos) {
            Ok(ok) => return Ok(ok),
            Err(err) => {
                p.record(&err);
                deepest = match deepest {
                    Some(current) if !err.is_deeper_than(&current) => Some(current),
                    _ => Some(err),
                };
            }
        }
    }
    Err(deepest.unwrap_or_else(|| p.fail(pos, "no alternative matched")))
}

/// Wraps a production function with packrat memoisation keyed by its tag
/// and the starting token index.
pub fn memoize(p: &mut Parser, tag: &'static str, pos: usize, f: impl FnOnce(&mut Parser, usize) -> ProdResult) -> ProdResult {
    if let Some(cached) = p.memo_get(tag, pos) {
        return cached;
    }
    let result = f(p, pos);
    p.memo_put(tag, pos, result.clone());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn toks(src: &str) -> Vec<Token> {
        Lexer::new("<test>", src).lex().unwrap()
    }

    #[test]
    fn consume_matches_and_advances() {
        let mut p = Parser::new("<test>", toks("42"));
        let (node, next) = p.consume(0, TokenKind::Int, "INT").unwrap();
        assert_eq!(node.label, "INT");
        assert_eq!(next, 1);
    }

    #[test]
    fn consume_rejects_wrong_kind() {
        let mut p = Parser::new("<test>", toks("42"));
        assert!(p.consume(0, TokenKind::Name, "NAME").is_err());
    }

    #[test]
    fn alt_tries_in_order_and_returns_first_success() {
        fn as_name(p: &mut Parser, pos: usize) -> ProdResult {
            p.consume(pos, TokenKind::Name, "NAME")
        }
        fn as_int(p: &mut Parser, pos: usize) -> ProdResult {
            p.consume(pos, TokenKind::Int, "INT")
        }
        let mut p = Parser::new("<test>", toks("42"));
        let (node, _) = alt(&mut p, 0, &[as_name, as_int]).unwrap();
        assert_eq!(node.label, "INT");
    }

    #[test]
    fn alt_reports_deepest_failure() {
        fn fails_at_0(p: &mut Parser, pos: usize) -> ProdResult {
            Err(p.fail(pos, "a"))
        }
        fn fails_at_1(p: &mut Parser, pos: usize) -> ProdResult {
            let _ = p.consume(pos, TokenKind::Name, "NAME")?;
            Err(p.fail(pos + 1, "b"))
        }
        let mut p = Parser::new("<test>", toks("x 1"));
        let err = alt(&mut p, 0, &[fails_at_1, fails_at_0]).unwrap_err();
        assert_eq!(err.message, "b");
    }

    #[test]
    fn memoize_caches_by_position() {
        fn count_calls(p: &mut Parser, pos: usize) -> ProdResult {
            memoize(p, "tag", pos, |p, pos| p.consume(pos, TokenKind::Int, "INT"))
        }
        let mut p = Parser::new("<test>", toks("42"));
        let first = count_calls(&mut p, 0).unwrap();
        let second = count_calls(&mut p, 0).unwrap();
        assert_eq!(first.1, second.1);
    }
}
