use std::fmt;

use super::token_kind::TokenKind;
use crate::span::SourceSpan;

/// `TokenValue` is one of: a 64-bit signed integer, a 64-bit float, a
/// string, or (for keywords/punctuation) the lexeme itself.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenValue {
    Int(i64),
    Float(f64),
    Str(String),
    Lexeme(String),
}

impl fmt::Display for TokenValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenValue::Int(v) => write!(f, "{v}"),
            TokenValue::Float(v) => write!(f, "{v}"),
            TokenValue::Str(v) => write!(f, "{v:?}"),
            TokenValue::Lexeme(v) => f.write_str(v),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub value: TokenValue,
    pub location: SourceSpan,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, value: TokenValue, location: SourceSpan) -> Self {
        Token { kind, lexeme: lexeme.into(), value, location }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})@{}", self.kind, self.lexeme, self.location)
    }
}
