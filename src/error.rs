use std::fmt;

use crate::checker::TypeErrors;
use crate::il::IlError;
use crate::lexer::LexError;
use crate::parser::ParseError;

/// The x86-32 emitter's own error kind: unknown opcodes and the handful of
/// deliberately unimplemented code paths (float/boolean constants, closures).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitError(pub String);

impl fmt::Display for EmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for EmitError {}

/// Unifies every stage's error type so the CLI driver has one thing to match
/// on and report to stderr before exiting with status 1.
#[derive(Debug, Clone)]
pub enum CompileError {
    Io(String),
    Lex(LexError),
    Parse(ParseError),
    Type(TypeErrors),
    Il(IlError),
    Emit(EmitError),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Io(msg) => write!(f, "{msg}"),
            CompileError::Lex(e) => write!(f, "{e}"),
            CompileError::Parse(e) => write!(f, "{e}"),
            CompileError::Type(e) => write!(f, "{e}"),
            CompileError::Il(e) => write!(f, "{e}"),
            CompileError::Emit(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<LexError> for CompileError {
    fn from(e: LexError) -> Self {
        CompileError::Lex(e)
    }
}

impl From<ParseError> for CompileError {
    fn from(e: ParseError) -> Self {
        CompileError::Parse(e)
    }
}

impl From<TypeErrors> for CompileError {
    fn from(e: TypeErrors) -> Self {
        CompileError::Type(e)
    }
}

impl From<IlError> for CompileError {
    fn from(e: IlError) -> Self {
        CompileError::Il(e)
    }
}

impl From<EmitError> for CompileError {
    fn from(e: EmitError) -> Self {
        CompileError::Emit(e)
    }
}
