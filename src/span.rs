//! Source locations, shared between the lexer's tokens and the parser's AST
//! nodes.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpan {
    pub file: String,
    pub start_line: usize,
    pub start_col: usize,
    pub end_line: usize,
    pub end_col: usize,
}

impl SourceSpan {
    pub fn point(file: impl Into<String>, line: usize, col: usize) -> Self {
        SourceSpan { file: file.into(), start_line: line, start_col: col, end_line: line, end_col: col }
    }

    /// The union of two spans: the earliest start, the latest end. Used to
    /// compute an interior node's location from its children's.
    pub fn union(&self, other: &SourceSpan) -> SourceSpan {
        let (start_line, start_col) = if (self.start_line, self.start_col) <= (other.start_line, other.start_col) {
            (self.start_line, self.start_col)
        } else {
            (other.start_line, other.start_col)
        };
        let (end_line, end_col) = if (self.end_line, self.end_col) >= (other.end_line, other.end_col) {
            (self.end_line, self.end_col)
        } else {
            (other.end_line, other.end_col)
        };
        SourceSpan { file: self.file.clone(), start_line, start_col, end_line, end_col }
    }

    /// Ordering used to pick the "deepest" parse failure: later line wins,
    /// then later column; ties prefer the widest span (latest end).
    pub fn is_deeper_than(&self, other: &SourceSpan) -> bool {
        let a = (self.start_line, self.start_col);
        let b = (other.start_line, other.start_col);
        if a != b {
            return a > b;
        }
        (self.end_line, self.end_col) > (other.end_line, other.end_col)
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.start_line, self.start_col)
    }
}
