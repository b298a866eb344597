//! A memoising recursive-descent (packrat) parser. `combinators` supplies
//! the generic driver (`Consume`/`Alt`, memoisation keyed by token index per
//! production, deepest-error tracking); `grammar` implements the concrete
//! productions reproduced in the glossary.

mod combinators;
mod grammar;

pub use combinators::ParseError;

use crate::lexer::Token;
use crate::node::Node;

/// Parses a single file's token stream into a `Stmts` root node.
pub fn parse(file: &str, tokens: Vec<Token>) -> Result<Node, ParseError> {
    let mut parser = combinators::Parser::new(file, tokens);
    let (node, rest) = grammar::stmts(&mut parser, 0)?;
    if rest < parser.len() {
        // Trailing tokens the grammar didn't consume: report the deepest
        // failure observed anywhere during the search rather than a fresh,
        // usually-uninformative "expected end of input" error.
        return Err(parser.deepest_error());
    }
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse_src(src: &str) -> Node {
        let tokens = Lexer::new("<test>", src).lex().unwrap();
        parse("<test>", tokens).unwrap()
    }

    #[test]
    fn parses_assignment_and_arithmetic() {
        let tree = parse_src("x = 1 + 2 * 3");
        assert_eq!(tree.label, "Stmts");
        assert_eq!(tree.children[0].label, "Assign");
        let rhs = &tree.children[0].children[1];
        assert_eq!(rhs.label, "+");
    }

    #[test]
    fn left_associativity_via_collapse() {
        // 1 - 2 - 3 should be (1 - 2) - 3, not 1 - (2 - 3)
        let tree = parse_src("x = 1 - 2 - 3");
        let expr = &tree.children[0].children[1];
        assert_eq!(expr.label, "-");
        assert_eq!(expr.children[0].label, "-");
    }

    #[test]
    fn parses_postfix_chain_left_to_right() {
        let tree = parse_src("f(a,b)[i](c)");
        let stmt = &tree.children[0];
        assert_eq!(stmt.label, "Call");
        assert_eq!(stmt.children[0].label, "Index");
        assert_eq!(stmt.children[0].children[0].label, "Call");
    }

    #[test]
    fn parses_if_else_chain() {
        let tree = parse_src("if true { 1 } else { 2 }");
        let if_node = &tree.children[0];
        assert_eq!(if_node.label, "If");
        assert_eq!(if_node.children.len(), 3);
    }

    #[test]
    fn reports_deepest_parse_error() {
        let tokens = Lexer::new("<test>", "x = 1 +").lex().unwrap();
        let err = parse("<test>", tokens).unwrap_err();
        assert!(err.location.is_some());
    }
}
