//! The uniform labelled-tree AST. Every construct in the source language —
//! statements, expressions, types — is represented by the same `Node`
//! struct; the `label` determines its role. This mirrors the source
//! language's own design rather than a Rust enum-per-production: see
//! `DESIGN.md` for why that tradeoff was kept rather than "fixed".

use std::fmt;

use crate::span::SourceSpan;
use crate::types::Type;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Name(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(v) => write!(f, "{v:?}"),
            Value::Name(v) => f.write_str(v),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub label: String,
    pub value: Option<Value>,
    pub ty: Option<Type>,
    pub children: Vec<Node>,
    pub location: Option<SourceSpan>,
}

impl Node {
    pub fn new(label: impl Into<String>) -> Self {
        Node { label: label.into(), value: None, ty: None, children: Vec::new(), location: None }
    }

    pub fn with_location(mut self, location: SourceSpan) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    pub fn leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn add_kid(&mut self, kid: Node) {
        self.children.push(kid);
    }

    pub fn prepend_kid(&mut self, kid: Node) {
        self.children.insert(0, kid);
    }

    /// The first child with the given label, if any.
    pub fn kid(&self, label: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.label == label)
    }

    /// Indexes into `children`; negative indices count from the end
    /// (`get(-1)` is the last child), matching the source's `Get`.
    pub fn get(&self, idx: i64) -> Option<&Node> {
        let len = self.children.len() as i64;
        let real = if idx < 0 { len + idx } else { idx };
        if real < 0 || real >= len {
            return None;
        }
        self.children.get(real as usize)
    }

    pub fn get_mut(&mut self, idx: i64) -> Option<&mut Node> {
        let len = self.children.len() as i64;
        let real = if idx < 0 { len + idx } else { idx };
        if real < 0 || real >= len {
            return None;
        }
        self.children.get_mut(real as usize)
    }

    /// Builds postfix-application chains: as long as this node's own
    /// left-most child itself has children (and, when `names` is
    /// non-empty, that child's label is one of them), recurse into that
    /// child; otherwise prepend `kid` here. This is how `f(a,b)[i](c)`
    /// becomes `Call(Index(Call(f,[a,b]),i),[c])` — each suffix attaches as
    /// the left-most child of the next suffix.
    pub fn add_left_most_kid(&mut self, kid: Node, names: &[&str]) {
        let descend = match self.children.first() {
            Some(first) if !first.children.is_empty() => names.is_empty() || names.contains(&first.label.as_str()),
            _ => false,
        };
        if descend {
            self.children[0].add_left_most_kid(kid, names);
        } else {
            self.prepend_kid(kid);
        }
    }

    /// True once every node in the subtree carries a non-null type.
    pub fn well_typed(&self) -> bool {
        self.ty.is_some() && self.children.iter().all(Node::well_typed)
    }

    /// Pretty-prints the tree; `with_loc` also includes each node's type and
    /// source location.
    pub fn serialize(&self, with_loc: bool) -> String {
        let mut out = String::new();
        self.serialize_into(&mut out, 0, with_loc);
        out
    }

    fn serialize_into(&self, out: &mut String, depth: usize, with_loc: bool) {
        out.push_str(&"  ".repeat(depth));
        out.push('(');
        out.push_str(&self.label);
        if let Some(v) = &self.value {
            out.push(' ');
            out.push_str(&v.to_string());
        }
        if with_loc {
            if let Some(ty) = &self.ty {
                out.push_str(" : ");
                out.push_str(&ty.to_string());
            }
            if let Some(loc) = &self.location {
                out.push_str(" @");
                out.push_str(&loc.to_string());
            }
        }
        for child in &self.children {
            out.push('\n');
            child.serialize_into(out, depth + 1, with_loc);
        }
        out.push(')');
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_index_counts_from_end() {
        let node = Node::new("Stmts").with_children(vec![Node::new("a"), Node::new("b"), Node::new("c")]);
        assert_eq!(node.get(-1).unwrap().label, "c");
        assert_eq!(node.get(0).unwrap().label, "a");
        assert_eq!(node.get(-3).unwrap().label, "a");
        assert!(node.get(-4).is_none());
    }

    #[test]
    fn add_left_most_kid_builds_postfix_chain() {
        // f(a,b)[i](c) => Call(Index(Call(f,Params[a,b]),i),Params[c])
        let params_ab = Node::new("Params").with_children(vec![Node::new("a"), Node::new("b")]);
        let params_i = Node::new("i");
        let params_c = Node::new("Params").with_children(vec![Node::new("c")]);

        let mut root = Node::new("Call").with_children(vec![params_c]);
        root.add_left_most_kid(Node::new("Index").with_children(vec![params_i]), &["Call", "Index"]);
        root.add_left_most_kid(Node::new("Call").with_children(vec![params_ab]), &["Call", "Index"]);
        root.add_left_most_kid(Node::new("f"), &["Call", "Index"]);

        assert_eq!(root.label, "Call");
        assert_eq!(root.children[0].label, "Index");
        let inner_call = &root.children[0].children[0];
        assert_eq!(inner_call.label, "Call");
        assert_eq!(inner_call.children[0].label, "f");
        assert_eq!(inner_call.children[1].children[0].label, "a");
    }

    #[test]
    fn well_typed_requires_every_node_typed() {
        let mut node = Node::new("Stmts").with_children(vec![Node::new("INT")]);
        assert!(!node.well_typed());
        node.ty = Some(crate::types::Type::unit());
        assert!(!node.well_typed());
        node.children[0].ty = Some(crate::types::Type::int());
        assert!(node.well_typed());
    }
}
