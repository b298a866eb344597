//! A tree-walking evaluator: runs a checked tree directly, without ever
//! lowering to IL, as a debugging aid alongside the compiled backend.
//! Grounded on `examples/original_source/evaluator/eval.go` end to end —
//! unlike the checker and IL generator, this stage keeps the source's
//! panic-on-fault behaviour (an unchecked/malformed tree is a programmer
//! error in this stage, not a diagnosable user error) rather than
//! propagating `Result`, a deliberate split recorded in `DESIGN.md`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::node::{Node, Value as NodeValue};
use crate::table::SymbolTable;
use crate::types::{Empty, Primitive, Type};

/// A runtime value. Arrays are reference types here as they are in the
/// source (`[]interface{}` aliases through assignment), so they're wrapped
/// in `Rc<RefCell<_>>` rather than carried by value.
#[derive(Debug, Clone)]
pub enum Value {
    Unit,
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Array(Rc<RefCell<Vec<Value>>>),
    /// A function literal that hasn't captured an environment yet — bare
    /// top-level and `self`-recursive references stay this shape.
    Function(Rc<Node>),
    /// A function literal plus the flattened scope it closed over, built
    /// the moment a function-valued expression escapes the scope it was
    /// declared in (mirrors the source's `Evaluator.Clone`).
    Closure(Rc<Node>, Rc<HashMap<String, Value>>),
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Unit => f.write_str("()"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(v) => write!(f, "{v:?}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Array(items) => {
                let parts: Vec<String> = items.borrow().iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Value::Function(_) => f.write_str("<function>"),
            Value::Closure(..) => f.write_str("<closure>"),
        }
    }
}

fn from_empty(e: Empty) -> Value {
    match e {
        Empty::Int(v) => Value::Int(v),
        Empty::Float(v) => Value::Float(v),
        Empty::Str(v) => Value::Str(v),
        Empty::Bool(v) => Value::Bool(v),
    }
}

fn as_int(v: Value) -> i64 {
    match v {
        Value::Int(v) => v,
        other => panic!("expected an int, got {other}"),
    }
}

fn as_float(v: Value) -> f64 {
    match v {
        Value::Float(v) => v,
        other => panic!("expected a float, got {other}"),
    }
}

fn as_str(v: Value) -> String {
    match v {
        Value::Str(v) => v,
        other => panic!("expected a string, got {other}"),
    }
}

fn as_array(v: Value) -> Rc<RefCell<Vec<Value>>> {
    match v {
        Value::Array(a) => a,
        other => panic!("expected an array, got {other}"),
    }
}

fn ident(node: &Node) -> String {
    match (&node.label[..], &node.value) {
        ("NAME", Some(NodeValue::Name(s))) => s.clone(),
        _ => panic!("expected a NAME node : {}", node.serialize(true)),
    }
}

fn param_names(fn_node: &Node) -> Vec<String> {
    fn_node.children[0].children.iter().map(|p| ident(&p.children[0])).collect()
}

/// Runs `node` as a top-level program and returns the value of every
/// top-level statement, in order — mirroring the source's `Evaluate`,
/// minus its (commented-out, never actually active) panic recovery.
pub fn evaluate(node: &Node) -> Vec<Value> {
    let mut e = Evaluator::new();
    e.stmts(node)
}

pub struct Evaluator {
    syms: SymbolTable<Value>,
}

impl Evaluator {
    pub fn new() -> Self {
        Evaluator { syms: SymbolTable::new() }
    }

    fn push(&mut self) {
        self.syms.push();
    }

    fn pop(&mut self) {
        self.syms.pop().expect("evaluator never pops its base scope");
    }

    pub fn stmts(&mut self, node: &Node) -> Vec<Value> {
        node.children.iter().map(|stmt| self.stmt(stmt)).collect()
    }

    fn stmt(&mut self, node: &Node) -> Value {
        match node.label.as_str() {
            "Assign" => self.assign(node),
            _ => self.expr(node),
        }
    }

    fn assign(&mut self, node: &Node) -> Value {
        let value = self.expr(&node.children[1]);
        self.assign_to(&node.children[0], value)
    }

    fn assign_to(&mut self, target: &Node, value: Value) -> Value {
        match target.label.as_str() {
            "NAME" => {
                self.syms.put(ident(target), value);
                Value::Unit
            }
            "Index" => {
                let array = as_array(self.expr(&target.children[0]));
                let index = as_int(self.expr(&target.children[1]));
                array.borrow_mut()[index as usize] = value;
                Value::Unit
            }
            other => panic!("unexpected assignment target {other}"),
        }
    }

    fn expr(&mut self, node: &Node) -> Value {
        match node.label.as_str() {
            "+" | "-" | "*" | "/" | "%" => self.arith_op(node),
            "Negate" => self.unary_op(node),
            "INT" => match &node.value {
                Some(NodeValue::Int(v)) => Value::Int(*v),
                _ => panic!("malformed INT node {}", node.serialize(true)),
            },
            "FLOAT" => match &node.value {
                Some(NodeValue::Float(v)) => Value::Float(*v),
                _ => panic!("malformed FLOAT node {}", node.serialize(true)),
            },
            "STRING" => match &node.value {
                Some(NodeValue::Str(v)) => Value::Str(v.clone()),
                _ => panic!("malformed STRING node {}", node.serialize(true)),
            },
            "TRUE" | "FALSE" | "!" | "&&" | "||" | "<" | "<=" | "==" | "!=" | ">=" | ">" => {
                Value::Bool(self.boolean_expr(node))
            }
            "NAME" => self.symbol(node),
            "Call" => self.call(node),
            "Index" => self.index_expr(node),
            "Func" => Value::Function(Rc::new(node.clone())),
            "If" => self.if_expr(node),
            "NEW" => self.new_value(&node.children[0]),
            other => panic!("unexpected node {other}"),
        }
    }

    fn symbol(&mut self, node: &Node) -> Value {
        let name = ident(node);
        self.syms.get(&name).cloned().unwrap_or_else(|| panic!("unknown name, {}", node.serialize(true)))
    }

    fn new_value(&mut self, type_node: &Node) -> Value {
        match type_node.ty.as_ref().expect("checked node carries a type") {
            Type::Array { .. } => {
                let base_node = &type_node.children[0];
                let size_node = &type_node.children[1];
                let length = as_int(self.expr(size_node)).max(0);
                let items = (0..length).map(|_| self.new_value(base_node)).collect();
                Value::Array(Rc::new(RefCell::new(items)))
            }
            other => from_empty(other.unboxed().empty()),
        }
    }

    fn boolean_expr(&mut self, node: &Node) -> bool {
        match node.label.as_str() {
            "TRUE" => true,
            "FALSE" => false,
            "<" | "<=" | "==" | "!=" | ">=" | ">" => self.cmp_op(node),
            "||" => self.boolean_expr(&node.children[0]) || self.boolean_expr(&node.children[1]),
            "&&" => self.boolean_expr(&node.children[0]) && self.boolean_expr(&node.children[1]),
            "!" => !self.boolean_expr(&node.children[0]),
            other => panic!("unexpected node {other}"),
        }
    }

    fn if_expr(&mut self, node: &Node) -> Value {
        let condition = self.boolean_expr(&node.children[0]);
        let branch = if condition { &node.children[1] } else { &node.children[2] };
        self.push();
        let values = self.stmts(branch);
        self.pop();
        values.into_iter().last().unwrap_or(Value::Unit)
    }

    fn arith_op(&mut self, node: &Node) -> Value {
        let a = self.expr(&node.children[0]);
        let b = self.expr(&node.children[1]);
        let op = node.label.as_str();
        match node.children[0].ty.as_ref().expect("checked node carries a type") {
            Type::Primitive(Primitive::Int) => Value::Int(int_arith_op(op, as_int(a), as_int(b))),
            Type::Primitive(Primitive::Float) => Value::Float(float_arith_op(op, as_float(a), as_float(b))),
            Type::Primitive(Primitive::String) => Value::Str(string_arith_op(op, as_str(a), as_str(b))),
            other => panic!("unexpected node type in arith op {other}"),
        }
    }

    fn unary_op(&mut self, node: &Node) -> Value {
        let a = self.expr(&node.children[0]);
        match node.children[0].ty.as_ref().expect("checked node carries a type") {
            Type::Primitive(Primitive::Int) => Value::Int(-as_int(a)),
            Type::Primitive(Primitive::Float) => Value::Float(-as_float(a)),
            other => panic!("unexpected node type in unary op {other}"),
        }
    }

    fn cmp_op(&mut self, node: &Node) -> bool {
        let a = self.expr(&node.children[0]);
        let b = self.expr(&node.children[1]);
        let op = node.label.as_str();
        match node.children[0].ty.as_ref().expect("checked node carries a type") {
            Type::Primitive(Primitive::Int) => int_cmp_op(op, as_int(a), as_int(b)),
            Type::Primitive(Primitive::Float) => float_cmp_op(op, as_float(a), as_float(b)),
            Type::Primitive(Primitive::String) => str_cmp_op(op, &as_str(a), &as_str(b)),
            other => panic!("unexpected node type in cmp op {other}"),
        }
    }

    fn index_expr(&mut self, node: &Node) -> Value {
        let array = as_array(self.expr(&node.children[0]));
        let index = as_int(self.expr(&node.children[1]));
        array.borrow()[index as usize].clone()
    }

    /// A snapshot of the scope chain as it stands right now, flattened
    /// outer-first so inner bindings shadow — what a function value takes
    /// with it the moment it escapes into a `Closure`.
    fn capture(&self) -> Rc<HashMap<String, Value>> {
        Rc::new(self.syms.capture())
    }

    fn call(&mut self, node: &Node) -> Value {
        self.push();
        let callee = self.expr(&node.children[0]);
        let args: Vec<Value> = node.children[1].children.iter().map(|p| self.expr(p)).collect();

        let result = match callee {
            Value::Closure(fn_node, captured) => {
                let names = param_names(&fn_node);
                let mut fne = Evaluator { syms: SymbolTable::copy((*captured).clone()) };
                for (name, arg) in names.into_iter().zip(args) {
                    fne.syms.put(name, arg);
                }
                fne.syms.put("self", Value::Closure(fn_node.clone(), captured));
                let values = fne.stmts(&fn_node.children[2]);
                let ret = values.into_iter().last().unwrap_or(Value::Unit);
                close_over(&fne, &fn_node, ret)
            }
            Value::Function(fn_node) => {
                let names = param_names(&fn_node);
                for (name, arg) in names.into_iter().zip(args) {
                    self.syms.put(name, arg);
                }
                self.syms.put("self", Value::Function(fn_node.clone()));
                let values = self.stmts(&fn_node.children[2]);
                let ret = values.into_iter().last().unwrap_or(Value::Unit);
                close_over(self, &fn_node, ret)
            }
            other => panic!("cannot call {other}, it is not a function or a closure"),
        };

        self.pop();
        result
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

/// Wraps a function-valued return in a `Closure` over `fne`'s current
/// scope when the callee's declared return type is itself a function —
/// otherwise passes `ret` through unchanged. Mirrors the source's
/// `callee.FnType().Returns` check in `Call`.
fn close_over(fne: &Evaluator, fn_node: &Node, ret: Value) -> Value {
    let fn_type = fn_node.ty.as_ref().expect("checked node carries a type");
    let returns_function = matches!(fn_type, Type::Function { returns, .. } if returns.is_function());
    match (returns_function, ret) {
        (true, Value::Function(inner)) => Value::Closure(inner, fne.capture()),
        (_, ret) => ret,
    }
}

fn int_arith_op(op: &str, a: i64, b: i64) -> i64 {
    match op {
        "+" => a + b,
        "-" => a - b,
        "*" => a * b,
        "/" => {
            if b == 0 {
                panic!("divide by 0");
            }
            a / b
        }
        "%" => {
            if b == 0 {
                panic!("divide by 0");
            }
            a % b
        }
        other => panic!("unsupported op {other} for ints"),
    }
}

fn float_arith_op(op: &str, a: f64, b: f64) -> f64 {
    match op {
        "+" => a + b,
        "-" => a - b,
        "*" => a * b,
        "/" => {
            if b == 0.0 {
                panic!("divide by 0");
            }
            a / b
        }
        other => panic!("unsupported op {other} for floats"),
    }
}

fn string_arith_op(op: &str, a: String, b: String) -> String {
    match op {
        "+" => a + &b,
        other => panic!("unsupported op {other} for strings"),
    }
}

fn int_cmp_op(op: &str, a: i64, b: i64) -> bool {
    cmp_op(op, a.cmp(&b))
}

fn float_cmp_op(op: &str, a: f64, b: f64) -> bool {
    match op {
        "<" => a < b,
        "<=" => a <= b,
        "==" => a == b,
        "!=" => a != b,
        ">=" => a >= b,
        ">" => a > b,
        other => panic!("unexpected op in cmp op {other}"),
    }
}

fn str_cmp_op(op: &str, a: &str, b: &str) -> bool {
    cmp_op(op, a.cmp(b))
}

fn cmp_op(op: &str, ord: std::cmp::Ordering) -> bool {
    use std::cmp::Ordering::*;
    match op {
        "<" => ord == Less,
        "<=" => ord != Greater,
        "==" => ord == Equal,
        "!=" => ord != Equal,
        ">=" => ord != Less,
        ">" => ord == Greater,
        other => panic!("unexpected op in cmp op {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker;
    use crate::lexer::Lexer;
    use crate::parser;

    fn run(src: &str) -> Vec<Value> {
        let tokens = Lexer::new("<test>", src).lex().unwrap();
        let mut tree = parser::parse("<test>", tokens).unwrap();
        checker::check(&mut tree).unwrap();
        evaluate(&tree)
    }

    #[test]
    fn arithmetic_evaluates_left_to_right() {
        let values = run("a = 2 + 3 * 4");
        assert!(matches!(values.last(), Some(Value::Unit)));
        let tokens = Lexer::new("<test>", "2 + 3 * 4").lex().unwrap();
        let mut tree = parser::parse("<test>", tokens).unwrap();
        checker::check(&mut tree).unwrap();
        let values = evaluate(&tree);
        assert!(matches!(values.last(), Some(Value::Int(14))));
    }

    #[test]
    fn if_expression_picks_a_branch() {
        let values = run("r = if 1 < 2 { 10 } else { 20 }");
        assert!(matches!(values[0], Value::Unit));
    }

    #[test]
    fn function_call_binds_params_and_recurses_via_self() {
        let tokens = Lexer::new("<test>", "f = fn(n int) int { if n <= 1 { 1 } else { n * self(n - 1) } } f(5)").lex().unwrap();
        let mut tree = parser::parse("<test>", tokens).unwrap();
        checker::check(&mut tree).unwrap();
        let values = evaluate(&tree);
        assert!(matches!(values.last(), Some(Value::Int(120))));
    }

    #[test]
    fn array_new_index_and_assignment_share_backing_storage() {
        let tokens = Lexer::new("<test>", "a = new [3]int a[1] = 9 a[1]").lex().unwrap();
        let mut tree = parser::parse("<test>", tokens).unwrap();
        checker::check(&mut tree).unwrap();
        let values = evaluate(&tree);
        assert!(matches!(values.last(), Some(Value::Int(9))));
    }

    #[test]
    fn closures_capture_their_defining_scope() {
        let tokens = Lexer::new(
            "<test>",
            "make_adder = fn(x int) fn(int) int { fn(y int) int { x + y } } add5 = make_adder(5) add5(2)",
        )
        .lex()
        .unwrap();
        let mut tree = parser::parse("<test>", tokens).unwrap();
        checker::check(&mut tree).unwrap();
        let values = evaluate(&tree);
        assert!(matches!(values.last(), Some(Value::Int(7))));
    }
}
