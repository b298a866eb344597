//! The type checker: walks the parser's `Stmts` tree bottom-up, decorating
//! each node's `ty` field and collecting every error it finds rather than
//! stopping at the first one. Two scoped tables track term bindings (`syms`)
//! and type names (`types`); they're pushed and popped together so a
//! function body sees both its parameters and any nested type aliases (none
//! exist yet, but the symmetry is cheap and mirrors the source directly).

use std::fmt;

use crate::node::{Node, Value};
use crate::table::SymbolTable;
use crate::types::{Type, PRIMITIVE_NAMES};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeError(pub String);

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for TypeError {}

/// A bundle of every error found during one check, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeErrors(Vec<TypeError>);

impl TypeErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TypeError> {
        self.0.iter()
    }

    fn push(&mut self, message: impl Into<String>) {
        self.0.push(TypeError(message.into()));
    }

    fn extend(&mut self, other: TypeErrors) {
        self.0.extend(other.0);
    }
}

impl From<String> for TypeErrors {
    fn from(message: String) -> Self {
        TypeErrors(vec![TypeError(message)])
    }
}

impl fmt::Display for TypeErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|e| format!("\"{e}\"")).collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

impl std::error::Error for TypeErrors {}

fn describe(ty: &Option<Type>) -> String {
    ty.as_ref().map(Type::to_string).unwrap_or_else(|| "<untyped>".to_string())
}

fn matches(ty: Option<&Type>, candidates: &[Type]) -> bool {
    ty.is_some_and(|t| candidates.contains(t))
}

/// Reads the `NAME` leaf's string payload; every other label is a checker
/// bug, not a user error, since the grammar never builds one elsewhere.
fn ident(node: &Node) -> Result<String, TypeErrors> {
    match (&node.label[..], &node.value) {
        ("NAME", Some(Value::Name(s))) => Ok(s.clone()),
        _ => Err(TypeErrors::from(format!("expected a NAME node, got {}", node.serialize(true)))),
    }
}

fn primitive_named(name: &str) -> Type {
    match name {
        "unit" => Type::unit(),
        "string" => Type::string(),
        "float" => Type::float(),
        "int" => Type::int(),
        "boolean" => Type::boolean(),
        other => unreachable!("not a predeclared primitive: {other}"),
    }
}

/// Checks a whole program's `Stmts` root, returning every error found.
pub fn check(node: &mut Node) -> Result<(), TypeErrors> {
    let mut checker = Checker::new();
    let errors = checker.stmts(node);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

struct Checker {
    syms: SymbolTable<Type>,
    types: SymbolTable<Type>,
    func: Option<Type>,
}

impl Checker {
    fn new() -> Self {
        let mut types = SymbolTable::new();
        for name in PRIMITIVE_NAMES {
            types.put(name, primitive_named(name));
        }
        let mut syms = SymbolTable::new();
        syms.put("unit", Type::unit());
        syms.put("print_int", Type::function(vec![Type::int()], Type::unit()));
        Checker { syms, types, func: None }
    }

    fn push(&mut self) {
        self.syms.push();
        self.types.push();
    }

    fn pop(&mut self) {
        self.types.pop().expect("checker never pops its base scope");
        self.syms.pop().expect("checker never pops its base scope");
    }

    fn stmts(&mut self, node: &mut Node) -> TypeErrors {
        assert_eq!(node.label, "Stmts", "expected a Stmts node");
        let mut errors = TypeErrors::default();
        for stmt in &mut node.children {
            errors.extend(self.stmt(stmt));
            if stmt.ty.is_none() {
                errors.push(format!("statement not well typed: {}", stmt.serialize(true)));
            }
        }
        if errors.is_empty() {
            node.ty = Some(Type::unit());
        }
        errors
    }

    fn stmt(&mut self, node: &mut Node) -> TypeErrors {
        match node.label.as_str() {
            "Assign" => self.assign(node),
            _ => self.expr(node),
        }
    }

    fn assign(&mut self, node: &mut Node) -> TypeErrors {
        let (name, rhs) = {
            let (a, b) = node.children.split_at_mut(1);
            (&mut a[0], &mut b[0])
        };
        let mut errors = self.indexed(name);
        errors.extend(self.expr(rhs));
        if errors.is_empty() {
            if name.ty.is_none() {
                match ident(name) {
                    Ok(sym) => {
                        name.ty = rhs.ty.clone();
                        self.syms.put(sym, rhs.ty.clone().expect("rhs checked above"));
                        node.ty = Some(Type::unit());
                    }
                    Err(e) => errors.extend(e),
                }
            } else if name.ty != rhs.ty {
                errors.push(format!("assignee did not agree in type with the assigned value: {}", node.serialize(true)));
            } else {
                node.ty = Some(Type::unit());
            }
        }
        errors
    }

    /// Checks a node appearing in assignment-target position: a bare name,
    /// an array index, or (once a parser production reaches it) a box
    /// dereference.
    fn indexed(&mut self, node: &mut Node) -> TypeErrors {
        let mut errors = TypeErrors::default();
        match node.label.as_str() {
            "Deref" => {
                errors.extend(self.symbol(&mut node.children[0]));
                if errors.is_empty() {
                    node.ty = node.children[0].ty.as_ref().map(Type::unboxed);
                }
            }
            "NAME" => errors.extend(self.try_top_symbol(node)),
            "Index" => {
                let (base, idx) = {
                    let (a, b) = node.children.split_at_mut(1);
                    (&mut a[0], &mut b[0])
                };
                errors.extend(self.indexed(base));
                errors.extend(self.indexer(idx));
                if base.label == "NAME" {
                    errors.extend(self.symbol(base));
                }
                match base.ty.clone() {
                    Some(Type::Array { base: elem }) => node.ty = Some(*elem),
                    _ => errors.push(format!("expected an array type, got {}", describe(&base.ty))),
                }
            }
            _ => errors.push(format!("unexpected node in assignment target: {}", node.serialize(true))),
        }
        errors
    }

    fn indexer(&mut self, node: &mut Node) -> TypeErrors {
        let mut errors = self.expr(node);
        if !errors.is_empty() {
            return errors;
        }
        if node.ty != Some(Type::int()) {
            errors.push(format!("expected an int index, got {}", describe(&node.ty)));
        }
        errors
    }

    fn expr(&mut self, node: &mut Node) -> TypeErrors {
        match node.label.as_str() {
            "+" | "-" | "*" | "/" | "%" => self.arith_op(node),
            "Negate" | "Deref" => self.unary_op(node),
            "INT" => {
                node.ty = Some(Type::int());
                TypeErrors::default()
            }
            "FLOAT" => {
                node.ty = Some(Type::float());
                TypeErrors::default()
            }
            "STRING" => {
                node.ty = Some(Type::string());
                TypeErrors::default()
            }
            "NAME" => self.symbol(node),
            "Call" => self.call(node),
            "Index" => self.index(node),
            "Func" => self.function(node),
            "If" => self.if_expr(node),
            "NEW" => self.new_expr(node),
            other => TypeErrors::from(format!("unexpected node {other}")),
        }
    }

    fn new_expr(&mut self, node: &mut Node) -> TypeErrors {
        let new_type = match self.type_of(&mut node.children[0]) {
            Ok(t) => t,
            Err(e) => return e,
        };
        if new_type.is_function() {
            return TypeErrors::from(format!("cannot construct a function with new: {}", node.serialize(true)));
        }
        node.ty = Some(match new_type {
            Type::Array { .. } => new_type,
            other => Type::boxed(other),
        });
        TypeErrors::default()
    }

    fn boolean_expr(&mut self, node: &mut Node) -> TypeErrors {
        match node.label.as_str() {
            "TRUE" | "FALSE" => self.boolean_constant(node),
            "<" | "<=" | "==" | "!=" | ">=" | ">" => self.cmp_op(node),
            "||" | "&&" => self.and_or(node),
            "!" => self.not_op(node),
            other => TypeErrors::from(format!("unexpected node {other}")),
        }
    }

    fn index(&mut self, node: &mut Node) -> TypeErrors {
        let (indexed, idx) = {
            let (a, b) = node.children.split_at_mut(1);
            (&mut a[0], &mut b[0])
        };
        let errors = self.expr(indexed);
        if !errors.is_empty() {
            return errors;
        }
        let mut errors = self.expr(idx);
        if !errors.is_empty() {
            return errors;
        }
        let base = match indexed.ty.clone() {
            Some(Type::Array { base }) => *base,
            _ => {
                errors.push(format!("expected an array type, got {}", indexed.serialize(true)));
                return errors;
            }
        };
        if idx.ty != Some(Type::int()) {
            errors.push(format!("array index expected int, got {}", idx.serialize(true)));
            return errors;
        }
        node.ty = Some(base);
        errors
    }

    fn call(&mut self, node: &mut Node) -> TypeErrors {
        let (callee, params) = {
            let (a, b) = node.children.split_at_mut(1);
            (&mut a[0], &mut b[0])
        };
        let errors = self.expr(callee);
        if !errors.is_empty() {
            return errors;
        }
        let param_types = match self.params(params) {
            Ok(t) => t,
            Err(e) => return e,
        };
        let (expected, returns) = match callee.ty.clone() {
            Some(Type::Function { params, returns }) => (params, *returns),
            other => return TypeErrors::from(format!("expected a function type, got {}", describe(&other))),
        };
        if param_types.len() != expected.len() {
            return TypeErrors::from(format!("callee expected {} params, got {}", expected.len(), param_types.len()));
        }
        for (want, got) in expected.iter().zip(param_types.iter()) {
            if want != got {
                return TypeErrors::from(format!("callee expected a {want} param, got {got}"));
            }
        }
        node.ty = Some(returns);
        TypeErrors::default()
    }

    fn params(&mut self, node: &mut Node) -> Result<Vec<Type>, TypeErrors> {
        let mut types = Vec::new();
        for kid in &mut node.children {
            let errors = self.expr(kid);
            if !errors.is_empty() {
                return Err(errors);
            }
            types.push(kid.ty.clone().expect("expr leaves a type on success"));
        }
        node.ty = Some(Type::unit());
        Ok(types)
    }

    fn function(&mut self, node: &mut Node) -> TypeErrors {
        self.push();
        let errors = self.function_body(node);
        self.pop();
        errors
    }

    fn function_body(&mut self, node: &mut Node) -> TypeErrors {
        let param_types = match self.param_decls(&mut node.children[0]) {
            Ok(t) => t,
            Err(e) => return e,
        };
        let return_type = match self.type_of(&mut node.children[1]) {
            Ok(t) => t,
            Err(e) => return e,
        };
        let f_type = Type::function(param_types, return_type.clone());

        let old_fn = self.func.replace(f_type.clone());
        self.syms.put("self", f_type.clone());
        let mut errors = self.stmts(&mut node.children[2]);
        self.func = old_fn;
        if !errors.is_empty() {
            return errors;
        }

        let last_ty = node.children[2].get(-1).and_then(|n| n.ty.clone());
        if last_ty.as_ref() != Some(&return_type) {
            errors.push(format!(
                "function type {f_type} does not agree with its last expression's type {}",
                describe(&last_ty)
            ));
            return errors;
        }

        node.ty = Some(f_type);
        errors
    }

    fn if_expr(&mut self, node: &mut Node) -> TypeErrors {
        let (cond, rest) = node.children.split_at_mut(1);
        let (then_block, otherwise) = rest.split_at_mut(1);
        let cond = &mut cond[0];
        let then_block = &mut then_block[0];
        let otherwise = &mut otherwise[0];

        let mut errors = self.boolean_expr(cond);
        self.push();
        errors.extend(self.stmts(then_block));
        self.pop();
        self.push();
        errors.extend(self.stmts(otherwise));
        self.pop();

        if !errors.is_empty() {
            return errors;
        }

        let then_ty = then_block.get(-1).and_then(|n| n.ty.clone());
        let otherwise_ty = otherwise.get(-1).and_then(|n| n.ty.clone());
        then_block.ty = then_ty.clone();
        otherwise.ty = otherwise_ty.clone();

        if then_ty != otherwise_ty {
            errors.push(format!("branches of if expression do not agree in type: {}", node.serialize(true)));
            return errors;
        }

        node.ty = then_ty;
        errors
    }

    fn type_of(&mut self, node: &mut Node) -> Result<Type, TypeErrors> {
        match node.label.as_str() {
            "TypeName" => self.type_name(node),
            "FuncType" => self.func_type(node),
            "ArrayType" => self.array_type(node),
            "BoxType" => self.box_type(node),
            other => Err(TypeErrors::from(format!("unexpected type node {other}"))),
        }
    }

    fn type_name(&mut self, node: &mut Node) -> Result<Type, TypeErrors> {
        let sym = ident(&node.children[0])?;
        match self.types.get(&sym) {
            Some(t) => {
                let t = t.clone();
                node.ty = Some(t.clone());
                node.children[0].ty = Some(t.clone());
                Ok(t)
            }
            None => Err(TypeErrors::from(format!("type {sym} undeclared"))),
        }
    }

    fn box_type(&mut self, node: &mut Node) -> Result<Type, TypeErrors> {
        let inner = self.type_of(&mut node.children[0])?;
        let t = Type::boxed(inner);
        node.ty = Some(t.clone());
        Ok(t)
    }

    fn func_type(&mut self, node: &mut Node) -> Result<Type, TypeErrors> {
        let (params_node, ret_node) = {
            let (a, b) = node.children.split_at_mut(1);
            (&mut a[0], &mut b[0])
        };
        let params = self.type_params(params_node)?;
        let ret = self.type_of(ret_node)?;
        let t = Type::function(params, ret);
        node.ty = Some(t.clone());
        Ok(t)
    }

    fn array_type(&mut self, node: &mut Node) -> Result<Type, TypeErrors> {
        let (base_node, size_node) = {
            let (a, b) = node.children.split_at_mut(1);
            (&mut a[0], &mut b[0])
        };
        let base = self.type_of(base_node)?;
        let errors = self.expr(size_node);
        if !errors.is_empty() {
            return Err(errors);
        }
        if size_node.ty != Some(Type::int()) {
            return Err(TypeErrors::from(format!("expected an integer array size, got {}", size_node.serialize(true))));
        }
        let t = Type::array(base);
        node.ty = Some(t.clone());
        Ok(t)
    }

    fn type_params(&mut self, node: &mut Node) -> Result<Vec<Type>, TypeErrors> {
        let mut types = Vec::new();
        for kid in &mut node.children {
            types.push(self.type_of(kid)?);
        }
        node.ty = Some(Type::unit());
        Ok(types)
    }

    fn param_decls(&mut self, node: &mut Node) -> Result<Vec<Type>, TypeErrors> {
        let mut types = Vec::new();
        for kid in &mut node.children {
            let (name_node, type_node) = {
                let (a, b) = kid.children.split_at_mut(1);
                (&mut a[0], &mut b[0])
            };
            let name = ident(name_node)?;
            let t = self.type_of(type_node)?;
            self.syms.put(name, t.clone());
            name_node.ty = Some(t.clone());
            kid.ty = Some(t.clone());
            types.push(t);
        }
        node.ty = Some(Type::unit());
        Ok(types)
    }

    /// Binds `node`'s type only if it's already declared in the *innermost*
    /// scope; leaves it untyped otherwise, signalling "fresh" to `assign`.
    fn try_top_symbol(&mut self, node: &mut Node) -> TypeErrors {
        let sym = match ident(node) {
            Ok(s) => s,
            Err(e) => return e,
        };
        if self.syms.top_has(&sym) {
            node.ty = self.syms.get(&sym).cloned();
        }
        TypeErrors::default()
    }

    fn try_symbol(&mut self, node: &mut Node) -> TypeErrors {
        let sym = match ident(node) {
            Ok(s) => s,
            Err(e) => return e,
        };
        if let Some(t) = self.syms.get(&sym) {
            node.ty = Some(t.clone());
        }
        TypeErrors::default()
    }

    fn symbol(&mut self, node: &mut Node) -> TypeErrors {
        let errors = self.try_symbol(node);
        if !errors.is_empty() {
            return errors;
        }
        if node.ty.is_none() {
            return TypeErrors::from(format!("symbol {} undeclared", node.serialize(true)));
        }
        TypeErrors::default()
    }

    fn arith_op(&mut self, node: &mut Node) -> TypeErrors {
        let (a, b) = {
            let (x, y) = node.children.split_at_mut(1);
            (&mut x[0], &mut y[0])
        };
        let mut errors = self.expr(a);
        errors.extend(self.expr(b));
        if errors.is_empty() {
            if a.ty != b.ty {
                errors.push(format!("{} and {} do not agree in type", a.serialize(true), b.serialize(true)));
            }
            if a.ty == Some(Type::string()) && node.label == "+" {
                // string concatenation is the one arithmetic op strings support
            } else if a.ty == Some(Type::float()) && node.label == "%" {
                errors.push(format!("type {} does not support %", describe(&a.ty)));
            } else if !matches(a.ty.as_ref(), &[Type::int(), Type::float()]) {
                errors.push(format!("type {} does not support arithmetic operators", describe(&a.ty)));
            }
        }
        if errors.is_empty() {
            node.ty = a.ty.clone();
        }
        errors
    }

    fn unary_op(&mut self, node: &mut Node) -> TypeErrors {
        let mut errors = self.expr(&mut node.children[0]);
        match node.label.as_str() {
            "Negate" => {
                if errors.is_empty() && !matches(node.children[0].ty.as_ref(), &[Type::int(), Type::float()]) {
                    errors.push(format!("type {} does not support arithmetic operators", describe(&node.children[0].ty)));
                }
                if errors.is_empty() {
                    node.ty = node.children[0].ty.clone();
                }
            }
            "Deref" => match node.children[0].ty.clone() {
                Some(Type::Boxed { inner }) => {
                    if errors.is_empty() {
                        node.ty = Some(*inner);
                    }
                }
                other => errors.push(format!("type {} does not support dereference", describe(&other))),
            },
            _ => errors.push(format!("unexpected node {}", node.serialize(true))),
        }
        errors
    }

    fn and_or(&mut self, node: &mut Node) -> TypeErrors {
        let (a, b) = {
            let (x, y) = node.children.split_at_mut(1);
            (&mut x[0], &mut y[0])
        };
        let mut errors = self.boolean_expr(a);
        errors.extend(self.boolean_expr(b));
        if errors.is_empty() {
            if a.ty != b.ty {
                errors.push(format!("{} and {} do not agree in type", a.serialize(true), b.serialize(true)));
            }
            if !matches(a.ty.as_ref(), &[Type::boolean()]) {
                errors.push(format!("type {} does not support boolean operators", describe(&a.ty)));
            }
        }
        if errors.is_empty() {
            node.ty = Some(Type::boolean());
        }
        errors
    }

    fn not_op(&mut self, node: &mut Node) -> TypeErrors {
        let mut errors = self.boolean_expr(&mut node.children[0]);
        if errors.is_empty() && !matches(node.children[0].ty.as_ref(), &[Type::boolean()]) {
            errors.push(format!("type {} does not support boolean operators", describe(&node.children[0].ty)));
        }
        if errors.is_empty() {
            node.ty = Some(Type::boolean());
        }
        errors
    }

    fn cmp_op(&mut self, node: &mut Node) -> TypeErrors {
        let (a, b) = {
            let (x, y) = node.children.split_at_mut(1);
            (&mut x[0], &mut y[0])
        };
        let mut errors = self.expr(a);
        errors.extend(self.expr(b));
        if errors.is_empty() {
            if a.ty != b.ty {
                errors.push(format!("{} and {} do not agree in type", a.serialize(true), b.serialize(true)));
            }
            if !matches(a.ty.as_ref(), &[Type::int(), Type::float(), Type::string()]) {
                errors.push(format!("type {} does not support comparison operators", describe(&a.ty)));
            }
        }
        if errors.is_empty() {
            node.ty = Some(Type::boolean());
        }
        errors
    }

    fn boolean_constant(&mut self, node: &mut Node) -> TypeErrors {
        node.ty = Some(Type::boolean());
        TypeErrors::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    fn checked(src: &str) -> Node {
        let tokens = crate::lexer::Lexer::new("<test>", src).lex().unwrap();
        let mut tree = parser::parse("<test>", tokens).unwrap();
        check(&mut tree).unwrap();
        tree
    }

    #[test]
    fn assignment_binds_the_name_and_rhs_type() {
        let tree = checked("x = 1");
        let assign = &tree.children[0];
        assert_eq!(assign.ty, Some(Type::unit()));
        assert_eq!(assign.children[0].ty, Some(Type::int()));
        assert_eq!(assign.children[1].ty, Some(Type::int()));
    }

    #[test]
    fn arithmetic_requires_matching_operand_types() {
        let tokens = crate::lexer::Lexer::new("<test>", "x = 1 + 2").lex().unwrap();
        let mut tree = parser::parse("<test>", tokens).unwrap();
        assert!(check(&mut tree).is_ok());
    }

    #[test]
    fn mismatched_arithmetic_operands_are_rejected() {
        let tokens = crate::lexer::Lexer::new("<test>", "x = \"a\" + 1").lex().unwrap();
        let mut tree = parser::parse("<test>", tokens).unwrap();
        let errs = check(&mut tree).unwrap_err();
        assert!(!errs.is_empty());
    }

    #[test]
    fn if_branches_must_agree_in_type() {
        let tokens = crate::lexer::Lexer::new("<test>", "x = if true { 1 } else { \"a\" }").lex().unwrap();
        let mut tree = parser::parse("<test>", tokens).unwrap();
        assert!(check(&mut tree).is_err());
    }

    #[test]
    fn function_literal_gets_a_function_type() {
        let tree = checked("f = fn(a int, b int) int { a + b }");
        match &tree.children[0].children[1].ty {
            Some(Type::Function { params, returns }) => {
                assert_eq!(params.len(), 2);
                assert_eq!(**returns, Type::int());
            }
            other => panic!("expected a function type, got {other:?}"),
        }
    }

    #[test]
    fn calling_with_the_wrong_argument_count_is_rejected() {
        let tokens = crate::lexer::Lexer::new("<test>", "f = fn(a int) int { a } r = f(1, 2)").lex().unwrap();
        let mut tree = parser::parse("<test>", tokens).unwrap();
        assert!(check(&mut tree).is_err());
    }

    #[test]
    fn new_int_is_boxed() {
        let tree = checked("b = new int");
        assert_eq!(tree.children[0].children[1].ty, Some(Type::boxed(Type::int())));
    }

    #[test]
    fn undeclared_symbols_are_rejected() {
        let tokens = crate::lexer::Lexer::new("<test>", "x = y + 1").lex().unwrap();
        let mut tree = parser::parse("<test>", tokens).unwrap();
        assert!(check(&mut tree).is_err());
    }
}
