//! Lowers a checked tree into `Functions`. Assumes `checker::check` has
//! already run and annotated every node's `ty`; unlike the source, this
//! generator does not re-run the checker itself (the CLI driver stages
//! check-then-generate explicitly), so there's no second `types` table here —
//! every type decision just reads `node.ty`.
//!
//! Most `Expr`-dispatch methods take an optional destination register
//! (`rslt`): when the caller already has a concrete register it wants the
//! value placed in, one is threaded through and an `IMM`/`MV` copy is
//! emitted; when `None`, the method is free to hand back whatever operand it
//! already produced (a constant, a symbol's register) without a redundant
//! copy.

use crate::node::{Node, Value as NodeValue};
use crate::table::SymbolTable;
use crate::types::{Empty, Type};

use super::{BlockId, Constant, Func, Functions, IlError, Inst, OpCode, Operand, Value};

pub fn generate(node: &Node) -> Result<Functions, IlError> {
    let mut gen = Generator::new();
    let entry = gen.funcs.get("main").expect("new() registers main").entry();
    let (last, final_blk) = gen.stmts(node, entry)?;
    gen.push_inst(final_blk, Inst::new(OpCode::Exit, last, Operand::unit(), Operand::unit()));
    Ok(gen.funcs)
}

fn ident(node: &Node) -> Result<String, IlError> {
    match (&node.label[..], &node.value) {
        ("NAME", Some(NodeValue::Name(s))) => Ok(s.clone()),
        _ => Err(IlError(format!("expected a NAME node, got {}", node.serialize(true)))),
    }
}

fn empty_constant(ty: &Type) -> Constant {
    match ty.empty() {
        Empty::Int(v) => Constant::Int(v),
        Empty::Float(v) => Constant::Float(v),
        Empty::Str(v) => Constant::Str(v),
        Empty::Bool(v) => Constant::Bool(v),
    }
}

struct Generator {
    syms: SymbolTable<Operand>,
    funcs: Functions,
    func_depth: u16,
    current: String,
    static_scope: Vec<String>,
}

impl Generator {
    fn new() -> Self {
        let mut funcs = Functions::new();
        funcs.insert(Func::new("main", Vec::new(), Type::unit(), 0, Vec::new()));
        let mut syms = SymbolTable::new();
        syms.put("unit", Operand::unit());
        syms.put(
            "print_int",
            Operand { ty: Type::function(vec![Type::int()], Type::unit()), value: Value::NativeTarget("print_int".to_string()) },
        );
        syms.put(
            "print",
            Operand { ty: Type::function(vec![Type::string()], Type::unit()), value: Value::NativeTarget("print".to_string()) },
        );
        Generator { syms, funcs, func_depth: 0, current: "main".to_string(), static_scope: Vec::new() }
    }

    fn func_mut(&mut self) -> &mut Func {
        self.funcs.get_mut(&self.current).expect("current always names a live function")
    }

    fn register(&mut self, ty: Type) -> Operand {
        Operand::register(self.func_mut().new_register(ty))
    }

    fn new_block(&mut self, name: &str) -> BlockId {
        self.func_mut().new_block(name)
    }

    fn push_inst(&mut self, blk: BlockId, inst: Inst) {
        self.func_mut().push(blk, inst);
    }

    fn link(&mut self, from: BlockId, to: BlockId) {
        self.func_mut().link(from, to);
    }

    fn jump(&mut self, from: BlockId, to: BlockId) {
        self.func_mut().jump(from, to);
    }

    fn fresh_func_name(&self) -> String {
        format!("fn-{}", self.funcs.len())
    }

    fn stmts(&mut self, node: &Node, blk: BlockId) -> Result<(Operand, BlockId), IlError> {
        let mut last = Operand::unit();
        let mut blk = blk;
        for stmt in &node.children {
            let (value, next) = self.stmt(stmt, blk)?;
            last = value;
            blk = next;
        }
        Ok((last, blk))
    }

    fn stmt(&mut self, node: &Node, blk: BlockId) -> Result<(Operand, BlockId), IlError> {
        match node.label.as_str() {
            "Assign" => self.assign(node, blk),
            _ => self.expr(node, None, blk),
        }
    }

    fn assign(&mut self, node: &Node, blk: BlockId) -> Result<(Operand, BlockId), IlError> {
        let lhs = &node.children[0];
        let rhs = &node.children[1];

        if rhs.label == "Func" {
            self.declare_function(lhs, rhs)?;
            return Ok((Operand::unit(), blk));
        }

        match lhs.label.as_str() {
            "NAME" => {
                let (value, blk) = self.expr(rhs, None, blk)?;
                let name = ident(lhs)?;
                if self.syms.top_has(&name) {
                    let existing = self.syms.get(&name).cloned().expect("top_has => present");
                    self.push_inst(blk, Inst::new(OpCode::Mv, value, Operand::unit(), existing));
                } else {
                    self.syms.put(name, value);
                }
                Ok((Operand::unit(), blk))
            }
            "Index" => {
                let (array_op, blk) = self.expr(&lhs.children[0], None, blk)?;
                let (index_op, blk) = self.expr(&lhs.children[1], None, blk)?;
                let (value_op, blk) = self.expr(rhs, None, blk)?;
                self.push_inst(blk, Inst::new(OpCode::Put, array_op, index_op, value_op));
                Ok((Operand::unit(), blk))
            }
            other => Err(IlError(format!("unexpected assignment target {other}"))),
        }
    }

    /// `name = fn(...) T { ... }`: registers a new internal function (named
    /// `fn-N`, matching the source's numbering — only `main`, the implicit
    /// top-level function, keeps a readable name), binds the source-level
    /// name to a `CallTarget` symbol in the *enclosing* scope so sibling and
    /// recursive calls resolve, then generates the body in the new
    /// function's own scope.
    fn declare_function(&mut self, name_node: &Node, func_node: &Node) -> Result<(), IlError> {
        let name = ident(name_node)?;
        let fn_type = func_node.ty.clone().expect("checked node carries a type");
        let (params, returns) = match &fn_type {
            Type::Function { params, returns } => (params.clone(), (**returns).clone()),
            other => return Err(IlError(format!("expected a function type for {name}, got {other}"))),
        };

        let internal_name = self.fresh_func_name();
        self.syms.put(name, Operand { ty: fn_type.clone(), value: Value::CallTarget(internal_name.clone()) });

        let mut static_scope = self.static_scope.clone();
        static_scope.push(self.current.clone());
        self.func_depth += 1;
        self.funcs.insert(Func::new(internal_name.clone(), params.clone(), returns.clone(), self.func_depth, static_scope.clone()));

        let saved_current = std::mem::replace(&mut self.current, internal_name.clone());
        let saved_static_scope = std::mem::replace(&mut self.static_scope, static_scope);
        self.syms.push();

        let entry = self.func_mut().entry();
        let param_names: Vec<String> =
            func_node.children[0].children.iter().map(|p| ident(&p.children[0])).collect::<Result<_, _>>()?;
        for (i, (pname, pty)) in param_names.iter().zip(params.iter()).enumerate() {
            let reg = self.register(pty.clone());
            self.push_inst(entry, Inst::new(OpCode::Prm, Operand::constant(Type::int(), Constant::Int(i as i64)), Operand::unit(), reg.clone()));
            self.syms.put(pname.clone(), reg);
        }
        self.syms.put("self", Operand { ty: fn_type, value: Value::CallTarget(internal_name) });

        let (last, final_blk) = self.stmts(&func_node.children[2], entry)?;
        self.push_inst(final_blk, Inst::new(OpCode::Rtrn, last, Operand::unit(), Operand::unit()));

        self.syms.pop().expect("pushed immediately above");
        self.current = saved_current;
        self.static_scope = saved_static_scope;
        self.func_depth -= 1;
        Ok(())
    }

    fn expr(&mut self, node: &Node, rslt: Option<Operand>, blk: BlockId) -> Result<(Operand, BlockId), IlError> {
        match node.label.as_str() {
            "+" | "-" | "*" | "/" | "%" => self.arith_op(node, rslt, blk),
            "Negate" => self.unary_op(node, rslt, blk),
            "INT" | "FLOAT" | "STRING" => self.constant(node, rslt, blk),
            "NAME" => self.symbol(node, rslt, blk),
            "Call" => self.call(node, rslt, blk),
            "Index" => self.index_expr(node, rslt, blk),
            "If" => self.if_expr(node, rslt, blk),
            "NEW" => self.new_expr(node, rslt, blk),
            other => Err(IlError(format!("unexpected node {other}"))),
        }
    }

    fn arith_op(&mut self, node: &Node, rslt: Option<Operand>, blk: BlockId) -> Result<(Operand, BlockId), IlError> {
        let (a, blk) = self.expr(&node.children[0], None, blk)?;
        let (b, blk) = self.expr(&node.children[1], None, blk)?;
        let op = match node.label.as_str() {
            "+" => OpCode::Add,
            "-" => OpCode::Sub,
            "*" => OpCode::Mul,
            "/" => OpCode::Div,
            "%" => OpCode::Mod,
            other => return Err(IlError(format!("not an arithmetic op: {other}"))),
        };
        let r = match rslt {
            Some(r) => r,
            None => self.register(node.ty.clone().expect("checked node carries a type")),
        };
        self.push_inst(blk, Inst::new(op, a, b, r.clone()));
        Ok((r, blk))
    }

    fn unary_op(&mut self, node: &Node, rslt: Option<Operand>, blk: BlockId) -> Result<(Operand, BlockId), IlError> {
        if node.label != "Negate" {
            return Err(IlError(format!("unexpected node {}", node.label)));
        }
        let operand_ty = node.children[0].ty.clone().expect("checked node carries a type");
        let zero = Operand::constant(operand_ty.clone(), empty_constant(&operand_ty));
        let (b, blk) = self.expr(&node.children[0], None, blk)?;
        let r = match rslt {
            Some(r) => r,
            None => self.register(node.ty.clone().expect("checked node carries a type")),
        };
        self.push_inst(blk, Inst::new(OpCode::Sub, zero, b, r.clone()));
        Ok((r, blk))
    }

    fn constant(&mut self, node: &Node, rslt: Option<Operand>, blk: BlockId) -> Result<(Operand, BlockId), IlError> {
        let ty = node.ty.clone().expect("checked node carries a type");
        let c = match &node.value {
            Some(NodeValue::Int(v)) => Constant::Int(*v),
            Some(NodeValue::Float(v)) => Constant::Float(*v),
            Some(NodeValue::Str(v)) => Constant::Str(v.clone()),
            _ => return Err(IlError(format!("expected a literal value on {}", node.serialize(true)))),
        };
        let operand = Operand::constant(ty, c);
        match rslt {
            None => Ok((operand, blk)),
            Some(r) => {
                self.push_inst(blk, Inst::new(OpCode::Imm, operand, Operand::unit(), r.clone()));
                Ok((r, blk))
            }
        }
    }

    fn symbol(&mut self, node: &Node, rslt: Option<Operand>, blk: BlockId) -> Result<(Operand, BlockId), IlError> {
        let name = ident(node)?;
        let sym = self.syms.get(&name).cloned().ok_or_else(|| IlError(format!("unknown name, {}", node.serialize(true))))?;
        match rslt {
            None => Ok((sym, blk)),
            Some(r) => {
                self.push_inst(blk, Inst::new(OpCode::Imm, sym, Operand::unit(), r.clone()));
                Ok((r, blk))
            }
        }
    }

    fn call(&mut self, node: &Node, rslt: Option<Operand>, blk: BlockId) -> Result<(Operand, BlockId), IlError> {
        let (callee_op, blk) = self.expr(&node.children[0], None, blk)?;
        let target = match &callee_op.value {
            Value::CallTarget(name) => name.clone(),
            Value::NativeTarget(name) => name.clone(),
            _ => {
                return Err(IlError(
                    "calls to anything other than a directly named function are not supported by the compiled backend"
                        .to_string(),
                ))
            }
        };

        let mut args = Vec::new();
        let mut blk = blk;
        for p in &node.children[1].children {
            let (op, next) = self.expr(p, None, blk)?;
            args.push(op);
            blk = next;
        }
        let ret_ty = node.ty.clone().expect("checked node carries a type");
        let r = match rslt {
            Some(r) => r,
            None => self.register(ret_ty),
        };
        self.push_inst(blk, Inst::new(OpCode::Call, Operand::call_target(target), Operand::call_args(args), r.clone()));
        Ok((r, blk))
    }

    fn index_expr(&mut self, node: &Node, rslt: Option<Operand>, blk: BlockId) -> Result<(Operand, BlockId), IlError> {
        let (array_op, blk) = self.expr(&node.children[0], None, blk)?;
        let (index_op, blk) = self.expr(&node.children[1], None, blk)?;
        let r = match rslt {
            Some(r) => r,
            None => self.register(node.ty.clone().expect("checked node carries a type")),
        };
        self.push_inst(blk, Inst::new(OpCode::Get, array_op, index_op, r.clone()));
        Ok((r, blk))
    }

    fn new_expr(&mut self, node: &Node, rslt: Option<Operand>, blk: BlockId) -> Result<(Operand, BlockId), IlError> {
        let ty = node.ty.clone().expect("checked node carries a type");
        let r = match rslt {
            Some(r) => r,
            None => self.register(ty.clone()),
        };
        match &ty {
            Type::Array { .. } => {
                let size_node = &node.children[0].children[1];
                let (size_op, blk) = self.expr(size_node, None, blk)?;
                self.push_inst(blk, Inst::new(OpCode::New, size_op, Operand::unit(), r.clone()));
                Ok((r, blk))
            }
            Type::Boxed { inner } => {
                let c = Operand::constant((**inner).clone(), empty_constant(inner));
                self.push_inst(blk, Inst::new(OpCode::Imm, c, Operand::unit(), r.clone()));
                Ok((r, blk))
            }
            other => Err(IlError(format!("cannot construct {other} with new"))),
        }
    }

    fn if_expr(&mut self, node: &Node, rslt: Option<Operand>, blk: BlockId) -> Result<(Operand, BlockId), IlError> {
        let then_blk = self.new_block("if_then");
        let else_blk = self.new_block("if_else");
        let final_blk = self.new_block("if_end");

        let condition = &node.children[0];
        let then = &node.children[1];
        let otherwise = &node.children[2];

        self.boolean_expr(condition, blk, then_blk, else_blk)?;

        let r = match rslt {
            Some(r) => r,
            None => self.register(node.ty.clone().expect("checked node carries a type")),
        };

        self.syms.push();
        let (then_last, then_blk) = self.stmts(then, then_blk)?;
        self.push_inst(then_blk, Inst::new(OpCode::Mv, then_last, Operand::unit(), r.clone()));
        self.jump(then_blk, final_blk);
        self.syms.pop().expect("pushed immediately above");

        self.syms.push();
        let (else_last, else_blk) = self.stmts(otherwise, else_blk)?;
        self.push_inst(else_blk, Inst::new(OpCode::Mv, else_last, Operand::unit(), r.clone()));
        self.jump(else_blk, final_blk);
        self.syms.pop().expect("pushed immediately above");

        Ok((r, final_blk))
    }

    /// Short-circuit lowering of a boolean expression into jumps between
    /// `then_blk` and `else_blk`; no surviving source for this specific
    /// function, built directly from the comparison/`&&`/`||`/`!` semantics
    /// the rest of the language defines.
    fn boolean_expr(&mut self, node: &Node, blk: BlockId, then_blk: BlockId, else_blk: BlockId) -> Result<(), IlError> {
        match node.label.as_str() {
            "TRUE" => {
                self.jump(blk, then_blk);
                Ok(())
            }
            "FALSE" => {
                self.jump(blk, else_blk);
                Ok(())
            }
            "!" => self.boolean_expr(&node.children[0], blk, else_blk, then_blk),
            "&&" => {
                let mid = self.new_block("and_rhs");
                self.boolean_expr(&node.children[0], blk, mid, else_blk)?;
                self.boolean_expr(&node.children[1], mid, then_blk, else_blk)
            }
            "||" => {
                let mid = self.new_block("or_rhs");
                self.boolean_expr(&node.children[0], blk, then_blk, mid)?;
                self.boolean_expr(&node.children[1], mid, then_blk, else_blk)
            }
            "<" | "<=" | "==" | "!=" | ">=" | ">" => self.cmp_branch(node, blk, then_blk, else_blk),
            other => Err(IlError(format!("unexpected node in boolean expression: {other}"))),
        }
    }

    fn cmp_branch(&mut self, node: &Node, blk: BlockId, then_blk: BlockId, else_blk: BlockId) -> Result<(), IlError> {
        let (a, blk) = self.expr(&node.children[0], None, blk)?;
        let (b, blk) = self.expr(&node.children[1], None, blk)?;
        let op = match node.label.as_str() {
            "<" => OpCode::IfLt,
            "<=" => OpCode::IfLe,
            "==" => OpCode::IfEq,
            "!=" => OpCode::IfNe,
            ">=" => OpCode::IfGe,
            ">" => OpCode::IfGt,
            other => return Err(IlError(format!("not a comparison op: {other}"))),
        };
        let then_name = self.funcs.get(&self.current).expect("current function exists").block(then_blk).name.clone();
        self.push_inst(blk, Inst::new(op, a, b, Operand::jump_target(then_name)));
        self.link(blk, then_blk);
        self.jump(blk, else_blk);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker;
    use crate::lexer::Lexer;
    use crate::parser;

    fn generated(src: &str) -> Functions {
        let tokens = Lexer::new("<test>", src).lex().unwrap();
        let mut tree = parser::parse("<test>", tokens).unwrap();
        checker::check(&mut tree).unwrap();
        generate(&tree).unwrap()
    }

    #[test]
    fn arithmetic_emits_one_function() {
        let funcs = generated("a = 1 + 2");
        assert_eq!(funcs.len(), 1);
        let main = funcs.get("main").unwrap();
        assert!(main.blocks().iter().any(|b| b.insts.iter().any(|i| i.op == OpCode::Add)));
    }

    #[test]
    fn function_declaration_registers_a_new_function() {
        let funcs = generated("f = fn(a int) int { a } r = f(3)");
        assert_eq!(funcs.len(), 2);
        assert!(funcs.get("fn-1").is_some());
        let main = funcs.get("main").unwrap();
        let call = main.blocks().iter().flat_map(|b| b.insts.iter()).find(|i| i.op == OpCode::Call).expect("a call was generated");
        assert!(matches!(&call.b.value, Value::CallArgs(args) if args.len() == 1), "CALL must carry its args on b, got {:?}", call.b.value);
    }

    #[test]
    fn callee_binds_its_parameters_via_prm_in_the_entry_block() {
        let funcs = generated("f = fn(a int, b int) int { a + b } r = f(2, 5)");
        let callee = funcs.get("fn-1").unwrap();
        let entry = callee.blocks().first().expect("the function has an entry block");
        let prms: Vec<_> = entry.insts.iter().filter(|i| i.op == OpCode::Prm).collect();
        assert_eq!(prms.len(), 2, "expected one PRM per parameter in the entry block, got {:?}", entry.insts);
        for (i, prm) in prms.iter().enumerate() {
            assert!(matches!(&prm.a.value, Value::Constant(Constant::Int(n)) if *n == i as i64));
        }
    }

    #[test]
    fn if_expression_lowers_to_three_blocks_and_a_branch() {
        let funcs = generated("r = if 1 < 2 { 1 } else { 2 }");
        let main = funcs.get("main").unwrap();
        assert!(main.blocks().iter().any(|b| b.insts.iter().any(|i| i.op == OpCode::IfLt)));
        assert!(main.blocks().len() >= 4); // entry + then + else + final
    }

    #[test]
    fn array_new_and_index_emit_new_and_get() {
        let funcs = generated("a = new [3]int x = a[0]");
        let main = funcs.get("main").unwrap();
        assert!(main.blocks().iter().any(|b| b.insts.iter().any(|i| i.op == OpCode::New)));
        assert!(main.blocks().iter().any(|b| b.insts.iter().any(|i| i.op == OpCode::Get)));
    }

    #[test]
    fn array_assignment_emits_put() {
        let funcs = generated("a = new [3]int a[0] = 5");
        let main = funcs.get("main").unwrap();
        assert!(main.blocks().iter().any(|b| b.insts.iter().any(|i| i.op == OpCode::Put)));
    }

    #[test]
    fn print_int_is_callable_as_a_native_target() {
        let funcs = generated("print_int(1)");
        let main = funcs.get("main").unwrap();
        let call = main.blocks().iter().flat_map(|b| b.insts.iter()).find(|i| i.op == OpCode::Call).expect("a call was generated");
        assert!(matches!(&call.a.value, Value::CallTarget(name) if name == "print_int"));
    }
}
