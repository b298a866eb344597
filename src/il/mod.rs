//! The intermediate language: a control-flow graph of basic blocks per
//! function, each block a straight-line list of three-address instructions.
//! This is the hand-off point between the type-checked tree (`generate`, in
//! `gen.rs`) and the x86-32 emitter (`src/asm`).

pub mod gen;

use std::collections::HashMap;
use std::fmt;

use crate::types::Type;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IlError(pub String);

impl fmt::Display for IlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for IlError {}

/// All functions produced by a compilation, in the order they were declared.
/// A plain `HashMap` would iterate in an unspecified order; emission needs to
/// be deterministic, so insertion order is tracked alongside the map.
#[derive(Debug, Clone, Default)]
pub struct Functions {
    order: Vec<String>,
    by_name: HashMap<String, Func>,
}

impl Functions {
    pub fn new() -> Self {
        Functions { order: Vec::new(), by_name: HashMap::new() }
    }

    pub fn insert(&mut self, func: Func) {
        if !self.by_name.contains_key(&func.name) {
            self.order.push(func.name.clone());
        }
        self.by_name.insert(func.name.clone(), func);
    }

    pub fn get(&self, name: &str) -> Option<&Func> {
        self.by_name.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Func> {
        self.by_name.get_mut(name)
    }

    /// Iterates functions in declaration order, the order the emitter must
    /// honour for byte-identical output across runs.
    pub fn iter(&self) -> impl Iterator<Item = &Func> {
        self.order.iter().map(move |name| &self.by_name[name])
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// An index into a `Func`'s block arena, replacing the source's `*Block`
/// pointers (Rust's borrow checker won't let a block hold a live pointer to
/// its neighbours while the owning `Func` is itself being mutated).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub usize);

#[derive(Debug, Clone, Default)]
pub struct Block {
    pub name: String,
    pub insts: Vec<Inst>,
    pub next: Vec<BlockId>,
    pub prev: Vec<BlockId>,
    pub closed: bool,
}

impl Block {
    fn new(name: impl Into<String>) -> Self {
        Block { name: name.into(), insts: Vec::new(), next: Vec::new(), prev: Vec::new(), closed: false }
    }
}

/// One function: its basic blocks, the registers it has allocated, and the
/// lexical nesting (`static_scope`) it was declared inside of — needed by the
/// emitter to compute display-chain addressing for non-local names.
#[derive(Debug, Clone)]
pub struct Func {
    pub name: String,
    pub param_types: Vec<Type>,
    pub return_type: Type,
    pub scope: u16,
    pub static_scope: Vec<String>,
    blocks: Vec<Block>,
    by_name: HashMap<String, BlockId>,
    pub registers: Vec<Register>,
}

impl Func {
    pub fn new(name: impl Into<String>, param_types: Vec<Type>, return_type: Type, scope: u16, static_scope: Vec<String>) -> Self {
        let name = name.into();
        let mut func = Func {
            name: name.clone(),
            param_types,
            return_type,
            scope,
            static_scope,
            blocks: Vec::new(),
            by_name: HashMap::new(),
            registers: Vec::new(),
        };
        let entry = func.new_block(format!("{name}_entry"));
        func.by_name.insert("entry".to_string(), entry);
        func
    }

    pub fn entry(&self) -> BlockId {
        self.by_name["entry"]
    }

    pub fn new_block(&mut self, name: impl Into<String>) -> BlockId {
        let id = BlockId(self.blocks.len());
        // suffixed with the block's own index: callers pass a descriptive
        // prefix (`"if_then"`), but that prefix recurs across sibling and
        // nested `if` expressions in the same function, and block names
        // become assembly labels that must be unique.
        let name = format!("{}_{}", name.into(), id.0);
        self.by_name.insert(name.clone(), id);
        self.blocks.push(Block::new(name));
        id
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id.0]
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn push(&mut self, id: BlockId, inst: Inst) {
        self.blocks[id.0].insts.push(inst);
    }

    pub fn new_register(&mut self, ty: Type) -> Register {
        let reg = Register { id: self.registers.len() as u32, ty, scope: self.scope };
        self.registers.push(reg.clone());
        reg
    }

    /// Records a control-flow edge from `from` to `to` without emitting a
    /// jump instruction — used for fallthrough between sequential blocks.
    pub fn link(&mut self, from: BlockId, to: BlockId) {
        self.blocks[from.0].next.push(to);
        self.blocks[to.0].prev.push(from);
        self.blocks[from.0].closed = true;
    }

    /// Links `from` to `to` and appends the `J` instruction that makes the
    /// edge explicit in the emitted assembly. Unconditional jumps and `If`'s
    /// three-way lowering both go through this.
    pub fn jump(&mut self, from: BlockId, to: BlockId) {
        let target = self.blocks[to.0].name.clone();
        self.link(from, to);
        self.push(from, Inst::new(OpCode::J, Operand::jump_target(target), Operand::unit(), Operand::unit()));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Register {
    pub id: u32,
    pub ty: Type,
    pub scope: u16,
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Int(v) => write!(f, "{v}"),
            Constant::Float(v) => write!(f, "{v}"),
            Constant::Str(v) => write!(f, "{v:?}"),
            Constant::Bool(v) => write!(f, "{v}"),
        }
    }
}

/// The right-hand side of an `Operand`: either a value produced by a prior
/// instruction, a literal, or one of the special-purpose tags the generator
/// attaches to `Call`/`J`/`New`/`Get`/`Put` operands.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Unit,
    Register(Register),
    Constant(Constant),
    CallArgs(Vec<Operand>),
    CallTarget(String),
    JumpTarget(String),
    NativeTarget(String),
    OffsetLength(i64, i64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Operand {
    pub ty: Type,
    pub value: Value,
}

impl Operand {
    pub fn unit() -> Operand {
        Operand { ty: Type::unit(), value: Value::Unit }
    }

    pub fn register(reg: Register) -> Operand {
        Operand { ty: reg.ty.clone(), value: Value::Register(reg) }
    }

    pub fn constant(ty: Type, c: Constant) -> Operand {
        Operand { ty, value: Value::Constant(c) }
    }

    pub fn call_args(args: Vec<Operand>) -> Operand {
        Operand { ty: Type::unit(), value: Value::CallArgs(args) }
    }

    pub fn call_target(name: impl Into<String>) -> Operand {
        Operand { ty: Type::unit(), value: Value::CallTarget(name.into()) }
    }

    pub fn jump_target(name: impl Into<String>) -> Operand {
        Operand { ty: Type::label(), value: Value::JumpTarget(name.into()) }
    }

    pub fn native_target(name: impl Into<String>) -> Operand {
        Operand { ty: Type::unit(), value: Value::NativeTarget(name.into()) }
    }

    pub fn off_len(offset: i64, length: i64) -> Operand {
        Operand { ty: Type::unit(), value: Value::OffsetLength(offset, length) }
    }

    pub fn is_unit(&self) -> bool {
        matches!(self.value, Value::Unit)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Value::Unit => Ok(()),
            Value::Register(r) => write!(f, "{r}"),
            Value::Constant(c) => write!(f, "{c}"),
            Value::CallArgs(args) => {
                let parts: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                write!(f, "({})", parts.join(", "))
            }
            Value::CallTarget(name) => f.write_str(name),
            Value::JumpTarget(name) => f.write_str(name),
            Value::NativeTarget(name) => f.write_str(name),
            Value::OffsetLength(off, len) => write!(f, "{off}:{len}"),
        }
    }
}

/// The 3-address operation codes, numbered exactly as the source's `Ops`
/// table so that dumps (`-I`) compare the same way across both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    Invalid = 0,
    Imm = 1,
    Mv = 2,
    Add = 3,
    Sub = 4,
    Mul = 5,
    Div = 6,
    Mod = 7,
    Call = 8,
    Prm = 9,
    Rtrn = 10,
    Exit = 11,
    Nop = 12,
    J = 13,
    IfEq = 14,
    IfNe = 15,
    IfLt = 16,
    IfLe = 17,
    IfGt = 18,
    IfGe = 19,
    New = 20,
    Get = 21,
    Put = 22,
    Size = 23,
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OpCode::Invalid => "INVALID",
            OpCode::Imm => "IMM",
            OpCode::Mv => "MV",
            OpCode::Add => "ADD",
            OpCode::Sub => "SUB",
            OpCode::Mul => "MUL",
            OpCode::Div => "DIV",
            OpCode::Mod => "MOD",
            OpCode::Call => "CALL",
            OpCode::Prm => "PRM",
            OpCode::Rtrn => "RTRN",
            OpCode::Exit => "EXIT",
            OpCode::Nop => "NOP",
            OpCode::J => "J",
            OpCode::IfEq => "IFEQ",
            OpCode::IfNe => "IFNE",
            OpCode::IfLt => "IFLT",
            OpCode::IfLe => "IFLE",
            OpCode::IfGt => "IFGT",
            OpCode::IfGe => "IFGE",
            OpCode::New => "NEW",
            OpCode::Get => "GET",
            OpCode::Put => "PUT",
            OpCode::Size => "SIZE",
        };
        f.write_str(s)
    }
}

/// One three-address instruction: `r = op(a, b)`, with `a`/`b` unit when the
/// opcode doesn't need them. `Display` mirrors the source's conditional
/// formatting so `-I` dumps stay readable without a fixed column layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Inst {
    pub op: OpCode,
    pub a: Operand,
    pub b: Operand,
    pub r: Operand,
}

impl Inst {
    pub fn new(op: OpCode, a: Operand, b: Operand, r: Operand) -> Self {
        Inst { op, a, b, r }
    }
}

impl fmt::Display for Inst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let has_r = !self.r.is_unit();
        let has_b = !self.b.is_unit();
        let has_a = !self.a.is_unit();
        match (has_r, has_a, has_b) {
            (true, true, true) => write!(f, "{} = {} {}, {}", self.r, self.op, self.a, self.b),
            (true, true, false) => write!(f, "{} = {} {}", self.r, self.op, self.a),
            (true, false, false) => write!(f, "{} = {}", self.r, self.op),
            (false, true, true) => write!(f, "{} {}, {}", self.op, self.a, self.b),
            (false, true, false) => write!(f, "{} {}", self.op, self.a),
            (false, false, false) => write!(f, "{}", self.op),
            (false, false, true) => write!(f, "{} {}", self.op, self.b),
        }
    }
}
