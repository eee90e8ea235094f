//! Intermediate representation handed to the execution backend.
//!
//! A function is a list of basic blocks. Each block is a straight run of
//! instructions closed by a single terminator, and the first block is the
//! entry. Instructions live in a per-function arena and blocks refer to them
//! by `InstId`, which keeps values stable while passes move or drop
//! instructions.
//!
//! Mutable variables are not SSA values: they are stack slots declared in the
//! entry region and accessed through `load`/`store`. The only place where
//! control-flow merges values is the `phi` instruction at the start of a
//! block, carrying one incoming value per predecessor.
//!
//! Two types exist: `double` for every user-visible value, and `i1` for the
//! result of a comparison, which only branches and `uitofp` consume.

pub mod builder;
mod display;

pub use builder::Builder;

/// Instruction ID, an index into `Function::instructions`.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Eq, Ord, Hash)]
pub struct InstId(pub usize);

/// Block ID, an index into `Function::blocks`.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Eq, Ord, Hash)]
pub struct BlockId(pub usize);

/// Stack slot ID, an index into `Function::slots`.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Eq, Ord, Hash)]
pub struct SlotId(pub usize);

impl InstId {
	pub fn index(self) -> usize { self.0 }
}

impl BlockId {
	/// The entry block of every function with a body.
	pub const ENTRY: BlockId = BlockId(0);

	pub fn index(self) -> usize { self.0 }
}

impl SlotId {
	pub fn index(self) -> usize { self.0 }
}

/// Type of a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Type {
	Double,
	I1,
	/// Result of an instruction producing nothing, e.g. `store`.
	Void,
}

impl Type {
	pub fn name(self) -> &'static str {
		match self {
			Type::Double => "double",
			Type::I1 => "i1",
			Type::Void => "void",
		}
	}
}

/// An operand.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
	/// A `double` constant.
	Float(f64),
	/// An `i1` constant.
	Bool(bool),
	/// The n-th incoming parameter.
	Param(usize),
	/// The result of an instruction.
	Inst(InstId),
}

impl Value {
	pub fn is_constant(self) -> bool { matches!(self, Value::Float(_) | Value::Bool(_)) }

	/// Identity comparison: constants by bit pattern, so `NaN` equals itself.
	pub fn same_as(self, other: Value) -> bool {
		match (self, other) {
			(Value::Float(l), Value::Float(r)) => l.to_bits() == r.to_bits(),
			(l, r) => l == r,
		}
	}
}

/// Floating-point arithmetic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
	Add,
	Sub,
	Mul,
}

impl BinaryOp {
	pub fn apply(self, lhs: f64, rhs: f64) -> f64 {
		match self {
			BinaryOp::Add => lhs + rhs,
			BinaryOp::Sub => lhs - rhs,
			BinaryOp::Mul => lhs * rhs,
		}
	}
}

/// Floating-point comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
	/// Unordered or less than.
	Ult,
	/// Ordered and not equal.
	One,
}

impl CompareOp {
	pub fn apply(self, lhs: f64, rhs: f64) -> bool {
		match self {
			CompareOp::Ult => lhs.is_nan() || rhs.is_nan() || lhs < rhs,
			CompareOp::One => lhs < rhs || lhs > rhs,
		}
	}
}

/// An instruction.
#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
	Binary { op: BinaryOp, lhs: Value, rhs: Value },
	Compare { op: CompareOp, lhs: Value, rhs: Value },
	/// Widen an `i1` into `0.0`/`1.0`.
	BoolToFloat(Value),
	Load(SlotId),
	Store { slot: SlotId, value: Value },
	Call { callee: String, arguments: Vec<Value> },
	/// Value selected by the predecessor control arrived from.
	Phi(Vec<(BlockId, Value)>),
}

impl Instruction {
	pub fn result_type(&self) -> Type {
		match self {
			Instruction::Compare { .. } => Type::I1,
			Instruction::Store { .. } => Type::Void,
			_ => Type::Double,
		}
	}

	/// Instructions without side effects, which can be dropped when unused.
	pub fn is_pure(&self) -> bool { !matches!(self, Instruction::Store { .. } | Instruction::Call { .. }) }

	pub fn operands(&self) -> Vec<Value> {
		match self {
			Instruction::Binary { lhs, rhs, .. } | Instruction::Compare { lhs, rhs, .. } => vec![*lhs, *rhs],
			Instruction::BoolToFloat(value) | Instruction::Store { value, .. } => vec![*value],
			Instruction::Load(_) => Vec::new(),
			Instruction::Call { arguments, .. } => arguments.clone(),
			Instruction::Phi(incoming) => incoming.iter().map(|(_, value)| *value).collect(),
		}
	}

	pub fn operands_mut(&mut self) -> Vec<&mut Value> {
		match self {
			Instruction::Binary { lhs, rhs, .. } | Instruction::Compare { lhs, rhs, .. } => vec![lhs, rhs],
			Instruction::BoolToFloat(value) | Instruction::Store { value, .. } => vec![value],
			Instruction::Load(_) => Vec::new(),
			Instruction::Call { arguments, .. } => arguments.iter_mut().collect(),
			Instruction::Phi(incoming) => incoming.iter_mut().map(|(_, value)| value).collect(),
		}
	}
}

/// The single exit of a block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Terminator {
	Jump(BlockId),
	Branch { condition: Value, then_block: BlockId, else_block: BlockId },
	Return(Value),
}

impl Terminator {
	pub fn successors(&self) -> Vec<BlockId> {
		match *self {
			Terminator::Jump(target) => vec![target],
			Terminator::Branch { then_block, else_block, .. } => vec![then_block, else_block],
			Terminator::Return(_) => Vec::new(),
		}
	}

	pub fn operand(&self) -> Option<Value> {
		match *self {
			Terminator::Jump(_) => None,
			Terminator::Branch { condition, .. } => Some(condition),
			Terminator::Return(value) => Some(value),
		}
	}

	pub fn operand_mut(&mut self) -> Option<&mut Value> {
		match self {
			Terminator::Jump(_) => None,
			Terminator::Branch { condition, .. } => Some(condition),
			Terminator::Return(value) => Some(value),
		}
	}

	pub fn successors_mut(&mut self) -> Vec<&mut BlockId> {
		match self {
			Terminator::Jump(target) => vec![target],
			Terminator::Branch { then_block, else_block, .. } => vec![then_block, else_block],
			Terminator::Return(_) => Vec::new(),
		}
	}
}

/// A basic block.
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
	pub name:         String,
	pub instructions: Vec<InstId>,
	/// `None` only while the block is under construction.
	pub terminator:   Option<Terminator>,
}

impl Block {
	pub fn new(name: String) -> Self { Self { name, instructions: Vec::new(), terminator: None } }
}

/// A function: a declaration when it has no blocks, a definition otherwise.
///
/// Every parameter and the result are `double`.
#[derive(Clone, Debug, PartialEq)]
pub struct Function {
	pub name:         String,
	pub parameters:   Vec<String>,
	/// Names of the stack slots, all allocated in the entry region.
	pub slots:        Vec<String>,
	pub blocks:       Vec<Block>,
	pub instructions: Vec<Instruction>,
}

impl Function {
	pub fn declaration(name: String, parameters: Vec<String>) -> Self {
		Self { name, parameters, slots: Vec::new(), blocks: Vec::new(), instructions: Vec::new() }
	}

	pub fn is_declaration(&self) -> bool { self.blocks.is_empty() }

	pub fn arity(&self) -> usize { self.parameters.len() }

	pub fn block(&self, id: BlockId) -> Option<&Block> { self.blocks.get(id.index()) }

	pub fn instruction(&self, id: InstId) -> Option<&Instruction> { self.instructions.get(id.index()) }

	/// Type of `value`, `None` for a dangling instruction reference.
	pub fn value_type(&self, value: Value) -> Option<Type> {
		match value {
			Value::Float(_) | Value::Param(_) => Some(Type::Double),
			Value::Bool(_) => Some(Type::I1),
			Value::Inst(id) => self.instruction(id).map(Instruction::result_type),
		}
	}

	/// Predecessors of every block, in block order, one entry per edge.
	pub fn predecessors(&self) -> Vec<Vec<BlockId>> {
		let mut predecessors = vec![Vec::new(); self.blocks.len()];
		for (index, block) in self.blocks.iter().enumerate() {
			for successor in block.terminator.iter().flat_map(Terminator::successors) {
				if let Some(list) = predecessors.get_mut(successor.index()) {
					list.push(BlockId(index));
				}
			}
		}
		predecessors
	}

	/// Blocks reachable from the entry.
	pub fn reachable(&self) -> Vec<bool> {
		let mut reachable = vec![false; self.blocks.len()];
		let mut pending = if self.blocks.is_empty() { Vec::new() } else { vec![BlockId::ENTRY] };
		while let Some(block) = pending.pop() {
			if std::mem::replace(&mut reachable[block.index()], true) {
				continue;
			}
			for successor in self.blocks[block.index()].terminator.iter().flat_map(Terminator::successors) {
				if successor.index() < self.blocks.len() && !reachable[successor.index()] {
					pending.push(successor);
				}
			}
		}
		reachable
	}
}

/// All functions known to the session, in declaration order.
#[derive(Clone, Debug, Default)]
pub struct Module {
	name:            String,
	functions:       Vec<Function>,
	anonymous_count: usize,
}

impl Module {
	pub fn new(name: impl Into<String>) -> Self { Self { name: name.into(), ..Self::default() } }

	pub fn functions(&self) -> impl Iterator<Item = &Function> { self.functions.iter() }

	pub fn function(&self, name: &str) -> Option<&Function> { self.functions.iter().find(|f| f.name == name) }

	/// Add `function`, replacing one of the same name in place.
	pub fn insert(&mut self, function: Function) {
		match self.functions.iter_mut().find(|f| f.name == function.name) {
			Some(existing) => *existing = function,
			None => self.functions.push(function),
		}
	}

	pub fn remove(&mut self, name: &str) -> Option<Function> {
		let index = self.functions.iter().position(|f| f.name == name)?;
		Some(self.functions.remove(index))
	}

	/// A fresh name for a top-level expression.
	pub fn anonymous_name(&mut self) -> String {
		let name = format!("__anon_expr{}", self.anonymous_count);
		self.anonymous_count += 1;
		name
	}
}
