use std::collections::HashMap;

use super::*;

/// Appends blocks and instructions to a function under construction.
///
/// The builder owns the function until `finish`, so the module it will land
/// in stays untouched if lowering fails half way.
pub struct Builder {
	function: Function,
	/// Insertion point
	block:    Option<BlockId>,
	/// How often each block or slot name was handed out, for uniquing
	names:    HashMap<String, usize>,
}

impl Builder {
	pub fn new(function: Function) -> Self {
		let mut names = HashMap::new();
		for parameter in &function.parameters {
			names.insert(parameter.clone(), 1);
		}
		Self { function, block: None, names }
	}

	pub fn finish(self) -> Function { self.function }

	/// Append a new, empty block after all existing ones.
	pub fn append_block(&mut self, name: &str) -> BlockId {
		let name = self.unique(name);
		self.function.blocks.push(Block::new(name));
		BlockId(self.function.blocks.len() - 1)
	}

	/// Move the insertion point to the end of `block`.
	pub fn position_at_end(&mut self, block: BlockId) { self.block = Some(block); }

	/// The insertion block.
	///
	/// Before any `position_at_end` this is the entry block.
	pub fn current_block(&self) -> BlockId { self.block.unwrap_or(BlockId::ENTRY) }

	/// Declare a stack slot in the entry region.
	pub fn alloca(&mut self, name: &str) -> SlotId {
		let name = self.unique(&format!("{name}.addr"));
		self.function.slots.push(name);
		SlotId(self.function.slots.len() - 1)
	}

	pub fn binary(&mut self, op: BinaryOp, lhs: Value, rhs: Value) -> Value {
		self.push(Instruction::Binary { op, lhs, rhs })
	}

	pub fn fadd(&mut self, lhs: Value, rhs: Value) -> Value { self.binary(BinaryOp::Add, lhs, rhs) }

	pub fn fsub(&mut self, lhs: Value, rhs: Value) -> Value { self.binary(BinaryOp::Sub, lhs, rhs) }

	pub fn fmul(&mut self, lhs: Value, rhs: Value) -> Value { self.binary(BinaryOp::Mul, lhs, rhs) }

	pub fn fcmp(&mut self, op: CompareOp, lhs: Value, rhs: Value) -> Value {
		self.push(Instruction::Compare { op, lhs, rhs })
	}

	pub fn ui_to_fp(&mut self, value: Value) -> Value { self.push(Instruction::BoolToFloat(value)) }

	pub fn load(&mut self, slot: SlotId) -> Value { self.push(Instruction::Load(slot)) }

	pub fn store(&mut self, slot: SlotId, value: Value) { self.push(Instruction::Store { slot, value }); }

	pub fn call(&mut self, callee: String, arguments: Vec<Value>) -> Value {
		self.push(Instruction::Call { callee, arguments })
	}

	pub fn phi(&mut self, incoming: Vec<(BlockId, Value)>) -> Value { self.push(Instruction::Phi(incoming)) }

	pub fn jump(&mut self, target: BlockId) { self.terminate(Terminator::Jump(target)); }

	pub fn branch(&mut self, condition: Value, then_block: BlockId, else_block: BlockId) {
		self.terminate(Terminator::Branch { condition, then_block, else_block });
	}

	pub fn ret(&mut self, value: Value) { self.terminate(Terminator::Return(value)); }

	fn push(&mut self, instruction: Instruction) -> Value {
		let id = InstId(self.function.instructions.len());
		self.function.instructions.push(instruction);
		let block = self.current_block();
		if let Some(block) = self.function.blocks.get_mut(block.index()) {
			block.instructions.push(id);
		}
		Value::Inst(id)
	}

	fn terminate(&mut self, terminator: Terminator) {
		let block = self.current_block();
		if let Some(block) = self.function.blocks.get_mut(block.index()) {
			block.terminator = Some(terminator);
		}
	}

	fn unique(&mut self, name: &str) -> String {
		let count = self.names.entry(name.to_string()).or_insert(0);
		*count += 1;
		if *count == 1 { name.to_string() } else { format!("{name}{}", *count - 1) }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn build_straight_line() {
		let mut builder = Builder::new(Function::declaration("f".into(), vec!["x".into()]));
		let entry = builder.append_block("entry");
		builder.position_at_end(entry);
		let slot = builder.alloca("x");
		builder.store(slot, Value::Param(0));
		let x = builder.load(slot);
		let sum = builder.fadd(x, Value::Float(1.0));
		builder.ret(sum);
		let function = builder.finish();

		assert_eq!(function.slots, ["x.addr"]);
		assert_eq!(function.blocks.len(), 1);
		assert_eq!(function.blocks[0].instructions, [InstId(0), InstId(1), InstId(2)]);
		assert_eq!(function.blocks[0].terminator, Some(Terminator::Return(Value::Inst(InstId(2)))));
		assert_eq!(function.value_type(sum), Some(Type::Double));
	}

	#[test]
	fn names_are_uniqued() {
		let mut builder = Builder::new(Function::declaration("f".into(), vec![]));
		assert_eq!(builder.append_block("then"), BlockId(0));
		builder.append_block("then");
		builder.alloca("a");
		builder.alloca("a");
		let function = builder.finish();

		let blocks: Vec<&str> = function.blocks.iter().map(|b| b.name.as_str()).collect();
		assert_eq!(blocks, ["then", "then1"]);
		assert_eq!(function.slots, ["a.addr", "a.addr1"]);
	}

	#[test]
	fn predecessors_and_reachability() {
		let mut builder = Builder::new(Function::declaration("f".into(), vec![]));
		let entry = builder.append_block("entry");
		let then_block = builder.append_block("then");
		let merge = builder.append_block("merge");
		let dead = builder.append_block("dead");
		builder.position_at_end(entry);
		builder.branch(Value::Bool(true), then_block, merge);
		builder.position_at_end(then_block);
		builder.jump(merge);
		builder.position_at_end(merge);
		builder.ret(Value::Float(0.0));
		builder.position_at_end(dead);
		builder.jump(merge);
		let function = builder.finish();

		assert_eq!(function.predecessors()[merge.index()], [entry, then_block, dead]);
		assert_eq!(function.reachable(), [true, true, true, false]);
	}
}
