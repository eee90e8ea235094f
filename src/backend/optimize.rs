//! Function-level simplification passes.
//!
//! Each pass keeps the function verifiable. They are repeated until none of
//! them changes anything, since folding a branch can make a phi trivial, which
//! can make more arithmetic constant, and so on.

use crate::ir::{BlockId, Function, InstId, Instruction, Terminator, Value};

pub fn optimize_function(mut function: Function) -> Function {
	if function.is_declaration() {
		return function;
	}
	loop {
		let mut changed = fold_constants(&mut function);
		changed |= fold_branches(&mut function);
		changed |= remove_unreachable_blocks(&mut function);
		changed |= remove_dead_instructions(&mut function);
		if !changed {
			return function;
		}
	}
}

/// Replace instructions whose result is known with that result.
fn fold_constants(function: &mut Function) -> bool {
	let mut changed = false;
	for block in 0..function.blocks.len() {
		let mut position = 0;
		while position < function.blocks[block].instructions.len() {
			let id = function.blocks[block].instructions[position];
			match fold(&function.instructions[id.index()]) {
				Some(value) => {
					function.blocks[block].instructions.remove(position);
					replace_uses(function, id, value);
					changed = true;
				}
				None => position += 1,
			}
		}
	}
	changed
}

fn fold(instruction: &Instruction) -> Option<Value> {
	match *instruction {
		Instruction::Binary { op, lhs: Value::Float(lhs), rhs: Value::Float(rhs) } => {
			Some(Value::Float(op.apply(lhs, rhs)))
		}
		Instruction::Compare { op, lhs: Value::Float(lhs), rhs: Value::Float(rhs) } => {
			Some(Value::Bool(op.apply(lhs, rhs)))
		}
		Instruction::BoolToFloat(Value::Bool(value)) => Some(Value::Float(if value { 1.0 } else { 0.0 })),
		Instruction::Phi(ref incoming) => match incoming.as_slice() {
			// a single edge: the value already dominates the block
			[(_, value)] => Some(*value),
			[(_, first), rest @ ..] if first.is_constant() && rest.iter().all(|(_, value)| value.same_as(*first)) => {
				Some(*first)
			}
			_ => None,
		},
		_ => None,
	}
}

fn replace_uses(function: &mut Function, id: InstId, replacement: Value) {
	let target = Value::Inst(id);
	for instruction in &mut function.instructions {
		for operand in instruction.operands_mut() {
			if *operand == target {
				*operand = replacement;
			}
		}
	}
	for terminator in function.blocks.iter_mut().filter_map(|block| block.terminator.as_mut()) {
		if let Some(operand) = terminator.operand_mut().filter(|operand| **operand == target) {
			*operand = replacement;
		}
	}
}

/// Turn branches on a constant, or to the same block twice, into jumps.
fn fold_branches(function: &mut Function) -> bool {
	let mut changed = false;
	for index in 0..function.blocks.len() {
		let Some(Terminator::Branch { condition, then_block, else_block }) = function.blocks[index].terminator else {
			continue;
		};
		let (target, dropped) = match condition {
			Value::Bool(true) => (then_block, Some(else_block)),
			Value::Bool(false) => (else_block, Some(then_block)),
			_ if then_block == else_block => (then_block, Some(else_block)),
			_ => continue,
		};
		function.blocks[index].terminator = Some(Terminator::Jump(target));
		if let Some(dropped) = dropped {
			remove_phi_edge(function, dropped, BlockId(index));
		}
		changed = true;
	}
	changed
}

/// Drop one incoming entry for the edge `from -> block` from every phi in
/// `block`.
fn remove_phi_edge(function: &mut Function, block: BlockId, from: BlockId) {
	let Function { blocks, instructions, .. } = &mut *function;
	for id in &blocks[block.index()].instructions {
		if let Instruction::Phi(incoming) = &mut instructions[id.index()] {
			if let Some(position) = incoming.iter().position(|(source, _)| *source == from) {
				incoming.remove(position);
			}
		}
	}
}

/// Delete blocks control can never reach, renumbering the rest.
fn remove_unreachable_blocks(function: &mut Function) -> bool {
	let reachable = function.reachable();
	if reachable.iter().all(|&reachable| reachable) {
		return false;
	}

	let mut renumbered = vec![None; function.blocks.len()];
	let mut next = 0;
	for (index, &keep) in reachable.iter().enumerate() {
		if keep {
			renumbered[index] = Some(BlockId(next));
			next += 1;
		}
	}

	let blocks = std::mem::take(&mut function.blocks);
	function.blocks = blocks.into_iter().zip(&reachable).filter(|(_, keep)| **keep).map(|(block, _)| block).collect();
	for block in &mut function.blocks {
		for target in block.terminator.iter_mut().flat_map(Terminator::successors_mut) {
			if let Some(new) = renumbered[target.index()] {
				*target = new;
			}
		}
		for id in &block.instructions {
			if let Instruction::Phi(incoming) = &mut function.instructions[id.index()] {
				incoming.retain_mut(|(source, _)| match renumbered[source.index()] {
					Some(new) => {
						*source = new;
						true
					}
					None => false,
				});
			}
		}
	}
	true
}

/// Remove side-effect free instructions whose result nothing uses.
fn remove_dead_instructions(function: &mut Function) -> bool {
	let mut changed = false;
	loop {
		let mut used = vec![false; function.instructions.len()];
		let placed = function.blocks.iter().flat_map(|block| block.instructions.iter());
		for operand in placed.flat_map(|id| function.instructions[id.index()].operands()) {
			if let Value::Inst(id) = operand {
				used[id.index()] = true;
			}
		}
		for operand in function.blocks.iter().filter_map(|block| block.terminator.as_ref()?.operand()) {
			if let Value::Inst(id) = operand {
				used[id.index()] = true;
			}
		}

		let mut removed = false;
		let Function { blocks, instructions, .. } = &mut *function;
		for block in blocks.iter_mut() {
			block.instructions.retain(|id| {
				let keep = used[id.index()] || !instructions[id.index()].is_pure();
				removed |= !keep;
				keep
			});
		}
		if !removed {
			return changed;
		}
		changed = true;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{backend::verify::verify_function, ir::{Builder, CompareOp}};

	fn start() -> (Builder, BlockId) {
		let mut builder = Builder::new(Function::declaration("f".into(), vec!["x".into()]));
		let entry = builder.append_block("entry");
		builder.position_at_end(entry);
		(builder, entry)
	}

	fn placed(function: &Function) -> usize { function.blocks.iter().map(|block| block.instructions.len()).sum() }

	#[test]
	fn fold_arithmetic() {
		let (mut b, _) = start();
		let product = b.fmul(Value::Float(2.0), Value::Float(3.0));
		let sum = b.fadd(Value::Float(1.0), product);
		b.ret(sum);

		let function = optimize_function(b.finish());
		assert_eq!(verify_function(&function), Ok(()));
		assert_eq!(placed(&function), 0);
		assert_eq!(function.blocks[0].terminator, Some(Terminator::Return(Value::Float(7.0))));
	}

	#[test]
	fn keep_side_effects() {
		let (mut b, _) = start();
		let slot = b.alloca("x");
		b.store(slot, Value::Param(0));
		b.call("printd".into(), vec![Value::Float(1.0)]);
		let loaded = b.load(slot);
		b.fadd(loaded, Value::Float(1.0));
		b.ret(Value::Float(0.0));

		let function = optimize_function(b.finish());
		assert_eq!(verify_function(&function), Ok(()));
		// the store and the call stay, the unused load and add go
		assert_eq!(function.blocks[0].instructions, [InstId(0), InstId(1)]);
	}

	#[test]
	fn fold_constant_if() {
		let (mut b, _) = start();
		let then_block = b.append_block("then");
		let else_block = b.append_block("else");
		let merge = b.append_block("ifcont");
		let less = b.fcmp(CompareOp::Ult, Value::Float(1.0), Value::Float(2.0));
		let condition = b.ui_to_fp(less);
		let condition = b.fcmp(CompareOp::One, condition, Value::Float(0.0));
		b.branch(condition, then_block, else_block);
		b.position_at_end(then_block);
		let then_value = b.call("g".into(), vec![Value::Param(0)]);
		b.jump(merge);
		b.position_at_end(else_block);
		b.jump(merge);
		b.position_at_end(merge);
		let joined = b.phi(vec![(then_block, then_value), (else_block, Value::Float(5.0))]);
		b.ret(joined);

		let function = optimize_function(b.finish());
		assert_eq!(verify_function(&function), Ok(()));
		let names: Vec<&str> = function.blocks.iter().map(|block| block.name.as_str()).collect();
		assert_eq!(names, ["entry", "then", "ifcont"]);
		assert_eq!(function.blocks[2].terminator, Some(Terminator::Return(then_value)));
		assert_eq!(function.blocks[0].terminator, Some(Terminator::Jump(BlockId(1))));
		assert_eq!(function.blocks[1].terminator, Some(Terminator::Jump(BlockId(2))));
	}

	#[test]
	fn keep_dynamic_control_flow() {
		let (mut b, _) = start();
		let then_block = b.append_block("then");
		let merge = b.append_block("ifcont");
		let entry = BlockId::ENTRY;
		let condition = b.fcmp(CompareOp::One, Value::Param(0), Value::Float(0.0));
		b.branch(condition, then_block, merge);
		b.position_at_end(then_block);
		b.jump(merge);
		b.position_at_end(merge);
		let joined = b.phi(vec![(entry, Value::Float(1.0)), (then_block, Value::Float(2.0))]);
		b.ret(joined);
		let before = b.finish();

		let after = optimize_function(before.clone());
		assert_eq!(verify_function(&after), Ok(()));
		assert_eq!(after, before);
	}

	#[test]
	fn fold_branch_with_identical_targets() {
		let (mut b, _) = start();
		let merge = b.append_block("merge");
		let condition = b.fcmp(CompareOp::One, Value::Param(0), Value::Float(0.0));
		b.branch(condition, merge, merge);
		b.position_at_end(merge);
		let joined = b.phi(vec![(BlockId::ENTRY, Value::Float(3.0)), (BlockId::ENTRY, Value::Float(3.0))]);
		b.ret(joined);

		let function = optimize_function(b.finish());
		assert_eq!(verify_function(&function), Ok(()));
		assert_eq!(function.blocks[1].terminator, Some(Terminator::Return(Value::Float(3.0))));
		assert_eq!(placed(&function), 0);
	}
}
