//! Structural and type checks on a function body.
//!
//! A function passing `verify_function` can be run by the interpreter without
//! hitting a malformed-IR path: every block ends in a terminator that names
//! existing blocks, phis sit at block starts with one entry per incoming edge,
//! every operand is defined before use along all paths, and operand types
//! match what each instruction consumes.
//!
//! Code in unreachable blocks is exempt from the dominance rule.

use crate::{error::backend::VerifyError, ir::{BlockId, Function, Instruction, Terminator, Type, Value}};

/// A program point: block and position within it. The terminator sits at
/// position `instructions.len()`.
type Point = (BlockId, usize);

pub fn verify_function(function: &Function) -> Result<(), VerifyError> {
	if function.is_declaration() {
		return Err(VerifyError::EmptyBody);
	}
	check_terminators(function)?;
	let predecessors = function.predecessors();
	if let Some(entry) = predecessors.first().filter(|list| !list.is_empty()).and(function.blocks.first()) {
		return Err(VerifyError::EntryPredecessor(entry.name.clone()));
	}

	let verifier = Verifier {
		function,
		placement: placement(function)?,
		reachable: function.reachable(),
		dominators: dominators(function, &predecessors),
	};
	for (index, block) in function.blocks.iter().enumerate() {
		let id = BlockId(index);
		let mut leading_phis = true;
		for (position, &inst) in block.instructions.iter().enumerate() {
			let user = format!("%{}", inst.index());
			let at = (id, position);
			match &function.instructions[inst.index()] {
				Instruction::Phi(incoming) => {
					if !leading_phis {
						return Err(VerifyError::PhiPosition { block: block.name.clone(), inst: inst.index() });
					}
					let mut sources: Vec<BlockId> = incoming.iter().map(|(block, _)| *block).collect();
					let mut expected = predecessors[index].clone();
					sources.sort();
					expected.sort();
					if sources != expected {
						return Err(VerifyError::PhiPredecessors { block: block.name.clone(), inst: inst.index() });
					}
					for &(source, value) in incoming {
						let end = function.blocks[source.index()].instructions.len();
						verifier.operand(value, Type::Double, &user, (source, end))?;
					}
				}
				Instruction::Binary { lhs, rhs, .. } | Instruction::Compare { lhs, rhs, .. } => {
					leading_phis = false;
					verifier.operand(*lhs, Type::Double, &user, at)?;
					verifier.operand(*rhs, Type::Double, &user, at)?;
				}
				Instruction::BoolToFloat(value) => {
					leading_phis = false;
					verifier.operand(*value, Type::I1, &user, at)?;
				}
				Instruction::Load(slot) => {
					leading_phis = false;
					verifier.slot(slot.index())?;
				}
				Instruction::Store { slot, value } => {
					leading_phis = false;
					verifier.slot(slot.index())?;
					verifier.operand(*value, Type::Double, &user, at)?;
				}
				Instruction::Call { arguments, .. } => {
					leading_phis = false;
					for argument in arguments {
						verifier.operand(*argument, Type::Double, &user, at)?;
					}
				}
			}
		}

		let at = (id, block.instructions.len());
		let user = format!("terminator of '{}'", block.name);
		match block.terminator {
			Some(Terminator::Branch { condition, .. }) => verifier.operand(condition, Type::I1, &user, at)?,
			Some(Terminator::Return(value)) => verifier.operand(value, Type::Double, &user, at)?,
			_ => {}
		}
	}
	Ok(())
}

fn check_terminators(function: &Function) -> Result<(), VerifyError> {
	for block in &function.blocks {
		let terminator = block.terminator.as_ref().ok_or_else(|| VerifyError::MissingTerminator(block.name.clone()))?;
		if let Some(target) = terminator.successors().into_iter().find(|target| target.index() >= function.blocks.len())
		{
			return Err(VerifyError::UnknownBlock { block: block.name.clone(), target: target.index() });
		}
	}
	Ok(())
}

/// Where each instruction is placed. An instruction may be left out of every
/// block, e.g. after dead code removal, but never placed twice.
fn placement(function: &Function) -> Result<Vec<Option<Point>>, VerifyError> {
	let mut placement = vec![None; function.instructions.len()];
	for (index, block) in function.blocks.iter().enumerate() {
		for (position, inst) in block.instructions.iter().enumerate() {
			let Some(slot) = placement.get_mut(inst.index()).filter(|slot| slot.is_none()) else {
				return Err(VerifyError::Misplaced(inst.index()));
			};
			*slot = Some((BlockId(index), position));
		}
	}
	Ok(placement)
}

/// `dominators[b][d]` holds when block `d` dominates block `b`. Only
/// meaningful for reachable blocks.
fn dominators(function: &Function, predecessors: &[Vec<BlockId>]) -> Vec<Vec<bool>> {
	let count = function.blocks.len();
	let reachable = function.reachable();
	let mut dominators = vec![vec![true; count]; count];
	dominators[BlockId::ENTRY.index()] = (0..count).map(|index| index == BlockId::ENTRY.index()).collect();

	let mut changed = true;
	while changed {
		changed = false;
		for block in 1..count {
			if !reachable[block] {
				continue;
			}
			let mut next = vec![true; count];
			for predecessor in predecessors[block].iter().filter(|p| reachable[p.index()]) {
				for (bit, &dominated) in next.iter_mut().zip(&dominators[predecessor.index()]) {
					*bit &= dominated;
				}
			}
			next[block] = true;
			if next != dominators[block] {
				dominators[block] = next;
				changed = true;
			}
		}
	}
	dominators
}

struct Verifier<'f> {
	function:   &'f Function,
	placement:  Vec<Option<Point>>,
	reachable:  Vec<bool>,
	dominators: Vec<Vec<bool>>,
}

impl Verifier<'_> {
	fn operand(&self, value: Value, expected: Type, user: &str, at: Point) -> Result<(), VerifyError> {
		let found = match value {
			Value::Float(_) => Type::Double,
			Value::Bool(_) => Type::I1,
			Value::Param(index) if index < self.function.arity() => Type::Double,
			Value::Param(index) => return Err(VerifyError::UnknownParameter(index)),
			Value::Inst(id) => {
				let operand = format!("%{}", id.index());
				let Some(definition) = self.placement.get(id.index()).copied().flatten() else {
					return Err(VerifyError::UndefinedOperand { user: user.to_string(), operand });
				};
				if !self.dominates(definition, at) {
					let block = self.function.blocks[at.0.index()].name.clone();
					return Err(VerifyError::Dominance { block, operand });
				}
				self.function.instructions[id.index()].result_type()
			}
		};
		if found != expected {
			return Err(VerifyError::TypeMismatch {
				context:  user.to_string(),
				expected: expected.name(),
				found:    found.name(),
			});
		}
		Ok(())
	}

	fn dominates(&self, definition: Point, at: Point) -> bool {
		if !self.reachable[at.0.index()] {
			return true;
		}
		if definition.0 == at.0 {
			definition.1 < at.1
		} else {
			self.dominators[at.0.index()][definition.0.index()]
		}
	}

	fn slot(&self, index: usize) -> Result<(), VerifyError> {
		if index < self.function.slots.len() { Ok(()) } else { Err(VerifyError::UnknownSlot(index)) }
	}
}
