//! Textual form of the IR, modelled on LLVM assembly.

use std::fmt::{self, Display, Formatter};

use super::*;

impl Display for BinaryOp {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			BinaryOp::Add => write!(f, "fadd"),
			BinaryOp::Sub => write!(f, "fsub"),
			BinaryOp::Mul => write!(f, "fmul"),
		}
	}
}

impl Display for CompareOp {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			CompareOp::Ult => write!(f, "ult"),
			CompareOp::One => write!(f, "one"),
		}
	}
}

impl Display for Type {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result { write!(f, "{}", self.name()) }
}

/// An operand printed with the names of the function it belongs to.
struct Operand<'f> {
	function: &'f Function,
	value:    Value,
}

impl Display for Operand<'_> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self.value {
			Value::Float(value) => write!(f, "{value:?}"),
			Value::Bool(value) => write!(f, "{value}"),
			Value::Param(index) => match self.function.parameters.get(index) {
				Some(name) => write!(f, "%{name}"),
				None => write!(f, "%arg{index}"),
			},
			Value::Inst(id) => write!(f, "%{}", id.index()),
		}
	}
}

impl Function {
	fn operand(&self, value: Value) -> Operand<'_> { Operand { function: self, value } }

	fn block_name(&self, id: BlockId) -> &str { self.block(id).map_or("<invalid>", |block| block.name.as_str()) }

	fn slot_name(&self, id: SlotId) -> &str { self.slots.get(id.index()).map_or("<invalid>", String::as_str) }

	fn write_instruction(&self, f: &mut Formatter<'_>, id: InstId) -> fmt::Result {
		let Some(instruction) = self.instruction(id) else {
			return writeln!(f, "  ; missing instruction {}", id.index());
		};
		let index = id.index();
		match instruction {
			Instruction::Binary { op, lhs, rhs } => {
				writeln!(f, "  %{index} = {op} double {}, {}", self.operand(*lhs), self.operand(*rhs))
			}
			Instruction::Compare { op, lhs, rhs } => {
				writeln!(f, "  %{index} = fcmp {op} double {}, {}", self.operand(*lhs), self.operand(*rhs))
			}
			Instruction::BoolToFloat(value) => {
				writeln!(f, "  %{index} = uitofp i1 {} to double", self.operand(*value))
			}
			Instruction::Load(slot) => writeln!(f, "  %{index} = load double, ptr %{}", self.slot_name(*slot)),
			Instruction::Store { slot, value } => {
				writeln!(f, "  store double {}, ptr %{}", self.operand(*value), self.slot_name(*slot))
			}
			Instruction::Call { callee, arguments } => {
				write!(f, "  %{index} = call double @{callee}(")?;
				for (position, argument) in arguments.iter().enumerate() {
					if position > 0 {
						write!(f, ", ")?;
					}
					write!(f, "double {}", self.operand(*argument))?;
				}
				writeln!(f, ")")
			}
			Instruction::Phi(incoming) => {
				write!(f, "  %{index} = phi double ")?;
				for (position, (block, value)) in incoming.iter().enumerate() {
					if position > 0 {
						write!(f, ", ")?;
					}
					write!(f, "[ {}, %{} ]", self.operand(*value), self.block_name(*block))?;
				}
				writeln!(f)
			}
		}
	}

	fn write_terminator(&self, f: &mut Formatter<'_>, terminator: &Terminator) -> fmt::Result {
		match terminator {
			Terminator::Jump(target) => writeln!(f, "  br label %{}", self.block_name(*target)),
			Terminator::Branch { condition, then_block, else_block } => writeln!(
				f,
				"  br i1 {}, label %{}, label %{}",
				self.operand(*condition),
				self.block_name(*then_block),
				self.block_name(*else_block)
			),
			Terminator::Return(value) => writeln!(f, "  ret double {}", self.operand(*value)),
		}
	}
}

impl Display for Function {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let keyword = if self.is_declaration() { "declare" } else { "define" };
		write!(f, "{keyword} double @{}(", self.name)?;
		for (position, parameter) in self.parameters.iter().enumerate() {
			if position > 0 {
				write!(f, ", ")?;
			}
			write!(f, "double %{parameter}")?;
		}
		write!(f, ")")?;
		if self.is_declaration() {
			return writeln!(f);
		}

		writeln!(f, " {{")?;
		for (index, block) in self.blocks.iter().enumerate() {
			if index > 0 {
				writeln!(f)?;
			}
			writeln!(f, "{}:", block.name)?;
			if index == BlockId::ENTRY.index() {
				for slot in &self.slots {
					writeln!(f, "  %{slot} = alloca double")?;
				}
			}
			for &id in &block.instructions {
				self.write_instruction(f, id)?;
			}
			match &block.terminator {
				Some(terminator) => self.write_terminator(f, terminator)?,
				None => writeln!(f, "  ; unterminated")?,
			}
		}
		writeln!(f, "}}")
	}
}

impl Display for Module {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		writeln!(f, "; ModuleID = '{}'", self.name)?;
		for function in &self.functions {
			writeln!(f)?;
			write!(f, "{function}")?;
		}
		Ok(())
	}
}
