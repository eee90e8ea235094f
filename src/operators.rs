//! The run-time extensible binary operator precedence table.
//!
//! The parser asks it how tightly a symbol binds; successful `binary`
//! definitions add entries and failed ones take them back out.

use std::collections::HashMap;

/// Precedence given to a `binary` definition that does not declare one.
pub const DEFAULT_PRECEDENCE: u32 = 30;

/// Built-in binary operators and their precedence.
pub const BUILTIN_OPERATORS: [(char, u32); 5] = [('=', 2), ('<', 10), ('+', 20), ('-', 20), ('*', 40)];

/// The role a prototype plays in the grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorKind {
	/// A plain named function.
	Function,
	/// A prefix operator with one operand.
	Unary,
	/// An infix operator with two operands.
	Binary,
}

impl OperatorKind {
	/// Number of operands an operator of this kind takes.
	pub fn operand_count(self) -> Option<usize> {
		match self {
			OperatorKind::Function => None,
			OperatorKind::Unary => Some(1),
			OperatorKind::Binary => Some(2),
		}
	}

	/// Name of the function implementing operator `symbol`, e.g. `binary|`.
	pub fn function_name(self, symbol: char) -> String {
		match self {
			OperatorKind::Function => symbol.to_string(),
			OperatorKind::Unary => format!("unary{symbol}"),
			OperatorKind::Binary => format!("binary{symbol}"),
		}
	}
}

impl std::fmt::Display for OperatorKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			OperatorKind::Function => write!(f, "function"),
			OperatorKind::Unary => write!(f, "unary"),
			OperatorKind::Binary => write!(f, "binary"),
		}
	}
}

/// Mapping from binary operator symbol to precedence
#[derive(Debug, Clone, Default)]
pub struct OperatorTable {
	precedences: HashMap<char, u32>,
}

impl OperatorTable {
	pub fn new() -> Self { Self::default() }

	/// A table holding the built-in operators.
	pub fn with_builtins() -> Self {
		let mut table = Self::new();
		for (symbol, precedence) in BUILTIN_OPERATORS {
			table.install(symbol, precedence);
		}
		table
	}

	/// Precedence of `symbol` if it is currently a binary operator.
	pub fn precedence(&self, symbol: char) -> Option<u32> {
		self.precedences.get(&symbol).copied().filter(|&precedence| precedence > 0)
	}

	/// Install `symbol` as a binary operator, returning the precedence it had
	/// before so the caller can put it back.
	pub fn install(&mut self, symbol: char, precedence: u32) -> Option<u32> {
		self.precedences.insert(symbol, precedence)
	}

	/// Undo an `install`, restoring `previous` or dropping the entry.
	pub fn restore(&mut self, symbol: char, previous: Option<u32>) {
		match previous {
			Some(precedence) => {
				self.precedences.insert(symbol, precedence);
			}
			None => {
				self.precedences.remove(&symbol);
			}
		}
	}

}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn builtins_are_seeded() {
		let table = OperatorTable::with_builtins();
		assert_eq!(table.precedence('='), Some(2));
		assert_eq!(table.precedence('<'), Some(10));
		assert_eq!(table.precedence('+'), Some(20));
		assert_eq!(table.precedence('-'), Some(20));
		assert_eq!(table.precedence('*'), Some(40));
		assert_eq!(table.precedence('>'), None);
	}

	#[test]
	fn zero_precedence_is_not_an_operator() {
		let mut table = OperatorTable::new();
		table.install('|', 0);
		assert_eq!(table.precedence('|'), None);
	}

	#[test]
	fn install_and_restore() {
		let mut table = OperatorTable::with_builtins();

		let previous = table.install('>', 10);
		assert_eq!(previous, None);
		assert_eq!(table.precedence('>'), Some(10));
		table.restore('>', previous);
		assert_eq!(table.precedence('>'), None);

		let previous = table.install('+', 70);
		assert_eq!(previous, Some(20));
		table.restore('+', previous);
		assert_eq!(table.precedence('+'), Some(20));
	}

	#[test]
	fn operator_function_names() {
		assert_eq!(OperatorKind::Unary.function_name('!'), "unary!");
		assert_eq!(OperatorKind::Binary.function_name('|'), "binary|");
		assert_eq!(OperatorKind::Unary.operand_count(), Some(1));
		assert_eq!(OperatorKind::Binary.operand_count(), Some(2));
		assert_eq!(OperatorKind::Function.operand_count(), None);
	}
}
