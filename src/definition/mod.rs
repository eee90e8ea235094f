//! Source-level definitions: prototypes and function bodies.
//!
//! There is no statement sequencing in the language, so a function body is a
//! single expression and a top-level expression is simply a function with an
//! empty name and no parameters.

use crate::{operators::{DEFAULT_PRECEDENCE, OperatorKind}, parser::expression::Expression};

/// Name, parameters and grammar role of a function.
#[derive(Debug, Clone, PartialEq)]
pub struct Prototype {
	pub name:       String,
	pub parameters: Vec<String>,
	pub kind:       OperatorKind,
	/// Binding power of a binary operator, unused otherwise.
	pub precedence: u32,
}

impl Prototype {
	pub fn new(name: String, parameters: Vec<String>) -> Self {
		Self { name, parameters, kind: OperatorKind::Function, precedence: 0 }
	}

	/// Prototype of a user-defined operator, named after its kind and symbol.
	pub fn operator(kind: OperatorKind, symbol: char, parameters: Vec<String>, precedence: Option<u32>) -> Self {
		let precedence = match kind {
			OperatorKind::Binary => precedence.unwrap_or(DEFAULT_PRECEDENCE),
			_ => 0,
		};
		Self { name: kind.function_name(symbol), parameters, kind, precedence }
	}

	/// The nameless zero-argument prototype wrapping a top-level expression.
	pub fn anonymous() -> Self { Self::new(String::new(), Vec::new()) }

	pub fn is_anonymous(&self) -> bool { self.name.is_empty() }

	/// Symbol of a unary or binary operator definition.
	pub fn operator_symbol(&self) -> Option<char> {
		match self.kind {
			OperatorKind::Function => None,
			_ => self.name.chars().last(),
		}
	}

	/// Symbol and precedence to install in the operator table, if any.
	pub fn binary_operator(&self) -> Option<(char, u32)> {
		match self.kind {
			OperatorKind::Binary => self.operator_symbol().map(|symbol| (symbol, self.precedence)),
			_ => None,
		}
	}
}

impl std::fmt::Display for Prototype {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}({})", self.name, self.parameters.join(" "))?;
		if self.kind == OperatorKind::Binary {
			write!(f, " precedence {}", self.precedence)?;
		}
		Ok(())
	}
}

/// A function definition: prototype plus a single expression body.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
	pub prototype: Prototype,
	pub body:      Expression,
}

impl Function {
	pub fn new(prototype: Prototype, body: Expression) -> Self { Self { prototype, body } }

	/// Wrap a bare expression as an anonymous function.
	pub fn top_level(body: Expression) -> Self { Self::new(Prototype::anonymous(), body) }
}
