//! Expression AST nodes
//!
//! An `Expression` is an owning tree: every child is uniquely held by its
//! parent, built once by the parser and consumed once by the code generator.

use Expression::*;

/// Expression AST nodes
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
	Number(f64),
	Variable(String),
	Unary { operator: char, operand: Box<Expression> },
	/// Infix application, including assignment `=`.
	Binary { operator: char, left: Box<Expression>, right: Box<Expression> },
	Call { callee: String, arguments: Vec<Expression> },
	If { condition: Box<Expression>, then_branch: Box<Expression>, else_branch: Box<Expression> },
	For {
		variable: String,
		start:    Box<Expression>,
		end:      Box<Expression>,
		step:     Option<Box<Expression>>,
		body:     Box<Expression>,
	},
	/// `var a = 1, b in body`; initializers only see earlier bindings.
	Var { bindings: Vec<(String, Option<Expression>)>, body: Box<Expression> },
}

impl Expression {
	pub fn unary(operator: char, operand: Box<Self>) -> Box<Self> { Box::new(Unary { operator, operand }) }

	pub fn binary(operator: char, left: Box<Self>, right: Box<Self>) -> Box<Self> {
		Box::new(Binary { operator, left, right })
	}

	pub fn call(callee: String, arguments: Vec<Self>) -> Box<Self> { Box::new(Call { callee, arguments }) }

	pub fn if_else(condition: Box<Self>, then_branch: Box<Self>, else_branch: Box<Self>) -> Box<Self> {
		Box::new(If { condition, then_branch, else_branch })
	}

	pub fn for_loop(
		variable: String,
		start: Box<Self>,
		end: Box<Self>,
		step: Option<Box<Self>>,
		body: Box<Self>,
	) -> Box<Self> {
		Box::new(For { variable, start, end, step, body })
	}

	pub fn var(bindings: Vec<(String, Option<Self>)>, body: Box<Self>) -> Box<Self> { Box::new(Var { bindings, body }) }
}

impl std::fmt::Display for Expression {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Number(n) => write!(f, "{n}"),
			Variable(name) => write!(f, "{name}"),
			Unary { operator, operand } => write!(f, "({operator} {operand})"),
			Binary { operator, left, right } => write!(f, "({operator} {left} {right})"),
			Call { callee, arguments } => {
				write!(f, "(call {callee}")?;
				for argument in arguments {
					write!(f, " {argument}")?;
				}
				write!(f, ")")
			}
			If { condition, then_branch, else_branch } => write!(f, "(if {condition} {then_branch} {else_branch})"),
			For { variable, start, end, step, body } => {
				write!(f, "(for {variable} {start} {end}")?;
				if let Some(step) = step {
					write!(f, " {step}")?;
				}
				write!(f, " {body})")
			}
			Var { bindings, body } => {
				let bindings = bindings
					.iter()
					.map(|(name, initializer)| match initializer {
						Some(initializer) => format!("({name} {initializer})"),
						None => format!("({name})"),
					})
					.collect::<Vec<String>>()
					.join(" ");
				write!(f, "(var ({bindings}) {body})")
			}
		}
	}
}
