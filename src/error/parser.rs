use crate::operators::OperatorKind;

#[derive(thiserror::Error, Debug)]
#[error("line {line}: {type}")]
pub struct ParseError {
	line:   usize,
	r#type: ParseErrorType,
}

impl ParseError {
	pub fn new(line: usize, r#type: ParseErrorType) -> Self { Self { line, r#type } }

	pub fn line(&self) -> usize { self.line }

	pub fn kind(&self) -> &ParseErrorType { &self.r#type }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseErrorType {
	/// The lookahead cannot start an expression.
	ExpectedExpression(String),
	UnterminatedParenthesis,
	/// A call argument was followed by something other than `)` or `,`.
	ExpectedArgumentSeparator,
	/// A fixed piece of syntax was missing, e.g. `then` after an `if` condition.
	Expected { what: &'static str, after: &'static str },
	ExpectedFunctionName,
	ExpectedOperatorSymbol(OperatorKind),
	InvalidPrecedence(f64),
	InvalidOperandCount { kind: OperatorKind, expected: usize, found: usize },
}

impl std::fmt::Display for ParseErrorType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		use ParseErrorType::*;
		match self {
			ExpectedExpression(found) => {
				write!(f, "unknown token {found} when expecting an expression")
			}
			UnterminatedParenthesis => {
				write!(f, "expected ')'")
			}
			ExpectedArgumentSeparator => {
				write!(f, "expected ')' or ',' in argument list")
			}
			Expected { what, after } => {
				write!(f, "expected {what} after {after}")
			}
			ExpectedFunctionName => {
				write!(f, "expected function name in prototype")
			}
			ExpectedOperatorSymbol(kind) => {
				write!(f, "expected {kind} operator symbol")
			}
			InvalidPrecedence(value) => {
				write!(f, "invalid precedence {value}: must be 1..100")
			}
			InvalidOperandCount { kind, expected, found } => {
				write!(f, "invalid number of operands for {kind} operator: expected {expected}, found {found}")
			}
		}
	}
}
