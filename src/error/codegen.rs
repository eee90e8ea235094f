use crate::error::backend::VerifyError;

/// Errors raised while lowering a definition into IR
#[derive(thiserror::Error, Debug)]
pub enum CodegenError {
	#[error("unknown variable name '{0}'")]
	UnknownVariable(String),
	#[error("unknown function referenced: '{0}'")]
	UnknownFunction(String),
	#[error("incorrect # arguments passed to '{callee}': expected {expected}, found {found}")]
	ArgumentCount { callee: String, expected: usize, found: usize },
	#[error("destination of '=' must be a variable")]
	AssignToNonVariable,
	#[error("unknown unary operator '{0}'")]
	UnknownUnaryOperator(char),
	#[error("unknown binary operator '{0}'")]
	UnknownBinaryOperator(char),
	#[error("redefinition of function '{0}'")]
	Redefinition(String),
	#[error("redefinition of function '{name}' with different # args: declared {declared}, found {found}")]
	RedefinitionArity { name: String, declared: usize, found: usize },
	/// The backend rejected the generated function
	#[error("function '{name}' failed verification: {source}")]
	Verification { name: String, source: VerifyError },
}
