pub mod backend;
pub mod codegen;
pub mod parser;

/// KaleidoError is the top-level error type of the compiler session.
#[derive(thiserror::Error, Debug)]
pub enum KaleidoError {
	/// Internal compiler error or I/O failure
	#[error("CompilerInternalError: {0}")]
	InternalError(#[from] anyhow::Error),
	/// Grammar violation in the current statement
	#[error("{0}")]
	Parse(#[from] parser::ParseError),
	/// Lowering of a parsed definition failed
	#[error("{0}")]
	Codegen(#[from] codegen::CodegenError),
	/// The backend failed to run a generated function
	#[error("{0}")]
	Execution(#[from] backend::ExecutionError),
}
