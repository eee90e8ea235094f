//! Execution backends: what happens to IR once the code generator is done.
//!
//! The session only talks to the `Backend` trait. A backend checks a freshly
//! generated function, optionally rewrites it, registers it so later calls can
//! find it, and runs zero-argument entry points.

pub mod host;
pub mod interpreter;
pub mod optimize;
pub mod verify;

pub use host::Host;
pub use interpreter::Interpreter;

use crate::{error::backend::{ExecutionError, VerifyError}, ir::Function};

pub trait Backend {
	/// Handle to a compiled, callable function.
	type Entry;

	/// Check structural and type consistency of a function body.
	fn verify(&self, function: &Function) -> Result<(), VerifyError> { verify::verify_function(function) }

	/// Rewrite a verified function into an equivalent, simpler one.
	fn optimize(&self, function: Function) -> Function { optimize::optimize_function(function) }

	/// Make `function` callable, replacing a previous body of the same name.
	fn compile(&mut self, function: &Function) -> Result<Self::Entry, ExecutionError>;

	/// Run a compiled zero-argument function.
	fn call(&mut self, entry: &Self::Entry) -> Result<f64, ExecutionError>;
}
