//! Host functions that body-less declarations resolve to.
//!
//! `extern putchard(x)` or `extern sin(x)` name functions the session itself
//! provides. Each one takes and returns doubles; output goes to the sink the
//! session reports results on, so program output and `Evaluated to` lines
//! stay in order.

use std::{collections::HashMap, fmt::Debug, io::Write};

use crate::{error::backend::ExecutionError, utils::RcCell};

type NativeFunction = Box<dyn Fn(&[f64], &mut dyn Write) -> std::io::Result<f64>>;

pub struct Intrinsic {
	pub name:  &'static str,
	pub arity: usize,
	body:      NativeFunction,
}

impl Debug for Intrinsic {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Intrinsic").field("name", &self.name).field("arity", &self.arity).finish()
	}
}

impl Intrinsic {
	pub fn new(
		name: &'static str,
		arity: usize,
		body: impl Fn(&[f64], &mut dyn Write) -> std::io::Result<f64> + 'static,
	) -> Self {
		Self { name, arity, body: Box::new(body) }
	}

	fn unary(name: &'static str, function: fn(f64) -> f64) -> Self {
		Self::new(name, 1, move |arguments, _| Ok(function(arguments[0])))
	}
}

/// Table of host functions, writing to a shared output sink.
pub struct Host<W: Write> {
	output:     RcCell<W>,
	intrinsics: HashMap<&'static str, Intrinsic>,
}

impl<W: Write> Host<W> {
	/// A host with no functions registered.
	pub fn empty(output: RcCell<W>) -> Self { Self { output, intrinsics: HashMap::new() } }

	/// A host carrying the standard library: character and number output plus
	/// the usual libm functions.
	pub fn new(output: RcCell<W>) -> Self {
		let mut host = Self::empty(output);
		host.register(Intrinsic::new("putchard", 1, |arguments, output| {
			// truncate like a C `(char)` cast
			let byte = arguments[0] as i64 as u8;
			output.write_all(&[byte])?;
			Ok(0.0)
		}));
		host.register(Intrinsic::new("printd", 1, |arguments, output| {
			writeln!(output, "{:.6}", arguments[0])?;
			Ok(0.0)
		}));
		for (name, function) in [
			("sin", f64::sin as fn(f64) -> f64),
			("cos", f64::cos),
			("tan", f64::tan),
			("atan", f64::atan),
			("sqrt", f64::sqrt),
			("exp", f64::exp),
			("log", f64::ln),
			("fabs", f64::abs),
		] {
			host.register(Intrinsic::unary(name, function));
		}
		host.register(Intrinsic::new("pow", 2, |arguments, _| Ok(arguments[0].powf(arguments[1]))));
		host
	}

	/// Add or replace a host function.
	pub fn register(&mut self, intrinsic: Intrinsic) { self.intrinsics.insert(intrinsic.name, intrinsic); }

	pub fn lookup(&self, name: &str) -> Option<&Intrinsic> { self.intrinsics.get(name) }

	/// Call host function `name`, `None` when there is no such function.
	pub fn call(&self, name: &str, arguments: &[f64]) -> Option<Result<f64, ExecutionError>> {
		let intrinsic = self.lookup(name)?;
		if intrinsic.arity != arguments.len() {
			return Some(Err(ExecutionError::ArgumentCount {
				callee:   name.to_string(),
				expected: intrinsic.arity,
				found:    arguments.len(),
			}));
		}
		let mut output = self.output.borrow_mut();
		Some((intrinsic.body)(arguments, &mut *output).map_err(ExecutionError::from))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn print_intrinsics() {
		let output = RcCell::new(Vec::new());
		let host = Host::new(output.clone());

		assert_eq!(host.call("putchard", &[72.0]).map(Result::ok), Some(Some(0.0)));
		assert_eq!(host.call("putchard", &[10.0]).map(Result::ok), Some(Some(0.0)));
		assert_eq!(host.call("printd", &[1.5]).map(Result::ok), Some(Some(0.0)));
		assert_eq!(output.contents(), "H\n1.500000\n");
	}

	#[test]
	fn math_intrinsics() {
		let host = Host::new(RcCell::new(Vec::new()));
		let call = |name: &str, arguments: &[f64]| host.call(name, arguments).and_then(Result::ok);

		assert_eq!(call("sqrt", &[16.0]), Some(4.0));
		assert_eq!(call("fabs", &[-2.5]), Some(2.5));
		assert_eq!(call("pow", &[2.0, 10.0]), Some(1024.0));
		assert_eq!(call("sin", &[0.0]), Some(0.0));
		assert_eq!(call("log", &[1.0]), Some(0.0));
	}

	#[test]
	fn unknown_and_misused() {
		let host = Host::new(RcCell::new(Vec::new()));
		assert!(host.call("nope", &[]).is_none());
		assert!(matches!(
			host.call("pow", &[1.0]),
			Some(Err(ExecutionError::ArgumentCount { expected: 2, found: 1, .. }))
		));
	}

	#[test]
	fn register_custom() {
		let mut host = Host::empty(RcCell::new(Vec::new()));
		assert!(host.lookup("sin").is_none());
		host.register(Intrinsic::new("answer", 0, |_, _| Ok(42.0)));
		assert_eq!(host.call("answer", &[]).and_then(Result::ok), Some(42.0));
	}
}
