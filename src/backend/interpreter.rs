//! The reference backend: runs IR directly.
//!
//! Compiled functions are kept by name and calls are resolved when they
//! execute, so a function may call another that is only defined later. Names
//! without a compiled body fall back to the host intrinsics.
//!
//! Calls do not recurse on the host stack. A call suspends the caller's
//! activation on an explicit stack and resumes it once the callee returns.

use std::{collections::HashMap, io::Write, rc::Rc};

use crate::{backend::{Backend, Host}, error::backend::ExecutionError, ir::{Block, BlockId, Function, InstId, Instruction, Terminator, Value}};

/// Nesting limit for calls, so runaway recursion is an error instead of
/// unbounded growth of the activation stack.
pub const MAX_CALL_DEPTH: usize = 1000;

/// Runtime value of an instruction result.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Scalar {
	Float(f64),
	Bool(bool),
	Unit,
}

pub struct Interpreter<W: Write> {
	functions: HashMap<String, Rc<Function>>,
	host:      Host<W>,
	max_depth: usize,
}

impl<W: Write> Interpreter<W> {
	pub fn new(host: Host<W>) -> Self { Self { functions: HashMap::new(), host, max_depth: MAX_CALL_DEPTH } }

	pub fn with_max_depth(mut self, max_depth: usize) -> Self {
		self.max_depth = max_depth;
		self
	}

	/// Call `name` with `arguments` and run it to completion.
	fn invoke(&mut self, name: &str, arguments: Vec<f64>) -> Result<f64, ExecutionError> {
		let mut current = match self.enter(name, arguments, 0)? {
			Entered::Body(activation) => activation,
			Entered::Host(value) => return Ok(value),
		};
		let mut callers: Vec<Activation> = Vec::new();

		loop {
			let step = current.step().map_err(|reason| ExecutionError::Malformed(current.function.name.clone(), reason))?;
			match step {
				Step::Continue => {}
				Step::Call { callee, arguments } => match self.enter(&callee, arguments, callers.len() + 1)? {
					Entered::Body(activation) => callers.push(std::mem::replace(&mut current, activation)),
					Entered::Host(value) => current.resume(value),
				},
				Step::Return(value) => match callers.pop() {
					Some(caller) => {
						current = caller;
						current.resume(value);
					}
					None => return Ok(value),
				},
			}
		}
	}

	/// Start a call at nesting `depth`: a new activation for a compiled body,
	/// or the result of a host intrinsic.
	fn enter(&mut self, name: &str, arguments: Vec<f64>, depth: usize) -> Result<Entered, ExecutionError> {
		if depth >= self.max_depth {
			return Err(ExecutionError::StackExhausted(self.max_depth));
		}
		if let Some(function) = self.functions.get(name).cloned() {
			if function.arity() != arguments.len() {
				return Err(ExecutionError::ArgumentCount {
					callee:   name.to_string(),
					expected: function.arity(),
					found:    arguments.len(),
				});
			}
			return Ok(Entered::Body(Activation::new(function, arguments)));
		}
		match self.host.call(name, &arguments) {
			Some(result) => result.map(Entered::Host),
			None => Err(ExecutionError::UnresolvedSymbol(name.to_string())),
		}
	}
}

enum Entered {
	Body(Activation),
	Host(f64),
}

/// What an activation asks of the interpreter after one step.
enum Step {
	Continue,
	Call { callee: String, arguments: Vec<f64> },
	Return(f64),
}

/// One running or suspended call of a compiled function.
struct Activation {
	function: Rc<Function>,
	frame:    Frame,
	slots:    Vec<f64>,
	block:    BlockId,
	previous: Option<BlockId>,
	/// Index of the next instruction in `block`, `None` until its phis ran.
	position: Option<usize>,
	/// Call instruction waiting for its result.
	waiting:  Option<InstId>,
}

impl Activation {
	fn new(function: Rc<Function>, arguments: Vec<f64>) -> Self {
		let frame = Frame { arguments, values: vec![None; function.instructions.len()] };
		let slots = vec![0.0; function.slots.len()];
		Self { function, frame, slots, block: BlockId::ENTRY, previous: None, position: None, waiting: None }
	}

	/// Execute one instruction or the terminator of the current block.
	fn step(&mut self) -> Result<Step, &'static str> {
		let block = self.function.block(self.block).ok_or("branch to missing block")?;
		let position = match self.position {
			Some(position) => position,
			None => self.frame.enter_block(&self.function, block, self.previous)?,
		};

		let Some(&id) = block.instructions.get(position) else {
			let target = match block.terminator {
				Some(Terminator::Jump(target)) => target,
				Some(Terminator::Branch { condition, then_block, else_block }) => {
					if self.frame.bool(condition)? { then_block } else { else_block }
				}
				Some(Terminator::Return(value)) => return Ok(Step::Return(self.frame.float(value)?)),
				None => return Err("unterminated block"),
			};
			self.previous = Some(self.block);
			self.block = target;
			self.position = None;
			return Ok(Step::Continue);
		};

		let instruction = self.function.instruction(id).ok_or("missing instruction")?;
		self.position = Some(position + 1);
		let result = match instruction {
			Instruction::Binary { op, lhs, rhs } => Scalar::Float(op.apply(self.frame.float(*lhs)?, self.frame.float(*rhs)?)),
			Instruction::Compare { op, lhs, rhs } => Scalar::Bool(op.apply(self.frame.float(*lhs)?, self.frame.float(*rhs)?)),
			Instruction::BoolToFloat(value) => Scalar::Float(if self.frame.bool(*value)? { 1.0 } else { 0.0 }),
			Instruction::Load(slot) => Scalar::Float(*self.slots.get(slot.index()).ok_or("unknown stack slot")?),
			Instruction::Store { slot, value } => {
				let value = self.frame.float(*value)?;
				*self.slots.get_mut(slot.index()).ok_or("unknown stack slot")? = value;
				Scalar::Unit
			}
			Instruction::Call { callee, arguments } => {
				let arguments = arguments.iter().map(|argument| self.frame.float(*argument)).collect::<Result<_, _>>()?;
				self.waiting = Some(id);
				return Ok(Step::Call { callee: callee.clone(), arguments });
			}
			Instruction::Phi(_) => return Err("phi after a non-phi instruction"),
		};
		self.frame.values[id.index()] = Some(result);
		Ok(Step::Continue)
	}

	/// Deliver the result of the call this activation is suspended on.
	fn resume(&mut self, result: f64) {
		if let Some(id) = self.waiting.take() {
			self.frame.values[id.index()] = Some(Scalar::Float(result));
		}
	}
}

/// Values of one activation.
struct Frame {
	arguments: Vec<f64>,
	values:    Vec<Option<Scalar>>,
}

impl Frame {
	/// Evaluate the leading phis of `block` against the edge from `from`,
	/// returning how many there are.
	///
	/// All phis read their inputs before any of them is written.
	fn enter_block(&mut self, function: &Function, block: &Block, from: Option<BlockId>) -> Result<usize, &'static str> {
		let mut selected = Vec::new();
		for &id in &block.instructions {
			let Some(Instruction::Phi(incoming)) = function.instruction(id) else {
				break;
			};
			let from = from.ok_or("phi in entry block")?;
			let value = incoming
				.iter()
				.find(|(source, _)| *source == from)
				.map(|(_, value)| *value)
				.ok_or("phi without entry for predecessor")?;
			selected.push((id, self.scalar(value)?));
		}
		let count = selected.len();
		for (id, value) in selected {
			self.values[id.index()] = Some(value);
		}
		Ok(count)
	}

	fn scalar(&self, value: Value) -> Result<Scalar, &'static str> {
		match value {
			Value::Float(value) => Ok(Scalar::Float(value)),
			Value::Bool(value) => Ok(Scalar::Bool(value)),
			Value::Param(index) => self.arguments.get(index).copied().map(Scalar::Float).ok_or("unknown parameter"),
			Value::Inst(id) => self.values.get(id.index()).copied().flatten().ok_or("use of undefined value"),
		}
	}

	fn float(&self, value: Value) -> Result<f64, &'static str> {
		match self.scalar(value)? {
			Scalar::Float(value) => Ok(value),
			_ => Err("expected a double operand"),
		}
	}

	fn bool(&self, value: Value) -> Result<bool, &'static str> {
		match self.scalar(value)? {
			Scalar::Bool(value) => Ok(value),
			_ => Err("expected an i1 operand"),
		}
	}
}

impl<W: Write> Backend for Interpreter<W> {
	type Entry = String;

	fn compile(&mut self, function: &Function) -> Result<String, ExecutionError> {
		if function.is_declaration() {
			return Err(ExecutionError::NotCompiled(function.name.clone()));
		}
		self.functions.insert(function.name.clone(), Rc::new(function.clone()));
		Ok(function.name.clone())
	}

	fn call(&mut self, entry: &String) -> Result<f64, ExecutionError> {
		if !self.functions.contains_key(entry) {
			return Err(ExecutionError::NotCompiled(entry.clone()));
		}
		self.invoke(entry, Vec::new())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{ir::{Builder, CompareOp}, utils::RcCell};

	fn interpreter() -> (Interpreter<Vec<u8>>, RcCell<Vec<u8>>) {
		let output = RcCell::new(Vec::new());
		(Interpreter::new(Host::new(output.clone())), output)
	}

	fn builder(name: &str, parameters: &[&str]) -> Builder {
		let parameters = parameters.iter().map(|p| p.to_string()).collect();
		let mut builder = Builder::new(Function::declaration(name.into(), parameters));
		let entry = builder.append_block("entry");
		builder.position_at_end(entry);
		builder
	}

	/// `def fib(x) if x < 3 then 1 else fib(x-1)+fib(x-2)`
	fn fib() -> Function {
		let mut b = builder("fib", &["x"]);
		let then_block = b.append_block("then");
		let else_block = b.append_block("else");
		let merge = b.append_block("ifcont");
		let less = b.fcmp(CompareOp::Ult, Value::Param(0), Value::Float(3.0));
		b.branch(less, then_block, else_block);
		b.position_at_end(then_block);
		b.jump(merge);
		b.position_at_end(else_block);
		let one_less = b.fsub(Value::Param(0), Value::Float(1.0));
		let two_less = b.fsub(Value::Param(0), Value::Float(2.0));
		let left = b.call("fib".into(), vec![one_less]);
		let right = b.call("fib".into(), vec![two_less]);
		let sum = b.fadd(left, right);
		b.jump(merge);
		b.position_at_end(merge);
		let joined = b.phi(vec![(then_block, Value::Float(1.0)), (else_block, sum)]);
		b.ret(joined);
		b.finish()
	}

	fn entry_calling(callee: &str, arguments: Vec<Value>) -> Function {
		let mut b = builder("__anon_expr0", &[]);
		let result = b.call(callee.into(), arguments);
		b.ret(result);
		b.finish()
	}

	#[test]
	fn run_recursion() {
		let (mut interpreter, _) = interpreter();
		interpreter.compile(&fib()).unwrap();
		let entry = interpreter.compile(&entry_calling("fib", vec![Value::Float(10.0)])).unwrap();
		assert_eq!(interpreter.call(&entry).unwrap(), 55.0);
	}

	#[test]
	fn run_loop_with_slots() {
		// i = 0; loop: i = i + 1; if i < 5 goto loop; return i
		let mut b = builder("count", &[]);
		let body = b.append_block("loop");
		let after = b.append_block("afterloop");
		let slot = b.alloca("i");
		b.store(slot, Value::Float(0.0));
		b.jump(body);
		b.position_at_end(body);
		let current = b.load(slot);
		let next = b.fadd(current, Value::Float(1.0));
		b.store(slot, next);
		let more = b.fcmp(CompareOp::Ult, next, Value::Float(5.0));
		b.branch(more, body, after);
		b.position_at_end(after);
		let last = b.load(slot);
		b.ret(last);

		let (mut interpreter, _) = interpreter();
		let entry = interpreter.compile(&b.finish()).unwrap();
		assert_eq!(interpreter.call(&entry).unwrap(), 5.0);
	}

	#[test]
	fn call_host_intrinsics() {
		let (mut interpreter, output) = interpreter();
		let entry = interpreter.compile(&entry_calling("printd", vec![Value::Float(2.0)])).unwrap();
		assert_eq!(interpreter.call(&entry).unwrap(), 0.0);
		assert_eq!(output.contents(), "2.000000\n");
	}

	#[test]
	fn unresolved_symbol() {
		let (mut interpreter, _) = interpreter();
		let entry = interpreter.compile(&entry_calling("missing", vec![])).unwrap();
		assert!(matches!(interpreter.call(&entry), Err(ExecutionError::UnresolvedSymbol(name)) if name == "missing"));
	}

	#[test]
	fn compiled_body_shadows_host() {
		let mut b = builder("sin", &["x"]);
		b.ret(Value::Float(42.0));
		let (mut interpreter, _) = interpreter();
		interpreter.compile(&b.finish()).unwrap();
		let entry = interpreter.compile(&entry_calling("sin", vec![Value::Float(0.0)])).unwrap();
		assert_eq!(interpreter.call(&entry).unwrap(), 42.0);
	}

	#[test]
	fn runaway_recursion_is_an_error() {
		let mut b = builder("forever", &[]);
		let result = b.call("forever".into(), vec![]);
		b.ret(result);
		let (interpreter, _) = interpreter();
		let mut interpreter = interpreter.with_max_depth(64);
		let entry = interpreter.compile(&b.finish()).unwrap();
		assert!(matches!(interpreter.call(&entry), Err(ExecutionError::StackExhausted(64))));
	}

	/// `def countdown(n) if n < 1 then 0 else countdown(n-1)`
	fn countdown() -> Function {
		let mut b = builder("countdown", &["n"]);
		let done = b.append_block("done");
		let recurse = b.append_block("recurse");
		let small = b.fcmp(CompareOp::Ult, Value::Param(0), Value::Float(1.0));
		b.branch(small, done, recurse);
		b.position_at_end(done);
		b.ret(Value::Float(0.0));
		b.position_at_end(recurse);
		let next = b.fsub(Value::Param(0), Value::Float(1.0));
		let result = b.call("countdown".into(), vec![next]);
		b.ret(result);
		b.finish()
	}

	#[test]
	fn nesting_up_to_the_limit_fits_a_small_thread() {
		let worker = std::thread::Builder::new().stack_size(128 * 1024).spawn(|| {
			let (mut interpreter, _) = interpreter();
			interpreter.compile(&countdown()).unwrap();
			// the entry is depth 0, so countdown(n) nests n + 1 calls below it
			let deepest = interpreter.compile(&entry_calling("countdown", vec![Value::Float(998.0)])).unwrap();
			let deepest = interpreter.call(&deepest).map_err(|e| e.to_string());
			let too_deep = interpreter.compile(&entry_calling("countdown", vec![Value::Float(999.0)])).unwrap();
			let too_deep = interpreter.call(&too_deep).map_err(|e| e.to_string());
			(deepest, too_deep)
		});
		let (deepest, too_deep) = worker.unwrap().join().unwrap();
		assert_eq!(deepest, Ok(0.0));
		assert_eq!(too_deep, Err("call stack exhausted after 1000 nested calls".to_string()));
	}

	#[test]
	fn reject_declarations_and_unknown_entries() {
		let (mut interpreter, _) = interpreter();
		let declaration = Function::declaration("f".into(), vec![]);
		assert!(matches!(interpreter.compile(&declaration), Err(ExecutionError::NotCompiled(_))));
		assert!(matches!(interpreter.call(&"f".to_string()), Err(ExecutionError::NotCompiled(_))));
	}

	#[test]
	fn argument_count_is_checked() {
		let (mut interpreter, _) = interpreter();
		interpreter.compile(&fib()).unwrap();
		let entry = interpreter.compile(&entry_calling("fib", vec![])).unwrap();
		assert!(matches!(
			interpreter.call(&entry),
			Err(ExecutionError::ArgumentCount { expected: 1, found: 0, .. })
		));
	}
}
