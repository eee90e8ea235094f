//! Lowering of parsed definitions into IR.
//!
//! A body is built into a detached `ir::Function` and only lands in the
//! module once it has been lowered and verified completely. A failed
//! definition therefore never leaves a half-built body behind: a declaration
//! it replaced is untouched, and a declaration it created is removed again.
//!
//! Every variable, parameters included, lives in a stack slot. Reads are
//! `load`s and assignments are `store`s, so mutation needs no SSA
//! construction here.

mod scope;

pub use scope::{OperatorRegistration, ScopeTable, Shadowed};

use crate::{backend::Backend, definition::{self, Prototype}, error::codegen::CodegenError, ir::{self, Builder, CompareOp, Module, Value}, operators::{OperatorKind, OperatorTable}, parser::expression::Expression};

pub type CodegenResult<T> = Result<T, CodegenError>;

/// Lowers definitions into a module, maintaining the operator table.
pub struct CodeGenerator<'c> {
	module:    &'c mut Module,
	operators: &'c mut OperatorTable,
}

/// Outcome of declaring a prototype.
enum Declared {
	/// The prototype introduced a new declaration.
	Created(String),
	/// A compatible declaration already existed.
	Existing(String),
}

impl Declared {
	fn name(&self) -> &str {
		match self {
			Declared::Created(name) | Declared::Existing(name) => name,
		}
	}
}

impl<'c> CodeGenerator<'c> {
	pub fn new(module: &'c mut Module, operators: &'c mut OperatorTable) -> Self { Self { module, operators } }

	/// Declare an `extern`, returning the function's name.
	pub fn declare(&mut self, prototype: &Prototype) -> CodegenResult<String> {
		Ok(self.prototype(prototype)?.name().to_string())
	}

	/// Lower, verify and optionally optimize a definition, returning the name
	/// it was stored under.
	///
	/// A `binary` operator definition takes effect in the operator table only
	/// if this succeeds.
	pub fn define<B: Backend>(
		&mut self,
		function: definition::Function,
		backend: &B,
		optimize: bool,
	) -> CodegenResult<String> {
		let definition::Function { prototype, body } = function;
		let declared = self.prototype(&prototype)?;
		let name = declared.name().to_string();

		let registration = prototype
			.binary_operator()
			.map(|(symbol, precedence)| OperatorRegistration::install(self.operators, symbol, precedence));

		let verify = |function: &ir::Function| {
			backend.verify(function).map_err(|source| CodegenError::Verification { name: name.clone(), source })
		};
		let lowered = lower_body(self.module, &name, &prototype.parameters, body).and_then(|function| {
			verify(&function)?;
			if !optimize {
				return Ok(function);
			}
			let optimized = backend.optimize(function);
			verify(&optimized)?;
			Ok(optimized)
		});

		match lowered {
			Ok(function) => {
				self.module.insert(function);
				if let Some(registration) = registration {
					registration.commit();
				}
				Ok(name)
			}
			Err(e) => {
				if let Declared::Created(name) = declared {
					self.module.remove(&name);
				}
				Err(e)
			}
		}
	}

	/// Resolve the name of `prototype` and check it against an existing
	/// function of that name, declaring it if there is none.
	fn prototype(&mut self, prototype: &Prototype) -> CodegenResult<Declared> {
		let name = if prototype.is_anonymous() { self.module.anonymous_name() } else { prototype.name.clone() };
		match self.module.function(&name) {
			Some(existing) if existing.arity() != prototype.parameters.len() => Err(CodegenError::RedefinitionArity {
				name,
				declared: existing.arity(),
				found: prototype.parameters.len(),
			}),
			Some(existing) if !existing.is_declaration() => Err(CodegenError::Redefinition(name)),
			Some(_) => Ok(Declared::Existing(name)),
			None => {
				self.module.insert(ir::Function::declaration(name.clone(), prototype.parameters.clone()));
				Ok(Declared::Created(name))
			}
		}
	}
}

/// Build the body of `name`: spill parameters into slots, lower the body
/// expression and return its value.
fn lower_body(module: &Module, name: &str, parameters: &[String], body: Expression) -> CodegenResult<ir::Function> {
	let function = ir::Function::declaration(name.to_string(), parameters.to_vec());
	let mut lowering = Lowering { module, builder: Builder::new(function), scope: ScopeTable::default() };
	let entry = lowering.builder.append_block("entry");
	lowering.builder.position_at_end(entry);
	for (index, parameter) in parameters.iter().enumerate() {
		let slot = lowering.builder.alloca(parameter);
		lowering.builder.store(slot, Value::Param(index));
		lowering.scope.bind(parameter.clone(), slot);
	}
	let value = lowering.expression(body)?;
	lowering.builder.ret(value);
	Ok(lowering.builder.finish())
}

/// State while lowering one function body.
struct Lowering<'m> {
	/// Read-only view for resolving callees
	module:  &'m Module,
	builder: Builder,
	scope:   ScopeTable,
}

impl AsMut<ScopeTable> for Lowering<'_> {
	fn as_mut(&mut self) -> &mut ScopeTable { &mut self.scope }
}

impl Lowering<'_> {
	fn expression(&mut self, expression: Expression) -> CodegenResult<Value> {
		match expression {
			Expression::Number(value) => Ok(Value::Float(value)),
			Expression::Variable(name) => {
				let slot = self.scope.lookup(&name).ok_or(CodegenError::UnknownVariable(name))?;
				Ok(self.builder.load(slot))
			}
			Expression::Unary { operator, operand } => {
				let operand = self.expression(*operand)?;
				let callee = OperatorKind::Unary.function_name(operator);
				if self.module.function(&callee).is_none() {
					return Err(CodegenError::UnknownUnaryOperator(operator));
				}
				Ok(self.builder.call(callee, vec![operand]))
			}
			Expression::Binary { operator: '=', left, right } => self.assignment(*left, *right),
			Expression::Binary { operator, left, right } => {
				let left = self.expression(*left)?;
				let right = self.expression(*right)?;
				self.binary(operator, left, right)
			}
			Expression::Call { callee, arguments } => self.call(callee, arguments),
			Expression::If { condition, then_branch, else_branch } => {
				self.if_else(*condition, *then_branch, *else_branch)
			}
			Expression::For { variable, start, end, step, body } => {
				self.for_loop(variable, *start, *end, step.map(|step| *step), *body)
			}
			Expression::Var { bindings, body } => self.var(bindings, *body),
		}
	}

	/// `name = value`: store and yield the stored value.
	fn assignment(&mut self, left: Expression, right: Expression) -> CodegenResult<Value> {
		let Expression::Variable(name) = left else {
			return Err(CodegenError::AssignToNonVariable);
		};
		let value = self.expression(right)?;
		let slot = self.scope.lookup(&name).ok_or(CodegenError::UnknownVariable(name))?;
		self.builder.store(slot, value);
		Ok(value)
	}

	fn binary(&mut self, operator: char, left: Value, right: Value) -> CodegenResult<Value> {
		match operator {
			'+' => Ok(self.builder.fadd(left, right)),
			'-' => Ok(self.builder.fsub(left, right)),
			'*' => Ok(self.builder.fmul(left, right)),
			'<' => {
				let less = self.builder.fcmp(CompareOp::Ult, left, right);
				Ok(self.builder.ui_to_fp(less))
			}
			_ => {
				let callee = OperatorKind::Binary.function_name(operator);
				if self.module.function(&callee).is_none() {
					return Err(CodegenError::UnknownBinaryOperator(operator));
				}
				Ok(self.builder.call(callee, vec![left, right]))
			}
		}
	}

	fn call(&mut self, callee: String, arguments: Vec<Expression>) -> CodegenResult<Value> {
		let arity = match self.module.function(&callee) {
			Some(function) => function.arity(),
			None => return Err(CodegenError::UnknownFunction(callee)),
		};
		if arity != arguments.len() {
			return Err(CodegenError::ArgumentCount { callee, expected: arity, found: arguments.len() });
		}
		let arguments = arguments.into_iter().map(|argument| self.expression(argument)).collect::<CodegenResult<_>>()?;
		Ok(self.builder.call(callee, arguments))
	}

	/// Both arms join in a merge block whose phi yields the taken arm's value.
	fn if_else(
		&mut self,
		condition: Expression,
		then_branch: Expression,
		else_branch: Expression,
	) -> CodegenResult<Value> {
		let condition = self.expression(condition)?;
		let condition = self.builder.fcmp(CompareOp::One, condition, Value::Float(0.0));

		let then_block = self.builder.append_block("then");
		let else_block = self.builder.append_block("else");
		let merge = self.builder.append_block("ifcont");
		self.builder.branch(condition, then_block, else_block);

		self.builder.position_at_end(then_block);
		let then_value = self.expression(then_branch)?;
		self.builder.jump(merge);
		// the arm may have moved the insertion point, e.g. into a nested merge
		let then_end = self.builder.current_block();

		self.builder.position_at_end(else_block);
		let else_value = self.expression(else_branch)?;
		self.builder.jump(merge);
		let else_end = self.builder.current_block();

		self.builder.position_at_end(merge);
		Ok(self.builder.phi(vec![(then_end, then_value), (else_end, else_value)]))
	}

	/// Body first, then step, then the end condition: the body always runs at
	/// least once. The loop itself yields `0.0`.
	fn for_loop(
		&mut self,
		variable: String,
		start: Expression,
		end: Expression,
		step: Option<Expression>,
		body: Expression,
	) -> CodegenResult<Value> {
		let slot = self.builder.alloca(&variable);
		// the start value cannot see the loop variable
		let start = self.expression(start)?;
		self.builder.store(slot, start);

		let loop_block = self.builder.append_block("loop");
		self.builder.jump(loop_block);
		self.builder.position_at_end(loop_block);

		let mut scoped = Shadowed::new(self);
		scoped.bind(variable, slot);
		scoped.expression(body)?;
		let step = match step {
			Some(step) => scoped.expression(step)?,
			None => Value::Float(1.0),
		};
		let end = scoped.expression(end)?;

		let current = scoped.builder.load(slot);
		let next = scoped.builder.fadd(current, step);
		scoped.builder.store(slot, next);
		let more = scoped.builder.fcmp(CompareOp::One, end, Value::Float(0.0));

		let after = scoped.builder.append_block("afterloop");
		scoped.builder.branch(more, loop_block, after);
		scoped.builder.position_at_end(after);
		Ok(Value::Float(0.0))
	}

	/// Each initializer sees the bindings before its own name, including
	/// earlier names of the same `var`.
	fn var(&mut self, bindings: Vec<(String, Option<Expression>)>, body: Expression) -> CodegenResult<Value> {
		let mut scoped = Shadowed::new(self);
		for (name, initializer) in bindings {
			let value = match initializer {
				Some(initializer) => scoped.expression(initializer)?,
				None => Value::Float(0.0),
			};
			let slot = scoped.builder.alloca(&name);
			scoped.builder.store(slot, value);
			scoped.bind(name, slot);
		}
		scoped.expression(body)
	}
}
