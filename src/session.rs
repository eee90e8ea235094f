use std::{fmt, fs::read_to_string, io::Write, path::Path};

use anyhow::{Context, anyhow};

use crate::{KaleidoError, backend::{Backend, Host, Interpreter}, codegen::CodeGenerator, definition::{Function, Prototype}, error::parser::ParseError, ir::Module, lexer::{Lexer, SourceChars, TokenKind}, operators::OperatorTable, parser::Parser, utils::RcCell};

/// Name of the module all definitions of a session land in.
pub const MODULE_NAME: &str = "my cool jit";

/// Knobs of a session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
	/// Run the optimizer on every verified function.
	pub optimize:         bool,
	/// Written to the diagnostic sink whenever a new statement is expected.
	pub prompt:           Option<String>,
	/// Print the whole module at end of input.
	pub dump_module:      bool,
	/// Print the IR of every accepted definition and extern.
	pub echo_definitions: bool,
}

impl Default for SessionOptions {
	fn default() -> Self { Self { optimize: true, prompt: None, dump_module: true, echo_definitions: true } }
}

/// Session is the interactive driver: it reads top-level statements one at a
/// time and turns each into a definition, a declaration or an evaluation.
///
/// Results and host output go to `output`; confirmations, errors, prompts and
/// the final module dump go to `diagnostics`.
pub struct Session<W: Write, B: Backend = Interpreter<W>> {
	options:     SessionOptions,
	operators:   OperatorTable,
	module:      Module,
	backend:     B,
	output:      RcCell<W>,
	diagnostics: RcCell<W>,
}

impl<W: Write> Session<W> {
	/// A session running on the IR interpreter, whose host functions print to
	/// `output`.
	pub fn new(output: W, diagnostics: W, options: SessionOptions) -> Self {
		let output = RcCell::new(output);
		let backend = Interpreter::new(Host::new(output.clone()));
		Self::with_backend(backend, output, RcCell::new(diagnostics), options)
	}
}

impl Session<Box<dyn Write>> {
	/// A session on stdout and stderr.
	pub fn stdio(options: SessionOptions) -> Self {
		Self::new(Box::new(std::io::stdout()), Box::new(std::io::stderr()), options)
	}
}

impl<W: Write, B: Backend> Session<W, B> {
	pub fn with_backend(backend: B, output: RcCell<W>, diagnostics: RcCell<W>, options: SessionOptions) -> Self {
		Self {
			options,
			operators: OperatorTable::with_builtins(),
			module: Module::new(MODULE_NAME),
			backend,
			output,
			diagnostics,
		}
	}

	pub fn operators(&self) -> &OperatorTable { &self.operators }

	pub fn module(&self) -> &Module { &self.module }

	pub fn output(&self) -> &RcCell<W> { &self.output }

	pub fn diagnostics(&self) -> &RcCell<W> { &self.diagnostics }

	/// Run a source file to completion.
	pub fn run_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), KaleidoError> {
		let source = read_to_string(path).context("Failed open source file")?;
		self.run(source.chars());
		Ok(())
	}

	/// Run statements typed on stdin until end of input.
	pub fn run_prompt(&mut self) { self.run(SourceChars::new(std::io::stdin().lock())); }

	/// Process every statement of `source`, then dump the module.
	///
	/// Errors never stop the loop: each is reported and the next statement is
	/// read.
	///
	/// The prompt is written once before the first token is read and again
	/// before every dispatch, end of input included.
	pub fn run(&mut self, source: impl Iterator<Item = char>) {
		self.prompt();
		let mut parser = Parser::new(Lexer::new(source));
		loop {
			self.prompt();
			match parser.current().kind {
				TokenKind::Eof => break,
				TokenKind::Char(';') => {
					parser.advance();
				}
				TokenKind::Def => self.handle_definition(&mut parser),
				TokenKind::Extern => self.handle_extern(&mut parser),
				_ => self.handle_top_level(&mut parser),
			}
		}
		if self.options.dump_module {
			Self::emit(&self.diagnostics, format_args!("{}", self.module));
		}
	}

	/// Lower, verify, optimize and register a definition.
	pub fn define(&mut self, function: Function) -> Result<String, KaleidoError> {
		Ok(self.compile(function)?.0)
	}

	/// Record an `extern` declaration.
	pub fn declare(&mut self, prototype: &Prototype) -> Result<String, KaleidoError> {
		Ok(CodeGenerator::new(&mut self.module, &mut self.operators).declare(prototype)?)
	}

	/// Compile a top-level expression into an anonymous function and run it.
	pub fn evaluate(&mut self, function: Function) -> Result<f64, KaleidoError> {
		let (_, entry) = self.compile(function)?;
		Ok(self.backend.call(&entry)?)
	}

	fn compile(&mut self, function: Function) -> Result<(String, B::Entry), KaleidoError> {
		let name = CodeGenerator::new(&mut self.module, &mut self.operators).define(
			function,
			&self.backend,
			self.options.optimize,
		)?;
		let compiled = self.module.function(&name).ok_or_else(|| anyhow!("function '{name}' missing after definition"))?;
		let entry = self.backend.compile(compiled)?;
		Ok((name, entry))
	}

	fn handle_definition<I: Iterator<Item = char>>(&mut self, parser: &mut Parser<I>) {
		match parser.parse_definition(&self.operators) {
			Ok(function) => match self.define(function) {
				Ok(name) => self.echo("Parsed a function definition.", &name),
				Err(e) => self.report(&e),
			},
			Err(e) => self.recover(parser, e),
		}
	}

	fn handle_extern<I: Iterator<Item = char>>(&mut self, parser: &mut Parser<I>) {
		match parser.parse_extern() {
			Ok(prototype) => match self.declare(&prototype) {
				Ok(name) => self.echo("Parsed an extern.", &name),
				Err(e) => self.report(&e),
			},
			Err(e) => self.recover(parser, e),
		}
	}

	fn handle_top_level<I: Iterator<Item = char>>(&mut self, parser: &mut Parser<I>) {
		match parser.parse_top_level(&self.operators) {
			Ok(function) => match self.evaluate(function) {
				Ok(value) => Self::emit(&self.output, format_args!("Evaluated to {value:?}\n")),
				Err(e) => self.report(&e),
			},
			Err(e) => self.recover(parser, e),
		}
	}

	/// Report a syntax error and skip the offending token.
	fn recover<I: Iterator<Item = char>>(&mut self, parser: &mut Parser<I>, error: ParseError) {
		self.report(&error.into());
		parser.advance();
	}

	fn report(&self, error: &KaleidoError) { Self::emit(&self.diagnostics, format_args!("Error: {error}\n")); }

	fn echo(&self, message: &str, name: &str) {
		if !self.options.echo_definitions {
			return;
		}
		match self.module.function(name) {
			Some(function) => Self::emit(&self.diagnostics, format_args!("{message}\n{function}")),
			None => Self::emit(&self.diagnostics, format_args!("{message}\n")),
		}
	}

	fn prompt(&self) {
		if let Some(prompt) = &self.options.prompt {
			Self::emit(&self.diagnostics, format_args!("{prompt}"));
		}
	}

	fn emit(sink: &RcCell<W>, args: fmt::Arguments<'_>) {
		let mut sink = sink.borrow_mut();
		if let Err(e) = sink.write_fmt(args).and_then(|()| sink.flush()) {
			eprintln!("Failed write: {e}");
		}
	}
}
