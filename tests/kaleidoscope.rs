#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use kaleidoscope::{Session, SessionOptions, backend::{Backend, Host, Interpreter, optimize::optimize_function, verify::verify_function}, error::backend::{ExecutionError, VerifyError}, ir::Function, utils::RcCell};
	use pretty_assertions::assert_eq;

	/// The interpreter behind checks that refuse one function and an optimizer
	/// that strips the body of another.
	struct Faulty {
		interpreter: Interpreter<Vec<u8>>,
		rejected:    &'static str,
		stripped:    &'static str,
	}

	impl Backend for Faulty {
		type Entry = String;

		fn verify(&self, function: &Function) -> Result<(), VerifyError> {
			if function.name == self.rejected {
				return Err(VerifyError::MissingTerminator("entry".into()));
			}
			verify_function(function)
		}

		fn optimize(&self, function: Function) -> Function {
			if function.name == self.stripped {
				return Function::declaration(function.name, function.parameters);
			}
			optimize_function(function)
		}

		fn compile(&mut self, function: &Function) -> Result<String, ExecutionError> { self.interpreter.compile(function) }

		fn call(&mut self, entry: &String) -> Result<f64, ExecutionError> { self.interpreter.call(entry) }
	}

	fn faulty_session(rejected: &'static str, stripped: &'static str) -> Session<Vec<u8>, Faulty> {
		let output = RcCell::new(Vec::new());
		let interpreter = Interpreter::new(Host::new(output.clone()));
		Session::with_backend(Faulty { interpreter, rejected, stripped }, output, RcCell::new(Vec::new()), quiet())
	}

	fn quiet() -> SessionOptions { SessionOptions { dump_module: false, echo_definitions: false, ..Default::default() } }

	fn session(options: SessionOptions) -> Session<Vec<u8>> { Session::new(Vec::new(), Vec::new(), options) }

	/// Run `source`, returning what went to the output and diagnostic sinks.
	fn run(source: &str) -> (String, String) {
		let mut session = session(quiet());
		session.run(source.chars());
		(session.output().contents(), session.diagnostics().contents())
	}

	fn script(name: &str) -> PathBuf {
		PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("scripts").join(name)
	}

	fn run_script(name: &str, options: SessionOptions) -> (String, String) {
		let mut session = session(options);
		let result = session.run_file(script(name));
		assert!(result.is_ok());
		(session.output().contents(), session.diagnostics().contents())
	}

	#[test]
	fn precedence_climbing() {
		let (output, diagnostics) = run("1+2*3; 8-4-2; (1+2)*3; 1 < 2 + 0 * 5;");
		assert_eq!(output, "Evaluated to 7.0\nEvaluated to 2.0\nEvaluated to 9.0\nEvaluated to 1.0\n");
		assert_eq!(diagnostics, "");
	}

	#[test]
	fn operator_extensibility() {
		let (output, diagnostics) = run("def binary > 10 (a b) b < a; 1 > 2; 2 > 1;");
		assert_eq!(output, "Evaluated to 0.0\nEvaluated to 1.0\n");
		assert_eq!(diagnostics, "");
	}

	#[test]
	fn failed_operator_definition_rolls_back() {
		let mut session = session(quiet());
		session.run("def binary > 10 (a b) c; 1 > 2;".chars());

		assert_eq!(session.operators().precedence('>'), None);
		assert!(session.module().function("binary>").is_none());
		// `1` is a complete expression once `>` is no operator, and `> 2` is
		// then an application of an unknown prefix operator
		assert_eq!(session.output().contents(), "Evaluated to 1.0\n");
		assert_eq!(
			session.diagnostics().contents(),
			"Error: unknown variable name 'c'\nError: unknown unary operator '>'\n"
		);
	}

	#[test]
	fn redefinition_with_different_arity() {
		let (output, diagnostics) = run("def foo(a) a; def foo(a b) a+b; foo(5);");
		assert_eq!(
			diagnostics,
			"Error: redefinition of function 'foo' with different # args: declared 1, found 2\n"
		);
		assert_eq!(output, "Evaluated to 5.0\n");
	}

	#[test]
	fn redefinition_of_a_body() {
		let (output, diagnostics) = run("def foo(a) a; def foo(b) b + 1; foo(1);");
		assert_eq!(diagnostics, "Error: redefinition of function 'foo'\n");
		assert_eq!(output, "Evaluated to 1.0\n");
	}

	#[test]
	fn loop_variable_is_mutated_in_place() {
		let (output, _) = run("extern printd(x); def f() for i=1,i<4,1 in printd(i); f();");
		assert_eq!(output, "1.000000\n2.000000\n3.000000\n4.000000\nEvaluated to 0.0\n");
	}

	#[test]
	fn body_mutation_is_seen_by_the_next_iteration() {
		let (output, _) = run("extern printd(x); def f() for i = 1, i < 10 in printd(i) + (i = i * 2); f();");
		// 1, then 1*2+1, then 3*2+1; 14 ends the loop
		assert_eq!(output, "1.000000\n3.000000\n7.000000\nEvaluated to 0.0\n");
	}

	#[test]
	fn var_shadow_chain() {
		let (output, diagnostics) = run("var a=3 in (var a=a+1 in a) + a;");
		assert_eq!(output, "Evaluated to 7.0\n");
		assert_eq!(diagnostics, "");
	}

	#[test]
	fn anonymous_top_level_expression() {
		let (output, _) = run("4+5;");
		assert_eq!(output, "Evaluated to 9.0\n");
	}

	#[test]
	fn calls_resolve_at_run_time() {
		let (output, diagnostics) = run("extern later(x); def early(x) later(x) * 2; def later(x) x + 1; early(4);");
		assert_eq!(diagnostics, "");
		assert_eq!(output, "Evaluated to 10.0\n");
	}

	#[test]
	fn one_bad_statement_does_not_end_the_session() {
		let (output, diagnostics) = run("def f(x) (x; g(1); 2;");
		assert_eq!(output, "Evaluated to 2.0\n");
		assert_eq!(diagnostics, "Error: line 1: expected ')'\nError: unknown function referenced: 'g'\n");
	}

	#[test]
	fn runaway_recursion_is_reported() {
		let (output, diagnostics) = run("def f(x) f(x); f(1); 5;");
		assert_eq!(output, "Evaluated to 5.0\n");
		assert_eq!(diagnostics, "Error: call stack exhausted after 1000 nested calls\n");
	}

	#[test]
	fn deep_recursion_below_the_limit() {
		let (output, diagnostics) = run("def down(n) if n < 1 then 0 else down(n-1); down(998);");
		assert_eq!(output, "Evaluated to 0.0\n");
		assert_eq!(diagnostics, "");
	}

	#[test]
	fn rejected_operator_definition_is_discarded() {
		let mut session = faulty_session("binary>", "");
		session.run("def binary > 10 (a b) b < a; 4+5;".chars());

		assert_eq!(session.operators().precedence('>'), None);
		assert!(session.module().function("binary>").is_none());
		assert_eq!(session.output().contents(), "Evaluated to 9.0\n");
		assert_eq!(
			session.diagnostics().contents(),
			"Error: function 'binary>' failed verification: block 'entry' has no terminator\n"
		);
	}

	#[test]
	fn optimized_function_is_verified_again() {
		let mut session = faulty_session("", "twice");
		session.run("def twice(x) x * 2; 4+5; twice(1);".chars());

		assert!(session.module().function("twice").is_none());
		assert_eq!(session.output().contents(), "Evaluated to 9.0\n");
		assert_eq!(
			session.diagnostics().contents(),
			"Error: function 'twice' failed verification: function has no body\n\
			 Error: unknown function referenced: 'twice'\n"
		);
	}

	#[test]
	fn run_operator_script() {
		let (output, diagnostics) = run_script("operators.kal", quiet());
		assert_eq!(diagnostics, "");
		assert_eq!(
			output,
			"Evaluated to 1.0
Evaluated to 2.0
Evaluated to 1.0
Evaluated to 0.0
1.000000
2.000000
Evaluated to 0.0
"
		);
	}

	#[test]
	fn run_loop_script() {
		let (output, diagnostics) = run_script("loops.kal", quiet());
		assert_eq!(diagnostics, "");
		assert_eq!(
			output,
			"*****Evaluated to 0.0

Evaluated to 0.0
1.000000
2.000000
3.000000
4.000000
Evaluated to 0.0
Evaluated to 55.0
"
		);
	}

	#[test]
	fn optimization_preserves_results() {
		for name in ["operators.kal", "loops.kal"] {
			let optimized = run_script(name, quiet());
			let plain = run_script(name, SessionOptions { optimize: false, ..quiet() });
			assert_eq!(optimized, plain);
		}
	}

	#[test]
	fn module_dump_lists_every_function() {
		let options = SessionOptions { echo_definitions: false, ..Default::default() };
		let mut session = session(options);
		session.run("extern sin(x); def twice(x) x * 2; twice(3);".chars());

		let diagnostics = session.diagnostics().contents();
		assert!(diagnostics.starts_with("; ModuleID = 'my cool jit'\n"));
		assert!(diagnostics.contains("declare double @sin(double %x)\n"));
		assert!(diagnostics.contains("define double @twice(double %x) {\n"));
		assert!(diagnostics.contains("define double @__anon_expr0() {\n"));
		assert!(diagnostics.contains("call double @twice(double 3.0)"));
	}

	#[test]
	fn missing_script_is_an_error() {
		let mut session = session(quiet());
		assert!(session.run_file(script("missing.kal")).is_err());
	}
}
