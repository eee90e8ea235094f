//! The `Lexer` uses the lexical grammar, its alphabet is characters. The
//! `Parser` uses the syntactic grammar, its alphabet is tokens, and it produces
//! `Expression` trees wrapped into `Function` definitions.
//!
//! Binary operators are not spelled out as grammar levels. Their grouping is
//! decided by precedence climbing over the `OperatorTable`, which user programs
//! extend with `def binary`, so the grammar changes while the session runs.
//!
//! Grammar:
//!
//! ``` BNF
//! toplevel   → definition | external | expression ;
//! definition → "def" prototype expression ;
//! external   → "extern" prototype ;
//! prototype  → identifier "(" identifier* ")"
//!            | "unary" CHAR "(" identifier ")"
//!            | "binary" CHAR NUMBER? "(" identifier identifier ")" ;
//! expression → unary ( BINOP unary )* ;
//! unary      → CHAR unary | primary ;
//! primary    → NUMBER
//!            | identifier ( "(" ( expression ( "," expression )* )? ")" )?
//!            | "(" expression ")"
//!            | "if" expression "then" expression "else" expression
//!            | "for" identifier "=" expression "," expression ( "," expression )? "in" expression
//!            | "var" identifier ( "=" expression )? ( "," identifier ( "=" expression )? )* "in" expression ;
//! ```

pub mod expression;

use TokenKind::*;

use crate::{definition::{Function, Prototype}, error::parser::{ParseError, ParseErrorType}, lexer::{Lexer, Token, TokenKind}, operators::{OperatorKind, OperatorTable}, parser::expression::Expression};

pub type ParseResult<T> = Result<T, ParseError>;

/// Recursive-descent parser with a single token of lookahead.
///
/// The operator table is not owned: it is passed to every entry point since
/// the code generator changes it between two statements.
pub struct Parser<I: Iterator<Item = char>> {
	lexer:   Lexer<I>,
	/// The lookahead token
	current: Token,
}

impl<I: Iterator<Item = char>> Parser<I> {
	/// Create a parser and read the first token.
	pub fn new(mut lexer: Lexer<I>) -> Self {
		let current = lexer.next_token();
		Self { lexer, current }
	}

	/// Peek at the lookahead token.
	pub fn current(&self) -> &Token { &self.current }

	/// Consume the lookahead token and read the next one.
	pub fn advance(&mut self) -> Token {
		let next = self.lexer.next_token();
		std::mem::replace(&mut self.current, next)
	}

	/// Parse `def prototype expression`.
	pub fn parse_definition(&mut self, operators: &OperatorTable) -> ParseResult<Function> {
		self.advance(); // consume 'def'
		let prototype = self.prototype()?;
		let body = self.expression(operators)?;
		Ok(Function::new(prototype, *body))
	}

	/// Parse `extern prototype`.
	pub fn parse_extern(&mut self) -> ParseResult<Prototype> {
		self.advance(); // consume 'extern'
		self.prototype()
	}

	/// Parse a bare expression and wrap it into an anonymous function.
	pub fn parse_top_level(&mut self, operators: &OperatorTable) -> ParseResult<Function> {
		let body = self.expression(operators)?;
		Ok(Function::top_level(*body))
	}

	/// Parse an expression.
	pub fn expression(&mut self, operators: &OperatorTable) -> ParseResult<Box<Expression>> {
		let left = self.unary(operators)?;
		self.binary_rhs(operators, 0, left)
	}

	/// Fold operators binding at least as tightly as `min_precedence` into
	/// `left`.
	fn binary_rhs(
		&mut self,
		operators: &OperatorTable,
		min_precedence: u32,
		mut left: Box<Expression>,
	) -> ParseResult<Box<Expression>> {
		loop {
			let Some((operator, precedence)) = self.binary_operator(operators) else {
				return Ok(left);
			};
			if precedence < min_precedence {
				return Ok(left);
			}
			self.advance(); // consume operator

			let mut right = self.unary(operators)?;
			// A tighter operator after `right` takes it as its left operand first.
			if self.binary_operator(operators).is_some_and(|(_, next)| next > precedence) {
				right = self.binary_rhs(operators, precedence + 1, right)?;
			}
			left = Expression::binary(operator, left, right);
		}
	}

	/// The lookahead and its precedence, if it is a binary operator.
	fn binary_operator(&self, operators: &OperatorTable) -> Option<(char, u32)> {
		match self.current.kind {
			Char(symbol) => operators.precedence(symbol).map(|precedence| (symbol, precedence)),
			_ => None,
		}
	}

	/// Parse unary expressions.
	fn unary(&mut self, operators: &OperatorTable) -> ParseResult<Box<Expression>> {
		match self.current.kind {
			Char(operator) if operator != '(' && operator != ',' => {
				self.advance();
				Ok(Expression::unary(operator, self.unary(operators)?))
			}
			_ => self.primary(operators),
		}
	}

	/// Parse primary expressions.
	fn primary(&mut self, operators: &OperatorTable) -> ParseResult<Box<Expression>> {
		match &self.current.kind {
			Identifier(_) => self.identifier(operators),
			Number(value) => {
				let value = *value;
				self.advance();
				Ok(Box::new(Expression::Number(value)))
			}
			Char('(') => {
				self.advance(); // consume '('
				let expr = self.expression(operators)?;
				if !self.current.kind.is_char(')') {
					return Err(self.error(ParseErrorType::UnterminatedParenthesis));
				}
				self.advance(); // consume ')'
				Ok(expr)
			}
			If => self.if_else(operators),
			For => self.for_loop(operators),
			Var => self.var(operators),
			other => Err(self.error(ParseErrorType::ExpectedExpression(other.to_string()))),
		}
	}

	/// Parse a variable reference or a call.
	fn identifier(&mut self, operators: &OperatorTable) -> ParseResult<Box<Expression>> {
		let name = self.expect_identifier("identifier", "expression start")?;
		if !self.current.kind.is_char('(') {
			return Ok(Box::new(Expression::Variable(name)));
		}
		self.advance(); // consume '('

		let mut arguments = Vec::new();
		if !self.current.kind.is_char(')') {
			loop {
				arguments.push(*self.expression(operators)?);
				if self.current.kind.is_char(')') {
					break;
				}
				if !self.current.kind.is_char(',') {
					return Err(self.error(ParseErrorType::ExpectedArgumentSeparator));
				}
				self.advance(); // consume ','
			}
		}
		self.advance(); // consume ')'

		Ok(Expression::call(name, arguments))
	}

	fn if_else(&mut self, operators: &OperatorTable) -> ParseResult<Box<Expression>> {
		self.advance(); // consume 'if'
		let condition = self.expression(operators)?;
		self.expect(|kind| *kind == Then, "'then'", "'if' condition")?;
		let then_branch = self.expression(operators)?;
		self.expect(|kind| *kind == Else, "'else'", "'then' branch")?;
		let else_branch = self.expression(operators)?;
		Ok(Expression::if_else(condition, then_branch, else_branch))
	}

	fn for_loop(&mut self, operators: &OperatorTable) -> ParseResult<Box<Expression>> {
		self.advance(); // consume 'for'
		let variable = self.expect_identifier("identifier", "'for'")?;
		self.expect(|kind| kind.is_char('='), "'='", "'for' variable")?;
		let start = self.expression(operators)?;
		self.expect(|kind| kind.is_char(','), "','", "'for' start value")?;
		let end = self.expression(operators)?;

		let step = if self.current.kind.is_char(',') {
			self.advance();
			Some(self.expression(operators)?)
		} else {
			None
		};

		self.expect(|kind| *kind == In, "'in'", "'for' header")?;
		let body = self.expression(operators)?;
		Ok(Expression::for_loop(variable, start, end, step, body))
	}

	fn var(&mut self, operators: &OperatorTable) -> ParseResult<Box<Expression>> {
		self.advance(); // consume 'var'
		let mut bindings = Vec::new();
		let mut name = self.expect_identifier("identifier", "'var'")?;
		loop {
			let initializer = if self.current.kind.is_char('=') {
				self.advance();
				Some(*self.expression(operators)?)
			} else {
				None
			};
			bindings.push((name, initializer));

			if !self.current.kind.is_char(',') {
				break;
			}
			self.advance(); // consume ','
			name = self.expect_identifier("identifier", "',' in 'var'")?;
		}

		self.expect(|kind| *kind == In, "'in'", "'var' bindings")?;
		let body = self.expression(operators)?;
		Ok(Expression::var(bindings, body))
	}

	/// Parse function and operator prototypes.
	fn prototype(&mut self) -> ParseResult<Prototype> {
		let (kind, name, precedence) = match &self.current.kind {
			Identifier(_) => (OperatorKind::Function, self.expect_identifier("function name", "prototype")?, None),
			Unary => {
				self.advance();
				let symbol = self.operator_symbol(OperatorKind::Unary)?;
				(OperatorKind::Unary, symbol.to_string(), None)
			}
			Binary => {
				self.advance();
				let symbol = self.operator_symbol(OperatorKind::Binary)?;
				let precedence = match self.current.kind {
					Number(value) => {
						if !(1.0..=100.0).contains(&value) {
							return Err(self.error(ParseErrorType::InvalidPrecedence(value)));
						}
						self.advance();
						Some(value as u32)
					}
					_ => None,
				};
				(OperatorKind::Binary, symbol.to_string(), precedence)
			}
			_ => return Err(self.error(ParseErrorType::ExpectedFunctionName)),
		};

		self.expect(|kind| kind.is_char('('), "'('", "prototype name")?;
		let mut parameters = Vec::new();
		while let Identifier(parameter) = &self.current.kind {
			parameters.push(parameter.clone());
			self.advance();
		}
		self.expect(|kind| kind.is_char(')'), "')'", "prototype parameters")?;

		match (kind.operand_count(), name.chars().next()) {
			(None, _) => Ok(Prototype::new(name, parameters)),
			(Some(expected), Some(symbol)) => {
				if parameters.len() != expected {
					return Err(self.error(ParseErrorType::InvalidOperandCount {
						kind,
						expected,
						found: parameters.len(),
					}));
				}
				Ok(Prototype::operator(kind, symbol, parameters, precedence))
			}
			(Some(_), None) => Err(self.error(ParseErrorType::ExpectedOperatorSymbol(kind))),
		}
	}

	/// Consume a single printable character naming an operator.
	fn operator_symbol(&mut self, kind: OperatorKind) -> ParseResult<char> {
		match self.current.kind {
			Char(symbol) if symbol.is_ascii_graphic() => {
				self.advance();
				Ok(symbol)
			}
			_ => Err(self.error(ParseErrorType::ExpectedOperatorSymbol(kind))),
		}
	}

	fn expect(
		&mut self,
		matches: impl Fn(&TokenKind) -> bool,
		what: &'static str,
		after: &'static str,
	) -> ParseResult<Token> {
		if !matches(&self.current.kind) {
			return Err(self.error(ParseErrorType::Expected { what, after }));
		}
		Ok(self.advance())
	}

	fn expect_identifier(&mut self, what: &'static str, after: &'static str) -> ParseResult<String> {
		match &self.current.kind {
			Identifier(name) => {
				let name = name.clone();
				self.advance();
				Ok(name)
			}
			_ => Err(self.error(ParseErrorType::Expected { what, after })),
		}
	}

	fn error(&self, r#type: ParseErrorType) -> ParseError { ParseError::new(self.current.line, r#type) }
}
