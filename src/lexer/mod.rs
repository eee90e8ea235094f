//! Streaming lexer for Kaleidoscope.
//!
//! The lexer pulls characters one at a time and carries exactly one character
//! of lookahead between calls, so it can sit directly on top of an interactive
//! stream: a token is produced as soon as the character after it has been
//! read, and nothing is ever pushed back.
//!
//! Lexical grammar:
//!
//! ``` BNF
//! identifier → [A-Za-z][A-Za-z0-9]* ;
//! number     → [0-9.]+ ;
//! comment    → "#" ( any except newline )* ;
//! char       → any other single character ;
//! ```
//!
//! Number literals are scanned permissively: `1.2.3` is one token and its
//! value is the longest prefix that reads as a decimal number, `1.2`.
mod token;

use std::{collections::VecDeque, io::BufRead};

use TokenKind::*;
pub use token::*;

/// A lexer over any character source
pub struct Lexer<I: Iterator<Item = char>> {
	/// Remaining input characters
	source:    I,
	/// The carried-over lookahead character, `None` once the source is drained
	last_char: Option<char>,
	/// Line of `last_char`
	line:      usize,
}

impl<I: Iterator<Item = char>> Lexer<I> {
	pub fn new(source: I) -> Self { Self { source, last_char: Some(' '), line: 1 } }

	/// Produce the next token, `Eof` once the source is exhausted.
	pub fn next_token(&mut self) -> Token {
		loop {
			while self.last_char.is_some_and(char::is_whitespace) {
				self.bump();
			}

			let line = self.line;
			let Some(c) = self.last_char else {
				return Token::new(Eof, line);
			};

			let kind = match c {
				c if c.is_ascii_alphabetic() => self.identifier(),
				c if c.is_ascii_digit() || c == '.' => self.number(),
				'#' => {
					self.skip_comment();
					continue;
				}
				c => {
					self.bump();
					Char(c)
				}
			};
			return Token::new(kind, line);
		}
	}

	fn bump(&mut self) {
		self.last_char = self.source.next();
		if self.last_char == Some('\n') {
			self.line += 1;
		}
	}

	/// Scan an identifier or keyword
	fn identifier(&mut self) -> TokenKind {
		let mut text = String::new();
		while let Some(c) = self.last_char.filter(char::is_ascii_alphanumeric) {
			text.push(c);
			self.bump();
		}
		TokenKind::keyword_or_identifier(text)
	}

	/// Scan a number literal
	fn number(&mut self) -> TokenKind {
		let mut text = String::new();
		while let Some(c) = self.last_char.filter(|c| c.is_ascii_digit() || *c == '.') {
			text.push(c);
			self.bump();
		}
		Number(parse_number(&text))
	}

	fn skip_comment(&mut self) {
		while self.last_char.is_some_and(|c| c != '\n' && c != '\r') {
			self.bump();
		}
	}
}

/// Value of the longest prefix of `text` that reads as a decimal number, or
/// `0.0` when there is none (a lone `.`).
///
/// `text` holds only digits and dots, so that prefix ends at the second dot.
fn parse_number(text: &str) -> f64 {
	let end = text.match_indices('.').nth(1).map_or(text.len(), |(index, _)| index);
	text[..end].parse().unwrap_or(0.0)
}

/// Character source over a buffered reader, pulling one line at a time so an
/// interactive session is lexed as soon as a line is entered.
pub struct SourceChars<R: BufRead> {
	reader:  R,
	pending: VecDeque<char>,
	done:    bool,
}

impl<R: BufRead> SourceChars<R> {
	pub fn new(reader: R) -> Self { Self { reader, pending: VecDeque::new(), done: false } }
}

impl<R: BufRead> Iterator for SourceChars<R> {
	type Item = char;

	fn next(&mut self) -> Option<char> {
		while self.pending.is_empty() && !self.done {
			let mut line = String::new();
			match self.reader.read_line(&mut line) {
				Ok(0) => self.done = true,
				Ok(_) => self.pending.extend(line.chars()),
				Err(e) => {
					eprintln!("Failed read line: {e}");
					self.done = true;
				}
			}
		}
		self.pending.pop_front()
	}
}
