/// A token produced by the lexer, tagged with the line it starts on
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
	pub kind: TokenKind,
	pub line: usize,
}

impl Token {
	pub fn new(kind: TokenKind, line: usize) -> Self { Self { kind, line } }
}

/// The different kinds of tokens in Kaleidoscope
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
	/// End of file/input.
	Eof,
	/// Function definition keyword `def`.
	Def,
	/// External declaration keyword `extern`.
	Extern,
	/// Identifier, e.g. a variable or function name.
	Identifier(String),
	/// Number literal, e.g. `123.45`.
	Number(f64),
	/// `if`
	If,
	/// `then`
	Then,
	/// `else`
	Else,
	/// `for`
	For,
	/// `in`
	In,
	/// Local binding keyword `var`.
	Var,
	/// Unary operator definition keyword `unary`.
	Unary,
	/// Binary operator definition keyword `binary`.
	Binary,
	/// Any other single character: punctuation and operator symbols.
	Char(char),
}

impl TokenKind {
	pub fn keyword_or_identifier(value: String) -> Self {
		match value.as_str() {
			"def" => TokenKind::Def,
			"extern" => TokenKind::Extern,
			"if" => TokenKind::If,
			"then" => TokenKind::Then,
			"else" => TokenKind::Else,
			"for" => TokenKind::For,
			"in" => TokenKind::In,
			"var" => TokenKind::Var,
			"unary" => TokenKind::Unary,
			"binary" => TokenKind::Binary,
			_ => TokenKind::Identifier(value),
		}
	}

	pub fn is_char(&self, expected: char) -> bool { matches!(self, TokenKind::Char(c) if *c == expected) }
}

impl std::fmt::Display for TokenKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		use TokenKind::*;
		match self {
			Eof => write!(f, "end of input"),
			Def => write!(f, "'def'"),
			Extern => write!(f, "'extern'"),
			Identifier(name) => write!(f, "identifier '{name}'"),
			Number(n) => write!(f, "number {n}"),
			If => write!(f, "'if'"),
			Then => write!(f, "'then'"),
			Else => write!(f, "'else'"),
			For => write!(f, "'for'"),
			In => write!(f, "'in'"),
			Var => write!(f, "'var'"),
			Unary => write!(f, "'unary'"),
			Binary => write!(f, "'binary'"),
			Char(c) => write!(f, "'{c}'"),
		}
	}
}
