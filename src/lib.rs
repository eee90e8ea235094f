//! # From a line of Kaleidoscope to a number
//!
//! User's input: `def binary| 5 (a b) if a then 1 else if b then 1 else 0;`
//! followed later by `0 | 1;`

//! ## Lexing
//!
//! The `lexer` turns characters into tokens one at a time, keeping a single
//! character of lookahead so it can sit on an interactive stream. Keywords,
//! identifiers and numbers are tokens of their own; every other character,
//! `|` included, is a bare character token. Whether such a character is an
//! operator is not the lexer's business.

//! ## Parsing
//!
//! The `parser` is recursive descent for everything except binary operators,
//! which are grouped by precedence climbing over the `OperatorTable`. The
//! table starts with `= < + - *` and grows while the session runs: once the
//! definition above is accepted, `|` binds with precedence 5, so
//!
//! ``` markdown
//! a < b | c        parses as        (| (< a b) c)
//! ```
//!
//! A definition that fails later on takes its operator back out of the table.

//! ## Code generation
//!
//! `codegen` lowers each `Expression` tree into the `ir`, an SSA form with
//! basic blocks, phis at control-flow joins and stack slots for variables.
//! `binary|` and `unary!` are ordinary functions; applying an operator is a
//! call to them.

//! ## Execution
//!
//! A `backend` verifies each generated function, optionally simplifies it
//! (constant folding, branch folding, dead block and dead code removal) and
//! makes it callable. Top-level expressions are wrapped in anonymous
//! zero-argument functions and run immediately. The reference backend
//! interprets the IR and resolves `extern` declarations against a small set
//! of host functions such as `putchard`, `printd` and `sin`.

//! ## Session
//!
//! The `Session` drives the whole pipeline statement by statement, reports
//! every failure without giving up on the rest of the input, and prints the
//! accumulated module when the input ends.

pub mod backend;
pub mod cli;
pub mod codegen;
pub mod definition;
pub mod error;
pub mod ir;
pub mod lexer;
pub mod operators;
pub mod parser;
pub mod session;
pub mod utils;

pub use error::KaleidoError;
pub use session::{Session, SessionOptions};
