/// Structural or typing defect found by the IR verifier
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum VerifyError {
	#[error("function has no body")]
	EmptyBody,
	#[error("block '{0}' has no terminator")]
	MissingTerminator(String),
	#[error("block '{block}' branches to unknown block #{target}")]
	UnknownBlock { block: String, target: usize },
	#[error("instruction %{0} is not placed in exactly one block")]
	Misplaced(usize),
	#[error("phi %{inst} is not at the start of block '{block}'")]
	PhiPosition { block: String, inst: usize },
	#[error("phi %{inst} in block '{block}' does not match the block's predecessors")]
	PhiPredecessors { block: String, inst: usize },
	#[error("operand {operand} of {user} is not defined")]
	UndefinedOperand { user: String, operand: String },
	#[error("entry block '{0}' has predecessors")]
	EntryPredecessor(String),
	#[error("definition of {operand} does not dominate its use in block '{block}'")]
	Dominance { block: String, operand: String },
	#[error("type mismatch in {context}: expected {expected}, found {found}")]
	TypeMismatch { context: String, expected: &'static str, found: &'static str },
	#[error("stack slot #{0} is out of range")]
	UnknownSlot(usize),
	#[error("parameter #{0} is out of range")]
	UnknownParameter(usize),
}

/// Failures while running compiled code
#[derive(thiserror::Error, Debug)]
pub enum ExecutionError {
	#[error("function '{0}' has not been compiled")]
	NotCompiled(String),
	#[error("unresolved external symbol '{0}'")]
	UnresolvedSymbol(String),
	#[error("incorrect # arguments passed to '{callee}': expected {expected}, found {found}")]
	ArgumentCount { callee: String, expected: usize, found: usize },
	#[error("call stack exhausted after {0} nested calls")]
	StackExhausted(usize),
	#[error("malformed function '{0}': {1}")]
	Malformed(String, &'static str),
	#[error("failed writing host output: {0}")]
	Host(#[from] std::io::Error),
}
