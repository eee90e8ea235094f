use std::path::PathBuf;

use palc::{Parser, Subcommand};

use crate::session::SessionOptions;

#[derive(Parser)]
#[command(name = "kaleidoscope", after_long_help = "An interactive front end for the Kaleidoscope toy language.")]
pub struct Cli {
	/// Skip the optimization passes
	#[arg(long)]
	pub no_optimize: bool,
	/// Print only program output and results
	#[arg(short, long)]
	pub quiet:       bool,
	#[command(subcommand)]
	pub mode:        Mode,
}

#[derive(Subcommand, Debug)]
pub enum Mode {
	/// Input file
	File { path: PathBuf },
	/// Input prompt
	Repl,
}

impl Cli {
	/// Session options selected by the flags and the mode.
	pub fn options(&self) -> SessionOptions {
		let prompt = match self.mode {
			Mode::Repl => Some("ready> ".to_string()),
			Mode::File { .. } => None,
		};
		SessionOptions { optimize: !self.no_optimize, prompt, dump_module: !self.quiet, echo_definitions: !self.quiet }
	}
}
