use kaleidoscope::{Session, cli::*};
use palc::Parser;

fn main() {
	let cli = Cli::parse();
	let mut session = Session::stdio(cli.options());

	match cli.mode {
		Mode::File { path } => {
			if let Err(e) = session.run_file(&path) {
				eprintln!("Failed run file: {e}");
			}
		}
		Mode::Repl => session.run_prompt(),
	}
}
