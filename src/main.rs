// Entrypoint for the CLI.
// - Keeps `main` small: set up logging and hand the arguments to the
//   dispatcher, which prints the result and picks the exit code.

use basecamp_cli::{commands, logging};

fn main() {
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    std::process::exit(commands::execute(&args, env!("CARGO_PKG_VERSION")));
}
