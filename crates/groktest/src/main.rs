use clap::Parser;

use groktest::app;
use groktest::commands::Cli;
use groktest_common::Colors;

fn main() {
    let cli = Cli::parse();
    match app::run(cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{} {err:#}", Colors::failed("Error:"));
            std::process::exit(app::EXIT_FAILED);
        }
    }
}
