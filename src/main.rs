//! Recon CLI entrypoint

use clap::Parser;

use recon::cli::Cli;
use recon::error::exit_code_for;
use recon::output;

fn main() {
    let cli = Cli::parse();

    match cli.execute() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            output::error(&format!("Error: {:#}", e), output::stderr_supports_color());
            std::process::exit(exit_code_for(&e));
        }
    }
}
