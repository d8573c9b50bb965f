//! CLI entrypoint for the plugin packager.
//!
//! The binary delegates to [`plugpack_cli::run`], which parses arguments,
//! sets up logging, loads the plugin manifest, and runs the build.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    // The handles stay unlocked: log events from output-draining threads
    // write to stderr while the build runs.
    plugpack_cli::run(std::env::args_os(), &mut io::stdout(), &mut io::stderr())
}
