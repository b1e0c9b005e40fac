//! `diagsh` binary: runs the diagnostics shell with the layered configuration
//! and exits non-zero when start-up fails or a session aborts.

use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    match diagsh::run_shell() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let mut stderr = io::stderr().lock();
            if writeln!(stderr, "diagsh: {error}").is_err() {
                return ExitCode::from(2);
            }
            ExitCode::FAILURE
        }
    }
}
