//! sk - scikick report manager

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = scikick::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
