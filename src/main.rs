//! Binary entrypoint for the Finchat relay server.
//! Run with: cargo run --bin finchat-server

use std::process::ExitCode;

use finchat_agent::start_finchat_agent;

fn main() -> ExitCode {
    start_finchat_agent::run()
}
