use std::process::ExitCode;

fn main() -> ExitCode {
    standby_cli::run()
}
