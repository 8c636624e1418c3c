use std::process::ExitCode;

fn main() -> ExitCode {
    fitlens_cli::run()
}
