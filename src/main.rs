use std::process::ExitCode;

fn main() -> ExitCode {
    birthday_curves::app::run()
}
