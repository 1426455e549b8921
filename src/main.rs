use std::process::ExitCode;

fn main() -> ExitCode {
    sheihu_launcher_lib::run()
}
