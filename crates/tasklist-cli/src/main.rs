use std::ffi::OsString;
use std::process::ExitCode;

fn main() -> ExitCode {
  let args: Vec<OsString> =
    std::env::args_os().collect();
  match tasklist_core::run(args) {
    | Ok(code) => code,
    | Err(err) => {
      eprintln!("error: {err:#}");
      ExitCode::FAILURE
    }
  }
}
