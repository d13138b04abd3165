use hil_runner::cli;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    hil_runner::init();

    match cli::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
