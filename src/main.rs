use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match treetop::cli::run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
