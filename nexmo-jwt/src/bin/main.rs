use std::process::ExitCode;

use clap::Parser;
use nexmo_jwt::cli::{self, Args, CliError};
use nexmo_jwt::logging::Logging;
use tracing::error;

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(err) = Logging::try_init(args.log_level) {
        eprintln!("Failed to initialize tracing: {err}");
        return CliError::from(err).into();
    }

    match cli::run(args) {
        Ok(token) => {
            println!("{token}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err}");
            err.into()
        }
    }
}
