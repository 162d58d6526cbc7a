use clap::Parser;
use std::process::ExitCode;
use wiretuner_cli::{dispatch, Cli};

fn main() -> ExitCode {
    let cli = Cli::parse();
    match dispatch(cli) {
        Ok(message) => {
            println!("{message}");
            ExitCode::from(0)
        }
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::from(1)
        }
    }
}
