use clap::Parser;
use retail_etl::cli::{self, Args};
use std::process;

fn main() {
    let args = Args::parse();

    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Failed to create async runtime: {}", e);
        process::exit(1);
    });

    let result = runtime.block_on(async {
        tokio::select! {
            result = cli::run(args) => Some(result),
            _ = tokio::signal::ctrl_c() => None,
        }
    });

    match result {
        Some(Ok(_summary)) => process::exit(0),
        Some(Err(error)) => {
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
        None => {
            eprintln!("\nReceived CTRL+C, run aborted");
            process::exit(130);
        }
    }
}
