use clap::Parser;

use roadmap::api::{Cli, run};

#[tokio::main]
async fn main() {
    roadmap::telemetry::init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
