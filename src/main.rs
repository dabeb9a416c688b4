use clap::Parser;
use log::error;
use std::process::ExitCode;
use std::sync::Arc;
use trusty_tally::cli::{self, Cli};
use trusty_tally::config::Config;
use trusty_tally::db::Database;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging; .env may carry RUST_LOG
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let database = match Database::connect(&config).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli::run(cli, database, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
