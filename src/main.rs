mod cli;
mod commands;
mod database;
mod error;
mod models;
mod services;

use clap::Parser;
use cli::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli).await {
        log::error!("{}", e);
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }
}
