use anyhow::{Context, Result};
use clap::Parser;

use shortener::config::{Cli, StaticConfig, init_config};
use shortener::runtime::run_server;
use shortener::system::init_logging;

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if cli.generate_config {
        println!("{}", StaticConfig::generate_sample_config());
        return Ok(());
    }

    let mut config =
        StaticConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply(&mut config);

    // guard 必须活到进程结束，否则缓冲的日志会丢失
    let _guard = match init_logging(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{}", e.format_colored());
            return Err(e.into());
        }
    };

    init_config(config);

    run_server().await
}
