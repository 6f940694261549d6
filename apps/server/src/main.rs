mod config;
mod main_lib;
mod management;

use config::Config;
use main_lib::{init_tracing, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|arg| arg == "--version") {
        println!("cloudinfo {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = Config::from_env()?;
    if args.iter().any(|arg| arg == "--dump-config") {
        println!("{:#?}", config);
        return Ok(());
    }

    init_tracing();
    tracing::info!(
        "Starting cloudinfo {} with {} providers",
        env!("CARGO_PKG_VERSION"),
        config.engine.enabled_providers().count()
    );
    run(config).await
}
