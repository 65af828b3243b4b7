use clap::Parser;
use std::path::PathBuf;
use std::process;
use tokio::signal;
use tracing::{error, info};

use minidis::config::Config;
use minidis::server::Server;
use minidis::Error;

#[derive(Parser, Debug)]
#[command(name = "minidis", version, about = "In-memory key-value server speaking RESP")]
struct Args {
    /// Path to the JSON configuration file
    #[arg(short, long, env = "MINIDIS_CONFIG", default_value = "./config.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();

    let config = Config::load_and_init_logging(&args.config);

    let address = config.address();
    let server = match Server::bind(&address).await {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to bind {}: {}", address, e);
            process::exit(1);
        }
    };

    let handle = server.handle();
    let server = tokio::spawn(server.run());

    signal::ctrl_c().await?;
    info!("Received Ctrl-C, shutting down");

    handle.stop().await;
    server.await?;

    Ok(())
}
