use clap::Parser;
use std::path::PathBuf;
use std::process;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};

use minidis::client::Client;
use minidis::config::Config;
use minidis::request::Request;
use minidis::Error;

const PROMPT: &[u8] = b"> ";

#[derive(Parser, Debug)]
#[command(name = "minidis-cli", version, about = "Interactive client for minidis")]
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
    let mut client = match Client::connect(&address).await {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error connecting to server: {}", e);
            process::exit(1);
        }
    };

    println!("Connected to minidis at {}. Type 'exit' to quit.", address);

    let mut stdout = io::stdout();
    let mut lines = BufReader::new(io::stdin()).lines();

    loop {
        stdout.write_all(PROMPT).await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let line = line.trim();
        if line == "exit" {
            break;
        }

        let Some(request) = Request::from_line(line) else {
            continue;
        };

        let reply = client.send(request).await?;
        println!("{}", reply);
    }

    Ok(())
}
