//! Command-line front-end: query a Cardano node's chain tip over its local
//! socket.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ouroboros_client::Client;

#[derive(Parser)]
#[command(name = "ouroboros-client", version, about = "Query a Cardano node's chain tip")]
struct Cli {
    /// Filesystem path to the node's stream socket.
    #[arg(long)]
    socket: Option<PathBuf>,

    /// Enable debug level logging.
    #[arg(long)]
    debug: bool,

    /// Enable trace level logging.
    #[arg(long)]
    trace: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.trace {
        "trace"
    } else if cli.debug {
        "debug"
    } else {
        "error"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ouroboros_client={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let Some(socket) = cli.socket else {
        eprintln!("error: --socket <path> is required");
        return ExitCode::FAILURE;
    };

    match run(socket).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error [{}]: {err}", err.code());
            ExitCode::FAILURE
        }
    }
}

async fn run(socket: PathBuf) -> ouroboros_client::Result<()> {
    let mut client = Client::connect(&socket).await?;

    client.handshake().await?;
    let tip = client.query_tip().await?;

    println!("SlotNumber: {}", tip.slot);
    println!("Hash: {}", hex::encode(tip.hash));
    println!("BlockNumber: {}", tip.block_number);

    client.disconnect().await
}
