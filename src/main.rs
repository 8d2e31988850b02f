use clap::Parser;
use tracing_subscriber::EnvFilter;

use quizroom::protocol::DEFAULT_PORT;

/// Real-time classroom quiz session server.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Port to listen on.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    quizroom::server::run(cli.port).await
}
