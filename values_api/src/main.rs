use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

#[derive(Parser)]
#[command(about, long_about = None)]
struct ValuesApiCli {
    /// The address to listen on
    #[clap(long, default_value = "127.0.0.1:5000")]
    listen: SocketAddr,

    /// How long to wait before answering each request, in milliseconds
    #[clap(long, default_value_t = values_api::DEFAULT_DELAY.as_millis() as u64)]
    delay_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = ValuesApiCli::parse();

    let listener = tokio::net::TcpListener::bind(cli.listen)
        .await
        .with_context(|| format!("Failed to listen on {}", cli.listen))?;

    log::info!(
        "Serving http://{}/api/values with a {}ms delay",
        cli.listen,
        cli.delay_ms
    );

    values_api::serve(listener, Duration::from_millis(cli.delay_ms))
        .await
        .context("Server stopped unexpectedly")
}
