//! Outbound client: asks the quote server for the current bid and writes it
//! to a local file. Any failure exits non-zero with a logged diagnostic.

use std::process::ExitCode;

use clap::Parser;

use fx_quote::client::QuoteClient;
use fx_quote::config::{ClientConfig, ObservabilityConfig};
use fx_quote::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "quote-client")]
#[command(about = "Fetch the current bid from the quote server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080/cotacao")]
    url: String,

    /// Budget for the whole call, in milliseconds.
    #[arg(short, long, default_value_t = 300)]
    timeout_ms: u64,

    #[arg(short, long, default_value = "cotacao.txt")]
    output: String,

    #[arg(short, long, default_value = "Dolar")]
    label: String,

    /// Do not send the remaining budget to the server.
    #[arg(long)]
    no_propagate: bool,
}

impl From<Cli> for ClientConfig {
    fn from(cli: Cli) -> Self {
        Self {
            server_url: cli.url,
            timeout_ms: cli.timeout_ms,
            output_path: cli.output,
            label: cli.label,
            propagate_deadline: !cli.no_propagate,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = ClientConfig::from(Cli::parse());
    init_logging(&ObservabilityConfig::default(), "fx_quote=info");

    let http = match reqwest::Client::builder().build() {
        Ok(http) => http,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build HTTP client");
            return ExitCode::FAILURE;
        }
    };
    let client = QuoteClient::new(http, config);

    match client.fetch_and_record().await {
        Ok(bid) => {
            tracing::info!(path = %client.config().output_path, bid = %bid, "Quote saved");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Quote client failed");
            ExitCode::FAILURE
        }
    }
}
