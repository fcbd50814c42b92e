//! Demo server: record routes whose failures are rendered by an `ErrorMux`.

use std::sync::Arc;
use std::time::Duration;

use centra_core::MuxOptions;
use centra_server::demo::{build_demo_mux, routes};
use centra_server::network::{NetworkConfig, NetworkModule};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "centra-demo", about = "Serve demo routes with sentinel error handlers")]
struct Args {
    /// Bind address.
    #[arg(long, env = "CENTRA_HOST", default_value = "127.0.0.1")]
    host: String,
    /// Port to listen on; 0 picks a free one.
    #[arg(long, env = "CENTRA_PORT", default_value_t = 8080)]
    port: u16,
    /// Request timeout in seconds.
    #[arg(long, env = "CENTRA_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    request_timeout_secs: u64,
    /// Allowed CORS origins, comma separated.
    #[arg(long, env = "CENTRA_CORS_ORIGINS", value_delimiter = ',', default_value = "*")]
    cors_origins: Vec<String>,
    /// Log every dispatch decision.
    #[arg(long, env = "CENTRA_DEBUG")]
    debug: bool,
    /// Emit logs as JSON lines.
    #[arg(long, env = "CENTRA_LOG_JSON")]
    log_json: bool,
}

impl Args {
    fn network_config(&self) -> NetworkConfig {
        NetworkConfig {
            host: self.host.clone(),
            port: self.port,
            cors_origins: self.cors_origins.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    let mux = Arc::new(build_demo_mux(MuxOptions { debug: args.debug }));
    let mut module = NetworkModule::new(args.network_config(), mux);
    let port = module.start().await?;
    info!(port, "centra demo server listening");

    module
        .serve(routes(), async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
}
