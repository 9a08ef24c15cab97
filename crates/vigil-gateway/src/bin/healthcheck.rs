//! `vigil-healthcheck`: exit 0 when the service reports healthy, 1 otherwise.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use vigil_gateway::healthcheck;

#[derive(Debug, Parser)]
#[command(name = "vigil-healthcheck", about = "Probe a running Vigil gateway")]
struct Args {
    /// Base URL of the service.
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    url: String,

    /// Health endpoint path.
    #[arg(long, default_value = "/health")]
    path: String,

    /// Request timeout in seconds.
    #[arg(long, default_value_t = 5)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .try_init();

    let args = Args::parse();
    let url = healthcheck::health_url(&args.url, &args.path);

    match healthcheck::check(&url, Duration::from_secs(args.timeout_secs.max(1))).await {
        Ok(report) if report.is_healthy() => {
            println!("healthy: {}", report.body);
            ExitCode::SUCCESS
        }
        Ok(report) => {
            println!("unhealthy: HTTP {} {}", report.http_status, report.body);
            ExitCode::from(1)
        }
        Err(e) => {
            println!("check failed: {e}");
            ExitCode::from(1)
        }
    }
}
