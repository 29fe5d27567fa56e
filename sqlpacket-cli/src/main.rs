//! sqlpacket binary.
//!
//! Entry point for the `sqlpacket` capture-and-forward agent.

use std::process::ExitCode;

use sqlpacket_cli::exit::{codes, exit_code};
use sqlpacket_cli::{agent, Cli};
use sqlpacket_core::AgentConfig;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .init();

    if cli.list_interfaces {
        return finish(agent::print_interfaces());
    }

    let config = match AgentConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => return finish(Err(e)),
    };

    finish(agent::run(config).await.map(|reason| {
        info!(reason = ?reason, "sqlpacket agent stopped");
    }))
}

fn finish(result: sqlpacket_core::Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::from(codes::SUCCESS),
        Err(e) => {
            error!(error = %e, "sqlpacket agent failed");
            eprintln!("error: {}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}
