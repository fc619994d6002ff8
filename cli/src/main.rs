//! txwatch — keeps the latest transactions of subscribed addresses and serves
//! them over HTTP.
//!
//! Usage:
//! ```bash
//! # Run the parser and the API (reads ./config.yml if present)
//! txwatch run
//!
//! # With an explicit config file
//! txwatch run --config /etc/txwatch.yml
//!
//! txwatch info
//! ```

mod config;
mod logging;

use std::env;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use txwatch_core::{Parser, ParserHandle};
use txwatch_evm::EvmIndexerBuilder;

use crate::config::{AppConfig, DEFAULT_CONFIG_PATH};

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let result = match args[1].as_str() {
        "run" => cmd_run(&args[2..]).await,
        "info" => {
            cmd_info();
            Ok(())
        }
        "version" | "--version" | "-V" => {
            println!("txwatch {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn print_usage() {
    println!("txwatch {}", env!("CARGO_PKG_VERSION"));
    println!("Track the latest transactions of subscribed addresses\n");
    println!("USAGE:");
    println!("    txwatch <COMMAND>\n");
    println!("COMMANDS:");
    println!("    run      Start the parser and the HTTP API");
    println!("    info     Show default configuration");
    println!("    version  Print version");
    println!("    help     Print this help\n");
    println!("RUN FLAGS:");
    println!("    --config <PATH>   YAML config file  [default: {DEFAULT_CONFIG_PATH}]");
}

fn cmd_info() {
    let cfg = AppConfig::default();
    println!("txwatch v{}", env!("CARGO_PKG_VERSION"));
    println!("  API address:          {}", cfg.api.addr);
    println!("  API request timeout:  {}ms", cfg.api.request_timeout_ms);
    println!("  Metrics path:         {}", cfg.api.metrics_path);
    println!("  RPC endpoint:         {}", cfg.parser.rpc_address);
    println!("  RPC request timeout:  {}ms", cfg.parser.request_timeout_ms);
    println!("  Index interval:       {}ms", cfg.parser.indexer.poll_interval_ms);
    println!("  History per address:  {} transactions", cfg.parser.indexer.history_limit);
    println!("  Shutdown timeout:     {}ms", cfg.graceful_shutdown_timeout_ms);
}

async fn cmd_run(args: &[String]) -> anyhow::Result<()> {
    let path = parse_flag(args, "--config").map(PathBuf::from);
    let config = AppConfig::load(path.as_deref()).context("failed to load configuration")?;

    logging::init_tracing(&config.log).context("failed to initialise logging")?;
    tracing::info!(
        environment = %config.environment,
        version = env!("CARGO_PKG_VERSION"),
        "Starting txwatch"
    );

    let parser = Arc::new(
        EvmIndexerBuilder::new()
            .rpc_url(config.parser.rpc_address.clone())
            .request_timeout_ms(config.parser.request_timeout_ms)
            .config(config.parser.indexer.clone())
            .start()
            .context("failed to start parser")?,
    );

    let addr = config.api_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "API server listening");

    let router = txwatch_api::create_router(parser.clone(), config.router_config())
        .context("failed to register API metrics")?;
    tracing::info!(path = %config.api.metrics_path, "Serving Prometheus metrics");
    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    tracing::info!("API server stopped, stopping parser");
    stop_parser(&parser, &config).await;

    served.context("API server failed")
}

async fn stop_parser(parser: &ParserHandle, config: &AppConfig) {
    parser.stop();
    let timeout = config.graceful_shutdown_timeout();
    if tokio::time::timeout(timeout, parser.join()).await.is_err() {
        tracing::warn!(
            timeout_ms = timeout.as_millis() as u64,
            "Parser did not stop within the shutdown timeout"
        );
    } else {
        tracing::info!(block = parser.current_block_number(), "Parser stopped");
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}

fn parse_flag(args: &[String], flag: &str) -> Option<String> {
    let pos = args.iter().position(|a| a == flag)?;
    args.get(pos + 1).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_flag_finds_value() {
        let args: Vec<String> = ["--config", "/etc/txwatch.yml"].iter().map(|s| s.to_string()).collect();
        assert_eq!(parse_flag(&args, "--config").as_deref(), Some("/etc/txwatch.yml"));
        assert_eq!(parse_flag(&args, "--other"), None);
        assert_eq!(parse_flag(&args[..1], "--config"), None);
    }
}
