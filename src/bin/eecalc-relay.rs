//! eecalc relay server binary
//!
//! ```bash
//! eecalc-relay                       # 127.0.0.1:7878
//! eecalc-relay --bind 0.0.0.0 --port 9000
//! ```

use std::env;
use std::process::ExitCode;

use eecalc_relay::RelayServer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_BIND: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 7878;

fn print_usage() {
    eprintln!(
        r#"eecalc-relay - sheet relay for eecalc clients

USAGE:
    eecalc-relay [OPTIONS]

OPTIONS:
    --bind <ADDR>     Address to listen on (default: {bind})
    --port <PORT>     Port to listen on (default: {port})
    --help, -h        Show this help

LOGGING:
    Set RUST_LOG to adjust verbosity (default: info).
"#,
        bind = DEFAULT_BIND,
        port = DEFAULT_PORT
    );
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = env::args().collect();
    let mut bind = DEFAULT_BIND.to_string();
    let mut port = DEFAULT_PORT;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_usage();
                return ExitCode::SUCCESS;
            }
            "--bind" => {
                i += 1;
                let Some(value) = args.get(i) else {
                    eprintln!("--bind requires an address");
                    return ExitCode::FAILURE;
                };
                bind = value.to_string();
            }
            "--port" => {
                i += 1;
                match args.get(i).and_then(|s| s.parse().ok()) {
                    Some(p) => port = p,
                    None => {
                        eprintln!("--port requires a number between 0 and 65535");
                        return ExitCode::FAILURE;
                    }
                }
            }
            other => {
                eprintln!("Unknown option: {}", other);
                print_usage();
                return ExitCode::FAILURE;
            }
        }
        i += 1;
    }

    let server = match RelayServer::bind((bind.as_str(), port)).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to bind {}:{}: {}", bind, port, e);
            return ExitCode::FAILURE;
        }
    };

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                tracing::error!("Relay error: {}", e);
                return ExitCode::FAILURE;
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
        }
    }

    ExitCode::SUCCESS
}
