use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use melange_server::{build_cors_layer, create_router, AppState, Config};

/// CLI arguments parsed from command line
struct CliArgs {
    generate_key: bool,
    help: bool,
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    CliArgs {
        generate_key: args.iter().any(|a| a == "--generate-key" || a == "-g"),
        help: args.iter().any(|a| a == "--help" || a == "-h"),
    }
}

fn print_help() {
    eprintln!(
        r#"melange-server - identity provisioning server

USAGE:
    cargo run -p melange-server [OPTIONS]

OPTIONS:
    -g, --generate-key   Generate a random SERVICE_MASTER_KEY for this session
    -h, --help           Print this help

ENVIRONMENT VARIABLES:
    SERVICE_MASTER_KEY            64-char hex key (required without --generate-key)
    BIND_ADDRESS                  Listen address (default: 127.0.0.1:9090)
    DATABASE_PATH                 RocksDB path (default: ./data/melange.db)
    DIRECTORY_PATH                Known servers/trackers (default: ./directory.json)
    REGISTRAR_TIMEOUT_SECONDS     Key server and tracker timeout (default: 30)
    CORS_ALLOWED_ORIGINS          Comma separated origins (default: none)
    RUST_LOG                      Log level (default: melange_server=debug)

EXAMPLES:
    # Development with auto-generated key
    cargo run -p melange-server -- --generate-key

    # Production with explicit key
    SERVICE_MASTER_KEY=<your-key> cargo run -p melange-server --release
"#
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args();

    if args.help {
        print_help();
        return Ok(());
    }

    if args.generate_key {
        use rand::RngCore;
        let mut key = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut key);
        let key_hex = hex::encode(key);

        std::env::set_var("SERVICE_MASTER_KEY", &key_hex);

        eprintln!("Generated SERVICE_MASTER_KEY for this session:");
        eprintln!("  {}", key_hex);
        eprintln!();
        eprintln!("Note: identities stored in this session can't be unwrapped after restart.");
        eprintln!();
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "melange_server=debug,melange_provisioning=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    let bind_address = config.bind_address;
    let cors = build_cors_layer(&config.cors_allowed_origins);
    tracing::info!("Starting melange server on {}", bind_address);

    // Initialize application state
    let state = Arc::new(AppState::new(config).await?);

    let app = create_router(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on {}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Graceful shutdown initiated");
}
