use carebridge_server::config::loader::{config_path, load_config};
use carebridge_server::{auth_service, metrics, observability, shutdown_signal};

#[tokio::main]
async fn main() {
    // Load .env file if present (before anything else)
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound) {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    observability::init_tracing("auth-service");

    let path = config_path();
    let cfg = match load_config(Some(&path)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };
    observability::apply_logging_level(&cfg.logging.level);
    tracing::info!(path = %path, users = cfg.auth.users.len(), "Configuration loaded");

    metrics::init_metrics();

    if let Err(err) = run(&cfg).await {
        eprintln!("Auth service error: {err:#}");
        std::process::exit(1);
    }
}

async fn run(cfg: &carebridge_server::AppConfig) -> anyhow::Result<()> {
    let app = auth_service(cfg)?;

    let addr = cfg.auth_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "auth service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
