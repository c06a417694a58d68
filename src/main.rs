use tracing_subscriber::{EnvFilter, fmt};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    let http_port = std::env::var("FSOGATE_HTTP_PORT").unwrap_or_else(|_| "3000".to_string());
    let db_path = std::env::var("FSOGATE_DB_PATH").unwrap_or_else(|_| "fsogate.db".to_string());
    let api_url = std::env::var("FSOGATE_API_URL").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "fsogate",
        "fsogate starting: RUST_LOG='{}', http_port={}, db_path='{}', api_url='{}'",
        rust_log, http_port, db_path, api_url
    );

    fsogate::server::run().await
}
