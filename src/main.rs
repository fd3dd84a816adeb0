//! `sheet-tables` server entry point.
use actix_web::web;
use actix_web::App;
use actix_web::HttpServer;
use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use sheet_tables::server;
use sheet_tables::server::config::Config;
use sheet_tables::server::config::LogFormat;
use sheet_tables::server::AppState;
use sheet_tables::Database;
use sheet_tables::UploadStore;
use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter);
    let result = match format {
        LogFormat::Plain => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if let Err(error) = result {
        eprintln!("tracing init failed: {error}");
    }
}

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::parse();
    init_tracing(config.log_format);

    let database = Database::open(&config.database_url)
        .with_context(|| format!("Failed to open database '{}'", config.database_url))?;
    let uploads = UploadStore::new(&config.upload_dir);
    uploads
        .ensure()
        .with_context(|| format!("Failed to create upload directory '{}'", config.upload_dir.display()))?;
    tracing::info!(directory = %uploads.root().display(), "storing uploads");

    let state = web::Data::new(AppState::new(database, uploads));
    tracing::info!(address = %config.bind_addr, port = config.port, "server listening");
    HttpServer::new(move || App::new().app_data(state.clone()).configure(server::configure))
        .bind((config.bind_addr.as_str(), config.port))
        .with_context(|| format!("Failed to bind {}:{}", config.bind_addr, config.port))?
        .run()
        .await
        .context("Server terminated with an error")
}
