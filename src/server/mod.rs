//! # HTTP Server Module
//!
//! JSON endpoints over the upload pipeline and the query operations:
//!
//! - `POST /upload`
//! - `GET /db-files`
//! - `DELETE /db-files/{table_name}`
//! - `GET /data/{table_name}?page&limit`
//! - `PUT /data/{table_name}/{record_id}`
pub mod config;
pub mod error;
pub mod handlers;

use crate::database::Database;
use crate::storage::UploadStore;
use actix_web::web;

/// State shared by all workers.
pub struct AppState {
    pub database: Database,
    pub uploads: UploadStore,
}

impl AppState {
    pub fn new(database: Database, uploads: UploadStore) -> Self {
        AppState { database, uploads }
    }
}

/// Registers the endpoints; the application must provide
/// `web::Data<AppState>`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/upload", web::post().to(handlers::upload))
        .route("/db-files", web::get().to(handlers::list_tables))
        .route("/db-files/{table_name}", web::delete().to(handlers::delete_table))
        .route("/data/{table_name}", web::get().to(handlers::get_page))
        .route("/data/{table_name}/{record_id}", web::put().to(handlers::update_row));
}
