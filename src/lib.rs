//! # Sheet Tables
//!
//! Upload spreadsheet files over HTTP and browse them as DuckDB tables.
//!
//! ## Features
//!
//! - **Multi-format support**: Office Open XML workbooks (`.xlsx`, `.xlsm`, `.xlam`)
//!   and OpenDocument spreadsheets (`.ods`)
//! - **Schema from headers**: the first non-empty row of the first worksheet names
//!   the columns, normalized to lowercase identifiers with `_` for whitespace
//! - **Text tables**: every column is stored as text; dates become `YYYY-MM-DD`
//! - **Browsing**: list tables, page through rows, update rows by a key column and
//!   drop tables together with their uploaded file
//! - **Pure Rust parsing**: workbooks are read with `zip` and `quick-xml`
//!
//! ## Endpoints
//!
//! - `POST /upload`: multipart field `file`
//! - `GET /db-files`
//! - `DELETE /db-files/{table_name}`
//! - `GET /data/{table_name}?page&limit`
//! - `PUT /data/{table_name}/{record_id}`
pub mod database;
pub mod error;
mod helpers;
pub mod server;
pub mod spreadsheet;
pub mod storage;

pub use crate::database::Database;
pub use crate::error::SheetTablesError;
pub use crate::storage::UploadStore;
