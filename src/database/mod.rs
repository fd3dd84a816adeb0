//! # Database Module
//!
//! Turns parsed worksheets into tables and serves the uploaded tables back.
//! The upload path runs Normalizer, Provisioner and Ingestor in that order;
//! the query operations in [`query`] work on any table of the database.
pub mod identifier;
pub(crate) mod ingestor;
pub(crate) mod provisioner;
pub mod query;
pub mod schema;

use crate::database::identifier::Identifier;
use crate::error::ResultMessage;
use crate::error::SheetTablesError;
use crate::spreadsheet::read_rows;
use duckdb::Connection;
use std::path::Path;
use std::sync::Mutex;

/// Database location meaning a private in-memory database.
pub const IN_MEMORY: &str = ":memory:";

/// Shared handle to the DuckDB database.
///
/// Holds the root connection and hands out one connection per unit of work.
pub struct Database {
    root: Mutex<Connection>,
}

impl Database {
    /// Opens the database at `url`, a file path or [`IN_MEMORY`].
    pub fn open(url: &str) -> Result<Self, SheetTablesError> {
        let conn = if url == IN_MEMORY {
            Connection::open_in_memory()?
        } else {
            Connection::open(url)?
        };
        tracing::info!(database = url, "opened database");
        Ok(Database { root: Mutex::new(conn) })
    }

    /// Returns a new connection to the same database.
    pub fn connection(&self) -> Result<Connection, SheetTablesError> {
        let root = self
            .root
            .lock()
            .map_err(|_| SheetTablesError::WithContextError("Database connection lock poisoned".to_owned()))?;
        Ok(root.try_clone()?)
    }
}

/// Outcome of importing one spreadsheet.
#[derive(Debug, PartialEq)]
pub struct ImportSummary {
    pub table: Identifier,
    pub rows: usize,
}

/// Loads the first worksheet of the file at `path` into the table named
/// after `file_name`.
///
/// The table is created when absent and rows are appended to it otherwise.
///
/// # Arguments
/// * `conn` - Connection to write with
/// * `path` - Location of the stored spreadsheet
/// * `file_name` - Original file name, source of the table name
///
/// # Errors
///
/// Parse failures are reported with the file name as prefix. Provisioning
/// and insert failures keep their own variants; rows inserted before an
/// insert failure stay in the table.
pub fn import_spreadsheet(conn: &Connection, path: &Path, file_name: &str) -> Result<ImportSummary, SheetTablesError> {
    let table = schema::table_name_for(file_name)?;
    let rows = read_rows(path).map_err(SheetTablesError::from).with_prefix(file_name)?;
    let (header, data) = match rows.split_first() {
        Some(split) => split,
        None => Err(SheetTablesError::WithContextError(format!("{}: no header row", file_name)))?,
    };
    let columns = schema::normalize_headers(header)?;

    provisioner::provision_table(conn, &table, &columns)?;
    let inserted = ingestor::insert_rows(conn, &table, &columns, data)?;
    tracing::info!(table = %table, columns = columns.len(), rows = inserted, "imported spreadsheet");
    Ok(ImportSummary { table, rows: inserted })
}
