use thiserror::Error;

/// Main error type of the crate.
/// Aggregates the spreadsheet, identifier, database and storage failures of the ingest and query paths.
#[derive(Error, Debug)]
pub enum SheetTablesError {
    #[error("{0}")]
    WithContextError(String),

    // Spreadsheet module errors
    #[error("{0}")]
    ParseError(#[from] crate::spreadsheet::SpreadsheetError),

    // Database module errors
    #[error("{0}")]
    IdentifierError(#[from] crate::database::identifier::IdentifierError),

    #[error("Provision table '{table}' failed: {source}")]
    SchemaError {
        table: String,
        #[source]
        source: duckdb::Error,
    },

    #[error("Insert row {row} into '{table}' failed: {source}")]
    InsertError {
        table: String,
        row: usize,
        #[source]
        source: duckdb::Error,
    },

    #[error("Row {row} of '{table}' has {actual} values but the table has {expected} columns")]
    RowTooWide {
        table: String,
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("{0}")]
    QueryError(#[from] duckdb::Error),

    #[error("Table '{0}' does not exist")]
    UnknownTable(String),

    // Request errors
    #[error("{0}")]
    ValidationError(String),

    #[error("{0}")]
    NotFoundError(String),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, SheetTablesError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| SheetTablesError::WithContextError(format!("{}: {}", message, e)))
    }
}
