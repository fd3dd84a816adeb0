use crate::database::identifier::Identifier;
use crate::error::SheetTablesError;
use duckdb::Connection;

/// Builds the create-if-absent statement of a text-only table.
pub(crate) fn create_table_sql(table: &Identifier, columns: &[Identifier]) -> String {
    let definitions = columns
        .iter()
        .map(|column| format!("{} TEXT", column.quoted()))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE IF NOT EXISTS {} ({})", table.quoted(), definitions)
}

/// Ensures `table` exists with one text column per identifier.
///
/// An existing table of the same name is left untouched, whatever its
/// columns are.
///
/// # Errors
///
/// Returns `SchemaError` when the statement is rejected.
pub fn provision_table(conn: &Connection, table: &Identifier, columns: &[Identifier]) -> Result<(), SheetTablesError> {
    let sql = create_table_sql(table, columns);
    tracing::debug!(table = %table, columns = columns.len(), "provisioning table");
    conn.execute_batch(&sql).map_err(|source| SheetTablesError::SchemaError {
        table: table.to_string(),
        source,
    })
}
