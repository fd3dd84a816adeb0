use crate::database::identifier::quoted_list;
use crate::database::identifier::Identifier;
use crate::error::SheetTablesError;
use crate::spreadsheet::CellValue;
use duckdb::params_from_iter;
use duckdb::Connection;

/// Aligns a data row with the table columns.
///
/// Short rows are padded with `NULL`; empty cells past the last column are
/// dropped.
///
/// # Returns
/// The text value of every column, or `None` when a non-empty cell lies
/// beyond the last column.
pub(crate) fn align_row(row: &[CellValue], width: usize) -> Option<Vec<Option<String>>> {
    if row.iter().skip(width).any(|value| !value.is_empty()) {
        return None;
    }
    let mut values = row.iter().take(width).map(CellValue::to_sql_text).collect::<Vec<_>>();
    values.resize(width, None);
    Some(values)
}

/// Inserts data rows one statement at a time, in order.
///
/// There is no surrounding transaction: when a row fails, the rows before it
/// stay in the table and the remaining rows are not attempted.
///
/// # Arguments
/// * `conn` - Connection to insert with
/// * `table` - Provisioned target table
/// * `columns` - Target columns, in row order
/// * `rows` - Data rows, without the header row
///
/// # Returns
/// Number of inserted rows
///
/// # Errors
///
/// Returns `RowTooWide` for a row carrying values beyond the last column and
/// `InsertError` when the database rejects a row. `row` is 1-based and
/// counts data rows only.
pub fn insert_rows(
    conn: &Connection,
    table: &Identifier,
    columns: &[Identifier],
    rows: &[Vec<CellValue>],
) -> Result<usize, SheetTablesError> {
    let placeholders = vec!["?"; columns.len()].join(", ");
    let sql = format!("INSERT INTO {} ({}) VALUES ({})", table.quoted(), quoted_list(columns), placeholders);
    let mut statement = conn.prepare(&sql).map_err(|source| SheetTablesError::InsertError {
        table: table.to_string(),
        row: 0,
        source,
    })?;

    for (index, row) in rows.iter().enumerate() {
        let values = align_row(row, columns.len()).ok_or_else(|| SheetTablesError::RowTooWide {
            table: table.to_string(),
            row: index + 1,
            expected: columns.len(),
            actual: row.iter().rposition(|value| !value.is_empty()).map_or(0, |position| position + 1),
        })?;
        statement
            .execute(params_from_iter(values.iter()))
            .map_err(|source| SheetTablesError::InsertError {
                table: table.to_string(),
                row: index + 1,
                source,
            })?;
    }
    Ok(rows.len())
}
