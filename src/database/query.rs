//! Read, update and drop operations over uploaded tables.
//!
//! Table and column names arriving from requests are validated as
//! [`Identifier`]s and then looked up in the catalog, so only names of
//! existing tables and columns ever reach statement text.
use crate::database::identifier::Identifier;
use crate::error::SheetTablesError;
use duckdb::params_from_iter;
use duckdb::Connection;
use duckdb::Row;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

/// Page number used when the request carries none or an unusable one.
pub const DEFAULT_PAGE: u64 = 1;
/// Page size used when the request carries none or an unusable one.
pub const DEFAULT_LIMIT: u64 = 10;

/// One row keyed by column name, in declared column order.
pub type Record = Map<String, Value>;

/// Raw pagination parameters of a request.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl PageParams {
    /// Requested page, falling back to [`DEFAULT_PAGE`].
    pub fn page(&self) -> u64 {
        parse_positive(self.page.as_deref()).unwrap_or(DEFAULT_PAGE)
    }

    /// Requested page size, falling back to [`DEFAULT_LIMIT`].
    pub fn limit(&self) -> u64 {
        parse_positive(self.limit.as_deref()).unwrap_or(DEFAULT_LIMIT)
    }
}

fn parse_positive(value: Option<&str>) -> Option<u64> {
    value
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
}

/// One page of a table.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub data: Vec<Record>,
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
}

/// Entry of the table listing.
#[derive(Debug, PartialEq, Serialize)]
pub struct TableEntry {
    pub table_name: String,
}

/// Lists every table of the active schema, alphabetically.
pub fn list_tables(conn: &Connection) -> Result<Vec<TableEntry>, SheetTablesError> {
    let mut statement = conn.prepare(
        "SELECT table_name FROM information_schema.tables \
         WHERE table_catalog = current_database() AND table_schema = 'main' \
         ORDER BY table_name",
    )?;
    let tables = statement
        .query_map([], |row| Ok(TableEntry { table_name: row.get(0)? }))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tables)
}

/// Returns the columns of `table` in declaration order.
///
/// # Errors
///
/// Returns `UnknownTable` when the catalog has no such table.
pub fn table_columns(conn: &Connection, table: &Identifier) -> Result<Vec<Identifier>, SheetTablesError> {
    let mut statement = conn.prepare(
        "SELECT column_name FROM information_schema.columns \
         WHERE table_catalog = current_database() AND table_schema = 'main' AND table_name = ? \
         ORDER BY ordinal_position",
    )?;
    let names = statement
        .query_map([table.as_str()], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    if names.is_empty() {
        Err(SheetTablesError::UnknownTable(table.to_string()))?
    }
    Ok(names.into_iter().map(Identifier::new).collect::<Result<Vec<_>, _>>()?)
}

/// Column list casting every column to text, so rows map uniformly.
fn text_projection(columns: &[Identifier]) -> String {
    columns
        .iter()
        .map(|column| format!("CAST({} AS VARCHAR)", column.quoted()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn to_record(row: &Row, columns: &[Identifier]) -> Result<Record, duckdb::Error> {
    let mut record = Record::new();
    for (index, column) in columns.iter().enumerate() {
        let value = row
            .get::<_, Option<String>>(index)?
            .map(Value::String)
            .unwrap_or(Value::Null);
        record.insert(column.to_string(), value);
    }
    Ok(record)
}

/// Reads one page of `table`, ordered by its first declared column.
///
/// # Arguments
/// * `table` - Table name as received
/// * `page` - 1-based page number
/// * `limit` - Page size, at least 1
///
/// # Errors
///
/// Fails for invalid or unknown table names and on any query error.
pub fn get_page(conn: &Connection, table: &str, page: u64, limit: u64) -> Result<Page, SheetTablesError> {
    let table = Identifier::new(table)?;
    let columns = table_columns(conn, &table)?;
    let order_column = &columns[0];
    let offset = page.saturating_sub(1).saturating_mul(limit);

    let sql = format!(
        "SELECT {} FROM {} ORDER BY {} LIMIT {} OFFSET {}",
        text_projection(&columns),
        table.quoted(),
        order_column.quoted(),
        limit,
        offset
    );
    let mut statement = conn.prepare(&sql)?;
    let data = statement
        .query_map([], |row| to_record(row, &columns))?
        .collect::<Result<Vec<_>, _>>()?;

    let total: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table.quoted()), [], |row| row.get(0))?;
    let total = total.max(0) as u64;
    Ok(Page {
        data,
        page,
        limit,
        total,
        total_pages: total.div_ceil(limit),
    })
}

/// Renders a JSON body value as the text stored in a column.
fn to_column_value(column: &str, value: &Value) -> Result<Option<String>, SheetTablesError> {
    match value {
        Value::Null => Ok(None),
        Value::String(text) => Ok(Some(text.to_owned())),
        Value::Number(number) => Ok(Some(number.to_string())),
        Value::Bool(flag) => Ok(Some(flag.to_string())),
        Value::Array(_) | Value::Object(_) => Err(SheetTablesError::ValidationError(format!(
            "Value of column '{}' must be a string, number, boolean or null",
            column
        ))),
    }
}

/// Finds `name` among the table columns.
fn known_column<'a>(columns: &'a [Identifier], name: &str) -> Result<&'a Identifier, SheetTablesError> {
    columns
        .iter()
        .find(|column| column.as_str() == name)
        .ok_or_else(|| SheetTablesError::ValidationError(format!("Unknown column '{}'", name)))
}

/// Updates the rows of `table` whose key column equals `record_id`.
///
/// The key column is `key` when given, otherwise the first field of
/// `fields`. Every field is written in the same statement.
///
/// # Returns
/// The first updated row
///
/// # Errors
///
/// - `ValidationError` when `fields` is empty, names an unknown column, or
///   holds an array or object value
/// - `NotFoundError` when no row matches
/// - `UnknownTable` or `QueryError` for lookup and statement failures
pub fn update_row(
    conn: &Connection,
    table: &str,
    record_id: &str,
    fields: &Map<String, Value>,
    key: Option<&str>,
) -> Result<Record, SheetTablesError> {
    let key = match key.or_else(|| fields.keys().next().map(String::as_str)) {
        Some(key) => key,
        None => Err(SheetTablesError::ValidationError("No data provided to update".to_owned()))?,
    };
    let table = Identifier::new(table)?;
    let columns = table_columns(conn, &table)?;
    let key_column = known_column(&columns, key)?;

    let mut assignments = Vec::with_capacity(fields.len());
    let mut values = Vec::with_capacity(fields.len() + 1);
    for (name, value) in fields {
        let column = known_column(&columns, name)?;
        assignments.push(format!("{} = ?", column.quoted()));
        values.push(to_column_value(name, value)?);
    }
    values.push(Some(record_id.to_owned()));

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ? RETURNING {}",
        table.quoted(),
        assignments.join(", "),
        key_column.quoted(),
        text_projection(&columns)
    );
    tracing::debug!(table = %table, key = %key_column, fields = fields.len(), "updating rows");
    let mut statement = conn.prepare(&sql)?;
    let mut rows = statement.query(params_from_iter(values.iter()))?;
    match rows.next()? {
        Some(row) => Ok(to_record(row, &columns)?),
        None => Err(SheetTablesError::NotFoundError("Record not found".to_owned())),
    }
}

/// Drops `table`; a table that does not exist is not an error.
pub fn delete_table(conn: &Connection, table: &str) -> Result<(), SheetTablesError> {
    let table = Identifier::new(table)?;
    conn.execute_batch(&format!("DROP TABLE IF EXISTS {}", table.quoted()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::fixture;
    use rstest::rstest;
    use serde_json::json;

    #[fixture]
    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"CREATE TABLE "people" ("id" TEXT, "name" TEXT, "city" TEXT);
               CREATE TABLE "alpha" ("x" TEXT);"#,
        )
        .unwrap();
        for index in 1..=12 {
            conn.execute(
                r#"INSERT INTO "people" VALUES (?, ?, ?)"#,
                [format!("{:02}", index), format!("person {}", index), "Oslo".to_owned()],
            )
            .unwrap();
        }
        conn
    }

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[rstest]
    #[case(None, None, 1, 10)]
    #[case(Some("2"), Some("5"), 2, 5)]
    #[case(Some("abc"), Some("-3"), 1, 10)]
    #[case(Some("0"), Some("0"), 1, 10)]
    #[case(Some(" 3 "), Some("25"), 3, 25)]
    fn test_page_params(
        #[case] page: Option<&str>,
        #[case] limit: Option<&str>,
        #[case] expected_page: u64,
        #[case] expected_limit: u64,
    ) {
        let params = PageParams {
            page: page.map(str::to_owned),
            limit: limit.map(str::to_owned),
        };
        assert_eq!(params.page(), expected_page);
        assert_eq!(params.limit(), expected_limit);
    }

    #[rstest]
    fn test_list_tables(conn: Connection) {
        let names = list_tables(&conn).unwrap();
        assert_eq!(
            names,
            vec![
                TableEntry { table_name: "alpha".to_owned() },
                TableEntry { table_name: "people".to_owned() },
            ]
        );
    }

    #[rstest]
    fn test_table_columns(conn: Connection) {
        let columns = table_columns(&conn, &Identifier::new("people").unwrap()).unwrap();
        assert_eq!(columns.iter().map(Identifier::as_str).collect::<Vec<_>>(), vec!["id", "name", "city"]);

        let missing = table_columns(&conn, &Identifier::new("ghost").unwrap());
        assert!(matches!(missing, Err(SheetTablesError::UnknownTable(name)) if name == "ghost"));
    }

    #[rstest]
    fn test_get_page(conn: Connection) {
        let page = get_page(&conn, "people", 2, 5).unwrap();
        assert_eq!(page.total, 12);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.data.len(), 5);
        assert_eq!(page.data[0]["id"], json!("06"));
        assert_eq!(page.data[0].keys().collect::<Vec<_>>(), vec!["id", "name", "city"]);

        let last = get_page(&conn, "people", 3, 5).unwrap();
        assert_eq!(last.data.len(), 2);

        let beyond = get_page(&conn, "people", 9, 5).unwrap();
        assert!(beyond.data.is_empty());
    }

    #[rstest]
    fn test_get_page_serializes_total_pages(conn: Connection) {
        let page = get_page(&conn, "alpha", 1, 10).unwrap();
        let value = serde_json::to_value(&page).unwrap();
        assert_eq!(value, json!({"data": [], "page": 1, "limit": 10, "total": 0, "totalPages": 0}));
    }

    #[rstest]
    fn test_get_page_unknown_table(conn: Connection) {
        assert!(matches!(get_page(&conn, "ghost", 1, 10), Err(SheetTablesError::UnknownTable(_))));
        assert!(matches!(get_page(&conn, "", 1, 10), Err(SheetTablesError::IdentifierError(_))));
    }

    #[rstest]
    fn test_update_by_first_field(conn: Connection) {
        let record = update_row(&conn, "people", "03", &fields(json!({"id": "03", "city": "Bergen"})), None).unwrap();
        assert_eq!(record, fields(json!({"id": "03", "name": "person 3", "city": "Bergen"})));
    }

    #[rstest]
    fn test_update_by_explicit_key(conn: Connection) {
        let body = fields(json!({"city": null, "name": 7}));
        let record = update_row(&conn, "people", "04", &body, Some("id")).unwrap();
        assert_eq!(record, fields(json!({"id": "04", "name": "7", "city": null})));
    }

    #[rstest]
    fn test_update_not_found(conn: Connection) {
        let result = update_row(&conn, "people", "99", &fields(json!({"id": "99", "city": "Bergen"})), None);
        assert!(matches!(result, Err(SheetTablesError::NotFoundError(_))));
    }

    #[rstest]
    #[case(json!({}))]
    #[case(json!({"id": "01", "nope": "x"}))]
    #[case(json!({"id": "01", "city": ["a"]}))]
    fn test_update_validation(conn: Connection, #[case] body: Value) {
        let result = update_row(&conn, "people", "01", &fields(body), None);
        assert!(matches!(result, Err(SheetTablesError::ValidationError(_))));
        let untouched = get_page(&conn, "people", 1, 1).unwrap();
        assert_eq!(untouched.data[0]["city"], json!("Oslo"));
    }

    #[rstest]
    fn test_delete_table(conn: Connection) {
        delete_table(&conn, "people").unwrap();
        delete_table(&conn, "people").unwrap();
        assert_eq!(list_tables(&conn).unwrap(), vec![TableEntry { table_name: "alpha".to_owned() }]);
    }
}
