//! Header normalization.
//!
//! Turns the header row of a worksheet into column identifiers and the file
//! name of an upload into a table identifier.
use crate::database::identifier::Identifier;
use crate::database::identifier::IdentifierError;
use crate::spreadsheet::CellValue;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("Hardcode regex pattern"));

/// Normalizes a single header: trimmed, lowercased, whitespace runs
/// collapsed to `_`.
pub fn normalize_header(header: &str) -> String {
    WHITESPACE
        .replace_all(header.trim(), "_")
        .to_lowercase()
}

/// Builds the column identifiers of a table from its header row.
///
/// Trailing empty header cells are ignored. An empty header in between is
/// named `column{n}` after its 1-based position, and repeated names get a
/// `_2`, `_3`, ... suffix so every cell keeps its own column.
///
/// # Errors
///
/// Fails when a resulting name is not a valid identifier.
pub fn normalize_headers(header_row: &[CellValue]) -> Result<Vec<Identifier>, IdentifierError> {
    let width = header_row
        .iter()
        .rposition(|value| !value.is_empty())
        .map(|position| position + 1)
        .unwrap_or(0);

    let mut seen = HashSet::<String>::new();
    let mut columns = Vec::with_capacity(width);
    for (index, value) in header_row[..width].iter().enumerate() {
        let mut name = normalize_header(&value.to_sql_text().unwrap_or_default());
        if name.is_empty() {
            name = format!("column{}", index + 1);
        }
        let mut candidate = name.to_owned();
        let mut suffix = 1;
        while seen.contains(&candidate) {
            suffix += 1;
            candidate = format!("{}_{}", name, suffix);
        }
        seen.insert(candidate.to_owned());
        columns.push(Identifier::new(candidate)?);
    }
    Ok(columns)
}

/// Derives the table name of an uploaded file: base name without its
/// extension, lowercased.
///
/// # Errors
///
/// Fails when nothing usable is left of the file name.
pub fn table_name_for(file_name: &str) -> Result<Identifier, IdentifierError> {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    Identifier::new(stem)
}
