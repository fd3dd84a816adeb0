//! # Spreadsheet Reading Module
//!
//! Reads Office Open XML workbooks (`.xlsx`, `.xlsm`, `.xlam`) and OpenDocument
//! spreadsheets (`.ods`) into a fully materialized grid of typed cell values.
//! Only the first worksheet is read; its first non-empty row is the header row.
pub(crate) mod cell;
pub(crate) mod excel;
pub(crate) mod ods;
pub(crate) mod reference;
pub(crate) mod sheet;
pub(crate) mod xlsx;

pub use crate::helpers::xml::XmlError;
pub use cell::CellValue;
pub(crate) use sheet::Sheet;
pub use sheet::Row;

use crate::spreadsheet::ods::OdsSpreadsheet;
use crate::spreadsheet::xlsx::XlsxSpreadsheet;
use std::ffi::OsStr;
use std::path::Path;
use thiserror::Error;

/// Errors raised while reading a spreadsheet file.
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    /// Unsupported or unrecognized file format
    #[error("Cannot detect spreadsheet format of '{0}'")]
    UnsupportedFormat(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid spreadsheet container: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Invalid spreadsheet markup: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Invalid spreadsheet markup encoding: {0}")]
    XmlEncoding(#[from] quick_xml::encoding::EncodingError),

    #[error("Invalid spreadsheet markup attribute: {0}")]
    XmlAttribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("{0}")]
    XmlContent(#[from] XmlError),

    #[error("{0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("{0}")]
    ParseInt(#[from] std::num::ParseIntError),

    /// A required part of the container is absent
    #[error("Missing part '{0}' in spreadsheet")]
    MissingPart(String),

    /// Workbook declares no worksheet
    #[error("Spreadsheet '{0}' contains no worksheet")]
    EmptySpreadsheet(String),

    /// Worksheet exists but holds no data
    #[error("Sheet '{0}' is empty")]
    EmptySheet(String),

    #[error("Spreadsheet '{0}' is password protected")]
    PasswordProtected(String),

    #[error("Invalid ODS MIME type")]
    OdsMimeType,

    /// Cell content that cannot be interpreted, including error values
    #[error("Invalid cell value in '{file}' sheet '{sheet}' at {reference}: {message}")]
    CellValue {
        file: String,
        sheet: String,
        reference: String,
        message: String,
    },
}

/// Common interface over the supported workbook formats.
pub(crate) trait Spreadsheet {
    /// Returns the file name of this spreadsheet
    fn name(&self) -> String;

    /// Loads the shared string table referenced by string cells
    fn load_shared_strings(&mut self) -> Result<Vec<String>, SpreadsheetError>;

    /// Reads the raw cells of the first worksheet
    fn read_first_sheet(&mut self) -> Result<Sheet, SpreadsheetError>;
}

/// Opens a spreadsheet, choosing the reader from the file extension.
///
/// # Errors
///
/// Returns `UnsupportedFormat` for unknown extensions, or the reader's error
/// when the file cannot be opened.
pub(crate) fn open_spreadsheet(path: &Path) -> Result<Box<dyn Spreadsheet>, SpreadsheetError> {
    let extension = path
        .extension()
        .and_then(OsStr::to_str)
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("xlsx") | Some("xlsm") | Some("xlam") => Ok(Box::new(XlsxSpreadsheet::open(path)?)),
        Some("ods") => Ok(Box::new(OdsSpreadsheet::open(path)?)),
        _ => Err(SpreadsheetError::UnsupportedFormat(path.to_string_lossy().to_string())),
    }
}

/// Reads the first worksheet of a spreadsheet file into rows.
///
/// The first returned row is the header row; rows without any value are
/// dropped and every row has the width of the used column range.
///
/// # Errors
///
/// Returns a [`SpreadsheetError`] if the file is unreadable, is not a
/// recognized spreadsheet, has no data, or holds an uninterpretable cell.
pub fn read_rows(path: &Path) -> Result<Vec<Row>, SpreadsheetError> {
    let mut spreadsheet = open_spreadsheet(path)?;
    let shared_strings = spreadsheet.load_shared_strings()?;
    let sheet = spreadsheet.read_first_sheet()?;
    tracing::debug!(
        file = %spreadsheet.name(),
        sheet = %sheet.name,
        cells = sheet.cells.len(),
        first_row = ?sheet.row_lower_bound,
        last_row = ?sheet.row_upper_bound,
        "read worksheet"
    );
    sheet.into_rows(&shared_strings)
}
