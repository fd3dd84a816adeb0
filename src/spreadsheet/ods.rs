use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::fs::File;
use std::io::BufReader;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

/// ODS file MIME type identifier
const MIME_TYPE: &[u8] = b"application/vnd.oasis.opendocument.spreadsheet";
/// XML element name for table (sheet)
const TABLE: QName = QName(b"table:table");
/// XML element name for table row
const TABLE_ROW: QName = QName(b"table:table-row");
/// XML element name for table cell
const TABLE_CELL: QName = QName(b"table:table-cell");
/// XML element name for covered table cell (merged cells)
const TABLE_COVERED_CELL: QName = QName(b"table:covered-table-cell");
/// XML element name for annotations (comments)
const ANNOTATION: QName = QName(b"office:annotation");
/// XML element name for paragraph text
const PARAGRAPH: QName = QName(b"text:p");
/// XML element name for string (space) text
const STRING: QName = QName(b"text:s");

/// An OpenDocument spreadsheet (`.ods`)
pub(crate) struct OdsSpreadsheet {
    /// Name of the ODS file
    name: String,
    /// ZIP archive containing the document parts
    zip: ZipArchive<BufReader<File>>,
}

impl OdsSpreadsheet {
    /// Opens an ODS file and validates its format
    ///
    /// # Errors
    /// Fails when the container is not a ZIP archive, declares another MIME
    /// type, or is password protected.
    pub(crate) fn open(path: &Path) -> Result<Self, SpreadsheetError> {
        let name = path.to_string_lossy().to_string();
        let file = File::open(path)?;
        let mut zip = ZipArchive::new(BufReader::new(file))?;
        check_mime(&mut zip)?;
        if is_password_protected(&mut zip)? {
            Err(SpreadsheetError::PasswordProtected(name.to_owned()))?;
        }
        Ok(OdsSpreadsheet { name, zip })
    }
}

impl Spreadsheet for OdsSpreadsheet {
    fn name(&self) -> String {
        self.name.to_owned()
    }

    /// ODS stores strings inline, so there is no shared string table.
    fn load_shared_strings(&mut self) -> Result<Vec<String>, SpreadsheetError> {
        Ok(Vec::new())
    }

    /// Reads every cell of the first table in `content.xml`.
    fn read_first_sheet(&mut self) -> Result<Sheet, SpreadsheetError> {
        let mut reader = self
            .zip
            .xml_reader("content.xml")?
            .ok_or_else(|| SpreadsheetError::MissingPart("content.xml".to_owned()))?;

        let mut sheet_name = None::<String>;
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TABLE => {
                sheet_name = Some(event.get_attribute_value("table:name")?.unwrap_or_default().to_string());
                break;
            }
        });
        let sheet_name = sheet_name.ok_or_else(|| SpreadsheetError::EmptySpreadsheet(self.name.to_owned()))?;
        let mut sheet = Sheet::new(&self.name, &sheet_name);

        let mut row = 0usize;
        let mut col = 0usize;
        let mut row_count = 1usize;
        let mut col_count = 1usize;
        let mut kind = CellType::default();
        let mut value = String::new();
        // Text children are only collected for string cells, never for comments
        let mut element_context = false;
        let mut comment_context = false;
        match_xml_events!(reader => {
            Event::End(event) if event.name() == TABLE => break,
            Event::Start(event) if event.name() == TABLE_ROW => {
                row_count = event.parse_attribute_value("table:number-rows-repeated")?.unwrap_or(1);
                col = 0;
            }
            Event::End(event) if event.name() == TABLE_ROW => {
                row += row_count;
            }
            Event::Start(event) if event.name() == TABLE_CELL || event.name() == TABLE_COVERED_CELL => {
                value.clear();
                col_count = event.parse_attribute_value::<usize>("table:number-columns-repeated")?.unwrap_or(1);
                let value_type = event.get_attribute_value("office:value-type")?;
                kind = match value_type.as_deref() {
                    None => CellType::Empty,
                    Some("boolean") => CellType::Boolean,
                    Some("date") => CellType::IsoDateTime,
                    Some("time") => CellType::IsoDuration,
                    Some("string") => {
                        let is_error = event
                            .get_attribute_value("calcext:value-type")?
                            .map(|cow| cow == "error")
                            .unwrap_or(false);
                        if is_error { CellType::Error } else { CellType::InlineString }
                    }
                    Some(_) => CellType::Number,
                };

                match value_type.as_deref() {
                    Some("string") => element_context = true,
                    Some("boolean") => {
                        let truthy = event
                            .get_attribute_value("office:boolean-value")?
                            .map(|cow| cow != "false" && cow != "0")
                            .unwrap_or(false);
                        value.push_str(if truthy { "1" } else { "0" });
                    }
                    Some("date") => if let Some(data) = event.get_attribute_value("office:date-value")? {
                        value.push_str(&data);
                    }
                    Some("time") => if let Some(data) = event.get_attribute_value("office:time-value")? {
                        value.push_str(&data);
                    }
                    Some(_) => if let Some(data) = event.get_attribute_value("office:value")? {
                        value.push_str(&data);
                    }
                    None => (),
                }
            }
            Event::End(event) if event.name() == TABLE_CELL || event.name() == TABLE_COVERED_CELL => {
                if kind != CellType::Empty && !value.is_empty() {
                    for row_offset in 0..row_count {
                        for col_offset in 0..col_count {
                            sheet.push(Cell {
                                row: row + row_offset,
                                col: col + col_offset,
                                kind,
                                value: value.to_owned(),
                            });
                        }
                    }
                }
                col += col_count;
                element_context = false;
                comment_context = false;
            }
            Event::Start(event) if element_context && event.name() == ANNOTATION => comment_context = true,
            Event::End(event) if element_context && comment_context && event.name() == ANNOTATION => comment_context = false,
            Event::Start(event) if element_context && !comment_context && event.name() == PARAGRAPH => {
                if !value.is_empty() {
                    value.push('\n');
                }
            }
            Event::Start(event) if element_context && !comment_context && event.name() == STRING => {
                let count = event.parse_attribute_value("text:c")?.unwrap_or(1);
                for _ in 0..count {
                    value.push(' ');
                }
            }
            Event::Text(event) if element_context && !comment_context => value.push_bytes_text(&event)?,
            Event::GeneralRef(event) if element_context && !comment_context => value.push_bytes_ref(&event)?,
        });

        Ok(sheet)
    }
}

/// Validates the `mimetype` entry when the archive carries one
fn check_mime(zip: &mut ZipArchive<BufReader<File>>) -> Result<(), SpreadsheetError> {
    if let Some(file) = &mut zip.file("mimetype")? {
        let mut buffer = Vec::with_capacity(MIME_TYPE.len());
        file.read_to_end(&mut buffer)?;
        if buffer.trim_ascii() != MIME_TYPE {
            Err(SpreadsheetError::OdsMimeType)?;
        }
    }
    Ok(())
}

/// Checks the manifest for encryption data on any file entry
fn is_password_protected(zip: &mut ZipArchive<BufReader<File>>) -> Result<bool, SpreadsheetError> {
    let mut reader = match zip.xml_reader("META-INF/manifest.xml")? {
        Some(reader) => reader,
        None => return Ok(false),
    };
    let mut in_file_entry = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == QName(b"manifest:file-entry") => in_file_entry = true,
        Event::End(event) if event.name() == QName(b"manifest:file-entry") => in_file_entry = false,
        Event::Start(event) if in_file_entry && event.name() == QName(b"manifest:encryption-data") => {
            return Ok(true);
        }
    });
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::CellValue;
    use chrono::NaiveDate;
    use std::io::Write;
    use std::path::PathBuf;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    const MANIFEST: &str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8"?>"#,
        r#"<manifest:manifest xmlns:manifest="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0">"#,
        r#"<manifest:file-entry manifest:full-path="/" manifest:media-type="application/vnd.oasis.opendocument.spreadsheet"/>"#,
        r#"<manifest:file-entry manifest:full-path="content.xml" manifest:media-type="text/xml"/>"#,
        r#"</manifest:manifest>"#,
    );

    const ENCRYPTED_MANIFEST: &str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8"?>"#,
        r#"<manifest:manifest xmlns:manifest="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0">"#,
        r#"<manifest:file-entry manifest:full-path="content.xml" manifest:media-type="text/xml">"#,
        r#"<manifest:encryption-data manifest:checksum-type="SHA1" manifest:checksum="AAAA"/>"#,
        r#"</manifest:file-entry>"#,
        r#"</manifest:manifest>"#,
    );

    const CONTENT: &str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8"?>"#,
        r#"<office:document-content"#,
        r#" xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0""#,
        r#" xmlns:table="urn:oasis:names:tc:opendocument:xmlns:table:1.0""#,
        r#" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0""#,
        r#" xmlns:dc="http://purl.org/dc/elements/1.1/">"#,
        r#"<office:body><office:spreadsheet>"#,
        r#"<table:table table:name="People">"#,
        r#"<table:table-row>"#,
        r#"<table:table-cell office:value-type="string"><text:p>First<text:s text:c="2"/>Name</text:p></table:table-cell>"#,
        r#"<table:table-cell office:value-type="string"><text:p>Born</text:p></table:table-cell>"#,
        r#"<table:table-cell office:value-type="string"><text:p>Score</text:p></table:table-cell>"#,
        r#"</table:table-row>"#,
        r#"<table:table-row table:number-rows-repeated="2">"#,
        r#"<table:table-cell office:value-type="string">"#,
        r#"<office:annotation><dc:creator>Editor</dc:creator><text:p>check this</text:p></office:annotation>"#,
        r#"<text:p>A</text:p><text:p>b</text:p>"#,
        r#"</table:table-cell>"#,
        r#"<table:table-cell office:value-type="date" office:date-value="2024-01-05"/>"#,
        r#"</table:table-row>"#,
        r#"<table:table-row>"#,
        r#"<table:table-cell table:number-columns-repeated="2" office:value-type="float" office:value="7"/>"#,
        r#"<table:table-cell office:value-type="boolean" office:boolean-value="true"/>"#,
        r#"</table:table-row>"#,
        r#"<table:table-row table:number-rows-repeated="1048570">"#,
        r#"<table:table-cell table:number-columns-repeated="1024"/>"#,
        r#"</table:table-row>"#,
        r#"</table:table>"#,
        r#"<table:table table:name="Other">"#,
        r#"<table:table-row><table:table-cell office:value-type="string"><text:p>ignored</text:p></table:table-cell></table:table-row>"#,
        r#"</table:table>"#,
        r#"</office:spreadsheet></office:body></office:document-content>"#,
    );

    fn write_ods(directory: &Path, mime_type: &str, manifest: &str) -> PathBuf {
        let path = directory.join("people.ods");
        let mut writer = ZipWriter::new(File::create(&path).unwrap());
        for (name, content) in [("mimetype", mime_type), ("META-INF/manifest.xml", manifest), ("content.xml", CONTENT)] {
            writer.start_file(name, SimpleFileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
        path
    }

    fn text(value: &str) -> CellValue {
        CellValue::Text(value.to_owned())
    }

    #[test]
    fn test_read_first_table() {
        let directory = tempfile::tempdir().unwrap();
        let path = write_ods(directory.path(), "application/vnd.oasis.opendocument.spreadsheet", MANIFEST);
        let mut spreadsheet = OdsSpreadsheet::open(&path).unwrap();
        assert!(spreadsheet.load_shared_strings().unwrap().is_empty());

        let sheet = spreadsheet.read_first_sheet().unwrap();
        assert_eq!(sheet.name, "People");
        let born = CellValue::Date(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(
            sheet.into_rows(&[]).unwrap(),
            vec![
                vec![text("First  Name"), text("Born"), text("Score")],
                vec![text("A\nb"), born.clone(), CellValue::Empty],
                vec![text("A\nb"), born, CellValue::Empty],
                vec![CellValue::Number(7.0), CellValue::Number(7.0), CellValue::Boolean(true)],
            ]
        );
    }

    #[test]
    fn test_mime_type_is_checked() {
        let directory = tempfile::tempdir().unwrap();
        let path = write_ods(directory.path(), "application/zip", MANIFEST);
        assert!(matches!(OdsSpreadsheet::open(&path), Err(SpreadsheetError::OdsMimeType)));

        let path = write_ods(directory.path(), "application/vnd.oasis.opendocument.spreadsheet\n", MANIFEST);
        assert!(OdsSpreadsheet::open(&path).is_ok());
    }

    #[test]
    fn test_password_protected() {
        let directory = tempfile::tempdir().unwrap();
        let path = write_ods(directory.path(), "application/vnd.oasis.opendocument.spreadsheet", ENCRYPTED_MANIFEST);
        assert!(matches!(
            OdsSpreadsheet::open(&path),
            Err(SpreadsheetError::PasswordProtected(_))
        ));
    }
}
