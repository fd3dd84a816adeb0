//! Fixtures shared by the HTTP tests: in-memory server state and workbooks
//! built on the fly.
#![allow(dead_code)]

use actix_web::web;
use sheet_tables::database::IN_MEMORY;
use sheet_tables::server::AppState;
use sheet_tables::Database;
use sheet_tables::UploadStore;
use std::io::Cursor;
use std::io::Write;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Server state over an in-memory database and a scratch upload directory.
pub struct TestContext {
    pub directory: TempDir,
    pub state: web::Data<AppState>,
}

impl TestContext {
    pub fn new() -> Self {
        let directory = tempfile::tempdir().expect("create scratch directory");
        let database = Database::open(IN_MEMORY).expect("open in-memory database");
        let uploads = UploadStore::new(directory.path().join("files"));
        let state = web::Data::new(AppState::new(database, uploads));
        TestContext { directory, state }
    }

    pub fn upload_path(&self, file_name: &str) -> std::path::PathBuf {
        self.directory.path().join("files").join(file_name)
    }
}

/// A worksheet cell of a fixture workbook.
#[derive(Clone, Debug)]
pub enum Value {
    Text(String),
    Number(f64),
    /// Serial day number rendered with the built-in date format
    Date(u32),
    Blank,
}

pub fn text(value: &str) -> Value {
    Value::Text(value.to_owned())
}

fn column_name(index: usize) -> String {
    let mut name = String::new();
    let mut index = index + 1;
    while index > 0 {
        let remainder = (index - 1) % 26;
        name.insert(0, (b'A' + remainder as u8) as char);
        index = (index - 1) / 26;
    }
    name
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn sheet_xml(rows: &[Vec<Value>]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    for (row_index, row) in rows.iter().enumerate() {
        xml.push_str(&format!(r#"<row r="{}">"#, row_index + 1));
        for (col_index, value) in row.iter().enumerate() {
            let reference = format!("{}{}", column_name(col_index), row_index + 1);
            match value {
                Value::Text(text) => xml.push_str(&format!(
                    r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#,
                    reference,
                    escape(text)
                )),
                Value::Number(number) => xml.push_str(&format!(r#"<c r="{}"><v>{}</v></c>"#, reference, number)),
                Value::Date(serial) => xml.push_str(&format!(r#"<c r="{}" s="1"><v>{}</v></c>"#, reference, serial)),
                Value::Blank => (),
            }
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

/// Builds a single-sheet `.xlsx` workbook holding `rows`.
pub fn xlsx(rows: &[Vec<Value>]) -> Vec<u8> {
    let parts = [
        (
            "[Content_Types].xml",
            r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/></Types>"#.to_owned(),
        ),
        (
            "xl/workbook.xml",
            r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#.to_owned(),
        ),
        (
            "xl/_rels/workbook.xml.rels",
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#.to_owned(),
        ),
        (
            "xl/styles.xml",
            r#"<?xml version="1.0" encoding="UTF-8"?><styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><cellXfs count="2"><xf numFmtId="0"/><xf numFmtId="14"/></cellXfs></styleSheet>"#.to_owned(),
        ),
        ("xl/worksheets/sheet1.xml", sheet_xml(rows)),
    ];

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in parts {
        writer.start_file(name, SimpleFileOptions::default()).expect("start zip entry");
        writer.write_all(content.as_bytes()).expect("write zip entry");
    }
    writer.finish().expect("finish workbook").into_inner()
}

/// Header `id, name` followed by `count` rows `(n, "person n")`.
pub fn people(count: usize) -> Vec<u8> {
    let mut rows = vec![vec![text("ID"), text("Name")]];
    for index in 1..=count {
        rows.push(vec![Value::Number(index as f64), Value::Text(format!("person {}", index))]);
    }
    xlsx(&rows)
}

pub const BOUNDARY: &str = "----SheetTablesBoundary7MA4YWxkTrZu0gW";

/// Multipart body carrying `content` in a field called `field`.
pub fn multipart_body(field: &str, file_name: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n", field, file_name).as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}
