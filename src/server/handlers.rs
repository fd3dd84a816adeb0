//! Endpoint handlers.
//!
//! Parsing and database work is blocking, so every handler moves it onto the
//! blocking pool with a connection of its own.
use crate::database;
use crate::database::query;
use crate::database::query::PageParams;
use crate::error::SheetTablesError;
use crate::server::error::ApiError;
use crate::server::error::ApiResult;
use crate::server::AppState;
use actix_multipart::Multipart;
use actix_web::web;
use actix_web::HttpResponse;
use futures_util::TryStreamExt;
use serde::Deserialize;
use serde_json::json;
use serde_json::Map;
use serde_json::Value;

const UPLOAD_FAILED: &str = "Upload failed";
const LIST_FAILED: &str = "Failed to fetch tables";
const PAGE_FAILED: &str = "Failed to fetch data";
const DELETE_FAILED: &str = "Failed to delete table/file";
const UPDATE_FAILED: &str = "Failed to update table row";

/// Runs `work` on the blocking pool with a fresh connection.
async fn with_connection<F, T>(state: &web::Data<AppState>, fallback: &'static str, work: F) -> ApiResult<T>
where
    F: FnOnce(&AppState, &duckdb::Connection) -> Result<T, SheetTablesError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    web::block(move || {
        let conn = state.database.connection()?;
        work(&state, &conn)
    })
    .await
    .map_err(|error| ApiError::internal(fallback, error))?
    .map_err(|error| ApiError::from_error(error, fallback))
}

/// `POST /upload`: stores the `file` field and loads its first worksheet.
#[tracing::instrument(skip(state, payload))]
pub async fn upload(state: web::Data<AppState>, mut payload: Multipart) -> ApiResult<HttpResponse> {
    let mut upload = None::<(String, Vec<u8>)>;
    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|error| ApiError::internal(UPLOAD_FAILED, error))?
    {
        let file_name = match field.name() {
            Some("file") => field
                .content_disposition()
                .and_then(|disposition| disposition.get_filename())
                .map(str::to_owned),
            _ => None,
        };
        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|error| ApiError::internal(UPLOAD_FAILED, error))?
        {
            bytes.extend_from_slice(&chunk);
        }
        if let Some(file_name) = file_name {
            if upload.is_none() {
                upload = Some((file_name, bytes));
            }
        }
    }
    let (original_name, bytes) = upload.ok_or_else(|| ApiError::bad_request("No file uploaded"))?;

    let (file_name, summary) = with_connection(&state, UPLOAD_FAILED, move |state, conn| {
        let (file_name, path) = state.uploads.save(&original_name, &bytes)?;
        let summary = database::import_spreadsheet(conn, &path, &file_name)?;
        Ok((file_name, summary))
    })
    .await?;
    tracing::info!(file = %file_name, table = %summary.table, rows = summary.rows, "upload complete");

    Ok(HttpResponse::Ok().json(json!({
        "message": "File uploaded & data inserted",
        "table": summary.table.as_str(),
        "file": file_name,
    })))
}

/// `GET /db-files`: lists the tables of the database.
#[tracing::instrument(skip(state))]
pub async fn list_tables(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let tables = with_connection(&state, LIST_FAILED, |_, conn| query::list_tables(conn)).await?;
    Ok(HttpResponse::Ok().json(tables))
}

/// `GET /data/{table_name}?page&limit`: one page of a table.
#[tracing::instrument(skip(state))]
pub async fn get_page(
    state: web::Data<AppState>,
    path: web::Path<String>,
    params: web::Query<PageParams>,
) -> ApiResult<HttpResponse> {
    let table = path.into_inner();
    let (page, limit) = (params.page(), params.limit());
    let page = with_connection(&state, PAGE_FAILED, move |_, conn| query::get_page(conn, &table, page, limit)).await?;
    Ok(HttpResponse::Ok().json(page))
}

/// `DELETE /db-files/{table_name}`: drops a table and its uploaded file.
#[tracing::instrument(skip(state))]
pub async fn delete_table(state: web::Data<AppState>, path: web::Path<String>) -> ApiResult<HttpResponse> {
    let table = path.into_inner();
    let message = format!("Table '{}' and file deleted", table);
    with_connection(&state, DELETE_FAILED, move |state, conn| {
        query::delete_table(conn, &table)?;
        state.uploads.remove_matching(&table);
        Ok(())
    })
    .await?;
    Ok(HttpResponse::Ok().json(json!({ "message": message })))
}

#[derive(Debug, Deserialize)]
pub struct UpdateParams {
    /// Column matched against the record id instead of the first body field.
    pub key: Option<String>,
}

/// Reads the update body as a JSON object; an absent or empty body yields an
/// empty map.
fn parse_update_body(body: &[u8]) -> ApiResult<Map<String, Value>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(ApiError::bad_request("Request body must be a JSON object")),
        Err(error) => Err(ApiError::bad_request(format!("Invalid JSON body: {}", error))),
    }
}

/// `PUT /data/{table_name}/{record_id}`: updates the matching rows.
#[tracing::instrument(skip(state, body))]
pub async fn update_row(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    params: web::Query<UpdateParams>,
    body: web::Bytes,
) -> ApiResult<HttpResponse> {
    let (table, record_id) = path.into_inner();
    if table.is_empty() || record_id.is_empty() {
        Err(ApiError::bad_request("Table name or record ID missing"))?
    }
    let fields = parse_update_body(&body)?;
    if fields.is_empty() {
        Err(ApiError::bad_request("No data provided to update"))?
    }
    let key = params.into_inner().key;

    let record = with_connection(&state, UPDATE_FAILED, move |_, conn| {
        query::update_row(conn, &table, &record_id, &fields, key.as_deref())
    })
    .await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Record updated successfully",
        "data": record,
    })))
}
