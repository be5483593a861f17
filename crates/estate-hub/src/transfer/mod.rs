//! Bulk CSV import and export of listings and reference data.
//!
//! Each row is parsed against the entity's [`schema`], then run through the same
//! builders and validation as the JSON API, so an imported row is indistinguishable from
//! one created by hand.

mod router;
pub mod schema;

use std::collections::HashMap;
use std::io::{Read, Write};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::auth::AuthUser;
use crate::catalog::{
    Amenity, CatalogResource, Category, Developer, Facility, Location, Region,
};
use crate::http::ApiError;
use crate::properties::{check_references, Property, PropertyInput};
use crate::store::{Document, DocumentStore, StoreError};

pub use router::routes;
pub use schema::{Column, ColumnKind, EntityKind};

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("malformed csv: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("csv output failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("import aborted: {0}")]
    Aborted(String),
}

impl From<TransferError> for ApiError {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::Csv(err) => ApiError::BadRequest(format!("malformed csv: {}", err)),
            TransferError::Store(err) => err.into(),
            TransferError::Io(err) => ApiError::Internal(err.to_string()),
            TransferError::Aborted(message) => ApiError::Internal(message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    /// Line in the file; the header is line 1.
    pub row: usize,
    pub column: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub entity: &'static str,
    pub dry_run: bool,
    pub total_rows: usize,
    pub valid_rows: usize,
    pub imported: usize,
    pub errors: Vec<RowError>,
}

enum RowOutcome {
    Valid,
    Imported,
}

fn row_error(row: usize, column: &str, message: impl Into<String>) -> RowError {
    RowError {
        row,
        column: column.to_string(),
        message: message.into(),
    }
}

/// Converts API-level failures raised while building a row into row errors. Anything
/// that is not the row's fault aborts the import.
fn rejected(row: usize, err: ApiError) -> Result<RowError, TransferError> {
    match err {
        ApiError::Validation(err) => Ok(row_error(row, err.field(), err.to_string())),
        ApiError::Conflict(message) | ApiError::BadRequest(message) => {
            Ok(row_error(row, "row", message))
        }
        other => Err(TransferError::Aborted(other.to_string())),
    }
}

fn decode<T: DeserializeOwned>(object: Map<String, Value>) -> Result<T, ApiError> {
    serde_json::from_value(Value::Object(object)).map_err(|err| ApiError::BadRequest(err.to_string()))
}

fn import_catalog<R: CatalogResource>(
    store: &DocumentStore,
    object: Map<String, Value>,
    caller: &AuthUser,
    dry_run: bool,
) -> Result<RowOutcome, ApiError> {
    let input: R::Create = decode(object)?;
    let doc = R::build(input, caller)?;
    doc.check_references(store)?;
    if dry_run {
        return Ok(RowOutcome::Valid);
    }
    R::persist_new(store, doc)?;
    Ok(RowOutcome::Imported)
}

fn import_property(
    store: &DocumentStore,
    object: Map<String, Value>,
    caller: &AuthUser,
    dry_run: bool,
) -> Result<RowOutcome, ApiError> {
    let input: PropertyInput = decode(object)?;
    let property = Property::build(input, &caller.id)?;
    check_references(store, &property)?;
    if dry_run {
        return Ok(RowOutcome::Valid);
    }
    store.insert_with_slug(property)?;
    Ok(RowOutcome::Imported)
}

fn import_row(
    store: &DocumentStore,
    entity: EntityKind,
    object: Map<String, Value>,
    caller: &AuthUser,
    dry_run: bool,
) -> Result<RowOutcome, ApiError> {
    match entity {
        EntityKind::Properties => import_property(store, object, caller, dry_run),
        EntityKind::Categories => import_catalog::<Category>(store, object, caller, dry_run),
        EntityKind::Amenities => import_catalog::<Amenity>(store, object, caller, dry_run),
        EntityKind::Facilities => import_catalog::<Facility>(store, object, caller, dry_run),
        EntityKind::States => import_catalog::<Region>(store, object, caller, dry_run),
        EntityKind::Locations => import_catalog::<Location>(store, object, caller, dry_run),
        EntityKind::Developers => import_catalog::<Developer>(store, object, caller, dry_run),
    }
}

/// Validates every row of `input` and, unless `dry_run`, stores the valid ones. Rows
/// with errors are reported and skipped.
pub fn import_csv(
    store: &DocumentStore,
    entity: EntityKind,
    input: impl Read,
    caller: &AuthUser,
    dry_run: bool,
) -> Result<ImportReport, TransferError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(input);

    let headers: HashMap<String, usize> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(index, name)| (name.trim().to_ascii_lowercase(), index))
        .collect();

    let mut report = ImportReport {
        entity: entity.label(),
        dry_run,
        total_rows: 0,
        valid_rows: 0,
        imported: 0,
        errors: Vec::new(),
    };

    let columns = entity.schema();
    let missing: Vec<&Column> = columns
        .iter()
        .filter(|column| column.required && !headers.contains_key(column.name))
        .collect();
    if !missing.is_empty() {
        for column in missing {
            report
                .errors
                .push(row_error(1, column.name, "required column is missing"));
        }
        report.total_rows = reader.records().count();
        return Ok(report);
    }

    for (index, record) in reader.records().enumerate() {
        let row = index + 2;
        report.total_rows += 1;
        let record = match record {
            Ok(record) => record,
            Err(err) if err.is_io_error() => return Err(err.into()),
            Err(err) => {
                debug!(entity = entity.label(), row, %err, "unreadable csv record");
                report
                    .errors
                    .push(row_error(row, "*", format!("malformed record: {}", err)));
                continue;
            }
        };

        let object = match schema::row_to_object(columns, |name| {
            headers
                .get(name)
                .and_then(|position| record.get(*position))
                .map(str::to_string)
        }) {
            Ok(object) => object,
            Err(cells) => {
                report.errors.extend(
                    cells
                        .into_iter()
                        .map(|(column, message)| row_error(row, column, message)),
                );
                continue;
            }
        };

        match import_row(store, entity, object, caller, dry_run) {
            Ok(outcome) => {
                report.valid_rows += 1;
                if matches!(outcome, RowOutcome::Imported) {
                    report.imported += 1;
                }
            }
            Err(err) => {
                let error = rejected(row, err)?;
                debug!(entity = entity.label(), row, column = %error.column, message = %error.message, "import row rejected");
                report.errors.push(error);
            }
        }
    }

    info!(
        entity = entity.label(),
        total = report.total_rows,
        valid = report.valid_rows,
        imported = report.imported,
        dry_run,
        "csv import finished"
    );
    Ok(report)
}

fn write_rows<D: Document>(
    store: &DocumentStore,
    columns: &[Column],
    writer: &mut csv::Writer<impl Write>,
) -> Result<usize, TransferError> {
    let mut docs = store.all::<D>()?;
    docs.sort_by(|a, b| a.id().cmp(b.id()));
    for doc in &docs {
        let value = serde_json::to_value(doc).map_err(StoreError::from)?;
        writer.write_record(
            columns
                .iter()
                .map(|column| schema::render_cell(value.get(column.name))),
        )?;
    }
    Ok(docs.len())
}

/// Writes every document of `entity` as CSV with a header row. Returns the row count.
pub fn export_csv(
    store: &DocumentStore,
    entity: EntityKind,
    output: impl Write,
) -> Result<usize, TransferError> {
    let columns = entity.schema();
    let mut writer = csv::Writer::from_writer(output);
    writer.write_record(columns.iter().map(|column| column.name))?;

    let rows = match entity {
        EntityKind::Properties => write_rows::<Property>(store, columns, &mut writer)?,
        EntityKind::Categories => write_rows::<Category>(store, columns, &mut writer)?,
        EntityKind::Amenities => write_rows::<Amenity>(store, columns, &mut writer)?,
        EntityKind::Facilities => write_rows::<Facility>(store, columns, &mut writer)?,
        EntityKind::States => write_rows::<Region>(store, columns, &mut writer)?,
        EntityKind::Locations => write_rows::<Location>(store, columns, &mut writer)?,
        EntityKind::Developers => write_rows::<Developer>(store, columns, &mut writer)?,
    };
    writer.flush()?;
    info!(entity = entity.label(), rows, "csv export finished");
    Ok(rows)
}
