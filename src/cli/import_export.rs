use std::path::PathBuf;

use csv::{ReaderBuilder, StringRecord};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::info;

use crate::row::codec::{ColumnCodec, ColumnInfo, ColumnKind};
use crate::row::{Datum, Row};
use crate::storage::{GraphWriter, MemoryStore};
use crate::types::{EdgeTypeId, TagId, Timestamp, TraverseError, VertexId};

/// Commit timestamp used for everything the CLI loads.
pub const LOAD_TS: Timestamp = Timestamp(1);

/// Errors surfaced by the CLI layer.
#[derive(Debug, Error)]
pub enum CliError {
    /// Generic error message.
    #[error("{0}")]
    Message(String),
    /// IO error from file operations.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// CSV parsing error.
    #[error(transparent)]
    Csv(#[from] csv::Error),
    /// JSON rendering error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Traversal or storage error.
    #[error(transparent)]
    Traverse(#[from] TraverseError),
}

impl From<&str> for CliError {
    fn from(value: &str) -> Self {
        CliError::Message(value.to_string())
    }
}

impl From<String> for CliError {
    fn from(value: String) -> Self {
        CliError::Message(value)
    }
}

/// Configuration for loading an edge list.
#[derive(Debug, Clone)]
pub struct EdgeImportConfig {
    /// Path to the CSV file containing edges.
    pub path: PathBuf,
    /// Source vertex column.
    pub src_column: String,
    /// Edge type column.
    pub type_column: String,
    /// Destination vertex column.
    pub dst_column: String,
}

impl EdgeImportConfig {
    /// Default `src,type,dst` layout for `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            src_column: "src".into(),
            type_column: "type".into(),
            dst_column: "dst".into(),
        }
    }
}

/// Configuration for loading vertex rows.
#[derive(Debug, Clone)]
pub struct RowImportConfig {
    /// Path to the CSV file containing rows.
    pub path: PathBuf,
    /// Column holding the vertex id.
    pub id_column: String,
    /// Tag the rows are stored under.
    pub tag: TagId,
}

impl RowImportConfig {
    /// Rows keyed by an `id` column, stored under `tag`.
    pub fn new(path: impl Into<PathBuf>, tag: TagId) -> Self {
        Self {
            path: path.into(),
            id_column: "id".into(),
            tag,
        }
    }
}

/// Layout of the loaded rows: the codec that decodes them and the output
/// column names, in codec order.
#[derive(Debug, Clone)]
pub struct RowLayout {
    /// Codec decoding the stored rows.
    pub codec: ColumnCodec,
    /// Output column names; the first is the vertex id column.
    pub names: Vec<String>,
}

/// Loads every edge of `cfg` into `store`. Returns the number of edges written.
pub fn load_edges(store: &MemoryStore, cfg: &EdgeImportConfig) -> Result<usize, CliError> {
    let mut reader = ReaderBuilder::new().flexible(true).from_path(&cfg.path)?;
    let headers = reader.headers()?.clone();
    let src_index = find_column(&headers, &cfg.src_column)?;
    let ty_index = find_column(&headers, &cfg.type_column)?;
    let dst_index = find_column(&headers, &cfg.dst_column)?;

    let mut writer = GraphWriter::new(store, LOAD_TS);
    for result in reader.records() {
        let record = result?;
        let src = parse_id(&record, src_index, &cfg.src_column)?;
        let ty = parse_id(&record, ty_index, &cfg.type_column)?;
        let dst = parse_id(&record, dst_index, &cfg.dst_column)?;
        writer.add_edge(VertexId(src), EdgeTypeId(ty), VertexId(dst));
    }
    let written = writer.edges_written();
    info!(path = %cfg.path.display(), edges = written, "cli.import.edges");
    Ok(written)
}

/// Loads vertex rows into `store`. Every column besides the id column is
/// stored as a string.
pub fn load_rows(store: &MemoryStore, cfg: &RowImportConfig) -> Result<RowLayout, CliError> {
    let mut reader = ReaderBuilder::new().flexible(true).from_path(&cfg.path)?;
    let headers = reader.headers()?.clone();
    let id_index = find_column(&headers, &cfg.id_column)?;
    let value_columns: Vec<(usize, i64)> = headers
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != id_index)
        .zip(1i64..)
        .map(|((idx, _), col)| (idx, col))
        .collect();

    let mut columns = vec![ColumnInfo::handle(0)];
    let mut names = vec![cfg.id_column.clone()];
    for (idx, col) in &value_columns {
        columns.push(ColumnInfo::new(*col, ColumnKind::Str));
        names.push(headers.get(*idx).unwrap_or_default().to_string());
    }
    let codec = ColumnCodec::new(columns);

    let mut writer = GraphWriter::new(store, LOAD_TS);
    for result in reader.records() {
        let record = result?;
        let id = parse_id(&record, id_index, &cfg.id_column)?;
        let values: Vec<(i64, Datum)> = value_columns
            .iter()
            .filter_map(|(idx, col)| {
                record
                    .get(*idx)
                    .map(|raw| (*col, Datum::Str(raw.trim().to_string())))
            })
            .collect();
        writer.put_row(VertexId(id), cfg.tag, codec.encode(&values)?);
    }
    info!(
        path = %cfg.path.display(),
        rows = writer.rows_written(),
        "cli.import.rows"
    );
    Ok(RowLayout { codec, names })
}

/// Renders `row` as a JSON object keyed by `names`.
pub fn row_to_json(names: &[String], row: &Row) -> Result<Value, CliError> {
    let mut obj = Map::with_capacity(names.len());
    for (name, datum) in names.iter().zip(row) {
        obj.insert(name.clone(), serde_json::to_value(datum)?);
    }
    Ok(Value::Object(obj))
}

/// Parses a comma-separated list of vertex ids.
pub fn parse_start_ids(raw: &str) -> Result<Vec<i64>, CliError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| CliError::Message(format!("invalid start vertex id '{s}'")))
        })
        .collect()
}

fn find_column(headers: &StringRecord, name: &str) -> Result<usize, CliError> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
        .ok_or_else(|| CliError::Message(format!("column '{}' not found", name)))
}

fn get_required<'a>(record: &'a StringRecord, idx: usize, name: &str) -> Result<&'a str, CliError> {
    record
        .get(idx)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CliError::Message(format!("missing value for column '{}'", name)))
}

fn parse_id(record: &StringRecord, idx: usize, name: &str) -> Result<i64, CliError> {
    let raw = get_required(record, idx, name)?;
    raw.parse::<i64>()
        .map_err(|_| CliError::Message(format!("column '{}' holds non-integer '{}'", name, raw)))
}
