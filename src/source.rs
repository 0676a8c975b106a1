//! Row sources: the collaborators that fetch rows for a list view.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use polars::prelude::*;
use rayon::prelude::*;
use tracing::{debug, info, instrument, trace};

use crate::domain::GridError;
use crate::value::{Row, Value};

/// A dynamically shaped row as delivered by every source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn from_pairs<K: Into<String>>(pairs: impl IntoIterator<Item = (K, Value)>) -> Self {
        let mut record = Record::default();
        for (key, value) in pairs {
            record.insert(key, value);
        }
        record
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((key, value)),
        }
    }

    /// Fields in source order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The `id` field, if the row has a non-null one.
    pub fn id(&self) -> Option<String> {
        self.get("id").filter(|v| !v.is_null()).map(Value::to_string)
    }
}

impl Row for Record {
    fn field(&self, key: &str) -> Value {
        self.get(key).cloned().unwrap_or_default()
    }
}

/// Fetch/mutate contract of the backing store of a list view.
pub trait RowSource: Send {
    fn fetch_rows(&mut self) -> Result<Vec<Record>, GridError>;

    /// Removes the row with the given `id`.
    fn delete_row(&mut self, id: &str) -> Result<(), GridError>;

    /// Human readable origin, shown in the title bar.
    fn name(&self) -> String;
}

/// Rows held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    name: String,
    rows: Vec<Record>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, rows: Vec<Record>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }
}

impl RowSource for MemorySource {
    fn fetch_rows(&mut self) -> Result<Vec<Record>, GridError> {
        Ok(self.rows.clone())
    }

    fn delete_row(&mut self, id: &str) -> Result<(), GridError> {
        remove_by_id(&mut self.rows, id)
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

fn remove_by_id(rows: &mut Vec<Record>, id: &str) -> Result<(), GridError> {
    let pos = rows
        .iter()
        .position(|r| r.id().as_deref() == Some(id))
        .ok_or_else(|| GridError::RowNotFound(id.to_string()))?;
    rows.remove(pos);
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileType {
    Csv,
    Parquet,
    Arrow,
    Json,
}

#[derive(Debug)]
struct FileInfo {
    path: PathBuf,
    file_size: u64,
    file_type: FileType,
}

/// Rows exported from the hosted backend into a local file.
/// Deletions only affect the loaded copy, the file is never written.
#[derive(Debug)]
pub struct FileSource {
    info: FileInfo,
    rows: Option<Vec<Record>>,
}

impl FileSource {
    pub fn open(path: PathBuf) -> Result<Self, GridError> {
        let info = get_file_info(path)?;
        Ok(Self { info, rows: None })
    }

    pub fn path(&self) -> &Path {
        &self.info.path
    }

    fn loaded(&mut self) -> Result<&mut Vec<Record>, GridError> {
        if self.rows.is_none() {
            self.rows = Some(load_file(&self.info)?);
        }
        self.rows
            .as_mut()
            .ok_or_else(|| GridError::loading_failed("rows vanished after loading"))
    }
}

impl RowSource for FileSource {
    fn fetch_rows(&mut self) -> Result<Vec<Record>, GridError> {
        Ok(self.loaded()?.clone())
    }

    fn delete_row(&mut self, id: &str) -> Result<(), GridError> {
        remove_by_id(self.loaded()?, id)
    }

    fn name(&self) -> String {
        self.info
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("???")
            .to_string()
    }
}

#[instrument(skip(info), fields(path = %info.path.display(), size = info.file_size))]
fn load_file(info: &FileInfo) -> Result<Vec<Record>, GridError> {
    let start_time = Instant::now();
    let rows = match info.file_type {
        FileType::Csv => load_frame(load_csv(&info.path)?)?,
        FileType::Parquet => load_frame(load_parquet(&info.path)?)?,
        FileType::Arrow => load_frame(load_arrow(&info.path)?)?,
        FileType::Json => load_json(&info.path)?,
    };
    info!(
        "Loading {} rows took {}ms ...",
        rows.len(),
        start_time.elapsed().as_millis()
    );
    Ok(rows)
}

// Each column is converted in its own rayon task, rows are then assembled in parallel.
fn load_frame(frame: LazyFrame) -> Result<Vec<Record>, GridError> {
    let df = frame.collect()?;
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    if names.is_empty() {
        return Err(GridError::loading_failed("file has no columns"));
    }

    let columns = names
        .par_iter()
        .map(|name| load_column(&df, name))
        .collect::<Result<Vec<Vec<Value>>, PolarsError>>()?;
    for (name, column) in names.iter().zip(columns.iter()) {
        debug!("Column \"{name}\", # rows {}", column.len());
    }

    let records = (0..df.height())
        .into_par_iter()
        .map(|ridx| {
            Record::from_pairs(
                names
                    .iter()
                    .zip(columns.iter())
                    .map(|(name, column)| (name.clone(), column[ridx].clone())),
            )
        })
        .collect();
    Ok(records)
}

fn load_column(df: &DataFrame, name: &str) -> Result<Vec<Value>, PolarsError> {
    let column = df.column(name)?;
    let dtype = column.dtype().clone();

    let values = if is_numeric_type(&dtype) {
        let cast = column.cast(&DataType::Float64)?;
        cast.f64()?.into_iter().map(Value::from).collect()
    } else if dtype == DataType::Boolean {
        column.bool()?.into_iter().map(Value::from).collect()
    } else {
        let cast = column.cast(&DataType::String)?;
        cast.str()?.into_iter().map(Value::from).collect()
    };
    trace!("Loaded column {name} as {dtype:?}");
    Ok(values)
}

fn is_numeric_type(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

fn load_json(path: &Path) -> Result<Vec<Record>, GridError> {
    let text = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&text)?;
    let serde_json::Value::Array(items) = parsed else {
        return Err(GridError::loading_failed("expected a json array of objects"));
    };
    items
        .into_iter()
        .map(|item| match item {
            serde_json::Value::Object(map) => Ok(Record::from_pairs(
                map.into_iter().map(|(k, v)| (k, json_to_value(v))),
            )),
            other => Err(GridError::loading_failed(format!(
                "expected an object, found {other}"
            ))),
        })
        .collect()
}

/// Nested values are flattened to text: scalar arrays join with `,`, anything else stays json.
pub fn json_to_value(value: serde_json::Value) -> Value {
    use serde_json::Value as Json;
    match value {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(b),
        Json::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Null),
        Json::String(s) => Value::Text(s),
        Json::Array(items) if items.iter().all(|i| !i.is_array() && !i.is_object()) => {
            Value::Text(
                items
                    .into_iter()
                    .map(|i| json_to_value(i).to_string())
                    .collect::<Vec<_>>()
                    .join(","),
            )
        }
        nested => Value::Text(nested.to_string()),
    }
}

fn detect_file_type(path: &Path) -> Result<FileType, GridError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("CSV") => Ok(FileType::Csv),
        Some("PARQUET") | Some("PQ") => Ok(FileType::Parquet),
        Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::Arrow),
        Some("JSON") => Ok(FileType::Json),
        _ => Err(GridError::UnknownFileType),
    }
}

fn get_file_info(path: PathBuf) -> Result<FileInfo, GridError> {
    let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => GridError::FileNotFound,
        ErrorKind::PermissionDenied => GridError::PermissionDenied,
        _ => GridError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(GridError::loading_failed("Not a file!"));
    }

    let file_type = detect_file_type(&path)?;
    Ok(FileInfo {
        path,
        file_size: metadata.len(),
        file_type,
    })
}

fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyCsvReader::new(PlPath::Local(path.into()))
        .with_has_header(true)
        .finish()
}

fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
}

fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_ipc(
        PlPath::Local(path.into()),
        polars::io::ipc::IpcScanOptions,
        UnifiedScanArgs::default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_file(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(suffix)
            .tempfile()
            .expect("temp file");
        file.write_all(content.as_bytes()).expect("write");
        file
    }

    #[test]
    fn record_lookup_and_overwrite() {
        let mut record = Record::from_pairs([("id", Value::from("a1")), ("price", Value::from(5))]);
        record.insert("price", Value::from(7));
        assert_eq!(record.len(), 2);
        assert_eq!(record.field("price"), Value::from(7));
        assert_eq!(record.field("missing"), Value::Null);
        assert_eq!(record.id().as_deref(), Some("a1"));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let file = temp_file(".xlsx", "x");
        assert!(matches!(
            FileSource::open(file.path().to_path_buf()),
            Err(GridError::UnknownFileType)
        ));
    }

    #[test]
    fn missing_file_is_reported() {
        assert!(matches!(
            FileSource::open(PathBuf::from("/definitely/not/here.csv")),
            Err(GridError::FileNotFound)
        ));
    }

    #[test]
    fn json_rows_keep_types_and_order() {
        let file = temp_file(
            ".json",
            r#"[{"id": "1", "title": "Loft", "price": 420000, "published": true, "tags": ["sea", "city"], "notes": null},
               {"id": "2", "title": "Barn", "price": 99.5, "published": false, "tags": [], "notes": "x"}]"#,
        );
        let mut source = FileSource::open(file.path().to_path_buf()).expect("open");
        let rows = source.fetch_rows().expect("rows");
        assert_eq!(rows.len(), 2);
        let keys: Vec<&str> = rows[0].iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["id", "title", "price", "published", "tags", "notes"]);
        assert_eq!(rows[0].field("price"), Value::from(420000));
        assert_eq!(rows[0].field("published"), Value::from(true));
        assert_eq!(rows[0].field("tags"), Value::from("sea,city"));
        assert!(rows[0].field("notes").is_null());
    }

    #[test]
    fn delete_only_touches_loaded_copy() {
        let file = temp_file(".json", r#"[{"id": "1"}, {"id": "2"}]"#);
        let mut source = FileSource::open(file.path().to_path_buf()).expect("open");
        source.delete_row("1").expect("delete");
        assert_eq!(source.fetch_rows().expect("rows").len(), 1);
        assert!(matches!(source.delete_row("1"), Err(GridError::RowNotFound(_))));
    }

    #[test]
    fn json_must_be_an_array_of_objects() {
        let file = temp_file(".json", r#"{"id": "1"}"#);
        let mut source = FileSource::open(file.path().to_path_buf()).expect("open");
        assert!(matches!(
            source.fetch_rows(),
            Err(GridError::LoadingFailed { .. })
        ));
    }

    #[test]
    fn csv_rows_are_typed() {
        let file = temp_file(".csv", "id,title,price,published\na1,Loft,420000,true\na2,Barn,,false\n");
        let mut source = FileSource::open(file.path().to_path_buf()).expect("open");
        let rows = source.fetch_rows().expect("rows");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].field("title"), Value::from("Loft"));
        assert_eq!(rows[0].field("price"), Value::from(420000));
        assert!(rows[1].field("price").is_null());
        assert_eq!(rows[1].field("published"), Value::from(false));
    }

    #[test]
    fn memory_source_deletes_by_id() {
        let mut source = MemorySource::new(
            "mem",
            vec![Record::from_pairs([("id", Value::from(1))]), Record::from_pairs([("id", Value::from(2))])],
        );
        source.delete_row("2").expect("delete");
        assert_eq!(source.fetch_rows().expect("rows").len(), 1);
    }
}
