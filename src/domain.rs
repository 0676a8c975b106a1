use std::fmt;
use std::io::Error;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;
use tracing_error::SpanTrace;

#[derive(Debug)]
pub enum GridError {
    IoError(Error),
    PolarsError(PolarsError),
    JsonError(serde_json::Error),
    LoadingFailed { reason: String, trace: SpanTrace },
    FileNotFound,
    PermissionDenied,
    UnknownFileType,
    RowNotFound(String),
    InvalidField(String),
}

impl GridError {
    /// Builds a loading error that remembers the spans it was raised in.
    pub fn loading_failed(reason: impl Into<String>) -> Self {
        GridError::LoadingFailed {
            reason: reason.into(),
            trace: SpanTrace::capture(),
        }
    }
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridError::IoError(e) => write!(f, "io error: {e}"),
            GridError::PolarsError(e) => write!(f, "could not read data: {e}"),
            GridError::JsonError(e) => write!(f, "invalid json: {e}"),
            GridError::LoadingFailed { reason, .. } => write!(f, "loading failed: {reason}"),
            GridError::FileNotFound => f.write_str("file not found"),
            GridError::PermissionDenied => f.write_str("permission denied"),
            GridError::UnknownFileType => {
                f.write_str("unknown file type (expected csv, parquet, arrow or json)")
            }
            GridError::RowNotFound(id) => write!(f, "no row with id {id}"),
            GridError::InvalidField(msg) => write!(f, "invalid field: {msg}"),
        }
    }
}

impl std::error::Error for GridError {}

impl From<Error> for GridError {
    fn from(err: Error) -> Self {
        GridError::IoError(err)
    }
}

impl From<PolarsError> for GridError {
    fn from(err: PolarsError) -> Self {
        GridError::PolarsError(err)
    }
}

impl From<serde_json::Error> for GridError {
    fn from(err: serde_json::Error) -> Self {
        GridError::JsonError(err)
    }
}

/// User intents produced by the controller and consumed by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    ScrollLeft,
    ScrollRight,
    NextPage,
    PrevPage,
    /// Jump to the n-th (0-based) page button of the page window
    PageButton(usize),
    GrowPageSize,
    ShrinkPageSize,
    ToggleSort,
    Search,
    Enter,
    Exit,
    Delete,
    Refresh,
    CopyCell,
    CopyRow,
    Help,
    Resize(usize, usize),
    RawKey(KeyEvent),
}

/// What the command line at the bottom is currently collecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Search,
}

/// Settings of the terminal host, filled from the command line.
#[derive(Debug, Clone, Setters)]
pub struct GridConfig {
    pub event_poll_time: u64,
    pub max_column_width: usize,
    pub page_size: Option<usize>,
    pub max_height: Option<u16>,
    pub compact: bool,
    pub bordered: bool,
    pub striped: bool,
    pub sticky_header: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
            max_column_width: 40,
            page_size: None,
            max_height: None,
            compact: false,
            bordered: false,
            striped: false,
            sticky_header: false,
        }
    }
}

pub const HELP_TEXT: &str = "\
Navigation
  ↑ ↓          select row
  ← →          select column
  h l          scroll columns
  n p          next / previous page (also PgDn / PgUp)
  1-5          jump to page button
  + -          change page size

Grid
  /            search (Enter keeps, Esc clears)
  s            sort selected column (asc, desc, off)
  Enter        open row
  d            delete row
  r            reload data
  y Y          copy cell / row

  ?            help
  Esc          close
  q            quit";
