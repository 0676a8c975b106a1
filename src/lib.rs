//! A searchable, sortable, paginated data grid for admin list pages, with a
//! terminal host built on ratatui.
//!
//! The grid itself ([`table::DataTable`]) knows nothing about terminals: it owns the
//! rows, derives the visible page through the [`pipeline`] stages and exposes a
//! render contract ([`render::TableFrame`]) that [`ui`] draws.

pub mod column;
pub mod controller;
pub mod domain;
pub mod fields;
pub mod inputter;
pub mod model;
pub mod pipeline;
pub mod render;
pub mod source;
pub mod table;
pub mod ui;
pub mod value;
pub mod views;

pub use column::{Align, CellText, Column, Fixed, Tone};
pub use domain::GridError;
pub use pipeline::{SortDirection, SortState};
pub use render::TableFrame;
pub use source::{FileSource, MemorySource, Record, RowSource};
pub use table::{DataTable, PaginationOptions, Phase, TableOptions};
pub use value::{Row, Value};
