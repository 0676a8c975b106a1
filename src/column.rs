use std::fmt;

use derive_setters::Setters;

use crate::value::{Row, Value};

/// Default minimum width (in cells) of pinned columns that do not declare one.
pub const FIXED_COLUMN_MIN_WIDTH: u16 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

/// Pins a column outside of the horizontally scrollable region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fixed {
    Left,
    Right,
}

/// Visual weight of a rendered cell, mapped to colors by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tone {
    #[default]
    Plain,
    Muted,
    Accent,
    Success,
    Warning,
    Danger,
}

/// What a column shows for one row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CellText {
    pub text: String,
    pub tone: Tone,
}

impl CellText {
    pub fn new(text: impl Into<String>, tone: Tone) -> Self {
        Self {
            text: text.into(),
            tone,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, Tone::Plain)
    }
}

impl From<String> for CellText {
    fn from(text: String) -> Self {
        CellText::plain(text)
    }
}

impl From<&str> for CellText {
    fn from(text: &str) -> Self {
        CellText::plain(text)
    }
}

/// `(value, row, row index within the page) -> display`
pub type RenderFn<R> = Box<dyn Fn(&Value, &R, usize) -> CellText>;

/// Describes how one field of a row is displayed, sorted and laid out.
#[derive(Setters)]
#[setters(strip_option)]
pub struct Column<R> {
    #[setters(skip)]
    pub key: String,
    #[setters(skip)]
    pub title: String,
    pub sortable: bool,
    #[setters(skip)]
    render: Option<RenderFn<R>>,
    pub align: Align,
    pub width: Option<u16>,
    pub min_width: Option<u16>,
    pub max_width: Option<u16>,
    pub fixed: Option<Fixed>,
    pub ellipsis: bool,
}

impl<R> Column<R> {
    pub fn new(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            sortable: false,
            render: None,
            align: Align::Left,
            width: None,
            min_width: None,
            max_width: None,
            fixed: None,
            ellipsis: false,
        }
    }

    pub fn render(mut self, render: impl Fn(&Value, &R, usize) -> CellText + 'static) -> Self {
        self.render = Some(Box::new(render));
        self
    }

    /// Minimum width honoring the pinned-column default.
    pub fn effective_min_width(&self) -> Option<u16> {
        match (self.min_width, self.fixed) {
            (Some(w), _) => Some(w),
            (None, Some(_)) => Some(FIXED_COLUMN_MIN_WIDTH),
            (None, None) => None,
        }
    }
}

impl<R: Row> Column<R> {
    /// Resolves the raw value and the display content of this column for a row.
    /// A panicking render callback is not caught here.
    pub fn cell(&self, row: &R, index: usize) -> (Value, CellText) {
        let value = row.field(&self.key);
        let content = match &self.render {
            Some(render) => render(&value, row, index),
            None => CellText::plain(value.to_string()),
        };
        (value, content)
    }
}

impl<R> fmt::Debug for Column<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("key", &self.key)
            .field("title", &self.title)
            .field("sortable", &self.sortable)
            .field("render", &self.render.is_some())
            .field("align", &self.align)
            .field("fixed", &self.fixed)
            .field("ellipsis", &self.ellipsis)
            .finish()
    }
}

/// Column indices split into the pinned-left, scrolling and pinned-right regions.
/// Each region keeps the relative order of the descriptor list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnLayout {
    pub left: Vec<usize>,
    pub scroll: Vec<usize>,
    pub right: Vec<usize>,
}

impl ColumnLayout {
    pub fn partition<R>(columns: &[Column<R>]) -> Self {
        let mut layout = ColumnLayout::default();
        for (idx, column) in columns.iter().enumerate() {
            match column.fixed {
                Some(Fixed::Left) => layout.left.push(idx),
                Some(Fixed::Right) => layout.right.push(idx),
                None => layout.scroll.push(idx),
            }
        }
        layout
    }

    pub fn has_fixed(&self) -> bool {
        !self.left.is_empty() || !self.right.is_empty()
    }

    /// Display order: left pinned, scrolling, right pinned.
    pub fn display_order(&self) -> Vec<usize> {
        self.left
            .iter()
            .chain(self.scroll.iter())
            .chain(self.right.iter())
            .copied()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.left.len() + self.scroll.len() + self.right.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
