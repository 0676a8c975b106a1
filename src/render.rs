//! Render contract of the grid: everything the UI needs to draw one frame,
//! computed from the table state without touching the terminal.

use crate::column::{Align, CellText, Fixed};
use crate::pipeline::SortDirection;
use crate::table::DataTable;
use crate::value::Row;

pub const ELLIPSIS: &str = "…";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortIndicator {
    /// Column does not take part in sorting
    Off,
    Unsorted,
    Asc,
    Desc,
}

impl SortIndicator {
    pub fn symbol(&self) -> &'static str {
        match self {
            SortIndicator::Off => "",
            SortIndicator::Unsorted => "⇅",
            SortIndicator::Asc => "↑",
            SortIndicator::Desc => "↓",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderCell {
    pub key: String,
    pub title: String,
    pub align: Align,
    pub sort: SortIndicator,
    pub fixed: Option<Fixed>,
    pub width: Option<u16>,
    pub min_width: Option<u16>,
    pub max_width: Option<u16>,
    pub ellipsis: bool,
}

impl HeaderCell {
    pub fn label(&self) -> String {
        match self.sort {
            SortIndicator::Off => self.title.clone(),
            indicator => format!("{} {}", self.title, indicator.symbol()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BodyCell {
    pub content: CellText,
    pub align: Align,
    /// Raw field value of ellipsis columns, shown when the content is cut off
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BodyRow {
    /// Position within the page
    pub page_index: usize,
    /// Index into the table's row sequence
    pub row_index: usize,
    pub striped: bool,
    pub cells: Vec<BodyCell>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Single row spanning all columns
    Placeholder(String),
    Rows(Vec<BodyRow>),
}

/// Number of header cells per region, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Regions {
    pub left: usize,
    pub scroll: usize,
    pub right: usize,
}

impl Regions {
    pub fn has_fixed(&self) -> bool {
        self.left > 0 || self.right > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageButton {
    pub number: usize,
    pub current: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Footer {
    pub summary: String,
    pub page_size: usize,
    /// Present when the size changer is shown
    pub size_options: Option<Vec<usize>>,
    pub prev_enabled: bool,
    pub next_enabled: bool,
    pub pages: Vec<PageButton>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridFrame {
    pub header: Vec<HeaderCell>,
    pub regions: Regions,
    pub body: Body,
    pub footer: Option<Footer>,
    pub sticky_header: bool,
    pub striped: bool,
    pub hoverable: bool,
    pub bordered: bool,
    pub compact: bool,
    pub max_height: Option<u16>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableFrame {
    Loading,
    Grid(GridFrame),
}

impl TableFrame {
    pub fn build<R: Row>(table: &DataTable<R>) -> Self {
        if table.is_loading() {
            return TableFrame::Loading;
        }
        let options = table.options();
        let layout = table.layout();
        let order = layout.display_order();
        let columns = table.columns();

        let header = order
            .iter()
            .map(|&cidx| {
                let column = &columns[cidx];
                let sort = match table.sort() {
                    _ if !column.sortable => SortIndicator::Off,
                    Some(s) if s.key == column.key => match s.direction {
                        SortDirection::Asc => SortIndicator::Asc,
                        SortDirection::Desc => SortIndicator::Desc,
                    },
                    _ => SortIndicator::Unsorted,
                };
                HeaderCell {
                    key: column.key.clone(),
                    title: column.title.clone(),
                    align: column.align,
                    sort,
                    fixed: column.fixed,
                    width: column.width,
                    min_width: column.effective_min_width(),
                    max_width: column.max_width,
                    ellipsis: column.ellipsis,
                }
            })
            .collect();

        let page = table.page_indices();
        let body = if page.is_empty() {
            Body::Placeholder(options.empty_text.clone())
        } else {
            let rows = table.rows();
            Body::Rows(
                page.iter()
                    .enumerate()
                    .map(|(page_index, &row_index)| BodyRow {
                        page_index,
                        row_index,
                        striped: options.striped && page_index % 2 == 1,
                        cells: order
                            .iter()
                            .map(|&cidx| {
                                let column = &columns[cidx];
                                let (value, content) = column.cell(&rows[row_index], page_index);
                                let title = column.ellipsis.then(|| value.to_string());
                                BodyCell {
                                    content,
                                    align: column.align,
                                    title,
                                }
                            })
                            .collect(),
                    })
                    .collect(),
            )
        };

        let footer = (options.pagination.enabled && !page.is_empty()).then(|| {
            let info = table.page_info();
            Footer {
                summary: format!(
                    "Showing {} to {} of {} results",
                    info.first, info.last, info.total_rows
                ),
                page_size: info.page_size,
                size_options: options
                    .pagination
                    .show_size_changer
                    .then(|| options.pagination.page_size_options.clone()),
                prev_enabled: info.current > 1,
                next_enabled: info.current < info.total_pages,
                pages: table
                    .page_window()
                    .into_iter()
                    .map(|number| PageButton {
                        number,
                        current: number == info.current,
                    })
                    .collect(),
            }
        });

        TableFrame::Grid(GridFrame {
            header,
            regions: Regions {
                left: layout.left.len(),
                scroll: layout.scroll.len(),
                right: layout.right.len(),
            },
            body,
            footer,
            sticky_header: options.sticky_header,
            striped: options.striped,
            hoverable: options.hoverable,
            bordered: options.bordered,
            compact: options.compact,
            max_height: options.max_height,
        })
    }
}

pub fn text_width(text: &str) -> usize {
    text.chars().count()
}

/// Cuts `text` to `width` characters, marking the cut with an ellipsis.
pub fn truncate(text: &str, width: usize) -> String {
    if text_width(text) <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(width - 1).collect();
    out.push_str(ELLIPSIS);
    out
}

/// Rendered width of every header cell: the explicit width, or the widest of
/// title and page content, bounded by the column's min/max and `max_column_width`.
pub fn column_widths(frame: &GridFrame, max_column_width: usize) -> Vec<u16> {
    frame
        .header
        .iter()
        .enumerate()
        .map(|(hidx, head)| {
            if let Some(width) = head.width {
                return width;
            }
            let content = match &frame.body {
                Body::Rows(rows) => rows
                    .iter()
                    .map(|r| text_width(&r.cells[hidx].content.text))
                    .max()
                    .unwrap_or(0),
                Body::Placeholder(_) => 0,
            };
            let natural = text_width(&head.label()).max(content).min(max_column_width);
            let mut width = u16::try_from(natural).unwrap_or(u16::MAX);
            if let Some(max) = head.max_width {
                width = width.min(max);
            }
            if let Some(min) = head.min_width {
                width = width.max(min);
            }
            width
        })
        .collect()
}

/// A column that made it onto the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placed {
    /// Index into the frame's header cells
    pub column: usize,
    pub width: u16,
}

/// Picks the columns to draw within `budget` cells (one cell of spacing per column).
/// Pinned columns are always placed; the scrolling region starts at `offset` and
/// ends with a partially visible column if space remains.
pub fn fit_columns(widths: &[u16], regions: Regions, offset: usize, budget: u16) -> Vec<Placed> {
    let budget = usize::from(budget);
    let scroll_start = regions.left;
    let right_start = regions.left + regions.scroll;

    let mut used = 0usize;
    let mut place = |column: usize, available: usize, out: &mut Vec<Placed>| -> bool {
        let wanted = usize::from(widths[column]) + 1;
        if used + wanted <= available {
            out.push(Placed {
                column,
                width: widths[column],
            });
            used += wanted;
            true
        } else {
            if used < available {
                let rest = available - used;
                out.push(Placed {
                    column,
                    width: u16::try_from(rest.saturating_sub(1)).unwrap_or(u16::MAX),
                });
                used = available;
            }
            false
        }
    };

    let mut left = Vec::new();
    for column in 0..scroll_start {
        place(column, budget, &mut left);
    }
    let mut right = Vec::new();
    for column in right_start..widths.len() {
        place(column, budget, &mut right);
    }
    let mut middle = Vec::new();
    let offset = offset.min(regions.scroll.saturating_sub(1));
    for column in scroll_start + offset..right_start {
        if !place(column, budget, &mut middle) {
            break;
        }
    }

    left.into_iter()
        .chain(middle)
        .chain(right)
        .filter(|p| p.width > 0)
        .collect()
}
