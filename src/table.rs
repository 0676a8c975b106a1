use std::fmt;

use derive_setters::Setters;
use tracing::{debug, trace};

use crate::column::{Column, ColumnLayout};
use crate::pipeline::{
    self, FilterStage, SortStage, SortState, StableSort, SubstringFilter,
};
use crate::value::Row;

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const DEFAULT_PAGE_SIZE_OPTIONS: [usize; 4] = [10, 25, 50, 100];

#[derive(Debug, Clone, PartialEq, Setters)]
pub struct PaginationOptions {
    pub enabled: bool,
    pub page_size: usize,
    pub show_size_changer: bool,
    pub page_size_options: Vec<usize>,
}

impl Default for PaginationOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            page_size: DEFAULT_PAGE_SIZE,
            show_size_changer: false,
            page_size_options: DEFAULT_PAGE_SIZE_OPTIONS.to_vec(),
        }
    }
}

/// Behavior and styling switches of one grid instance.
#[derive(Debug, Clone, PartialEq, Setters)]
pub struct TableOptions {
    pub pagination: PaginationOptions,
    pub searchable: bool,
    #[setters(into)]
    pub search_placeholder: String,
    pub striped: bool,
    pub hoverable: bool,
    pub bordered: bool,
    pub compact: bool,
    #[setters(strip_option)]
    pub max_height: Option<u16>,
    pub sticky_header: bool,
    #[setters(into)]
    pub empty_text: String,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            pagination: PaginationOptions::default(),
            searchable: false,
            search_placeholder: "Search...".to_string(),
            striped: false,
            hoverable: true,
            bordered: false,
            compact: false,
            max_height: None,
            sticky_header: false,
            empty_text: "No data available".to_string(),
        }
    }
}

/// Interaction phases. Handlers run to completion, so outside of a handler the
/// grid is always `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Searching,
    Sorting,
    Paginating,
}

/// Position of the current page within the derived sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub current: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub total_rows: usize,
    /// 1-based position of the first row on the page, 0 when the page is empty
    pub first: usize,
    pub last: usize,
}

type SearchHook = Box<dyn FnMut(&str)>;
type RowClickHook<R> = Box<dyn FnMut(&R, usize)>;

/// A searchable, sortable, paginated grid over an owned row sequence.
pub struct DataTable<R> {
    rows: Vec<R>,
    columns: Vec<Column<R>>,
    layout: ColumnLayout,
    options: TableOptions,
    query: String,
    sort: Option<SortState>,
    current_page: usize,
    page_size: usize,
    loading: bool,
    phase: Phase,
    last_transition: Phase,
    filter_stage: Box<dyn FilterStage<R>>,
    sort_stage: Box<dyn SortStage<R>>,
    // Filtered and sorted indices into `rows`
    view: Vec<usize>,
    on_search: Option<SearchHook>,
    on_row_click: Option<RowClickHook<R>>,
}

impl<R: Row> DataTable<R> {
    pub fn new(columns: Vec<Column<R>>, options: TableOptions) -> Self {
        let layout = ColumnLayout::partition(&columns);
        let page_size = options.pagination.page_size.max(1);
        Self {
            rows: Vec::new(),
            columns,
            layout,
            options,
            query: String::new(),
            sort: None,
            current_page: 1,
            page_size,
            loading: false,
            phase: Phase::Idle,
            last_transition: Phase::Idle,
            filter_stage: Box::new(SubstringFilter),
            sort_stage: Box::new(StableSort),
            view: Vec::new(),
            on_search: None,
            on_row_click: None,
        }
    }

    pub fn with_rows(mut self, rows: Vec<R>) -> Self {
        self.set_rows(rows);
        self
    }
}

impl<R> DataTable<R> {
    /// Replaces stage 2, e.g. with one backed by a server query.
    pub fn with_filter_stage(mut self, stage: impl FilterStage<R> + 'static) -> Self {
        self.filter_stage = Box::new(stage);
        self.rederive();
        self
    }

    pub fn with_sort_stage(mut self, stage: impl SortStage<R> + 'static) -> Self {
        self.sort_stage = Box::new(stage);
        self.rederive();
        self
    }

    pub fn on_search(mut self, hook: impl FnMut(&str) + 'static) -> Self {
        self.on_search = Some(Box::new(hook));
        self
    }

    pub fn on_row_click(mut self, hook: impl FnMut(&R, usize) + 'static) -> Self {
        self.on_row_click = Some(Box::new(hook));
        self
    }

    // -------------------- Data intake ---------------------- //

    /// Takes a freshly fetched row sequence. Search and sort survive, the page is reclamped.
    pub fn set_rows(&mut self, rows: Vec<R>) {
        debug!("Grid received {} rows", rows.len());
        self.rows = rows;
        self.rederive();
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    // -------------------- Interaction handlers ---------------------- //

    /// Applies a new search query and returns to the first page.
    pub fn search(&mut self, query: &str) {
        if !self.options.searchable {
            trace!("Search ignored, grid is not searchable");
            return;
        }
        self.enter(Phase::Searching);
        self.query = query.to_string();
        self.current_page = 1;
        if let Some(hook) = self.on_search.as_mut() {
            hook(query);
        }
        self.settle();
    }

    /// Cycles the sort state of `key`. Returns false for unknown or non-sortable columns.
    pub fn toggle_sort(&mut self, key: &str) -> bool {
        let sortable = self.columns.iter().any(|c| c.key == key && c.sortable);
        if !sortable {
            trace!("Column {key} is not sortable");
            return false;
        }
        self.enter(Phase::Sorting);
        self.sort = SortState::cycle(self.sort.as_ref(), key);
        self.settle();
        true
    }

    pub fn go_to_page(&mut self, page: usize) {
        self.enter(Phase::Paginating);
        self.current_page = pipeline::clamp_page(page, self.total_pages());
        self.settle();
    }

    pub fn next_page(&mut self) {
        self.go_to_page(self.current_page.saturating_add(1));
    }

    pub fn prev_page(&mut self) {
        self.go_to_page(self.current_page.saturating_sub(1));
    }

    /// Changes the page size and returns to the first page. A size of zero is rejected.
    pub fn set_page_size(&mut self, size: usize) -> bool {
        if size == 0 {
            return false;
        }
        self.enter(Phase::Paginating);
        self.page_size = size;
        self.current_page = 1;
        self.settle();
        true
    }

    /// Fires the row click hook for the row at `index` within the current page.
    pub fn click_row(&mut self, index: usize) -> bool {
        let Some(row_idx) = self.page_indices().get(index).copied() else {
            return false;
        };
        let rows = &self.rows;
        if let Some(hook) = self.on_row_click.as_mut() {
            hook(&rows[row_idx], index);
        }
        true
    }

    fn enter(&mut self, phase: Phase) {
        trace!("Grid {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    fn settle(&mut self) {
        self.rederive();
        self.last_transition = self.phase;
        self.phase = Phase::Idle;
    }

    // Recomputes filter -> sort and pulls the current page back into range.
    fn rederive(&mut self) {
        let filtered = if self.options.searchable && !self.query.is_empty() {
            self.filter_stage.filter(&self.rows, &self.columns, &self.query)
        } else {
            (0..self.rows.len()).collect()
        };
        self.view = self.sort_stage.sort(&self.rows, filtered, self.sort.as_ref());
        self.current_page = pipeline::clamp_page(self.current_page, self.total_pages());
        trace!(
            "Derived {} of {} rows, page {}/{}",
            self.view.len(),
            self.rows.len(),
            self.current_page,
            self.total_pages()
        );
    }

    // -------------------- Derived state ---------------------- //

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn columns(&self) -> &[Column<R>] {
        &self.columns
    }

    pub fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    pub fn options(&self) -> &TableOptions {
        &self.options
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn sort(&self) -> Option<&SortState> {
        self.sort.as_ref()
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn last_transition(&self) -> Phase {
        self.last_transition
    }

    pub fn pagination_enabled(&self) -> bool {
        self.options.pagination.enabled
    }

    /// Filtered and sorted row indices, before pagination.
    pub fn visible_indices(&self) -> &[usize] {
        &self.view
    }

    pub fn visible_rows(&self) -> impl Iterator<Item = &R> {
        self.view.iter().map(|&idx| &self.rows[idx])
    }

    /// Row indices of the current page, or all visible rows when pagination is off.
    pub fn page_indices(&self) -> &[usize] {
        if self.pagination_enabled() {
            pipeline::paginate(&self.view, self.current_page, self.page_size)
        } else {
            &self.view
        }
    }

    pub fn page_rows(&self) -> Vec<&R> {
        self.page_indices().iter().map(|&idx| &self.rows[idx]).collect()
    }

    pub fn total_pages(&self) -> usize {
        pipeline::total_pages(self.view.len(), self.page_size)
    }

    pub fn page_window(&self) -> Vec<usize> {
        pipeline::page_window(self.current_page, self.total_pages()).collect()
    }

    pub fn page_info(&self) -> PageInfo {
        let total_rows = self.view.len();
        let shown = self.page_indices().len();
        let first = if shown == 0 {
            0
        } else if self.pagination_enabled() {
            (self.current_page - 1) * self.page_size + 1
        } else {
            1
        };
        PageInfo {
            current: self.current_page,
            page_size: self.page_size,
            total_pages: self.total_pages(),
            total_rows,
            first,
            last: if shown == 0 { 0 } else { first + shown - 1 },
        }
    }

    /// Next (or previous) entry of the configured page size options. Zero entries are skipped.
    pub fn cycle_page_size(&mut self, forward: bool) -> bool {
        let options: Vec<usize> = self
            .options
            .pagination
            .page_size_options
            .iter()
            .copied()
            .filter(|&s| s > 0)
            .collect();
        if options.is_empty() {
            return false;
        }
        let pos = options.iter().position(|&s| s == self.page_size);
        let next = match (pos, forward) {
            (Some(p), true) => options[(p + 1) % options.len()],
            (Some(p), false) => options[(p + options.len() - 1) % options.len()],
            (None, true) => options
                .iter()
                .copied()
                .find(|&s| s > self.page_size)
                .unwrap_or(options[0]),
            (None, false) => options
                .iter()
                .rev()
                .copied()
                .find(|&s| s < self.page_size)
                .unwrap_or(options[options.len() - 1]),
        };
        self.set_page_size(next)
    }
}

impl<R> fmt::Debug for DataTable<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataTable")
            .field("rows", &self.rows.len())
            .field("columns", &self.columns)
            .field("query", &self.query)
            .field("sort", &self.sort)
            .field("current_page", &self.current_page)
            .field("page_size", &self.page_size)
            .field("loading", &self.loading)
            .field("visible", &self.view.len())
            .finish()
    }
}
