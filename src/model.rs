use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use tracing::{debug, error, info, trace};

use crate::domain::{GridConfig, GridError, HELP_TEXT, InputMode, Message};
use crate::fields::DynamicField;
use crate::inputter::{InputResult, Inputter};
use crate::render::{self, Body, GridFrame, Placed, TableFrame};
use crate::source::{Record, RowSource};
use crate::table::{DataTable, TableOptions};
use crate::ui::{BORDER_WIDTH, FOOTER_HEIGHT, SEARCH_BAR_HEIGHT, STATUSLINE_HEIGHT, TABLE_HEADER_HEIGHT};
use crate::value::{Row, Value};
use crate::views::{CategoryLookup, ViewKind};

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Status {
    Loading,
    Ready,
    Quitting,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    Table,
    Input,
    Popup,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Popup {
    pub title: String,
    pub lines: Vec<String>,
    pub scroll: usize,
}

#[derive(Default, Clone, Debug, PartialEq)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub table_width: usize,
    pub body_height: usize,
}

impl UILayout {
    pub fn from_values(ui_width: usize, ui_height: usize, options: &TableOptions) -> Self {
        let search = if options.searchable { SEARCH_BAR_HEIGHT } else { 0 };
        let chrome = search + STATUSLINE_HEIGHT + FOOTER_HEIGHT + TABLE_HEADER_HEIGHT + 2 * BORDER_WIDTH;
        let mut body_height = ui_height.saturating_sub(chrome);
        if let Some(max) = options.max_height {
            body_height = body_height.min(usize::from(max));
        }
        let layout = UILayout {
            width: ui_width,
            height: ui_height,
            table_width: ui_width.saturating_sub(2 * BORDER_WIDTH),
            body_height,
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

/// Everything the UI draws for one frame.
pub struct UIData {
    pub name: String,
    pub frame: TableFrame,
    pub placed: Vec<Placed>,
    pub selected_row: usize,
    pub selected_column: usize,
    pub row_offset: usize,
    pub visible_rows: usize,
    pub searchable: bool,
    pub search_placeholder: String,
    pub query: String,
    pub cmdinput: InputResult,
    pub input_mode: Option<InputMode>,
    pub popup: Option<Popup>,
    pub status_message: String,
    pub tooltip: Option<String>,
    pub layout: UILayout,
}

type FetchResult = Result<Vec<Record>, GridError>;

/// The list page hosting one grid: owns the data source, the loading flag and
/// everything around the table that is not the table itself.
pub struct Model {
    config: GridConfig,
    kind: ViewKind,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    table: DataTable<Record>,
    source: Arc<Mutex<Box<dyn RowSource>>>,
    source_name: String,
    pending: Option<Receiver<FetchResult>>,
    clicked: Rc<RefCell<Option<(Record, usize)>>>,
    cursor_row: usize,
    cursor_column: usize,
    offset_column: usize,
    row_offset: usize,
    uilayout: UILayout,
    clipboard: Option<Clipboard>,
    input: Inputter,
    last_input: InputResult,
    input_mode: Option<InputMode>,
    popup: Option<Popup>,
    status_message: String,
    last_status_message_update: Instant,
}

impl Model {
    pub fn init(
        config: &GridConfig,
        kind: ViewKind,
        source: Box<dyn RowSource>,
        categories: &CategoryLookup,
        ui_width: usize,
        ui_height: usize,
    ) -> Self {
        let mut options = kind.options();
        if let Some(size) = config.page_size.filter(|&size| size > 0) {
            options.pagination.page_size = size;
            if !options.pagination.page_size_options.contains(&size) {
                options.pagination.page_size_options.push(size);
                options.pagination.page_size_options.sort_unstable();
            }
        }
        options.max_height = config.max_height.or(options.max_height);
        options.compact = options.compact || config.compact;
        options.bordered = options.bordered || config.bordered;
        options.striped = options.striped || config.striped;
        options.sticky_header = options.sticky_header || config.sticky_header;

        let clicked = Rc::new(RefCell::new(None));
        let on_click = Rc::clone(&clicked);
        let table = kind
            .table(categories, options)
            .on_search(|query| debug!("Search query is now {query:?}"))
            .on_row_click(move |row: &Record, idx| {
                *on_click.borrow_mut() = Some((row.clone(), idx));
            });

        let clipboard = match Clipboard::new() {
            Ok(c) => Some(c),
            Err(e) => {
                debug!("Clipboard unavailable: {e:?}");
                None
            }
        };

        let source_name = source.name();
        let uilayout = UILayout::from_values(ui_width, ui_height, table.options());
        let mut model = Self {
            config: config.clone(),
            kind,
            status: Status::Ready,
            modus: Modus::Table,
            previous_modus: Modus::Table,
            table,
            source: Arc::new(Mutex::new(source)),
            source_name,
            pending: None,
            clicked,
            cursor_row: 0,
            cursor_column: 0,
            offset_column: 0,
            row_offset: 0,
            uilayout,
            clipboard,
            input: Inputter::default(),
            last_input: InputResult::default(),
            input_mode: None,
            popup: None,
            status_message: "Started asset-grid!".to_string(),
            last_status_message_update: Instant::now(),
        };
        model.fetch();
        model
    }

    // -------------------- Data source ---------------------- //

    /// Starts fetching rows off the UI thread. The grid shows its loading state until
    /// [`Model::poll_fetch`] picks up the result.
    pub fn fetch(&mut self) {
        let (tx, rx) = mpsc::channel::<FetchResult>();
        let source = Arc::clone(&self.source);
        rayon::spawn(move || {
            let result = source
                .lock()
                .map_err(|_| GridError::loading_failed("row source lock poisoned"))
                .and_then(|mut s| s.fetch_rows());
            if tx.send(result).is_err() {
                trace!("Fetch result dropped, model is gone");
            }
        });
        self.pending = Some(rx);
        self.status = Status::Loading;
        self.table.set_loading(true);
        self.set_status_message("Loading ...");
    }

    /// Applies a finished fetch. Returns true when something changed.
    pub fn poll_fetch(&mut self) -> bool {
        let Some(rx) = &self.pending else {
            return false;
        };
        let result = match rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return false,
            Err(TryRecvError::Disconnected) => {
                Err(GridError::loading_failed("row source stopped without an answer"))
            }
        };
        self.apply_fetch(result);
        true
    }

    /// Blocks until the pending fetch is applied.
    pub fn wait_for_fetch(&mut self) {
        if let Some(rx) = &self.pending {
            let result = rx
                .recv()
                .unwrap_or_else(|_| Err(GridError::loading_failed("row source stopped")));
            self.apply_fetch(result);
        }
    }

    fn apply_fetch(&mut self, result: FetchResult) {
        self.pending = None;
        self.table.set_loading(false);
        self.status = Status::Ready;
        match result {
            Ok(rows) => {
                info!("Fetched {} rows from {}", rows.len(), self.source_name);
                let count = rows.len();
                self.table.set_rows(rows);
                self.clamp_cursor();
                self.set_status_message(format!("Loaded {count} rows"));
            }
            Err(e) => {
                error!("Fetching rows failed: {e:?}");
                self.set_status_message(format!("Error: {e}"));
            }
        }
    }

    fn delete_selected_row(&mut self) {
        let Some(record) = self.selected_record() else {
            self.set_status_message("Nothing selected");
            return;
        };
        let Some(id) = record.id() else {
            self.set_status_message("Row has no id");
            return;
        };
        let result = match self.source.lock() {
            Ok(mut source) => source.delete_row(&id),
            Err(_) => Err(GridError::loading_failed("row source lock poisoned")),
        };
        match result {
            Ok(()) => {
                info!("Deleted row {id}");
                self.fetch();
                self.set_status_message(format!("Deleted {id}"));
            }
            Err(e) => {
                error!("Deleting {id} failed: {e:?}");
                self.set_status_message(format!("Error: {e}"));
            }
        }
    }

    // -------------------- Accessors ---------------------- //

    pub fn table(&self) -> &DataTable<Record> {
        &self.table
    }

    pub fn kind(&self) -> ViewKind {
        self.kind
    }

    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::Input
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn popup(&self) -> Option<&Popup> {
        self.popup.as_ref()
    }

    pub fn cursor(&self) -> (usize, usize) {
        (self.cursor_row, self.cursor_column)
    }

    pub fn offset_column(&self) -> usize {
        self.offset_column
    }

    pub fn last_status_message_update(&self) -> Instant {
        self.last_status_message_update
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
    }

    fn selected_record(&self) -> Option<&Record> {
        let idx = *self.table.page_indices().get(self.cursor_row)?;
        self.table.rows().get(idx)
    }

    fn grid_frame(&self) -> Option<GridFrame> {
        match TableFrame::build(&self.table) {
            TableFrame::Grid(grid) => Some(grid),
            TableFrame::Loading => None,
        }
    }

    fn placed_columns(&self, grid: &GridFrame) -> Vec<Placed> {
        let widths = render::column_widths(grid, self.config.max_column_width);
        let budget = u16::try_from(self.uilayout.table_width).unwrap_or(u16::MAX);
        render::fit_columns(&widths, grid.regions, self.offset_column, budget)
    }

    fn row_height(&self) -> usize {
        if self.table.options().compact { 1 } else { 2 }
    }

    fn visible_rows(&self) -> usize {
        (self.uilayout.body_height / self.row_height()).max(1)
    }

    pub fn ui_data(&self) -> UIData {
        let frame = TableFrame::build(&self.table);
        let (placed, tooltip) = match &frame {
            TableFrame::Grid(grid) => {
                let placed = self.placed_columns(grid);
                let tooltip = self.tooltip(grid, &placed);
                (placed, tooltip)
            }
            TableFrame::Loading => (Vec::new(), None),
        };
        let options = self.table.options();
        UIData {
            name: format!("{} [{}]", self.kind.title(), self.source_name),
            frame,
            placed,
            selected_row: self.cursor_row,
            selected_column: self.cursor_column,
            row_offset: self.row_offset,
            visible_rows: self.visible_rows(),
            searchable: options.searchable,
            search_placeholder: options.search_placeholder.clone(),
            query: self.table.query().to_string(),
            cmdinput: self.last_input.clone(),
            input_mode: self.input_mode,
            popup: self.popup.clone(),
            status_message: self.status_message.clone(),
            tooltip,
            layout: self.uilayout.clone(),
        }
    }

    // Raw value of the ellipsis cell under the cursor when its content is cut off
    fn tooltip(&self, grid: &GridFrame, placed: &[Placed]) -> Option<String> {
        let Body::Rows(rows) = &grid.body else {
            return None;
        };
        let cell = rows.get(self.cursor_row)?.cells.get(self.cursor_column)?;
        let title = cell.title.as_ref()?;
        let width = placed
            .iter()
            .find(|p| p.column == self.cursor_column)
            .map(|p| usize::from(p.width))
            .unwrap_or(0);
        (render::text_width(&cell.content.text) > width).then(|| title.clone())
    }

    // -------------------- Update loop ---------------------- //

    pub fn update(&mut self, message: Option<Message>) -> Result<(), GridError> {
        self.poll_fetch();

        let Some(msg) = message else {
            return Ok(());
        };
        trace!("Update: Modus {:?}, Message {:?}", self.modus, msg);
        match self.modus {
            Modus::Table => match msg {
                Message::Quit => self.quit(),
                Message::MoveUp => self.move_row(-1),
                Message::MoveDown => self.move_row(1),
                Message::MoveLeft => self.move_column(-1),
                Message::MoveRight => self.move_column(1),
                Message::ScrollLeft => self.scroll_columns(-1),
                Message::ScrollRight => self.scroll_columns(1),
                Message::NextPage => self.paginate(|t| t.next_page()),
                Message::PrevPage => self.paginate(|t| t.prev_page()),
                Message::PageButton(slot) => {
                    if let Some(&page) = self.table.page_window().get(slot) {
                        self.paginate(|t| t.go_to_page(page));
                    }
                }
                Message::GrowPageSize => self.cycle_page_size(true),
                Message::ShrinkPageSize => self.cycle_page_size(false),
                Message::ToggleSort => self.sort_selected_column(),
                Message::Search => self.enter_input_mode(InputMode::Search),
                Message::Enter => self.open_selected_row(),
                Message::Delete => self.delete_selected_row(),
                Message::Refresh => self.fetch(),
                Message::CopyCell => self.copy_cell(),
                Message::CopyRow => self.copy_row(),
                Message::Help => self.show_help(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                Message::Exit | Message::RawKey(_) => {}
            },
            Modus::Popup => match msg {
                Message::Quit => self.quit(),
                Message::MoveDown => self.scroll_popup(1),
                Message::MoveUp => self.scroll_popup(-1),
                Message::Resize(width, height) => self.ui_resize(width, height),
                Message::Exit | Message::Enter => self.close_popup(),
                _ => (),
            },
            Modus::Input => match msg {
                Message::RawKey(key) => self.raw_input(key),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
        }
        Ok(())
    }

    pub fn quit(&mut self) {
        self.status = Status::Quitting;
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout = UILayout::from_values(width, height, self.table.options());
        self.clamp_cursor();
    }

    // -------------------- Control handling functions ---------------------- //

    fn clamp_cursor(&mut self) {
        let rows = self.table.page_indices().len();
        self.cursor_row = self.cursor_row.min(rows.saturating_sub(1));
        let columns = self.table.columns().len();
        self.cursor_column = self.cursor_column.min(columns.saturating_sub(1));
        let visible = self.visible_rows();
        if self.cursor_row < self.row_offset {
            self.row_offset = self.cursor_row;
        } else if self.cursor_row >= self.row_offset + visible {
            self.row_offset = self.cursor_row + 1 - visible;
        }
    }

    fn move_row(&mut self, step: isize) {
        self.cursor_row = self.cursor_row.saturating_add_signed(step);
        self.clamp_cursor();
    }

    fn move_column(&mut self, step: isize) {
        self.cursor_column = self.cursor_column.saturating_add_signed(step);
        self.clamp_cursor();
        self.reveal_selected_column();
    }

    fn scroll_columns(&mut self, step: isize) {
        let Some(grid) = self.grid_frame() else {
            return;
        };
        let max = grid.regions.scroll.saturating_sub(1);
        self.offset_column = self.offset_column.saturating_add_signed(step).min(max);
    }

    // Shifts the scrolling region until the selected column is fully drawn
    fn reveal_selected_column(&mut self) {
        let Some(grid) = self.grid_frame() else {
            return;
        };
        let regions = grid.regions;
        let selected = self.cursor_column;
        if selected < regions.left || selected >= regions.left + regions.scroll {
            return;
        }
        let scroll_idx = selected - regions.left;
        if scroll_idx < self.offset_column {
            self.offset_column = scroll_idx;
            return;
        }
        let widths = render::column_widths(&grid, self.config.max_column_width);
        while self.offset_column < scroll_idx {
            let placed = self.placed_columns(&grid);
            let fully_visible = placed
                .iter()
                .any(|p| p.column == selected && p.width >= widths[selected]);
            if fully_visible {
                break;
            }
            self.offset_column += 1;
        }
    }

    fn paginate(&mut self, op: impl FnOnce(&mut DataTable<Record>)) {
        op(&mut self.table);
        self.cursor_row = 0;
        self.row_offset = 0;
        let info = self.table.page_info();
        self.set_status_message(format!("Page {}/{}", info.current, info.total_pages));
    }

    fn cycle_page_size(&mut self, forward: bool) {
        self.paginate(|t| {
            t.cycle_page_size(forward);
        });
        let size = self.table.page_size();
        self.set_status_message(format!("Showing {size} rows per page"));
    }

    fn sort_selected_column(&mut self) {
        let order = self.table.layout().display_order();
        let Some(&cidx) = order.get(self.cursor_column) else {
            return;
        };
        let column = &self.table.columns()[cidx];
        let (key, title) = (column.key.clone(), column.title.clone());
        if !self.table.toggle_sort(&key) {
            self.set_status_message(format!("{title} is not sortable"));
            return;
        }
        self.cursor_row = 0;
        self.row_offset = 0;
        let message = match self.table.sort() {
            Some(sort) => format!("Sorted by {title} ({:?})", sort.direction),
            None => "Sort cleared".to_string(),
        };
        self.set_status_message(message);
    }

    fn enter_input_mode(&mut self, mode: InputMode) {
        if !self.table.options().searchable {
            self.set_status_message("This view has no search");
            return;
        }
        trace!("Entering input mode {mode:?} ...");
        self.previous_modus = self.modus;
        self.modus = Modus::Input;
        self.input_mode = Some(mode);
        self.input.set(self.table.query());
        self.last_input = self.input.get();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        self.last_input = self.input.read(key);
        if self.last_input.changed {
            // Live search, every keystroke re-derives the grid
            let query = self.last_input.input.clone();
            self.table.search(&query);
            self.cursor_row = 0;
            self.row_offset = 0;
        }
        if self.last_input.finished {
            self.modus = self.previous_modus;
            self.previous_modus = Modus::Input;
            self.input_mode = None;
            let found = self.table.visible_indices().len();
            if self.last_input.canceled {
                self.set_status_message("Search cleared");
            } else {
                self.set_status_message(format!("Found {found} results"));
            }
        }
    }

    fn open_selected_row(&mut self) {
        if !self.table.click_row(self.cursor_row) {
            return;
        }
        let Some((record, index)) = self.clicked.borrow_mut().take() else {
            return;
        };
        let mut lines: Vec<String> = record
            .iter()
            .map(|(key, value)| match value {
                Value::Null => format!("{key}: —"),
                v => format!("{key}: {v}"),
            })
            .collect();

        if self.kind == ViewKind::Categories
            && let Value::Text(json) = record.field("dynamic_fields")
        {
            lines.push(String::new());
            lines.push("Custom fields".to_string());
            match DynamicField::parse_list(&json) {
                Ok(fields) => lines.extend(fields.iter().map(describe_field)),
                Err(e) => lines.push(format!("  {e}")),
            }
        }

        let title = record
            .id()
            .map(|id| format!(" {} #{} ", self.kind.title(), id))
            .unwrap_or_else(|| format!(" Row {} ", index + 1));
        self.open_popup(title, lines);
    }

    fn show_help(&mut self) {
        let lines = HELP_TEXT.lines().map(str::to_string).collect();
        self.open_popup(" Help ".to_string(), lines);
    }

    fn open_popup(&mut self, title: String, lines: Vec<String>) {
        self.previous_modus = self.modus;
        self.modus = Modus::Popup;
        self.popup = Some(Popup {
            title,
            lines,
            scroll: 0,
        });
    }

    fn close_popup(&mut self) {
        trace!("Close popup ...");
        self.popup = None;
        self.modus = self.previous_modus;
        self.previous_modus = Modus::Popup;
    }

    fn scroll_popup(&mut self, step: isize) {
        if let Some(popup) = self.popup.as_mut() {
            let max = popup.lines.len().saturating_sub(1);
            popup.scroll = popup.scroll.saturating_add_signed(step).min(max);
        }
    }

    fn copy_cell(&mut self) {
        let order = self.table.layout().display_order();
        let cell = match (self.selected_record(), order.get(self.cursor_column)) {
            (Some(record), Some(&cidx)) => record.field(&self.table.columns()[cidx].key).to_string(),
            _ => return,
        };
        trace!("Cell content: {}", cell);
        self.copy_to_clipboard(cell);
    }

    fn copy_row(&mut self) {
        let Some(record) = self.selected_record() else {
            return;
        };
        let row_content = record
            .iter()
            .map(|(_, v)| wrap_cell_content(&v.to_string()))
            .collect::<Vec<String>>()
            .join(",");
        self.copy_to_clipboard(row_content);
    }

    fn copy_to_clipboard(&mut self, text: String) {
        let result = match self.clipboard.as_mut() {
            Some(clipboard) => clipboard.set_text(text).map_err(|e| format!("{e}")),
            None => Err("clipboard unavailable".to_string()),
        };
        match result {
            Ok(_) => self.set_status_message("Copied to clipboard"),
            Err(e) => {
                debug!("Error copying to clipboard: {e}");
                self.set_status_message(format!("Could not copy: {e}"));
            }
        }
    }
}

fn describe_field(field: &DynamicField) -> String {
    let required = if field.required { ", required" } else { "" };
    let status = match field.check() {
        Ok(()) => String::new(),
        Err(e) => format!("  ⚠ {e}"),
    };
    format!(
        "  {} ({}{required}){status}",
        field.label,
        field.kind.type_name()
    )
}

/// Quotes a value for a csv line.
fn wrap_cell_content(c: &str) -> String {
    let needs_escaping = c.contains('"');
    let needs_wrapping = needs_escaping || c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
    let mut out = c.to_string();
    if needs_escaping {
        out = out.replace('"', "\"\"");
    }
    if needs_wrapping {
        out = format!("\"{out}\"");
    }
    out
}
