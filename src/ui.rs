use ratatui::{
    Frame,
    buffer::Buffer,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span},
    widgets::{Block, Clear, Paragraph, Widget},
};
use tracing::trace;

use crate::column::{Align, Tone};
use crate::domain::GridConfig;
use crate::model::{Model, Popup, UIData};
use crate::render::{self, Body, BodyRow, Footer, GridFrame, Placed, Regions, TableFrame};

pub const SEARCH_BAR_HEIGHT: usize = 1;
pub const STATUSLINE_HEIGHT: usize = 1;
pub const FOOTER_HEIGHT: usize = 1;
/// Header line plus the rule below it
pub const TABLE_HEADER_HEIGHT: usize = 2;
pub const BORDER_WIDTH: usize = 1;

const STRIPE_COLOR: Color = Color::Indexed(236);
const SELECTED_COLOR: Color = Color::Indexed(24);

#[derive(Debug)]
pub struct TableUI {
    max_column_width: usize,
}

impl TableUI {
    pub fn new(cfg: &GridConfig) -> Self {
        Self {
            max_column_width: cfg.max_column_width,
        }
    }

    pub fn draw(&self, model: &Model, frame: &mut Frame) {
        let data = model.ui_data();
        trace!("Draw {} with {} placed columns", data.name, data.placed.len());

        let search_height = if data.searchable { SEARCH_BAR_HEIGHT } else { 0 };
        let [search_area, table_area, footer_area, status_area] = Layout::vertical([
            Constraint::Length(search_height as u16),
            Constraint::Min(0),
            Constraint::Length(FOOTER_HEIGHT as u16),
            Constraint::Length(STATUSLINE_HEIGHT as u16),
        ])
        .areas(frame.area());

        if data.searchable {
            self.draw_search(&data, frame, search_area);
        }

        let block = Block::bordered()
            .title(Line::from(format!(" {} ", data.name).bold()))
            .border_set(border::ROUNDED);
        let inner = block.inner(table_area);
        frame.render_widget(block, table_area);

        match &data.frame {
            TableFrame::Loading => {
                let [middle] = Layout::vertical([Constraint::Length(1)])
                    .flex(Flex::Center)
                    .areas(inner);
                frame.render_widget(
                    Paragraph::new("⠿ Loading ...".dark_gray()).centered(),
                    middle,
                );
            }
            TableFrame::Grid(grid) => {
                self.draw_grid(&data, grid, frame.buffer_mut(), inner);
                if let Some(footer) = &grid.footer {
                    frame.render_widget(footer_line(footer), footer_area);
                }
            }
        }

        let status = match &data.tooltip {
            Some(full) => Line::from(full.clone().italic()),
            None => Line::from(data.status_message.clone()),
        };
        frame.render_widget(
            Paragraph::new(status).style(Style::new().fg(Color::Gray)),
            status_area,
        );
        frame.render_widget(
            Paragraph::new("? help ".dark_gray()).right_aligned(),
            status_area,
        );

        if let Some(popup) = &data.popup {
            draw_popup(popup, frame);
        }
    }

    fn draw_search(&self, data: &UIData, frame: &mut Frame, area: Rect) {
        let prompt = " / ".blue().bold();
        let line = if data.input_mode.is_some() {
            let input = &data.cmdinput;
            frame.set_cursor_position((cursor_x(area, input.cursor), area.y));
            Line::from(vec![prompt, Span::raw(input.input.clone())])
        } else if data.query.is_empty() {
            Line::from(vec![prompt, data.search_placeholder.clone().dark_gray()])
        } else {
            Line::from(vec![prompt, data.query.clone().yellow()])
        };
        frame.render_widget(Paragraph::new(line), area);
    }

    fn draw_grid(&self, data: &UIData, grid: &GridFrame, buf: &mut Buffer, area: Rect) {
        if area.height == 0 || area.width == 0 {
            return;
        }
        let widths = render::column_widths(grid, self.max_column_width);
        let positions = column_positions(&data.placed, grid.regions, area);
        let mut y = area.y;

        if grid.sticky_header || data.row_offset == 0 {
            for (placed, x) in &positions {
                let head = &grid.header[placed.column];
                let mut style = Style::new().bold();
                if placed.column == data.selected_column {
                    style = style.add_modifier(Modifier::UNDERLINED).fg(Color::Cyan);
                }
                let label = cell_text(&head.label(), placed, &widths, head.ellipsis, head.align);
                buf.set_stringn(*x, y, label, usize::from(placed.width), style);
                separator(buf, grid, *x, y, placed.width, area);
            }
            y += 1;
            if y < area.bottom() {
                buf.set_stringn(area.x, y, "─".repeat(area.width.into()), area.width.into(), Style::new().dark_gray());
            }
            y += 1;
        }

        let rows = match &grid.body {
            Body::Placeholder(text) => {
                if y < area.bottom() {
                    let rest = Rect::new(area.x, y, area.width, area.bottom() - y);
                    Paragraph::new(text.clone().dark_gray().italic())
                        .centered()
                        .render(rest, buf);
                }
                return;
            }
            Body::Rows(rows) => rows,
        };

        let row_height: u16 = if grid.compact { 1 } else { 2 };
        for row in rows.iter().skip(data.row_offset).take(data.visible_rows) {
            if y >= area.bottom() {
                break;
            }
            let selected = grid.hoverable && row.page_index == data.selected_row;
            self.draw_row(row, grid, &positions, &widths, selected, data.selected_column, buf, area, y);
            y = y.saturating_add(row_height);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_row(
        &self,
        row: &BodyRow,
        grid: &GridFrame,
        positions: &[(Placed, u16)],
        widths: &[u16],
        selected: bool,
        selected_column: usize,
        buf: &mut Buffer,
        area: Rect,
        y: u16,
    ) {
        let background = if selected {
            Some(SELECTED_COLOR)
        } else if row.striped {
            Some(STRIPE_COLOR)
        } else {
            None
        };
        if let Some(bg) = background {
            buf.set_style(Rect::new(area.x, y, area.width, 1), Style::new().bg(bg));
        }
        for (placed, x) in positions {
            let cell = &row.cells[placed.column];
            let ellipsis = grid.header[placed.column].ellipsis;
            let text = cell_text(&cell.content.text, placed, widths, ellipsis, cell.align);
            let mut style = tone_style(cell.content.tone);
            if selected && placed.column == selected_column {
                style = style.add_modifier(Modifier::BOLD | Modifier::REVERSED);
            }
            buf.set_stringn(*x, y, text, usize::from(placed.width), style);
            separator(buf, grid, *x, y, placed.width, area);
        }
    }
}

// Screen column of the search cursor, behind the " / " prompt and inside `area`
fn cursor_x(area: Rect, cursor: usize) -> u16 {
    let offset = u16::try_from(cursor).unwrap_or(u16::MAX);
    area.x
        .saturating_add(3)
        .saturating_add(offset)
        .min(area.right().saturating_sub(1))
}

// Left and scrolling columns run from the left edge, pinned right columns hug the right edge
fn column_positions(placed: &[Placed], regions: Regions, area: Rect) -> Vec<(Placed, u16)> {
    let right_start = regions.left + regions.scroll;
    let right_width: u16 = placed
        .iter()
        .filter(|p| p.column >= right_start)
        .map(|p| p.width.saturating_add(1))
        .sum();
    let mut x = area.x;
    let mut rx = area.right().saturating_sub(right_width).max(area.x);
    placed
        .iter()
        .map(|p| {
            let cursor = if p.column >= right_start { &mut rx } else { &mut x };
            let at = *cursor;
            *cursor = cursor.saturating_add(p.width.saturating_add(1));
            (*p, at)
        })
        .collect()
}

fn separator(buf: &mut Buffer, grid: &GridFrame, x: u16, y: u16, width: u16, area: Rect) {
    let at = x.saturating_add(width);
    if grid.bordered && at < area.right() {
        buf.set_string(at, y, "│", Style::new().dark_gray());
    }
}

fn cell_text(text: &str, placed: &Placed, widths: &[u16], ellipsis: bool, align: Align) -> String {
    let width = usize::from(placed.width);
    // partially shown columns are clipped, ellipsis columns are marked
    let text = if ellipsis || placed.width < widths[placed.column] {
        render::truncate(text, width)
    } else {
        text.chars().take(width).collect()
    };
    align_text(&text, width, align)
}

fn align_text(text: &str, width: usize, align: Align) -> String {
    let pad = width.saturating_sub(render::text_width(text));
    match align {
        Align::Left => format!("{text}{}", " ".repeat(pad)),
        Align::Right => format!("{}{text}", " ".repeat(pad)),
        Align::Center => {
            let left = pad / 2;
            format!("{}{text}{}", " ".repeat(left), " ".repeat(pad - left))
        }
    }
}

fn tone_style(tone: Tone) -> Style {
    match tone {
        Tone::Plain => Style::new(),
        Tone::Muted => Style::new().fg(Color::DarkGray),
        Tone::Accent => Style::new().fg(Color::Blue),
        Tone::Success => Style::new().fg(Color::Green),
        Tone::Warning => Style::new().fg(Color::Yellow),
        Tone::Danger => Style::new().fg(Color::Red),
    }
}

fn footer_line(footer: &Footer) -> Line<'static> {
    let enabled = |on: bool| {
        if on {
            Style::new().fg(Color::Cyan)
        } else {
            Style::new().fg(Color::DarkGray)
        }
    };
    let mut spans = vec![Span::raw(format!(" {}", footer.summary))];
    if let Some(options) = &footer.size_options {
        spans.push(Span::raw("   Show: ").dark_gray());
        for size in options {
            if *size == footer.page_size {
                spans.push(Span::raw(format!("[{size}]")).bold());
            } else {
                spans.push(Span::raw(format!(" {size} ")).dark_gray());
            }
        }
    }
    spans.push(Span::raw("   "));
    spans.push(Span::styled("‹ Prev ", enabled(footer.prev_enabled)));
    for button in &footer.pages {
        if button.current {
            spans.push(Span::styled(
                format!("[{}]", button.number),
                Style::new().bold().fg(Color::Black).bg(Color::Cyan),
            ));
        } else {
            spans.push(Span::raw(format!(" {} ", button.number)));
        }
    }
    spans.push(Span::styled(" Next ›", enabled(footer.next_enabled)));
    Line::from(spans)
}

fn draw_popup(popup: &Popup, frame: &mut Frame) {
    let area = popup_area(frame.area(), 70, 70);
    let block = Block::bordered()
        .title(Line::from(popup.title.clone().bold()).centered())
        .title_bottom(Line::from(" Esc close ".dark_gray()).centered())
        .border_set(border::THICK);
    let lines: Vec<Line> = popup
        .lines
        .iter()
        .skip(popup.scroll)
        .map(|l| Line::from(l.clone()))
        .collect();
    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn popup_area(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let [area] = Layout::vertical([Constraint::Percentage(percent_y)])
        .flex(Flex::Center)
        .areas(area);
    let [area] = Layout::horizontal([Constraint::Percentage(percent_x)])
        .flex(Flex::Center)
        .areas(area);
    area
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("ab", 5, Align::Left, "ab   ")]
    #[case("ab", 5, Align::Right, "   ab")]
    #[case("ab", 5, Align::Center, " ab  ")]
    #[case("abcdef", 3, Align::Left, "abcdef")]
    fn aligns(#[case] text: &str, #[case] width: usize, #[case] align: Align, #[case] out: &str) {
        assert_eq!(align_text(text, width, align), out);
    }

    #[test]
    fn pinned_right_columns_hug_the_edge() {
        let placed = [
            Placed { column: 0, width: 10 },
            Placed { column: 1, width: 5 },
            Placed { column: 3, width: 6 },
        ];
        let regions = Regions {
            left: 1,
            scroll: 2,
            right: 1,
        };
        let positions = column_positions(&placed, regions, Rect::new(1, 1, 40, 10));
        let xs: Vec<u16> = positions.iter().map(|(_, x)| *x).collect();
        assert_eq!(xs, vec![1, 12, 34]);
    }

    #[test]
    fn search_cursor_stays_inside_the_line() {
        let area = Rect::new(2, 0, 20, 1);
        assert_eq!(cursor_x(area, 4), 9);
        assert_eq!(cursor_x(area, 70_000), 21);
    }

    #[test]
    fn clipped_column_gets_marker() {
        let placed = Placed { column: 0, width: 4 };
        assert_eq!(cell_text("abcdefgh", &placed, &[8], false, Align::Left), "abc…");
        assert_eq!(cell_text("abcd", &placed, &[4], false, Align::Right), "abcd");
    }
}
