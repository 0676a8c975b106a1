//! The admin list views and how each one configures the grid.

use std::collections::HashMap;

use clap::ValueEnum;

use crate::column::{Align, CellText, Column, Fixed, Tone};
use crate::fields::{self, DynamicField};
use crate::source::Record;
use crate::table::{DataTable, PaginationOptions, TableOptions};
use crate::value::{Row, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ViewKind {
    Assets,
    Blogs,
    Categories,
    Contacts,
}

impl ViewKind {
    pub fn title(&self) -> &'static str {
        match self {
            ViewKind::Assets => "Assets",
            ViewKind::Blogs => "Blog posts",
            ViewKind::Categories => "Categories",
            ViewKind::Contacts => "Contacts received",
        }
    }

    pub fn columns(&self, categories: &CategoryLookup) -> Vec<Column<Record>> {
        match self {
            ViewKind::Assets => asset_columns(categories.clone()),
            ViewKind::Blogs => blog_columns(),
            ViewKind::Categories => category_columns(),
            ViewKind::Contacts => contact_columns(),
        }
    }

    pub fn options(&self) -> TableOptions {
        let pagination = match self {
            ViewKind::Assets => PaginationOptions::default()
                .page_size(15)
                .show_size_changer(true)
                .page_size_options(vec![15, 25, 50, 100]),
            ViewKind::Blogs => PaginationOptions::default()
                .show_size_changer(true)
                .page_size_options(vec![10, 25, 50]),
            ViewKind::Categories | ViewKind::Contacts => PaginationOptions::default(),
        };
        let empty_text = match self {
            ViewKind::Assets => "No assets found",
            ViewKind::Blogs => "No blog posts yet",
            ViewKind::Categories => "No categories found",
            ViewKind::Contacts => "No contacts received",
        };
        TableOptions::default()
            .pagination(pagination)
            .searchable(true)
            .search_placeholder(format!("Search {}...", self.title().to_lowercase()))
            .empty_text(empty_text)
    }

    pub fn table(&self, categories: &CategoryLookup, options: TableOptions) -> DataTable<Record> {
        DataTable::new(self.columns(categories), options)
    }
}

/// Category id -> display label, used to resolve the category of an asset.
#[derive(Debug, Clone, Default)]
pub struct CategoryLookup {
    labels: HashMap<String, String>,
}

impl CategoryLookup {
    pub fn from_records(records: &[Record]) -> Self {
        let labels = records
            .iter()
            .filter_map(|r| {
                let id = r.id()?;
                let title = r.field("title");
                let label = match r.field("icon") {
                    icon if is_blank(&icon) => title.to_string(),
                    icon => format!("{icon} {title}"),
                };
                Some((id, label))
            })
            .collect();
        Self { labels }
    }

    pub fn label(&self, id: &Value) -> Option<&str> {
        self.labels.get(&id.to_string()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Text(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn or_fallback(value: &Value, fallback: &str) -> CellText {
    if is_blank(value) {
        CellText::new(fallback, Tone::Muted)
    } else {
        CellText::plain(value.to_string())
    }
}

fn yes_no(value: &Value) -> CellText {
    match value {
        Value::Bool(true) => CellText::new("✔ yes", Tone::Success),
        Value::Text(s) if s.eq_ignore_ascii_case("true") => CellText::new("✔ yes", Tone::Success),
        _ => CellText::new("✘ no", Tone::Muted),
    }
}

fn actions(label: &'static str) -> Column<Record> {
    Column::new("id", "Actions")
        .align(Align::Right)
        .fixed(Fixed::Right)
        .min_width(12)
        .render(move |_, _, _| CellText::new(label, Tone::Muted))
}

/// `$1,250,000`; up to two decimals are kept.
pub fn format_price(value: &Value) -> String {
    let amount = match value {
        Value::Number(n) => *n,
        Value::Text(s) => s.trim().parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    };
    if !amount.is_finite() {
        return "$—".to_string();
    }
    let sign = if amount < 0.0 { "-" } else { "" };
    let cents = (amount.abs() * 100.0).round() as u64;
    let (whole, fraction) = (cents / 100, cents % 100);

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    match fraction {
        0 => format!("{sign}${grouped}"),
        f if f % 10 == 0 => format!("{sign}${grouped}.{}", f / 10),
        f => format!("{sign}${grouped}.{f:02}"),
    }
}

fn status_badge(value: &Value) -> CellText {
    let status = value.to_string();
    let tone = match status.as_str() {
        "available" => Tone::Success,
        "sold" => Tone::Danger,
        "pending" => Tone::Warning,
        _ => Tone::Muted,
    };
    CellText::new(format!("● {status}"), tone)
}

fn asset_columns(categories: CategoryLookup) -> Vec<Column<Record>> {
    vec![
        Column::new("title", "Asset")
            .sortable(true)
            .fixed(Fixed::Left)
            .max_width(36)
            .ellipsis(true)
            .render(|value, row: &Record, _| match row.field("short_description") {
                short if is_blank(&short) => CellText::plain(value.to_string()),
                short => CellText::plain(format!("{value} · {short}")),
            }),
        Column::new("category_id", "Category")
            .sortable(true)
            .render(move |value, _, _| match categories.label(value) {
                Some(label) => CellText::new(label, Tone::Accent),
                None => CellText::new("Unknown", Tone::Muted),
            }),
        Column::new("price", "Price")
            .sortable(true)
            .align(Align::Right)
            .render(|value, _, _| CellText::plain(format_price(value))),
        Column::new("status", "Status")
            .sortable(true)
            .render(|value, _, _| status_badge(value)),
        Column::new("published", "Published")
            .sortable(true)
            .align(Align::Center)
            .render(|value, _, _| yes_no(value)),
        Column::new("location", "Location").ellipsis(true).max_width(24),
        actions("edit · delete"),
    ]
}

fn blog_columns() -> Vec<Column<Record>> {
    vec![
        Column::new("title", "Title")
            .sortable(true)
            .ellipsis(true)
            .max_width(40)
            .render(|value, row: &Record, _| match row.field("excerpt") {
                excerpt if is_blank(&excerpt) => CellText::plain(value.to_string()),
                excerpt => CellText::plain(format!("{value} · {excerpt}")),
            }),
        Column::new("category", "Category")
            .sortable(true)
            .render(|value, _, _| CellText::new(value.to_string(), Tone::Accent)),
        Column::new("date", "Date")
            .sortable(true)
            .render(|value, _, _| CellText::new(value.to_string(), Tone::Muted)),
        Column::new("readTime", "Read time").render(|value, _, _| or_fallback(value, "N/A")),
        Column::new("published", "Status")
            .sortable(true)
            .render(|value, _, _| match value {
                Value::Bool(true) => CellText::new("Published", Tone::Success),
                _ => CellText::new("Draft", Tone::Warning),
            }),
        actions("edit · delete"),
    ]
}

fn category_columns() -> Vec<Column<Record>> {
    vec![
        Column::new("title", "Category")
            .sortable(true)
            .render(|value, row: &Record, _| {
                let icon = row.field("icon");
                let slug = row.field("slug");
                let mut text = if is_blank(&icon) {
                    value.to_string()
                } else {
                    format!("{icon} {value}")
                };
                if !is_blank(&slug) {
                    text.push_str(&format!(" /{slug}"));
                }
                CellText::plain(text)
            }),
        Column::new("description", "Description")
            .ellipsis(true)
            .max_width(40)
            .render(|value, _, _| or_fallback(value, "No description")),
        Column::new("dynamic_fields", "Custom fields").render(|value, _, _| {
            match value {
                Value::Text(json) => match DynamicField::parse_list(json) {
                    Ok(list) => CellText::plain(fields::summarize(&list)),
                    Err(_) => CellText::new("invalid field list", Tone::Danger),
                },
                _ => CellText::new("No fields", Tone::Muted),
            }
        }),
        Column::new("is_active", "Active")
            .sortable(true)
            .align(Align::Center)
            .render(|value, _, _| match value {
                Value::Bool(false) => CellText::new("Inactive", Tone::Muted),
                _ => CellText::new("Active", Tone::Success),
            }),
        Column::new("display_order", "Order")
            .sortable(true)
            .align(Align::Right),
        actions("edit · delete"),
    ]
}

fn contact_columns() -> Vec<Column<Record>> {
    vec![
        Column::new("submitted_by", "Submitted by")
            .sortable(true)
            .render(|_, row: &Record, _| {
                let name = row.field("name");
                let email = row.field("email");
                match (is_blank(&name), is_blank(&email)) {
                    (false, false) => CellText::plain(format!("{name} <{email}>")),
                    (false, true) => CellText::plain(name.to_string()),
                    (true, false) => CellText::plain(email.to_string()),
                    (true, true) => CellText::new("Anonymous", Tone::Muted),
                }
            }),
        Column::new("message", "Message")
            .ellipsis(true)
            .min_width(30)
            .max_width(50)
            .render(|value, _, _| or_fallback(value, "No description")),
        Column::new("phone_number", "Phone Number").render(|value, _, _| or_fallback(value, "Not added")),
        Column::new("location", "Location")
            .sortable(true)
            .align(Align::Center)
            .render(|value, _, _| or_fallback(value, "Not added")),
        actions("delete"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Value::from(1250000), "$1,250,000")]
    #[case(Value::from(999), "$999")]
    #[case(Value::from(1234.5), "$1,234.5")]
    #[case(Value::from(0.25), "$0.25")]
    #[case(Value::from(-4200), "-$4,200")]
    #[case(Value::from("350000"), "$350,000")]
    #[case(Value::Null, "$—")]
    fn prices_are_grouped(#[case] value: Value, #[case] expected: &str) {
        assert_eq!(format_price(&value), expected);
    }

    #[test]
    fn category_lookup_resolves_asset_category() {
        let categories = vec![
            Record::from_pairs([("id", Value::from("c1")), ("title", Value::from("Farms")), ("icon", Value::from("🌾"))]),
            Record::from_pairs([("id", Value::from("c2")), ("title", Value::from("Units"))]),
        ];
        let lookup = CategoryLookup::from_records(&categories);
        assert_eq!(lookup.len(), 2);

        let columns = ViewKind::Assets.columns(&lookup);
        let category = columns.iter().find(|c| c.key == "category_id").expect("column");
        let asset = Record::from_pairs([("category_id", Value::from("c1"))]);
        assert_eq!(category.cell(&asset, 0).1, CellText::new("🌾 Farms", Tone::Accent));
        let orphan = Record::from_pairs([("category_id", Value::from("zz"))]);
        assert_eq!(category.cell(&orphan, 0).1.text, "Unknown");
    }

    #[test]
    fn contact_fallbacks() {
        let columns = ViewKind::Contacts.columns(&CategoryLookup::default());
        let row = Record::from_pairs([
            ("name", Value::from("Ada")),
            ("email", Value::from("ada@example.com")),
            ("phone_number", Value::from("")),
        ]);
        let texts: Vec<String> = columns.iter().map(|c| c.cell(&row, 0).1.text).collect();
        assert_eq!(texts[0], "Ada <ada@example.com>");
        assert_eq!(texts[1], "No description");
        assert_eq!(texts[2], "Not added");
        assert_eq!(texts[3], "Not added");
    }

    #[test]
    fn category_fields_are_summarised() {
        let columns = ViewKind::Categories.columns(&CategoryLookup::default());
        let fields = columns.iter().find(|c| c.key == "dynamic_fields").expect("column");
        let row = Record::from_pairs([(
            "dynamic_fields",
            Value::from(r#"[{"name":"beds","label":"Beds","type":"number"},{"name":"pool","label":"Pool","type":"checkbox"}]"#),
        )]);
        assert_eq!(fields.cell(&row, 0).1.text, "2 fields: number, checkbox");
        let broken = Record::from_pairs([("dynamic_fields", Value::from("{oops"))]);
        assert_eq!(fields.cell(&broken, 0).1.tone, Tone::Danger);
    }

    #[rstest]
    #[case(ViewKind::Assets, 15, true)]
    #[case(ViewKind::Blogs, 10, true)]
    #[case(ViewKind::Categories, 10, false)]
    #[case(ViewKind::Contacts, 10, false)]
    fn view_pagination_defaults(#[case] kind: ViewKind, #[case] size: usize, #[case] changer: bool) {
        let options = kind.options();
        assert!(options.searchable);
        assert_eq!(options.pagination.page_size, size);
        assert_eq!(options.pagination.show_size_changer, changer);
    }

    #[test]
    fn asset_columns_pin_title_and_actions() {
        let table = ViewKind::Assets.table(&CategoryLookup::default(), ViewKind::Assets.options());
        assert_eq!(table.layout().left.len(), 1);
        assert_eq!(table.layout().right.len(), 1);
    }
}
