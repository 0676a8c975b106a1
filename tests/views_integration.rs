use std::path::PathBuf;

use asset_grid::column::Tone;
use asset_grid::render::{Body, TableFrame};
use asset_grid::source::{FileSource, Record, RowSource};
use asset_grid::table::DataTable;
use asset_grid::value::{Row, Value};
use asset_grid::views::{CategoryLookup, ViewKind};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn categories() -> CategoryLookup {
    let rows = FileSource::open(fixture("categories.json"))
        .and_then(|mut s| s.fetch_rows())
        .expect("categories fixture");
    CategoryLookup::from_records(&rows)
}

fn view(kind: ViewKind, file: &str) -> (FileSource, DataTable<Record>) {
    let mut source = FileSource::open(fixture(file)).expect("fixture exists");
    let rows = source.fetch_rows().expect("fixture loads");
    let table = kind.table(&categories(), kind.options()).with_rows(rows);
    (source, table)
}

fn cells(table: &DataTable<Record>) -> Vec<Vec<String>> {
    let TableFrame::Grid(grid) = TableFrame::build(table) else {
        panic!("table is loading");
    };
    match grid.body {
        Body::Rows(rows) => rows
            .into_iter()
            .map(|r| r.cells.into_iter().map(|c| c.content.text).collect())
            .collect(),
        Body::Placeholder(text) => vec![vec![text]],
    }
}

fn ids(table: &DataTable<Record>) -> Vec<String> {
    table
        .page_rows()
        .iter()
        .map(|r| r.field("id").to_string())
        .collect()
}

#[test]
fn assets_first_page() {
    let (_, table) = view(ViewKind::Assets, "assets.csv");
    assert_eq!(table.rows().len(), 18);
    assert_eq!(table.page_size(), 15);
    assert_eq!(table.total_pages(), 2);

    let first = &cells(&table)[0];
    assert_eq!(
        first,
        &vec![
            "Harbour Loft · Two bedroom loft",
            "🏠 Residential",
            "$1,250,000",
            "● available",
            "✔ yes",
            "Wellington",
            "edit · delete",
        ]
    );

    let TableFrame::Grid(grid) = TableFrame::build(&table) else {
        panic!("table is loading");
    };
    let footer = grid.footer.expect("pagination footer");
    assert_eq!(footer.summary, "Showing 1 to 15 of 18 results");
    assert_eq!(footer.size_options, Some(vec![15, 25, 50, 100]));
    assert!(grid.regions.has_fixed());
}

#[test]
fn unknown_category_is_muted() {
    let (mut source, _) = view(ViewKind::Assets, "assets.csv");
    let rows = source.fetch_rows().expect("rows");
    let table = ViewKind::Assets
        .table(&CategoryLookup::default(), ViewKind::Assets.options())
        .with_rows(rows);
    let column = &table.columns()[1];
    let (_, text) = column.cell(&table.rows()[0], 0);
    assert_eq!(text.text, "Unknown");
    assert_eq!(text.tone, Tone::Muted);
}

#[test]
fn price_sort_keeps_missing_prices_last() {
    let (_, mut table) = view(ViewKind::Assets, "assets.csv");
    assert!(table.toggle_sort("price"));
    assert_eq!(ids(&table)[..3], ["a16", "a5", "a15"]);
    assert!(table.toggle_sort("price"));
    assert_eq!(ids(&table)[..3], ["a14", "a17", "a9"]);

    table.next_page();
    assert_eq!(ids(&table).last().map(String::as_str), Some("a4"));
    assert_eq!(cells(&table).last().map(|r| r[2].as_str()), Some("$—"));

    // location is not sortable
    assert!(!table.toggle_sort("location"));
}

#[test]
fn search_spans_rendered_columns() {
    let (_, mut table) = view(ViewKind::Assets, "assets.csv");
    table.next_page();
    table.search("LOFT");
    assert_eq!(table.current_page(), 1);
    assert_eq!(ids(&table), ["a1", "a8"]);

    table.search("auckland");
    assert_eq!(ids(&table), ["a3", "a17"]);

    table.search("nothing like this");
    assert_eq!(cells(&table), vec![vec!["No assets found".to_string()]]);
}

#[test]
fn deleting_rows_reclamps() {
    let (mut source, mut table) = view(ViewKind::Assets, "assets.csv");
    table.go_to_page(2);
    for id in ["a18", "a17", "a16"] {
        source.delete_row(id).expect("row exists");
        table.set_rows(source.fetch_rows().expect("rows"));
    }
    assert_eq!(table.rows().len(), 15);
    assert_eq!(table.total_pages(), 1);
    assert_eq!(table.current_page(), 1);
    assert!(source.delete_row("a18").is_err());
}

#[test]
fn categories_summarize_custom_fields() {
    let (_, table) = view(ViewKind::Categories, "categories.json");
    let rows = cells(&table);
    assert_eq!(rows[0][0], "🏠 Residential /residential");
    assert_eq!(rows[0][2], "2 fields: number, checkbox");
    assert_eq!(rows[0][4], "1");
    assert_eq!(rows[1][0], "Rural /rural");
    assert_eq!(rows[1][2], "No fields");
    assert_eq!(rows[2][1], "No description");
    assert_eq!(rows[2][3], "Inactive");
    assert_eq!(table.rows()[2].field("icon"), Value::Null);
}

#[test]
fn contacts_fall_back_for_blank_fields() {
    let (_, table) = view(ViewKind::Contacts, "contacts.json");
    let rows = cells(&table);
    assert_eq!(rows[0][0], "Aroha <aroha@example.com>");
    assert_eq!(
        rows[1],
        vec!["ben@example.com", "No description", "Not added", "Not added", "delete"]
    );
    let TableFrame::Grid(grid) = TableFrame::build(&table) else {
        panic!("table is loading");
    };
    assert!(grid.footer.is_some_and(|f| f.size_options.is_none()));
}
