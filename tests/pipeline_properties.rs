use std::cmp::Ordering;

use proptest::prelude::*;

use asset_grid::column::Column;
use asset_grid::pipeline::{
    self, FilterStage, PAGE_WINDOW, SortStage, SortState, StableSort, SubstringFilter,
};
use asset_grid::source::Record;
use asset_grid::value::{Row, Value};

fn columns() -> Vec<Column<Record>> {
    vec![Column::new("name", "Name"), Column::new("score", "Score")]
}

fn record(seq: usize, name: String, score: Option<i64>) -> Record {
    Record::from_pairs([
        ("seq", Value::from(seq as i64)),
        ("name", Value::from(name)),
        ("score", Value::from(score)),
    ])
}

fn any_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        Just(Value::from(f64::NAN)),
        (-5i64..5).prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        "[0-9a-bA-B]{0,3}".prop_map(Value::from),
    ]
}

fn rows() -> impl Strategy<Value = Vec<Record>> {
    prop::collection::vec(("[a-cA-C]{0,4}", prop::option::of(-3i64..3)), 0..40).prop_map(
        |items| {
            items
                .into_iter()
                .enumerate()
                .map(|(seq, (name, score))| record(seq, name, score))
                .collect()
        },
    )
}

proptest! {
    #[test]
    fn filtering_is_idempotent(rows in rows(), query in "[a-c]{0,2}") {
        let columns = columns();
        let once = SubstringFilter.filter(&rows, &columns, &query);
        let kept: Vec<Record> = once.iter().map(|&i| rows[i].clone()).collect();
        let twice = SubstringFilter.filter(&kept, &columns, &query);
        prop_assert_eq!(twice, (0..kept.len()).collect::<Vec<_>>());
    }

    #[test]
    fn longer_queries_narrow_results(rows in rows(), query in "[a-c]{0,2}", more in "[a-c]{1,2}") {
        let columns = columns();
        let wide = SubstringFilter.filter(&rows, &columns, &query);
        let narrow = SubstringFilter.filter(&rows, &columns, &format!("{query}{more}"));
        prop_assert!(narrow.iter().all(|i| wide.contains(i)));
    }

    #[test]
    fn sorting_is_stable_with_nulls_last(rows in rows(), descending in any::<bool>()) {
        let state = if descending { SortState::desc("score") } else { SortState::asc("score") };
        let sorted = StableSort.sort(&rows, (0..rows.len()).collect(), Some(&state));
        prop_assert_eq!(sorted.len(), rows.len());

        let scores: Vec<Value> = sorted.iter().map(|&i| rows[i].field("score")).collect();
        let first_null = scores.iter().position(Value::is_null).unwrap_or(scores.len());
        prop_assert!(scores[first_null..].iter().all(Value::is_null));

        for pair in sorted.windows(2) {
            let (a, b) = (rows[pair[0]].field("score"), rows[pair[1]].field("score"));
            if a == b {
                // equal keys keep their input order
                prop_assert!(pair[0] < pair[1]);
            } else if !a.is_null() && !b.is_null() {
                let (a, b) = (a.as_f64().unwrap_or_default(), b.as_f64().unwrap_or_default());
                let ordered = if descending { a > b } else { a < b };
                prop_assert!(ordered);
            }
        }
    }

    #[test]
    fn pages_cover_every_item_once(count in 0usize..120, size in 1usize..30) {
        let items: Vec<usize> = (0..count).collect();
        let total = pipeline::total_pages(count, size);
        prop_assert!(total >= 1);
        let joined: Vec<usize> = (1..=total)
            .flat_map(|page| pipeline::paginate(&items, page, size).to_vec())
            .collect();
        prop_assert_eq!(joined, items.clone());
        prop_assert!(pipeline::paginate(&items, total + 1, size).is_empty());
    }

    #[test]
    fn page_window_is_bounded(total in 1usize..60, current in 1usize..60) {
        let current = pipeline::clamp_page(current, total);
        let window: Vec<usize> = pipeline::page_window(current, total).collect();
        prop_assert!(window.contains(&current));
        prop_assert_eq!(window.len(), total.min(PAGE_WINDOW));
        prop_assert!(window.windows(2).all(|w| w[1] == w[0] + 1));
        prop_assert!(window.iter().all(|p| (1..=total).contains(p)));
    }

    #[test]
    fn comparator_is_transitive(a in any_value(), b in any_value(), c in any_value(), descending in any::<bool>()) {
        let le = |x: &Value, y: &Value| x.cmp_nulls_last(y, descending) != Ordering::Greater;
        if le(&a, &b) && le(&b, &c) {
            prop_assert!(le(&a, &c));
        }
        prop_assert_eq!(a.cmp_nulls_last(&b, descending), b.cmp_nulls_last(&a, descending).reverse());
    }

    #[test]
    fn mixed_columns_sort_with_nulls_last(values in prop::collection::vec(any_value(), 0..60), descending in any::<bool>()) {
        let rows: Vec<Record> = values
            .into_iter()
            .map(|v| Record::from_pairs([("mixed", v)]))
            .collect();
        let state = if descending { SortState::desc("mixed") } else { SortState::asc("mixed") };
        let sorted = StableSort.sort(&rows, (0..rows.len()).collect(), Some(&state));
        prop_assert_eq!(sorted.len(), rows.len());
        let nulls: Vec<bool> = sorted.iter().map(|&i| rows[i].field("mixed").is_null()).collect();
        let first_null = nulls.iter().position(|&n| n).unwrap_or(nulls.len());
        prop_assert!(nulls[first_null..].iter().all(|&n| n));
    }
}
