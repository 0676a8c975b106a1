//! Derivation stages of the grid: filter, sort and paginate.
//!
//! Every stage is a pure function of its inputs and works on indices into the
//! row slice, so the source rows are never moved or mutated.

use std::ops::RangeInclusive;

use crate::column::Column;
use crate::value::Row;

/// Maximum number of page buttons shown at once.
pub const PAGE_WINDOW: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortState {
    pub key: String,
    pub direction: SortDirection,
}

impl SortState {
    pub fn asc(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            direction: SortDirection::Desc,
        }
    }

    /// Next state after activating the header of `key`: none -> asc -> desc -> none.
    /// Activating another column starts it at asc.
    pub fn cycle(current: Option<&SortState>, key: &str) -> Option<SortState> {
        match current {
            Some(state) if state.key == key => match state.direction {
                SortDirection::Asc => Some(SortState::desc(key)),
                SortDirection::Desc => None,
            },
            _ => Some(SortState::asc(key)),
        }
    }
}

/// Stage 2. Returns the indices of matching rows in input order.
pub trait FilterStage<R> {
    fn filter(&self, rows: &[R], columns: &[Column<R>], query: &str) -> Vec<usize>;
}

/// Stage 3. Reorders the indices handed over by the filter stage.
pub trait SortStage<R> {
    fn sort(&self, rows: &[R], indices: Vec<usize>, sort: Option<&SortState>) -> Vec<usize>;
}

/// Case-insensitive substring match against every declared column.
#[derive(Debug, Default, Clone, Copy)]
pub struct SubstringFilter;

impl<R: Row> FilterStage<R> for SubstringFilter {
    fn filter(&self, rows: &[R], columns: &[Column<R>], query: &str) -> Vec<usize> {
        if query.is_empty() {
            return (0..rows.len()).collect();
        }
        let term = query.to_lowercase();
        rows.iter()
            .enumerate()
            .filter(|(_, row)| {
                columns.iter().any(|column| {
                    row.field(&column.key)
                        .search_text()
                        .is_some_and(|text| text.contains(&term))
                })
            })
            .map(|(idx, _)| idx)
            .collect()
    }
}

/// Stable sort on a single key with nulls last.
#[derive(Debug, Default, Clone, Copy)]
pub struct StableSort;

impl<R: Row> SortStage<R> for StableSort {
    fn sort(&self, rows: &[R], indices: Vec<usize>, sort: Option<&SortState>) -> Vec<usize> {
        let Some(sort) = sort else {
            return indices;
        };
        let descending = sort.direction == SortDirection::Desc;

        // Resolve every key once, then sort the (index, key) pairs
        let mut keyed: Vec<_> = indices
            .into_iter()
            .map(|idx| (idx, rows[idx].field(&sort.key)))
            .collect();
        keyed.sort_by(|(_, a), (_, b)| a.cmp_nulls_last(b, descending));
        keyed.into_iter().map(|(idx, _)| idx).collect()
    }
}

/// `max(1, ceil(count / page_size))`
pub fn total_pages(count: usize, page_size: usize) -> usize {
    count.div_ceil(page_size.max(1)).max(1)
}

pub fn clamp_page(page: usize, total_pages: usize) -> usize {
    page.clamp(1, total_pages.max(1))
}

/// Slice of `items` shown on the 1-based `page`. Out of range pages yield an empty slice.
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    let size = page_size.max(1);
    let start = page.saturating_sub(1).saturating_mul(size).min(items.len());
    let end = start.saturating_add(size).min(items.len());
    &items[start..end]
}

/// Page numbers to show as buttons. Always contains `current` and, once there are
/// at least [`PAGE_WINDOW`] pages, exactly that many entries.
pub fn page_window(current: usize, total_pages: usize) -> RangeInclusive<usize> {
    let total = total_pages.max(1);
    let current = clamp_page(current, total);
    if total <= PAGE_WINDOW {
        1..=total
    } else if current <= 3 {
        1..=PAGE_WINDOW
    } else if current >= total - 2 {
        total - (PAGE_WINDOW - 1)..=total
    } else {
        current - 2..=current + 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Record;
    use crate::value::Value;
    use rstest::rstest;

    fn named(names: &[Option<&str>]) -> Vec<Record> {
        names
            .iter()
            .map(|n| Record::from_pairs([("name", Value::from(*n))]))
            .collect()
    }

    fn columns() -> Vec<Column<Record>> {
        vec![Column::new("name", "Name").sortable(true)]
    }

    #[test]
    fn empty_query_is_identity() {
        let rows = named(&[Some("b"), None, Some("a")]);
        assert_eq!(SubstringFilter.filter(&rows, &columns(), ""), vec![0, 1, 2]);
    }

    #[test]
    fn filter_is_case_insensitive_and_skips_nulls() {
        let rows = named(&[Some("Harbour View"), None, Some("Hillside"), Some("VIEWPOINT")]);
        assert_eq!(SubstringFilter.filter(&rows, &columns(), "view"), vec![0, 3]);
        assert!(SubstringFilter.filter(&rows, &columns(), "zz").is_empty());
    }

    #[test]
    fn filter_matches_numbers_and_any_column() {
        let rows = vec![
            Record::from_pairs([("title", Value::from("Loft")), ("price", Value::from(1500000))]),
            Record::from_pairs([("title", Value::from("Barn")), ("price", Value::from(320))]),
        ];
        let cols: Vec<Column<Record>> = vec![Column::new("title", "Title"), Column::new("price", "Price")];
        assert_eq!(SubstringFilter.filter(&rows, &cols, "500"), vec![0]);
        assert_eq!(SubstringFilter.filter(&rows, &cols, "ARN"), vec![1]);
    }

    #[test]
    fn sort_places_nulls_last() {
        let rows = named(&[Some("B"), Some("A"), None]);
        let asc = StableSort.sort(&rows, vec![0, 1, 2], Some(&SortState::asc("name")));
        assert_eq!(asc, vec![1, 0, 2]);
        let desc = StableSort.sort(&rows, vec![0, 1, 2], Some(&SortState::desc("name")));
        assert_eq!(desc, vec![0, 1, 2]);
    }

    #[test]
    fn sort_without_state_passes_through() {
        let rows = named(&[Some("B"), Some("A")]);
        assert_eq!(StableSort.sort(&rows, vec![1, 0], None), vec![1, 0]);
    }

    #[test]
    fn sort_is_stable_for_equal_keys() {
        let rows = named(&[Some("x"), Some("a"), Some("x"), Some("a")]);
        let sorted = StableSort.sort(&rows, vec![0, 1, 2, 3], Some(&SortState::asc("name")));
        assert_eq!(sorted, vec![1, 3, 0, 2]);
        let again = StableSort.sort(&rows, sorted.clone(), Some(&SortState::asc("name")));
        assert_eq!(again, sorted);
    }

    #[test]
    fn sort_state_cycles() {
        let first = SortState::cycle(None, "price");
        assert_eq!(first, Some(SortState::asc("price")));
        let second = SortState::cycle(first.as_ref(), "price");
        assert_eq!(second, Some(SortState::desc("price")));
        assert_eq!(SortState::cycle(second.as_ref(), "price"), None);
        assert_eq!(
            SortState::cycle(second.as_ref(), "title"),
            Some(SortState::asc("title"))
        );
    }

    #[rstest]
    #[case(0, 10, 1)]
    #[case(12, 10, 2)]
    #[case(10, 10, 1)]
    #[case(11, 5, 3)]
    #[case(3, 0, 3)]
    fn total_pages_is_floored_to_one(#[case] count: usize, #[case] size: usize, #[case] expected: usize) {
        assert_eq!(total_pages(count, size), expected);
    }

    #[test]
    fn paginate_twelve_rows() {
        let rows: Vec<usize> = (1..=12).collect();
        assert_eq!(paginate(&rows, 1, 10), &rows[0..10]);
        assert_eq!(paginate(&rows, 2, 10), &[11, 12]);
        assert!(paginate(&rows, 3, 10).is_empty());
        assert_eq!(paginate(&rows, 0, 10), &rows[0..10]);
    }

    #[rstest]
    #[case(1, 3, vec![1, 2, 3])]
    #[case(2, 5, vec![1, 2, 3, 4, 5])]
    #[case(3, 20, vec![1, 2, 3, 4, 5])]
    #[case(4, 20, vec![2, 3, 4, 5, 6])]
    #[case(10, 20, vec![8, 9, 10, 11, 12])]
    #[case(18, 20, vec![16, 17, 18, 19, 20])]
    #[case(20, 20, vec![16, 17, 18, 19, 20])]
    #[case(1, 1, vec![1])]
    fn page_window_slides(#[case] current: usize, #[case] total: usize, #[case] expected: Vec<usize>) {
        assert_eq!(page_window(current, total).collect::<Vec<_>>(), expected);
    }
}
