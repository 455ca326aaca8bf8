use crate::models::Record;

/// User-selectable page sizes, as offered by the dashboard dropdown.
pub const PAGE_SIZES: &[usize] = &[5, 10, 25, 50, 100];
pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

/// Inputs to the view pipeline. Mutating methods encode the dashboard's
/// interaction rules: changing the search text or page size resets to page 1,
/// clicking the active sort header toggles direction, clicking a new header
/// switches key and resets to ascending.
#[derive(Debug, Clone)]
pub struct ListQuery {
    pub search: String,
    pub sort_key: Option<String>,
    pub sort_dir: SortDir,
    pub page: usize,
    pub page_size: usize,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            sort_key: None,
            sort_dir: SortDir::Asc,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ListQuery {
    pub fn set_search(&mut self, search: &str) {
        self.search = search.to_string();
        self.page = 1;
    }

    /// Accepts only the fixed page-size menu.
    pub fn set_page_size(&mut self, size: usize) -> bool {
        if !PAGE_SIZES.contains(&size) {
            return false;
        }
        self.page_size = size;
        self.page = 1;
        true
    }

    pub fn click_header(&mut self, key: &str) {
        if self.sort_key.as_deref() == Some(key) {
            self.sort_dir = match self.sort_dir {
                SortDir::Asc => SortDir::Desc,
                SortDir::Desc => SortDir::Asc,
            };
        } else {
            self.sort_key = Some(key.to_string());
            self.sort_dir = SortDir::Asc;
        }
    }

    /// No-op at the first page.
    pub fn prev(&mut self) {
        if self.page > 1 {
            self.page -= 1;
        }
    }

    /// No-op at the last page.
    pub fn next(&mut self, total_pages: usize) {
        if self.page < total_pages {
            self.page += 1;
        }
    }
}

/// One rendered page plus the pagination metadata shown in the table footer.
#[derive(Debug)]
pub struct PageView<R> {
    pub records: Vec<R>,
    pub total_count: usize,
    pub total_pages: usize,
    /// 1-indexed position of the first record shown, 0 when the page is empty.
    pub first_index: usize,
    pub last_index: usize,
}

/// Filter and sort without pagination. Export works on this full set so it
/// covers every record matching the active search, across all pages.
pub fn filter_sort<R: Record>(records: &[R], query: &ListQuery) -> Vec<R> {
    let needle = query.search.to_lowercase();
    let mut matched: Vec<R> = records
        .iter()
        .filter(|record| {
            needle.is_empty()
                || record
                    .search_fields()
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect();

    if let Some(key) = &query.sort_key {
        // Stable sort on a copy; records without a value for the key keep
        // their relative order ahead of those with one.
        matched.sort_by(|a, b| {
            let ordering = a.sort_value(key).cmp(&b.sort_value(key));
            match query.sort_dir {
                SortDir::Asc => ordering,
                SortDir::Desc => ordering.reverse(),
            }
        });
    }

    matched
}

pub fn view<R: Record>(records: &[R], query: &ListQuery) -> PageView<R> {
    let matched = filter_sort(records, query);
    let total_count = matched.len();
    let total_pages = total_count.div_ceil(query.page_size).max(1);
    let page = query.page.clamp(1, total_pages);

    let start = (page - 1) * query.page_size;
    let end = (start + query.page_size).min(total_count);
    let page_records: Vec<R> = if start < total_count {
        matched[start..end].to_vec()
    } else {
        Vec::new()
    };

    let (first_index, last_index) = if page_records.is_empty() {
        (0, 0)
    } else {
        (start + 1, end)
    };

    PageView {
        records: page_records,
        total_count,
        total_pages,
        first_index,
        last_index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Circular, Contact};
    use serde_json::json;

    fn circular(id: i64, no: &str, subject: &str) -> Circular {
        Circular::from_raw(
            (id - 1) as usize,
            &json!({"id": id, "circular_number": no, "subject": subject, "date": "2024-01-01"}),
        )
    }

    fn sample() -> Vec<Circular> {
        vec![
            circular(1, "C-10", "Holiday schedule"),
            circular(2, "C-11", "Audit notice"),
            circular(3, "C-12", "holiday party"),
            circular(4, "C-13", "Budget review"),
        ]
    }

    #[test]
    fn test_filter_is_case_insensitive_substring() {
        let records = sample();
        let mut query = ListQuery::default();
        query.set_search("HOLIDAY");
        let matched = filter_sort(&records, &query);
        assert_eq!(matched.len(), 2);
        for record in &matched {
            assert!(record.subject.to_lowercase().contains("holiday"));
        }
    }

    #[test]
    fn test_numeric_fields_match_as_text() {
        let records = vec![circular(1, "42", "Plain")];
        let mut query = ListQuery::default();
        query.set_search("42");
        assert_eq!(filter_sort(&records, &query).len(), 1);
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let records = sample();
        let query = ListQuery::default();
        assert_eq!(filter_sort(&records, &query).len(), records.len());
    }

    #[test]
    fn test_pagination_metadata() {
        let records = sample();
        let mut query = ListQuery::default();
        assert!(query.set_page_size(5));
        let page = view(&records, &query);
        assert_eq!(page.total_count, 4);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.first_index, 1);
        assert_eq!(page.last_index, 4);
        assert_eq!(page.records.len(), 4);
    }

    #[test]
    fn test_total_pages_is_at_least_one_when_empty() {
        let records: Vec<Circular> = Vec::new();
        let query = ListQuery::default();
        let page = view(&records, &query);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.first_index, 0);
        assert_eq!(page.last_index, 0);
        assert!(page.records.is_empty());
    }

    #[test]
    fn test_last_page_is_the_remainder() {
        let records: Vec<Circular> = (1..=12)
            .map(|i| circular(i, &format!("C-{i}"), "subject"))
            .collect();
        let mut query = ListQuery::default();
        assert!(query.set_page_size(5));
        query.page = 3;
        let page = view(&records, &query);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.first_index, 11);
        assert_eq!(page.last_index, 12);
    }

    #[test]
    fn test_sort_is_idempotent() {
        let records = sample();
        let mut query = ListQuery::default();
        query.click_header("subject");
        let once = filter_sort(&records, &query);
        let twice = filter_sort(&once, &query);
        let ids: Vec<i64> = once.iter().map(|r| r.id).collect();
        let ids_again: Vec<i64> = twice.iter().map(|r| r.id).collect();
        assert_eq!(ids, ids_again);
    }

    #[test]
    fn test_input_list_is_never_mutated() {
        let records = sample();
        let before: Vec<i64> = records.iter().map(|r| r.id).collect();
        let mut query = ListQuery::default();
        query.click_header("subject");
        query.sort_dir = SortDir::Desc;
        let _ = view(&records, &query);
        let after: Vec<i64> = records.iter().map(|r| r.id).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_header_click_toggles_and_resets() {
        let mut query = ListQuery::default();
        query.click_header("subject");
        assert_eq!(query.sort_key.as_deref(), Some("subject"));
        assert_eq!(query.sort_dir, SortDir::Asc);
        query.click_header("subject");
        assert_eq!(query.sort_dir, SortDir::Desc);
        // Switching headers resets the direction.
        query.click_header("date");
        assert_eq!(query.sort_key.as_deref(), Some("date"));
        assert_eq!(query.sort_dir, SortDir::Asc);
    }

    #[test]
    fn test_search_and_page_size_reset_page() {
        let mut query = ListQuery::default();
        query.page = 4;
        query.set_search("x");
        assert_eq!(query.page, 1);
        query.page = 4;
        assert!(query.set_page_size(25));
        assert_eq!(query.page, 1);
        assert!(!query.set_page_size(7));
    }

    #[test]
    fn test_prev_next_clamp_at_boundaries() {
        let mut query = ListQuery::default();
        query.prev();
        assert_eq!(query.page, 1);
        query.next(3);
        assert_eq!(query.page, 2);
        query.next(3);
        query.next(3);
        assert_eq!(query.page, 3);
    }

    #[test]
    fn test_contacts_sort_ignores_case() {
        let contacts: Vec<Contact> = [
            json!({"id": 1, "name": "anita", "department": "Ops"}),
            json!({"id": 2, "name": "Bharat", "department": "IT"}),
            json!({"id": 3, "name": "Anil", "department": "HR"}),
        ]
        .iter()
        .enumerate()
        .map(|(i, raw)| Contact::from_raw(i, raw))
        .collect();

        let mut query = ListQuery::default();
        query.click_header("name");
        let sorted = filter_sort(&contacts, &query);
        let names: Vec<&str> = sorted.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Anil", "anita", "Bharat"]);
    }

    #[test]
    fn test_grievance_slice_lands_on_first_page() {
        let payload = json!({
            "status": 200,
            "grievances": [
                {"id": 1, "subject": "Water leak", "status": "Pending",
                 "posted_by": "J. Doe", "created_at": "2024-03-01"}
            ]
        });
        let records: Vec<crate::models::Grievance> =
            crate::normalize::normalize(&payload).into_records();
        let query = ListQuery::default();
        let page = view(&records, &query);
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].title, "Water leak");
        assert_eq!(page.first_index, 1);
        assert_eq!(page.last_index, 1);
    }
}
