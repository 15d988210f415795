//! # Pagination
//!
//! In-memory paging over list screens (products, customers, invoices).
//!
//! ```text
//! items ──► filter ──► sort ──► view ──► page N of M (page_size per page)
//! ```
//!
//! Pages are 1-based. Changing the data, filter or sort returns to page 1.

use std::cmp::Ordering;

/// Default rows per page.
pub const DEFAULT_PAGE_SIZE: usize = 15;

type FilterFn<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;
type SortFn<T> = Box<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// A filtered, sorted, paged view over a list.
pub struct Paginator<T> {
    items: Vec<T>,
    filter: Option<FilterFn<T>>,
    sort: Option<SortFn<T>>,
    view: Vec<usize>,
    current_page: usize,
    page_size: usize,
}

impl<T> Paginator<T> {
    pub fn new(items: Vec<T>) -> Self {
        let mut paginator = Paginator {
            items,
            filter: None,
            sort: None,
            view: Vec::new(),
            current_page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        };
        paginator.rebuild();
        paginator
    }

    /// Replaces the underlying data.
    pub fn set_data(&mut self, items: Vec<T>) {
        self.items = items;
        self.rebuild();
    }

    /// Keeps only items for which `filter` returns true.
    pub fn set_filter<F>(&mut self, filter: F)
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(filter));
        self.rebuild();
    }

    pub fn clear_filter(&mut self) {
        self.filter = None;
        self.rebuild();
    }

    /// Orders the filtered items. The sort is stable.
    pub fn set_sort<F>(&mut self, compare: F)
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        self.sort = Some(Box::new(compare));
        self.rebuild();
    }

    /// Sets rows per page (minimum 1) and returns to page 1.
    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        self.current_page = 1;
    }

    fn rebuild(&mut self) {
        let items = &self.items;
        let mut view: Vec<usize> = match &self.filter {
            Some(filter) => (0..items.len()).filter(|&i| filter(&items[i])).collect(),
            None => (0..items.len()).collect(),
        };
        if let Some(compare) = &self.sort {
            view.sort_by(|&a, &b| compare(&items[a], &items[b]));
        }
        self.view = view;
        self.current_page = 1;
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Items remaining after the filter.
    pub fn total_items(&self) -> usize {
        self.view.len()
    }

    /// Zero when there are no items.
    pub fn total_pages(&self) -> usize {
        self.view.len().div_ceil(self.page_size)
    }

    /// Items on the current page.
    pub fn page_items(&self) -> Vec<&T> {
        self.view
            .iter()
            .skip((self.current_page - 1) * self.page_size)
            .take(self.page_size)
            .map(|&i| &self.items[i])
            .collect()
    }

    /// Jumps to `page`; returns false (and stays put) when out of range.
    pub fn go_to_page(&mut self, page: usize) -> bool {
        if page < 1 || page > self.total_pages() {
            return false;
        }
        self.current_page = page;
        true
    }

    pub fn next_page(&mut self) -> bool {
        self.go_to_page(self.current_page + 1)
    }

    pub fn previous_page(&mut self) -> bool {
        self.current_page > 1 && self.go_to_page(self.current_page - 1)
    }

    pub fn first_page(&mut self) -> bool {
        self.go_to_page(1)
    }

    pub fn last_page(&mut self) -> bool {
        self.go_to_page(self.total_pages())
    }

    pub fn can_go_next(&self) -> bool {
        self.current_page < self.total_pages()
    }

    pub fn can_go_previous(&self) -> bool {
        self.current_page > 1
    }

    /// e.g. "Page 2 of 3 (42 items)".
    pub fn page_info(&self) -> String {
        format!(
            "Page {} of {} ({} items)",
            self.current_page,
            self.total_pages().max(1),
            self.total_items()
        )
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paging() {
        let mut pages = Paginator::new((1..=42).collect::<Vec<i32>>());
        assert_eq!(pages.total_pages(), 3);
        assert_eq!(pages.page_items().len(), 15);

        assert!(pages.last_page());
        assert_eq!(pages.page_items(), vec![&31, &32, &33, &34, &35, &36, &37, &38, &39, &40, &41, &42]);
        assert!(!pages.next_page());
        assert_eq!(pages.current_page(), 3);

        assert!(pages.previous_page());
        assert_eq!(pages.page_info(), "Page 2 of 3 (42 items)");
        assert!(!pages.go_to_page(0));
        assert!(!pages.go_to_page(4));
    }

    #[test]
    fn test_filter_and_sort_reset_to_first_page() {
        let mut pages = Paginator::new((1..=42).collect::<Vec<i32>>());
        pages.go_to_page(2);

        pages.set_filter(|n| n % 2 == 0);
        assert_eq!(pages.current_page(), 1);
        assert_eq!(pages.total_items(), 21);

        pages.set_sort(|a, b| b.cmp(a));
        assert_eq!(pages.page_items()[0], &42);

        pages.clear_filter();
        assert_eq!(pages.total_items(), 42);
        assert_eq!(pages.page_items()[0], &42);
    }

    #[test]
    fn test_empty() {
        let mut pages: Paginator<String> = Paginator::new(Vec::new());
        assert_eq!(pages.total_pages(), 0);
        assert!(pages.page_items().is_empty());
        assert!(!pages.first_page());
        assert!(!pages.can_go_previous());
        assert_eq!(pages.page_info(), "Page 1 of 1 (0 items)");
    }

    #[test]
    fn test_page_size() {
        let mut pages = Paginator::new(vec!['a', 'b', 'c']);
        pages.set_page_size(0);
        assert_eq!(pages.page_size(), 1);
        assert_eq!(pages.total_pages(), 3);
        assert!(pages.can_go_next());
    }
}
