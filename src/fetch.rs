//! Simulated remote list loading for autocomplete fields.

use crate::value::ListItem;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Delay applied by [`SimulatedFetch::fetch`] unless overridden.
pub const DEFAULT_FETCH_DELAY: Duration = Duration::from_millis(1000);

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchPage {
    pub values: Vec<ListItem>,
    pub has_more: bool,
}

/// Paged, case-insensitive search over a static list, answered after a
/// fixed delay. No cancellation, retry or backpressure.
#[derive(Debug, Clone)]
pub struct SimulatedFetch {
    values: Arc<[ListItem]>,
    page_size: usize,
    delay: Duration,
}

impl SimulatedFetch {
    /// `page_size` 0 returns every match in one page.
    pub fn new(values: Vec<ListItem>, page_size: usize) -> Self {
        Self {
            values: values.into(),
            page_size,
            delay: DEFAULT_FETCH_DELAY,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Every list value, unfiltered.
    pub fn all(&self) -> &[ListItem] {
        &self.values
    }

    /// Compute the page for `search` starting at `offset`, without waiting.
    pub fn search(&self, search: Option<&str>, offset: usize) -> FetchPage {
        let needle = search.map(str::to_uppercase);
        let filtered: Vec<&ListItem> = self
            .values
            .iter()
            .filter(|item| match &needle {
                Some(n) => {
                    item.title.to_uppercase().contains(n.as_str())
                        || item.value.to_uppercase().contains(n.as_str())
                }
                None => true,
            })
            .collect();

        if self.page_size == 0 {
            return FetchPage {
                values: filtered.into_iter().cloned().collect(),
                has_more: false,
            };
        }

        let values: Vec<ListItem> = filtered
            .iter()
            .skip(offset)
            .take(self.page_size)
            .map(|item| (*item).clone())
            .collect();
        let has_more = offset + values.len() < filtered.len();

        FetchPage { values, has_more }
    }

    /// Asynchronously fetch a page after the configured delay.
    pub async fn fetch(&self, search: Option<&str>, offset: usize) -> FetchPage {
        let page = self.search(search, offset);
        debug!(
            search = search.unwrap_or(""),
            offset,
            returned = page.values.len(),
            has_more = page.has_more,
            "simulated list fetch"
        );
        tokio::time::sleep(self.delay).await;
        page
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letters() -> SimulatedFetch {
        let items = ["A", "AA", "AAA1", "AAA2", "B", "C"]
            .iter()
            .map(|t| ListItem::new(t.to_lowercase(), *t))
            .collect();
        SimulatedFetch::new(items, 3).with_delay(Duration::ZERO)
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let page = letters().search(Some("aa"), 0);
        let titles: Vec<&str> = page.values.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["AA", "AAA1", "AAA2"]);
        assert!(!page.has_more);
    }

    #[test]
    fn test_paging() {
        let fetch = letters();
        let first = fetch.search(None, 0);
        assert_eq!(first.values.len(), 3);
        assert!(first.has_more);

        let second = fetch.search(None, 3);
        assert_eq!(second.values[0].title, "AAA2");
        assert!(!second.has_more);

        let past_end = fetch.search(None, 10);
        assert!(past_end.values.is_empty());
        assert!(!past_end.has_more);
    }

    #[test]
    fn test_zero_page_size_returns_everything() {
        let fetch = letters().with_page_size(0);
        let page = fetch.search(Some("a"), 2);
        assert_eq!(page.values.len(), 4);
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn test_fetch_matches_search() {
        let fetch = letters();
        let page = fetch.fetch(Some("b"), 0).await;
        assert_eq!(page, fetch.search(Some("b"), 0));
    }
}
