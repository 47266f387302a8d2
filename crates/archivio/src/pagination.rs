//! Pagination windows and link building.
//!
//! The window is a pure function of two integers: past 6 total pages the
//! full page list collapses to the first page, an ellipsis-truncated
//! neighborhood of the current page, and the last page.

use serde::Serialize;

use crate::params::{RequestParams, build_param_name};

/// Page count above which the window is truncated with ellipses.
pub const WINDOW_LIMIT: usize = 6;

/// One entry of a pagination window.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PageItem {
    Page {
        number: u32,
        current: bool,
        href: String,
    },
    /// Ellipsis marker between non-adjacent pages.
    Dots,
}

impl PageItem {
    /// Page number, `None` for an ellipsis.
    pub fn number(&self) -> Option<u32> {
        match self {
            PageItem::Page { number, .. } => Some(*number),
            PageItem::Dots => None,
        }
    }
}

/// First/last/previous/next links for the current window.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PaginationLinks {
    pub first: String,
    pub last: String,
    pub previous: String,
    pub next: String,
}

/// Builds page URLs for one block instance.
///
/// A page URL is the current path plus the current query with only this
/// instance's page parameter replaced; everything else, other block
/// instances' parameters included, passes through untouched. Page 1 drops
/// the parameter instead of writing `...-paged=1`.
pub struct PageUrlBuilder<'a> {
    path: &'a str,
    params: &'a RequestParams,
    paged_key: String,
}

impl<'a> PageUrlBuilder<'a> {
    pub fn new(path: &'a str, params: &'a RequestParams, instance_id: &str) -> Self {
        Self {
            path,
            params,
            paged_key: build_param_name("paged", instance_id),
        }
    }

    pub fn page_url(&self, page: u32) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in self.params.raw_pairs() {
            if key != &self.paged_key {
                serializer.append_pair(key, value);
            }
        }
        if page > 1 {
            serializer.append_pair(&self.paged_key, &page.to_string());
        }

        let query = serializer.finish();
        if query.is_empty() {
            self.path.to_string()
        } else {
            format!("{}?{query}", self.path)
        }
    }
}

/// Build the (possibly truncated) window for a page count.
///
/// `total_pages == 0` yields an empty window. Out-of-range current pages
/// clamp into `1..=total_pages`.
pub fn build_window(total_pages: u32, current_page: u32, urls: &PageUrlBuilder<'_>) -> Vec<PageItem> {
    if total_pages == 0 {
        return Vec::new();
    }
    let current = current_page.clamp(1, total_pages);

    let pages: Vec<PageItem> = (1..=total_pages)
        .map(|number| PageItem::Page {
            number,
            current: number == current,
            href: urls.page_url(number),
        })
        .collect();

    if pages.len() <= WINDOW_LIMIT {
        return pages;
    }

    let total = total_pages as usize;
    let current = current as usize;
    let mut window = Vec::new();

    if current > 3 {
        window.push(pages[0].clone());
        window.push(PageItem::Dots);
        if current < total - 2 {
            // Mid-range: a 3-entry neighborhood of the current page.
            window.extend_from_slice(&pages[current - 2..=current]);
            window.push(PageItem::Dots);
            window.push(pages[total - 1].clone());
        } else {
            // Near the end: the final 3-4 pages, one extra when the current
            // page sits just before the tail.
            let start = total - if current == total - 2 { 4 } else { 3 };
            window.extend(pages[start..].iter().take(4).cloned());
        }
    } else {
        // Near the start: leading run, then straight to the last page.
        let lead = if current > 2 { 4 } else { 3 };
        window.extend_from_slice(&pages[..lead]);
        window.push(PageItem::Dots);
        window.push(pages[total - 1].clone());
    }

    window
}

/// First/last/previous/next links, clamped to the valid page range.
pub fn build_links(total_pages: u32, current_page: u32, urls: &PageUrlBuilder<'_>) -> PaginationLinks {
    let last = total_pages.max(1);
    let current = current_page.clamp(1, last);
    PaginationLinks {
        first: urls.page_url(1),
        last: urls.page_url(last),
        previous: urls.page_url(current.saturating_sub(1).max(1)),
        next: urls.page_url(current.saturating_add(1).min(last)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls<'a>(params: &'a RequestParams) -> PageUrlBuilder<'a> {
        PageUrlBuilder::new("/news", params, "1")
    }

    fn numbers(window: &[PageItem]) -> Vec<Option<u32>> {
        window.iter().map(PageItem::number).collect()
    }

    #[test]
    fn small_page_counts_list_every_page() {
        let params = RequestParams::from_query("");
        let window = build_window(3, 2, &urls(&params));

        assert_eq!(numbers(&window), vec![Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn six_pages_is_the_last_untruncated_count() {
        let params = RequestParams::from_query("");
        let window = build_window(6, 1, &urls(&params));
        assert_eq!(window.len(), 6);
        assert!(window.iter().all(|item| item.number().is_some()));
    }

    #[test]
    fn first_page_of_ten() {
        let params = RequestParams::from_query("");
        let window = build_window(10, 1, &urls(&params));

        assert_eq!(
            numbers(&window),
            vec![Some(1), Some(2), Some(3), None, Some(10)]
        );

        let mut seen: Vec<u32> = window.iter().filter_map(PageItem::number).collect();
        seen.dedup();
        assert_eq!(seen.len(), 4, "no duplicate page numbers");
    }

    #[test]
    fn third_page_widens_the_leading_run() {
        let params = RequestParams::from_query("");
        let window = build_window(10, 3, &urls(&params));

        assert_eq!(
            numbers(&window),
            vec![Some(1), Some(2), Some(3), Some(4), None, Some(10)]
        );
    }

    #[test]
    fn middle_page_is_windowed_on_both_sides() {
        let params = RequestParams::from_query("");
        let window = build_window(10, 5, &urls(&params));

        assert_eq!(
            numbers(&window),
            vec![Some(1), None, Some(4), Some(5), Some(6), None, Some(10)]
        );
        assert!(matches!(
            window[3],
            PageItem::Page { current: true, number: 5, .. }
        ));
    }

    #[test]
    fn near_end_shows_the_tail() {
        let params = RequestParams::from_query("");

        let at_minus_two = build_window(10, 8, &urls(&params));
        assert_eq!(
            numbers(&at_minus_two),
            vec![Some(1), None, Some(7), Some(8), Some(9), Some(10)]
        );

        let at_minus_one = build_window(10, 9, &urls(&params));
        assert_eq!(
            numbers(&at_minus_one),
            vec![Some(1), None, Some(8), Some(9), Some(10)]
        );

        let at_end = build_window(10, 10, &urls(&params));
        assert_eq!(
            numbers(&at_end),
            vec![Some(1), None, Some(8), Some(9), Some(10)]
        );
    }

    #[test]
    fn zero_pages_yields_an_empty_window() {
        let params = RequestParams::from_query("");
        assert!(build_window(0, 1, &urls(&params)).is_empty());
    }

    #[test]
    fn out_of_range_current_page_clamps() {
        let params = RequestParams::from_query("");
        let window = build_window(10, 99, &urls(&params));

        assert_eq!(
            numbers(&window),
            vec![Some(1), None, Some(8), Some(9), Some(10)]
        );
    }

    #[test]
    fn page_urls_replace_only_the_own_paged_parameter() {
        let params =
            RequestParams::from_query("archivio-1-paged=2&archivio-2-paged=5&q=term");
        let urls = urls(&params);

        let href = urls.page_url(3);
        assert!(href.starts_with("/news?"));
        assert!(href.contains("archivio-1-paged=3"));
        assert!(href.contains("archivio-2-paged=5"), "other instances kept");
        assert!(href.contains("q=term"));
        assert!(!href.contains("archivio-1-paged=2"));
    }

    #[test]
    fn page_one_drops_the_parameter() {
        let params = RequestParams::from_query("archivio-1-paged=4");
        let href = urls(&params).page_url(1);
        assert_eq!(href, "/news");
    }

    #[test]
    fn links_clamp_at_both_ends() {
        let params = RequestParams::from_query("");
        let urls = urls(&params);

        let at_start = build_links(10, 1, &urls);
        assert_eq!(at_start.previous, "/news");
        assert_eq!(at_start.next, "/news?archivio-1-paged=2");

        let at_end = build_links(10, 10, &urls);
        assert_eq!(at_end.next, "/news?archivio-1-paged=10");
        assert_eq!(at_end.previous, "/news?archivio-1-paged=9");
        assert_eq!(at_end.first, "/news");
        assert_eq!(at_end.last, "/news?archivio-1-paged=10");
    }
}
