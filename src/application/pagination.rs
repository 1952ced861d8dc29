//! Page-number pagination over in-memory listings.

use serde::Serialize;

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    /// Page 0 and a missing page both mean the first page; `per_page` is at
    /// least 1.
    pub fn new(page: Option<u32>, per_page: u32) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.max(1),
        }
    }

    fn offset(&self) -> usize {
        (self.page as usize - 1).saturating_mul(self.per_page as usize)
    }
}

/// One page of a listing with the totals of the whole listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total_items: u32,
    /// Never below 1, even for an empty listing.
    pub total_pages: u32,
}

impl<T> Paginated<T> {
    /// Slice `items` (already filtered and ordered) to the requested page. A
    /// page past the end yields no items but keeps the real totals.
    pub fn from_items(items: Vec<T>, request: PageRequest) -> Self {
        let total_items = items.len() as u32;
        let total_pages = total_items.div_ceil(request.per_page).max(1);

        let page_items = items
            .into_iter()
            .skip(request.offset())
            .take(request.per_page as usize)
            .collect();

        Self {
            items: page_items,
            page: request.page,
            per_page: request.per_page,
            total_items,
            total_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total_items: self.total_items,
            total_pages: self.total_pages,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}
