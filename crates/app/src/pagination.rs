//! Pagination

/// Largest page a caller may request.
pub const MAX_PER_PAGE: u32 = 100;

/// Default page size.
pub const DEFAULT_PER_PAGE: u32 = 20;

/// A one-based page request, clamped to sane bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    per_page: u32,
}

impl PageRequest {
    #[must_use]
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, MAX_PER_PAGE),
        }
    }

    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub const fn per_page(&self) -> u32 {
        self.per_page
    }

    #[must_use]
    pub fn offset(&self) -> u64 {
        (u64::from(self.page) - 1) * u64::from(self.per_page)
    }

    /// Slice an in-memory result set.
    #[must_use]
    pub fn apply<T>(&self, items: Vec<T>) -> Page<T> {
        let total = u64::try_from(items.len()).unwrap_or(u64::MAX);
        let offset = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(self.per_page).unwrap_or(usize::MAX);

        Page {
            items: items
                .into_iter()
                .skip(offset)
                .take(limit)
                .collect(),
            total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PER_PAGE)
    }
}

/// One page of results plus the total across all pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_out_of_range_requests() {
        let request = PageRequest::new(0, 1_000);

        assert_eq!(request.page(), 1);
        assert_eq!(request.per_page(), MAX_PER_PAGE);
    }

    #[test]
    fn applies_offset_and_limit() {
        let page = PageRequest::new(2, 2).apply(vec![1, 2, 3, 4, 5]);

        assert_eq!(page.items, vec![3, 4]);
        assert_eq!(page.total, 5);
    }
}
