//! Page arithmetic for listings.

/// Page arithmetic for a listing of `total_items` rows shown `per_page` at a
/// time.
///
/// There is always at least one page, even for an empty listing.
///
/// ```
/// use bazaar_core::Paginator;
///
/// let paginator = Paginator::new(20, 9);
/// assert_eq!(paginator.num_pages(), 3);
/// assert_eq!(paginator.page(Some("2")).number, 2);
/// assert_eq!(paginator.page(Some("99")).number, 3);
/// assert_eq!(paginator.page(Some("abc")).number, 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    total_items: u64,
    per_page: u32,
}

/// One resolved page of a [`Paginator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// 1-based page number.
    pub number: u32,
    /// Total number of pages.
    pub num_pages: u32,
    /// Rows to skip.
    pub offset: u64,
    /// Rows to take.
    pub limit: u32,
}

impl Paginator {
    /// Create a paginator. A `per_page` of zero is treated as one.
    #[must_use]
    pub fn new(total_items: u64, per_page: u32) -> Self {
        Self {
            total_items,
            per_page: per_page.max(1),
        }
    }

    /// Total number of pages, never less than one.
    #[must_use]
    pub fn num_pages(&self) -> u32 {
        let pages = self.total_items.div_ceil(u64::from(self.per_page)).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    /// Resolve the raw `page` query value.
    ///
    /// A missing or non-integer value yields the first page; an integer
    /// outside `1..=num_pages` yields the last page.
    #[must_use]
    pub fn page(&self, raw: Option<&str>) -> PageWindow {
        let num_pages = self.num_pages();
        let number = match raw.map(str::trim).map(str::parse::<i64>) {
            None | Some(Err(_)) => 1,
            Some(Ok(n)) if n >= 1 && n <= i64::from(num_pages) => {
                u32::try_from(n).unwrap_or(num_pages)
            }
            Some(Ok(_)) => num_pages,
        };

        PageWindow {
            number,
            num_pages,
            offset: u64::from(number - 1) * u64::from(self.per_page),
            limit: self.per_page,
        }
    }
}

impl PageWindow {
    /// Whether a previous page exists.
    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.number > 1
    }

    /// Whether a next page exists.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    /// All page numbers, for rendering page links.
    pub fn numbers(&self) -> impl Iterator<Item = u32> {
        1..=self.num_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_listing_has_one_page() {
        let p = Paginator::new(0, 9);
        assert_eq!(p.num_pages(), 1);
        let page = p.page(None);
        assert_eq!(page.number, 1);
        assert_eq!(page.offset, 0);
        assert!(!page.has_previous());
        assert!(!page.has_next());
    }

    #[test]
    fn test_num_pages_rounds_up() {
        assert_eq!(Paginator::new(9, 9).num_pages(), 1);
        assert_eq!(Paginator::new(10, 9).num_pages(), 2);
        assert_eq!(Paginator::new(13, 6).num_pages(), 3);
    }

    #[test]
    fn test_non_integer_page_is_first() {
        let p = Paginator::new(30, 9);
        assert_eq!(p.page(Some("")).number, 1);
        assert_eq!(p.page(Some("two")).number, 1);
        assert_eq!(p.page(Some("1.5")).number, 1);
    }

    #[test]
    fn test_out_of_range_page_is_last() {
        let p = Paginator::new(30, 9);
        assert_eq!(p.page(Some("5")).number, 4);
        assert_eq!(p.page(Some("0")).number, 4);
        assert_eq!(p.page(Some("-3")).number, 4);
    }

    #[test]
    fn test_offset_and_limit() {
        let page = Paginator::new(30, 9).page(Some("3"));
        assert_eq!(page.offset, 18);
        assert_eq!(page.limit, 9);
        assert!(page.has_previous());
        assert!(page.has_next());
        assert_eq!(page.numbers().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    }
}
