//! Pagination and sorting parameters for list endpoints.
//!
//! Sort keys are allow-listed: any key not on the safelist is rejected at
//! validation time and again at SQL-construction time, so a caller-supplied
//! string can never reach the query text unchecked.

use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::validation::{MAX_PAGE, MAX_PAGE_SIZE, Validator};

/// Caller-supplied list parameters after query-string parsing.
#[derive(Debug, Clone)]
pub struct Filters {
    pub page: i64,
    pub page_size: i64,
    pub sort: String,
    pub sort_safelist: &'static [&'static str],
}

/// Allow-listed sort keys for the manga collection. A leading `-` requests
/// descending order.
pub const MANGA_SORT_SAFELIST: &[&str] = &[
    "id", "title", "year", "chapters", "rating", "-id", "-title", "-year", "-chapters", "-rating",
];

impl Filters {
    pub fn validate(&self, v: &mut Validator) {
        v.check(self.page > 0, "page", "must be greater than zero");
        v.check(
            self.page <= MAX_PAGE,
            "page",
            "must be a maximum of 10 million",
        );
        v.check(self.page_size > 0, "page_size", "must be greater than zero");
        v.check(
            self.page_size <= MAX_PAGE_SIZE,
            "page_size",
            "must be a maximum of 100",
        );
        v.check(
            self.sort_safelist.contains(&self.sort.as_str()),
            "sort",
            "invalid sort value",
        );
    }

    /// The bare column name for ORDER BY, checked against the safelist.
    ///
    /// Validation already rejects unknown keys; this re-check keeps the
    /// allow-list enforcement at the SQL boundary as well.
    pub fn sort_column(&self) -> AppResult<&str> {
        if self.sort_safelist.contains(&self.sort.as_str()) {
            Ok(self.sort.trim_start_matches('-'))
        } else {
            Err(AppError::BadRequest(format!(
                "unsafe sort parameter: {}",
                self.sort
            )))
        }
    }

    /// "ASC" or "DESC" depending on the `-` prefix.
    pub fn sort_direction(&self) -> &'static str {
        if self.sort.starts_with('-') { "DESC" } else { "ASC" }
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }
}

/// Pagination metadata returned alongside list results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub current_page: i64,
    pub page_size: i64,
    pub first_page: i64,
    pub last_page: i64,
    pub total_records: i64,
}

impl Metadata {
    /// Compute the page window for `total_records` matches. An empty result
    /// set yields the zero-valued metadata.
    pub fn calculate(total_records: i64, page: i64, page_size: i64) -> Self {
        if total_records == 0 {
            return Self::default();
        }

        Self {
            current_page: page,
            page_size,
            first_page: 1,
            last_page: (total_records + page_size - 1) / page_size,
            total_records,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn filters(page: i64, page_size: i64, sort: &str) -> Filters {
        Filters {
            page,
            page_size,
            sort: sort.to_string(),
            sort_safelist: MANGA_SORT_SAFELIST,
        }
    }

    #[test]
    fn test_valid_filters() {
        let mut v = Validator::new();
        filters(1, 20, "id").validate(&mut v);
        assert!(v.is_valid());
    }

    #[test]
    fn test_zero_page_rejected() {
        let mut v = Validator::new();
        filters(0, 20, "id").validate(&mut v);
        assert!(v.errors().contains_key("page"));
    }

    #[test]
    fn test_oversized_page_size_rejected() {
        let mut v = Validator::new();
        filters(1, 101, "id").validate(&mut v);
        assert!(v.errors().contains_key("page_size"));
    }

    #[test]
    fn test_unknown_sort_key_rejected() {
        let mut v = Validator::new();
        filters(1, 20, "password; DROP TABLE mangas").validate(&mut v);
        assert!(v.errors().contains_key("sort"));
    }

    #[test]
    fn test_sort_column_strips_direction_prefix() {
        assert_eq!(filters(1, 20, "-year").sort_column().unwrap(), "year");
        assert_eq!(filters(1, 20, "title").sort_column().unwrap(), "title");
    }

    #[test]
    fn test_sort_column_rejects_unsafe_value() {
        assert!(filters(1, 20, "sneaky").sort_column().is_err());
    }

    #[test]
    fn test_sort_direction() {
        assert_eq!(filters(1, 20, "-rating").sort_direction(), "DESC");
        assert_eq!(filters(1, 20, "rating").sort_direction(), "ASC");
    }

    #[test]
    fn test_offset() {
        assert_eq!(filters(1, 20, "id").offset(), 0);
        assert_eq!(filters(3, 20, "id").offset(), 40);
    }

    #[test]
    fn test_metadata_empty() {
        assert_eq!(Metadata::calculate(0, 1, 20), Metadata::default());
    }

    #[test]
    fn test_metadata_last_page_rounds_up() {
        let meta = Metadata::calculate(41, 2, 20);
        assert_eq!(meta.current_page, 2);
        assert_eq!(meta.first_page, 1);
        assert_eq!(meta.last_page, 3);
        assert_eq!(meta.total_records, 41);
    }

    #[test]
    fn test_metadata_exact_multiple() {
        let meta = Metadata::calculate(40, 1, 20);
        assert_eq!(meta.last_page, 2);
    }
}
