//! Field-level validation with accumulated per-field failures.
//!
//! A [`Validator`] collects check failures into a field → message map and is
//! consumed at the handler boundary: a non-empty map becomes a 422 response
//! listing every failing field. Only the first failure recorded for a field
//! is kept, so check ordering doubles as message priority.

use std::collections::HashMap;

use crate::error::{AppError, AppResult};

/// Maximum page number accepted by list endpoints.
pub const MAX_PAGE: i64 = 10_000_000;

/// Maximum page size accepted by list endpoints.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Minimum password length for user registration.
pub const MIN_PASSWORD_BYTES: usize = 8;

/// Maximum password length for user registration.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Accumulates validation failures keyed by field name.
#[derive(Debug, Default)]
pub struct Validator {
    errors: HashMap<String, String>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` under `field` when `ok` is false.
    ///
    /// The first failure recorded for a field wins; later failures for the
    /// same field are ignored.
    pub fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok && !self.errors.contains_key(field) {
            self.errors.insert(field.to_string(), message.to_string());
        }
    }

    /// True iff no field has a recorded failure.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Consume the validator, returning `Ok(())` when valid and a
    /// `ValidationFailed` error carrying the field map otherwise.
    pub fn finish(self) -> AppResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::ValidationFailed(self.errors))
        }
    }

    /// Access the recorded failures (used by tests and error shaping).
    pub fn errors(&self) -> &HashMap<String, String> {
        &self.errors
    }
}

/// Validate an email address. Deliberately loose: presence of a single `@`
/// with non-empty local and domain parts; real verification happens via the
/// activation token round-trip.
pub fn permitted_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && domain.contains('.') && !email.contains(' ')
        }
        None => false,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validator_is_valid() {
        let v = Validator::new();
        assert!(v.is_valid());
        assert!(v.finish().is_ok());
    }

    #[test]
    fn test_failing_check_records_message() {
        let mut v = Validator::new();
        v.check(false, "title", "title must be provided");
        assert!(!v.is_valid());
        assert_eq!(
            v.errors().get("title").map(String::as_str),
            Some("title must be provided")
        );
    }

    #[test]
    fn test_passing_check_records_nothing() {
        let mut v = Validator::new();
        v.check(true, "title", "title must be provided");
        assert!(v.is_valid());
    }

    #[test]
    fn test_first_failure_per_field_wins() {
        let mut v = Validator::new();
        v.check(false, "year", "year must be provided");
        v.check(false, "year", "year must be greater than 1900");
        assert_eq!(
            v.errors().get("year").map(String::as_str),
            Some("year must be provided")
        );
        assert_eq!(v.errors().len(), 1);
    }

    #[test]
    fn test_failures_accumulate_across_fields() {
        let mut v = Validator::new();
        v.check(false, "title", "title must be provided");
        v.check(false, "studio", "studio must be provided");
        assert_eq!(v.errors().len(), 2);
    }

    #[test]
    fn test_finish_returns_validation_failed() {
        let mut v = Validator::new();
        v.check(false, "rating", "the minimum rating limit has been reached");
        let err = v.finish().unwrap_err();
        match err {
            AppError::ValidationFailed(map) => {
                assert!(map.contains_key("rating"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_permitted_email() {
        assert!(permitted_email("alice@example.com"));
        assert!(!permitted_email("alice"));
        assert!(!permitted_email("@example.com"));
        assert!(!permitted_email("alice@"));
        assert!(!permitted_email("alice@localhost"));
        assert!(!permitted_email("alice smith@example.com"));
    }
}
