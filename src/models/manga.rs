use chrono::{Datelike, Utc};
use serde::Serialize;

use crate::validation::Validator;

/// A manga record as stored and served.
///
/// `id` is assigned by the store and immutable afterwards. `version` starts
/// at 1 on creation and is incremented by exactly 1 on every successful
/// mutation; it is the optimistic-concurrency fence for updates.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Manga {
    pub id: i64,
    pub title: String,
    pub studio: String,
    pub year: i32,
    pub chapters: i32,
    pub rating: f64,
    pub version: i32,
}

/// Business validation rules for a manga record.
///
/// Runs every check so the caller gets all failing fields at once; the
/// validator keeps only the first message per field.
pub fn validate_manga(v: &mut Validator, manga: &Manga) {
    v.check(!manga.title.is_empty(), "title", "title must be provided");
    v.check(
        manga.title.len() <= 500,
        "title",
        "title must not be more than 500 bytes long",
    );

    v.check(!manga.studio.is_empty(), "studio", "studio must be provided");
    v.check(
        manga.studio.len() <= 200,
        "studio",
        "studio must not be more than 200 bytes long",
    );

    v.check(manga.year != 0, "year", "year must be provided");
    v.check(manga.year >= 1900, "year", "year must be greater than 1900");
    v.check(
        manga.year <= Utc::now().year(),
        "year",
        "year must not be in the future",
    );

    v.check(manga.chapters != 0, "chapters", "must be at least 1 chapter");
    v.check(
        manga.chapters < 2000,
        "chapters",
        "the maximum chapter limit has been reached",
    );

    v.check(
        manga.rating >= 1.0,
        "rating",
        "the minimum rating limit has been reached",
    );
    v.check(
        manga.rating <= 5.0,
        "rating",
        "the maximum rating limit has been reached",
    );
}
