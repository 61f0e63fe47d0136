//! Manga table operations with optimistic concurrency on update.

use sqlx::Row;
use tracing::debug;

use super::Db;
use crate::error::{AppError, AppResult};
use crate::models::{Filters, Manga, Metadata};

#[derive(Clone)]
pub struct MangaStore {
    db: Db,
}

impl MangaStore {
    pub(super) fn new(db: Db) -> Self {
        Self { db }
    }

    /// Insert a new record. The store assigns the id and sets `version = 1`
    /// atomically with persistence.
    pub async fn insert(&self, manga: &Manga) -> AppResult<Manga> {
        let inserted = self
            .db
            .bounded(
                sqlx::query_as::<_, Manga>(
                    "INSERT INTO mangas (title, studio, year, chapters, rating)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     RETURNING id, title, studio, year, chapters, rating, version",
                )
                .bind(&manga.title)
                .bind(&manga.studio)
                .bind(manga.year)
                .bind(manga.chapters)
                .bind(manga.rating)
                .fetch_one(self.db.pool()),
            )
            .await?;

        debug!(id = inserted.id, "Manga inserted");
        Ok(inserted)
    }

    pub async fn get(&self, id: i64) -> AppResult<Manga> {
        if id < 1 {
            return Err(AppError::NotFound);
        }

        self.db
            .bounded(
                sqlx::query_as::<_, Manga>(
                    "SELECT id, title, studio, year, chapters, rating, version
                     FROM mangas WHERE id = ?1",
                )
                .bind(id)
                .fetch_optional(self.db.pool()),
            )
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Apply a mutation only if the stored row still carries the observed
    /// version; on success the version advances by exactly 1.
    ///
    /// The check-and-write is a single conditional statement so two racing
    /// updates from the same observed version admit at most one winner. Zero
    /// matched rows means the record was concurrently modified or deleted.
    pub async fn update(&self, manga: &Manga) -> AppResult<i32> {
        let row = self
            .db
            .bounded(
                sqlx::query(
                    "UPDATE mangas
                     SET title = ?1, studio = ?2, year = ?3, chapters = ?4, rating = ?5,
                         version = version + 1
                     WHERE id = ?6 AND version = ?7
                     RETURNING version",
                )
                .bind(&manga.title)
                .bind(&manga.studio)
                .bind(manga.year)
                .bind(manga.chapters)
                .bind(manga.rating)
                .bind(manga.id)
                .bind(manga.version)
                .fetch_optional(self.db.pool()),
            )
            .await?;

        match row {
            Some(row) => {
                let version: i32 = row.try_get("version")?;
                debug!(id = manga.id, version, "Manga updated");
                Ok(version)
            }
            None => Err(AppError::EditConflict),
        }
    }

    /// Remove a record unconditionally (no version check; last delete wins).
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        if id < 1 {
            return Err(AppError::NotFound);
        }

        let result = self
            .db
            .bounded(
                sqlx::query("DELETE FROM mangas WHERE id = ?1")
                    .bind(id)
                    .execute(self.db.pool()),
            )
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }

        debug!(id, "Manga deleted");
        Ok(())
    }

    /// List records matching the optional title filter, sorted by an
    /// allow-listed key, with pagination metadata from a window count.
    ///
    /// The sort column is interpolated only after the safelist check in
    /// [`Filters::sort_column`]; everything else is a bound parameter.
    pub async fn list(&self, title: &str, filters: &Filters) -> AppResult<(Vec<Manga>, Metadata)> {
        let query = format!(
            "SELECT COUNT(*) OVER() AS total_records,
                    id, title, studio, year, chapters, rating, version
             FROM mangas
             WHERE (?1 = '' OR title LIKE '%' || ?1 || '%')
             ORDER BY {} {}, id ASC
             LIMIT ?2 OFFSET ?3",
            filters.sort_column()?,
            filters.sort_direction(),
        );

        let rows = self
            .db
            .bounded(
                sqlx::query(&query)
                    .bind(title)
                    .bind(filters.limit())
                    .bind(filters.offset())
                    .fetch_all(self.db.pool()),
            )
            .await?;

        let mut total_records = 0i64;
        let mut mangas = Vec::with_capacity(rows.len());
        for row in rows {
            total_records = row.try_get("total_records")?;
            mangas.push(Manga {
                id: row.try_get("id")?,
                title: row.try_get("title")?,
                studio: row.try_get("studio")?,
                year: row.try_get("year")?,
                chapters: row.try_get("chapters")?,
                rating: row.try_get("rating")?,
                version: row.try_get("version")?,
            });
        }

        let metadata = Metadata::calculate(total_records, filters.page, filters.page_size);
        Ok((mangas, metadata))
    }
}
