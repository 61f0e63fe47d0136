//! Manga CRUD handlers.
//!
//! # Endpoints
//!
//! - `POST /v1/mangas` - Create a manga
//! - `GET /v1/mangas` - List mangas with filtering, sorting, and pagination
//! - `GET /v1/mangas/{id}` - Fetch one manga
//! - `PATCH /v1/mangas/{id}` - Partial update with optimistic concurrency
//! - `DELETE /v1/mangas/{id}` - Delete a manga
//!
//! # Concurrency
//!
//! Updates are guarded twice: a client that sends the `version` it last read
//! is rejected up front when the record has moved on, and the store's
//! conditional update catches the race where two writers pass that check
//! simultaneously. Exactly one of them wins; the loser gets 409.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{AppError, AppResult};
use crate::models::{Filters, MANGA_SORT_SAFELIST, Manga, Metadata, validate_manga};
use crate::state::AppState;
use crate::validation::Validator;

/// Single-resource response envelope.
#[derive(Debug, Serialize)]
pub struct MangaEnvelope {
    manga: Manga,
}

/// Collection response envelope with pagination metadata.
#[derive(Debug, Serialize)]
pub struct MangaListEnvelope {
    mangas: Vec<Manga>,
    metadata: Metadata,
}

#[derive(Debug, Serialize)]
pub struct MessageEnvelope {
    message: &'static str,
}

/// Request body for creating a manga. All fields are required.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateMangaRequest {
    pub title: String,
    pub studio: String,
    pub year: i32,
    pub chapters: i32,
    pub rating: f64,
}

/// Create a new manga.
///
/// Returns 201 with the stored record (including its assigned `id` and
/// initial `version`) and a `Location` header pointing at the new resource.
#[instrument(skip(state, payload))]
pub async fn create_manga(
    State(state): State<AppState>,
    payload: Result<Json<CreateMangaRequest>, JsonRejection>,
) -> AppResult<(StatusCode, HeaderMap, Json<MangaEnvelope>)> {
    let Json(payload) = payload.map_err(bad_json)?;

    let manga = Manga {
        id: 0,
        title: payload.title,
        studio: payload.studio,
        year: payload.year,
        chapters: payload.chapters,
        rating: payload.rating,
        version: 0,
    };

    let mut v = Validator::new();
    validate_manga(&mut v, &manga);
    v.finish()?;

    let manga = state.store.mangas.insert(&manga).await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/v1/mangas/{}", manga.id)) {
        headers.insert(header::LOCATION, location);
    }

    Ok((StatusCode::CREATED, headers, Json(MangaEnvelope { manga })))
}

/// Fetch a single manga by ID.
#[instrument(skip(state))]
pub async fn show_manga(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<MangaEnvelope>> {
    let Path(id) = path.map_err(|_| AppError::NotFound)?;
    let manga = state.store.mangas.get(id).await?;
    Ok(Json(MangaEnvelope { manga }))
}

/// Request body for a partial update. Absent fields keep their stored value.
///
/// `version` is optional: when present it must match the record's current
/// version, otherwise the update is rejected with 409 before any write.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateMangaRequest {
    pub title: Option<String>,
    pub studio: Option<String>,
    pub year: Option<i32>,
    pub chapters: Option<i32>,
    pub rating: Option<f64>,
    pub version: Option<i32>,
}

/// Partially update a manga.
///
/// The stored record is fetched, the supplied fields are merged in, the
/// merged record is re-validated as a whole, and the write goes through the
/// store's conditional update. A concurrent writer or a stale `version` in
/// the body produces 409.
#[instrument(skip(state, payload))]
pub async fn update_manga(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateMangaRequest>, JsonRejection>,
) -> AppResult<Json<MangaEnvelope>> {
    let Path(id) = path.map_err(|_| AppError::NotFound)?;
    let Json(payload) = payload.map_err(bad_json)?;

    let mut manga = state.store.mangas.get(id).await?;

    if let Some(expected) = payload.version
        && expected != manga.version
    {
        return Err(AppError::EditConflict);
    }

    if let Some(title) = payload.title {
        manga.title = title;
    }
    if let Some(studio) = payload.studio {
        manga.studio = studio;
    }
    if let Some(year) = payload.year {
        manga.year = year;
    }
    if let Some(chapters) = payload.chapters {
        manga.chapters = chapters;
    }
    if let Some(rating) = payload.rating {
        manga.rating = rating;
    }

    let mut v = Validator::new();
    validate_manga(&mut v, &manga);
    v.finish()?;

    manga.version = state.store.mangas.update(&manga).await?;

    Ok(Json(MangaEnvelope { manga }))
}

/// Delete a manga by ID.
#[instrument(skip(state))]
pub async fn delete_manga(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<MessageEnvelope>> {
    let Path(id) = path.map_err(|_| AppError::NotFound)?;
    state.store.mangas.delete(id).await?;
    Ok(Json(MessageEnvelope {
        message: "manga successfully deleted",
    }))
}

/// Query parameters for listing mangas.
#[derive(Debug, Deserialize)]
pub struct ListMangasQuery {
    /// Case-insensitive substring match on the title.
    #[serde(default)]
    pub title: String,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub sort: Option<String>,
}

/// List mangas with optional title filtering, sorting, and pagination.
///
/// # Query Parameters
///
/// - `title` - Substring filter (default: match all)
/// - `page` - Page number (default: 1)
/// - `page_size` - Records per page (default: 20, max: 100)
/// - `sort` - Sort key, `-` prefix for descending (default: `id`)
#[instrument(skip(state))]
pub async fn list_mangas(
    State(state): State<AppState>,
    Query(query): Query<ListMangasQuery>,
) -> AppResult<Json<MangaListEnvelope>> {
    let filters = Filters {
        page: query.page.unwrap_or(1),
        page_size: query.page_size.unwrap_or(20),
        sort: query.sort.unwrap_or_else(|| "id".to_string()),
        sort_safelist: MANGA_SORT_SAFELIST,
    };

    let mut v = Validator::new();
    filters.validate(&mut v);
    v.finish()?;

    let (mangas, metadata) = state.store.mangas.list(&query.title, &filters).await?;

    Ok(Json(MangaListEnvelope { mangas, metadata }))
}

/// Convert an Axum JSON rejection into the structured 400 error.
pub(crate) fn bad_json(rejection: JsonRejection) -> AppError {
    AppError::BadRequest(match rejection {
        JsonRejection::JsonDataError(_) => {
            "body contains incorrect JSON types or missing fields".to_string()
        }
        JsonRejection::JsonSyntaxError(_) => "body contains badly-formed JSON".to_string(),
        JsonRejection::MissingJsonContentType(_) => {
            "Content-Type header must be application/json".to_string()
        }
        other => other.to_string(),
    })
}
