//! Joke CRUD handlers.
//!
//! Each handler validates its input, calls the service through the request
//! [`Deadline`], and classifies failures into [`AppError`] variants:
//!
//! | Handler  | 400                          | 404       | 500                      |
//! |----------|------------------------------|-----------|--------------------------|
//! | create   | empty/malformed body, text   | -         | any service error        |
//! | get      | empty id                     | not found | invalid hex, other       |
//! | list     | bad page / limit             | -         | any service error        |
//! | update   | empty id, body, text         | not found | invalid hex, other       |
//! | delete   | empty id                     | not found | invalid hex, other       |
//!
//! Path, query and body extraction failures are [`AppError`]s too: an
//! undecodable path segment is a 400 and an oversized body is a 413.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use tracing::{debug, instrument};

use super::extract::{ApiBytes, ApiPath, ApiQuery};
use crate::error::{AppError, AppResult};
use crate::middleware::Deadline;
use crate::models::{Joke, JokeRequest, JokeUpdate, PaginationQuery};
use crate::state::AppState;
use crate::store::{ObjectId, StoreError};
use crate::validation::{Pagination, parse_pagination, validate_id, validate_joke_text};

/// Create a new joke.
#[instrument(skip(state, deadline, body), fields(body_len = body.len()))]
pub async fn create_joke(
    State(state): State<AppState>,
    deadline: Deadline,
    ApiBytes(body): ApiBytes,
) -> AppResult<Json<Joke>> {
    let request = decode_joke_request(&body)?;
    validate_joke_text(&request.joke)?;

    let joke = Joke::new(request.joke);
    let created = deadline
        .bound(state.service.create_joke(joke))
        .await
        .map_err(internal)?;

    debug!(id = %created.id, "Joke created");
    Ok(Json(created))
}

/// Get a joke by its hex identifier.
#[instrument(skip(state, deadline))]
pub async fn get_joke(
    State(state): State<AppState>,
    deadline: Deadline,
    ApiPath(id): ApiPath<String>,
) -> AppResult<Json<Joke>> {
    let id = validate_id(&id)?;

    let joke = deadline.bound(state.service.get_joke(id)).await?;

    Ok(Json(joke))
}

/// List jokes a page at a time.
///
/// `page` and `limit` default to 1 and 10. A repeated parameter takes its
/// first value.
#[instrument(skip(state, deadline))]
pub async fn list_jokes(
    State(state): State<AppState>,
    deadline: Deadline,
    ApiQuery(pairs): ApiQuery<Vec<(String, String)>>,
) -> AppResult<Json<Vec<Joke>>> {
    let query = PaginationQuery::from_pairs(pairs);
    let Pagination { skip, limit, .. } =
        parse_pagination(query.page.as_deref(), query.limit.as_deref())?;

    let jokes = deadline
        .bound(state.service.list_jokes(skip, limit))
        .await
        .map_err(internal)?;

    Ok(Json(jokes))
}

/// Replace the text of a joke and stamp its update time.
#[instrument(skip(state, deadline, body), fields(body_len = body.len()))]
pub async fn update_joke(
    State(state): State<AppState>,
    deadline: Deadline,
    ApiPath(id): ApiPath<String>,
    ApiBytes(body): ApiBytes,
) -> AppResult<Json<Joke>> {
    let id = validate_id(&id)?;
    let request = decode_joke_request(&body)?;
    validate_joke_text(&request.joke)?;

    let object_id = ObjectId::parse_str(id).map_err(|e| {
        debug!(error = %e, "Rejected update with malformed id");
        AppError::Internal("failed to create object id".to_string())
    })?;

    let updated = deadline
        .bound(
            state
                .service
                .update_joke(JokeUpdate::now(object_id, request.joke)),
        )
        .await?;

    Ok(Json(updated))
}

/// Delete a joke after confirming it exists.
#[instrument(skip(state, deadline))]
pub async fn delete_joke(
    State(state): State<AppState>,
    deadline: Deadline,
    ApiPath(id): ApiPath<String>,
) -> AppResult<StatusCode> {
    let id = validate_id(&id)?;

    deadline.bound(state.service.get_joke(id)).await?;
    deadline
        .bound(state.service.delete_joke(id))
        .await
        .map_err(internal)?;

    Ok(StatusCode::OK)
}

/// Decode a `{"joke": ...}` body.
///
/// An empty or whitespace-only body is reported separately from malformed
/// JSON.
fn decode_joke_request(body: &[u8]) -> AppResult<JokeRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::BadRequest(
            "request body must not be empty".to_string(),
        ));
    }

    serde_json::from_slice(body).map_err(|e| AppError::decode(&e))
}

/// Classify any storage failure as a server error, including not-found.
fn internal(err: StoreError) -> AppError {
    AppError::Internal(err.to_string())
}
