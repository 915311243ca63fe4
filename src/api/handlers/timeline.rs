//! Feeding and sleep timeline handlers.
//!
//! Plain CRUD is served by handlers generic over the log's state type and
//! mounted once per log. Stats and replace-day differ per log in their
//! response shape, so each log gets its own documented handler.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};

use crate::api::dto::DateFilter;
use crate::app_state::AppState;
use crate::domain::{ChildId, EntryId, EventDraft, EventPatch, EventState, FeedingState, SleepState};
use crate::error::{ErrorResponse, TrackerError};
use crate::stats::{FeedingDay, SleepDay, StatsRange};

/// Path segment of the breastfeeding log.
pub const FEEDING_SEGMENT: &str = "breastfeeding";

/// Path segment of the sleep log.
pub const SLEEP_SEGMENT: &str = "sleep";

async fn create_event<S: EventState>(
    State(state): State<AppState>,
    Path(child_id): Path<ChildId>,
    Json(draft): Json<EventDraft<S>>,
) -> Result<impl IntoResponse, TrackerError> {
    let event = state.timeline.create(child_id, draft).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

async fn create_events_bulk<S: EventState>(
    State(state): State<AppState>,
    Path(child_id): Path<ChildId>,
    Json(drafts): Json<Vec<EventDraft<S>>>,
) -> Result<impl IntoResponse, TrackerError> {
    let events = state.timeline.create_bulk(child_id, drafts).await?;
    Ok((StatusCode::CREATED, Json(events)))
}

async fn list_events<S: EventState>(
    State(state): State<AppState>,
    Path(child_id): Path<ChildId>,
    Query(filter): Query<DateFilter>,
) -> Result<impl IntoResponse, TrackerError> {
    let events = state
        .timeline
        .list::<S>(child_id, filter.date.as_deref())
        .await?;
    Ok(Json(events))
}

async fn get_event<S: EventState>(
    State(state): State<AppState>,
    Path((child_id, id)): Path<(ChildId, EntryId)>,
) -> Result<impl IntoResponse, TrackerError> {
    Ok(Json(state.timeline.get::<S>(child_id, id).await?))
}

async fn update_event<S: EventState>(
    State(state): State<AppState>,
    Path((child_id, id)): Path<(ChildId, EntryId)>,
    Json(patch): Json<EventPatch<S>>,
) -> Result<impl IntoResponse, TrackerError> {
    Ok(Json(state.timeline.update(child_id, id, patch).await?))
}

async fn delete_event<S: EventState>(
    State(state): State<AppState>,
    Path((child_id, id)): Path<(ChildId, EntryId)>,
) -> Result<impl IntoResponse, TrackerError> {
    state.timeline.delete::<S>(child_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /children/{child_id}/breastfeeding/stats` — Daily feeding minutes.
///
/// # Errors
///
/// Returns [`TrackerError::ChildNotFound`] or
/// [`TrackerError::InvalidRequest`] for malformed bounds.
#[utoipa::path(
    get,
    path = "/api/v1/children/{child_id}/breastfeeding/stats",
    tag = "Breastfeeding",
    summary = "Daily breastfeeding totals",
    description = "Pairs each `stop` with the pending `start` of the same date. Intervals outside (0, 120) minutes count as 15. `from`/`to` filter the returned days only.",
    params(
        ("child_id" = uuid::Uuid, Path, description = "Child UUID"),
        StatsRange,
    ),
    responses(
        (status = 200, description = "One entry per date with events", body = Vec<FeedingDay>),
        (status = 400, description = "Malformed range", body = ErrorResponse),
        (status = 404, description = "Child not found", body = ErrorResponse),
    )
)]
pub async fn feeding_stats(
    State(state): State<AppState>,
    Path(child_id): Path<ChildId>,
    Query(range): Query<StatsRange>,
) -> Result<impl IntoResponse, TrackerError> {
    Ok(Json(state.timeline.feeding_stats(child_id, range).await?))
}

/// `GET /children/{child_id}/sleep/stats` — Daily sleep and night minutes.
///
/// # Errors
///
/// Returns [`TrackerError::ChildNotFound`] or
/// [`TrackerError::InvalidRequest`] for malformed bounds.
#[utoipa::path(
    get,
    path = "/api/v1/children/{child_id}/sleep/stats",
    tag = "Sleep",
    summary = "Daily sleep totals",
    description = "Sums same-day `sleep` spans and credits the overnight span (last `sleep` of a date to the first `awake` of the next) to the earlier date.",
    params(
        ("child_id" = uuid::Uuid, Path, description = "Child UUID"),
        StatsRange,
    ),
    responses(
        (status = 200, description = "One entry per date with events", body = Vec<SleepDay>),
        (status = 400, description = "Malformed range", body = ErrorResponse),
        (status = 404, description = "Child not found", body = ErrorResponse),
    )
)]
pub async fn sleep_stats(
    State(state): State<AppState>,
    Path(child_id): Path<ChildId>,
    Query(range): Query<StatsRange>,
) -> Result<impl IntoResponse, TrackerError> {
    Ok(Json(state.timeline.sleep_stats(child_id, range).await?))
}

/// `PUT /children/{child_id}/breastfeeding/day/{date}` — Replace one day.
///
/// # Errors
///
/// Returns [`TrackerError::ChildNotFound`] or
/// [`TrackerError::InvalidRequest`]; the stored day is unchanged on error.
#[utoipa::path(
    put,
    path = "/api/v1/children/{child_id}/breastfeeding/day/{date}",
    tag = "Breastfeeding",
    summary = "Replace a day of breastfeeding events",
    description = "Atomically deletes every event of the date and inserts the body, sorted by time.",
    params(
        ("child_id" = uuid::Uuid, Path, description = "Child UUID"),
        ("date" = String, Path, description = "Day to replace, `YYYY-MM-DD`"),
    ),
    request_body = inline(Vec<EventDraft<FeedingState>>),
    responses(
        (status = 200, description = "Day replaced", body = serde_json::Value),
        (status = 400, description = "Invalid event or date", body = ErrorResponse),
        (status = 404, description = "Child not found", body = ErrorResponse),
    )
)]
pub async fn replace_feeding_day(
    State(state): State<AppState>,
    Path((child_id, date)): Path<(ChildId, String)>,
    Json(drafts): Json<Vec<EventDraft<FeedingState>>>,
) -> Result<impl IntoResponse, TrackerError> {
    Ok(Json(state.timeline.replace_day(child_id, &date, drafts).await?))
}

/// `PUT /children/{child_id}/sleep/day/{date}` — Replace one day.
///
/// # Errors
///
/// Returns [`TrackerError::ChildNotFound`] or
/// [`TrackerError::InvalidRequest`]; the stored day is unchanged on error.
#[utoipa::path(
    put,
    path = "/api/v1/children/{child_id}/sleep/day/{date}",
    tag = "Sleep",
    summary = "Replace a day of sleep events",
    description = "Atomically deletes every event of the date and inserts the body, sorted by time.",
    params(
        ("child_id" = uuid::Uuid, Path, description = "Child UUID"),
        ("date" = String, Path, description = "Day to replace, `YYYY-MM-DD`"),
    ),
    request_body = inline(Vec<EventDraft<SleepState>>),
    responses(
        (status = 200, description = "Day replaced", body = serde_json::Value),
        (status = 400, description = "Invalid event or date", body = ErrorResponse),
        (status = 404, description = "Child not found", body = ErrorResponse),
    )
)]
pub async fn replace_sleep_day(
    State(state): State<AppState>,
    Path((child_id, date)): Path<(ChildId, String)>,
    Json(drafts): Json<Vec<EventDraft<SleepState>>>,
) -> Result<impl IntoResponse, TrackerError> {
    Ok(Json(state.timeline.replace_day(child_id, &date, drafts).await?))
}

/// CRUD routes of one log under `/children/{child_id}/{segment}`.
fn log_routes<S: EventState>(segment: &str) -> Router<AppState> {
    let base = format!("/children/{{child_id}}/{segment}");
    Router::new()
        .route(&base, get(list_events::<S>).post(create_event::<S>))
        .route(&format!("{base}/bulk"), post(create_events_bulk::<S>))
        .route(
            &format!("{base}/{{entry_id}}"),
            get(get_event::<S>)
                .put(update_event::<S>)
                .delete(delete_event::<S>),
        )
}

/// Timeline routes for both logs.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(log_routes::<FeedingState>(FEEDING_SEGMENT))
        .merge(log_routes::<SleepState>(SLEEP_SEGMENT))
        .route(
            &format!("/children/{{child_id}}/{FEEDING_SEGMENT}/stats"),
            get(feeding_stats),
        )
        .route(
            &format!("/children/{{child_id}}/{FEEDING_SEGMENT}/day/{{date}}"),
            put(replace_feeding_day),
        )
        .route(
            &format!("/children/{{child_id}}/{SLEEP_SEGMENT}/stats"),
            get(sleep_stats),
        )
        .route(
            &format!("/children/{{child_id}}/{SLEEP_SEGMENT}/day/{{date}}"),
            put(replace_sleep_day),
        )
}
