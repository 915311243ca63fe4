//! Observation record handlers, generic over the record kind.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::app_state::AppState;
use crate::domain::record::{Food, Growth, Milestone, Tooth, Word};
use crate::domain::{ChildId, EntryId, Record, RecordQuery};
use crate::error::TrackerError;

async fn create_record<R: Record>(
    State(state): State<AppState>,
    Path(child_id): Path<ChildId>,
    Json(record): Json<R>,
) -> Result<impl IntoResponse, TrackerError> {
    let saved = state.records.create(child_id, record).await?;
    let status = if saved.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(saved.stored)))
}

async fn list_records<R: Record>(
    State(state): State<AppState>,
    Path(child_id): Path<ChildId>,
    Query(query): Query<RecordQuery>,
) -> Result<impl IntoResponse, TrackerError> {
    Ok(Json(state.records.list::<R>(child_id, query).await?))
}

async fn get_record<R: Record>(
    State(state): State<AppState>,
    Path((child_id, id)): Path<(ChildId, EntryId)>,
) -> Result<impl IntoResponse, TrackerError> {
    Ok(Json(state.records.get::<R>(child_id, id).await?))
}

async fn update_record<R: Record>(
    State(state): State<AppState>,
    Path((child_id, id)): Path<(ChildId, EntryId)>,
    Json(patch): Json<R::Patch>,
) -> Result<impl IntoResponse, TrackerError> {
    Ok(Json(state.records.update::<R>(child_id, id, patch).await?))
}

async fn delete_record<R: Record>(
    State(state): State<AppState>,
    Path((child_id, id)): Path<(ChildId, EntryId)>,
) -> Result<impl IntoResponse, TrackerError> {
    state.records.delete::<R>(child_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Routes of one record kind under `/children/{child_id}/{segment}`.
fn kind_routes<R: Record>(segment: &str) -> Router<AppState> {
    let base = format!("/children/{{child_id}}/{segment}");
    Router::new()
        .route(&base, get(list_records::<R>).post(create_record::<R>))
        .route(
            &format!("{base}/{{entry_id}}"),
            get(get_record::<R>)
                .put(update_record::<R>)
                .delete(delete_record::<R>),
        )
}

/// Record routes for every kind.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(kind_routes::<Growth>("growth"))
        .merge(kind_routes::<Growth>("weight-height"))
        .merge(kind_routes::<Milestone>("milestones"))
        .merge(kind_routes::<Word>("words"))
        .merge(kind_routes::<Tooth>("teeth"))
        .merge(kind_routes::<Food>("food"))
}
