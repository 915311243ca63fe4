//! Child handlers: create, list, get, update, delete.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::ChildSearch;
use crate::app_state::AppState;
use crate::domain::{Child, ChildId, ChildProfile};
use crate::error::{ErrorResponse, TrackerError};

/// `POST /children` — Register a child.
///
/// # Errors
///
/// Returns [`TrackerError::InvalidRequest`] for an invalid profile.
#[utoipa::path(
    post,
    path = "/api/v1/children",
    tag = "Children",
    summary = "Create a child",
    description = "Registers a child. `birth_date` (or `birthDate`) must be a valid `YYYY-MM-DD` date.",
    request_body = ChildProfile,
    responses(
        (status = 201, description = "Child created", body = Child),
        (status = 400, description = "Invalid profile", body = ErrorResponse),
    )
)]
pub async fn create_child(
    State(state): State<AppState>,
    Json(profile): Json<ChildProfile>,
) -> Result<impl IntoResponse, TrackerError> {
    let child = state.children.create(profile).await?;
    Ok((StatusCode::CREATED, Json(child)))
}

/// `GET /children` — List children, optionally searching by name.
///
/// # Errors
///
/// Returns [`TrackerError`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/children",
    tag = "Children",
    summary = "List children",
    description = "Returns all children ordered by name. `name` keeps only children whose name contains it, ignoring case.",
    params(ChildSearch),
    responses(
        (status = 200, description = "Children", body = Vec<Child>),
    )
)]
pub async fn list_children(
    State(state): State<AppState>,
    Query(search): Query<ChildSearch>,
) -> Result<impl IntoResponse, TrackerError> {
    let children = state.children.list(search.name.as_deref()).await?;
    Ok(Json(children))
}

/// `GET /children/{child_id}` — Get one child.
///
/// # Errors
///
/// Returns [`TrackerError::ChildNotFound`] if the child does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/children/{child_id}",
    tag = "Children",
    summary = "Get a child",
    params(
        ("child_id" = uuid::Uuid, Path, description = "Child UUID"),
    ),
    responses(
        (status = 200, description = "Child", body = Child),
        (status = 404, description = "Child not found", body = ErrorResponse),
    )
)]
pub async fn get_child(
    State(state): State<AppState>,
    Path(child_id): Path<ChildId>,
) -> Result<impl IntoResponse, TrackerError> {
    Ok(Json(state.children.get(child_id).await?))
}

/// `PUT /children/{child_id}` — Replace a child's profile.
///
/// # Errors
///
/// Returns [`TrackerError::ChildNotFound`] or
/// [`TrackerError::InvalidRequest`].
#[utoipa::path(
    put,
    path = "/api/v1/children/{child_id}",
    tag = "Children",
    summary = "Update a child",
    params(
        ("child_id" = uuid::Uuid, Path, description = "Child UUID"),
    ),
    request_body = ChildProfile,
    responses(
        (status = 200, description = "Updated child", body = Child),
        (status = 400, description = "Invalid profile", body = ErrorResponse),
        (status = 404, description = "Child not found", body = ErrorResponse),
    )
)]
pub async fn update_child(
    State(state): State<AppState>,
    Path(child_id): Path<ChildId>,
    Json(profile): Json<ChildProfile>,
) -> Result<impl IntoResponse, TrackerError> {
    Ok(Json(state.children.update(child_id, profile).await?))
}

/// `DELETE /children/{child_id}` — Delete a child and everything recorded
/// for it.
///
/// # Errors
///
/// Returns [`TrackerError::ChildNotFound`] if the child does not exist.
#[utoipa::path(
    delete,
    path = "/api/v1/children/{child_id}",
    tag = "Children",
    summary = "Delete a child",
    description = "Deletes the child together with all of its records and timeline events.",
    params(
        ("child_id" = uuid::Uuid, Path, description = "Child UUID"),
    ),
    responses(
        (status = 204, description = "Child deleted"),
        (status = 404, description = "Child not found", body = ErrorResponse),
    )
)]
pub async fn delete_child(
    State(state): State<AppState>,
    Path(child_id): Path<ChildId>,
) -> Result<impl IntoResponse, TrackerError> {
    state.children.delete(child_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Child management routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/children", get(list_children).post(create_child))
        .route(
            "/children/{child_id}",
            get(get_child).put(update_child).delete(delete_child),
        )
}
