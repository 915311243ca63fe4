//! REST endpoint handlers organized by resource.

pub mod children;
pub mod records;
pub mod system;
pub mod timeline;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(children::routes())
        .merge(timeline::routes())
        .merge(records::routes())
}
