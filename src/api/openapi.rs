//! OpenAPI document for the documented endpoints.

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// Generated OpenAPI description of the service.
#[derive(Debug, OpenApi)]
#[openapi(
    paths(
        crate::api::handlers::system::health_handler,
        crate::api::handlers::children::create_child,
        crate::api::handlers::children::list_children,
        crate::api::handlers::children::get_child,
        crate::api::handlers::children::update_child,
        crate::api::handlers::children::delete_child,
        crate::api::handlers::timeline::feeding_stats,
        crate::api::handlers::timeline::sleep_stats,
        crate::api::handlers::timeline::replace_feeding_day,
        crate::api::handlers::timeline::replace_sleep_day,
    ),
    components(
        schemas(
            crate::api::handlers::system::HealthResponse,
            crate::domain::Child,
            crate::domain::ChildProfile,
            crate::domain::FeedingState,
            crate::domain::SleepState,
            crate::stats::FeedingDay,
            crate::stats::SleepDay,
            crate::error::ErrorResponse,
            crate::error::ErrorBody,
        )
    ),
    tags(
        (name = "System", description = "Service health"),
        (name = "Children", description = "Tracked children"),
        (name = "Breastfeeding", description = "Breastfeeding timeline and daily totals"),
        (name = "Sleep", description = "Sleep timeline and day/night totals"),
    ),
    info(
        title = "babylog API",
        description = "Records a child's growth, milestones, words, teeth, food introductions, breastfeeding and sleep.",
    ),
)]
pub struct ApiDoc;

/// Serves the OpenAPI JSON and, with the `swagger-ui` feature, the
/// Swagger UI at `/swagger-ui`.
#[cfg(feature = "swagger-ui")]
pub fn docs_routes() -> Router<AppState> {
    use utoipa_swagger_ui::SwaggerUi;

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

/// Serves the OpenAPI JSON.
#[cfg(not(feature = "swagger-ui"))]
pub fn docs_routes() -> Router<AppState> {
    use axum::Json;
    use axum::routing::get;

    Router::new().route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
}
