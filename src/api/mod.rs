pub mod dto;
pub mod errors;
pub mod handlers;

use axum::{
    routing::{get, patch, post, put},
    Router,
};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use handlers::ApiDoc;

use crate::{devices::DeviceService, statistics::StatisticsService};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub devices: DeviceService,
    pub statistics: StatisticsService,
}

pub fn router(state: AppState) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .route(
            "/devices",
            get(handlers::list_devices).post(handlers::create_device),
        )
        .route(
            "/devices/{id}",
            get(handlers::get_device).delete(handlers::delete_device),
        )
        .route("/devices/{id}/toggle", post(handlers::toggle_device))
        .route("/devices/{id}/status", put(handlers::set_device_status))
        .route(
            "/devices/{id}/settings",
            patch(handlers::update_device_settings),
        )
        .route("/suggestions", get(handlers::get_suggestions))
        .route("/statistics", get(handlers::get_statistics))
        .route("/statistics/history", get(handlers::get_statistics_history))
        .route("/statistics/collect", post(handlers::collect_statistics))
        .with_state(state)
        .split_for_parts();

    router
        .route("/health", get(handlers::health))
        .route(
            "/api-docs/openapi.json",
            get(move || async move { axum::Json(api) }),
        )
}
