//! HTTP handler functions for the geopark tuban API.

use actix_web::{HttpResponse, web};
use geopark_analytics::AnalyticsError;
use geopark_analytics_models::MapQueryParams;
use geopark_server_models::{ApiError, ApiHealth};
use serde::Serialize;

use crate::AppState;

/// Maps a report result onto a JSON response.
///
/// Invalid parameters are the caller's fault and return 400 with the
/// message; store failures are logged and return a generic 500.
fn respond<T: Serialize>(report: &str, result: Result<T, AnalyticsError>) -> HttpResponse {
    match result {
        Ok(payload) => HttpResponse::Ok().json(payload),
        Err(e @ AnalyticsError::InvalidParameter { .. }) => {
            log::debug!("Rejected {report} request: {e}");
            HttpResponse::BadRequest().json(ApiError::new(e.to_string()))
        }
        Err(e @ AnalyticsError::Store(_)) => {
            log::error!("Failed to load {report}: {e}");
            HttpResponse::InternalServerError().json(ApiError::new(format!("Failed to load {report}")))
        }
    }
}

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /stats/api/overview`
pub async fn overview(state: web::Data<AppState>) -> HttpResponse {
    respond("overview", state.service.overview().await)
}

/// `GET /stats/api/problem_types`
pub async fn problem_types(state: web::Data<AppState>) -> HttpResponse {
    respond("problem types", state.service.problem_types().await)
}

/// `GET /stats/api/func_zones`
pub async fn func_zones(state: web::Data<AppState>) -> HttpResponse {
    respond("function zones", state.service.func_zones().await)
}

/// `GET /stats/api/rectify_progress`
pub async fn rectify_progress(state: web::Data<AppState>) -> HttpResponse {
    respond("rectify progress", state.service.rectify_progress().await)
}

/// `GET /stats/api/impact_analysis`
pub async fn impact_analysis(state: web::Data<AppState>) -> HttpResponse {
    respond("impact analysis", state.service.impact_analysis().await)
}

/// `GET /stats/api/monthly_trend`
pub async fn monthly_trend(state: web::Data<AppState>) -> HttpResponse {
    respond("monthly trend", state.service.monthly_trend().await)
}

/// `GET /stats/api/park_ranking`
pub async fn park_ranking(state: web::Data<AppState>) -> HttpResponse {
    respond("park ranking", state.service.park_ranking().await)
}

/// `GET /stats/api/overdue_list`
pub async fn overdue_list(state: web::Data<AppState>) -> HttpResponse {
    respond("overdue list", state.service.overdue_list().await)
}

/// `GET /map/api/tubans`
///
/// Returns a GeoJSON `FeatureCollection` of geolocated tubans matching the
/// optional `func_zone`, `problem_type`, `rectify_status` and `event_id`
/// filters.
pub async fn map_tubans(
    state: web::Data<AppState>,
    params: web::Query<MapQueryParams>,
) -> HttpResponse {
    respond("map tubans", state.service.map_features(&params).await)
}

/// `GET /map/api/stats`
pub async fn map_stats(state: web::Data<AppState>) -> HttpResponse {
    respond("map stats", state.service.map_stats().await)
}

/// `GET /map/api/filter_options`
pub async fn filter_options(state: web::Data<AppState>) -> HttpResponse {
    respond("filter options", state.service.filter_options().await)
}
