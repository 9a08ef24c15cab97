//! Axum router wiring.
//!
//! Layer order (outermost first): CORS, request interceptor, routes.

use axum::{
    http::HeaderValue,
    middleware,
    routing::{get, post, MethodRouter},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::{app_state::AppState, intercept, ops};

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.cfg().server.cors_origins);

    Router::new()
        .route("/health", methods(get(ops::health)))
        .route("/api/health", methods(get(ops::health)))
        .route("/api/v1/health", methods(get(ops::health)))
        .route("/metrics", methods(get(ops::metrics)))
        .route("/api/v1/system", methods(get(ops::monitoring::system)))
        .route("/api/v1/system/history", methods(get(ops::monitoring::system_history)))
        .route("/api/v1/metrics", methods(get(ops::monitoring::list_aggregates)))
        .route(
            "/api/v1/metrics/:name",
            methods(get(ops::monitoring::get_aggregate).post(ops::monitoring::record_metric)),
        )
        .route("/api/v1/alerts", methods(get(ops::monitoring::alerts)))
        .route("/api/v1/alerts/evaluate", methods(post(ops::monitoring::evaluate)))
        .route("/api/v1/thresholds", methods(get(ops::monitoring::thresholds)))
        .route("/api/v1/errors", methods(get(ops::monitoring::errors)))
        .fallback(ops::not_found)
        .layer(middleware::from_fn_with_state(state.clone(), intercept::intercept))
        .layer(cors)
        .with_state(state)
}

/// Known path, wrong method: answer with a JSON 405 instead of axum's empty one.
fn methods(route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.fallback(ops::method_not_allowed)
}

/// `*` allows any origin; an empty list disables CORS headers entirely.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::new();
    }
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods(Any)
        .allow_headers(Any)
}
