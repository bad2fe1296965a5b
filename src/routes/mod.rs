pub mod auth;
pub mod params;
pub mod posts;
pub mod table;
pub mod uploads;
pub mod users;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use table::RouteTable;

/// Every resource route, in registration order.
pub fn route_table() -> RouteTable {
    let mut table = RouteTable::new();
    users::bind(&mut table);
    posts::bind(&mut table);
    table
}

pub fn app(state: AppState) -> Router {
    let body_limit = state.config.storage.max_upload_bytes;

    Router::new()
        .merge(route_table().into_router(&state))
        .merge(auth::router())
        .route("/uploads/{*path}", get(uploads::serve))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
