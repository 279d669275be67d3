use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::features::board::{create_board_router, render_board};
use crate::features::health::health_check;
use crate::request_id::request_id_middleware;
use crate::state::AppState;

/// 组装完整路由：
/// - `GET /health`
/// - `GET /`（兼容旧部署的根路径查询）
/// - `GET {api.prefix}/board`
pub fn build_app(state: AppState) -> Router {
    let prefix = state.config.api.prefix.clone();
    let api_router = create_board_router();

    let router = Router::<AppState>::new()
        .route("/health", get(health_check))
        .route("/", get(render_board));
    let router = if prefix.is_empty() || prefix == "/" {
        router.merge(api_router)
    } else {
        router.nest(&prefix, api_router)
    };

    router
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
}
