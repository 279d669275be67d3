use axum::{
    Router,
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::IntoResponse,
    routing::get,
};

use super::types::{BoardQuery, RenderRequest, parse_flag};
use crate::{error::AppError, state::AppState};

const CONTENT_TYPE_PNG: &str = "image/png";
/// 产物内容只由请求参数决定，可以长期缓存
const CACHE_CONTROL_IMMUTABLE: &str = "public, max-age=31536000, immutable";

/// GET 渲染棋盘 PNG
///
/// 查询参数：`fen`（默认空）、`size`（[min,max] 内整数，否则取默认）、
/// `reversed`（翻转视角）、`download`（以附件返回）。
pub async fn render_board(
    State(state): State<AppState>,
    Query(q): Query<BoardQuery>,
) -> Result<impl IntoResponse, AppError> {
    let req = RenderRequest::from_query(&q, &state.config.board);
    let outcome = state.pipeline.render(&req).await?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_PNG));
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(CACHE_CONTROL_IMMUTABLE),
    );
    headers.insert(
        "x-cache",
        HeaderValue::from_static(if outcome.source.is_hit() { "HIT" } else { "MISS" }),
    );
    if parse_flag(q.download.as_deref()) {
        // 键只包含十六进制与 `.png`，可以直接放进头部
        if let Ok(v) =
            HeaderValue::from_str(&format!("attachment; filename=\"{}\"", outcome.key))
        {
            headers.insert(header::CONTENT_DISPOSITION, v);
        }
    }

    Ok((StatusCode::OK, headers, outcome.artifact.bytes))
}

/// 棋盘渲染路由（挂载在 API 前缀下）
pub fn create_board_router() -> Router<AppState> {
    Router::new().route("/board", get(render_board))
}
