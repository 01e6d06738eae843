// region:    --- Imports
use crate::gateway::AppState;
use crate::query;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use tracing::info;

// endregion: --- Imports

// region:    --- Query Handlers

/// 진행 중 경매 목록 조회
pub async fn handle_get_auctions(State(state): State<AppState>) -> impl IntoResponse {
    info!("{:<12} --> 진행 중 경매 목록 조회", "HandlerQuery");
    match query::handlers::get_active_auctions(&state.db).await {
        Ok(auctions) => Json(auctions).into_response(),
        Err(e) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// 경매 상태 조회(이벤트를 놓친 클라이언트의 자가 복구 경로)
pub async fn handle_get_auction(
    State(state): State<AppState>,
    Path(auction_id): Path<i64>,
) -> impl IntoResponse {
    info!("{:<12} --> 경매 상태 조회 id: {}", "HandlerQuery", auction_id);
    match query::handlers::get_auction_state(&state.db, auction_id).await {
        Ok(view) => Json(view).into_response(),
        Err(sqlx::Error::RowNotFound) => (
            axum::http::StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "error": "경매를 찾을 수 없습니다.",
                "code": "AUCTION_NOT_FOUND"
            })),
        )
            .into_response(),
        Err(e) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// 입찰 이력 조회
pub async fn handle_get_bid_history(
    State(state): State<AppState>,
    Path(auction_id): Path<i64>,
) -> impl IntoResponse {
    info!("{:<12} --> 입찰 이력 조회 id: {}", "HandlerQuery", auction_id);
    match query::handlers::get_bid_history(&state.db, auction_id).await {
        Ok(history) => Json(history).into_response(),
        Err(e) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

// endregion: --- Query Handlers
