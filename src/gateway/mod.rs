/// 연결 게이트웨이
/// 와이어 프로토콜을 만지는 유일한 컴포넌트. 인바운드 연결을 신원 토큰으로
/// 인증하고, 커맨드(join/leave/bid)를 파싱해 전달하며, 아웃바운드 이벤트를
/// 중계한다. 잘못된 커맨드는 조용히 버리지 않고 typed error 이벤트로 응답한다.
/// 느린 연결이 이벤트 루프를 막지 않도록 아웃바운드 큐는 유한하다.
// region:    --- Imports
use crate::auction::events::{ClientCommand, ServerEvent};
use crate::auction::model::{AuditStatus, BidAuditRecord, ConnMeta};
use crate::audit::AuditWriter;
use crate::bidding::resolver::{BidOutcome, BidResolver};
use crate::collaborators::{Identity, IdentityVerifier, ProductCatalog};
use crate::config::EngineConfig;
use crate::database::DatabaseManager;
use crate::query;
use crate::ratelimit::RateLimiter;
use crate::rooms::RoomRegistry;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
// endregion: --- Imports

// region:    --- App State

/// 서비스 시작 시 조립되어 주입되는 공유 상태
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseManager>,
    pub resolver: Arc<BidResolver>,
    pub rooms: Arc<RoomRegistry>,
    pub limiter: Arc<RateLimiter>,
    pub verifier: Arc<dyn IdentityVerifier>,
    pub catalog: Arc<dyn ProductCatalog>,
    pub audit: AuditWriter,
    pub config: Arc<EngineConfig>,
}

// endregion: --- App State

// region:    --- WebSocket Handler

#[derive(Debug, Deserialize)]
pub struct WsParams {
    token: Option<String>,
}

/// WebSocket 연결 요청 처리
/// 업그레이드 전에 신원 토큰을 검증한다. 차단되었거나 검증 불가한 신원은
/// 속도 제한기에 도달하기 전에 거절된다.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let token = match params.token {
        Some(token) => token,
        None => {
            return (
                axum::http::StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({
                    "error": "인증 토큰이 없습니다.",
                    "code": "UNAUTHORIZED"
                })),
            )
                .into_response()
        }
    };

    let bidder_id = match state.verifier.verify(&token).await {
        Ok(Identity::Verified {
            bidder_id,
            is_banned: false,
        }) => bidder_id,
        Ok(Identity::Verified { is_banned: true, .. }) => {
            return (
                axum::http::StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({
                    "error": "차단된 사용자입니다.",
                    "code": "BANNED"
                })),
            )
                .into_response()
        }
        Ok(Identity::Invalid) => {
            return (
                axum::http::StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({
                    "error": "인증에 실패했습니다.",
                    "code": "UNAUTHORIZED"
                })),
            )
                .into_response()
        }
        Err(e) => {
            error!("{:<12} --> 신원 검증 서비스 오류: {}", "Gateway", e);
            return (
                axum::http::StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "error": "신원 검증 서비스를 사용할 수 없습니다.",
                    "code": "AUTH_UNAVAILABLE"
                })),
            )
                .into_response();
        }
    };

    let meta = ConnMeta {
        ip: addr.ip().to_string(),
        agent: headers
            .get(axum::http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string(),
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, bidder_id, meta))
}

/// 연결 하나의 수명 주기
async fn handle_socket(socket: WebSocket, state: AppState, bidder_id: i64, meta: ConnMeta) {
    let conn_id = state.rooms.next_conn_id();
    info!(
        "{:<12} --> 연결 수립: conn={} bidder={} ip={}",
        "Gateway", conn_id, bidder_id, meta.ip
    );

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerEvent>(state.config.outbound_queue);

    // 아웃바운드 중계: 큐의 이벤트를 순서대로 소켓에 쓴다
    let outbound = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    error!("{:<12} --> 이벤트 직렬화 실패: {:?}", "Gateway", e);
                    continue;
                }
            };
            if ws_tx.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    // 인바운드 루프
    while let Some(Ok(message)) = ws_rx.next().await {
        match message {
            Message::Text(text) => {
                handle_command(&state, conn_id, bidder_id, &meta, &tx, &text).await;
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    // 연결 정리: 입장했던 모든 방에서 제거
    state.rooms.drop_connection(conn_id);
    drop(tx);
    outbound.abort();
    info!(
        "{:<12} --> 연결 종료: conn={} bidder={}",
        "Gateway", conn_id, bidder_id
    );
}

// endregion: --- WebSocket Handler

// region:    --- Command Dispatch

/// 인바운드 커맨드 1건 처리
/// 잘못된 형식은 해당 커맨드만 실패시키고 연결은 유지한다
async fn handle_command(
    state: &AppState,
    conn_id: u64,
    bidder_id: i64,
    meta: &ConnMeta,
    tx: &mpsc::Sender<ServerEvent>,
    text: &str,
) {
    let command: ClientCommand = match serde_json::from_str(text) {
        Ok(command) => command,
        Err(e) => {
            warn!(
                "{:<12} --> 잘못된 커맨드: conn={} err={}",
                "Gateway", conn_id, e
            );
            send_unicast(
                tx,
                ServerEvent::Error {
                    code: "BAD_COMMAND".to_string(),
                    message: "잘못된 명령 형식입니다.".to_string(),
                },
            );
            return;
        }
    };

    match command {
        ClientCommand::JoinRoom { auction_id } => {
            handle_join_room(state, conn_id, auction_id, tx).await;
        }
        ClientCommand::LeaveRoom { auction_id } => {
            state.rooms.leave(auction_id, conn_id);
        }
        ClientCommand::PlaceBid { auction_id, amount } => {
            handle_place_bid(state, bidder_id, auction_id, amount, meta, tx).await;
        }
    }
}

/// 방 입장: 구독 등록 후 권위 있는 상태 스냅샷 1건 전송(재입장 자가 복구)
async fn handle_join_room(
    state: &AppState,
    conn_id: u64,
    auction_id: i64,
    tx: &mpsc::Sender<ServerEvent>,
) {
    let view = match query::handlers::get_auction_state(&state.db, auction_id).await {
        Ok(view) => view,
        Err(sqlx::Error::RowNotFound) => {
            send_unicast(
                tx,
                ServerEvent::Error {
                    code: "AUCTION_NOT_FOUND".to_string(),
                    message: "경매를 찾을 수 없습니다.".to_string(),
                },
            );
            return;
        }
        Err(e) => {
            error!(
                "{:<12} --> 방 입장 상태 조회 실패 auction={}: {:?}",
                "Gateway", auction_id, e
            );
            send_unicast(
                tx,
                ServerEvent::Error {
                    code: "STORE_UNAVAILABLE".to_string(),
                    message: "일시적인 오류가 발생했습니다. 잠시 후 다시 시도해주세요."
                        .to_string(),
                },
            );
            return;
        }
    };

    state.rooms.join(auction_id, conn_id, tx.clone());

    // 표시 메타데이터는 읽기 전용 협력자에서 가져오며 실패해도 입장은 진행
    let product = state.catalog.summary_or_none(view.product_id).await;

    send_unicast(
        tx,
        ServerEvent::RoomState {
            auction_id,
            status: view.status,
            starting_price: view.starting_price,
            bid_increment: view.bid_increment,
            current_bid: view.current_bid,
            current_bidder_id: view.current_bidder_id,
            bid_count: view.bid_count,
            buy_now_price: view.buy_now_price,
            ends_at: view.ends_at,
            product,
        },
    );
}

/// 입찰 커맨드: 속도 제한 -> Resolver 순서
/// 제한 초과 시도는 Resolver에 닿기 전에 차단되지만 감사 기록에는 남는다
async fn handle_place_bid(
    state: &AppState,
    bidder_id: i64,
    auction_id: i64,
    amount: i64,
    meta: &ConnMeta,
    tx: &mpsc::Sender<ServerEvent>,
) {
    let now = Utc::now();

    if let Err(retry_after) = state.limiter.check(bidder_id, now) {
        state
            .audit
            .record(BidAuditRecord::new(
                auction_id,
                bidder_id,
                amount,
                AuditStatus::RejectedRateLimited,
                "속도 제한 초과",
                now,
                meta,
            ))
            .await;
        send_unicast(
            tx,
            ServerEvent::BidRejected {
                auction_id,
                code: "RATE_LIMITED".to_string(),
                message: "입찰 시도가 너무 많습니다. 잠시 후 다시 시도해주세요.".to_string(),
                retry_after: Some(retry_after),
            },
        );
        return;
    }

    match state
        .resolver
        .place_bid(auction_id, bidder_id, amount, now, meta)
        .await
    {
        // 수락 브로드캐스트는 Resolver가 임계 구역 안에서 이미 수행했다
        BidOutcome::Accepted { .. } => {}
        BidOutcome::Rejected {
            code,
            message,
            retry_after,
            ..
        } => {
            send_unicast(
                tx,
                ServerEvent::BidRejected {
                    auction_id,
                    code: code.to_string(),
                    message,
                    retry_after,
                },
            );
        }
    }
}

/// 요청자에게만 이벤트 전송(큐가 가득 차면 경고 후 폐기)
fn send_unicast(tx: &mpsc::Sender<ServerEvent>, event: ServerEvent) {
    if let Err(e) = tx.try_send(event) {
        warn!("{:<12} --> 유니캐스트 전송 실패: {:?}", "Gateway", e);
    }
}

// endregion: --- Command Dispatch
