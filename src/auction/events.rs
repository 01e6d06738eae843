/// 양방향 와이어 프로토콜 정의
/// 인바운드 커맨드 3종(join_room, leave_room, place_bid)과 아웃바운드 이벤트
/// 아웃바운드 이벤트는 델타가 아닌 항상 최신 상태 전체를 담는다
// region:    --- Imports
use crate::auction::model::AuctionStatus;
use crate::collaborators::ProductSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
// endregion: --- Imports

// region:    --- Client Commands

/// 클라이언트 -> 서버 커맨드
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    JoinRoom { auction_id: i64 },
    LeaveRoom { auction_id: i64 },
    PlaceBid { auction_id: i64, amount: i64 },
}

// endregion: --- Client Commands

// region:    --- Server Events

/// 서버 -> 클라이언트 이벤트
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// 방 입장 시 1회 전송하는 상태 스냅샷(재입장 시 자가 복구용)
    RoomState {
        auction_id: i64,
        status: AuctionStatus,
        starting_price: i64,
        bid_increment: i64,
        current_bid: Option<i64>,
        current_bidder_id: Option<i64>,
        bid_count: i64,
        buy_now_price: Option<i64>,
        ends_at: DateTime<Utc>,
        #[serde(skip_serializing_if = "Option::is_none")]
        product: Option<ProductSummary>,
    },
    /// 수락된 입찰(방 전체 브로드캐스트)
    BidAccepted {
        auction_id: i64,
        amount: i64,
        bidder_id: i64,
        bid_count: i64,
    },
    /// 거절된 입찰(요청자에게만 유니캐스트)
    BidRejected {
        auction_id: i64,
        code: String,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        retry_after: Option<i64>,
    },
    /// 경매 종료(방 전체 브로드캐스트)
    AuctionEnded {
        auction_id: i64,
        winner_id: Option<i64>,
        final_amount: Option<i64>,
        reserve_met: bool,
    },
    /// 프로토콜 오류(잘못된 커맨드 형식 등)
    Error { code: String, message: String },
}

// endregion: --- Server Events
