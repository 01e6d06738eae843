/// 경매 도메인 모델
/// 모든 시각은 UTC 인스턴트로만 저장/비교한다 (문자열 비교 금지)
// region:    --- Imports
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
// endregion: --- Imports

// region:    --- Auction

/// 경매 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuctionStatus {
    Active,
    Ended,
    Cancelled,
}

impl AuctionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuctionStatus::Active => "ACTIVE",
            AuctionStatus::Ended => "ENDED",
            AuctionStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(AuctionStatus::Active),
            "ENDED" => Some(AuctionStatus::Ended),
            "CANCELLED" => Some(AuctionStatus::Cancelled),
            _ => None,
        }
    }
}

/// 경매 모델
/// current_bid가 None이면 current_bidder_id도 None이다
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Auction {
    pub id: i64,
    pub product_id: i64,
    pub starting_price: i64,
    /// 비공개 최저 낙찰 가격(저장만 하고 입찰 규칙에는 관여하지 않음)
    pub reserve_price: Option<i64>,
    /// 즉시 구매 가격
    pub buy_now_price: Option<i64>,
    pub current_bid: Option<i64>,
    pub current_bidder_id: Option<i64>,
    /// 최소 인상 단위
    pub bid_increment: i64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: AuctionStatus,
}

impl Auction {
    /// 비공개 최저 가격 충족 여부(종료 브로드캐스트에 포함)
    pub fn reserve_met(&self) -> bool {
        match (self.reserve_price, self.current_bid) {
            (Some(reserve), Some(bid)) => bid >= reserve,
            (None, Some(_)) => true,
            _ => false,
        }
    }
}

// endregion: --- Auction

// region:    --- Bid

/// 입찰 모델(수락된 입찰만 기록)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Bid {
    pub id: i64,
    pub auction_id: i64,
    pub bidder_id: i64,
    pub amount: i64,
    pub placed_at: DateTime<Utc>,
    /// 가장 최근에 수락된 입찰만 true
    pub is_winning: bool,
}

// endregion: --- Bid

// region:    --- Audit

/// 감사 기록 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Success,
    RejectedLowAmount,
    RejectedEnded,
    RejectedRateLimited,
    RejectedInvalid,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::Success => "success",
            AuditStatus::RejectedLowAmount => "rejected_low_amount",
            AuditStatus::RejectedEnded => "rejected_ended",
            AuditStatus::RejectedRateLimited => "rejected_rate_limited",
            AuditStatus::RejectedInvalid => "rejected_invalid",
        }
    }
}

/// 연결 메타데이터(감사 기록용)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnMeta {
    pub ip: String,
    pub agent: String,
}

/// 입찰 시도 감사 기록
/// 수락/거절과 무관하게 시도 1건당 정확히 1건 기록, 이후 불변
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidAuditRecord {
    pub auction_id: i64,
    pub bidder_id: i64,
    pub attempted_amount: i64,
    pub status: AuditStatus,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
    pub ip: String,
    pub agent: String,
}

impl BidAuditRecord {
    pub fn new(
        auction_id: i64,
        bidder_id: i64,
        attempted_amount: i64,
        status: AuditStatus,
        reason: impl Into<String>,
        timestamp: DateTime<Utc>,
        meta: &ConnMeta,
    ) -> Self {
        Self {
            auction_id,
            bidder_id,
            attempted_amount,
            status,
            reason: reason.into(),
            timestamp,
            ip: meta.ip.clone(),
            agent: meta.agent.clone(),
        }
    }
}

// endregion: --- Audit
