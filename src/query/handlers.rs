// region:    --- Imports
use super::queries;
use crate::auction::model::{AuctionStatus, Bid};
use crate::database::DatabaseManager;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::Error as SqlxError;
use sqlx::FromRow;
use tracing::info;

// endregion: --- Imports

// region:    --- Auction State View

/// 클라이언트에 내려가는 권위 있는 경매 상태
/// 중간 이벤트를 놓친 클라이언트는 이 조회로 자가 복구한다
#[derive(Debug, FromRow)]
struct AuctionStateRow {
    id: i64,
    product_id: i64,
    starting_price: i64,
    buy_now_price: Option<i64>,
    current_bid: Option<i64>,
    current_bidder_id: Option<i64>,
    bid_increment: i64,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    status: String,
    bid_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuctionStateView {
    pub auction_id: i64,
    pub product_id: i64,
    pub status: AuctionStatus,
    pub starting_price: i64,
    pub bid_increment: i64,
    pub current_bid: Option<i64>,
    pub current_bidder_id: Option<i64>,
    pub bid_count: i64,
    pub buy_now_price: Option<i64>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl AuctionStateRow {
    fn into_view(self) -> Result<AuctionStateView, SqlxError> {
        let status = AuctionStatus::parse(&self.status).ok_or_else(|| {
            SqlxError::Decode(format!("알 수 없는 경매 상태: {}", self.status).into())
        })?;
        Ok(AuctionStateView {
            auction_id: self.id,
            product_id: self.product_id,
            status,
            starting_price: self.starting_price,
            bid_increment: self.bid_increment,
            current_bid: self.current_bid,
            current_bidder_id: self.current_bidder_id,
            bid_count: self.bid_count,
            buy_now_price: self.buy_now_price,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
        })
    }
}

// endregion: --- Auction State View

// region:    --- Query Handlers

/// 경매 상태 조회
pub async fn get_auction_state(
    db_manager: &DatabaseManager,
    auction_id: i64,
) -> Result<AuctionStateView, SqlxError> {
    info!("{:<12} --> 경매 상태 조회 id: {}", "Query", auction_id);
    let row = db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, AuctionStateRow>(queries::GET_AUCTION_STATE)
                    .bind(auction_id)
                    .fetch_one(&mut **tx)
                    .await
            })
        })
        .await?;
    row.into_view()
}

/// 진행 중 경매 목록 조회
pub async fn get_active_auctions(
    db_manager: &DatabaseManager,
) -> Result<Vec<AuctionStateView>, SqlxError> {
    info!("{:<12} --> 진행 중 경매 목록 조회", "Query");
    let rows = db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, AuctionStateRow>(queries::GET_ACTIVE_AUCTIONS)
                    .fetch_all(&mut **tx)
                    .await
            })
        })
        .await?;
    rows.into_iter().map(AuctionStateRow::into_view).collect()
}

/// 입찰 이력 조회
pub async fn get_bid_history(
    db_manager: &DatabaseManager,
    auction_id: i64,
) -> Result<Vec<Bid>, SqlxError> {
    info!("{:<12} --> 입찰 이력 조회 id: {}", "Query", auction_id);
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, Bid>(queries::GET_BID_HISTORY)
                    .bind(auction_id)
                    .fetch_all(&mut **tx)
                    .await
            })
        })
        .await
}

// endregion: --- Query Handlers
