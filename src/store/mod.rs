/// 경매 저장소
/// 경매/입찰/감사 기록의 단일 진실 공급원. 비즈니스 로직 없음.
/// saveAuction + appendBid는 단일 트랜잭션으로 원자성을 보장한다.
// region:    --- Imports
use crate::auction::model::{Auction, AuctionStatus, Bid, BidAuditRecord};
use crate::database::DatabaseManager;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::sync::Arc;
use tracing::info;
// endregion: --- Imports

// region:    --- Auction Row

/// auctions 테이블 행(상태 문자열 -> enum 변환 전 단계)
#[derive(Debug, FromRow)]
pub struct AuctionRow {
    pub id: i64,
    pub product_id: i64,
    pub starting_price: i64,
    pub reserve_price: Option<i64>,
    pub buy_now_price: Option<i64>,
    pub current_bid: Option<i64>,
    pub current_bidder_id: Option<i64>,
    pub bid_increment: i64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: String,
}

impl AuctionRow {
    pub fn into_auction(self) -> Result<Auction, sqlx::Error> {
        let status = AuctionStatus::parse(&self.status).ok_or_else(|| {
            sqlx::Error::Decode(format!("알 수 없는 경매 상태: {}", self.status).into())
        })?;
        Ok(Auction {
            id: self.id,
            product_id: self.product_id,
            starting_price: self.starting_price,
            reserve_price: self.reserve_price,
            buy_now_price: self.buy_now_price,
            current_bid: self.current_bid,
            current_bidder_id: self.current_bidder_id,
            bid_increment: self.bid_increment,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            status,
        })
    }
}

// endregion: --- Auction Row

// region:    --- Auction Store Trait

/// 경매 저장소 트레이트
#[async_trait]
pub trait AuctionStore: Send + Sync {
    /// 경매 조회
    async fn load_auction(&self, auction_id: i64) -> Result<Auction, sqlx::Error>;

    /// 수락된 입찰 커밋: 경매 갱신 + 이전 최고 입찰 강등 + 입찰 행 추가를
    /// 단일 트랜잭션으로 수행하고 (저장된 입찰, 총 입찰 수)를 반환
    async fn commit_bid(&self, auction: &Auction, bid: &Bid) -> Result<(Bid, i64), sqlx::Error>;

    /// Active -> Ended 상태 전이(낙찰자는 current_bid/current_bidder_id로 확정)
    async fn finalize_auction(&self, auction_id: i64) -> Result<(), sqlx::Error>;

    /// 종료 시각이 지난 Active 경매 id 목록
    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<i64>, sqlx::Error>;

    /// 감사 기록 추가(append-only)
    async fn append_audit(&self, record: &BidAuditRecord) -> Result<(), sqlx::Error>;
}

// endregion: --- Auction Store Trait

// region:    --- Postgres Store

/// 경매 저장소 Postgres 구현체
pub struct PostgresAuctionStore {
    db: Arc<DatabaseManager>,
}

impl PostgresAuctionStore {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AuctionStore for PostgresAuctionStore {
    async fn load_auction(&self, auction_id: i64) -> Result<Auction, sqlx::Error> {
        let row = sqlx::query_as::<_, AuctionRow>(
            "SELECT id, product_id, starting_price, reserve_price, buy_now_price,
                    current_bid, current_bidder_id, bid_increment, starts_at, ends_at, status
             FROM auctions WHERE id = $1",
        )
        .bind(auction_id)
        .fetch_one(self.db.pool())
        .await?;
        row.into_auction()
    }

    async fn commit_bid(&self, auction: &Auction, bid: &Bid) -> Result<(Bid, i64), sqlx::Error> {
        let auction = auction.clone();
        let bid = bid.clone();
        self.db
            .transaction(|tx| {
                Box::pin(async move {
                    // 이전 최고 입찰 강등
                    sqlx::query("UPDATE bids SET is_winning = FALSE WHERE auction_id = $1 AND is_winning")
                        .bind(auction.id)
                        .execute(&mut **tx)
                        .await?;

                    // 입찰 행 추가
                    let stored = sqlx::query_as::<_, Bid>(
                        "INSERT INTO bids (auction_id, bidder_id, amount, placed_at, is_winning)
                         VALUES ($1, $2, $3, $4, TRUE)
                         RETURNING id, auction_id, bidder_id, amount, placed_at, is_winning",
                    )
                    .bind(bid.auction_id)
                    .bind(bid.bidder_id)
                    .bind(bid.amount)
                    .bind(bid.placed_at)
                    .fetch_one(&mut **tx)
                    .await?;

                    // 경매 상태 갱신(즉시 구매면 Resolver가 status까지 Ended로 채워 보낸다)
                    sqlx::query(
                        "UPDATE auctions
                         SET current_bid = $1, current_bidder_id = $2, status = $3
                         WHERE id = $4",
                    )
                    .bind(auction.current_bid)
                    .bind(auction.current_bidder_id)
                    .bind(auction.status.as_str())
                    .bind(auction.id)
                    .execute(&mut **tx)
                    .await?;

                    // 총 입찰 수
                    let bid_count: i64 =
                        sqlx::query_scalar("SELECT COUNT(*) FROM bids WHERE auction_id = $1")
                            .bind(auction.id)
                            .fetch_one(&mut **tx)
                            .await?;

                    Ok::<_, sqlx::Error>((stored, bid_count))
                })
            })
            .await
    }

    async fn finalize_auction(&self, auction_id: i64) -> Result<(), sqlx::Error> {
        info!("{:<12} --> 경매 종료 확정 id: {}", "Store", auction_id);
        sqlx::query("UPDATE auctions SET status = 'ENDED' WHERE id = $1 AND status = 'ACTIVE'")
            .bind(auction_id)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT id FROM auctions WHERE status = 'ACTIVE' AND ends_at <= $1",
        )
        .bind(now)
        .fetch_all(self.db.pool())
        .await
    }

    async fn append_audit(&self, record: &BidAuditRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO bid_audit (auction_id, bidder_id, attempted_amount, status, reason, created_at, ip, agent)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(record.auction_id)
        .bind(record.bidder_id)
        .bind(record.attempted_amount)
        .bind(record.status.as_str())
        .bind(&record.reason)
        .bind(record.timestamp)
        .bind(&record.ip)
        .bind(&record.agent)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }
}

// endregion: --- Postgres Store
