/// 입찰 리졸버
/// 경매별 단일 직렬화 지점: 경매 하나의 상태를 변경하는 유일한 컴포넌트.
/// 경매 id마다 뮤텍스 하나를 배정해 같은 경매의 입찰/만료 처리가 한 시점에
/// 하나만 평가되도록 보장한다. 서로 다른 경매는 완전히 병렬로 처리된다.
// region:    --- Imports
use crate::auction::events::ServerEvent;
use crate::auction::model::{
    Auction, AuctionStatus, AuditStatus, Bid, BidAuditRecord, ConnMeta,
};
use crate::audit::AuditWriter;
use crate::bidding::validator::{self, BidPolicy, Decision};
use crate::rooms::RoomRegistry;
use crate::store::AuctionStore;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, warn};
// endregion: --- Imports

// region:    --- Outcome

/// 입찰 처리 결과
#[derive(Debug, Clone)]
pub enum BidOutcome {
    Accepted {
        auction: Auction,
        bid: Bid,
        bid_count: i64,
    },
    Rejected {
        code: &'static str,
        message: String,
        retry_after: Option<i64>,
        /// 일시적 장애(저장소 불가, 잠금 혼잡): 클라이언트 재시도 대상
        retryable: bool,
    },
}

impl BidOutcome {
    fn rejected(code: &'static str, message: String) -> Self {
        BidOutcome::Rejected {
            code,
            message,
            retry_after: None,
            retryable: false,
        }
    }

    fn transient(code: &'static str, message: String) -> Self {
        BidOutcome::Rejected {
            code,
            message,
            retry_after: None,
            retryable: true,
        }
    }
}

// endregion: --- Outcome

// region:    --- Bid Resolver

pub struct BidResolver {
    store: Arc<dyn AuctionStore>,
    audit: AuditWriter,
    rooms: Arc<RoomRegistry>,
    policy: BidPolicy,
    lock_timeout: Duration,
    /// 경매 id -> 직렬화 핸들. 바깥 잠금은 핸들 조회 동안만 잡는다.
    locks: Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>,
}

impl BidResolver {
    pub fn new(
        store: Arc<dyn AuctionStore>,
        audit: AuditWriter,
        rooms: Arc<RoomRegistry>,
        policy: BidPolicy,
        lock_timeout: Duration,
    ) -> Self {
        Self {
            store,
            audit,
            rooms,
            policy,
            lock_timeout,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// 경매별 직렬화 핸들 조회(없으면 생성)
    fn lock_for(&self, auction_id: i64) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap();
        Arc::clone(locks.entry(auction_id).or_default())
    }

    /// 입찰 처리
    /// 핸들 획득 -> 상태 조회 -> 검증 -> 커밋 -> 감사 기록 -> 브로드캐스트 순서.
    /// 브로드캐스트는 핸들을 쥔 채 호출되므로 방 이벤트 순서 = 수락 순서.
    pub async fn place_bid(
        &self,
        auction_id: i64,
        bidder_id: i64,
        amount: i64,
        now: DateTime<Utc>,
        meta: &ConnMeta,
    ) -> BidOutcome {
        let lock = self.lock_for(auction_id);
        let guard = match timeout(self.lock_timeout, lock.lock()).await {
            Ok(guard) => guard,
            Err(_) => {
                // 같은 경매가 혼잡: 무한 대기 대신 일시적 거절
                warn!(
                    "{:<12} --> 직렬화 핸들 획득 시간 초과: auction={} bidder={}",
                    "Resolver", auction_id, bidder_id
                );
                self.audit
                    .record(BidAuditRecord::new(
                        auction_id,
                        bidder_id,
                        amount,
                        AuditStatus::RejectedInvalid,
                        "직렬화 핸들 획득 시간 초과",
                        now,
                        meta,
                    ))
                    .await;
                return BidOutcome::transient(
                    "AUCTION_BUSY",
                    "경매가 혼잡합니다. 잠시 후 다시 시도해주세요.".to_string(),
                );
            }
        };

        let outcome = self
            .place_bid_locked(auction_id, bidder_id, amount, now, meta)
            .await;
        drop(guard);
        outcome
    }

    /// 임계 구역 본체(핸들을 쥔 상태에서만 호출)
    async fn place_bid_locked(
        &self,
        auction_id: i64,
        bidder_id: i64,
        amount: i64,
        now: DateTime<Utc>,
        meta: &ConnMeta,
    ) -> BidOutcome {
        // 현재 상태 조회
        let auction = match self.store.load_auction(auction_id).await {
            Ok(auction) => auction,
            Err(sqlx::Error::RowNotFound) => {
                self.audit
                    .record(BidAuditRecord::new(
                        auction_id,
                        bidder_id,
                        amount,
                        AuditStatus::RejectedInvalid,
                        "존재하지 않는 경매",
                        now,
                        meta,
                    ))
                    .await;
                return BidOutcome::rejected(
                    "AUCTION_NOT_FOUND",
                    "경매를 찾을 수 없습니다.".to_string(),
                );
            }
            Err(e) => {
                self.audit
                    .record(BidAuditRecord::new(
                        auction_id,
                        bidder_id,
                        amount,
                        AuditStatus::RejectedInvalid,
                        format!("저장소 조회 실패: {}", e),
                        now,
                        meta,
                    ))
                    .await;
                return BidOutcome::transient(
                    "STORE_UNAVAILABLE",
                    "일시적인 오류가 발생했습니다. 잠시 후 다시 시도해주세요.".to_string(),
                );
            }
        };

        // 검증
        let triggers_immediate_end =
            match validator::validate(&auction, amount, bidder_id, now, &self.policy) {
                Decision::Reject(reason) => {
                    self.audit
                        .record(BidAuditRecord::new(
                            auction_id,
                            bidder_id,
                            amount,
                            reason.audit_status(),
                            reason.message(),
                            now,
                            meta,
                        ))
                        .await;
                    // 거절은 요청자에게만 전달되고 브로드캐스트되지 않는다
                    return BidOutcome::rejected(reason.code(), reason.message());
                }
                Decision::Accept {
                    triggers_immediate_end,
                } => triggers_immediate_end,
            };

        // 즉시 구매는 즉시 구매 가격으로 체결하고 같은 임계 구역에서 종료시킨다
        let final_amount = if triggers_immediate_end {
            auction.buy_now_price.unwrap_or(amount)
        } else {
            amount
        };

        let mut updated = auction.clone();
        updated.current_bid = Some(final_amount);
        updated.current_bidder_id = Some(bidder_id);
        if triggers_immediate_end {
            updated.status = AuctionStatus::Ended;
        }

        let bid = Bid {
            id: 0,
            auction_id,
            bidder_id,
            amount: final_amount,
            placed_at: now,
            is_winning: true,
        };

        // 커밋(경매 갱신 + 입찰 행 추가, 단일 트랜잭션)
        // 실패 시 상태는 그대로이고 절대 성공으로 보고하지 않는다
        let (stored_bid, bid_count) = match self.store.commit_bid(&updated, &bid).await {
            Ok(result) => result,
            Err(e) => {
                error!(
                    "{:<12} --> 입찰 커밋 실패: auction={} bidder={} err={:?}",
                    "Resolver", auction_id, bidder_id, e
                );
                self.audit
                    .record(BidAuditRecord::new(
                        auction_id,
                        bidder_id,
                        amount,
                        AuditStatus::RejectedInvalid,
                        format!("저장소 커밋 실패: {}", e),
                        now,
                        meta,
                    ))
                    .await;
                return BidOutcome::transient(
                    "STORE_UNAVAILABLE",
                    "일시적인 오류가 발생했습니다. 잠시 후 다시 시도해주세요.".to_string(),
                );
            }
        };

        self.audit
            .record(BidAuditRecord::new(
                auction_id,
                bidder_id,
                amount,
                AuditStatus::Success,
                "입찰 수락",
                now,
                meta,
            ))
            .await;

        info!(
            "{:<12} --> 입찰 수락: auction={} bidder={} amount={} count={}",
            "Resolver", auction_id, bidder_id, final_amount, bid_count
        );

        // 핸들을 쥔 채 브로드캐스트: 방 이벤트 순서가 수락 순서와 일치
        self.rooms.publish(
            auction_id,
            &ServerEvent::BidAccepted {
                auction_id,
                amount: final_amount,
                bidder_id,
                bid_count,
            },
        );

        if triggers_immediate_end {
            info!(
                "{:<12} --> 즉시 구매 낙찰: auction={} winner={} amount={}",
                "Resolver", auction_id, bidder_id, final_amount
            );
            self.rooms.publish(
                auction_id,
                &ServerEvent::AuctionEnded {
                    auction_id,
                    winner_id: Some(bidder_id),
                    final_amount: Some(final_amount),
                    reserve_met: updated.reserve_met(),
                },
            );
        }

        BidOutcome::Accepted {
            auction: updated,
            bid: stored_bid,
            bid_count,
        }
    }

    /// 종료 시각이 지난 경매를 같은 직렬화 핸들을 통해 확정한다.
    /// 마감 직전 입찰과의 경합은 핸들의 상호 배제로 결정적으로 풀린다.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, sqlx::Error> {
        let expired = self.store.list_expired(now).await?;
        let mut finalized = 0;
        for auction_id in expired {
            match self.finalize_auction(auction_id, now).await {
                Ok(true) => finalized += 1,
                Ok(false) => {}
                Err(e) => error!(
                    "{:<12} --> 경매 종료 확정 실패 id={}: {:?}",
                    "Resolver", auction_id, e
                ),
            }
        }
        Ok(finalized)
    }

    /// 경매 하나 종료 확정. 핸들 획득 후 재확인하므로 조기 종료가 없다.
    pub async fn finalize_auction(
        &self,
        auction_id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let lock = self.lock_for(auction_id);
        let guard = match timeout(self.lock_timeout, lock.lock()).await {
            Ok(guard) => guard,
            // 혼잡하면 이번 스윕은 건너뛰고 다음 스윕에서 다시 시도
            Err(_) => return Ok(false),
        };

        let auction = self.store.load_auction(auction_id).await?;
        if auction.status != AuctionStatus::Active || now < auction.ends_at {
            return Ok(false);
        }

        self.store.finalize_auction(auction_id).await?;

        info!(
            "{:<12} --> 경매 종료: auction={} winner={:?} amount={:?}",
            "Resolver", auction_id, auction.current_bidder_id, auction.current_bid
        );

        self.rooms.publish(
            auction_id,
            &ServerEvent::AuctionEnded {
                auction_id,
                winner_id: auction.current_bidder_id,
                final_amount: auction.current_bid,
                reserve_met: auction.reserve_met(),
            },
        );

        drop(guard);
        Ok(true)
    }
}

// endregion: --- Bid Resolver
