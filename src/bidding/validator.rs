/// 입찰 검증기
/// 경매 상태와 제안 금액만으로 수락/거절을 결정하는 순수 함수
/// I/O 없음, 같은 입력이면 항상 같은 결과
// region:    --- Imports
use crate::auction::model::{Auction, AuctionStatus, AuditStatus};
use chrono::{DateTime, Utc};
// endregion: --- Imports

// region:    --- Policy

/// 입찰 정책
/// 자기 자신의 최고 입찰을 다시 올리는 것(self-outbid)은 기본적으로 거절한다.
/// 가격 부풀리기 방지 목적의 정책적 선택이며 설정으로 완화할 수 있다.
#[derive(Debug, Clone, Copy)]
pub struct BidPolicy {
    pub allow_self_outbid: bool,
}

impl Default for BidPolicy {
    fn default() -> Self {
        Self {
            allow_self_outbid: false,
        }
    }
}

// endregion: --- Policy

// region:    --- Decision

/// 거절 사유
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// 종료되었거나 종료 시각이 지난 경매
    Ended,
    /// 이미 최고 입찰자
    AlreadyHighest,
    /// 시작 가격 미만
    BelowStartingPrice { starting_price: i64 },
    /// 최소 인상 단위 미달
    IncrementTooSmall { minimum: i64 },
}

impl RejectReason {
    /// 클라이언트에 내려가는 안정적인 코드
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::Ended => "ALREADY_ENDED",
            RejectReason::AlreadyHighest => "ALREADY_HIGHEST",
            RejectReason::BelowStartingPrice { .. } => "BELOW_STARTING_PRICE",
            RejectReason::IncrementTooSmall { .. } => "INCREMENT_TOO_SMALL",
        }
    }

    /// 사용자에게 보여줄 사유(거절은 항상 이유를 설명한다)
    pub fn message(&self) -> String {
        match self {
            RejectReason::Ended => "경매가 이미 종료되었습니다.".to_string(),
            RejectReason::AlreadyHighest => "이미 최고 입찰자입니다.".to_string(),
            RejectReason::BelowStartingPrice { starting_price } => {
                format!("입찰 금액이 시작 가격({})보다 낮습니다.", starting_price)
            }
            RejectReason::IncrementTooSmall { minimum } => {
                format!("최소 {} 이상 입찰해야 합니다.", minimum)
            }
        }
    }

    /// 감사 기록 상태 매핑
    pub fn audit_status(&self) -> AuditStatus {
        match self {
            RejectReason::Ended => AuditStatus::RejectedEnded,
            RejectReason::AlreadyHighest => AuditStatus::RejectedInvalid,
            RejectReason::BelowStartingPrice { .. } => AuditStatus::RejectedLowAmount,
            RejectReason::IncrementTooSmall { .. } => AuditStatus::RejectedLowAmount,
        }
    }
}

/// 검증 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Accept {
        /// 즉시 구매 가격 이상 입찰: 같은 임계 구역 안에서 경매를 종료시켜야 함
        triggers_immediate_end: bool,
    },
    Reject(RejectReason),
}

// endregion: --- Decision

// region:    --- Validate

/// 입찰 검증(규칙은 순서대로 검사하고 첫 실패가 결과가 된다)
pub fn validate(
    auction: &Auction,
    proposed_amount: i64,
    bidder_id: i64,
    now: DateTime<Utc>,
    policy: &BidPolicy,
) -> Decision {
    // 1. 종료 여부: 상태가 Active가 아니거나 종료 시각이 지났으면 거절
    if auction.status != AuctionStatus::Active || now >= auction.ends_at {
        return Decision::Reject(RejectReason::Ended);
    }

    // 2. 자기 자신의 최고 입찰 재인상 금지(정책으로 완화 가능)
    if !policy.allow_self_outbid && auction.current_bidder_id == Some(bidder_id) {
        return Decision::Reject(RejectReason::AlreadyHighest);
    }

    // 3. 시작 가격 미만 거절
    if proposed_amount < auction.starting_price {
        return Decision::Reject(RejectReason::BelowStartingPrice {
            starting_price: auction.starting_price,
        });
    }

    // 4. 현재 입찰가 + 최소 인상 단위 미달 거절
    if let Some(current) = auction.current_bid {
        let minimum = current + auction.bid_increment;
        if proposed_amount < minimum {
            return Decision::Reject(RejectReason::IncrementTooSmall { minimum });
        }
    }

    // 5. 수락(즉시 구매 가격 이상이면 즉시 종료 플래그 포함)
    let triggers_immediate_end = match auction.buy_now_price {
        Some(buy_now) => proposed_amount >= buy_now,
        None => false,
    };
    Decision::Accept {
        triggers_immediate_end,
    }
}

// endregion: --- Validate

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn test_auction(now: DateTime<Utc>) -> Auction {
        Auction {
            id: 1,
            product_id: 10,
            starting_price: 100,
            reserve_price: None,
            buy_now_price: None,
            current_bid: None,
            current_bidder_id: None,
            bid_increment: 10,
            starts_at: now - Duration::hours(1),
            ends_at: now + Duration::hours(1),
            status: AuctionStatus::Active,
        }
    }

    /// 첫 입찰은 시작 가격과 같아도 수락된다
    #[test]
    fn test_first_bid_at_starting_price_accepted() {
        let now = Utc::now();
        let auction = test_auction(now);
        let decision = validate(&auction, 100, 1, now, &BidPolicy::default());
        assert_eq!(
            decision,
            Decision::Accept {
                triggers_immediate_end: false
            }
        );
    }

    /// 규칙 순서: 종료된 경매는 금액과 무관하게 가장 먼저 거절된다
    #[test]
    fn test_ended_checked_first() {
        let now = Utc::now();
        let mut auction = test_auction(now);
        auction.status = AuctionStatus::Ended;
        let decision = validate(&auction, 1, 1, now, &BidPolicy::default());
        assert_eq!(decision, Decision::Reject(RejectReason::Ended));
    }

    /// 종료 시각 정각(now == ends_at)에 도착한 입찰은 거절된다
    #[test]
    fn test_bid_at_exact_end_instant_rejected() {
        let now = Utc::now();
        let mut auction = test_auction(now);
        auction.ends_at = now;
        let decision = validate(&auction, 200, 1, now, &BidPolicy::default());
        assert_eq!(decision, Decision::Reject(RejectReason::Ended));
    }

    /// 종료 시각 비교는 오프셋이 포함된 타임스탬프도 UTC 인스턴트로만 비교한다
    #[test]
    fn test_ends_at_compared_as_utc_instant() {
        // 서울 기준 18:00 = UTC 09:00
        let ends_at = DateTime::parse_from_rfc3339("2026-03-01T18:00:00+09:00")
            .unwrap()
            .with_timezone(&Utc);
        let mut auction = test_auction(ends_at);
        auction.ends_at = ends_at;

        // UTC 08:59 -> 아직 진행 중
        let before = Utc.with_ymd_and_hms(2026, 3, 1, 8, 59, 0).unwrap();
        assert!(matches!(
            validate(&auction, 100, 1, before, &BidPolicy::default()),
            Decision::Accept { .. }
        ));

        // UTC 09:00 -> 종료
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        assert_eq!(
            validate(&auction, 100, 1, at, &BidPolicy::default()),
            Decision::Reject(RejectReason::Ended)
        );
    }

    /// 자기 자신의 최고 입찰 재인상은 기본 정책에서 거절된다
    #[test]
    fn test_self_outbid_rejected_by_default() {
        let now = Utc::now();
        let mut auction = test_auction(now);
        auction.current_bid = Some(100);
        auction.current_bidder_id = Some(7);
        let decision = validate(&auction, 200, 7, now, &BidPolicy::default());
        assert_eq!(decision, Decision::Reject(RejectReason::AlreadyHighest));
    }

    /// 정책을 완화하면 자기 재인상도 일반 규칙으로만 검증된다
    #[test]
    fn test_self_outbid_allowed_by_policy() {
        let now = Utc::now();
        let mut auction = test_auction(now);
        auction.current_bid = Some(100);
        auction.current_bidder_id = Some(7);
        let policy = BidPolicy {
            allow_self_outbid: true,
        };
        assert!(matches!(
            validate(&auction, 110, 7, now, &policy),
            Decision::Accept { .. }
        ));
    }

    /// 시작 가격 미만 거절
    #[test]
    fn test_below_starting_price() {
        let now = Utc::now();
        let auction = test_auction(now);
        let decision = validate(&auction, 99, 1, now, &BidPolicy::default());
        assert_eq!(
            decision,
            Decision::Reject(RejectReason::BelowStartingPrice {
                starting_price: 100
            })
        );
    }

    /// 최소 인상 단위 미달 거절(현재가 100, 단위 10이면 110 미만 거절)
    #[test]
    fn test_increment_too_small() {
        let now = Utc::now();
        let mut auction = test_auction(now);
        auction.current_bid = Some(100);
        auction.current_bidder_id = Some(1);
        let decision = validate(&auction, 105, 2, now, &BidPolicy::default());
        assert_eq!(
            decision,
            Decision::Reject(RejectReason::IncrementTooSmall { minimum: 110 })
        );
    }

    /// 즉시 구매 가격 이상 입찰은 즉시 종료 플래그를 포함해 수락된다
    #[test]
    fn test_buy_now_triggers_immediate_end() {
        let now = Utc::now();
        let mut auction = test_auction(now);
        auction.buy_now_price = Some(500);
        let decision = validate(&auction, 500, 1, now, &BidPolicy::default());
        assert_eq!(
            decision,
            Decision::Accept {
                triggers_immediate_end: true
            }
        );
    }
}
// endregion: --- Tests
