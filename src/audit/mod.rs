/// 감사 기록 작성기
/// 모든 입찰 시도(수락/거절)를 수락 판정과 동기적으로 기록한다.
/// 기록 저장 실패는 로그로 남길 뿐 판정 자체를 바꾸지 않는다
/// (거절은 저장소 상태와 무관하게 권위 있는 결과다).
// region:    --- Imports
use crate::auction::model::BidAuditRecord;
use crate::store::AuctionStore;
use std::sync::Arc;
use tracing::{debug, error};
// endregion: --- Imports

// region:    --- Audit Writer

#[derive(Clone)]
pub struct AuditWriter {
    store: Arc<dyn AuctionStore>,
}

impl AuditWriter {
    pub fn new(store: Arc<dyn AuctionStore>) -> Self {
        Self { store }
    }

    /// 시도 1건당 정확히 1건 기록
    pub async fn record(&self, record: BidAuditRecord) {
        debug!(
            "{:<12} --> 감사 기록: auction={} bidder={} status={}",
            "Audit",
            record.auction_id,
            record.bidder_id,
            record.status.as_str()
        );
        if let Err(e) = self.store.append_audit(&record).await {
            error!(
                "{:<12} --> 감사 기록 저장 실패(판정은 유지): auction={} bidder={} err={:?}",
                "Audit", record.auction_id, record.bidder_id, e
            );
        }
    }
}

// endregion: --- Audit Writer
