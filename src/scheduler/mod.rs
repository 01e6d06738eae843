/// 만료 스케줄러
/// 고정 주기 스윕으로 종료 시각이 지난 Active 경매를 찾아 Resolver의
/// 경매별 직렬화 핸들을 통해 종료를 확정한다. 시각 비교는 전부 UTC 인스턴트로만
/// 하므로 서버 타임존과 무관하게 조기/지연 종료가 없다.
// region:    --- Imports
use crate::bidding::resolver::BidResolver;
use chrono::Utc;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{debug, error};
// endregion: --- Imports

// region:    --- Expiry Scheduler

pub struct ExpiryScheduler {
    resolver: Arc<BidResolver>,
    sweep_interval: Duration,
}

impl ExpiryScheduler {
    pub fn new(resolver: Arc<BidResolver>, sweep_interval_secs: u64) -> Self {
        Self {
            resolver,
            sweep_interval: Duration::from_secs(sweep_interval_secs),
        }
    }

    /// 스케줄러 시작
    pub fn start(&self) {
        let resolver = Arc::clone(&self.resolver);
        let sweep_interval = self.sweep_interval;
        tokio::spawn(async move {
            let mut interval = interval(sweep_interval);
            loop {
                interval.tick().await;
                match resolver.sweep_expired(Utc::now()).await {
                    Ok(finalized) if finalized > 0 => {
                        debug!("{:<12} --> 종료 확정 {}건", "Scheduler", finalized);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("{:<12} --> 만료 스윕 중 오류 발생: {:?}", "Scheduler", e);
                    }
                }
            }
        });
    }
}

// endregion: --- Expiry Scheduler
