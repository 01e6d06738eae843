/// 입찰자별 속도 제한기
/// 슬라이딩 윈도우 시도 카운터: 윈도우 내 N회 초과 시도는 Resolver에 닿기 전에
/// 차단된다. 검증 전에 카운트하므로 반복되는 무효 입찰도 쿼터를 소모한다.
/// 범위는 경매와 무관하게 입찰자 전역(한 신원이 경매 두 곳을 두드려도 한 명의
/// 남용자다) - DESIGN.md에 기록된 선택.
// region:    --- Imports
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tracing::warn;
// endregion: --- Imports

// region:    --- Rate Limiter

pub struct RateLimiter {
    capacity: usize,
    window: Duration,
    attempts: Mutex<HashMap<i64, VecDeque<DateTime<Utc>>>>,
}

impl RateLimiter {
    pub fn new(capacity: usize, window_secs: i64) -> Self {
        Self {
            capacity,
            window: Duration::seconds(window_secs),
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// 시도 허용 여부 검사. 거절 시 재시도 가능 시각까지 남은 초를 반환한다.
    /// 허용된 호출은 그 자체로 시도 1회를 소모한다.
    pub fn check(&self, bidder_id: i64, now: DateTime<Utc>) -> Result<(), i64> {
        let mut attempts = self.attempts.lock().unwrap();
        let window_start = now - self.window;
        let log = attempts.entry(bidder_id).or_default();

        // 윈도우를 벗어난 시도 제거
        while log.front().map(|t| *t <= window_start).unwrap_or(false) {
            log.pop_front();
        }

        if log.len() >= self.capacity {
            // 가장 오래된 시도가 윈도우를 벗어나는 시점까지 대기
            let oldest = *log.front().unwrap();
            let retry_after = (oldest + self.window - now).num_seconds().max(1);
            warn!(
                "{:<12} --> 속도 제한 초과: bidder={} retry_after={}s",
                "RateLimit", bidder_id, retry_after
            );
            return Err(retry_after);
        }

        log.push_back(now);
        Ok(())
    }
}

// endregion: --- Rate Limiter

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;

    /// 윈도우 내 N번째 시도까지 허용, N+1번째 거절, 다음 윈도우 첫 시도 허용
    #[test]
    fn test_window_boundary() {
        let limiter = RateLimiter::new(3, 60);
        let now = Utc::now();

        for _ in 0..3 {
            assert!(limiter.check(1, now).is_ok());
        }
        let retry_after = limiter.check(1, now).unwrap_err();
        assert!(retry_after >= 1 && retry_after <= 60);

        // 윈도우가 지나면 다시 허용
        let later = now + Duration::seconds(61);
        assert!(limiter.check(1, later).is_ok());
    }

    /// 입찰자별로 독립적으로 계산된다
    #[test]
    fn test_per_bidder_isolation() {
        let limiter = RateLimiter::new(1, 60);
        let now = Utc::now();
        assert!(limiter.check(1, now).is_ok());
        assert!(limiter.check(1, now).is_err());
        assert!(limiter.check(2, now).is_ok());
    }
}
// endregion: --- Tests
