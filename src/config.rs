/// 엔진 설정
/// 환경 변수에서 읽고 없으면 기본값을 쓴다
// region:    --- Imports
use std::str::FromStr;
// endregion: --- Imports

// region:    --- Engine Config

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// 리스너 바인드 주소
    pub bind_addr: String,
    /// 신원 검증 서비스 주소
    pub auth_service_url: String,
    /// 상품 카탈로그 서비스 주소
    pub catalog_service_url: String,
    /// 윈도우당 입찰 시도 허용 횟수
    pub rate_limit_capacity: usize,
    /// 속도 제한 윈도우(초)
    pub rate_limit_window_secs: i64,
    /// 만료 스윕 주기(초)
    pub sweep_interval_secs: u64,
    /// 경매별 직렬화 핸들 획득 제한(밀리초)
    pub lock_timeout_ms: u64,
    /// 연결별 아웃바운드 큐 크기
    pub outbound_queue: usize,
    /// 자기 자신의 최고 입찰 재인상 허용 여부(정책)
    pub allow_self_outbid: bool,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:3000".to_string()),
            auth_service_url: env_or("AUTH_SERVICE_URL", "http://localhost:4000".to_string()),
            catalog_service_url: env_or(
                "CATALOG_SERVICE_URL",
                "http://localhost:4100".to_string(),
            ),
            rate_limit_capacity: env_or("BID_RATE_LIMIT", 10),
            rate_limit_window_secs: env_or("BID_RATE_WINDOW_SECS", 60),
            sweep_interval_secs: env_or("EXPIRY_SWEEP_INTERVAL_SECS", 1),
            lock_timeout_ms: env_or("BID_LOCK_TIMEOUT_MS", 2000),
            outbound_queue: env_or("WS_OUTBOUND_QUEUE", 64),
            allow_self_outbid: env_or("BIDDING_ALLOW_SELF_OUTBID", false),
        }
    }
}

/// 환경 변수 조회(파싱 실패 시 기본값)
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// endregion: --- Engine Config
