// region:    --- Imports
use bidding_engine::audit::AuditWriter;
use bidding_engine::bidding::resolver::BidResolver;
use bidding_engine::bidding::validator::BidPolicy;
use bidding_engine::collaborators::{HttpIdentityVerifier, HttpProductCatalog};
use bidding_engine::config::EngineConfig;
use bidding_engine::database::DatabaseManager;
use bidding_engine::gateway::{self, AppState};
use bidding_engine::handlers;
use bidding_engine::ratelimit::RateLimiter;
use bidding_engine::rooms::RoomRegistry;
use bidding_engine::scheduler::ExpiryScheduler;
use bidding_engine::store::PostgresAuctionStore;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
// endregion: --- Imports

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // logging 초기화
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    let config = Arc::new(EngineConfig::from_env());

    // DatabaseManager 생성
    let db_manager = Arc::new(DatabaseManager::new().await);

    // 데이터베이스 초기화
    if let Err(e) = db_manager.initialize_database().await {
        error!("{:<12} --> 데이터베이스 초기화 실패: {:?}", "Main", e);
        return Err(e.into());
    }
    info!("{:<12} --> 데이터베이스 초기화 성공", "Main");

    // 방 레지스트리는 서비스 시작 시 하나 만들어 주입한다(전역 상태 금지)
    let rooms = Arc::new(RoomRegistry::new());
    let store = Arc::new(PostgresAuctionStore::new(Arc::clone(&db_manager)));
    let audit = AuditWriter::new(store.clone());
    let limiter = Arc::new(RateLimiter::new(
        config.rate_limit_capacity,
        config.rate_limit_window_secs,
    ));

    // 입찰 리졸버: 경매별 단일 직렬화 지점
    let resolver = Arc::new(BidResolver::new(
        store,
        audit.clone(),
        Arc::clone(&rooms),
        BidPolicy {
            allow_self_outbid: config.allow_self_outbid,
        },
        Duration::from_millis(config.lock_timeout_ms),
    ));

    // 만료 스케줄러 시작
    let scheduler = ExpiryScheduler::new(Arc::clone(&resolver), config.sweep_interval_secs);
    scheduler.start();
    info!(
        "{:<12} --> 만료 스케줄러 시작(주기 {}초)",
        "Main", config.sweep_interval_secs
    );

    // 외부 협력자 클라이언트
    let verifier = Arc::new(HttpIdentityVerifier::new(config.auth_service_url.clone()));
    let catalog = Arc::new(HttpProductCatalog::new(config.catalog_service_url.clone()));

    let app_state = AppState {
        db: db_manager,
        resolver,
        rooms,
        limiter,
        verifier,
        catalog,
        audit,
        config: Arc::clone(&config),
    };

    // 테스트 페이지를 위한 cors 설정
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // 라우터 설정
    let routes_all = Router::new()
        .route("/ws", get(gateway::ws_handler))
        .route("/auctions", get(handlers::handle_get_auctions))
        .route("/auction/:id", get(handlers::handle_get_auction))
        .route("/auction/:id/bids", get(handlers::handle_get_bid_history))
        .layer(cors)
        .with_state(app_state);

    // 리스너 생성
    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    // 서버 실행(감사 기록용 원격 주소 전달)
    if let Err(err) = axum::serve(
        listener,
        routes_all.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    {
        error!("{:<12} --> Server error: {}", "Main", err);
    }
    Ok(())
}
// endregion: --- Main
