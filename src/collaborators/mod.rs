/// 외부 협력자 인터페이스
/// 신원 검증과 상품 카탈로그는 별도 서비스가 소유한다. 여기서는 계약(트레이트)과
/// HTTP 클라이언트 구현체만 둔다. 카탈로그는 읽기 전용이며 절대 변경하지 않는다.
// region:    --- Imports
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;
// endregion: --- Imports

// region:    --- Identity Verification

/// 신원 검증 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Verified { bidder_id: i64, is_banned: bool },
    Invalid,
}

/// 신원 검증 트레이트
/// 게이트웨이는 차단되었거나 검증 불가한 신원의 커맨드를 속도 제한기에
/// 도달하기 전에 거절한다.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity, String>;
}

/// 신원 검증 HTTP 클라이언트
pub struct HttpIdentityVerifier {
    client: reqwest::Client,
    base_url: String,
}

impl HttpIdentityVerifier {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }
}

#[derive(Deserialize)]
struct VerifyResponse {
    bidder_id: i64,
    is_banned: bool,
}

#[async_trait]
impl IdentityVerifier for HttpIdentityVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, String> {
        let response = self
            .client
            .post(format!("{}/verify", self.base_url))
            .json(&serde_json::json!({ "token": token }))
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Ok(Identity::Invalid);
        }

        let body: VerifyResponse = response
            .error_for_status()
            .map_err(|e| e.to_string())?
            .json()
            .await
            .map_err(|e| e.to_string())?;

        Ok(Identity::Verified {
            bidder_id: body.bidder_id,
            is_banned: body.is_banned,
        })
    }
}

// endregion: --- Identity Verification

// region:    --- Product Catalog

/// 브로드캐스트 페이로드용 상품 표시 메타데이터
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: i64,
    pub title: String,
    pub image_url: Option<String>,
}

/// 상품 카탈로그 조회 트레이트(읽기 전용)
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn product_summary(&self, product_id: i64) -> Result<ProductSummary, String>;

    /// 조회 실패 시 None으로 강등(표시 메타데이터는 없어도 방 입장은 진행)
    async fn summary_or_none(&self, product_id: i64) -> Option<ProductSummary> {
        match self.product_summary(product_id).await {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!(
                    "{:<12} --> 상품 메타데이터 조회 실패 product={}: {}",
                    "Catalog", product_id, e
                );
                None
            }
        }
    }
}

/// 상품 카탈로그 HTTP 클라이언트
pub struct HttpProductCatalog {
    client: reqwest::Client,
    base_url: String,
}

impl HttpProductCatalog {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl ProductCatalog for HttpProductCatalog {
    async fn product_summary(&self, product_id: i64) -> Result<ProductSummary, String> {
        self.client
            .get(format!("{}/products/{}", self.base_url, product_id))
            .send()
            .await
            .map_err(|e| e.to_string())?
            .error_for_status()
            .map_err(|e| e.to_string())?
            .json::<ProductSummary>()
            .await
            .map_err(|e| e.to_string())
    }
}

// endregion: --- Product Catalog
