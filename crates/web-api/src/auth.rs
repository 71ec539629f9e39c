//! JWT 认证模块
//!
//! 握手时校验 token 并加载用户身份，实现应用层的 [`IdentityVerifier`]。

use std::sync::Arc;

use application::{ApplicationError, IdentityVerifier, UserRepository};
use async_trait::async_trait;
use axum::http::HeaderMap;
use config::JwtConfig;
use domain::{UserId, UserIdentity};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

/// JWT Claims 结构
///
/// 用户标识写在 `sub`，同时兼容 `user_id` / `userId`。
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    #[serde(alias = "user_id", alias = "userId")]
    pub sub: Uuid,
    pub exp: i64, // 过期时间 (Unix timestamp)
}

#[derive(Clone)]
pub struct JwtIdentityVerifier {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    user_repository: Arc<dyn UserRepository>,
}

impl JwtIdentityVerifier {
    pub fn new(config: JwtConfig, user_repository: Arc<dyn UserRepository>) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_ref());
        let decoding_key = DecodingKey::from_secret(config.secret.as_ref());

        Self {
            config,
            encoding_key,
            decoding_key,
            user_repository,
        }
    }

    /// 生成 JWT token
    pub fn generate_token(&self, user_id: UserId) -> Result<String, ApiError> {
        let exp = chrono::Utc::now() + chrono::Duration::hours(self.config.expiration_hours);
        let claims = Claims {
            sub: Uuid::from(user_id),
            exp: exp.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|err| ApiError::internal_server_error(format!("Token generation failed: {err}")))
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, ApplicationError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|token_data| token_data.claims)
            .map_err(|err| {
                tracing::debug!(error = %err, "invalid token");
                ApplicationError::Authentication
            })
    }
}

#[async_trait]
impl IdentityVerifier for JwtIdentityVerifier {
    async fn verify(&self, credential: &str) -> Result<UserIdentity, ApplicationError> {
        let claims = self.verify_token(credential)?;
        self.user_repository
            .find_by_id(UserId::from(claims.sub))
            .await?
            .ok_or(ApplicationError::Authentication)
    }
}

/// 从握手请求中取出凭证：优先 `?token=`，其次 `Authorization: Bearer`
pub fn extract_credential(headers: &HeaderMap, query_token: Option<&str>) -> Option<String> {
    if let Some(token) = query_token.filter(|token| !token.is_empty()) {
        return Some(token.to_string());
    }

    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use application::memory::InMemoryStore;
    use axum::http::HeaderValue;
    use chrono::Utc;

    fn verifier(store: Arc<InMemoryStore>) -> JwtIdentityVerifier {
        JwtIdentityVerifier::new(
            JwtConfig {
                secret: "unit-test-secret-key-that-is-long-enough".into(),
                expiration_hours: 1,
            },
            store,
        )
    }

    #[tokio::test]
    async fn token_for_known_user_verifies() {
        let store = Arc::new(InMemoryStore::new());
        let user = UserIdentity::new(UserId::from(Uuid::new_v4()), "alice", None, Utc::now());
        store.insert_user(user.clone()).await;
        let verifier = verifier(store);

        let token = verifier.generate_token(user.id).unwrap();
        let identity = verifier.verify(&token).await.unwrap();
        assert_eq!(identity.id, user.id);
    }

    #[tokio::test]
    async fn token_for_deleted_user_is_rejected() {
        let verifier = verifier(Arc::new(InMemoryStore::new()));
        let token = verifier.generate_token(UserId::from(Uuid::new_v4())).unwrap();

        let err = verifier.verify(&token).await.unwrap_err();
        assert!(matches!(err, ApplicationError::Authentication));
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let verifier = verifier(Arc::new(InMemoryStore::new()));
        let err = verifier.verify("not-a-jwt").await.unwrap_err();
        assert!(matches!(err, ApplicationError::Authentication));
    }

    #[test]
    fn legacy_user_id_claim_is_accepted() {
        let id = Uuid::new_v4();
        let claims: Claims =
            serde_json::from_value(serde_json::json!({ "userId": id, "exp": 0 })).unwrap();
        assert_eq!(claims.sub, id);
    }

    #[test]
    fn query_token_wins_over_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer header-token"),
        );

        assert_eq!(
            extract_credential(&headers, Some("query-token")).as_deref(),
            Some("query-token")
        );
        assert_eq!(
            extract_credential(&headers, None).as_deref(),
            Some("header-token")
        );
        assert_eq!(extract_credential(&HeaderMap::new(), Some("")), None);
    }
}
