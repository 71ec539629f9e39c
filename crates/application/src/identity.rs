use async_trait::async_trait;
use domain::UserIdentity;

use crate::error::ApplicationError;

/// 身份校验器，由外部认证子系统实现。
///
/// 校验失败一律返回 `ApplicationError::Authentication`。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, credential: &str) -> Result<UserIdentity, ApplicationError>;
}
