use std::sync::Arc;

use domain::{UserId, UserStatus};
use tracing::{info, warn};

use crate::{
    clock::Clock,
    error::ApplicationError,
    events::{ServerEvent, StatusChange},
    hub::ChannelHub,
    presence::PresenceRegistry,
    repository::UserRepository,
    session::Session,
};

pub struct PresenceServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub presence: Arc<dyn PresenceRegistry>,
    pub hub: Arc<ChannelHub>,
    pub clock: Arc<dyn Clock>,
}

/// 维护在线登记并广播 `user:status`
pub struct PresenceService {
    deps: PresenceServiceDependencies,
}

impl PresenceService {
    pub fn new(deps: PresenceServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn session_started(&self, session: &Session) -> Result<(), ApplicationError> {
        let user_id = session.user_id();
        let replaced = self.deps.presence.set(user_id, session.id()).await?;
        if let Some(previous) = replaced {
            // 旧会话保持连接，只是不再作为该用户的当前会话
            info!(
                user_id = %user_id,
                previous_session = %previous,
                session_id = %session.id(),
                "新连接接管在线登记"
            );
        }

        self.persist_status(user_id, UserStatus::Online).await;
        self.announce(user_id, UserStatus::Online).await;
        Ok(())
    }

    /// 无条件清除登记，即使该用户已有更新的会话
    pub async fn session_ended(&self, session: &Session) -> Result<(), ApplicationError> {
        let user_id = session.user_id();
        self.deps.presence.remove(user_id).await?;
        self.persist_status(user_id, UserStatus::Offline).await;
        self.announce(user_id, UserStatus::Offline).await;
        Ok(())
    }

    async fn persist_status(&self, user_id: UserId, status: UserStatus) {
        let now = self.deps.clock.now();
        if let Err(err) = self
            .deps
            .user_repository
            .update_presence(user_id, status, now)
            .await
        {
            warn!(
                user_id = %user_id,
                status = status.as_str(),
                error = %err,
                "在线状态持久化失败"
            );
        }
    }

    async fn announce(&self, user_id: UserId, status: UserStatus) {
        let event = ServerEvent::UserStatus(StatusChange { user_id, status });
        let delivered = self.deps.hub.broadcast_all(&event).await;
        tracing::debug!(user_id = %user_id, status = status.as_str(), delivered, "broadcast user status");
    }
}
