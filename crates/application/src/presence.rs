use domain::UserId;

use crate::error::ApplicationError;
use crate::session::SessionId;

/// 在线状态登记表
///
/// 每个用户最多对应一个当前会话，后建立的连接覆盖先前的登记（last-connection-wins）。
/// 被覆盖的会话不会被关闭，仍然可以收发频道消息。
#[async_trait::async_trait]
pub trait PresenceRegistry: Send + Sync {
    /// 登记用户的当前会话，返回被替换的旧会话
    async fn set(
        &self,
        user_id: UserId,
        session_id: SessionId,
    ) -> Result<Option<SessionId>, ApplicationError>;

    async fn get(&self, user_id: UserId) -> Result<Option<SessionId>, ApplicationError>;

    /// 无条件移除用户的登记，不校验是否为当前会话
    async fn remove(&self, user_id: UserId) -> Result<Option<SessionId>, ApplicationError>;
}

pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use tokio::sync::RwLock;

    #[derive(Default)]
    pub struct MemoryPresenceRegistry {
        sessions: RwLock<HashMap<UserId, SessionId>>,
    }

    impl MemoryPresenceRegistry {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait::async_trait]
    impl PresenceRegistry for MemoryPresenceRegistry {
        async fn set(
            &self,
            user_id: UserId,
            session_id: SessionId,
        ) -> Result<Option<SessionId>, ApplicationError> {
            Ok(self.sessions.write().await.insert(user_id, session_id))
        }

        async fn get(&self, user_id: UserId) -> Result<Option<SessionId>, ApplicationError> {
            Ok(self.sessions.read().await.get(&user_id).copied())
        }

        async fn remove(&self, user_id: UserId) -> Result<Option<SessionId>, ApplicationError> {
            Ok(self.sessions.write().await.remove(&user_id))
        }
    }
}
