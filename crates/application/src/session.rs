use std::fmt;

use domain::{UserId, UserIdentity, UserProfile};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::events::ServerEvent;

/// 单个会话的出站队列，由传输层的写任务消费。
pub type OutboundSender = mpsc::UnboundedSender<ServerEvent>;
pub type OutboundReceiver = mpsc::UnboundedReceiver<ServerEvent>;

pub fn outbound_channel() -> (OutboundSender, OutboundReceiver) {
    mpsc::unbounded_channel()
}

/// 传输会话标识，仅在会话存活期间有效。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 已认证的会话：会话标识与校验后身份的绑定。
///
/// 绑定在整个会话生命周期内不可变，不支持中途重新认证或切换身份。
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    user: UserProfile,
}

impl Session {
    pub(crate) fn bind(identity: &UserIdentity) -> Self {
        Self {
            id: SessionId::generate(),
            user: identity.profile(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user.id
    }

    pub fn profile(&self) -> &UserProfile {
        &self.user
    }
}
