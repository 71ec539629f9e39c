use crate::value_objects::{Timestamp, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Online,
    Offline,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Online => "online",
            UserStatus::Offline => "offline",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "online" => Some(UserStatus::Online),
            "offline" => Some(UserStatus::Offline),
            _ => None,
        }
    }
}

/// 经过身份校验的用户。
///
/// 身份子系统拥有该记录，投递层只在连接建立和断开时改写 `status` 与 `last_seen`。
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UserIdentity {
    pub id: UserId,
    pub username: String,
    pub avatar: Option<String>,
    pub status: UserStatus,
    pub last_seen: Timestamp,
}

impl UserIdentity {
    pub fn new(
        id: UserId,
        username: impl Into<String>,
        avatar: Option<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            username: username.into(),
            avatar,
            status: UserStatus::Offline,
            last_seen: now,
        }
    }

    pub fn mark_online(&mut self, now: Timestamp) {
        self.status = UserStatus::Online;
        self.last_seen = now;
    }

    pub fn mark_offline(&mut self, now: Timestamp) {
        self.status = UserStatus::Offline;
        self.last_seen = now;
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username.clone(),
            avatar: self.avatar.clone(),
        }
    }
}

/// 可以广播给其他用户的公开资料。
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub avatar: Option<String>,
}
