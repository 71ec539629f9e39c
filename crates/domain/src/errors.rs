//! 领域模型错误定义
//!
//! 定义了领域实体和持久化契约可能返回的错误类型。

use thiserror::Error;

/// 领域模型错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// 参数不合法
    #[error("invalid argument {field}: {reason}")]
    InvalidArgument { field: String, reason: String },

    #[error("room not found")]
    RoomNotFound,

    #[error("private chat not found")]
    PrivateChatNotFound,

    #[error("message not found")]
    MessageNotFound,

    /// 发送者不是私聊的两名参与者之一
    #[error("user is not a participant of this private chat")]
    NotAParticipant,

    /// 非成员尝试加入私有房间
    #[error("room is private")]
    RoomIsPrivate,
}

impl DomainError {
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// 持久化网关错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,

    /// 唯一约束冲突
    #[error("record already exists")]
    Conflict,

    #[error("storage failure: {message}")]
    Storage { message: String },
}

impl RepositoryError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}
