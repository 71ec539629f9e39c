use domain::{DomainError, RepositoryError};
use thiserror::Error;

/// 会话内操作失败的分类，决定回给调用方的错误信号。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Authentication,
    AccessDenied,
    Validation,
    Persistence,
    NotFound,
}

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("authentication failed")]
    Authentication,
    #[error("invalid payload: {0}")]
    Validation(String),
}

impl ApplicationError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApplicationError::Validation(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApplicationError::Authentication => ErrorKind::Authentication,
            ApplicationError::Validation(_) => ErrorKind::Validation,
            ApplicationError::Domain(err) => match err {
                DomainError::InvalidArgument { .. } => ErrorKind::Validation,
                DomainError::RoomNotFound
                | DomainError::PrivateChatNotFound
                | DomainError::MessageNotFound => ErrorKind::NotFound,
                DomainError::NotAParticipant | DomainError::RoomIsPrivate => {
                    ErrorKind::AccessDenied
                }
            },
            ApplicationError::Repository(err) => match err {
                RepositoryError::NotFound => ErrorKind::NotFound,
                RepositoryError::Conflict | RepositoryError::Storage { .. } => {
                    ErrorKind::Persistence
                }
            },
        }
    }

    /// 发送给出错会话的 `error` 事件文本，不泄露存储细节。
    pub fn client_message(&self) -> String {
        match self.kind() {
            ErrorKind::Authentication => "Authentication error".to_owned(),
            ErrorKind::AccessDenied => "Access denied".to_owned(),
            ErrorKind::Persistence => "Failed to process request".to_owned(),
            ErrorKind::Validation | ErrorKind::NotFound => self.detail(),
        }
    }

    fn detail(&self) -> String {
        match self {
            ApplicationError::Domain(err) => err.to_string(),
            ApplicationError::Repository(err) => err.to_string(),
            ApplicationError::Validation(message) => message.clone(),
            other => other.to_string(),
        }
    }
}
