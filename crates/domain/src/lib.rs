//! 聊天投递层的核心领域模型
//!
//! 包含用户身份、聊天室、私聊、消息和频道键等实体，以及领域层错误类型。

pub mod channel;
pub mod chat_room;
pub mod errors;
pub mod message;
pub mod private_chat;
pub mod user;
pub mod value_objects;

// 重新导出常用类型
pub use channel::ChannelKey;
pub use chat_room::Room;
pub use errors::{DomainError, RepositoryError};
pub use message::{FileAttachment, FileKind, Message, MessageTarget};
pub use private_chat::PrivateChat;
pub use user::{UserIdentity, UserProfile, UserStatus};
pub use value_objects::{MessageId, PrivateChatId, RoomId, Timestamp, UserId};
