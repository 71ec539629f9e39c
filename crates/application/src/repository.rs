//! 持久化网关契约
//!
//! 投递层只依赖这些 CRUD 操作，具体存储由基础设施层提供。

use async_trait::async_trait;
use domain::{
    Message, MessageId, PrivateChat, PrivateChatId, RepositoryError, Room, RoomId, Timestamp,
    UserId, UserIdentity, UserStatus,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> Result<Option<UserIdentity>, RepositoryError>;
    async fn update_presence(
        &self,
        id: UserId,
        status: UserStatus,
        last_seen: Timestamp,
    ) -> Result<(), RepositoryError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoomRepository: Send + Sync {
    async fn find_by_id(&self, id: RoomId) -> Result<Option<Room>, RepositoryError>;
    async fn list_for_member(&self, user_id: UserId) -> Result<Vec<Room>, RepositoryError>;
    /// 返回成员集合是否发生变化
    async fn add_member(&self, room_id: RoomId, user_id: UserId) -> Result<bool, RepositoryError>;
    async fn remove_member(&self, room_id: RoomId, user_id: UserId)
        -> Result<bool, RepositoryError>;
    /// 无条件覆盖 lastMessage / lastActivity，没有版本校验
    async fn touch_last_message(
        &self,
        room_id: RoomId,
        message_id: MessageId,
        at: Timestamp,
    ) -> Result<(), RepositoryError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PrivateChatRepository: Send + Sync {
    async fn find_by_id(&self, id: PrivateChatId) -> Result<Option<PrivateChat>, RepositoryError>;
    async fn list_for_participant(
        &self,
        user_id: UserId,
    ) -> Result<Vec<PrivateChat>, RepositoryError>;
    async fn touch_last_message(
        &self,
        chat_id: PrivateChatId,
        message_id: MessageId,
        at: Timestamp,
    ) -> Result<(), RepositoryError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    // 保存消息，返回落库后的记录
    async fn create(&self, message: Message) -> Result<Message, RepositoryError>;
    async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>, RepositoryError>;
    /// 追加已读用户，返回 readBy 是否增长
    async fn add_reader(&self, id: MessageId, user_id: UserId) -> Result<bool, RepositoryError>;
}
