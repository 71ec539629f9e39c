//! 内存实现的持久化网关（用于测试和本地调试）

use std::collections::HashMap;

use async_trait::async_trait;
use domain::{
    Message, MessageId, MessageTarget, PrivateChat, PrivateChatId, RepositoryError, Room, RoomId,
    Timestamp, UserId, UserIdentity, UserStatus,
};
use tokio::sync::RwLock;

use crate::repository::{
    MessageRepository, PrivateChatRepository, RoomRepository, UserRepository,
};

#[derive(Default)]
pub struct InMemoryStore {
    users: RwLock<HashMap<UserId, UserIdentity>>,
    rooms: RwLock<HashMap<RoomId, Room>>,
    private_chats: RwLock<HashMap<PrivateChatId, PrivateChat>>,
    messages: RwLock<HashMap<MessageId, Message>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user: UserIdentity) {
        self.users.write().await.insert(user.id, user);
    }

    pub async fn insert_room(&self, room: Room) {
        self.rooms.write().await.insert(room.id, room);
    }

    /// 同一无序用户对只能存在一个私聊
    pub async fn insert_private_chat(&self, chat: PrivateChat) -> Result<(), RepositoryError> {
        let mut chats = self.private_chats.write().await;
        if chats.values().any(|existing| existing.pair_key() == chat.pair_key()) {
            return Err(RepositoryError::Conflict);
        }
        chats.insert(chat.id, chat);
        Ok(())
    }

    pub async fn user(&self, id: UserId) -> Option<UserIdentity> {
        self.users.read().await.get(&id).cloned()
    }

    pub async fn room(&self, id: RoomId) -> Option<Room> {
        self.rooms.read().await.get(&id).cloned()
    }

    pub async fn private_chat(&self, id: PrivateChatId) -> Option<PrivateChat> {
        self.private_chats.read().await.get(&id).cloned()
    }

    pub async fn messages_for(&self, target: MessageTarget) -> Vec<Message> {
        let mut messages: Vec<Message> = self
            .messages
            .read()
            .await
            .values()
            .filter(|message| message.target == target)
            .cloned()
            .collect();
        messages.sort_by_key(|message| message.created_at);
        messages
    }

    pub async fn message_count(&self) -> usize {
        self.messages.read().await.len()
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_id(&self, id: UserId) -> Result<Option<UserIdentity>, RepositoryError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn update_presence(
        &self,
        id: UserId,
        status: UserStatus,
        last_seen: Timestamp,
    ) -> Result<(), RepositoryError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        match status {
            UserStatus::Online => user.mark_online(last_seen),
            UserStatus::Offline => user.mark_offline(last_seen),
        }
        Ok(())
    }
}

#[async_trait]
impl RoomRepository for InMemoryStore {
    async fn find_by_id(&self, id: RoomId) -> Result<Option<Room>, RepositoryError> {
        Ok(self.rooms.read().await.get(&id).cloned())
    }

    async fn list_for_member(&self, user_id: UserId) -> Result<Vec<Room>, RepositoryError> {
        Ok(self
            .rooms
            .read()
            .await
            .values()
            .filter(|room| room.is_member(user_id))
            .cloned()
            .collect())
    }

    async fn add_member(&self, room_id: RoomId, user_id: UserId) -> Result<bool, RepositoryError> {
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(&room_id).ok_or(RepositoryError::NotFound)?;
        Ok(room.add_member(user_id))
    }

    async fn remove_member(
        &self,
        room_id: RoomId,
        user_id: UserId,
    ) -> Result<bool, RepositoryError> {
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(&room_id).ok_or(RepositoryError::NotFound)?;
        Ok(room.remove_member(user_id))
    }

    async fn touch_last_message(
        &self,
        room_id: RoomId,
        message_id: MessageId,
        at: Timestamp,
    ) -> Result<(), RepositoryError> {
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(&room_id).ok_or(RepositoryError::NotFound)?;
        room.record_message(message_id, at);
        Ok(())
    }
}

#[async_trait]
impl PrivateChatRepository for InMemoryStore {
    async fn find_by_id(&self, id: PrivateChatId) -> Result<Option<PrivateChat>, RepositoryError> {
        Ok(self.private_chats.read().await.get(&id).cloned())
    }

    async fn list_for_participant(
        &self,
        user_id: UserId,
    ) -> Result<Vec<PrivateChat>, RepositoryError> {
        Ok(self
            .private_chats
            .read()
            .await
            .values()
            .filter(|chat| chat.is_participant(user_id))
            .cloned()
            .collect())
    }

    async fn touch_last_message(
        &self,
        chat_id: PrivateChatId,
        message_id: MessageId,
        at: Timestamp,
    ) -> Result<(), RepositoryError> {
        let mut chats = self.private_chats.write().await;
        let chat = chats.get_mut(&chat_id).ok_or(RepositoryError::NotFound)?;
        chat.record_message(message_id, at);
        Ok(())
    }
}

#[async_trait]
impl MessageRepository for InMemoryStore {
    async fn create(&self, message: Message) -> Result<Message, RepositoryError> {
        let mut messages = self.messages.write().await;
        if messages.contains_key(&message.id) {
            return Err(RepositoryError::Conflict);
        }
        messages.insert(message.id, message.clone());
        Ok(message)
    }

    async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>, RepositoryError> {
        Ok(self.messages.read().await.get(&id).cloned())
    }

    async fn add_reader(&self, id: MessageId, user_id: UserId) -> Result<bool, RepositoryError> {
        let mut messages = self.messages.write().await;
        let message = messages.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        Ok(message.mark_read(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[tokio::test]
    async fn duplicate_private_chat_pair_is_rejected() {
        let store = InMemoryStore::new();
        let a = UserId::from(Uuid::new_v4());
        let b = UserId::from(Uuid::new_v4());
        let now = Utc::now();

        let first = PrivateChat::new(PrivateChatId::from(Uuid::new_v4()), a, b, now).unwrap();
        let mirrored = PrivateChat::new(PrivateChatId::from(Uuid::new_v4()), b, a, now).unwrap();

        store.insert_private_chat(first).await.unwrap();
        assert_eq!(
            store.insert_private_chat(mirrored).await,
            Err(RepositoryError::Conflict)
        );
    }

    #[tokio::test]
    async fn add_reader_reports_growth_once() {
        let store = InMemoryStore::new();
        let sender = UserId::from(Uuid::new_v4());
        let reader = UserId::from(Uuid::new_v4());
        let message = Message::new(
            MessageId::from(Uuid::new_v4()),
            sender,
            MessageTarget::Room(RoomId::from(Uuid::new_v4())),
            Some("hello".to_owned()),
            None,
            Utc::now(),
        );
        let id = message.id;
        MessageRepository::create(&store, message).await.unwrap();

        assert!(store.add_reader(id, reader).await.unwrap());
        assert!(!store.add_reader(id, reader).await.unwrap());

        let stored = MessageRepository::find_by_id(&store, id).await.unwrap().unwrap();
        assert_eq!(stored.read_by, vec![sender, reader]);
    }
}
