use std::fmt;

use crate::message::MessageTarget;
use crate::value_objects::{PrivateChatId, RoomId};

/// 多播频道键，每个聊天室或私聊对应一个频道。
///
/// 频道不落库，连接建立时根据成员关系重新构建。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKey {
    Room(RoomId),
    PrivateChat(PrivateChatId),
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKey::Room(id) => write!(f, "room:{id}"),
            ChannelKey::PrivateChat(id) => write!(f, "chat:{id}"),
        }
    }
}

impl From<MessageTarget> for ChannelKey {
    fn from(value: MessageTarget) -> Self {
        match value {
            MessageTarget::Room(id) => ChannelKey::Room(id),
            MessageTarget::PrivateChat(id) => ChannelKey::PrivateChat(id),
        }
    }
}

impl From<RoomId> for ChannelKey {
    fn from(value: RoomId) -> Self {
        ChannelKey::Room(value)
    }
}

impl From<PrivateChatId> for ChannelKey {
    fn from(value: PrivateChatId) -> Self {
        ChannelKey::PrivateChat(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn room_and_chat_keys_never_collide() {
        let raw = Uuid::new_v4();
        let room = ChannelKey::from(RoomId::from(raw));
        let chat = ChannelKey::from(PrivateChatId::from(raw));

        assert_ne!(room, chat);
        assert_eq!(room.to_string(), format!("room:{raw}"));
        assert_eq!(chat.to_string(), format!("chat:{raw}"));
    }
}
