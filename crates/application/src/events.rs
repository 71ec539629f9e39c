//! 会话事件的线上格式
//!
//! 每一帧都是 `{"event": "<name>", "data": {...}}`，按事件名分派到封闭的类型化变体。

use domain::{
    FileAttachment, FileKind, Message, MessageId, MessageTarget, PrivateChatId, RoomId, Timestamp,
    UserId, UserProfile, UserStatus,
};
use serde::{Deserialize, Serialize};

/// 客户端发送的事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "room:join")]
    RoomJoin(RoomRef),
    #[serde(rename = "room:leave")]
    RoomLeave(RoomRef),
    #[serde(rename = "room:message")]
    RoomMessage(RoomMessagePayload),
    #[serde(rename = "private:message")]
    PrivateMessage(PrivateMessagePayload),
    #[serde(rename = "typing:start")]
    TypingStart(TypingPayload),
    #[serde(rename = "typing:stop")]
    TypingStop(TypingPayload),
    #[serde(rename = "message:read")]
    MessageRead(ReadPayload),
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::RoomJoin(_) => "room:join",
            ClientEvent::RoomLeave(_) => "room:leave",
            ClientEvent::RoomMessage(_) => "room:message",
            ClientEvent::PrivateMessage(_) => "private:message",
            ClientEvent::TypingStart(_) => "typing:start",
            ClientEvent::TypingStop(_) => "typing:stop",
            ClientEvent::MessageRead(_) => "message:read",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRef {
    pub room_id: RoomId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMessagePayload {
    pub room_id: RoomId,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub file_type: Option<FileKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateMessagePayload {
    pub chat_id: PrivateChatId,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub file_type: Option<FileKind>,
}

/// 只有提供了 url 才构成文件描述，缺省类型按普通文件处理。
pub fn attachment(file_url: Option<String>, file_type: Option<FileKind>) -> Option<FileAttachment> {
    file_url.map(|url| FileAttachment {
        url,
        kind: file_type.unwrap_or(FileKind::File),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    #[serde(default)]
    pub room_id: Option<RoomId>,
    #[serde(default)]
    pub chat_id: Option<PrivateChatId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadPayload {
    pub message_id: MessageId,
}

/// 服务端推送给会话的事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "user:status")]
    UserStatus(StatusChange),
    #[serde(rename = "room:user-joined")]
    RoomUserJoined(MemberJoined),
    #[serde(rename = "room:user-left")]
    RoomUserLeft(MemberLeft),
    #[serde(rename = "room:message")]
    RoomMessage(MessageView),
    #[serde(rename = "private:message")]
    PrivateMessage(MessageView),
    #[serde(rename = "typing:start")]
    TypingStart(TypingSignal),
    #[serde(rename = "typing:stop")]
    TypingStop(TypingSignal),
    #[serde(rename = "message:read")]
    MessageRead(ReadReceipt),
    #[serde(rename = "error")]
    Error(ErrorNotice),
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error(ErrorNotice {
            message: message.into(),
        })
    }

    /// 按消息归属选择 `room:message` 或 `private:message`
    pub fn chat_message(view: MessageView) -> Self {
        if view.private_chat.is_some() {
            ServerEvent::PrivateMessage(view)
        } else {
            ServerEvent::RoomMessage(view)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub user_id: UserId,
    pub status: UserStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberJoined {
    pub room_id: RoomId,
    pub user: UserProfile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberLeft {
    pub room_id: RoomId,
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingSignal {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<RoomId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<PrivateChatId>,
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadReceipt {
    pub message_id: MessageId,
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorNotice {
    pub message: String,
}

/// 带发送者公开资料的完整消息，广播给频道内所有会话。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: MessageId,
    pub sender: UserProfile,
    pub content: Option<String>,
    pub file_url: Option<String>,
    pub file_type: Option<FileKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<RoomId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_chat: Option<PrivateChatId>,
    pub read_by: Vec<UserId>,
    pub is_deleted: bool,
    pub created_at: Timestamp,
}

impl MessageView {
    pub fn hydrate(message: &Message, sender: UserProfile) -> Self {
        let (room, private_chat) = match message.target {
            MessageTarget::Room(id) => (Some(id), None),
            MessageTarget::PrivateChat(id) => (None, Some(id)),
        };
        Self {
            id: message.id,
            sender,
            content: message.content.clone(),
            file_url: message.file.as_ref().map(|file| file.url.clone()),
            file_type: message.file.as_ref().map(|file| file.kind),
            room,
            private_chat,
            read_by: message.read_by.clone(),
            is_deleted: message.is_deleted,
            created_at: message.created_at,
        }
    }
}
