use crate::value_objects::{MessageId, PrivateChatId, RoomId, Timestamp, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Image,
    File,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Image => "image",
            FileKind::File => "file",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "image" => Some(FileKind::Image),
            "file" => Some(FileKind::File),
            _ => None,
        }
    }
}

/// 上传子系统返回的文件描述。
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FileAttachment {
    pub url: String,
    pub kind: FileKind,
}

/// 消息只能属于聊天室或私聊之一。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum MessageTarget {
    Room(RoomId),
    PrivateChat(PrivateChatId),
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    pub content: Option<String>,
    pub file: Option<FileAttachment>,
    pub target: MessageTarget,
    pub read_by: Vec<UserId>,
    pub is_deleted: bool,
    pub created_at: Timestamp,
}

impl Message {
    /// `content` 与 `file` 都允许为空，服务端不做非空校验。
    pub fn new(
        id: MessageId,
        sender_id: UserId,
        target: MessageTarget,
        content: Option<String>,
        file: Option<FileAttachment>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            sender_id,
            content,
            file,
            target,
            read_by: vec![sender_id],
            is_deleted: false,
            created_at,
        }
    }

    pub fn is_read_by(&self, user_id: UserId) -> bool {
        self.read_by.contains(&user_id)
    }

    /// 记录已读，重复调用不会改变集合。返回集合是否增长。
    pub fn mark_read(&mut self, user_id: UserId) -> bool {
        if self.is_read_by(user_id) {
            return false;
        }
        self.read_by.push(user_id);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn sample(sender: UserId) -> Message {
        Message::new(
            MessageId::from(Uuid::new_v4()),
            sender,
            MessageTarget::Room(RoomId::from(Uuid::new_v4())),
            Some("hi".to_owned()),
            None,
            Utc::now(),
        )
    }

    #[test]
    fn sender_has_read_own_message() {
        let sender = UserId::from(Uuid::new_v4());
        let message = sample(sender);
        assert_eq!(message.read_by, vec![sender]);
        assert!(!message.is_deleted);
    }

    #[test]
    fn mark_read_is_idempotent() {
        let sender = UserId::from(Uuid::new_v4());
        let reader = UserId::from(Uuid::new_v4());
        let mut message = sample(sender);

        assert!(message.mark_read(reader));
        assert!(!message.mark_read(reader));
        assert!(!message.mark_read(sender));
        assert_eq!(message.read_by, vec![sender, reader]);
    }

    #[test]
    fn empty_message_is_accepted() {
        let sender = UserId::from(Uuid::new_v4());
        let message = Message::new(
            MessageId::from(Uuid::new_v4()),
            sender,
            MessageTarget::PrivateChat(PrivateChatId::from(Uuid::new_v4())),
            None,
            None,
            Utc::now(),
        );
        assert!(message.content.is_none());
        assert!(message.file.is_none());
    }
}
