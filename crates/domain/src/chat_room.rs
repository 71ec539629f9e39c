use crate::value_objects::{MessageId, RoomId, Timestamp, UserId};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub is_private: bool,
    pub members: Vec<UserId>,
    pub last_message: Option<MessageId>,
    pub last_activity: Timestamp,
}

impl Room {
    pub fn new(
        id: RoomId,
        name: impl Into<String>,
        is_private: bool,
        creator: UserId,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            is_private,
            members: vec![creator],
            last_message: None,
            last_activity: created_at,
        }
    }

    pub fn is_member(&self, user_id: UserId) -> bool {
        self.members.contains(&user_id)
    }

    /// 返回成员集合是否发生变化
    pub fn add_member(&mut self, user_id: UserId) -> bool {
        if self.is_member(user_id) {
            return false;
        }
        self.members.push(user_id);
        true
    }

    pub fn remove_member(&mut self, user_id: UserId) -> bool {
        let before = self.members.len();
        self.members.retain(|member| *member != user_id);
        self.members.len() != before
    }

    /// 无版本校验，后写入者覆盖先写入者。
    pub fn record_message(&mut self, message_id: MessageId, at: Timestamp) {
        self.last_message = Some(message_id);
        self.last_activity = at;
    }
}
