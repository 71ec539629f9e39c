use crate::errors::DomainError;
use crate::value_objects::{MessageId, PrivateChatId, Timestamp, UserId};

/// 两名用户之间的私聊。
///
/// 参与者在创建时固定，之后不可修改。只能经由 [`PrivateChat::new`] 构造。
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PrivateChat {
    pub id: PrivateChatId,
    participants: [UserId; 2],
    pub last_message: Option<MessageId>,
    pub last_activity: Timestamp,
}

impl PrivateChat {
    pub fn new(
        id: PrivateChatId,
        first: UserId,
        second: UserId,
        created_at: Timestamp,
    ) -> Result<Self, DomainError> {
        if first == second {
            return Err(DomainError::invalid_argument(
                "participants",
                "private chat must have exactly 2 distinct participants",
            ));
        }
        Ok(Self {
            id,
            participants: [first, second],
            last_message: None,
            last_activity: created_at,
        })
    }

    pub fn is_participant(&self, user_id: UserId) -> bool {
        self.participants.contains(&user_id)
    }

    /// 无序参与者对，作为“每对用户至多一个私聊”的唯一键。
    pub fn pair_key(&self) -> (UserId, UserId) {
        let [a, b] = self.participants;
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    pub fn record_message(&mut self, message_id: MessageId, at: Timestamp) {
        self.last_message = Some(message_id);
        self.last_activity = at;
    }
}
