use std::sync::Arc;

use domain::{ChannelKey, DomainError, MessageId};
use tracing::debug;

use crate::{
    error::ApplicationError,
    events::{ReadReceipt, ServerEvent, TypingPayload, TypingSignal},
    hub::ChannelHub,
    presence::PresenceRegistry,
    repository::MessageRepository,
    session::Session,
};

pub struct SignalBusDependencies {
    pub message_repository: Arc<dyn MessageRepository>,
    pub presence: Arc<dyn PresenceRegistry>,
    pub hub: Arc<ChannelHub>,
}

/// 输入状态和已读回执，信号本身不落库。
pub struct SignalBus {
    deps: SignalBusDependencies,
}

impl SignalBus {
    pub fn new(deps: SignalBusDependencies) -> Self {
        Self { deps }
    }

    /// 转发给频道内的其他会话，不回显给发起者
    pub async fn typing(
        &self,
        session: &Session,
        payload: TypingPayload,
        started: bool,
    ) -> Result<(), ApplicationError> {
        let key = match (payload.room_id, payload.chat_id) {
            (Some(room_id), None) => ChannelKey::Room(room_id),
            (None, Some(chat_id)) => ChannelKey::PrivateChat(chat_id),
            _ => {
                return Err(ApplicationError::validation(
                    "typing requires exactly one of roomId or chatId",
                ))
            }
        };

        let signal = TypingSignal {
            room_id: payload.room_id,
            chat_id: payload.chat_id,
            user_id: session.user_id(),
            username: started.then(|| session.profile().username.clone()),
        };
        let event = if started {
            ServerEvent::TypingStart(signal)
        } else {
            ServerEvent::TypingStop(signal)
        };
        self.deps.hub.publish(key, &event, Some(session.id())).await;
        Ok(())
    }

    /// 记录已读并通知发送者的当前会话。发送者离线时回执直接丢弃。
    pub async fn mark_read(
        &self,
        session: &Session,
        message_id: MessageId,
    ) -> Result<(), ApplicationError> {
        let reader = session.user_id();
        let message = self
            .deps
            .message_repository
            .find_by_id(message_id)
            .await?
            .ok_or(DomainError::MessageNotFound)?;

        let grew = self
            .deps
            .message_repository
            .add_reader(message_id, reader)
            .await?;

        if message.sender_id == reader {
            return Ok(());
        }

        let Some(target) = self.deps.presence.get(message.sender_id).await? else {
            debug!(message_id = %message_id, sender_id = %message.sender_id, "sender offline, receipt dropped");
            return Ok(());
        };

        let receipt = ServerEvent::MessageRead(ReadReceipt {
            message_id,
            user_id: reader,
        });
        let delivered = self.deps.hub.send_to(target, receipt).await;
        debug!(
            message_id = %message_id,
            reader_id = %reader,
            grew,
            delivered,
            "read receipt"
        );
        Ok(())
    }
}
