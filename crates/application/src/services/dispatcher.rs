use std::collections::HashMap;
use std::sync::Arc;

use domain::{
    ChannelKey, DomainError, FileAttachment, Message, MessageId, MessageTarget, PrivateChatId,
    RepositoryError, RoomId,
};
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    clock::Clock,
    error::ApplicationError,
    events::{MessageView, ServerEvent},
    hub::ChannelHub,
    repository::{MessageRepository, PrivateChatRepository, RoomRepository},
    session::Session,
};

#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    pub target: MessageTarget,
    pub content: Option<String>,
    pub file: Option<FileAttachment>,
}

#[derive(Clone)]
pub struct FanOutDispatcherDependencies {
    pub room_repository: Arc<dyn RoomRepository>,
    pub private_chat_repository: Arc<dyn PrivateChatRepository>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub hub: Arc<ChannelHub>,
    pub clock: Arc<dyn Clock>,
}

/// 持久化消息后广播给目标频道的全部订阅者（包括发送者自己）
///
/// 同一目标的发送串行执行：持久化、更新最后一条消息、广播在同一把锁内完成，
/// 订阅者看到的顺序与落库顺序一致。
///
/// 这一组步骤在独立任务中运行，调用方被取消（例如会话断开）时仍会完整执行，
/// 已落库的消息一定会广播出去。
pub struct FanOutDispatcher {
    deps: FanOutDispatcherDependencies,
    ordering: Arc<Mutex<HashMap<ChannelKey, Arc<Mutex<()>>>>>,
}

/// 单条消息的投递单元，持有依赖的克隆以便在独立任务中运行
struct DeliveryUnit {
    deps: FanOutDispatcherDependencies,
    ordering: Arc<Mutex<HashMap<ChannelKey, Arc<Mutex<()>>>>>,
    session: Session,
}

impl FanOutDispatcher {
    pub fn new(deps: FanOutDispatcherDependencies) -> Self {
        Self {
            deps,
            ordering: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn send(
        &self,
        session: &Session,
        outgoing: OutgoingMessage,
    ) -> Result<MessageView, ApplicationError> {
        match outgoing.target {
            MessageTarget::Room(room_id) => self.ensure_room(room_id).await?,
            MessageTarget::PrivateChat(chat_id) => self.ensure_participant(session, chat_id).await?,
        }

        let unit = DeliveryUnit {
            deps: self.deps.clone(),
            ordering: self.ordering.clone(),
            session: session.clone(),
        };
        tokio::spawn(unit.run(outgoing)).await.map_err(|err| {
            error!(user_id = %session.user_id(), error = %err, "消息投递任务异常退出");
            ApplicationError::from(RepositoryError::storage(format!("delivery task failed: {err}")))
        })?
    }

    async fn ensure_room(&self, room_id: RoomId) -> Result<(), ApplicationError> {
        self.deps
            .room_repository
            .find_by_id(room_id)
            .await?
            .ok_or(DomainError::RoomNotFound)?;
        Ok(())
    }

    async fn ensure_participant(
        &self,
        session: &Session,
        chat_id: PrivateChatId,
    ) -> Result<(), ApplicationError> {
        let chat = self
            .deps
            .private_chat_repository
            .find_by_id(chat_id)
            .await?
            .ok_or(DomainError::PrivateChatNotFound)?;
        if !chat.is_participant(session.user_id()) {
            warn!(
                user_id = %session.user_id(),
                chat_id = %chat_id,
                "非参与者尝试发送私聊消息"
            );
            return Err(DomainError::NotAParticipant.into());
        }
        Ok(())
    }
}

impl DeliveryUnit {
    async fn run(self, outgoing: OutgoingMessage) -> Result<MessageView, ApplicationError> {
        let key = ChannelKey::from(outgoing.target);
        let lock = self.target_lock(key).await;
        let result = {
            let _guard = lock.lock().await;
            self.persist_and_publish(outgoing).await
        };
        self.release_lock(key, lock).await;
        result
    }

    async fn persist_and_publish(
        &self,
        outgoing: OutgoingMessage,
    ) -> Result<MessageView, ApplicationError> {
        let session = &self.session;
        let now = self.deps.clock.now();
        let message = Message::new(
            MessageId::from(Uuid::new_v4()),
            session.user_id(),
            outgoing.target,
            outgoing.content,
            outgoing.file,
            now,
        );

        let stored = self.deps.message_repository.create(message).await?;

        let touched = match stored.target {
            MessageTarget::Room(room_id) => {
                self.deps
                    .room_repository
                    .touch_last_message(room_id, stored.id, stored.created_at)
                    .await
            }
            MessageTarget::PrivateChat(chat_id) => {
                self.deps
                    .private_chat_repository
                    .touch_last_message(chat_id, stored.id, stored.created_at)
                    .await
            }
        };
        if let Err(err) = touched {
            // 消息已经落库，照常广播
            error!(
                message_id = %stored.id,
                target = %ChannelKey::from(stored.target),
                error = %err,
                "消息已保存，但更新最后一条消息失败"
            );
        }

        let view = MessageView::hydrate(&stored, session.profile().clone());
        let key = ChannelKey::from(stored.target);
        let delivered = self
            .deps
            .hub
            .publish(key, &ServerEvent::chat_message(view.clone()), None)
            .await;

        info!(
            message_id = %stored.id,
            sender_id = %stored.sender_id,
            channel = %key,
            delivered,
            "消息发送成功"
        );
        Ok(view)
    }

    async fn target_lock(&self, key: ChannelKey) -> Arc<Mutex<()>> {
        let mut locks = self.ordering.lock().await;
        locks.entry(key).or_default().clone()
    }

    async fn release_lock(&self, key: ChannelKey, lock: Arc<Mutex<()>>) {
        let mut locks = self.ordering.lock().await;
        // 只剩表内和当前这两个引用时说明没有其他发送在等待
        if Arc::strong_count(&lock) == 2 {
            locks.remove(&key);
        }
    }
}
