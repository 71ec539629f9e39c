use std::sync::Arc;

use domain::{ChannelKey, DomainError, RoomId};
use tracing::{debug, info};

use crate::{
    error::ApplicationError,
    events::{MemberJoined, MemberLeft, ServerEvent},
    hub::ChannelHub,
    repository::{PrivateChatRepository, RoomRepository},
    session::Session,
};

pub struct MembershipRouterDependencies {
    pub room_repository: Arc<dyn RoomRepository>,
    pub private_chat_repository: Arc<dyn PrivateChatRepository>,
    pub hub: Arc<ChannelHub>,
}

/// 根据持久化的成员关系维护会话的频道订阅
pub struct MembershipRouter {
    deps: MembershipRouterDependencies,
}

impl MembershipRouter {
    pub fn new(deps: MembershipRouterDependencies) -> Self {
        Self { deps }
    }

    /// 订阅用户所属的全部聊天室和私聊频道，返回订阅的频道数
    pub async fn subscribe_session(&self, session: &Session) -> Result<usize, ApplicationError> {
        let user_id = session.user_id();
        let rooms = self.deps.room_repository.list_for_member(user_id).await?;
        let chats = self
            .deps
            .private_chat_repository
            .list_for_participant(user_id)
            .await?;

        let keys = rooms
            .iter()
            .map(|room| ChannelKey::Room(room.id))
            .chain(chats.iter().map(|chat| ChannelKey::PrivateChat(chat.id)));

        let mut subscribed = 0;
        for key in keys {
            self.deps.hub.subscribe(session.id(), key).await;
            subscribed += 1;
        }

        debug!(
            user_id = %user_id,
            session_id = %session.id(),
            rooms = rooms.len(),
            private_chats = chats.len(),
            "session subscribed to member channels"
        );
        Ok(subscribed)
    }

    /// 加入聊天室。重复加入是幂等的，但每次都会通知频道内的其他会话。
    pub async fn join_room(&self, session: &Session, room_id: RoomId) -> Result<(), ApplicationError> {
        let user_id = session.user_id();
        let room = self
            .deps
            .room_repository
            .find_by_id(room_id)
            .await?
            .ok_or(DomainError::RoomNotFound)?;

        if room.is_private && !room.is_member(user_id) {
            return Err(DomainError::RoomIsPrivate.into());
        }

        let added = self.deps.room_repository.add_member(room_id, user_id).await?;
        let key = ChannelKey::Room(room_id);
        self.deps.hub.subscribe(session.id(), key).await;

        let event = ServerEvent::RoomUserJoined(MemberJoined {
            room_id,
            user: session.profile().clone(),
        });
        self.deps.hub.publish(key, &event, Some(session.id())).await;

        info!(user_id = %user_id, room_id = %room_id, added, "用户加入聊天室");
        Ok(())
    }

    pub async fn leave_room(&self, session: &Session, room_id: RoomId) -> Result<(), ApplicationError> {
        let user_id = session.user_id();
        self.deps
            .room_repository
            .find_by_id(room_id)
            .await?
            .ok_or(DomainError::RoomNotFound)?;

        let removed = self
            .deps
            .room_repository
            .remove_member(room_id, user_id)
            .await?;
        let key = ChannelKey::Room(room_id);
        self.deps.hub.unsubscribe(session.id(), key).await;

        let event = ServerEvent::RoomUserLeft(MemberLeft { room_id, user_id });
        self.deps.hub.publish(key, &event, Some(session.id())).await;

        info!(user_id = %user_id, room_id = %room_id, removed, "用户离开聊天室");
        Ok(())
    }
}
