//! 会话网关
//!
//! 传输层唯一调用的入口：认证、建立会话、按事件分派、关闭会话。
//! 会话内的事件由调用方按到达顺序逐个交给 [`ChatGateway::handle`]。

use std::sync::Arc;

use domain::{MessageTarget, UserIdentity};
use tracing::{debug, error, info, warn};

use crate::{
    clock::Clock,
    error::{ApplicationError, ErrorKind},
    events::{attachment, ClientEvent, ServerEvent},
    hub::ChannelHub,
    identity::IdentityVerifier,
    presence::PresenceRegistry,
    repository::{MessageRepository, PrivateChatRepository, RoomRepository, UserRepository},
    session::{OutboundSender, Session},
};

use super::{
    dispatcher::{FanOutDispatcher, FanOutDispatcherDependencies, OutgoingMessage},
    membership_router::{MembershipRouter, MembershipRouterDependencies},
    presence_service::{PresenceService, PresenceServiceDependencies},
    signal_bus::{SignalBus, SignalBusDependencies},
};

pub struct GatewayDependencies {
    pub identity_verifier: Arc<dyn IdentityVerifier>,
    pub user_repository: Arc<dyn UserRepository>,
    pub room_repository: Arc<dyn RoomRepository>,
    pub private_chat_repository: Arc<dyn PrivateChatRepository>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub presence: Arc<dyn PresenceRegistry>,
    pub hub: Arc<ChannelHub>,
    pub clock: Arc<dyn Clock>,
}

pub struct ChatGateway {
    identity_verifier: Arc<dyn IdentityVerifier>,
    hub: Arc<ChannelHub>,
    presence: PresenceService,
    membership: MembershipRouter,
    dispatcher: FanOutDispatcher,
    signals: SignalBus,
}

impl ChatGateway {
    pub fn new(deps: GatewayDependencies) -> Self {
        let presence = PresenceService::new(PresenceServiceDependencies {
            user_repository: deps.user_repository,
            presence: deps.presence.clone(),
            hub: deps.hub.clone(),
            clock: deps.clock.clone(),
        });
        let membership = MembershipRouter::new(MembershipRouterDependencies {
            room_repository: deps.room_repository.clone(),
            private_chat_repository: deps.private_chat_repository.clone(),
            hub: deps.hub.clone(),
        });
        let dispatcher = FanOutDispatcher::new(FanOutDispatcherDependencies {
            room_repository: deps.room_repository,
            private_chat_repository: deps.private_chat_repository,
            message_repository: deps.message_repository.clone(),
            hub: deps.hub.clone(),
            clock: deps.clock,
        });
        let signals = SignalBus::new(SignalBusDependencies {
            message_repository: deps.message_repository,
            presence: deps.presence,
            hub: deps.hub.clone(),
        });

        Self {
            identity_verifier: deps.identity_verifier,
            hub: deps.hub,
            presence,
            membership,
            dispatcher,
            signals,
        }
    }

    /// 校验握手凭证。缺失、无效或用户不存在都归为认证失败。
    pub async fn authenticate(
        &self,
        credential: Option<&str>,
    ) -> Result<UserIdentity, ApplicationError> {
        let credential = credential
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(ApplicationError::Authentication)?;

        match self.identity_verifier.verify(credential).await {
            Ok(identity) => Ok(identity),
            Err(err) => {
                debug!(error = %err, "handshake rejected");
                Err(ApplicationError::Authentication)
            }
        }
    }

    /// 建立会话：注册出站队列、登记在线状态、订阅成员频道。
    pub async fn open_session(&self, identity: &UserIdentity, sender: OutboundSender) -> Session {
        let session = Session::bind(identity);
        self.hub
            .register(session.id(), session.user_id(), sender)
            .await;

        if let Err(err) = self.presence.session_started(&session).await {
            error!(user_id = %session.user_id(), error = %err, "在线登记失败");
        }

        if let Err(err) = self.membership.subscribe_session(&session).await {
            // 会话保持打开，只是暂时收不到频道消息
            error!(user_id = %session.user_id(), error = %err, "加载成员关系失败");
            self.reply_error(&session, &err).await;
        }

        info!(
            user_id = %session.user_id(),
            session_id = %session.id(),
            username = %session.profile().username,
            "会话已建立"
        );
        session
    }

    /// 处理一条原始文本帧，无法解析的帧只回错误，不关闭会话
    pub async fn handle_frame(&self, session: &Session, frame: &str) {
        match serde_json::from_str::<ClientEvent>(frame) {
            Ok(event) => self.handle(session, event).await,
            Err(err) => {
                debug!(session_id = %session.id(), error = %err, "unparseable client frame");
                self.reply_error(
                    session,
                    &ApplicationError::validation("Invalid event payload"),
                )
                .await;
            }
        }
    }

    /// 处理单个客户端事件，失败时只向当前会话回送 `error`
    pub async fn handle(&self, session: &Session, event: ClientEvent) {
        let name = event.name();
        if let Err(err) = self.dispatch(session, event).await {
            match err.kind() {
                ErrorKind::Persistence => {
                    error!(user_id = %session.user_id(), event = name, error = %err, "事件处理失败")
                }
                _ => warn!(user_id = %session.user_id(), event = name, error = %err, "事件被拒绝"),
            }
            self.reply_error(session, &err).await;
        }
    }

    async fn dispatch(&self, session: &Session, event: ClientEvent) -> Result<(), ApplicationError> {
        match event {
            ClientEvent::RoomJoin(payload) => self.membership.join_room(session, payload.room_id).await,
            ClientEvent::RoomLeave(payload) => {
                self.membership.leave_room(session, payload.room_id).await
            }
            ClientEvent::RoomMessage(payload) => {
                let outgoing = OutgoingMessage {
                    target: MessageTarget::Room(payload.room_id),
                    content: payload.content,
                    file: attachment(payload.file_url, payload.file_type),
                };
                self.dispatcher.send(session, outgoing).await.map(|_| ())
            }
            ClientEvent::PrivateMessage(payload) => {
                let outgoing = OutgoingMessage {
                    target: MessageTarget::PrivateChat(payload.chat_id),
                    content: payload.content,
                    file: attachment(payload.file_url, payload.file_type),
                };
                self.dispatcher.send(session, outgoing).await.map(|_| ())
            }
            ClientEvent::TypingStart(payload) => self.signals.typing(session, payload, true).await,
            ClientEvent::TypingStop(payload) => self.signals.typing(session, payload, false).await,
            ClientEvent::MessageRead(payload) => {
                self.signals.mark_read(session, payload.message_id).await
            }
        }
    }

    /// 关闭会话。先退出所有频道，再清除在线登记并广播离线。
    ///
    /// 未发出的 `typing:stop` 不会代为补发。
    pub async fn close_session(&self, session: &Session) {
        self.hub.unregister(session.id()).await;
        if let Err(err) = self.presence.session_ended(session).await {
            error!(user_id = %session.user_id(), error = %err, "清除在线登记失败");
        }
        info!(user_id = %session.user_id(), session_id = %session.id(), "会话已关闭");
    }

    async fn reply_error(&self, session: &Session, err: &ApplicationError) {
        let event = ServerEvent::error(err.client_message());
        if !self.hub.send_to(session.id(), event).await {
            debug!(session_id = %session.id(), "error reply dropped, session gone");
        }
    }
}
