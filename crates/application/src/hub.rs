//! 进程内的频道多播中心
//!
//! 维护会话的出站队列和频道订阅关系。订阅只存在于内存，会话关闭后全部丢弃。

use std::collections::{HashMap, HashSet};

use domain::{ChannelKey, UserId};
use tokio::sync::RwLock;
use tracing::debug;

use crate::events::ServerEvent;
use crate::session::{OutboundSender, SessionId};

struct SessionEntry {
    user_id: UserId,
    sender: OutboundSender,
    channels: HashSet<ChannelKey>,
}

#[derive(Default)]
struct HubState {
    sessions: HashMap<SessionId, SessionEntry>,
    channels: HashMap<ChannelKey, HashSet<SessionId>>,
}

#[derive(Default)]
pub struct ChannelHub {
    state: RwLock<HubState>,
}

impl ChannelHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, session_id: SessionId, user_id: UserId, sender: OutboundSender) {
        let mut state = self.state.write().await;
        state.sessions.insert(
            session_id,
            SessionEntry {
                user_id,
                sender,
                channels: HashSet::new(),
            },
        );
    }

    /// 注销会话并退出其订阅的所有频道
    pub async fn unregister(&self, session_id: SessionId) {
        let mut state = self.state.write().await;
        let Some(entry) = state.sessions.remove(&session_id) else {
            return;
        };
        for key in entry.channels {
            if let Some(members) = state.channels.get_mut(&key) {
                members.remove(&session_id);
                if members.is_empty() {
                    state.channels.remove(&key);
                }
            }
        }
    }

    /// 订阅频道，未注册的会话忽略。返回订阅关系是否新建。
    pub async fn subscribe(&self, session_id: SessionId, key: ChannelKey) -> bool {
        let mut state = self.state.write().await;
        let Some(entry) = state.sessions.get_mut(&session_id) else {
            return false;
        };
        if !entry.channels.insert(key) {
            return false;
        }
        state.channels.entry(key).or_default().insert(session_id);
        true
    }

    pub async fn unsubscribe(&self, session_id: SessionId, key: ChannelKey) -> bool {
        let mut state = self.state.write().await;
        let removed = state
            .sessions
            .get_mut(&session_id)
            .map(|entry| entry.channels.remove(&key))
            .unwrap_or(false);
        if let Some(members) = state.channels.get_mut(&key) {
            members.remove(&session_id);
            if members.is_empty() {
                state.channels.remove(&key);
            }
        }
        removed
    }

    pub async fn is_subscribed(&self, session_id: SessionId, key: ChannelKey) -> bool {
        let state = self.state.read().await;
        state
            .sessions
            .get(&session_id)
            .is_some_and(|entry| entry.channels.contains(&key))
    }

    pub async fn subscribers(&self, key: ChannelKey) -> Vec<SessionId> {
        let state = self.state.read().await;
        state
            .channels
            .get(&key)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    pub async fn session_user(&self, session_id: SessionId) -> Option<UserId> {
        let state = self.state.read().await;
        state.sessions.get(&session_id).map(|entry| entry.user_id)
    }

    /// 向频道内的会话投递事件，`except` 用于排除发起者。返回成功入队的会话数。
    pub async fn publish(
        &self,
        key: ChannelKey,
        event: &ServerEvent,
        except: Option<SessionId>,
    ) -> usize {
        let state = self.state.read().await;
        let Some(members) = state.channels.get(&key) else {
            return 0;
        };
        let mut delivered = 0;
        for session_id in members {
            if Some(*session_id) == except {
                continue;
            }
            if let Some(entry) = state.sessions.get(session_id) {
                if entry.sender.send(event.clone()).is_ok() {
                    delivered += 1;
                } else {
                    // 接收端已关闭，等待会话自身的清理流程
                    debug!(session_id = %session_id, channel = %key, "outbound queue closed");
                }
            }
        }
        delivered
    }

    /// 直接投递给单个会话，会话不存在或已关闭时返回 false
    pub async fn send_to(&self, session_id: SessionId, event: ServerEvent) -> bool {
        let state = self.state.read().await;
        state
            .sessions
            .get(&session_id)
            .is_some_and(|entry| entry.sender.send(event).is_ok())
    }

    /// 投递给所有已注册的会话
    pub async fn broadcast_all(&self, event: &ServerEvent) -> usize {
        let state = self.state.read().await;
        state
            .sessions
            .values()
            .filter(|entry| entry.sender.send(event.clone()).is_ok())
            .count()
    }

    pub async fn session_count(&self) -> usize {
        self.state.read().await.sessions.len()
    }
}
