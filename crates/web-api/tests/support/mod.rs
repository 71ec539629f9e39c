#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use application::{
    memory::InMemoryStore, ChannelHub, ChatGateway, GatewayDependencies, MemoryPresenceRegistry,
    SystemClock,
};
use chrono::Utc;
use domain::{PrivateChat, PrivateChatId, Room, RoomId, UserId, UserIdentity};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::{net::TcpListener, sync::oneshot, time::timeout};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use uuid::Uuid;
use web_api::{router, AppState, JwtConfig, JwtIdentityVerifier};

pub type Client = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    pub store: Arc<InMemoryStore>,
    pub verifier: Arc<JwtIdentityVerifier>,
    _shutdown: oneshot::Sender<()>,
}

pub async fn spawn_server() -> TestServer {
    let store = Arc::new(InMemoryStore::new());
    let verifier = Arc::new(JwtIdentityVerifier::new(
        JwtConfig {
            secret: "integration-test-secret-key-0123456789".to_string(),
            expiration_hours: 1,
        },
        store.clone(),
    ));

    let gateway = ChatGateway::new(GatewayDependencies {
        identity_verifier: verifier.clone(),
        user_repository: store.clone(),
        room_repository: store.clone(),
        private_chat_repository: store.clone(),
        message_repository: store.clone(),
        presence: Arc::new(MemoryPresenceRegistry::new()),
        hub: Arc::new(ChannelHub::new()),
        clock: Arc::new(SystemClock),
    });
    let app = router(AppState::new(Arc::new(gateway)), &["*".to_string()]);

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .ok();
    });

    TestServer {
        addr,
        store,
        verifier,
        _shutdown: shutdown_tx,
    }
}

impl TestServer {
    pub async fn user(&self, name: &str) -> UserIdentity {
        let user = UserIdentity::new(UserId::from(Uuid::new_v4()), name, None, Utc::now());
        self.store.insert_user(user.clone()).await;
        user
    }

    pub async fn room(&self, members: &[&UserIdentity]) -> RoomId {
        let id = RoomId::from(Uuid::new_v4());
        let mut room = Room::new(id, "general", false, members[0].id, Utc::now());
        for member in &members[1..] {
            room.add_member(member.id);
        }
        self.store.insert_room(room).await;
        id
    }

    pub async fn private_chat(&self, a: &UserIdentity, b: &UserIdentity) -> PrivateChatId {
        let id = PrivateChatId::from(Uuid::new_v4());
        let chat = PrivateChat::new(id, a.id, b.id, Utc::now()).expect("chat");
        self.store.insert_private_chat(chat).await.expect("insert chat");
        id
    }

    pub fn token(&self, user: &UserIdentity) -> String {
        self.verifier.generate_token(user.id).expect("token")
    }

    pub async fn connect(&self, user: &UserIdentity) -> Client {
        let url = format!("ws://{}/ws?token={}", self.addr, self.token(user));
        let (client, _) = connect_async(url).await.expect("connect");
        client
    }
}

pub async fn send(client: &mut Client, frame: Value) {
    client
        .send(Message::Text(frame.to_string().into()))
        .await
        .expect("send frame");
}

/// 读取下一个名为 `event` 的事件，跳过其他事件
pub async fn expect_event(client: &mut Client, event: &str) -> Value {
    let deadline = Duration::from_secs(3);
    timeout(deadline, async {
        loop {
            let message = client
                .next()
                .await
                .expect("stream open")
                .expect("websocket frame");
            if let Message::Text(text) = message {
                let value: Value = serde_json::from_str(text.as_str()).expect("json frame");
                if value["event"] == event {
                    return value["data"].clone();
                }
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {event}"))
}

/// 断言在短时间内没有收到指定事件
pub async fn expect_silence(client: &mut Client, event: &str) {
    let result = timeout(Duration::from_millis(300), async {
        while let Some(Ok(message)) = client.next().await {
            if let Message::Text(text) = message {
                let value: Value = serde_json::from_str(text.as_str()).expect("json frame");
                if value["event"] == event {
                    return value;
                }
            }
        }
        Value::Null
    })
    .await;
    if let Ok(value) = result {
        assert!(value.is_null(), "unexpected {event}: {value}");
    }
}
