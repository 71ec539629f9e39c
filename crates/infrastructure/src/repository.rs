use std::sync::Arc;

use application::repository::{
    MessageRepository, PrivateChatRepository, RoomRepository, UserRepository,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{
    FileAttachment, FileKind, Message, MessageId, MessageTarget, PrivateChat, PrivateChatId,
    RepositoryError, Room, RoomId, Timestamp, UserId, UserIdentity, UserStatus,
};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use uuid::Uuid;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

fn map_sqlx_err(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db) = &err {
        match db.code().as_deref() {
            Some(UNIQUE_VIOLATION) => return RepositoryError::Conflict,
            // 引用的聊天室、消息或用户不存在
            Some(FOREIGN_KEY_VIOLATION) => return RepositoryError::NotFound,
            _ => {}
        }
    }
    RepositoryError::storage(err.to_string())
}

fn invalid_data(message: impl Into<String>) -> RepositoryError {
    RepositoryError::storage(message)
}

#[derive(Debug, FromRow)]
struct UserRecord {
    id: Uuid,
    username: String,
    avatar: Option<String>,
    status: String,
    last_seen: DateTime<Utc>,
}

impl TryFrom<UserRecord> for UserIdentity {
    type Error = RepositoryError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        let status = UserStatus::parse(&value.status)
            .ok_or_else(|| invalid_data(format!("unknown user status {}", value.status)))?;
        Ok(UserIdentity {
            id: UserId::from(value.id),
            username: value.username,
            avatar: value.avatar,
            status,
            last_seen: value.last_seen,
        })
    }
}

#[derive(Debug, FromRow)]
struct RoomRecord {
    id: Uuid,
    name: String,
    is_private: bool,
    last_message_id: Option<Uuid>,
    last_activity: DateTime<Utc>,
    members: Vec<Uuid>,
}

impl From<RoomRecord> for Room {
    fn from(value: RoomRecord) -> Self {
        Room {
            id: RoomId::from(value.id),
            name: value.name,
            is_private: value.is_private,
            members: value.members.into_iter().map(UserId::from).collect(),
            last_message: value.last_message_id.map(MessageId::from),
            last_activity: value.last_activity,
        }
    }
}

#[derive(Debug, FromRow)]
struct PrivateChatRecord {
    id: Uuid,
    user_a: Uuid,
    user_b: Uuid,
    last_message_id: Option<Uuid>,
    last_activity: DateTime<Utc>,
}

impl TryFrom<PrivateChatRecord> for PrivateChat {
    type Error = RepositoryError;

    fn try_from(value: PrivateChatRecord) -> Result<Self, Self::Error> {
        let mut chat = PrivateChat::new(
            PrivateChatId::from(value.id),
            UserId::from(value.user_a),
            UserId::from(value.user_b),
            value.last_activity,
        )
        .map_err(|err| invalid_data(err.to_string()))?;
        chat.last_message = value.last_message_id.map(MessageId::from);
        Ok(chat)
    }
}

#[derive(Debug, FromRow)]
struct MessageRecord {
    id: Uuid,
    sender_id: Uuid,
    content: Option<String>,
    file_url: Option<String>,
    file_type: Option<String>,
    room_id: Option<Uuid>,
    private_chat_id: Option<Uuid>,
    is_deleted: bool,
    created_at: DateTime<Utc>,
    read_by: Vec<Uuid>,
}

impl TryFrom<MessageRecord> for Message {
    type Error = RepositoryError;

    fn try_from(value: MessageRecord) -> Result<Self, Self::Error> {
        let target = match (value.room_id, value.private_chat_id) {
            (Some(room_id), None) => MessageTarget::Room(RoomId::from(room_id)),
            (None, Some(chat_id)) => MessageTarget::PrivateChat(PrivateChatId::from(chat_id)),
            _ => {
                return Err(invalid_data(format!(
                    "message {} must belong to exactly one room or private chat",
                    value.id
                )))
            }
        };

        let file = match value.file_url {
            Some(url) => {
                let kind = match value.file_type.as_deref() {
                    Some(raw) => FileKind::parse(raw)
                        .ok_or_else(|| invalid_data(format!("unknown file type {raw}")))?,
                    None => FileKind::File,
                };
                Some(FileAttachment { url, kind })
            }
            None => None,
        };

        Ok(Message {
            id: MessageId::from(value.id),
            sender_id: UserId::from(value.sender_id),
            content: value.content,
            file,
            target,
            read_by: value.read_by.into_iter().map(UserId::from).collect(),
            is_deleted: value.is_deleted,
            created_at: value.created_at,
        })
    }
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: UserId) -> Result<Option<UserIdentity>, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"SELECT id, username, avatar, status, last_seen FROM users WHERE id = $1"#,
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(UserIdentity::try_from).transpose()
    }

    async fn update_presence(
        &self,
        id: UserId,
        status: UserStatus,
        last_seen: Timestamp,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(r#"UPDATE users SET status = $2, last_seen = $3 WHERE id = $1"#)
            .bind(Uuid::from(id))
            .bind(status.as_str())
            .bind(last_seen)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

const ROOM_SELECT: &str = r#"
    SELECT r.id, r.name, r.is_private, r.last_message_id, r.last_activity,
           COALESCE(
               array_agg(m.user_id ORDER BY m.seq) FILTER (WHERE m.user_id IS NOT NULL),
               '{}'::uuid[]
           ) AS members
    FROM rooms r
    LEFT JOIN room_members m ON m.room_id = r.id
"#;

#[derive(Clone)]
pub struct PgRoomRepository {
    pool: PgPool,
}

impl PgRoomRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoomRepository for PgRoomRepository {
    async fn find_by_id(&self, id: RoomId) -> Result<Option<Room>, RepositoryError> {
        let query = format!("{ROOM_SELECT} WHERE r.id = $1 GROUP BY r.id");
        let record = sqlx::query_as::<_, RoomRecord>(&query)
            .bind(Uuid::from(id))
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        Ok(record.map(Room::from))
    }

    async fn list_for_member(&self, user_id: UserId) -> Result<Vec<Room>, RepositoryError> {
        let query = format!(
            "{ROOM_SELECT} WHERE r.id IN (SELECT room_id FROM room_members WHERE user_id = $1) \
             GROUP BY r.id ORDER BY r.last_activity DESC"
        );
        let records = sqlx::query_as::<_, RoomRecord>(&query)
            .bind(Uuid::from(user_id))
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        Ok(records.into_iter().map(Room::from).collect())
    }

    async fn add_member(&self, room_id: RoomId, user_id: UserId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"
            INSERT INTO room_members (room_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (room_id, user_id) DO NOTHING
            "#,
        )
        .bind(Uuid::from(room_id))
        .bind(Uuid::from(user_id))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(result.rows_affected() == 1)
    }

    async fn remove_member(
        &self,
        room_id: RoomId,
        user_id: UserId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(r#"DELETE FROM room_members WHERE room_id = $1 AND user_id = $2"#)
            .bind(Uuid::from(room_id))
            .bind(Uuid::from(user_id))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        Ok(result.rows_affected() == 1)
    }

    async fn touch_last_message(
        &self,
        room_id: RoomId,
        message_id: MessageId,
        at: Timestamp,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"UPDATE rooms SET last_message_id = $2, last_activity = $3 WHERE id = $1"#,
        )
        .bind(Uuid::from(room_id))
        .bind(Uuid::from(message_id))
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgPrivateChatRepository {
    pool: PgPool,
}

impl PgPrivateChatRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PrivateChatRepository for PgPrivateChatRepository {
    async fn find_by_id(&self, id: PrivateChatId) -> Result<Option<PrivateChat>, RepositoryError> {
        let record = sqlx::query_as::<_, PrivateChatRecord>(
            r#"
            SELECT id, user_a, user_b, last_message_id, last_activity
            FROM private_chats WHERE id = $1
            "#,
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(PrivateChat::try_from).transpose()
    }

    async fn list_for_participant(
        &self,
        user_id: UserId,
    ) -> Result<Vec<PrivateChat>, RepositoryError> {
        let records = sqlx::query_as::<_, PrivateChatRecord>(
            r#"
            SELECT id, user_a, user_b, last_message_id, last_activity
            FROM private_chats
            WHERE user_a = $1 OR user_b = $1
            ORDER BY last_activity DESC
            "#,
        )
        .bind(Uuid::from(user_id))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(PrivateChat::try_from).collect()
    }

    async fn touch_last_message(
        &self,
        chat_id: PrivateChatId,
        message_id: MessageId,
        at: Timestamp,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"UPDATE private_chats SET last_message_id = $2, last_activity = $3 WHERE id = $1"#,
        )
        .bind(Uuid::from(chat_id))
        .bind(Uuid::from(message_id))
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn create(&self, message: Message) -> Result<Message, RepositoryError> {
        let (room_id, private_chat_id) = match message.target {
            MessageTarget::Room(id) => (Some(Uuid::from(id)), None),
            MessageTarget::PrivateChat(id) => (None, Some(Uuid::from(id))),
        };

        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        // 以数据库精度为准，广播的时间戳与落库值一致
        let created_at: DateTime<Utc> = sqlx::query_scalar(
            r#"
            INSERT INTO messages
                (id, sender_id, content, file_url, file_type, room_id, private_chat_id, is_deleted, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING created_at
            "#,
        )
        .bind(Uuid::from(message.id))
        .bind(Uuid::from(message.sender_id))
        .bind(message.content.as_deref())
        .bind(message.file.as_ref().map(|file| file.url.as_str()))
        .bind(message.file.as_ref().map(|file| file.kind.as_str()))
        .bind(room_id)
        .bind(private_chat_id)
        .bind(message.is_deleted)
        .bind(message.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        for reader in &message.read_by {
            sqlx::query(
                r#"
                INSERT INTO message_reads (message_id, user_id)
                VALUES ($1, $2)
                ON CONFLICT (message_id, user_id) DO NOTHING
                "#,
            )
            .bind(Uuid::from(message.id))
            .bind(Uuid::from(*reader))
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;
        }

        tx.commit().await.map_err(map_sqlx_err)?;

        Ok(Message {
            created_at,
            ..message
        })
    }

    async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>, RepositoryError> {
        let record = sqlx::query_as::<_, MessageRecord>(
            r#"
            SELECT m.id, m.sender_id, m.content, m.file_url, m.file_type,
                   m.room_id, m.private_chat_id, m.is_deleted, m.created_at,
                   COALESCE(
                       array_agg(r.user_id ORDER BY r.seq) FILTER (WHERE r.user_id IS NOT NULL),
                       '{}'::uuid[]
                   ) AS read_by
            FROM messages m
            LEFT JOIN message_reads r ON r.message_id = m.id
            WHERE m.id = $1
            GROUP BY m.id
            "#,
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(Message::try_from).transpose()
    }

    async fn add_reader(&self, id: MessageId, user_id: UserId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"
            INSERT INTO message_reads (message_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (message_id, user_id) DO NOTHING
            "#,
        )
        .bind(Uuid::from(id))
        .bind(Uuid::from(user_id))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(result.rows_affected() == 1)
    }
}

#[derive(Clone)]
pub struct PgStorage {
    pub pool: PgPool,
    pub user_repository: Arc<PgUserRepository>,
    pub room_repository: Arc<PgRoomRepository>,
    pub private_chat_repository: Arc<PgPrivateChatRepository>,
    pub message_repository: Arc<PgMessageRepository>,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self {
            user_repository: Arc::new(PgUserRepository::new(pool.clone())),
            room_repository: Arc::new(PgRoomRepository::new(pool.clone())),
            private_chat_repository: Arc::new(PgPrivateChatRepository::new(pool.clone())),
            message_repository: Arc::new(PgMessageRepository::new(pool.clone())),
            pool,
        }
    }
}

pub async fn create_pg_pool(
    database_url: &str,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}
