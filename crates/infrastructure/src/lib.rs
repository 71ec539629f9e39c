//! 基础设施层实现。
//!
//! 提供 PostgreSQL 持久化网关，实现应用层定义的仓储接口。

pub mod builder;
pub mod migrations;
pub mod repository;

pub use builder::{Infrastructure, InfrastructureConfig, InfrastructureError};
pub use migrations::MIGRATOR;
pub use repository::{
    create_pg_pool, PgMessageRepository, PgPrivateChatRepository, PgRoomRepository, PgStorage,
    PgUserRepository,
};
