//! Web API 层。
//!
//! 提供 Axum 路由：`/health` 和 `/ws`。WebSocket 会话的全部事件委托给应用层的会话网关。

mod auth;
mod error;
mod routes;
mod state;
mod ws_connection;

pub use auth::{extract_credential, Claims, JwtIdentityVerifier};
pub use config::JwtConfig;
pub use error::ApiError;
pub use routes::router;
pub use state::AppState;
