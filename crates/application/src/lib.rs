//! 实时聊天投递层的应用服务
//!
//! 会话认证、在线登记、频道路由、消息扇出和临时信号都在这里编排，
//! 存储和身份校验通过 trait 注入。

pub mod clock;
pub mod error;
pub mod events;
pub mod hub;
pub mod identity;
pub mod memory;
pub mod presence;
pub mod repository;
pub mod services;
pub mod session;

pub use clock::{Clock, SystemClock};
pub use error::{ApplicationError, ErrorKind};
pub use events::{ClientEvent, MessageView, ServerEvent};
pub use hub::ChannelHub;
pub use identity::IdentityVerifier;
pub use presence::{memory::MemoryPresenceRegistry, PresenceRegistry};
pub use repository::{MessageRepository, PrivateChatRepository, RoomRepository, UserRepository};
pub use services::{ChatGateway, GatewayDependencies, OutgoingMessage};
pub use session::{outbound_channel, OutboundReceiver, OutboundSender, Session, SessionId};
