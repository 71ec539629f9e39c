mod dispatcher;
mod gateway;
mod membership_router;
mod presence_service;
mod signal_bus;


pub use dispatcher::{FanOutDispatcher, FanOutDispatcherDependencies, OutgoingMessage};
pub use gateway::{ChatGateway, GatewayDependencies};
pub use membership_router::{MembershipRouter, MembershipRouterDependencies};
pub use presence_service::{PresenceService, PresenceServiceDependencies};
pub use signal_bus::{SignalBus, SignalBusDependencies};
