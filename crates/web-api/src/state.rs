use std::sync::Arc;

use application::ChatGateway;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<ChatGateway>,
}

impl AppState {
    pub fn new(gateway: Arc<ChatGateway>) -> Self {
        Self { gateway }
    }
}
