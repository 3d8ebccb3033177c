use crate::config::Config;
use session::{ConnectionHub, Dispatcher};
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub hub: Arc<ConnectionHub>,
    pub started_at: Instant,
    pub cors_origin: Option<String>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let hub = Arc::new(ConnectionHub::new());
        let dispatcher = Arc::new(Dispatcher::new(hub.clone(), config.admin_password));
        Self {
            dispatcher,
            hub,
            started_at: Instant::now(),
            cors_origin: config.cors_origin,
        }
    }
}
