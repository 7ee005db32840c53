use std::sync::Arc;
use std::time::Instant;

use actix::Addr;

use crate::chat_server::ChatServer;
use crate::config::Config;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub chat_server: Addr<ChatServer>,
    pub store: Arc<dyn Store>,
    pub config: Config,
    pub started_at: Instant,
}
