use std::sync::Arc;

use common::storage::ObjectStore;
use sea_orm::DatabaseConnection;
use tokio::sync::broadcast;

use crate::config::AppConfig;
use crate::events::AuthEvent;
use crate::mailer::MagicLinkSender;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    pub store: Arc<dyn ObjectStore>,
    pub mailer: Arc<dyn MagicLinkSender>,
    pub auth_events: broadcast::Sender<AuthEvent>,
}
