use std::sync::Arc;

use crate::auth::JwtValidator;
use crate::config::Settings;
use crate::delivery::{InboxStore, InboxTransport};
use crate::directory::AccountDirectory;
use crate::notification::{BroadcastEngine, NotificationStore};

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub jwt_validator: Arc<JwtValidator>,
    pub store: Arc<dyn NotificationStore>,
    pub inbox: Arc<InboxStore>,
    pub engine: Arc<BroadcastEngine>,
}

impl AppState {
    pub fn new(
        settings: Settings,
        store: Arc<dyn NotificationStore>,
        directory: Arc<dyn AccountDirectory>,
    ) -> Self {
        let jwt_validator = Arc::new(JwtValidator::new(&settings.jwt));
        let inbox = Arc::new(InboxStore::new(settings.inbox.clone()));
        let transport = Arc::new(InboxTransport::new(inbox.clone()));
        let engine = Arc::new(BroadcastEngine::new(
            store.clone(),
            directory,
            transport,
            settings.broadcast.clone(),
        ));

        Self {
            settings: Arc::new(settings),
            jwt_validator,
            store,
            inbox,
            engine,
        }
    }
}
