use axum::extract::FromRef;

use crate::collection_store::CollectionStore;
use crate::user::UserStore;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedCollectionStore = Arc<dyn CollectionStore>;
pub type GuardedUserStore = Arc<dyn UserStore>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub collection_store: GuardedCollectionStore,
    pub user_store: GuardedUserStore,
}

impl FromRef<ServerState> for GuardedCollectionStore {
    fn from_ref(input: &ServerState) -> Self {
        input.collection_store.clone()
    }
}

impl FromRef<ServerState> for GuardedUserStore {
    fn from_ref(input: &ServerState) -> Self {
        input.user_store.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
