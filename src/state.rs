use std::sync::Arc;

use sqlx::PgPool;

use crate::config;
use crate::learning::{LearningStatusHook, NoopLearningStatus};
use crate::signing::{SignedUrlCache, StaticSigner, UrlSigner};
use crate::store::memory::MemoryStore;
use crate::store::postgres::PostgresStore;
use crate::store::{IdentityStore, NotificationStore, ResourceStore};
use crate::workflow::engine::ApprovalEngine;

/// Injected collaborators shared by all handlers. Built once at startup with
/// Postgres stores; tests build the same state over the in-memory store.
#[derive(Clone)]
pub struct AppState {
    pub identities: Arc<dyn IdentityStore>,
    pub resources: Arc<dyn ResourceStore>,
    pub notifications: Arc<dyn NotificationStore>,
    pub learning: Arc<dyn LearningStatusHook>,
    pub signer: Arc<dyn UrlSigner>,
    pub url_cache: Arc<SignedUrlCache>,
}

impl AppState {
    pub fn postgres(pool: PgPool, signer: Arc<dyn UrlSigner>) -> Self {
        let store = Arc::new(PostgresStore::new(pool));
        Self {
            identities: store.clone(),
            resources: store.clone(),
            notifications: store,
            learning: Arc::new(NoopLearningStatus),
            signer,
            url_cache: Arc::new(SignedUrlCache::new(
                config::config().signing.cache_expiry_margin_secs,
            )),
        }
    }

    pub fn in_memory() -> Self {
        Self::with_memory_store(Arc::new(MemoryStore::new()))
    }

    /// Same as [`AppState::in_memory`], over a store the caller keeps a handle
    /// to (tests seed fixtures through it).
    pub fn with_memory_store(store: Arc<MemoryStore>) -> Self {
        Self {
            identities: store.clone(),
            resources: store.clone(),
            notifications: store,
            learning: Arc::new(NoopLearningStatus),
            signer: Arc::new(StaticSigner { base: "https://storage.invalid".to_string() }),
            url_cache: Arc::new(SignedUrlCache::new(
                config::config().signing.cache_expiry_margin_secs,
            )),
        }
    }

    pub fn engine(&self) -> ApprovalEngine {
        ApprovalEngine::new(
            self.identities.clone(),
            self.resources.clone(),
            self.notifications.clone(),
            self.learning.clone(),
            config::config().scope.max_tree_depth,
        )
    }
}
