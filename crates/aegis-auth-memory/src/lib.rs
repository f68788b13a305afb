//! In-memory storage backend for the Aegis authorization server.
//!
//! Implements every storage trait from `aegis-auth` over
//! `tokio::sync::RwLock`-guarded maps. Intended for tests, examples,
//! and single-process deployments; nothing survives a restart.
//!
//! ```ignore
//! use aegis_auth_memory::MemoryBackend;
//!
//! let backend = MemoryBackend::new();
//! let issuer = TokenIssuer::new(config, codec, backend.tokens());
//! ```

mod accounts;
mod applications;
mod grants;
mod jti;
mod tokens;

pub use accounts::MemoryAccountStorage;
pub use applications::MemoryApplicationStorage;
pub use grants::MemoryGrantStorage;
pub use jti::MemoryJtiStorage;
pub use tokens::MemoryTokenStorage;

use std::sync::Arc;

use aegis_auth::storage::{
    AccountStorage, ApplicationStorage, GrantStorage, JtiStorage, TokenStorage,
};

/// All five stores behind shareable trait objects.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    accounts: Arc<MemoryAccountStorage>,
    applications: Arc<MemoryApplicationStorage>,
    grants: Arc<MemoryGrantStorage>,
    jti: Arc<MemoryJtiStorage>,
    tokens: Arc<MemoryTokenStorage>,
}

impl MemoryBackend {
    /// Creates a backend with empty stores.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn accounts(&self) -> Arc<dyn AccountStorage> {
        Arc::clone(&self.accounts) as _
    }

    #[must_use]
    pub fn applications(&self) -> Arc<dyn ApplicationStorage> {
        Arc::clone(&self.applications) as _
    }

    #[must_use]
    pub fn grants(&self) -> Arc<dyn GrantStorage> {
        Arc::clone(&self.grants) as _
    }

    #[must_use]
    pub fn jti(&self) -> Arc<dyn JtiStorage> {
        Arc::clone(&self.jti) as _
    }

    #[must_use]
    pub fn tokens(&self) -> Arc<dyn TokenStorage> {
        Arc::clone(&self.tokens) as _
    }

    /// Registers an application directly, bypassing the trait surface.
    pub async fn insert_application(&self, application: aegis_auth::types::Application) {
        self.applications.insert(application).await;
    }
}
