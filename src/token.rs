//! Lazily populated bearer-token cache.
//!
//! One [`TokenCache`] is shared (via `Arc`) by every source that talks to
//! the same authenticated API. The first caller performs the token exchange;
//! concurrent callers wait on the same initialization instead of issuing
//! their own request.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::error::Result;
use crate::model::AccessToken;

/// Performs the underlying token exchange request.
#[async_trait]
pub trait TokenExchange: Send + Sync {
    async fn exchange(&self) -> Result<AccessToken>;
}

pub struct TokenCache {
    exchange: Arc<dyn TokenExchange>,
    slot: RwLock<Arc<OnceCell<AccessToken>>>,
}

impl TokenCache {
    pub fn new(exchange: Arc<dyn TokenExchange>) -> Self {
        Self {
            exchange,
            slot: RwLock::new(Arc::new(OnceCell::new())),
        }
    }

    /// Return the cached token, exchanging for one on first use.
    ///
    /// A failed exchange leaves the cache empty so a later call can retry.
    pub async fn token(&self) -> Result<AccessToken> {
        let cell = self.current();
        let token = cell
            .get_or_try_init(|| async {
                debug!("Exchanging for access token");
                let token = self.exchange.exchange().await?;
                info!(scheme = %token.scheme, "Access token acquired");
                Ok::<_, crate::error::SourceError>(token)
            })
            .await?;
        Ok(token.clone())
    }

    /// `authorization` header map for the cached token.
    pub async fn headers(&self) -> Result<HashMap<String, String>> {
        let token = self.token().await?;
        Ok(HashMap::from([(
            "authorization".to_string(),
            token.header_value(),
        )]))
    }

    /// Drop the cached token; the next call exchanges again.
    pub fn invalidate(&self) {
        let mut slot = self.slot.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        *slot = Arc::new(OnceCell::new());
        debug!("Access token invalidated");
    }

    #[must_use]
    pub fn is_populated(&self) -> bool {
        self.current().initialized()
    }

    fn current(&self) -> Arc<OnceCell<AccessToken>> {
        self.slot
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}
