//! Per-caller cache of authenticated protocols, keyed by account.

use crate::account::{Account, AccountKey};
use crate::config::PipelineConfiguration;
use crate::error::ClientError;
use crate::manager::{ProtocolManager, SimpleProtocolManager};
use crate::properties_cache::DiscoveredServerPropertiesCache;
use crate::protocol::Protocol;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

pub(crate) type SessionMap = Mutex<HashMap<AccountKey, Arc<Protocol>>>;

/// A set of open protocols, one per account.
///
/// Protocols keep a weak link back to the map so a forced disconnect drops
/// its own entry.
pub struct Session<M: ProtocolManager = SimpleProtocolManager> {
    manager: Arc<M>,
    config: Arc<PipelineConfiguration>,
    protocols: Arc<SessionMap>,
}

impl Session<SimpleProtocolManager> {
    pub fn new(config: PipelineConfiguration) -> Self {
        Self::with_manager(Arc::new(SimpleProtocolManager::new()), Arc::new(config))
    }
}

impl<M: ProtocolManager> Session<M> {
    pub fn with_manager(manager: Arc<M>, config: Arc<PipelineConfiguration>) -> Self {
        Self {
            manager,
            config,
            protocols: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &Arc<PipelineConfiguration> {
        &self.config
    }

    pub fn manager(&self) -> &Arc<M> {
        &self.manager
    }

    /// Returns the cached protocol for `account`, opening one if needed.
    pub async fn current_connection(&self, account: &Account) -> Result<Arc<Protocol>, ClientError> {
        let key = account.key();
        let cached = self.protocols.lock().get(&key).cloned();
        if let Some(protocol) = cached {
            if protocol.is_connected().await {
                return Ok(protocol);
            }
            tracing::debug!("Cached protocol for {} is closed, replacing", key);
            self.manager.return_with_force(protocol).await;
        }

        let protocol = self
            .manager
            .get_protocol(account, self.config.clone())
            .await?;
        protocol.attach_session(Arc::downgrade(&self.protocols), key.clone());

        let existing = {
            let mut protocols = self.protocols.lock();
            match protocols.get(&key) {
                Some(existing) => Some(existing.clone()),
                None => {
                    protocols.insert(key.clone(), protocol.clone());
                    None
                }
            }
        };
        if let Some(existing) = existing {
            tracing::debug!("Concurrent open for {}, keeping the cached protocol", key);
            if let Err(e) = self.manager.return_protocol(protocol).await {
                tracing::debug!("Closing surplus protocol failed: {}", e);
            }
            return Ok(existing);
        }
        tracing::debug!("Session now caches {} protocol(s)", self.cached_count());
        Ok(protocol)
    }

    /// Returns every cached protocol to the manager.
    pub async fn close_session(&self) -> Result<(), ClientError> {
        let drained: Vec<Arc<Protocol>> = self.protocols.lock().drain().map(|(_, p)| p).collect();
        let mut first_error = None;
        for protocol in drained {
            if let Err(e) = self.manager.return_protocol(protocol).await {
                tracing::warn!("Error closing protocol: {}", e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Gracefully closes the protocol cached for `account`, if any.
    pub async fn close_session_for(&self, account: &Account) -> Result<(), ClientError> {
        let removed = self.protocols.lock().remove(&account.key());
        match removed {
            Some(protocol) => self.manager.return_protocol(protocol).await,
            None => Ok(()),
        }
    }

    /// Drops the protocol cached for `account` after it failed.
    pub async fn discard_session_for_errors(&self, account: &Account) {
        let removed = self.protocols.lock().remove(&account.key());
        if let Some(protocol) = removed {
            tracing::info!("Discarding session for {} after errors", account.key());
            self.manager.return_with_force(protocol).await;
        }
    }

    pub async fn return_with_force(&self, protocol: Arc<Protocol>) {
        self.manager.return_with_force(protocol).await
    }

    pub fn cached_count(&self) -> usize {
        self.protocols.lock().len()
    }

    pub fn discovered_properties(&self) -> Arc<DiscoveredServerPropertiesCache> {
        self.manager.discovered_properties()
    }
}
