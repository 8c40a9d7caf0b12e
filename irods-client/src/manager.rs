//! Protocol creation and disposal.

use crate::account::{Account, AuthScheme};
use crate::auth::{AuthMechanism, SecurityContextProvider};
use crate::config::PipelineConfiguration;
use crate::connection::Connection;
use crate::error::ClientError;
use crate::properties_cache::DiscoveredServerPropertiesCache;
use crate::protocol::Protocol;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Hands out authenticated protocols and takes them back.
pub trait ProtocolManager: Send + Sync + 'static {
    /// Returns an authenticated protocol for `account`.
    fn get_protocol(
        &self,
        account: &Account,
        config: Arc<PipelineConfiguration>,
    ) -> impl Future<Output = Result<Arc<Protocol>, ClientError>> + Send;

    /// Takes a protocol back with a graceful shutdown.
    fn return_protocol(
        &self,
        protocol: Arc<Protocol>,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// Takes a protocol back, closing it without a goodbye.
    fn return_with_force(&self, protocol: Arc<Protocol>) -> impl Future<Output = ()> + Send;

    fn discovered_properties(&self) -> Arc<DiscoveredServerPropertiesCache>;
}

type ProtocolFuture<'a> = Pin<Box<dyn Future<Output = Result<Arc<Protocol>, ClientError>> + Send + 'a>>;

/// Connects, authenticates and attaches server properties.
#[derive(Clone, Default)]
pub struct ProtocolFactory {
    properties: Arc<DiscoveredServerPropertiesCache>,
    gsi: Option<Arc<dyn SecurityContextProvider>>,
    kerberos: Option<Arc<dyn SecurityContextProvider>>,
}

impl ProtocolFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_properties_cache(mut self, cache: Arc<DiscoveredServerPropertiesCache>) -> Self {
        self.properties = cache;
        self
    }

    pub fn with_gsi_provider(mut self, provider: Arc<dyn SecurityContextProvider>) -> Self {
        self.gsi = Some(provider);
        self
    }

    pub fn with_kerberos_provider(mut self, provider: Arc<dyn SecurityContextProvider>) -> Self {
        self.kerberos = Some(provider);
        self
    }

    pub fn properties(&self) -> &Arc<DiscoveredServerPropertiesCache> {
        &self.properties
    }

    fn mechanism_for(&self, scheme: AuthScheme) -> Result<AuthMechanism, ClientError> {
        let missing = |name: &str| {
            ClientError::Unsupported(format!("no {} security context provider configured", name))
        };
        Ok(match scheme {
            AuthScheme::Standard => AuthMechanism::Standard,
            AuthScheme::Pam => AuthMechanism::Pam,
            AuthScheme::Gsi => AuthMechanism::Gsi(self.gsi.clone().ok_or_else(|| missing("GSI"))?),
            AuthScheme::Kerberos => {
                AuthMechanism::Kerberos(self.kerberos.clone().ok_or_else(|| missing("Kerberos"))?)
            }
        })
    }

    /// Opens and authenticates a new protocol.
    pub async fn create(
        &self,
        account: Account,
        config: Arc<PipelineConfiguration>,
    ) -> Result<Arc<Protocol>, ClientError> {
        account.validate()?;
        let mechanism = self.mechanism_for(account.scheme)?;

        let connection = Connection::connect(&account.host, account.port, config.clone()).await?;
        let protocol = Arc::new(Protocol::new(connection, account, config));
        let protocol = mechanism.authenticate(protocol, self).await?;

        if let Err(e) = self.attach_server_properties(&protocol).await {
            tracing::warn!("Could not read server properties: {}", e);
            protocol.disconnect_with_force().await;
            return Err(e);
        }
        Ok(protocol)
    }

    /// Boxed [`ProtocolFactory::create`], for authentication schemes that
    /// open a second connection.
    pub(crate) fn create_boxed(
        &self,
        account: Account,
        config: Arc<PipelineConfiguration>,
    ) -> ProtocolFuture<'_> {
        Box::pin(self.create(account, config))
    }

    async fn attach_server_properties(&self, protocol: &Protocol) -> Result<(), ClientError> {
        if protocol.server_properties().is_some() {
            return Ok(());
        }
        let account = protocol.account();
        if let Some(cached) = self.properties.server_properties(&account.host, &account.zone) {
            protocol.set_server_properties(cached);
            return Ok(());
        }
        let probed = protocol.probe_server_properties().await?;
        self.properties
            .cache_server_properties(&account.host, &account.zone, probed)
    }
}

/// Creates a fresh protocol for every request.
#[derive(Clone, Default)]
pub struct SimpleProtocolManager {
    factory: ProtocolFactory,
}

impl SimpleProtocolManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_factory(factory: ProtocolFactory) -> Self {
        Self { factory }
    }

    pub fn factory(&self) -> &ProtocolFactory {
        &self.factory
    }
}

impl ProtocolManager for SimpleProtocolManager {
    async fn get_protocol(
        &self,
        account: &Account,
        config: Arc<PipelineConfiguration>,
    ) -> Result<Arc<Protocol>, ClientError> {
        self.factory.create(account.clone(), config).await
    }

    async fn return_protocol(&self, protocol: Arc<Protocol>) -> Result<(), ClientError> {
        protocol.disconnect().await
    }

    async fn return_with_force(&self, protocol: Arc<Protocol>) {
        protocol.disconnect_with_force().await
    }

    fn discovered_properties(&self) -> Arc<DiscoveredServerPropertiesCache> {
        self.factory.properties().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_provider_is_unsupported() {
        let factory = ProtocolFactory::new();
        let account = Account::new("localhost", 1247, "rods", "", "tempZone")
            .with_scheme(AuthScheme::Gsi);
        let result = factory
            .create(account, Arc::new(PipelineConfiguration::default()))
            .await;
        assert!(matches!(result, Err(ClientError::Unsupported(_))));
    }

    #[tokio::test]
    async fn test_blank_account_rejected() {
        let factory = ProtocolFactory::new();
        let account = Account::new(" ", 1247, "rods", "rods", "tempZone");
        let result = factory
            .create(account, Arc::new(PipelineConfiguration::default()))
            .await;
        assert!(matches!(result, Err(ClientError::InvalidArgument(_))));
    }

    #[test]
    fn test_shared_properties_cache() {
        let cache = Arc::new(DiscoveredServerPropertiesCache::new());
        let manager = SimpleProtocolManager::with_factory(
            ProtocolFactory::new().with_properties_cache(cache.clone()),
        );
        assert!(Arc::ptr_eq(&manager.discovered_properties(), &cache));
    }
}
