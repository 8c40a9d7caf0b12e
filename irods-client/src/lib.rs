//! # irods-client
//!
//! Async client engine for iRODS agents.
//!
//! This crate provides:
//! - Buffered agent connections with optional in-place TLS upgrade
//! - The request/response protocol engine with desync recovery
//! - Standard, PAM, GSI and Kerberos authentication
//! - Client/server SSL negotiation
//! - Per-account sessions, a discovered-properties cache and replica tokens
//! - Background reconnection to the agent's reconnect port

pub mod account;
pub mod auth;
pub mod config;
pub mod connection;
pub mod error;
pub mod manager;
pub mod negotiation;
pub mod properties_cache;
pub mod protocol;
mod reconnect;
pub mod replica_token;
pub mod server_properties;
pub mod session;
pub mod stream;
pub mod tls;

pub use account::{Account, AccountKey, AuthScheme};
pub use auth::{AuthMechanism, AuthResponse, SecurityContext, SecurityContextProvider, StartupResponse};
pub use config::{ConfigError, PipelineConfiguration, TlsSettings};
pub use connection::{leaked_connections, Connection, ProgressListener};
pub use error::ClientError;
pub use manager::{ProtocolFactory, ProtocolManager, SimpleProtocolManager};
pub use negotiation::SslNegotiationPolicy;
pub use properties_cache::DiscoveredServerPropertiesCache;
pub use protocol::Protocol;
pub use replica_token::ReplicaTokenCacheManager;
pub use server_properties::ServerProperties;
pub use session::Session;
