//! Authentication mechanisms.
//!
//! Every scheme shares one startup sequence: send the startup pack, run
//! negotiation when the server asks for it, arm the PAM flush gate, then
//! hand over to the scheme-specific exchange.

mod gsi;
mod pam;
mod standard;

pub use gsi::{SecurityContext, SecurityContextProvider};

use crate::account::{Account, AuthScheme};
use crate::config::PipelineConfiguration;
use crate::error::ClientError;
use crate::manager::ProtocolFactory;
use crate::negotiation::{self, CS_NEG_PI};
use crate::protocol::Protocol;
use crate::server_properties::ReleaseVersion;
use irods_protocol::message::{PackingInstruction, StartupPack};
use irods_protocol::{api, MessageType, ProtocolError, Tag, EIRODS_COOKIE};
use std::fmt;
use std::sync::Arc;

/// Contents of the server's `Version_PI`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupResponse {
    pub status: i32,
    pub release_version: String,
    pub api_version: String,
    pub reconn_port: u16,
    pub reconn_addr: String,
    pub cookie: i32,
    pub negotiated_ssl: bool,
}

impl StartupResponse {
    pub fn from_tag(tag: &Tag) -> Result<Self, ProtocolError> {
        let optional_int = |name: &str| -> Result<i32, ProtocolError> {
            tag.tag(name).map(Tag::int_value).transpose().map(|v| v.unwrap_or(0))
        };
        let reconn_port = optional_int("reconnPort")?;
        Ok(Self {
            status: tag.child_int("status")?,
            release_version: tag.child_str("relVersion")?.to_string(),
            api_version: tag.child_str("apiVersion")?.to_string(),
            reconn_port: u16::try_from(reconn_port).unwrap_or(0),
            reconn_addr: tag.tag("reconnAddr").map(Tag::str_value).unwrap_or("").to_string(),
            cookie: optional_int("cookie")?,
            negotiated_ssl: false,
        })
    }

    /// Whether the server speaks the iRODS 4 plugin protocol.
    pub fn is_eirods(&self) -> bool {
        self.cookie >= EIRODS_COOKIE
            || ReleaseVersion::parse(&self.release_version).is_some_and(|v| v.major >= 4)
    }

    /// Whether the server is a 4.0.x release, which needs the extra header flush.
    pub fn needs_pam_flush(&self) -> bool {
        self.release_version.starts_with("rods4.0.")
    }
}

/// Outcome of a successful authentication.
#[derive(Debug, Clone)]
pub struct AuthResponse {
    /// The account the caller asked to authenticate.
    pub authenticating_account: Account,
    /// The account the server accepted, possibly with server-provided fields.
    pub authenticated_account: Account,
    pub challenge: String,
    pub startup: StartupResponse,
    pub scheme: AuthScheme,
}

/// An authentication mechanism.
#[derive(Clone)]
pub enum AuthMechanism {
    Standard,
    Pam,
    Gsi(Arc<dyn SecurityContextProvider>),
    Kerberos(Arc<dyn SecurityContextProvider>),
}

impl fmt::Debug for AuthMechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMechanism::Standard => f.write_str("Standard"),
            AuthMechanism::Pam => f.write_str("Pam"),
            AuthMechanism::Gsi(_) => f.write_str("Gsi"),
            AuthMechanism::Kerberos(_) => f.write_str("Kerberos"),
        }
    }
}

impl AuthMechanism {
    pub fn scheme(&self) -> AuthScheme {
        match self {
            AuthMechanism::Standard => AuthScheme::Standard,
            AuthMechanism::Pam => AuthScheme::Pam,
            AuthMechanism::Gsi(_) => AuthScheme::Gsi,
            AuthMechanism::Kerberos(_) => AuthScheme::Kerberos,
        }
    }

    /// Authenticates the account `protocol` was opened for.
    ///
    /// Returns the authenticated protocol, which for PAM is a fresh one. On
    /// failure the connection is closed before the error is returned.
    pub async fn authenticate(
        &self,
        protocol: Arc<Protocol>,
        factory: &ProtocolFactory,
    ) -> Result<Arc<Protocol>, ClientError> {
        match self.run(protocol.clone(), factory).await {
            Ok(authenticated) => Ok(authenticated),
            Err(e) => {
                tracing::warn!(
                    "{} authentication for {} failed: {}",
                    self.scheme(),
                    protocol.account().key(),
                    e
                );
                protocol.disconnect_with_force().await;
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        protocol: Arc<Protocol>,
        factory: &ProtocolFactory,
    ) -> Result<Arc<Protocol>, ClientError> {
        let account = protocol.account().clone();
        let config = protocol.config().clone();

        let startup = send_startup_pack(&protocol, &account, &config).await?;
        protocol
            .set_pam_flush(config.force_pam_flush || startup.needs_pam_flush())
            .await;

        let response = match self {
            AuthMechanism::Standard => standard::authenticate(&protocol, &account, &startup).await?,
            AuthMechanism::Pam => {
                return pam::authenticate(protocol, &account, &startup, factory).await;
            }
            AuthMechanism::Gsi(provider) => {
                gsi::authenticate(
                    &protocol,
                    &account,
                    &startup,
                    provider.as_ref(),
                    api::GSI_AUTH_REQUEST_AN,
                    AuthScheme::Gsi,
                )
                .await?
            }
            AuthMechanism::Kerberos(provider) => {
                gsi::authenticate(
                    &protocol,
                    &account,
                    &startup,
                    provider.as_ref(),
                    api::KRB_AUTH_REQUEST_AN,
                    AuthScheme::Kerberos,
                )
                .await?
            }
        };

        tracing::info!(
            "Authenticated {} with {}",
            response.authenticated_account.key(),
            response.scheme
        );
        protocol.set_auth_response(response);

        if config.reconnect && startup.reconn_port > 0 {
            tracing::debug!(
                "Starting reconnection to {}:{}",
                startup.reconn_addr,
                startup.reconn_port
            );
            protocol.start_reconnection(&startup);
        }
        Ok(protocol)
    }
}

async fn send_startup_pack(
    protocol: &Protocol,
    account: &Account,
    config: &PipelineConfiguration,
) -> Result<StartupResponse, ClientError> {
    let pack = StartupPack::new(
        account.proxy_user(),
        account.proxy_zone(),
        &account.user,
        &account.zone,
    )
    .with_reconnect(config.reconnect)
    .with_negotiation(config.negotiation_policy.requests_negotiation());

    let reply = protocol
        .irods_function(MessageType::Connect, Some(&pack.to_tag()), 0)
        .await?
        .ok_or_else(|| ClientError::Authentication("no reply to startup pack".to_string()))?;

    let version = if reply.name() == CS_NEG_PI {
        negotiation::negotiate(protocol, config.negotiation_policy, &reply).await?
    } else {
        reply
    };

    let startup = StartupResponse::from_tag(&version)?;
    if startup.status < 0 {
        return Err(ClientError::from_status(startup.status, ""));
    }
    tracing::debug!(
        "Server {} reports {} (api {})",
        account.host,
        startup.release_version,
        startup.api_version
    );
    protocol.set_startup_response(startup.clone());
    Ok(startup)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(release: &str, cookie: i32) -> Tag {
        Tag::new("Version_PI")
            .value_child("status", 0)
            .value_child("relVersion", release)
            .value_child("apiVersion", "d")
            .value_child("reconnPort", 20001)
            .value_child("reconnAddr", "10.0.0.5")
            .value_child("cookie", cookie)
    }

    #[test]
    fn test_startup_response_from_tag() {
        let startup = StartupResponse::from_tag(&version("rods4.2.8", 400)).unwrap();
        assert_eq!(startup.reconn_port, 20001);
        assert_eq!(startup.reconn_addr, "10.0.0.5");
        assert!(startup.is_eirods());
        assert!(!startup.needs_pam_flush());
        assert!(!startup.negotiated_ssl);
    }

    #[test]
    fn test_optional_fields_default() {
        let tag = Tag::new("Version_PI")
            .value_child("status", 0)
            .value_child("relVersion", "rods3.3.1")
            .value_child("apiVersion", "d");
        let startup = StartupResponse::from_tag(&tag).unwrap();
        assert_eq!(startup.reconn_port, 0);
        assert_eq!(startup.cookie, 0);
        assert!(!startup.is_eirods());
    }

    #[test]
    fn test_eirods_detection() {
        assert!(StartupResponse::from_tag(&version("rods3.3", 301)).unwrap().is_eirods());
        assert!(!StartupResponse::from_tag(&version("rods3.3", 300)).unwrap().is_eirods());
        assert!(StartupResponse::from_tag(&version("rods4.0.3", 0))
            .unwrap()
            .needs_pam_flush());
    }

    #[test]
    fn test_mechanism_scheme() {
        assert_eq!(AuthMechanism::Standard.scheme(), AuthScheme::Standard);
        assert_eq!(AuthMechanism::Pam.scheme(), AuthScheme::Pam);
        assert_eq!(format!("{:?}", AuthMechanism::Pam), "Pam");
    }
}
