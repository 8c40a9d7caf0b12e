//! Account identity and credentials.

use crate::error::ClientError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Authentication scheme of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthScheme {
    #[default]
    Standard,
    Pam,
    Gsi,
    Kerberos,
}

impl AuthScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthScheme::Standard => "standard",
            AuthScheme::Pam => "pam",
            AuthScheme::Gsi => "gsi",
            AuthScheme::Kerberos => "kerberos",
        }
    }
}

impl FromStr for AuthScheme {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" | "native" => Ok(AuthScheme::Standard),
            "pam" => Ok(AuthScheme::Pam),
            "gsi" => Ok(AuthScheme::Gsi),
            "kerberos" | "krb" => Ok(AuthScheme::Kerberos),
            other => Err(ClientError::InvalidArgument(format!(
                "unknown auth scheme: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of an account for session caching.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountKey {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub zone: String,
}

impl fmt::Display for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}@{}:{}", self.user, self.zone, self.host, self.port)
    }
}

/// Connection target and credentials for one iRODS user.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    pub host: String,
    pub port: u16,
    pub user: String,
    password: String,
    pub scheme: AuthScheme,
    pub zone: String,
    pub home_directory: String,
    pub default_resource: String,
    proxy_user: Option<String>,
    proxy_zone: Option<String>,
    /// Distinguished name set by GSI authentication.
    pub server_dn: Option<String>,
}

impl Account {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
        zone: impl Into<String>,
    ) -> Self {
        let user = user.into();
        let zone = zone.into();
        Self {
            host: host.into(),
            port,
            home_directory: format!("/{}/home/{}", zone, user),
            user,
            password: password.into(),
            scheme: AuthScheme::Standard,
            zone,
            default_resource: String::new(),
            proxy_user: None,
            proxy_zone: None,
            server_dn: None,
        }
    }

    pub fn with_scheme(mut self, scheme: AuthScheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Connects as `proxy_user#proxy_zone` on behalf of this account's user.
    pub fn with_proxy(mut self, proxy_user: impl Into<String>, proxy_zone: impl Into<String>) -> Self {
        self.proxy_user = Some(proxy_user.into());
        self.proxy_zone = Some(proxy_zone.into());
        self
    }

    pub fn with_home_directory(mut self, home: impl Into<String>) -> Self {
        self.home_directory = home.into();
        self
    }

    pub fn with_default_resource(mut self, resource: impl Into<String>) -> Self {
        self.default_resource = resource.into();
        self
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn proxy_user(&self) -> &str {
        match &self.proxy_user {
            Some(p) if !p.is_empty() => p,
            _ => &self.user,
        }
    }

    pub fn proxy_zone(&self) -> &str {
        match &self.proxy_zone {
            Some(z) if !z.is_empty() => z,
            _ => &self.zone,
        }
    }

    /// `user#zone` of the proxy identity, as sent in the auth response.
    pub fn proxy_identity(&self) -> String {
        format!("{}#{}", self.proxy_user(), self.proxy_zone())
    }

    pub fn key(&self) -> AccountKey {
        AccountKey {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            zone: self.zone.clone(),
        }
    }

    /// Standard-scheme copy of this account authenticating with `password`.
    pub fn derive_standard(&self, password: impl Into<String>) -> Self {
        let mut derived = self.clone();
        derived.password = password.into();
        derived.scheme = AuthScheme::Standard;
        derived
    }

    pub(crate) fn validate(&self) -> Result<(), ClientError> {
        if self.host.trim().is_empty() {
            return Err(ClientError::InvalidArgument("blank host".to_string()));
        }
        if self.user.trim().is_empty() {
            return Err(ClientError::InvalidArgument("blank user".to_string()));
        }
        if self.zone.trim().is_empty() {
            return Err(ClientError::InvalidArgument("blank zone".to_string()));
        }
        Ok(())
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("scheme", &self.scheme)
            .field("zone", &self.zone)
            .field("proxy_user", &self.proxy_user())
            .field("proxy_zone", &self.proxy_zone())
            .finish()
    }
}
