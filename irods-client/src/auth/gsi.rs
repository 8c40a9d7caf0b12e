//! Token-exchange authentication for GSI and Kerberos.
//!
//! The security library lives outside this crate. Callers plug it in through
//! [`SecurityContextProvider`].

use super::{AuthResponse, StartupResponse};
use crate::account::{Account, AuthScheme};
use crate::error::ClientError;
use crate::protocol::Protocol;
use irods_protocol::MessageType;

/// Creates security contexts for an account.
pub trait SecurityContextProvider: Send + Sync {
    fn new_context(&self, account: &Account) -> Result<Box<dyn SecurityContext>, String>;
}

/// One side of a GSS-style context establishment.
pub trait SecurityContext: Send {
    /// Consumes the peer's last token and produces the next one to send.
    fn init_sec_context(&mut self, input: &[u8]) -> Result<Vec<u8>, String>;

    fn is_established(&self) -> bool;

    /// Distinguished name of the server, once established.
    fn peer_name(&self) -> Option<String> {
        None
    }
}

pub(super) async fn authenticate(
    protocol: &Protocol,
    account: &Account,
    startup: &StartupResponse,
    provider: &dyn SecurityContextProvider,
    api_number: i32,
    scheme: AuthScheme,
) -> Result<AuthResponse, ClientError> {
    let mut context = provider
        .new_context(account)
        .map_err(ClientError::Authentication)?;

    protocol
        .irods_function_unidirectional(MessageType::ApiRequest, &[], api_number)
        .await?;

    let mut input = Vec::new();
    let mut rounds = 0u32;
    loop {
        let output = context
            .init_sec_context(&input)
            .map_err(ClientError::Authentication)?;
        if !output.is_empty() {
            protocol.send_token(&output).await?;
        }
        if context.is_established() {
            break;
        }
        input = protocol.read_token().await?;
        rounds += 1;
        tracing::trace!("Security context round {}", rounds);
    }

    let mut authenticated = account.clone();
    if let Some(dn) = context.peer_name() {
        authenticated.server_dn = Some(dn);
    }
    Ok(AuthResponse {
        authenticating_account: account.clone(),
        authenticated_account: authenticated,
        challenge: String::new(),
        startup: startup.clone(),
        scheme,
    })
}
