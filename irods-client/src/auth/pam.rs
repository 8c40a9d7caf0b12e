//! PAM authentication.
//!
//! The PAM password travels inside TLS. The server answers with a temporary
//! native password, which then authenticates a fresh connection.

use super::StartupResponse;
use crate::account::Account;
use crate::error::ClientError;
use crate::manager::ProtocolFactory;
use crate::protocol::Protocol;
use irods_protocol::message::{AuthPluginReqInp, PamAuthRequestInp, SslEndInp, SslStartInp};
use std::sync::Arc;

pub(super) async fn authenticate(
    protocol: Arc<Protocol>,
    account: &Account,
    startup: &StartupResponse,
    factory: &ProtocolFactory,
) -> Result<Arc<Protocol>, ClientError> {
    let config = protocol.config().clone();

    if !protocol.is_tls().await {
        tracing::debug!("Wrapping PAM exchange in TLS");
        protocol.irods_function_for_request(&SslStartInp).await?;
        let settings = config.tls.clone().unwrap_or_default();
        protocol.upgrade_to_tls(&settings).await?;
    }

    let ttl = config.pam_time_to_live_secs;
    let temporary = if startup.is_eirods() {
        let request = AuthPluginReqInp::pam(&account.user, account.password(), ttl);
        let reply = protocol.irods_function_for_request(&request).await?;
        reply
            .as_ref()
            .and_then(|r| r.tag("result_"))
            .map(|t| t.str_value().to_string())
    } else {
        let request = PamAuthRequestInp {
            pam_user: account.user.clone(),
            pam_password: account.password().to_string(),
            time_to_live: ttl,
        };
        let reply = protocol.irods_function_for_request(&request).await?;
        reply
            .as_ref()
            .and_then(|r| r.tag("irodsPamPassword"))
            .map(|t| t.str_value().to_string())
    };

    let temporary = match temporary {
        Some(password) if !password.is_empty() => password,
        _ => {
            return Err(ClientError::Authentication(
                "PAM login returned no temporary password".to_string(),
            ))
        }
    };

    protocol.irods_function_for_request(&SslEndInp).await?;
    protocol.disconnect_with_force().await;

    tracing::debug!("PAM accepted, reconnecting {} with temporary password", account.user);
    let derived = account.derive_standard(temporary);
    let fresh = factory.create_boxed(derived, config).await?;
    fresh.set_authenticating_account(account.clone());
    Ok(fresh)
}
