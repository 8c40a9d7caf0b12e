//! Native challenge/response authentication.

use super::{AuthResponse, StartupResponse};
use crate::account::{Account, AuthScheme};
use crate::error::ClientError;
use crate::protocol::Protocol;
use irods_protocol::challenge::compute_challenge_response;
use irods_protocol::message::AuthResponseInp;
use irods_protocol::{api, MessageType};

pub(super) async fn authenticate(
    protocol: &Protocol,
    account: &Account,
    startup: &StartupResponse,
) -> Result<AuthResponse, ClientError> {
    let reply = protocol
        .irods_function(MessageType::ApiRequest, None, api::AUTH_REQUEST_AN)
        .await?
        .ok_or_else(|| ClientError::Authentication("no challenge from server".to_string()))?;
    let challenge = reply.child_str("challenge")?.to_string();

    let response = compute_challenge_response(&challenge, account.password())?;
    protocol
        .irods_function_for_request(&AuthResponseInp {
            response,
            username: account.proxy_identity(),
        })
        .await?;

    Ok(AuthResponse {
        authenticating_account: account.clone(),
        authenticated_account: account.clone(),
        challenge,
        startup: startup.clone(),
        scheme: AuthScheme::Standard,
    })
}
