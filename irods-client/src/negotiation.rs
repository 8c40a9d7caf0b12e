//! Client/server SSL negotiation.

use crate::error::ClientError;
use crate::protocol::Protocol;
use irods_protocol::message::{CsNeg, PackingInstruction};
use irods_protocol::{MessageType, Tag};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tag name of a negotiation document.
pub const CS_NEG_PI: &str = "CS_NEG_PI";

/// Client or server SSL policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SslNegotiationPolicy {
    /// Do not request negotiation at startup.
    #[serde(rename = "no_negotiation")]
    NoNegotiation,
    #[serde(rename = "cs_neg_refuse")]
    Refuse,
    #[serde(rename = "cs_neg_require")]
    Require,
    #[serde(rename = "cs_neg_dont_care")]
    DontCare,
}

impl SslNegotiationPolicy {
    /// Name used in `CS_NEG_PI` documents.
    pub fn wire_name(&self) -> &'static str {
        match self {
            SslNegotiationPolicy::NoNegotiation => "NO_NEGOTIATION",
            SslNegotiationPolicy::Refuse => "CS_NEG_REFUSE",
            SslNegotiationPolicy::Require => "CS_NEG_REQUIRE",
            SslNegotiationPolicy::DontCare => "CS_NEG_DONT_CARE",
        }
    }

    /// Whether the startup pack should ask for negotiation.
    pub fn requests_negotiation(&self) -> bool {
        *self != SslNegotiationPolicy::NoNegotiation
    }
}

impl FromStr for SslNegotiationPolicy {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NO_NEGOTIATION" => Ok(SslNegotiationPolicy::NoNegotiation),
            "CS_NEG_REFUSE" => Ok(SslNegotiationPolicy::Refuse),
            "CS_NEG_REQUIRE" => Ok(SslNegotiationPolicy::Require),
            "CS_NEG_DONT_CARE" => Ok(SslNegotiationPolicy::DontCare),
            other => Err(ClientError::InvalidArgument(format!(
                "unknown negotiation policy: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for SslNegotiationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Result of combining the client and server policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationOutcome {
    Ssl,
    Tcp,
    Failure,
}

/// Looks up the outcome for a client/server policy pair.
///
/// A client that did not ask for negotiation is treated as refusing SSL.
pub fn outcome(client: SslNegotiationPolicy, server: SslNegotiationPolicy) -> NegotiationOutcome {
    use NegotiationOutcome::*;
    use SslNegotiationPolicy::*;

    let server = if server == NoNegotiation { Refuse } else { server };
    match (client, server) {
        (Require, Require) | (Require, DontCare) => Ssl,
        (Require, Refuse) => Tcp,
        (DontCare, Require) | (DontCare, DontCare) => Ssl,
        (DontCare, Refuse) => Tcp,
        (Refuse | NoNegotiation, Require) => Failure,
        (Refuse | NoNegotiation, DontCare) => Tcp,
        (Refuse | NoNegotiation, Refuse) => Tcp,
        (_, NoNegotiation) => Tcp,
    }
}

/// Runs negotiation after the server answered the startup pack with a
/// `CS_NEG_PI`. Returns the server's `Version_PI`.
pub(crate) async fn negotiate(
    protocol: &Protocol,
    client: SslNegotiationPolicy,
    server_offer: &Tag,
) -> Result<Tag, ClientError> {
    let status = server_offer.child_int("status")?;
    if status != 1 {
        return Err(ClientError::Negotiation(format!(
            "server reported negotiation status {}",
            status
        )));
    }
    let server: SslNegotiationPolicy = server_offer
        .child_str("result")?
        .parse()
        .map_err(|_| ClientError::Negotiation("unrecognized server policy".to_string()))?;

    let result = outcome(client, server);
    tracing::debug!(
        "Negotiation client={} server={} outcome={:?}",
        client,
        server,
        result
    );

    match result {
        NegotiationOutcome::Failure => {
            let notice = CsNeg::failure().to_tag().to_xml();
            protocol
                .irods_function_unidirectional(
                    MessageType::NegotiationRequest,
                    notice.as_bytes(),
                    0,
                )
                .await?;
            Err(ClientError::Negotiation(format!(
                "client policy {} is incompatible with server policy {}",
                client, server
            )))
        }
        NegotiationOutcome::Ssl => Err(ClientError::Unsupported(
            "negotiated SSL connections are not implemented".to_string(),
        )),
        NegotiationOutcome::Tcp => protocol
            .irods_function_for_negotiation(&CsNeg::use_tcp())
            .await?
            .ok_or_else(|| ClientError::Negotiation("no version after negotiation".to_string())),
    }
}
