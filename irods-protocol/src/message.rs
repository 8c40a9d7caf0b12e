//! Packing instructions used by the connection substrate.
//!
//! A packing instruction knows its API number and how to render itself as a
//! tag tree. Only the requests the engine itself issues live here.

use crate::api;
use crate::tag::Tag;
use crate::{API_VERSION, RECONN_FLAG, RELEASE_VERSION};

/// A request body that can be sent with [`MessageType::ApiRequest`].
///
/// [`MessageType::ApiRequest`]: crate::MessageType::ApiRequest
pub trait PackingInstruction {
    /// API number placed in the header `intInfo`. Zero for non-API messages.
    fn api_number(&self) -> i32 {
        0
    }

    fn to_tag(&self) -> Tag;
}

/// Startup option for a plain connection.
pub const OPTION_IINIT: &str = "iinit";

/// Startup option asking the server to run client/server negotiation.
pub const OPTION_REQUEST_NEGOTIATION: &str = "request_server_negotiation";

/// `StartupPack_PI`, sent with `RODS_CONNECT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupPack {
    pub proxy_user: String,
    pub proxy_zone: String,
    pub client_user: String,
    pub client_zone: String,
    pub reconnect: bool,
    pub option: String,
}

impl StartupPack {
    pub fn new(
        proxy_user: impl Into<String>,
        proxy_zone: impl Into<String>,
        client_user: impl Into<String>,
        client_zone: impl Into<String>,
    ) -> Self {
        Self {
            proxy_user: proxy_user.into(),
            proxy_zone: proxy_zone.into(),
            client_user: client_user.into(),
            client_zone: client_zone.into(),
            reconnect: false,
            option: OPTION_IINIT.to_string(),
        }
    }

    pub fn with_reconnect(mut self, reconnect: bool) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn with_negotiation(mut self, negotiate: bool) -> Self {
        self.option = if negotiate {
            OPTION_REQUEST_NEGOTIATION
        } else {
            OPTION_IINIT
        }
        .to_string();
        self
    }
}

impl PackingInstruction for StartupPack {
    fn to_tag(&self) -> Tag {
        Tag::new("StartupPack_PI")
            .value_child("irodsProt", 1)
            .value_child("reconnFlag", if self.reconnect { RECONN_FLAG } else { 0 })
            .value_child("connectCnt", 0)
            .value_child("proxyUser", &self.proxy_user)
            .value_child("proxyRcatZone", &self.proxy_zone)
            .value_child("clientUser", &self.client_user)
            .value_child("clientRcatZone", &self.client_zone)
            .value_child("relVersion", RELEASE_VERSION)
            .value_child("apiVersion", API_VERSION)
            .value_child("option", &self.option)
    }
}

/// `authResponseInp_PI`, the answer to the standard challenge.
#[derive(Debug, Clone)]
pub struct AuthResponseInp {
    pub response: String,
    /// `user#zone` of the proxy identity.
    pub username: String,
}

impl PackingInstruction for AuthResponseInp {
    fn api_number(&self) -> i32 {
        api::AUTH_RESPONSE_AN
    }

    fn to_tag(&self) -> Tag {
        Tag::new("authResponseInp_PI")
            .value_child("response", &self.response)
            .value_child("username", &self.username)
    }
}

/// `pamAuthRequestInp_PI`, PAM login for pre-4.x servers.
#[derive(Debug, Clone)]
pub struct PamAuthRequestInp {
    pub pam_user: String,
    pub pam_password: String,
    pub time_to_live: i32,
}

impl PackingInstruction for PamAuthRequestInp {
    fn api_number(&self) -> i32 {
        api::PAM_AUTH_REQUEST_AN
    }

    fn to_tag(&self) -> Tag {
        Tag::new("pamAuthRequestInp_PI")
            .value_child("pamUser", &self.pam_user)
            .value_child("pamPassword", &self.pam_password)
            .value_child("timeToLive", self.time_to_live)
    }
}

/// `authPlugReqInp_PI`, plugin authentication on 4.x servers.
#[derive(Debug, Clone)]
pub struct AuthPluginReqInp {
    pub scheme: String,
    pub context: String,
}

impl AuthPluginReqInp {
    /// PAM plugin request with the `a_user=..;a_pw=..;a_ttl=..` context.
    pub fn pam(user: &str, password: &str, time_to_live: i32) -> Self {
        Self {
            scheme: "pam".to_string(),
            context: format!("a_user={};a_pw={};a_ttl={}", user, password, time_to_live),
        }
    }
}

impl PackingInstruction for AuthPluginReqInp {
    fn api_number(&self) -> i32 {
        api::AUTH_PLUG_REQ_AN
    }

    fn to_tag(&self) -> Tag {
        Tag::new("authPlugReqInp_PI")
            .value_child("auth_scheme_", &self.scheme)
            .value_child("context_", &self.context)
    }
}

/// `sslStartInp_PI`, asks the agent to switch the socket to TLS.
#[derive(Debug, Clone, Copy, Default)]
pub struct SslStartInp;

impl PackingInstruction for SslStartInp {
    fn api_number(&self) -> i32 {
        api::SSL_START_AN
    }

    fn to_tag(&self) -> Tag {
        Tag::new("sslStartInp_PI").value_child("arg0", "")
    }
}

/// `sslEndInp_PI`, ends a TLS session started with [`SslStartInp`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SslEndInp;

impl PackingInstruction for SslEndInp {
    fn api_number(&self) -> i32 {
        api::SSL_END_AN
    }

    fn to_tag(&self) -> Tag {
        Tag::new("sslEndInp_PI").value_child("arg0", "")
    }
}

/// `INT_PI` sent to `OPR_COMPLETE_AN`.
#[derive(Debug, Clone, Copy)]
pub struct OperationComplete {
    pub status: i32,
}

impl PackingInstruction for OperationComplete {
    fn api_number(&self) -> i32 {
        api::OPR_COMPLETE_AN
    }

    fn to_tag(&self) -> Tag {
        Tag::new("INT_PI").value_child("myInt", self.status)
    }
}

/// Processing state reported in a reconnect reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcState {
    Processing,
    Receiving,
    Other(i32),
}

impl From<i32> for ProcState {
    fn from(v: i32) -> Self {
        match v {
            0 => ProcState::Processing,
            1 => ProcState::Receiving,
            other => ProcState::Other(other),
        }
    }
}

/// `ReconnMsg_PI`, sent with `RODS_RECONNECT`.
#[derive(Debug, Clone, Copy)]
pub struct ReconnMsg {
    pub status: i32,
    pub cookie: i32,
    pub proc_state: i32,
    pub flag: i32,
}

impl ReconnMsg {
    pub fn new(cookie: i32) -> Self {
        Self {
            status: 0,
            cookie,
            proc_state: 0,
            flag: 0,
        }
    }
}

impl PackingInstruction for ReconnMsg {
    fn to_tag(&self) -> Tag {
        Tag::new("ReconnMsg_PI")
            .value_child("status", self.status)
            .value_child("cookie", self.cookie)
            .value_child("procState", self.proc_state)
            .value_child("flag", self.flag)
    }
}

/// Negotiation result keyword announcing failure.
pub const CS_NEG_FAILURE_RESULT: &str = "cs_neg_result_kw=CS_NEG_FAILURE;";

/// Negotiation result keyword selecting plain TCP.
pub const CS_NEG_USE_TCP_RESULT: &str = "cs_neg_result_kw=CS_NEG_USE_TCP;";

/// `CS_NEG_PI`, exchanged with `RODS_CS_NEG_T`.
#[derive(Debug, Clone)]
pub struct CsNeg {
    pub status: i32,
    pub result: String,
}

impl CsNeg {
    pub fn failure() -> Self {
        Self {
            status: 0,
            result: CS_NEG_FAILURE_RESULT.to_string(),
        }
    }

    pub fn use_tcp() -> Self {
        Self {
            status: 1,
            result: CS_NEG_USE_TCP_RESULT.to_string(),
        }
    }
}

impl PackingInstruction for CsNeg {
    fn to_tag(&self) -> Tag {
        Tag::new("CS_NEG_PI")
            .value_child("status", self.status)
            .value_child("result", &self.result)
    }
}

/// Builds an `RError_PI` stack with a single message.
pub fn rerror(status: i32, message: &str) -> Tag {
    Tag::new("RError_PI").value_child("count", 1).child(
        Tag::new("RErrMsg_PI")
            .value_child("status", status)
            .value_child("msg", message),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_pack_fields() {
        let tag = StartupPack::new("rods", "tempZone", "alice", "otherZone")
            .with_reconnect(true)
            .with_negotiation(true)
            .to_tag();
        assert_eq!(tag.child_int("irodsProt").unwrap(), 1);
        assert_eq!(tag.child_int("reconnFlag").unwrap(), 200);
        assert_eq!(tag.child_str("proxyUser").unwrap(), "rods");
        assert_eq!(tag.child_str("clientRcatZone").unwrap(), "otherZone");
        assert_eq!(tag.child_str("relVersion").unwrap(), "rods4.2.8");
        assert_eq!(tag.child_str("option").unwrap(), OPTION_REQUEST_NEGOTIATION);
        assert_eq!(tag.children()[0].name(), "irodsProt");
        assert_eq!(tag.children()[9].name(), "option");
    }

    #[test]
    fn test_startup_pack_defaults() {
        let tag = StartupPack::new("rods", "z", "rods", "z").to_tag();
        assert_eq!(tag.child_int("reconnFlag").unwrap(), 0);
        assert_eq!(tag.child_str("option").unwrap(), "iinit");
    }

    #[test]
    fn test_pam_plugin_context() {
        let req = AuthPluginReqInp::pam("bob", "secret", 60);
        assert_eq!(req.api_number(), 1201);
        let tag = req.to_tag();
        assert_eq!(tag.child_str("auth_scheme_").unwrap(), "pam");
        assert_eq!(
            tag.child_str("context_").unwrap(),
            "a_user=bob;a_pw=secret;a_ttl=60"
        );
    }

    #[test]
    fn test_cs_neg_results() {
        let tag = CsNeg::use_tcp().to_tag();
        assert_eq!(tag.child_int("status").unwrap(), 1);
        assert_eq!(tag.child_str("result").unwrap(), CS_NEG_USE_TCP_RESULT);
        assert_eq!(CsNeg::failure().status, 0);
    }

    #[test]
    fn test_proc_state() {
        assert_eq!(ProcState::from(0), ProcState::Processing);
        assert_eq!(ProcState::from(1), ProcState::Receiving);
        assert_eq!(ProcState::from(7), ProcState::Other(7));
    }

    #[test]
    fn test_api_numbers() {
        assert_eq!(SslStartInp.api_number(), 1100);
        assert_eq!(SslEndInp.api_number(), 1101);
        assert_eq!(OperationComplete { status: 0 }.api_number(), 626);
        assert_eq!(ReconnMsg::new(400).api_number(), 0);
    }
}
