//! # irods-protocol
//!
//! Wire protocol implementation for the iRODS client.
//!
//! This crate provides:
//! - The length-prefixed `MsgHeader_PI` envelope
//! - The `Tag` document model and its restricted XML dialect
//! - Packing instructions used by the connection substrate
//! - The iRODS status code table and the error scanner
//! - The standard-auth challenge digest

pub mod challenge;
pub mod codec;
pub mod error;
pub mod error_code;
pub mod header;
pub mod message;
pub mod scanner;
pub mod tag;

pub use codec::{Decoder, Encoder, Envelope};
pub use error::ProtocolError;
pub use error_code::ErrorCode;
pub use header::{MessageType, MsgHeader, HEADER_LENGTH_PREFIX_SIZE, MAX_HEADER_LENGTH};
pub use scanner::ErrorKind;
pub use tag::Tag;

/// Default iRODS agent port.
pub const DEFAULT_PORT: u16 = 1247;

/// Release version advertised in the startup pack.
pub const RELEASE_VERSION: &str = "rods4.2.8";

/// API version advertised in the startup pack.
pub const API_VERSION: &str = "d";

/// Length of the server-issued authentication challenge.
pub const CHALLENGE_LENGTH: usize = 64;

/// Fixed width of the password field in the challenge digest.
pub const MAX_PASSWORD_LENGTH: usize = 50;

/// Acknowledgement sent back for each batch of collection-operation status.
pub const SYS_CLI_TO_SVR_COLL_STAT_REPLY: i32 = 99_999_997;

/// Batch size at which the server expects a status acknowledgement.
pub const SYS_CLI_TO_SVR_COLL_STAT_SIZE: i32 = 10;

/// Startup pack `reconnFlag` value requesting restart mode.
pub const RECONN_FLAG: i32 = 200;

/// Cookie value at or above which the server is an iRODS 4 ("eirods") agent.
pub const EIRODS_COOKIE: i32 = 301;

/// API numbers used by the protocol substrate.
pub mod api {
    pub const GET_MISC_SVR_INFO_AN: i32 = 700;
    pub const GENERAL_ADMIN_AN: i32 = 701;
    pub const GEN_QUERY_AN: i32 = 702;
    pub const AUTH_REQUEST_AN: i32 = 703;
    pub const AUTH_RESPONSE_AN: i32 = 704;
    pub const GSI_AUTH_REQUEST_AN: i32 = 711;
    pub const KRB_AUTH_REQUEST_AN: i32 = 717;
    pub const PAM_AUTH_REQUEST_AN: i32 = 725;
    pub const EXEC_MY_RULE_AN: i32 = 625;
    pub const OPR_COMPLETE_AN: i32 = 626;
    pub const SSL_START_AN: i32 = 1100;
    pub const SSL_END_AN: i32 = 1101;
    pub const AUTH_PLUG_REQ_AN: i32 = 1201;
}
