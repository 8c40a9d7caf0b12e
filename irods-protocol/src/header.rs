//! Message header envelope.
//!
//! Every message starts with a 4-byte big-endian length followed by that many
//! bytes of `MsgHeader_PI` XML:
//!
//! ```text
//! +-----------+-----------------------------------------------------------+
//! | hdr_len   | <MsgHeader_PI><type>T</type><msgLen>M</msgLen>            |
//! | 4 bytes   | <errorLen>E</errorLen><bsLen>B</bsLen><intInfo>I</intInfo> |
//! |           | </MsgHeader_PI>                                           |
//! +-----------+-----------------------------------------------------------+
//! | body (M bytes) | error (E bytes) | binary payload (B bytes)           |
//! +----------------+-----------------+------------------------------------+
//! ```

use crate::error::ProtocolError;
use crate::tag::Tag;
use bytes::{Buf, BufMut, BytesMut};
use std::fmt;
use std::str::FromStr;

/// Tag name of the header document.
pub const MSG_HEADER_PI: &str = "MsgHeader_PI";

/// Size of the header length prefix.
pub const HEADER_LENGTH_PREFIX_SIZE: usize = 4;

/// Declared header lengths above this are treated as a corrupted stream.
pub const MAX_HEADER_LENGTH: usize = 10_000_000;

/// The `type` field of a header.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageType {
    Connect,
    Version,
    ApiRequest,
    Disconnect,
    Reauth,
    ApiReply,
    NegotiationRequest,
    Reconnect,
    /// Any other literal, e.g. encryption cues sent during negotiation.
    Other(String),
}

impl MessageType {
    pub fn as_str(&self) -> &str {
        match self {
            MessageType::Connect => "RODS_CONNECT",
            MessageType::Version => "RODS_VERSION",
            MessageType::ApiRequest => "RODS_API_REQ",
            MessageType::Disconnect => "RODS_DISCONNECT",
            MessageType::Reauth => "RODS_REAUTH",
            MessageType::ApiReply => "RODS_API_REPLY",
            MessageType::NegotiationRequest => "RODS_CS_NEG_T",
            MessageType::Reconnect => "RODS_RECONNECT",
            MessageType::Other(s) => s,
        }
    }
}

impl FromStr for MessageType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "RODS_CONNECT" => MessageType::Connect,
            "RODS_VERSION" => MessageType::Version,
            "RODS_API_REQ" => MessageType::ApiRequest,
            "RODS_DISCONNECT" => MessageType::Disconnect,
            "RODS_REAUTH" => MessageType::Reauth,
            "RODS_API_REPLY" => MessageType::ApiReply,
            "RODS_CS_NEG_T" => MessageType::NegotiationRequest,
            "RODS_RECONNECT" => MessageType::Reconnect,
            "" => return Err(ProtocolError::UnknownMessageType(String::new())),
            other => MessageType::Other(other.to_string()),
        })
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed message header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsgHeader {
    pub msg_type: MessageType,
    pub msg_len: u32,
    pub error_len: u32,
    pub bs_len: u64,
    /// API number on requests, status on responses.
    pub int_info: i32,
}

impl MsgHeader {
    pub fn new(msg_type: MessageType, msg_len: u32, error_len: u32, bs_len: u64, int_info: i32) -> Self {
        Self {
            msg_type,
            msg_len,
            error_len,
            bs_len,
            int_info,
        }
    }

    /// Header for an API request carrying only a body.
    pub fn api_request(msg_len: u32, api_number: i32) -> Self {
        Self::new(MessageType::ApiRequest, msg_len, 0, 0, api_number)
    }

    /// Renders the header XML without the length prefix.
    pub fn to_xml(&self) -> String {
        format!(
            "<{tag}><type>{}</type><msgLen>{}</msgLen><errorLen>{}</errorLen><bsLen>{}</bsLen><intInfo>{}</intInfo></{tag}>",
            self.msg_type,
            self.msg_len,
            self.error_len,
            self.bs_len,
            self.int_info,
            tag = MSG_HEADER_PI,
        )
    }

    /// Encodes the length prefix and header XML.
    pub fn encode(&self) -> BytesMut {
        let xml = self.to_xml();
        let mut buf = BytesMut::with_capacity(HEADER_LENGTH_PREFIX_SIZE + xml.len());
        buf.put_u32(xml.len() as u32);
        buf.put_slice(xml.as_bytes());
        buf
    }

    /// Checks a declared header length against the sanity bound.
    pub fn check_length(length: i32) -> Result<usize, ProtocolError> {
        if length < 0 {
            return Err(ProtocolError::NegativeHeaderLength(length));
        }
        let length = length as usize;
        if length > MAX_HEADER_LENGTH {
            return Err(ProtocolError::HeaderTooLarge {
                size: length,
                max: MAX_HEADER_LENGTH,
            });
        }
        Ok(length)
    }

    /// Decodes a length-prefixed header from `buf`.
    ///
    /// Returns `Ok(None)` if more data is needed.
    pub fn decode(buf: &mut BytesMut) -> Result<Option<Self>, ProtocolError> {
        if buf.len() < HEADER_LENGTH_PREFIX_SIZE {
            return Ok(None);
        }
        let declared = i32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let length = Self::check_length(declared)?;
        if buf.len() < HEADER_LENGTH_PREFIX_SIZE + length {
            return Ok(None);
        }
        buf.advance(HEADER_LENGTH_PREFIX_SIZE);
        let xml = buf.split_to(length);
        Self::from_xml(&xml).map(Some)
    }

    /// Parses header XML (no length prefix).
    pub fn from_xml(data: &[u8]) -> Result<Self, ProtocolError> {
        let tag = Tag::parse(data, false)?
            .ok_or_else(|| ProtocolError::MalformedHeader("empty header".to_string()))?;
        Self::from_tag(&tag)
    }

    /// Builds a header from a parsed `MsgHeader_PI` tag.
    pub fn from_tag(tag: &Tag) -> Result<Self, ProtocolError> {
        if tag.name() != MSG_HEADER_PI {
            return Err(ProtocolError::MalformedHeader(format!(
                "expected {}, got {}",
                MSG_HEADER_PI,
                tag.name()
            )));
        }
        let non_negative = |name: &str| -> Result<i64, ProtocolError> {
            let v = tag.child_long(name)?;
            if v < 0 {
                return Err(ProtocolError::MalformedHeader(format!("negative {}: {}", name, v)));
            }
            Ok(v)
        };
        Ok(Self {
            msg_type: tag.child_str("type")?.parse()?,
            msg_len: non_negative("msgLen")? as u32,
            error_len: non_negative("errorLen")? as u32,
            bs_len: non_negative("bsLen")? as u64,
            int_info: tag.child_int("intInfo")?,
        })
    }

    /// Converts the header back into a tag, for attaching to a response.
    pub fn to_tag(&self) -> Tag {
        Tag::new(MSG_HEADER_PI)
            .value_child("type", &self.msg_type)
            .value_child("msgLen", self.msg_len)
            .value_child("errorLen", self.error_len)
            .value_child("bsLen", self.bs_len)
            .value_child("intInfo", self.int_info)
    }
}
