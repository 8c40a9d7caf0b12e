//! Encoder and decoder for complete message envelopes.
//!
//! The client engine streams segments straight to the socket; these helpers
//! build and split whole envelopes in memory, which is what scripted agents,
//! replay tools and benchmarks need.

use crate::error::ProtocolError;
use crate::header::{MessageType, MsgHeader, HEADER_LENGTH_PREFIX_SIZE};
use crate::message::PackingInstruction;
use crate::tag::Tag;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// A header together with its body, error and binary segments.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub header: MsgHeader,
    pub body: Bytes,
    pub error: Bytes,
    pub bs: Bytes,
}

impl Envelope {
    /// Parses the body segment as a tag document.
    pub fn body_tag(&self, decode: bool) -> Result<Option<Tag>, ProtocolError> {
        Tag::parse(&self.body, decode)
    }

    /// Parses the error segment as a tag document.
    pub fn error_tag(&self) -> Result<Option<Tag>, ProtocolError> {
        Tag::parse(&self.error, true)
    }
}

/// Encodes envelopes.
pub struct Encoder;

impl Encoder {
    /// Encodes an envelope with explicit segments.
    pub fn encode(
        msg_type: MessageType,
        body: Option<&Tag>,
        error: &[u8],
        bs: &[u8],
        int_info: i32,
    ) -> BytesMut {
        let body = body.map(Tag::to_xml).unwrap_or_default();
        let header = MsgHeader::new(
            msg_type,
            body.len() as u32,
            error.len() as u32,
            bs.len() as u64,
            int_info,
        );
        let mut buf = header.encode();
        buf.reserve(body.len() + error.len() + bs.len());
        buf.put_slice(body.as_bytes());
        buf.put_slice(error);
        buf.put_slice(bs);
        buf
    }

    /// Encodes an API request from a packing instruction.
    pub fn encode_request<P: PackingInstruction>(request: &P) -> BytesMut {
        let tag = request.to_tag();
        Self::encode(
            MessageType::ApiRequest,
            Some(&tag),
            &[],
            &[],
            request.api_number(),
        )
    }

    /// Encodes a reply with the given status in `intInfo`.
    pub fn encode_reply(body: Option<&Tag>, int_info: i32) -> BytesMut {
        Self::encode(MessageType::ApiReply, body, &[], &[], int_info)
    }

    /// Encodes an error reply whose error segment carries an `RError_PI`.
    pub fn encode_error_reply(status: i32, message: &str) -> BytesMut {
        let error = crate::message::rerror(status, message).to_xml();
        Self::encode(MessageType::ApiReply, None, error.as_bytes(), &[], status)
    }
}

/// Incrementally decodes envelopes from a byte buffer.
pub struct Decoder {
    buffer: BytesMut,
}

impl Decoder {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(8192),
        }
    }

    /// Appends data to the internal buffer.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Attempts to decode the next envelope from the buffer.
    pub fn decode_envelope(&mut self) -> Result<Option<Envelope>, ProtocolError> {
        let buf = &self.buffer;
        if buf.len() < HEADER_LENGTH_PREFIX_SIZE {
            return Ok(None);
        }
        let declared = i32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let header_len = MsgHeader::check_length(declared)?;
        let header_end = HEADER_LENGTH_PREFIX_SIZE + header_len;
        if buf.len() < header_end {
            return Ok(None);
        }

        let header = MsgHeader::from_xml(&buf[HEADER_LENGTH_PREFIX_SIZE..header_end])?;
        let body_len = header.msg_len as usize;
        let error_len = header.error_len as usize;
        let bs_len = header.bs_len as usize;
        if buf.len() < header_end + body_len + error_len + bs_len {
            return Ok(None);
        }

        self.buffer.advance(header_end);
        let body = self.buffer.split_to(body_len).freeze();
        let error = self.buffer.split_to(error_len).freeze();
        let bs = self.buffer.split_to(bs_len).freeze();
        Ok(Some(Envelope {
            header,
            body,
            error,
            bs,
        }))
    }

    /// Removes a 4-byte big-endian integer from the front of the buffer.
    pub fn decode_int(&mut self) -> Option<i32> {
        if self.buffer.len() < 4 {
            return None;
        }
        Some(self.buffer.get_i32())
    }

    /// Removes `len` raw bytes from the front of the buffer.
    pub fn take_bytes(&mut self, len: usize) -> Option<Bytes> {
        if self.buffer.len() < len {
            return None;
        }
        Some(self.buffer.split_to(len).freeze())
    }

    /// Returns the number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Clears the internal buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}
