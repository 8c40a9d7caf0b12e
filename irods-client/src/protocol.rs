//! Request/response engine over one agent connection.
//!
//! Every exchange locks the channel for the whole request and reply, so a
//! reconnect swap can never interleave with a caller. Transport failures
//! force-close the socket and drop the protocol from its session.

use crate::account::{Account, AccountKey};
use crate::auth::{AuthResponse, StartupResponse};
use crate::config::{PipelineConfiguration, TlsSettings};
use crate::connection::{Connection, ProgressListener};
use crate::error::ClientError;
use crate::reconnect::ReconnectionManager;
use crate::server_properties::ServerProperties;
use crate::session::SessionMap;
use irods_protocol::header::MSG_HEADER_PI;
use irods_protocol::message::{CsNeg, OperationComplete, PackingInstruction, SslEndInp};
use irods_protocol::{
    api, ErrorCode, MessageType, MsgHeader, ProtocolError, Tag, MAX_HEADER_LENGTH,
    SYS_CLI_TO_SVR_COLL_STAT_REPLY, SYS_CLI_TO_SVR_COLL_STAT_SIZE,
};
use parking_lot::{Mutex, RwLock};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::MutexGuard;

/// Catalog "no rows" sentinel returned in `intInfo`.
const NO_ROWS_SENTINEL: i32 = -1;

/// Bytes scanned for the closing tag during header recovery.
const RECOVERY_SCAN_LIMIT: usize = 1000;

const HEADER_OPEN: &[u8] = b"<MsgHeader_PI>";
const HEADER_CLOSE: &[u8] = b"</MsgHeader_PI>";

/// Collection status replies carry this packing instruction.
const COLL_OPR_STAT_PI: &str = "CollOprStat_PI";

/// The connection plus per-connection send state.
pub(crate) struct Channel {
    pub(crate) connection: Connection,
    pam_flush: bool,
    in_flight: bool,
}

impl Channel {
    pub(crate) fn new(connection: Connection) -> Self {
        Self {
            connection,
            pam_flush: false,
            in_flight: false,
        }
    }

    pub(crate) fn replace_connection(&mut self, connection: Connection) -> Connection {
        std::mem::replace(&mut self.connection, connection)
    }

    pub(crate) fn end_exchange(&mut self) {
        self.in_flight = false;
    }

    async fn send_header(&mut self, header: &MsgHeader) -> Result<(), ClientError> {
        tracing::trace!("Sending header {}", header.to_xml());
        self.connection.send(&header.encode()).await?;
        if self.pam_flush {
            self.connection.flush().await?;
        }
        Ok(())
    }

    pub(crate) async fn send_envelope(
        &mut self,
        msg_type: MessageType,
        body: Option<&Tag>,
        error: &[u8],
        bytes: &[u8],
        api_number: i32,
    ) -> Result<(), ClientError> {
        let xml = body.map(Tag::to_xml).unwrap_or_default();
        let header = MsgHeader::new(
            msg_type,
            xml.len() as u32,
            error.len() as u32,
            bytes.len() as u64,
            api_number,
        );
        self.send_header(&header).await?;
        if !xml.is_empty() {
            self.connection.send_str(&xml).await?;
        }
        self.connection.flush().await?;
        if !error.is_empty() || !bytes.is_empty() {
            self.connection.send(error).await?;
            self.connection.send(bytes).await?;
            self.connection.flush().await?;
        }
        Ok(())
    }

    async fn send_with_stream<R>(
        &mut self,
        body: &Tag,
        api_number: i32,
        len: u64,
        reader: &mut R,
        progress: Option<&dyn ProgressListener>,
    ) -> Result<u64, ClientError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let xml = body.to_xml();
        let header = MsgHeader::new(MessageType::ApiRequest, xml.len() as u32, 0, len, api_number);
        self.send_header(&header).await?;
        self.connection.send_str(&xml).await?;
        let sent = if len > 0 {
            self.connection.send_from_reader(reader, len, progress).await?
        } else {
            0
        };
        self.connection.flush().await?;
        Ok(sent)
    }

    async fn drain(&mut self, len: u64) -> Result<(), ClientError> {
        if len > 0 {
            self.connection
                .read_to_writer(&mut tokio::io::sink(), len, None)
                .await?;
        }
        Ok(())
    }

    async fn read_header(&mut self) -> Result<MsgHeader, ClientError> {
        let length = self.connection.read_int().await?;
        if length < 0 {
            return Err(ClientError::Framing(ProtocolError::NegativeHeaderLength(length)));
        }
        let length = length as usize;
        if length > MAX_HEADER_LENGTH {
            tracing::warn!(
                "Header length {} exceeds {}, scanning for the next header",
                length,
                MAX_HEADER_LENGTH
            );
            return self.recover_header().await;
        }
        let bytes = self.connection.read_exact_message(length).await?;
        let header = MsgHeader::from_xml(&bytes).map_err(ClientError::Framing)?;
        tracing::trace!("Received header {:?}", header);
        Ok(header)
    }

    async fn next_byte(&mut self) -> Result<u8, ClientError> {
        match self.connection.read_byte().await {
            Ok(byte) => Ok(byte),
            Err(ClientError::ConnectionClosed) => Err(ClientError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "Server connection lost, due to error",
            ))),
            Err(e) => Err(e),
        }
    }

    /// Resynchronizes on the next `<MsgHeader_PI>` in the stream.
    async fn recover_header(&mut self) -> Result<MsgHeader, ClientError> {
        let mut window: Vec<u8> = Vec::with_capacity(HEADER_OPEN.len());
        while window != HEADER_OPEN {
            if window.len() == HEADER_OPEN.len() {
                window.remove(0);
            }
            window.push(self.next_byte().await?);
        }

        let mut xml = window;
        while !xml.ends_with(HEADER_CLOSE) {
            if xml.len() >= HEADER_OPEN.len() + RECOVERY_SCAN_LIMIT {
                return Err(ClientError::Framing(ProtocolError::MalformedHeader(
                    "no header end found while resynchronizing".to_string(),
                )));
            }
            xml.push(self.next_byte().await?);
        }

        let header = MsgHeader::from_xml(&xml).map_err(ClientError::Framing)?;
        let pending = header.msg_len as u64 + header.error_len as u64 + header.bs_len;
        if pending > 0 {
            let byte = self.next_byte().await?;
            if byte != b'\n' {
                self.connection.unread_byte(byte);
            }
        }
        tracing::info!("Recovered header {:?}", header);
        Ok(header)
    }

    pub(crate) async fn read_message(
        &mut self,
        decode: bool,
        error_stack: bool,
    ) -> Result<Option<Tag>, ClientError> {
        let header = self.read_header().await?;

        if header.int_info < 0 {
            self.drain(header.msg_len as u64).await?;
            let mut message = String::new();
            if header.error_len > 0 {
                let bytes = self
                    .connection
                    .read_exact_message(header.error_len as usize)
                    .await?;
                if let Ok(Some(stack)) = Tag::parse(&bytes, true) {
                    if let Some(msg) = stack.tag("RErrMsg_PI").and_then(|m| m.tag("msg")) {
                        message = msg.str_value().to_string();
                    }
                }
            }
            self.drain(header.bs_len).await?;
            return match header.int_info {
                code if code == ErrorCode::CatSuccessButWithNoInfo.code() => Ok(None),
                NO_ROWS_SENTINEL => Ok(None),
                code => {
                    tracing::debug!("Server returned status {}", code);
                    Err(ClientError::from_status(code, message))
                }
            };
        }

        let mut body = if header.msg_len > 0 {
            let bytes = self
                .connection
                .read_exact_message(header.msg_len as usize)
                .await?;
            Tag::parse(&bytes, decode).map_err(ClientError::Framing)?
        } else {
            None
        };

        if header.error_len > 0 {
            let bytes = self
                .connection
                .read_exact_message(header.error_len as usize)
                .await?;
            let stack = Tag::parse_required(&bytes, true).map_err(ClientError::Framing)?;
            if error_stack {
                match body.as_mut() {
                    Some(tag) => {
                        tag.add_tag(stack);
                    }
                    None => body = Some(stack),
                }
            } else {
                let entry = stack.require("RErrMsg_PI").map_err(ClientError::Framing)?;
                let status = entry.child_int("status").map_err(ClientError::Framing)?;
                if status != 0 {
                    let message = entry.tag("msg").map(Tag::str_value).unwrap_or_default();
                    self.drain(header.bs_len).await?;
                    return Err(ClientError::from_status(status, message));
                }
            }
        }

        if header.bs_len != 0 || header.int_info > 0 {
            let header_tag = header.to_tag();
            match body.as_mut() {
                Some(tag) => {
                    tag.add_tag(header_tag);
                }
                None => body = Some(Tag::new(MSG_HEADER_PI).child(header_tag)),
            }
        }

        Ok(body)
    }
}

/// An authenticated (or authenticating) connection to an iRODS agent.
pub struct Protocol {
    account: Account,
    config: Arc<PipelineConfiguration>,
    channel: tokio::sync::Mutex<Channel>,
    startup: RwLock<Option<StartupResponse>>,
    auth: RwLock<Option<AuthResponse>>,
    properties: RwLock<Option<ServerProperties>>,
    session: Mutex<Option<(Weak<SessionMap>, AccountKey)>>,
    restart: AtomicBool,
    reconnection: Mutex<Option<ReconnectionManager>>,
}

impl Protocol {
    pub fn new(connection: Connection, account: Account, config: Arc<PipelineConfiguration>) -> Self {
        Self {
            account,
            restart: AtomicBool::new(config.reconnect),
            config,
            channel: tokio::sync::Mutex::new(Channel::new(connection)),
            startup: RwLock::new(None),
            auth: RwLock::new(None),
            properties: RwLock::new(None),
            session: Mutex::new(None),
            reconnection: Mutex::new(None),
        }
    }

    /// The account this protocol was opened for.
    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn config(&self) -> &Arc<PipelineConfiguration> {
        &self.config
    }

    pub fn startup_response(&self) -> Option<StartupResponse> {
        self.startup.read().clone()
    }

    pub(crate) fn set_startup_response(&self, startup: StartupResponse) {
        *self.startup.write() = Some(startup);
    }

    pub fn auth_response(&self) -> Option<AuthResponse> {
        self.auth.read().clone()
    }

    pub(crate) fn set_auth_response(&self, response: AuthResponse) {
        *self.auth.write() = Some(response);
    }

    /// Replaces the account recorded as the one that started authentication.
    pub(crate) fn set_authenticating_account(&self, account: Account) {
        if let Some(response) = self.auth.write().as_mut() {
            response.authenticating_account = account;
        }
    }

    /// Properties attached after authentication, if any.
    pub fn server_properties(&self) -> Option<ServerProperties> {
        self.properties.read().clone()
    }

    pub(crate) fn set_server_properties(&self, properties: ServerProperties) {
        *self.properties.write() = Some(properties);
    }

    pub fn is_restart_enabled(&self) -> bool {
        self.restart.load(Ordering::SeqCst)
    }

    pub fn set_restart_enabled(&self, enabled: bool) {
        self.restart.store(enabled, Ordering::SeqCst);
    }

    pub(crate) fn attach_session(&self, map: Weak<SessionMap>, key: AccountKey) {
        *self.session.lock() = Some((map, key));
    }

    /// Removes this protocol from its session cache, if it is still the
    /// cached entry.
    pub(crate) fn detach_from_session(&self) {
        let link = self.session.lock().take();
        if let Some((map, key)) = link {
            if let Some(map) = map.upgrade() {
                let mut protocols = map.lock();
                let cached = protocols
                    .get(&key)
                    .is_some_and(|p| std::ptr::eq(Arc::as_ptr(p), self));
                if cached {
                    protocols.remove(&key);
                    tracing::debug!("Discarded session entry for {}", key);
                }
            }
        }
    }

    pub(crate) fn start_reconnection(self: &Arc<Self>, startup: &StartupResponse) {
        let manager = ReconnectionManager::start(Arc::downgrade(self), startup, &self.config);
        if let Some(previous) = self.reconnection.lock().replace(manager) {
            previous.shutdown();
        }
    }

    /// Whether a reconnection task is running for this protocol.
    pub fn is_reconnecting(&self) -> bool {
        self.reconnection
            .lock()
            .as_ref()
            .is_some_and(|m| !m.is_finished())
    }

    fn stop_reconnection(&self) {
        if let Some(manager) = self.reconnection.lock().take() {
            manager.shutdown();
        }
    }

    /// Locks the channel for an exchange.
    ///
    /// A channel still marked in flight belongs to an exchange whose future
    /// was dropped; its stream position is unknown, so it is closed.
    pub(crate) async fn lock_channel(&self) -> MutexGuard<'_, Channel> {
        let mut channel = self.channel.lock().await;
        if channel.in_flight {
            tracing::warn!(
                "Previous exchange with {} was cancelled, closing connection",
                self.account.host
            );
            channel.connection.obliterate().await;
            self.detach_from_session();
        }
        channel.in_flight = true;
        channel
    }

    /// Ends an exchange, force-closing on transport failures.
    async fn settle<T>(
        &self,
        channel: &mut Channel,
        result: Result<T, ClientError>,
    ) -> Result<T, ClientError> {
        channel.in_flight = false;
        if let Err(ref e) = result {
            if e.is_transport() {
                tracing::warn!("Transport failure talking to {}: {}", self.account.host, e);
                self.detach_from_session();
                self.stop_reconnection();
                channel.connection.obliterate().await;
            }
        }
        result
    }

    pub(crate) async fn set_pam_flush(&self, enabled: bool) {
        self.channel.lock().await.pam_flush = enabled;
    }

    /// Sends an envelope and reads the reply.
    pub async fn irods_function(
        &self,
        msg_type: MessageType,
        body: Option<&Tag>,
        api_number: i32,
    ) -> Result<Option<Tag>, ClientError> {
        self.irods_function_with_bytes(msg_type, body, &[], &[], api_number)
            .await
    }

    /// Sends an envelope with error and payload segments and reads the reply.
    pub async fn irods_function_with_bytes(
        &self,
        msg_type: MessageType,
        body: Option<&Tag>,
        error: &[u8],
        bytes: &[u8],
        api_number: i32,
    ) -> Result<Option<Tag>, ClientError> {
        let error_stack = api_number == api::EXEC_MY_RULE_AN;
        let mut channel = self.lock_channel().await;
        let result = async {
            channel
                .send_envelope(msg_type, body, error, bytes, api_number)
                .await?;
            channel.read_message(true, error_stack).await
        }
        .await;
        self.settle(&mut channel, result).await
    }

    pub async fn irods_function_for_request<P: PackingInstruction>(
        &self,
        request: &P,
    ) -> Result<Option<Tag>, ClientError> {
        let body = request.to_tag();
        self.irods_function(MessageType::ApiRequest, Some(&body), request.api_number())
            .await
    }

    /// Sends raw message bytes without reading a reply.
    pub async fn irods_function_unidirectional(
        &self,
        msg_type: MessageType,
        message: &[u8],
        api_number: i32,
    ) -> Result<(), ClientError> {
        let mut channel = self.lock_channel().await;
        let result = async {
            let header = MsgHeader::new(msg_type, message.len() as u32, 0, 0, api_number);
            channel.send_header(&header).await?;
            channel.connection.send(message).await?;
            channel.connection.flush().await
        }
        .await;
        self.settle(&mut channel, result).await
    }

    /// Sends a request whose payload of `len` bytes is streamed from `reader`,
    /// then reads the reply.
    pub async fn irods_function_including_all_data_in_stream<P, R>(
        &self,
        request: &P,
        len: u64,
        reader: &mut R,
        progress: Option<&dyn ProgressListener>,
    ) -> Result<Option<Tag>, ClientError>
    where
        P: PackingInstruction,
        R: AsyncRead + Unpin + Send + ?Sized,
    {
        let body = request.to_tag();
        let mut channel = self.lock_channel().await;
        let result = async {
            channel
                .send_with_stream(&body, request.api_number(), len, reader, progress)
                .await?;
            channel.read_message(true, false).await
        }
        .await;
        self.settle(&mut channel, result).await
    }

    /// Sends one frame of `frame_len` bytes from `reader` and consumes the
    /// reply. Without a length the frame is `put_buffer_size` bytes. Returns
    /// the bytes sent.
    pub async fn irods_function_for_streaming_in_frames<P, R>(
        &self,
        request: &P,
        frame_len: Option<u64>,
        reader: &mut R,
        progress: Option<&dyn ProgressListener>,
    ) -> Result<u64, ClientError>
    where
        P: PackingInstruction,
        R: AsyncRead + Unpin + Send + ?Sized,
    {
        let frame_len = frame_len.unwrap_or(self.config.put_buffer_size as u64);
        let body = request.to_tag();
        let mut channel = self.lock_channel().await;
        let result = async {
            let sent = channel
                .send_with_stream(&body, request.api_number(), frame_len, reader, progress)
                .await?;
            channel.read_message(true, false).await?;
            Ok::<_, ClientError>(sent)
        }
        .await;
        self.settle(&mut channel, result).await
    }

    pub async fn irods_function_for_negotiation(
        &self,
        request: &CsNeg,
    ) -> Result<Option<Tag>, ClientError> {
        let body = request.to_tag();
        self.irods_function(MessageType::NegotiationRequest, Some(&body), 0)
            .await
    }

    pub async fn read_message(&self, decode: bool) -> Result<Option<Tag>, ClientError> {
        let mut channel = self.lock_channel().await;
        let result = channel.read_message(decode, false).await;
        self.settle(&mut channel, result).await
    }

    /// Reads a reply, returning any `RError_PI` stack as part of the reply
    /// instead of treating it as a failure.
    pub async fn read_message_with_error_stack(
        &self,
        decode: bool,
    ) -> Result<Option<Tag>, ClientError> {
        let mut channel = self.lock_channel().await;
        let result = channel.read_message(decode, true).await;
        self.settle(&mut channel, result).await
    }

    /// Fills `buf` from the socket, stopping early only at end of stream.
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize, ClientError> {
        let len = buf.len();
        let mut channel = self.lock_channel().await;
        let result = channel.connection.read(buf, 0, len).await;
        self.settle(&mut channel, result).await
    }

    pub async fn read_to_writer<W>(
        &self,
        writer: &mut W,
        len: u64,
        progress: Option<&dyn ProgressListener>,
    ) -> Result<u64, ClientError>
    where
        W: AsyncWrite + Unpin + Send + ?Sized,
    {
        let mut channel = self.lock_channel().await;
        let result = channel.connection.read_to_writer(writer, len, progress).await;
        self.settle(&mut channel, result).await
    }

    pub async fn operation_complete(&self, status: i32) -> Result<Option<Tag>, ClientError> {
        tracing::debug!("Sending operation complete with status {}", status);
        self.irods_function_for_request(&OperationComplete { status })
            .await
    }

    pub async fn send_in_network_order(&self, value: i32) -> Result<(), ClientError> {
        let mut channel = self.lock_channel().await;
        let result = async {
            channel.connection.send_in_network_order(value).await?;
            channel.connection.flush().await
        }
        .await;
        self.settle(&mut channel, result).await
    }

    /// Acknowledges collection status messages until a final reply arrives.
    pub async fn process_client_status_messages(
        &self,
        reply: Option<Tag>,
    ) -> Result<Option<Tag>, ClientError> {
        let mut channel = self.lock_channel().await;
        let result = async {
            let mut reply = reply;
            loop {
                let Some(ref tag) = reply else { break };
                if tag.name() != COLL_OPR_STAT_PI {
                    break;
                }
                let files = tag.child_int("filesCnt")?;
                if files < SYS_CLI_TO_SVR_COLL_STAT_SIZE {
                    break;
                }
                tracing::debug!("Acknowledging status message for {} files", files);
                channel
                    .connection
                    .send_in_network_order(SYS_CLI_TO_SVR_COLL_STAT_REPLY)
                    .await?;
                channel.connection.flush().await?;
                reply = channel.read_message(true, false).await?;
            }
            Ok::<_, ClientError>(reply)
        }
        .await;
        self.settle(&mut channel, result).await
    }

    /// Queries `GET_MISC_SVR_INFO_AN` and stores the result.
    pub async fn probe_server_properties(&self) -> Result<ServerProperties, ClientError> {
        let reply = self
            .irods_function(MessageType::ApiRequest, None, api::GET_MISC_SVR_INFO_AN)
            .await?
            .ok_or_else(|| ProtocolError::MissingTag("MiscSvrInfo_PI".to_string()))?;
        let properties = ServerProperties::from_tag(&reply)?;
        tracing::debug!(
            "Server {} runs {}",
            self.account.host,
            properties.release_version
        );
        self.set_server_properties(properties.clone());
        Ok(properties)
    }

    /// Sends a length-prefixed security token.
    pub(crate) async fn send_token(&self, token: &[u8]) -> Result<(), ClientError> {
        let mut channel = self.lock_channel().await;
        let result = async {
            channel
                .connection
                .send_in_network_order(token.len() as i32)
                .await?;
            channel.connection.send(token).await?;
            channel.connection.flush().await
        }
        .await;
        self.settle(&mut channel, result).await
    }

    /// Reads a length-prefixed security token.
    pub(crate) async fn read_token(&self) -> Result<Vec<u8>, ClientError> {
        let mut channel = self.lock_channel().await;
        let result = async {
            let len = channel.connection.read_int().await?;
            if len < 0 {
                return Err(ClientError::Authentication(format!(
                    "negative token length {}",
                    len
                )));
            }
            channel.connection.read_exact_message(len as usize).await
        }
        .await;
        self.settle(&mut channel, result).await
    }

    pub async fn upgrade_to_tls(&self, settings: &TlsSettings) -> Result<(), ClientError> {
        let mut channel = self.lock_channel().await;
        let result = channel.connection.upgrade_to_tls(settings).await;
        self.settle(&mut channel, result).await
    }

    pub async fn is_connected(&self) -> bool {
        self.channel.lock().await.connection.is_connected()
    }

    pub async fn is_tls(&self) -> bool {
        self.channel.lock().await.connection.is_tls()
    }

    /// Ends the agent conversation and closes the socket.
    pub async fn shutdown(&self) -> Result<(), ClientError> {
        self.stop_reconnection();
        let mut channel = self.lock_channel().await;
        if !channel.connection.is_connected() {
            channel.in_flight = false;
            return Ok(());
        }
        let result = async {
            if channel.connection.is_tls() {
                channel
                    .send_envelope(
                        MessageType::ApiRequest,
                        Some(&SslEndInp.to_tag()),
                        &[],
                        &[],
                        api::SSL_END_AN,
                    )
                    .await?;
                channel.read_message(false, false).await?;
            }
            channel
                .send_header(&MsgHeader::new(MessageType::Disconnect, 0, 0, 0, 0))
                .await?;
            channel.connection.flush().await?;
            channel.connection.shutdown().await
        }
        .await;
        channel.in_flight = false;
        if let Err(ref e) = result {
            tracing::debug!("Graceful shutdown failed ({}), closing socket", e);
            channel.connection.obliterate().await;
        }
        tracing::debug!("Protocol for {} shut down", self.account.key());
        result
    }

    /// Leaves the session and shuts down gracefully.
    pub async fn disconnect(&self) -> Result<(), ClientError> {
        self.detach_from_session();
        self.shutdown().await
    }

    /// Leaves the session and closes the socket without a goodbye.
    pub async fn disconnect_with_force(&self) {
        self.detach_from_session();
        self.stop_reconnection();
        let mut channel = self.channel.lock().await;
        channel.in_flight = false;
        channel.connection.obliterate().await;
    }
}

impl std::fmt::Debug for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Protocol")
            .field("account", &self.account.key())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use irods_protocol::{Decoder, Encoder};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    async fn pair() -> (Protocol, TcpStream) {
        pair_with(PipelineConfiguration::default()).await
    }

    async fn pair_with(config: PipelineConfiguration) -> (Protocol, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let accept = tokio::spawn(async move { listener.accept().await.unwrap().0 });
        let config = Arc::new(config);
        let conn = Connection::connect("127.0.0.1", port, config.clone())
            .await
            .unwrap();
        let account = Account::new("127.0.0.1", port, "rods", "rods", "tempZone");
        (Protocol::new(conn, account, config), accept.await.unwrap())
    }

    async fn read_envelope(socket: &mut TcpStream) -> irods_protocol::Envelope {
        let mut decoder = Decoder::new();
        let mut buf = [0u8; 4096];
        loop {
            if let Some(envelope) = decoder.decode_envelope().unwrap() {
                return envelope;
            }
            let n = socket.read(&mut buf).await.unwrap();
            assert!(n > 0, "client closed before a full envelope");
            decoder.extend(&buf[..n]);
        }
    }

    #[tokio::test]
    async fn test_exchange_reads_reply_body() {
        let (protocol, mut server) = pair().await;
        let agent = tokio::spawn(async move {
            let request = read_envelope(&mut server).await;
            assert_eq!(request.header.msg_type, MessageType::ApiRequest);
            assert_eq!(request.header.int_info, 701);
            let body = Tag::new("Reply_PI").value_child("answer", 42);
            server
                .write_all(&Encoder::encode_reply(Some(&body), 0))
                .await
                .unwrap();
            server
        });

        let body = Tag::new("generalAdminInp_PI").value_child("arg0", "add");
        let reply = protocol
            .irods_function(MessageType::ApiRequest, Some(&body), 701)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply.child_int("answer").unwrap(), 42);
        let _server = agent.await.unwrap();
        protocol.disconnect_with_force().await;
    }

    #[tokio::test]
    async fn test_no_rows_sentinel_is_none() {
        let (protocol, mut server) = pair().await;
        tokio::spawn(async move {
            let _ = read_envelope(&mut server).await;
            server.write_all(&Encoder::encode_reply(None, -1)).await.unwrap();
            let _ = read_envelope(&mut server).await;
            server
                .write_all(&Encoder::encode_reply(None, -819000))
                .await
                .unwrap();
            let mut rest = Vec::new();
            let _ = server.read_to_end(&mut rest).await;
        });

        assert!(protocol
            .irods_function(MessageType::ApiRequest, None, 702)
            .await
            .unwrap()
            .is_none());
        assert!(protocol
            .irods_function(MessageType::ApiRequest, None, 702)
            .await
            .unwrap()
            .is_none());
        assert!(protocol.is_connected().await);
        protocol.disconnect_with_force().await;
    }

    #[tokio::test]
    async fn test_negative_status_keeps_connection() {
        let (protocol, mut server) = pair().await;
        tokio::spawn(async move {
            let _ = read_envelope(&mut server).await;
            server
                .write_all(&Encoder::encode_error_reply(-816000, "bad input"))
                .await
                .unwrap();
            let mut rest = Vec::new();
            let _ = server.read_to_end(&mut rest).await;
        });

        let err = protocol
            .irods_function(MessageType::ApiRequest, None, 701)
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(-816000));
        assert_eq!(
            err.kind(),
            Some(irods_protocol::ErrorKind::InvalidArgument)
        );
        assert!(err.to_string().contains("bad input"));
        assert!(protocol.is_connected().await);
        protocol.disconnect_with_force().await;
    }

    #[tokio::test]
    async fn test_error_stack_attached_for_rules() {
        let (protocol, mut server) = pair().await;
        tokio::spawn(async move {
            let _ = read_envelope(&mut server).await;
            let body = Tag::new("MsParamArray_PI").value_child("paramLen", 0);
            let stack = irods_protocol::message::rerror(-1, "rule said hello").to_xml();
            server
                .write_all(&Encoder::encode(
                    MessageType::ApiReply,
                    Some(&body),
                    stack.as_bytes(),
                    &[],
                    0,
                ))
                .await
                .unwrap();
            let mut rest = Vec::new();
            let _ = server.read_to_end(&mut rest).await;
        });

        let reply = protocol
            .irods_function(MessageType::ApiRequest, None, api::EXEC_MY_RULE_AN)
            .await
            .unwrap()
            .unwrap();
        let stack = reply.tag("RError_PI").unwrap();
        assert_eq!(
            stack.tag("RErrMsg_PI").unwrap().child_str("msg").unwrap(),
            "rule said hello"
        );
        protocol.disconnect_with_force().await;
    }

    #[tokio::test]
    async fn test_nonzero_error_segment_is_error() {
        let (protocol, mut server) = pair().await;
        tokio::spawn(async move {
            let _ = read_envelope(&mut server).await;
            let stack = irods_protocol::message::rerror(-818000, "").to_xml();
            server
                .write_all(&Encoder::encode(
                    MessageType::ApiReply,
                    None,
                    stack.as_bytes(),
                    &[],
                    0,
                ))
                .await
                .unwrap();
            let mut rest = Vec::new();
            let _ = server.read_to_end(&mut rest).await;
        });

        let err = protocol
            .irods_function(MessageType::ApiRequest, None, 701)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(irods_protocol::ErrorKind::NoAccess));
        assert!(err.to_string().contains("CAT_NO_ACCESS_PERMISSION"));
        protocol.disconnect_with_force().await;
    }

    #[tokio::test]
    async fn test_header_attached_when_payload_follows() {
        let (protocol, mut server) = pair().await;
        tokio::spawn(async move {
            let _ = read_envelope(&mut server).await;
            server
                .write_all(&Encoder::encode(MessageType::ApiReply, None, &[], b"data", 3))
                .await
                .unwrap();
            let mut rest = Vec::new();
            let _ = server.read_to_end(&mut rest).await;
        });

        let reply = protocol
            .irods_function(MessageType::ApiRequest, None, 602)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply.name(), MSG_HEADER_PI);
        let header = MsgHeader::from_tag(reply.tag(MSG_HEADER_PI).unwrap()).unwrap();
        assert_eq!(header.bs_len, 4);
        assert_eq!(header.int_info, 3);

        let mut payload = [0u8; 4];
        assert_eq!(protocol.read(&mut payload).await.unwrap(), 4);
        assert_eq!(&payload, b"data");
        protocol.disconnect_with_force().await;
    }

    #[tokio::test]
    async fn test_desync_recovery() {
        let (protocol, mut server) = pair().await;
        tokio::spawn(async move {
            let mut noise = Vec::new();
            noise.extend_from_slice(&(20_000_000i32).to_be_bytes());
            noise.extend_from_slice(b"garbage<Msg");
            let body = Tag::new("Reply_PI").value_child("ok", 1).to_xml();
            let header = MsgHeader::new(MessageType::ApiReply, body.len() as u32, 0, 0, 0);
            noise.extend_from_slice(header.to_xml().as_bytes());
            noise.push(b'\n');
            noise.extend_from_slice(body.as_bytes());
            server.write_all(&noise).await.unwrap();
            let mut rest = Vec::new();
            let _ = server.read_to_end(&mut rest).await;
        });

        let reply = protocol.read_message(true).await.unwrap().unwrap();
        assert_eq!(reply.child_int("ok").unwrap(), 1);
        protocol.disconnect_with_force().await;
    }

    #[tokio::test]
    async fn test_desync_eof_forces_disconnect() {
        let (protocol, mut server) = pair().await;
        server
            .write_all(&(20_000_000i32).to_be_bytes())
            .await
            .unwrap();
        server.write_all(b"no header here").await.unwrap();
        drop(server);

        let err = protocol.read_message(true).await.unwrap_err();
        assert!(err.to_string().contains("Server connection lost"));
        assert!(!protocol.is_connected().await);
    }

    #[tokio::test]
    async fn test_negative_header_length() {
        let (protocol, mut server) = pair().await;
        server.write_all(&(-5i32).to_be_bytes()).await.unwrap();
        let err = protocol.read_message(true).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Framing(ProtocolError::NegativeHeaderLength(-5))
        ));
        assert!(!protocol.is_connected().await);
    }

    #[tokio::test]
    async fn test_unterminated_resync_closes_connection() {
        let (protocol, mut server) = pair().await;
        let mut noise = Vec::new();
        noise.extend_from_slice(&(20_000_000i32).to_be_bytes());
        noise.extend_from_slice(HEADER_OPEN);
        noise.extend_from_slice(&[b'x'; 1100]);
        server.write_all(&noise).await.unwrap();

        let err = protocol.read_message(true).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Framing(ProtocolError::MalformedHeader(_))
        ));
        assert!(err.is_transport());
        assert!(!protocol.is_connected().await);
    }

    #[tokio::test]
    async fn test_undecodable_body_closes_connection() {
        let (protocol, mut server) = pair().await;
        let header = MsgHeader::new(MessageType::ApiReply, 5, 0, 3, 0);
        let mut reply = header.encode().to_vec();
        reply.extend_from_slice(b"<<<<<abc");
        server.write_all(&reply).await.unwrap();

        let err = protocol.read_message(true).await.unwrap_err();
        assert!(matches!(err, ClientError::Framing(_)));
        assert!(!protocol.is_connected().await);
    }

    #[tokio::test]
    async fn test_malformed_error_segment_closes_connection() {
        let (protocol, mut server) = pair().await;
        tokio::spawn(async move {
            let _ = read_envelope(&mut server).await;
            let stack = Tag::new("RError_PI").value_child("count", 1).to_xml();
            server
                .write_all(&Encoder::encode(
                    MessageType::ApiReply,
                    None,
                    stack.as_bytes(),
                    b"tail",
                    0,
                ))
                .await
                .unwrap();
            let mut rest = Vec::new();
            let _ = server.read_to_end(&mut rest).await;
        });

        let err = protocol
            .irods_function(MessageType::ApiRequest, None, 701)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Framing(ProtocolError::MissingTag(_))));
        assert!(!protocol.is_connected().await);
    }

    #[tokio::test]
    async fn test_status_messages_acknowledged() {
        let (protocol, mut server) = pair().await;
        let agent = tokio::spawn(async move {
            let stat = Tag::new(COLL_OPR_STAT_PI)
                .value_child("filesCnt", 10)
                .value_child("totalFileCnt", 30);
            for _ in 0..2 {
                let mut ack = [0u8; 4];
                server.read_exact(&mut ack).await.unwrap();
                assert_eq!(i32::from_be_bytes(ack), SYS_CLI_TO_SVR_COLL_STAT_REPLY);
                server
                    .write_all(&Encoder::encode_reply(Some(&stat), 0))
                    .await
                    .unwrap();
            }
            let mut ack = [0u8; 4];
            server.read_exact(&mut ack).await.unwrap();
            let last = Tag::new(COLL_OPR_STAT_PI).value_child("filesCnt", 3);
            server
                .write_all(&Encoder::encode_reply(Some(&last), 0))
                .await
                .unwrap();
            server
        });

        let first = Tag::new(COLL_OPR_STAT_PI).value_child("filesCnt", 10);
        let reply = protocol
            .process_client_status_messages(Some(first))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply.child_int("filesCnt").unwrap(), 3);
        let _server = agent.await.unwrap();
        protocol.disconnect_with_force().await;
    }

    #[tokio::test]
    async fn test_streamed_request() {
        let (protocol, mut server) = pair().await;
        let agent = tokio::spawn(async move {
            let request = read_envelope(&mut server).await;
            server.write_all(&Encoder::encode_reply(None, 0)).await.unwrap();
            (request, server)
        });

        let mut data: &[u8] = b"file contents";
        let request = OperationComplete { status: 3 };
        let reply = protocol
            .irods_function_including_all_data_in_stream(&request, 13, &mut data, None)
            .await
            .unwrap();
        assert!(reply.is_none());
        let (envelope, _server) = agent.await.unwrap();
        assert_eq!(envelope.header.bs_len, 13);
        assert_eq!(&envelope.bs[..], b"file contents");
        protocol.disconnect_with_force().await;
    }

    #[tokio::test]
    async fn test_frame_defaults_to_put_buffer_size() {
        let config = PipelineConfiguration {
            put_buffer_size: 4,
            ..PipelineConfiguration::default()
        };
        let (protocol, mut server) = pair_with(config).await;
        let agent = tokio::spawn(async move {
            let mut frames = Vec::new();
            for _ in 0..2 {
                frames.push(read_envelope(&mut server).await);
                server.write_all(&Encoder::encode_reply(None, 0)).await.unwrap();
            }
            (frames, server)
        });

        let mut data: &[u8] = b"file contents";
        let request = OperationComplete { status: 3 };
        let first = protocol
            .irods_function_for_streaming_in_frames(&request, None, &mut data, None)
            .await
            .unwrap();
        let second = protocol
            .irods_function_for_streaming_in_frames(&request, Some(9), &mut data, None)
            .await
            .unwrap();
        assert_eq!((first, second), (4, 9));

        let (frames, _server) = agent.await.unwrap();
        assert_eq!(frames[0].header.bs_len, 4);
        assert_eq!(&frames[0].bs[..], b"file");
        assert_eq!(&frames[1].bs[..], b" contents");
        protocol.disconnect_with_force().await;
    }

    #[tokio::test]
    async fn test_shutdown_sends_disconnect() {
        let (protocol, mut server) = pair().await;
        protocol.shutdown().await.unwrap();
        let envelope = read_envelope(&mut server).await;
        assert_eq!(envelope.header.msg_type, MessageType::Disconnect);
        assert!(!protocol.is_connected().await);
        protocol.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_transport_failure_closes() {
        let (protocol, server) = pair().await;
        drop(server);
        let result = protocol.read_message(true).await;
        assert!(result.is_err());
        assert!(!protocol.is_connected().await);
    }
}
