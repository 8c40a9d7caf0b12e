//! Agent connection: one socket plus an output accumulation buffer.

use crate::config::{PipelineConfiguration, TlsSettings};
use crate::error::ClientError;
use crate::stream::ClientStream;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

static LEAKED_CONNECTIONS: AtomicU64 = AtomicU64::new(0);

/// Number of connections dropped while still connected, process wide.
pub fn leaked_connections() -> u64 {
    LEAKED_CONNECTIONS.load(Ordering::Relaxed)
}

/// Receives byte counts as a stream transfer makes progress.
pub trait ProgressListener: Send + Sync {
    fn on_progress(&self, bytes: u64);
}

/// A socket to an iRODS agent.
///
/// Writes accumulate in an output buffer of `internal_cache_buffer_size`
/// bytes until [`Connection::flush`]. Any I/O failure marks the connection
/// as not connected.
pub struct Connection {
    host: String,
    port: u16,
    config: Arc<PipelineConfiguration>,
    stream: Option<ClientStream>,
    output: Vec<u8>,
    lookahead: Option<u8>,
    connected: bool,
}

impl Connection {
    /// Opens a connection, retrying up to `connect_attempts` times.
    pub async fn connect(
        host: &str,
        port: u16,
        config: Arc<PipelineConfiguration>,
    ) -> Result<Self, ClientError> {
        let attempts = config.connect_attempts.max(1);
        let mut last_error = ClientError::NotConnected;

        for attempt in 1..=attempts {
            tracing::debug!("Connecting to {}:{} (attempt {})", host, port, attempt);
            match Self::open_socket(host, port, &config).await {
                Ok(tcp) => {
                    tracing::info!("Connected to {}:{}", host, port);
                    return Ok(Self::from_tcp(tcp, host, port, config));
                }
                Err(e) => {
                    tracing::warn!(
                        "Connect attempt {}/{} to {}:{} failed: {}",
                        attempt,
                        attempts,
                        host,
                        port,
                        e
                    );
                    last_error = e;
                    if attempt < attempts {
                        tokio::time::sleep(config.connect_retry_delay()).await;
                    }
                }
            }
        }

        Err(last_error)
    }

    async fn open_socket(
        host: &str,
        port: u16,
        config: &PipelineConfiguration,
    ) -> Result<TcpStream, ClientError> {
        let tcp = tokio::time::timeout(config.connect_timeout(), TcpStream::connect((host, port)))
            .await
            .map_err(|_| ClientError::Timeout)??;
        tcp.set_nodelay(true).ok();
        Ok(tcp)
    }

    /// Wraps an already established TCP stream.
    pub fn from_tcp(
        stream: TcpStream,
        host: impl Into<String>,
        port: u16,
        config: Arc<PipelineConfiguration>,
    ) -> Self {
        let capacity = config.internal_cache_buffer_size.max(0) as usize;
        Self {
            host: host.into(),
            port,
            stream: Some(ClientStream::plain(stream)),
            output: Vec::with_capacity(capacity),
            lookahead: None,
            connected: true,
            config,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn config(&self) -> &Arc<PipelineConfiguration> {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.connected && self.stream.is_some()
    }

    pub fn is_tls(&self) -> bool {
        self.stream.as_ref().is_some_and(ClientStream::is_tls)
    }

    /// Bytes waiting in the output buffer.
    pub fn buffered(&self) -> usize {
        self.output.len()
    }

    fn stream_mut(&mut self) -> Result<&mut ClientStream, ClientError> {
        if !self.connected {
            return Err(ClientError::NotConnected);
        }
        self.stream.as_mut().ok_or(ClientError::NotConnected)
    }

    fn fail<T>(&mut self, error: io::Error) -> Result<T, ClientError> {
        tracing::debug!("I/O failure on {}:{}: {}", self.host, self.port, error);
        self.connected = false;
        Err(ClientError::Io(error))
    }

    async fn write_raw(&mut self, data: &[u8]) -> Result<(), ClientError> {
        if data.is_empty() {
            return Ok(());
        }
        let stream = self.stream_mut()?;
        let result = stream.write_all(data).await;
        match result {
            Ok(()) => Ok(()),
            Err(e) => self.fail(e),
        }
    }

    async fn write_buffered(&mut self) -> Result<(), ClientError> {
        if self.output.is_empty() {
            return Ok(());
        }
        let pending = std::mem::take(&mut self.output);
        let result = self.write_raw(&pending).await;
        self.output = pending;
        self.output.clear();
        result
    }

    pub async fn send(&mut self, value: &[u8]) -> Result<(), ClientError> {
        self.send_range(value, 0, value.len()).await
    }

    /// Sends `len` bytes of `value` starting at `offset`.
    pub async fn send_range(
        &mut self,
        value: &[u8],
        offset: usize,
        len: usize,
    ) -> Result<(), ClientError> {
        let end = offset
            .checked_add(len)
            .filter(|end| *end <= value.len())
            .ok_or_else(|| {
                ClientError::InvalidArgument(format!(
                    "range {}+{} exceeds {} bytes",
                    offset,
                    len,
                    value.len()
                ))
            })?;
        let value = &value[offset..end];
        self.stream_mut()?;

        let size = self.config.internal_cache_buffer_size;
        if size <= 0 {
            return self.write_raw(value).await;
        }
        let size = size as usize;

        if self.output.len() + len >= size {
            self.write_buffered().await?;
            if len >= size {
                return self.write_raw(value).await;
            }
        }
        self.output.extend_from_slice(value);
        Ok(())
    }

    pub async fn send_str(&mut self, value: &str) -> Result<(), ClientError> {
        self.send(value.as_bytes()).await
    }

    /// Sends a 4-byte big-endian integer.
    pub async fn send_in_network_order(&mut self, value: i32) -> Result<(), ClientError> {
        self.send(&value.to_be_bytes()).await
    }

    /// Copies exactly `len` bytes from `reader` to the socket.
    pub async fn send_from_reader<R>(
        &mut self,
        reader: &mut R,
        len: u64,
        progress: Option<&dyn ProgressListener>,
    ) -> Result<u64, ClientError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let chunk = (self.config.copy_buffer_size.max(1) as u64).min(len.max(1)) as usize;
        let mut buf = vec![0u8; chunk];
        let mut sent = 0u64;

        while sent < len {
            let want = (len - sent).min(chunk as u64) as usize;
            let n = match reader.read(&mut buf[..want]).await {
                Ok(n) => n,
                Err(e) => return self.fail(e),
            };
            if n == 0 {
                return self.fail(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("input ended after {} of {} bytes", sent, len),
                ));
            }
            self.send(&buf[..n]).await?;
            sent += n as u64;
            if let Some(listener) = progress {
                listener.on_progress(n as u64);
            }
        }

        tracing::debug!("Streamed {} bytes to {}:{}", sent, self.host, self.port);
        Ok(sent)
    }

    /// Writes out buffered bytes and flushes the socket.
    pub async fn flush(&mut self) -> Result<(), ClientError> {
        if !self.is_connected() {
            return Err(ClientError::ConnectionClosed);
        }
        self.write_buffered().await?;
        let stream = self.stream_mut()?;
        let result = stream.flush().await;
        match result {
            Ok(()) => Ok(()),
            Err(e) => self.fail(e),
        }
    }

    async fn read_some(&mut self, buf: &mut [u8]) -> Result<usize, ClientError> {
        if buf.is_empty() {
            return Ok(0);
        }
        if let Some(byte) = self.lookahead.take() {
            buf[0] = byte;
            return Ok(1);
        }

        let timeout = self.config.socket_timeout();
        let stream = self.stream_mut()?;
        let result = match timeout {
            Some(limit) => match tokio::time::timeout(limit, stream.read(buf)).await {
                Ok(r) => r,
                Err(_) => {
                    tracing::debug!("Read timed out after {:?}", limit);
                    self.connected = false;
                    return Err(ClientError::Timeout);
                }
            },
            None => stream.read(buf).await,
        };
        match result {
            Ok(n) => Ok(n),
            Err(e) => self.fail(e),
        }
    }

    /// Reads up to `len` bytes into `buf[offset..]`, stopping early only at EOF.
    pub async fn read(
        &mut self,
        buf: &mut [u8],
        offset: usize,
        len: usize,
    ) -> Result<usize, ClientError> {
        let end = offset
            .checked_add(len)
            .filter(|end| *end <= buf.len())
            .ok_or_else(|| ClientError::InvalidArgument("read range exceeds buffer".to_string()))?;

        let mut total = 0;
        while offset + total < end {
            let n = self.read_some(&mut buf[offset + total..end]).await?;
            if n == 0 {
                break;
            }
            total += n;
        }
        Ok(total)
    }

    /// Reads exactly `len` bytes. A short read closes the connection.
    pub async fn read_exact_message(&mut self, len: usize) -> Result<Vec<u8>, ClientError> {
        let mut buf = vec![0u8; len];
        let n = self.read(&mut buf, 0, len).await?;
        if n < len {
            tracing::debug!("Short read: {} of {} bytes", n, len);
            self.connected = false;
            return Err(ClientError::ConnectionClosed);
        }
        Ok(buf)
    }

    /// Reads a 4-byte big-endian integer.
    pub async fn read_int(&mut self) -> Result<i32, ClientError> {
        let bytes = self.read_exact_message(4).await?;
        Ok(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub(crate) async fn read_byte(&mut self) -> Result<u8, ClientError> {
        Ok(self.read_exact_message(1).await?[0])
    }

    /// Pushes one byte back so the next read returns it first.
    pub(crate) fn unread_byte(&mut self, byte: u8) {
        self.lookahead = Some(byte);
    }

    /// Copies exactly `len` bytes from the socket to `writer`.
    pub async fn read_to_writer<W>(
        &mut self,
        writer: &mut W,
        len: u64,
        progress: Option<&dyn ProgressListener>,
    ) -> Result<u64, ClientError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let chunk = (self.config.copy_buffer_size.max(1) as u64).min(len.max(1)) as usize;
        let mut buf = vec![0u8; chunk];
        let mut received = 0u64;

        while received < len {
            let want = (len - received).min(chunk as u64) as usize;
            let n = self.read_some(&mut buf[..want]).await?;
            if n == 0 {
                tracing::debug!("Stream ended after {} of {} bytes", received, len);
                self.connected = false;
                return Err(ClientError::ConnectionClosed);
            }
            if let Err(e) = writer.write_all(&buf[..n]).await {
                return self.fail(e);
            }
            received += n as u64;
            if let Some(listener) = progress {
                listener.on_progress(n as u64);
            }
        }
        if let Err(e) = writer.flush().await {
            return self.fail(e);
        }
        Ok(received)
    }

    /// Upgrades the socket to TLS in place.
    pub async fn upgrade_to_tls(&mut self, settings: &TlsSettings) -> Result<(), ClientError> {
        self.flush().await?;
        let stream = self.stream.take().ok_or(ClientError::NotConnected)?;
        match stream.upgrade(settings, &self.host).await {
            Ok(upgraded) => {
                self.stream = Some(upgraded);
                Ok(())
            }
            Err(e) => {
                self.connected = false;
                Err(e)
            }
        }
    }

    /// Flushes pending output and closes the socket.
    pub async fn shutdown(&mut self) -> Result<(), ClientError> {
        let result = if self.is_connected() {
            self.flush().await
        } else {
            Ok(())
        };
        self.connected = false;
        self.output.clear();
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                tracing::debug!("Socket shutdown error ignored: {}", e);
            }
        }
        tracing::debug!("Connection to {}:{} shut down", self.host, self.port);
        result
    }

    /// Closes the socket immediately, discarding buffered output and errors.
    pub async fn obliterate(&mut self) {
        self.connected = false;
        self.output.clear();
        self.lookahead = None;
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
        }
        tracing::debug!("Connection to {}:{} obliterated", self.host, self.port);
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if self.is_connected() {
            LEAKED_CONNECTIONS.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                "Connection to {}:{} dropped while still connected",
                self.host,
                self.port
            );
        }
    }
}
