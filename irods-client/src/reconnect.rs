//! Background reconnection to the agent's reconnect port.
//!
//! Long transfers can outlive firewall idle timers. When the server offers a
//! reconnect port, a task periodically opens a new socket there, proves
//! ownership with the startup cookie and swaps it in under the channel lock.

use crate::auth::StartupResponse;
use crate::config::PipelineConfiguration;
use crate::connection::Connection;
use crate::error::ClientError;
use crate::protocol::{Channel, Protocol};
use irods_protocol::message::{PackingInstruction, ProcState, ReconnMsg};
use irods_protocol::{MessageType, ProtocolError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Reconnect messages sent per attempt while the agent reports it is still
/// receiving.
const MAX_RECONNECT_RESENDS: u32 = 16;

#[derive(Debug, Clone)]
struct ReconnectTarget {
    host: String,
    port: u16,
    cookie: i32,
}

/// Handle to the reconnection task of one protocol.
pub(crate) struct ReconnectionManager {
    shutdown: Arc<AtomicBool>,
    notify: Arc<Notify>,
    handle: JoinHandle<()>,
}

impl ReconnectionManager {
    pub(crate) fn start(
        protocol: Weak<Protocol>,
        startup: &StartupResponse,
        config: &PipelineConfiguration,
    ) -> Self {
        let host = match protocol.upgrade() {
            Some(p) if startup.reconn_addr.trim().is_empty() => p.account().host.clone(),
            _ => startup.reconn_addr.trim().to_string(),
        };
        let target = ReconnectTarget {
            host,
            port: startup.reconn_port,
            cookie: startup.cookie,
        };
        let shutdown = Arc::new(AtomicBool::new(false));
        let notify = Arc::new(Notify::new());
        let handle = tokio::spawn(run(
            protocol,
            target,
            config.reconnect_interval(),
            shutdown.clone(),
            notify.clone(),
        ));
        Self {
            shutdown,
            notify,
            handle,
        }
    }

    /// Signals the task to stop.
    pub(crate) fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
        self.notify.notify_one();
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ReconnectionManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn run(
    protocol: Weak<Protocol>,
    target: ReconnectTarget,
    interval: Duration,
    shutdown: Arc<AtomicBool>,
    notify: Arc<Notify>,
) {
    tracing::debug!(
        "Reconnection task started for {}:{} every {:?}",
        target.host,
        target.port,
        interval
    );
    let mut deadline = Instant::now() + interval;

    loop {
        tokio::select! {
            _ = notify.notified() => {}
            _ = tokio::time::sleep_until(deadline) => {}
        }

        if shutdown.load(Ordering::Relaxed) {
            break;
        }
        if Instant::now() < deadline {
            continue;
        }

        let Some(protocol) = protocol.upgrade() else {
            break;
        };
        match reconnect(&protocol, &target).await {
            Ok(true) => tracing::info!("Reconnected to {}:{}", target.host, target.port),
            Ok(false) => tracing::debug!("Reconnect skipped"),
            Err(e) => tracing::warn!(
                "Reconnect to {}:{} failed: {}",
                target.host,
                target.port,
                e
            ),
        }
        drop(protocol);
        deadline = Instant::now() + interval;
    }

    tracing::debug!("Reconnection task stopped");
}

/// Runs one reconnect attempt. Returns whether the connection was swapped.
async fn reconnect(protocol: &Protocol, target: &ReconnectTarget) -> Result<bool, ClientError> {
    if !protocol.is_restart_enabled() {
        return Ok(false);
    }
    let mut channel = protocol.lock_channel().await;
    let result = swap(&mut channel, target).await;
    channel.end_exchange();
    result
}

async fn swap(channel: &mut Channel, target: &ReconnectTarget) -> Result<bool, ClientError> {
    if !channel.connection.is_connected() {
        return Ok(false);
    }
    let config = channel.connection.config().clone();
    let connection = Connection::connect(&target.host, target.port, config).await?;
    let mut fresh = Channel::new(connection);

    match handshake(&mut fresh, target.cookie).await {
        Ok(true) => {
            let mut old = channel.replace_connection(fresh.connection);
            if let Err(e) = old.shutdown().await {
                tracing::debug!("Closing replaced connection failed: {}", e);
            }
            Ok(true)
        }
        Ok(false) => {
            fresh.connection.obliterate().await;
            Ok(false)
        }
        Err(e) => {
            fresh.connection.obliterate().await;
            Err(e)
        }
    }
}

async fn handshake(fresh: &mut Channel, cookie: i32) -> Result<bool, ClientError> {
    let message = ReconnMsg::new(cookie).to_tag();
    for _ in 0..=MAX_RECONNECT_RESENDS {
        fresh
            .send_envelope(MessageType::Reconnect, Some(&message), &[], &[], 0)
            .await?;
        let reply = fresh
            .read_message(true, false)
            .await?
            .ok_or_else(|| ProtocolError::MissingTag("ReconnMsg_PI".to_string()))?;
        match ProcState::from(reply.child_int("procState")?) {
            ProcState::Processing => return Ok(true),
            ProcState::Receiving => {
                tracing::debug!("Agent still receiving, resending reconnect message");
            }
            ProcState::Other(state) => {
                tracing::warn!("Agent reported procState {}, abandoning reconnect", state);
                return Ok(false);
            }
        }
    }
    Ok(false)
}
