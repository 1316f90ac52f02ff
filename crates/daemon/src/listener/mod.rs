// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for handling socket I/O.
//!
//! One reader task per accepted connection. The first record on a socket
//! must be an `auth` record; anything else before authentication is
//! ignored. After auth, records dispatch sequentially so replies come back
//! in dispatch order, while a writer task drains the connection's outbound
//! queue (replies, notifications and subscribed events).

mod council;
mod dispatch;
mod messages;
mod sessions;
mod tasks;

use std::sync::Arc;

use hub_core::{Clock, HealthUpdate};
use hub_engine::SubscriptionHandle;
use hub_wire::{encode, Envelope, LineParser, Reply, Request};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{unix::OwnedWriteHalf, UnixListener, UnixStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::lifecycle::HubState;
use crate::registry::ConnHandle;

/// Listener task for accepting socket connections.
pub struct Listener {
    listener: UnixListener,
    state: Arc<HubState>,
}

impl Listener {
    pub fn new(listener: UnixListener, state: Arc<HubState>) -> Self {
        Self { listener, state }
    }

    /// Accept until cancelled, spawning a task per connection.
    pub async fn run(self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, _)) => {
                            let state = Arc::clone(&self.state);
                            let conn_cancel = cancel.child_token();
                            tokio::spawn(async move {
                                handle_connection(stream, state, conn_cancel).await;
                            });
                        }
                        Err(e) => error!("accept error: {}", e),
                    }
                }
                _ = cancel.cancelled() => break,
            }
        }
    }
}

/// Context a dispatched request runs with.
pub(crate) struct ConnCtx {
    pub state: Arc<HubState>,
    /// Outbound queue shared with the registry entry for this account.
    pub tx: mpsc::UnboundedSender<Reply>,
    pub account: String,
    /// Cancelled when the connection closes; long-running requests listen.
    pub cancel: CancellationToken,
}

async fn handle_connection(stream: UnixStream, state: Arc<HubState>, cancel: CancellationToken) {
    let (read_half, write_half) = stream.into_split();
    let (tx, rx) = mpsc::unbounded_channel::<Reply>();
    let writer = tokio::spawn(write_loop(write_half, rx));

    let mut session = ConnSession {
        state,
        tx,
        cancel,
        account: None,
        subscription: None,
    };
    session.read_loop(read_half).await;
    session.cleanup();

    // Dropping the last sender ends the writer once the queue drains.
    drop(session);
    if writer.await.is_err() {
        warn!("connection writer task failed");
    }
}

/// Writer task: encode and flush every queued reply in order.
async fn write_loop(mut writer: OwnedWriteHalf, mut rx: mpsc::UnboundedReceiver<Reply>) {
    while let Some(reply) = rx.recv().await {
        let bytes = match encode(&reply) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(error = %err, "failed to encode reply, dropping");
                continue;
            }
        };
        if writer.write_all(&bytes).await.is_err() {
            break;
        }
    }
    let _ = writer.shutdown().await;
}

struct ConnSession {
    state: Arc<HubState>,
    tx: mpsc::UnboundedSender<Reply>,
    cancel: CancellationToken,
    account: Option<String>,
    subscription: Option<SubscriptionHandle>,
}

impl ConnSession {
    async fn read_loop(&mut self, mut reader: tokio::net::unix::OwnedReadHalf) {
        let idle_timeout = self.state.config.idle_timeout();
        let mut parser = LineParser::new();
        let mut buf = vec![0u8; 16 * 1024];

        loop {
            let read = tokio::select! {
                read = tokio::time::timeout(idle_timeout, reader.read(&mut buf)) => read,
                _ = self.cancel.cancelled() => return,
            };
            let n = match read {
                Ok(Ok(0)) => {
                    debug!("client disconnected");
                    return;
                }
                Ok(Ok(n)) => n,
                Ok(Err(err)) => {
                    debug!(error = %err, "connection read error");
                    return;
                }
                Err(_) => {
                    info!(account = ?self.account, "closing idle connection");
                    return;
                }
            };

            for record in parser.feed(&buf[..n]) {
                if !self.handle_record(record).await {
                    return;
                }
            }
        }
    }

    /// Process one record. Returns false when the connection must close.
    async fn handle_record(&mut self, record: Value) -> bool {
        let Some(account) = self.account.clone() else {
            return self.handle_auth_record(record);
        };

        let envelope: Envelope = match serde_json::from_value(record.clone()) {
            Ok(envelope) => envelope,
            Err(err) => {
                let request_id = record
                    .get("requestId")
                    .and_then(|v| v.as_str())
                    .map(str::to_string);
                let _ = self
                    .tx
                    .send(Reply::error(request_id, format!("unrecognized request: {err}")));
                return true;
            }
        };

        self.state.health.touch(&account);

        let ctx = ConnCtx {
            state: Arc::clone(&self.state),
            tx: self.tx.clone(),
            account,
            cancel: self.cancel.clone(),
        };
        let reply = dispatch::dispatch(
            &ctx,
            envelope.request_id,
            envelope.request,
            &mut self.subscription,
        )
        .await;
        let _ = self.tx.send(reply);
        true
    }

    /// Pre-auth: ignore everything except a valid auth record.
    fn handle_auth_record(&mut self, record: Value) -> bool {
        if record.get("type").and_then(|v| v.as_str()) != Some("auth") {
            debug!("ignoring pre-auth record");
            return true;
        }
        let envelope: Envelope = match serde_json::from_value(record) {
            Ok(envelope) => envelope,
            Err(_) => {
                let _ = self.tx.send(Reply::AuthFail {
                    error: "malformed auth record".to_string(),
                    request_id: None,
                });
                return false;
            }
        };
        let Request::Auth { account, token } = envelope.request else {
            // The type tag said auth, so this arm is unreachable; treat it
            // like a malformed record if it ever happens.
            return true;
        };

        if !self.state.tokens.verify(&account, &token) {
            info!(%account, "authentication failed");
            let _ = self.tx.send(Reply::AuthFail {
                error: "invalid account or token".to_string(),
                request_id: envelope.request_id,
            });
            return false;
        }

        let now = self.state.clock.epoch_ms();
        self.state.registry.insert(ConnHandle {
            account: account.clone(),
            tx: self.tx.clone(),
            connected_at: now,
        });
        self.state.health.update(
            &account,
            HealthUpdate {
                connected: Some(true),
                last_activity: Some(now),
                ..Default::default()
            },
        );
        info!(%account, "authenticated");
        let _ = self.tx.send(Reply::AuthOk {
            account: account.clone(),
            request_id: envelope.request_id,
        });
        self.account = Some(account);
        true
    }

    /// Connection teardown: registry, subscriptions, health, in-flight work.
    fn cleanup(&mut self) {
        self.cancel.cancel();
        if let Some(subscription) = self.subscription.take() {
            self.state.bus.unsubscribe(&subscription);
        }
        if let Some(account) = &self.account {
            self.state.registry.remove(account, &self.tx);
            self.state.health.update(
                account,
                HealthUpdate { connected: Some(false), ..Default::default() },
            );
            info!(%account, "disconnected");
        }
    }
}

#[cfg(test)]
#[path = "../listener_tests.rs"]
mod tests;
