// ── Connection manager ──
//
// Owns one device's authenticated session and its liveness monitoring.
// A fresh session token is generated per connect and registered with the
// device; a background heartbeat task polls the liveness endpoint until
// it is cancelled or the failure threshold trips.

use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use gantry_api::{GantryClient, device_url};

use crate::config::FleetConfig;
use crate::error::CoreError;
use crate::model::{ConnectionState, DeviceRecord};

// ── GantryConnection ─────────────────────────────────────────────────

/// Handle to one device's session lifecycle.
///
/// Cheaply cloneable via `Arc`. Created disconnected; call
/// [`connect()`](Self::connect) to register a session and start the
/// heartbeat task, [`disconnect()`](Self::disconnect) to tear both down.
#[derive(Clone)]
pub struct GantryConnection {
    inner: Arc<ConnectionInner>,
}

struct ConnectionInner {
    record: DeviceRecord,
    config: FleetConfig,
    state: watch::Sender<ConnectionState>,
    client: Mutex<Option<Arc<GantryClient>>>,
    heartbeat: Mutex<Option<HeartbeatTask>>,
}

struct HeartbeatTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl GantryConnection {
    /// Create a connection handle for a discovered device. Does NOT
    /// connect -- call [`connect()`](Self::connect).
    pub fn new(record: DeviceRecord, config: FleetConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(ConnectionInner {
                record,
                config,
                state,
                client: Mutex::new(None),
                heartbeat: Mutex::new(None),
            }),
        }
    }

    /// The device's fleet-wide name.
    pub fn name(&self) -> &str {
        &self.inner.record.name
    }

    /// The discovery record this connection was built from.
    pub fn record(&self) -> &DeviceRecord {
        &self.inner.record
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Subscribe to connection state changes.
    pub fn state_watch(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Register a fresh session with the device and start the heartbeat.
    ///
    /// On failure the state stays `Disconnected` and the error surfaces
    /// to the caller; there is no retry inside this call.
    pub async fn connect(&self) -> Result<(), CoreError> {
        // A stale heartbeat from an earlier session must be gone before a
        // new session is registered.
        self.disconnect().await;

        self.inner.state.send_replace(ConnectionState::Connecting);

        let result = self.register_session().await;
        let client = match result {
            Ok(client) => client,
            Err(source) => {
                self.inner.state.send_replace(ConnectionState::Disconnected);
                return Err(CoreError::ConnectFailed {
                    name: self.name().to_owned(),
                    source,
                });
            }
        };

        info!(
            device = %self.name(),
            session_id = client.session_id(),
            "session registered"
        );

        let client = Arc::new(client);
        *self.inner.client.lock().await = Some(Arc::clone(&client));

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(heartbeat_task(self.clone(), client, cancel.clone()));
        *self.inner.heartbeat.lock().await = Some(HeartbeatTask { cancel, handle });

        self.inner.state.send_replace(ConnectionState::Connected);
        Ok(())
    }

    async fn register_session(&self) -> Result<GantryClient, gantry_api::ApiError> {
        let base = device_url(&self.inner.record.address, self.inner.record.port)?;
        let client = GantryClient::new(base, fresh_session_id(), &self.inner.config.transport())?;
        client.open_session().await?;
        Ok(client)
    }

    /// Stop the heartbeat task and abandon the session.
    ///
    /// Blocks until the heartbeat task has fully exited, so no heartbeat
    /// request is in flight once this returns. Idempotent: disconnecting
    /// an already-disconnected device is a no-op.
    pub async fn disconnect(&self) {
        if let Some(task) = self.inner.heartbeat.lock().await.take() {
            task.cancel.cancel();
            let _ = task.handle.await;
        }
        *self.inner.client.lock().await = None;
        if self.inner.state.send_replace(ConnectionState::Disconnected)
            != ConnectionState::Disconnected
        {
            debug!(device = %self.name(), "disconnected");
        }
    }

    // ── Command access ───────────────────────────────────────────────

    /// The device client, for issuing commands.
    ///
    /// Fails fast with [`CoreError::NotConnected`] once the state is
    /// `Disconnected` -- a request against an abandoned session must never
    /// reach the network.
    pub async fn client(&self) -> Result<Arc<GantryClient>, CoreError> {
        if self.state() != ConnectionState::Connected {
            return Err(CoreError::NotConnected {
                name: self.name().to_owned(),
            });
        }
        self.inner
            .client
            .lock()
            .await
            .clone()
            .ok_or_else(|| CoreError::NotConnected {
                name: self.name().to_owned(),
            })
    }
}

fn fresh_session_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

// ── Background heartbeat ─────────────────────────────────────────────

/// Poll the liveness endpoint until cancelled or the failure threshold
/// trips. A successful poll resets the failure counter; once the counter
/// reaches the threshold the device is forced to `Disconnected` and the
/// loop ends. The inter-poll sleep is cancellable so `disconnect()` never
/// waits out a full interval.
async fn heartbeat_task(
    conn: GantryConnection,
    client: Arc<GantryClient>,
    cancel: CancellationToken,
) {
    let interval = conn.inner.config.heartbeat_interval;
    let threshold = conn.inner.config.heartbeat_failure_threshold;
    let mut failures: u32 = 0;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = client.heartbeat() => {
                match result {
                    Ok(true) => failures = 0,
                    Ok(false) => {
                        failures += 1;
                        debug!(device = %conn.name(), failures, "heartbeat rejected");
                    }
                    Err(e) => {
                        failures += 1;
                        debug!(device = %conn.name(), failures, error = %e, "heartbeat failed");
                    }
                }

                if failures >= threshold {
                    let err = CoreError::HeartbeatExhausted {
                        name: conn.name().to_owned(),
                        failures,
                    };
                    warn!(device = %conn.name(), error = %err, "liveness lost");
                    conn.inner.state.send_replace(ConnectionState::Disconnected);
                    break;
                }

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
        }
    }

    debug!(device = %conn.name(), "heartbeat task exiting");
}
