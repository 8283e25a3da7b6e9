//! Protocol engine: the plugin side of the FSM socket.
//!
//! The [`PluginClient`] owns the Unix socket and everything on it:
//! 1. Connect to `<data_dir>/plugin.sock` (with timeout, retry forever)
//! 2. Handshake by announcing the plugin config
//! 3. Read frames and dispatch them — responses resolve pending
//!    correlations, requests spawn contract handler tasks
//! 4. On socket loss, fail every pending request and reconnect
//!
//! All traffic shares the single stream. Outbound writes go through the
//! dedicated writer task; inbound frames are matched to callers by the
//! `u64` correlation id in the message, so responses may arrive in any
//! order. Contract handlers re-enter the engine mid-request for state
//! reads and writes, which is why the pending table is keyed by fresh
//! ids rather than per-call channels.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use prost::Message;
use tokio::io::AsyncReadExt;
use tokio::net::unix::OwnedReadHalf;
use tokio::net::UnixStream;
use tokio::sync::{oneshot, watch};
use tokio::time::timeout;

use crate::config::PluginOptions;
use crate::contract::Contract;
use crate::error::{PluginError, Result};
use crate::framing::FrameBuffer;
use crate::proto::{
    fsm_payload_kind, fsm_to_plugin, plugin_to_fsm, BeginBlockRequest, CheckTxRequest,
    DeliverTxRequest, EndBlockRequest, FsmToPlugin, GenesisRequest, KeyQuery, PluginConfig,
    PluginToFsm, ProtoError, QueryResult, StateReadRequest, StateWriteRequest,
};
use crate::state::{BoxFuture, StateStore};
use crate::writer::{spawn_writer_task, FrameSender, OutboundFrame};

/// Sentinel correlation id reserved for the handshake exchange.
pub const HANDSHAKE_ID: u64 = 999;

/// First correlation id handed to regular outbound requests. Starts
/// above the handshake sentinel so pending-table keys never collide.
const FIRST_REQUEST_ID: u64 = 1000;

/// Transaction family this plugin announces.
const PLUGIN_NAME: &str = "send";
const PLUGIN_ID: u64 = 1;
const PLUGIN_VERSION: u64 = 1;

/// Connection lifecycle of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Handshaking,
    Ready,
    ReconnectBackoff,
    Closing,
    Closed,
}

/// State shared between the public handle, the supervisor, the reader
/// and every spawned handler task.
struct Shared {
    options: PluginOptions,
    contract: Arc<dyn Contract>,
    /// Outstanding outbound requests, keyed by correlation id.
    pending: Mutex<HashMap<u64, oneshot::Sender<Result<FsmToPlugin>>>>,
    /// Sender half of the current connection's writer task.
    writer: Mutex<Option<FrameSender>>,
    state: Mutex<ConnectionState>,
    next_request_id: AtomicU64,
    shutdown: watch::Sender<bool>,
}

impl Shared {
    fn set_state(&self, next: ConnectionState) {
        let mut state = self.state.lock().unwrap();
        if *state != next {
            tracing::debug!(from = ?*state, to = ?next, "connection state");
            *state = next;
        }
    }

    fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap()
    }

    fn next_id(&self) -> u64 {
        self.next_request_id.fetch_add(1, Ordering::Relaxed)
    }

    fn closing(&self) -> bool {
        *self.shutdown.borrow()
    }

    fn clear_writer(&self) {
        *self.writer.lock().unwrap() = None;
    }

    /// Complete every outstanding request with a read failure so no
    /// handler hangs across a disconnect.
    fn fail_pending(&self) {
        let drained: Vec<_> = {
            let mut pending = self.pending.lock().unwrap();
            pending.drain().collect()
        };
        for (id, tx) in drained {
            tracing::debug!(id, "failing pending request on disconnect");
            let _ = tx.send(Err(PluginError::Read("connection lost".to_string())));
        }
    }
}

/// The plugin's protocol engine.
///
/// `start` spawns the supervisor and returns immediately; the engine
/// connects and reconnects in the background until [`close`] is called.
///
/// [`close`]: PluginClient::close
pub struct PluginClient {
    shared: Arc<Shared>,
    supervisor: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl PluginClient {
    /// Start the engine for the given contract.
    ///
    /// Must be called from within a Tokio runtime; the supervisor and
    /// all handler tasks are spawned onto it.
    pub fn start(options: PluginOptions, contract: Arc<dyn Contract>) -> Self {
        let (shutdown, _) = watch::channel(false);
        let shared = Arc::new(Shared {
            options,
            contract,
            pending: Mutex::new(HashMap::new()),
            writer: Mutex::new(None),
            state: Mutex::new(ConnectionState::Disconnected),
            next_request_id: AtomicU64::new(FIRST_REQUEST_ID),
            shutdown,
        });

        let supervisor = tokio::spawn(run_supervisor(shared.clone()));
        Self {
            shared,
            supervisor: Mutex::new(Some(supervisor)),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Close the engine: stop reconnecting, drop the socket, fail every
    /// pending request. Waits for the supervisor up to the close
    /// timeout, then cuts it off.
    pub async fn close(&self) {
        self.shared.set_state(ConnectionState::Closing);
        let _ = self.shared.shutdown.send(true);

        let supervisor = self.supervisor.lock().unwrap().take();
        if let Some(handle) = supervisor {
            let abort = handle.abort_handle();
            if timeout(self.shared.options.close_timeout, handle)
                .await
                .is_err()
            {
                abort.abort();
            }
        }

        self.shared.clear_writer();
        self.shared.fail_pending();
        self.shared.set_state(ConnectionState::Closed);
    }
}

/// The handshake payload announced to the FSM.
fn plugin_config() -> PluginConfig {
    PluginConfig {
        name: PLUGIN_NAME.to_string(),
        id: PLUGIN_ID,
        version: PLUGIN_VERSION,
        supported_transactions: vec![PLUGIN_NAME.to_string()],
    }
}

/// Connect/reconnect loop. Never gives up until shutdown is requested.
async fn run_supervisor(shared: Arc<Shared>) {
    let mut shutdown_rx = shared.shutdown.subscribe();

    loop {
        if shared.closing() {
            break;
        }
        shared.set_state(ConnectionState::Connecting);

        let socket_path = shared.options.socket_path();
        let attempt = timeout(
            shared.options.connection_timeout,
            UnixStream::connect(&socket_path),
        )
        .await;

        match attempt {
            Ok(Ok(stream)) => {
                shared.set_state(ConnectionState::Connected);
                if let Err(err) = run_connection(&shared, stream, &mut shutdown_rx).await {
                    tracing::warn!(error = %err, "connection ended");
                }
                shared.clear_writer();
                shared.fail_pending();
            }
            Ok(Err(err)) => {
                tracing::warn!(path = %socket_path.display(), error = %err, "connect failed");
            }
            Err(_) => {
                tracing::warn!(path = %socket_path.display(), "connect attempt timed out");
            }
        }

        if shared.closing() {
            break;
        }
        shared.set_state(ConnectionState::ReconnectBackoff);
        tokio::select! {
            _ = tokio::time::sleep(shared.options.reconnect_interval) => {}
            _ = shutdown_rx.changed() => {}
        }
    }

    shared.set_state(ConnectionState::Closed);
}

/// Drive one established connection: attach reader and writer,
/// handshake, then run until the socket drops or shutdown is requested.
async fn run_connection(
    shared: &Arc<Shared>,
    stream: UnixStream,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> Result<()> {
    let (read_half, write_half) = stream.into_split();
    let (frame_tx, writer_task) = spawn_writer_task(write_half);
    *shared.writer.lock().unwrap() = Some(frame_tx);

    let mut reader_task = tokio::spawn(read_loop(shared.clone(), read_half));

    shared.set_state(ConnectionState::Handshaking);
    match handshake(shared).await {
        Ok(()) => {
            shared.set_state(ConnectionState::Ready);
            tracing::info!(name = PLUGIN_NAME, "plugin attached to FSM");
        }
        Err(err) => {
            reader_task.abort();
            writer_task.abort();
            return Err(err);
        }
    }

    tokio::select! {
        _ = &mut reader_task => {}
        _ = shutdown_rx.changed() => {
            reader_task.abort();
        }
    }
    writer_task.abort();
    Ok(())
}

/// Announce the plugin config and wait for the FSM's config reply.
async fn handshake(shared: &Arc<Shared>) -> Result<()> {
    let msg = PluginToFsm {
        id: HANDSHAKE_ID,
        payload: Some(plugin_to_fsm::Payload::Config(plugin_config())),
    };
    let resp = send_sync(shared, msg).await?;
    match resp.payload {
        Some(fsm_to_plugin::Payload::Config(_)) => Ok(()),
        other => Err(PluginError::UnexpectedFsmToPlugin(fsm_payload_kind(
            other.as_ref(),
        ))),
    }
}

/// Send one message and wait for the response carrying the same id.
///
/// On timeout the pending entry is removed immediately so a late
/// response is discarded instead of resolving a stranger.
async fn send_sync(shared: &Arc<Shared>, msg: PluginToFsm) -> Result<FsmToPlugin> {
    let id = msg.id;
    let (tx, rx) = oneshot::channel();
    shared.pending.lock().unwrap().insert(id, tx);

    let frame = OutboundFrame::new(Bytes::from(msg.encode_to_vec()));
    let sender = shared.writer.lock().unwrap().clone();
    let Some(sender) = sender else {
        shared.pending.lock().unwrap().remove(&id);
        return Err(PluginError::Write("not connected".to_string()));
    };
    if sender.send(frame).await.is_err() {
        shared.pending.lock().unwrap().remove(&id);
        return Err(PluginError::Write("writer task stopped".to_string()));
    }

    match timeout(shared.options.request_timeout, rx).await {
        Ok(Ok(result)) => result,
        Ok(Err(_)) => Err(PluginError::Read("connection closed".to_string())),
        Err(_) => {
            shared.pending.lock().unwrap().remove(&id);
            Err(PluginError::Timeout)
        }
    }
}

/// Queue a reply frame for an inbound request.
async fn send_reply(shared: &Arc<Shared>, id: u64, payload: plugin_to_fsm::Payload) {
    let msg = PluginToFsm {
        id,
        payload: Some(payload),
    };
    let frame = OutboundFrame::new(Bytes::from(msg.encode_to_vec()));
    let sender = shared.writer.lock().unwrap().clone();
    match sender {
        Some(sender) => {
            if sender.send(frame).await.is_err() {
                tracing::warn!(id, "reply dropped, writer task stopped");
            }
        }
        None => tracing::warn!(id, "reply dropped, not connected"),
    }
}

/// Read frames off the socket until it drops, dispatching each one.
async fn read_loop(shared: Arc<Shared>, mut reader: OwnedReadHalf) {
    let mut frames = FrameBuffer::new();
    let mut buf = vec![0u8; 64 * 1024];

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => {
                tracing::debug!("FSM closed the socket");
                return;
            }
            Ok(n) => n,
            Err(err) => {
                tracing::warn!(error = %PluginError::Read(err.to_string()), "socket read failed");
                return;
            }
        };

        let extracted = match frames.push(&buf[..n]) {
            Ok(extracted) => extracted,
            Err(err) => {
                tracing::error!(error = %err, "framing violated, dropping connection");
                return;
            }
        };

        for frame in extracted {
            match FsmToPlugin::decode(&frame[..]) {
                Ok(msg) => dispatch(&shared, msg),
                Err(err) => {
                    tracing::warn!(
                        error = %PluginError::from(err),
                        "discarding undecodable frame"
                    );
                }
            }
        }
    }
}

/// Inbound request kinds routed to the contract.
enum ContractRequest {
    Genesis(GenesisRequest),
    Begin(BeginBlockRequest),
    Check(CheckTxRequest),
    Deliver(DeliverTxRequest),
    End(EndBlockRequest),
}

/// Classify one decoded inbound message.
///
/// An id present in the pending table marks a response regardless of
/// payload kind; everything else is a request routed by kind.
fn dispatch(shared: &Arc<Shared>, msg: FsmToPlugin) {
    let waiter = shared.pending.lock().unwrap().remove(&msg.id);
    if let Some(tx) = waiter {
        if tx.send(Ok(msg)).is_err() {
            tracing::debug!("response arrived after the caller gave up");
        }
        return;
    }

    use fsm_to_plugin::Payload;
    let id = msg.id;
    match msg.payload {
        Some(Payload::Config(_)) => {
            // FSM asking for the handshake payload again.
            let shared = shared.clone();
            tokio::spawn(async move {
                send_reply(&shared, id, plugin_to_fsm::Payload::Config(plugin_config())).await;
            });
        }
        Some(Payload::Genesis(req)) => spawn_contract_task(shared, id, ContractRequest::Genesis(req)),
        Some(Payload::Begin(req)) => spawn_contract_task(shared, id, ContractRequest::Begin(req)),
        Some(Payload::Check(req)) => spawn_contract_task(shared, id, ContractRequest::Check(req)),
        Some(Payload::Deliver(req)) => {
            spawn_contract_task(shared, id, ContractRequest::Deliver(req))
        }
        Some(Payload::End(req)) => spawn_contract_task(shared, id, ContractRequest::End(req)),
        Some(Payload::StateRead(_)) | Some(Payload::StateWrite(_)) => {
            // These kinds only exist as responses to our own calls.
            tracing::warn!(
                id,
                error = %PluginError::InvalidResponseId,
                "state message with no pending request, ignoring"
            );
        }
        Some(Payload::Error(err)) => {
            tracing::warn!(id, code = err.code, msg = %err.msg, "unsolicited FSM error, ignoring");
        }
        None => {
            tracing::warn!(id, "inbound message with empty payload");
            let shared = shared.clone();
            tokio::spawn(async move {
                let err = PluginError::InvalidFsmToPlugin("empty").to_proto();
                send_reply(&shared, id, plugin_to_fsm::Payload::Error(err)).await;
            });
        }
    }
}

/// Run one contract invocation and write its reply on the same id.
fn spawn_contract_task(shared: &Arc<Shared>, id: u64, request: ContractRequest) {
    let shared = shared.clone();
    tokio::spawn(async move {
        let state = StateClient {
            shared: shared.clone(),
        };
        let contract = shared.contract.clone();
        let payload = match request {
            ContractRequest::Genesis(req) => {
                plugin_to_fsm::Payload::Genesis(contract.genesis(&state, req).await)
            }
            ContractRequest::Begin(req) => {
                plugin_to_fsm::Payload::Begin(contract.begin_block(&state, req).await)
            }
            ContractRequest::Check(req) => {
                plugin_to_fsm::Payload::Check(contract.check_tx(&state, req).await)
            }
            ContractRequest::Deliver(req) => {
                plugin_to_fsm::Payload::Deliver(contract.deliver_tx(&state, req).await)
            }
            ContractRequest::End(req) => {
                plugin_to_fsm::Payload::End(contract.end_block(&state, req).await)
            }
        };
        send_reply(&shared, id, payload).await;
    });
}

/// Engine-backed [`StateStore`] handed to contract invocations.
///
/// Each batch gets a fresh correlation id from the engine's counter and
/// goes out as a nested request on the shared stream.
#[derive(Clone)]
pub struct StateClient {
    shared: Arc<Shared>,
}

impl StateStore for StateClient {
    fn read_batch(
        &self,
        queries: Vec<KeyQuery>,
    ) -> BoxFuture<'_, std::result::Result<Vec<QueryResult>, ProtoError>> {
        Box::pin(async move {
            let id = self.shared.next_id();
            let msg = PluginToFsm {
                id,
                payload: Some(plugin_to_fsm::Payload::StateRead(StateReadRequest {
                    keys: queries,
                })),
            };
            let resp = send_sync(&self.shared, msg)
                .await
                .map_err(|e| e.to_proto())?;
            match resp.payload {
                Some(fsm_to_plugin::Payload::StateRead(read)) => {
                    if let Some(err) = read.error {
                        return Err(err);
                    }
                    Ok(read.results)
                }
                other => Err(PluginError::UnexpectedFsmToPlugin(fsm_payload_kind(
                    other.as_ref(),
                ))
                .to_proto()),
            }
        })
    }

    fn write_batch(
        &self,
        request: StateWriteRequest,
    ) -> BoxFuture<'_, std::result::Result<(), ProtoError>> {
        Box::pin(async move {
            let id = self.shared.next_id();
            let msg = PluginToFsm {
                id,
                payload: Some(plugin_to_fsm::Payload::StateWrite(request)),
            };
            let resp = send_sync(&self.shared, msg)
                .await
                .map_err(|e| e.to_proto())?;
            match resp.payload {
                Some(fsm_to_plugin::Payload::StateWrite(write)) => match write.error {
                    Some(err) => Err(err),
                    None => Ok(()),
                },
                other => Err(PluginError::UnexpectedFsmToPlugin(fsm_payload_kind(
                    other.as_ref(),
                ))
                .to_proto()),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::SendContract;

    fn test_shared() -> Arc<Shared> {
        let (shutdown, _) = watch::channel(false);
        Arc::new(Shared {
            options: PluginOptions::new(1, "/tmp"),
            contract: Arc::new(SendContract::new(1)),
            pending: Mutex::new(HashMap::new()),
            writer: Mutex::new(None),
            state: Mutex::new(ConnectionState::Disconnected),
            next_request_id: AtomicU64::new(FIRST_REQUEST_ID),
            shutdown,
        })
    }

    #[test]
    fn test_request_ids_are_fresh_and_above_handshake() {
        let shared = test_shared();
        let first = shared.next_id();
        let second = shared.next_id();
        assert!(first > HANDSHAKE_ID);
        assert!(second > first);
    }

    #[test]
    fn test_plugin_config_announcement() {
        let config = plugin_config();
        assert_eq!(config.name, "send");
        assert_eq!(config.id, 1);
        assert_eq!(config.version, 1);
        assert_eq!(config.supported_transactions, vec!["send".to_string()]);
    }

    #[tokio::test]
    async fn test_send_sync_without_connection_fails_write() {
        let shared = test_shared();
        let msg = PluginToFsm {
            id: shared.next_id(),
            payload: Some(plugin_to_fsm::Payload::StateRead(StateReadRequest {
                keys: Vec::new(),
            })),
        };
        let err = send_sync(&shared, msg).await.unwrap_err();
        assert_eq!(err.code(), 5);
        assert!(shared.pending.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fail_pending_completes_waiters_with_read_error() {
        let shared = test_shared();
        let (tx, rx) = oneshot::channel();
        shared.pending.lock().unwrap().insert(1234, tx);

        shared.fail_pending();

        let result = rx.await.unwrap();
        assert_eq!(result.unwrap_err().code(), 4);
        assert!(shared.pending.lock().unwrap().is_empty());
    }

    #[test]
    fn test_dispatch_resolves_pending_by_id_regardless_of_kind() {
        let shared = test_shared();
        let (tx, mut rx) = oneshot::channel();
        shared.pending.lock().unwrap().insert(77, tx);

        // A genesis-kind payload still resolves the waiter when the id
        // matches a pending request.
        dispatch(
            &shared,
            FsmToPlugin {
                id: 77,
                payload: Some(fsm_to_plugin::Payload::Genesis(GenesisRequest {})),
            },
        );

        let msg = rx.try_recv().unwrap().unwrap();
        assert_eq!(msg.id, 77);
    }
}
