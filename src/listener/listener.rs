use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, warn};
use tokio::io::{split, BufReader, WriteHalf};
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::correlation::OutstandingRequests;
use crate::dispatch::{DataHandler, Dispatcher, MessageHandler};
use crate::frame::{FrameReader, FrameWriter};
use crate::listener::{ListenerConfig, ListenerState};
use crate::protocol::constants::MAX_INTERLEAVED_LEN;
use crate::protocol::{ListenerId, RtspChunk, RtspMessage};
use crate::transport::{Transport, TransportStream};
use crate::utils::BufferPool;
use crate::{Error, Result};

type SharedWriter = Arc<Mutex<Option<FrameWriter<WriteHalf<TransportStream>>>>>;

/// The listener engine: one transport, one long-running read task.
///
/// Owns the multiplexed read path, the frame writer, and the
/// request/response correlation table. Produced chunks are handed to
/// subscribers on the read task; writes may come from any task and are
/// serialized through an internal mutex.
pub struct RtspListener {
    id: ListenerId,
    config: ListenerConfig,
    auto_reconnect: AtomicBool,
    transport: Arc<Mutex<Box<dyn Transport>>>,
    state: Arc<RwLock<ListenerState>>,
    writer: SharedWriter,
    outstanding: Arc<OutstandingRequests>,
    dispatcher: Arc<Dispatcher>,
    pool: BufferPool,
    shutdown_tx: Mutex<Option<mpsc::Sender<()>>>,
    read_task: Mutex<Option<JoinHandle<()>>>,
}

impl RtspListener {
    /// Create a listener over an injected transport
    pub fn new(transport: Box<dyn Transport>, config: ListenerConfig) -> Self {
        let auto_reconnect = AtomicBool::new(config.auto_reconnect);
        let pool = BufferPool::new(config.pool_max_idle);

        RtspListener {
            id: ListenerId::next(),
            config,
            auto_reconnect,
            transport: Arc::new(Mutex::new(transport)),
            state: Arc::new(RwLock::new(ListenerState::Idle)),
            writer: Arc::new(Mutex::new(None)),
            outstanding: Arc::new(OutstandingRequests::new()),
            dispatcher: Arc::new(Dispatcher::new()),
            pool,
            shutdown_tx: Mutex::new(None),
            read_task: Mutex::new(None),
        }
    }

    /// Create a listener with the default configuration
    pub fn with_defaults(transport: Box<dyn Transport>) -> Self {
        RtspListener::new(transport, ListenerConfig::default())
    }

    /// Identifier stamped on every chunk this listener produces
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Current lifecycle state
    pub async fn state(&self) -> ListenerState {
        *self.state.read().await
    }

    /// Peer address, delegated to the transport
    pub async fn remote_address(&self) -> String {
        self.transport.lock().await.remote_address()
    }

    pub fn auto_reconnect(&self) -> bool {
        self.auto_reconnect.load(Ordering::SeqCst)
    }

    pub fn set_auto_reconnect(&self, enabled: bool) {
        self.auto_reconnect.store(enabled, Ordering::SeqCst);
    }

    /// Number of sent requests still awaiting a response
    pub async fn pending_requests(&self) -> usize {
        self.outstanding.len().await
    }

    /// Attach a subscriber for requests and responses
    pub async fn subscribe_messages(&self, handler: Arc<dyn MessageHandler>) {
        self.dispatcher.subscribe_messages(handler).await;
    }

    /// Attach a subscriber for interleaved data frames
    pub async fn subscribe_data(&self, handler: Arc<dyn DataHandler>) {
        self.dispatcher.subscribe_data(handler).await;
    }

    /// Take the transport stream and spawn the read task
    pub async fn start(&self) -> Result<()> {
        {
            let state = self.state.read().await;
            if !state.can_start() {
                return Err(Error::invalid_state(format!(
                    "Cannot start listener in state {:?}",
                    *state
                )));
            }
        }

        let stream = self.transport.lock().await.take_stream()?;
        self.spawn_read_task(stream).await;
        Ok(())
    }

    /// Signal the read task and force-close the transport.
    ///
    /// Does not wait for the task to exit; use [`dispose`](Self::dispose)
    /// for a bounded wait.
    pub async fn stop(&self) {
        {
            let mut state = self.state.write().await;
            if !state.can_transition_to(ListenerState::Stopping) {
                return;
            }
            *state = ListenerState::Stopping;
        }

        if let Some(tx) = self.shutdown_tx.lock().await.take() {
            let _ = tx.send(()).await;
        }

        // Closing the transport unblocks any in-flight read
        if let Err(e) = self.transport.lock().await.close().await {
            warn!("{}: Transport close failed: {}", self.id, e);
        }
    }

    /// Re-establish the transport and restart the read task.
    ///
    /// No-op when the transport is still connected. The outstanding-request
    /// table and the sequence counter carry over.
    pub async fn reconnect(&self) -> Result<()> {
        if self.transport.lock().await.connected() {
            return Ok(());
        }

        // Let the previous read task fully unwind before restarting
        let previous = self.read_task.lock().await.take();
        if let Some(handle) = previous {
            let _ = handle.await;
        }

        let stream = {
            let mut transport = self.transport.lock().await;
            transport.reconnect().await?;
            transport.take_stream()?
        };

        self.spawn_read_task(stream).await;
        Ok(())
    }

    /// Stop the listener and release the stream, waiting up to the
    /// configured grace period for the read task to exit.
    pub async fn dispose(&self) {
        self.stop().await;

        let handle = self.read_task.lock().await.take();
        if let Some(handle) = handle {
            if tokio::time::timeout(self.config.shutdown_grace, handle)
                .await
                .is_err()
            {
                warn!("{}: Read task did not exit within grace period", self.id);
            }
        }

        *self.writer.lock().await = None;
    }

    /// Send one RTSP message.
    ///
    /// Requests pass through the correlator and get the next sequence
    /// number; the caller's instance is not touched. Returns `Ok(false)`
    /// when the transport is down and auto-reconnect is disabled or fails.
    pub async fn send_message(&self, message: impl Into<RtspMessage>) -> Result<bool> {
        let message = message.into();

        if !self.transport.lock().await.connected() {
            if !self.auto_reconnect() {
                warn!("{}: Not connected and auto-reconnect is disabled", self.id);
                return Ok(false);
            }
            if let Err(e) = self.reconnect().await {
                warn!("{}: Auto-reconnect failed: {}", self.id, e);
                return Ok(false);
            }
        }

        let outbound = match message {
            RtspMessage::Request(req) => {
                RtspMessage::Request(self.outstanding.register(&req).await)
            }
            response => response,
        };

        let mut writer = self.writer.lock().await;
        let writer = writer
            .as_mut()
            .ok_or_else(|| Error::invalid_state("Listener not started"))?;

        match writer.write_message(&outbound).await {
            Ok(()) => Ok(true),
            Err(e) => {
                // A request that never reached the wire must not linger
                if let RtspMessage::Request(req) = &outbound {
                    self.outstanding.take(req.cseq).await;
                }
                Err(e)
            }
        }
    }

    /// Send one interleaved frame on `channel`.
    ///
    /// Rejects payloads over 65535 bytes before any bytes reach the wire,
    /// and a listener that is not running.
    pub async fn send_data(&self, channel: u8, payload: &[u8]) -> Result<()> {
        if payload.len() > MAX_INTERLEAVED_LEN {
            return Err(Error::invalid_data(format!(
                "Interleaved payload of {} bytes exceeds {}",
                payload.len(),
                MAX_INTERLEAVED_LEN
            )));
        }

        if !self.state.read().await.is_running() {
            return Err(Error::invalid_state("Listener not started"));
        }

        let mut writer = self.writer.lock().await;
        let writer = writer
            .as_mut()
            .ok_or_else(|| Error::invalid_state("Listener not started"))?;
        writer.write_data(channel, payload).await
    }

    /// Split the stream, install the write half, spawn the read loop
    async fn spawn_read_task(&self, stream: TransportStream) {
        let (read_half, write_half) = split(stream);
        *self.writer.lock().await = Some(FrameWriter::new(write_half));

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        *self.shutdown_tx.lock().await = Some(shutdown_tx);

        *self.state.write().await = ListenerState::Running;

        let id = self.id;
        let state = self.state.clone();
        let transport = self.transport.clone();
        let writer = self.writer.clone();
        let outstanding = self.outstanding.clone();
        let dispatcher = self.dispatcher.clone();
        let mut reader =
            FrameReader::with_max_line_length(self.pool.clone(), self.config.max_line_length);
        let mut read_half = BufReader::new(read_half);

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        debug!("{}: Read task received shutdown signal", id);
                        break;
                    }
                    result = reader.read_one_chunk(&mut read_half) => {
                        match result {
                            Ok(Some(mut chunk)) => {
                                if let RtspChunk::Message(RtspMessage::Response(resp)) = &mut chunk
                                {
                                    match outstanding.take(resp.cseq).await {
                                        Some(request) => {
                                            resp.original_request = Some(Box::new(request));
                                        }
                                        None => warn!(
                                            "{}: Response with CSeq {} matches no outstanding request",
                                            id, resp.cseq
                                        ),
                                    }
                                }
                                chunk.set_source(id);
                                dispatcher.dispatch(chunk).await;
                            }
                            Ok(None) => {
                                debug!("{}: Connection closed by peer", id);
                                break;
                            }
                            Err(e) => {
                                warn!("{}: Read failed: {}", id, e);
                                break;
                            }
                        }
                    }
                }
            }

            // Unwind: release the stream, close the transport, settle state
            *writer.lock().await = None;
            if let Err(e) = transport.lock().await.close().await {
                warn!("{}: Transport close failed: {}", id, e);
            }
            {
                let mut state = state.write().await;
                if *state == ListenerState::Running {
                    *state = ListenerState::Stopping;
                }
                if *state == ListenerState::Stopping {
                    *state = ListenerState::Stopped;
                }
            }
            debug!("{}: Read task finished", id);
        });

        *self.read_task.lock().await = Some(handle);
    }
}
