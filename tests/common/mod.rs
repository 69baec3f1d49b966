// Common test utilities: scripted in-memory transport and collecting
// subscribers for driving a listener without a network.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::DuplexStream;
use tokio::sync::Mutex;

use rtsp_listener::{
    DataHandler, Error, ListenerState, MessageHandler, Result, RtspData, RtspListener,
    RtspMessage, Transport, TransportStream,
};

/// Transport over in-memory duplex pipes with a scripted redial queue.
pub struct MockTransport {
    staged: Option<DuplexStream>,
    redials: VecDeque<DuplexStream>,
    online: bool,
    reconnect_calls: Arc<AtomicUsize>,
}

impl MockTransport {
    /// Connected transport with one staged stream
    pub fn new(stream: DuplexStream) -> Self {
        MockTransport {
            staged: Some(stream),
            redials: VecDeque::new(),
            online: true,
            reconnect_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Connected transport that comes back with the scripted streams
    /// after the link drops
    pub fn with_redials(stream: DuplexStream, redials: Vec<DuplexStream>) -> Self {
        MockTransport {
            staged: Some(stream),
            redials: redials.into(),
            online: true,
            reconnect_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Counter of reconnect() invocations, shared with the test body
    pub fn reconnect_counter(&self) -> Arc<AtomicUsize> {
        self.reconnect_calls.clone()
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    fn connected(&self) -> bool {
        self.online
    }

    fn remote_address(&self) -> String {
        "mock:0".to_string()
    }

    fn take_stream(&mut self) -> Result<TransportStream> {
        let stream = self
            .staged
            .take()
            .ok_or_else(|| Error::invalid_state("No stream staged"))?;
        Ok(Box::new(stream))
    }

    async fn reconnect(&mut self) -> Result<()> {
        self.reconnect_calls.fetch_add(1, Ordering::SeqCst);
        if self.online && self.staged.is_some() {
            return Ok(());
        }
        match self.redials.pop_front() {
            Some(stream) => {
                self.staged = Some(stream);
                self.online = true;
                Ok(())
            }
            None => {
                self.online = false;
                Err(Error::connection("No scripted redial left"))
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.staged = None;
        self.online = false;
        Ok(())
    }
}

/// Subscriber that records everything it receives.
#[derive(Default)]
pub struct Collector {
    pub messages: Mutex<Vec<RtspMessage>>,
    pub data: Mutex<Vec<RtspData>>,
}

impl Collector {
    pub fn new() -> Arc<Self> {
        Arc::new(Collector::default())
    }

    pub async fn message_count(&self) -> usize {
        self.messages.lock().await.len()
    }

    pub async fn data_count(&self) -> usize {
        self.data.lock().await.len()
    }
}

#[async_trait::async_trait]
impl MessageHandler for Collector {
    async fn handle_message(&self, message: RtspMessage) -> Result<()> {
        self.messages.lock().await.push(message);
        Ok(())
    }
}

#[async_trait::async_trait]
impl DataHandler for Collector {
    async fn handle_data(&self, data: RtspData) -> Result<()> {
        self.data.lock().await.push(data);
        Ok(())
    }
}

/// Poll until the collector has seen at least the given counts
pub async fn wait_for_counts(collector: &Collector, messages: usize, data: usize) -> bool {
    for _ in 0..200 {
        if collector.message_count().await >= messages && collector.data_count().await >= data {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// Poll until the listener reaches the wanted lifecycle state
pub async fn wait_for_state(listener: &RtspListener, want: ListenerState) -> bool {
    for _ in 0..200 {
        if listener.state().await == want {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
