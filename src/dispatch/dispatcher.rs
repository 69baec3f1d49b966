use std::sync::Arc;

use log::warn;
use tokio::sync::RwLock;

use crate::protocol::{RtspChunk, RtspData, RtspMessage};
use crate::Result;

/// Subscriber for text RTSP messages (requests and responses).
#[async_trait::async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle_message(&self, message: RtspMessage) -> Result<()>;
}

/// Subscriber for interleaved binary frames.
#[async_trait::async_trait]
pub trait DataHandler: Send + Sync {
    async fn handle_data(&self, data: RtspData) -> Result<()>;
}

/// Routes produced chunks to their subscriber channel.
///
/// Handlers run sequentially on the read task; a slow handler blocks
/// further reads, which is how backpressure reaches the peer.
pub struct Dispatcher {
    message_handlers: RwLock<Vec<Arc<dyn MessageHandler>>>,
    data_handlers: RwLock<Vec<Arc<dyn DataHandler>>>,
}

impl Dispatcher {
    /// Create a dispatcher with no subscribers
    pub fn new() -> Self {
        Dispatcher {
            message_handlers: RwLock::new(Vec::new()),
            data_handlers: RwLock::new(Vec::new()),
        }
    }

    /// Attach a message subscriber
    pub async fn subscribe_messages(&self, handler: Arc<dyn MessageHandler>) {
        self.message_handlers.write().await.push(handler);
    }

    /// Attach a data subscriber
    pub async fn subscribe_data(&self, handler: Arc<dyn DataHandler>) {
        self.data_handlers.write().await.push(handler);
    }

    /// Deliver one chunk to its subscriber channel.
    ///
    /// Handler errors are logged and do not stop delivery to the
    /// remaining subscribers. Zero subscribers is valid.
    pub async fn dispatch(&self, chunk: RtspChunk) {
        match chunk {
            RtspChunk::Message(message) => {
                let handlers = self.message_handlers.read().await;
                for handler in handlers.iter() {
                    if let Err(e) = handler.handle_message(message.clone()).await {
                        warn!("Message subscriber failed: {}", e);
                    }
                }
            }
            RtspChunk::Data(data) => {
                let handlers = self.data_handlers.read().await;
                for handler in handlers.iter() {
                    if let Err(e) = handler.handle_data(data.clone()).await {
                        warn!("Data subscriber failed: {}", e);
                    }
                }
            }
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Dispatcher::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::RtspRequest;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    struct CountingHandler {
        messages: AtomicUsize,
        data: AtomicUsize,
    }

    impl CountingHandler {
        fn new() -> Arc<Self> {
            Arc::new(CountingHandler {
                messages: AtomicUsize::new(0),
                data: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait::async_trait]
    impl MessageHandler for CountingHandler {
        async fn handle_message(&self, _message: RtspMessage) -> Result<()> {
            self.messages.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl DataHandler for CountingHandler {
        async fn handle_data(&self, _data: RtspData) -> Result<()> {
            self.data.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingHandler;

    #[async_trait::async_trait]
    impl MessageHandler for FailingHandler {
        async fn handle_message(&self, _message: RtspMessage) -> Result<()> {
            Err(crate::Error::protocol("handler rejected message"))
        }
    }

    struct RecordingHandler {
        channels: Mutex<Vec<u8>>,
    }

    #[async_trait::async_trait]
    impl DataHandler for RecordingHandler {
        async fn handle_data(&self, data: RtspData) -> Result<()> {
            self.channels.lock().await.push(data.channel);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_chunks_routed_by_class() {
        let dispatcher = Dispatcher::new();
        let handler = CountingHandler::new();
        dispatcher.subscribe_messages(handler.clone()).await;
        dispatcher.subscribe_data(handler.clone()).await;

        let msg: RtspChunk = RtspMessage::Request(RtspRequest::new("OPTIONS", "rtsp://x")).into();
        dispatcher.dispatch(msg).await;

        let data: RtspChunk = RtspData::new(1, vec![0xAA]).into();
        dispatcher.dispatch(data).await;

        assert_eq!(handler.messages.load(Ordering::SeqCst), 1);
        assert_eq!(handler.data.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_subscribers_is_fine() {
        let dispatcher = Dispatcher::new();
        let data: RtspChunk = RtspData::new(0, vec![]).into();
        dispatcher.dispatch(data).await;
    }

    #[tokio::test]
    async fn test_failing_handler_does_not_stop_delivery() {
        let dispatcher = Dispatcher::new();
        dispatcher.subscribe_messages(Arc::new(FailingHandler)).await;
        let counter = CountingHandler::new();
        dispatcher.subscribe_messages(counter.clone()).await;

        let msg: RtspChunk = RtspMessage::Request(RtspRequest::new("OPTIONS", "rtsp://x")).into();
        dispatcher.dispatch(msg).await;

        assert_eq!(counter.messages.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_data_delivered_in_order() {
        let dispatcher = Dispatcher::new();
        let recorder = Arc::new(RecordingHandler {
            channels: Mutex::new(Vec::new()),
        });
        dispatcher.subscribe_data(recorder.clone()).await;

        for channel in [0u8, 2, 4] {
            dispatcher
                .dispatch(RtspData::new(channel, vec![channel]).into())
                .await;
        }

        assert_eq!(*recorder.channels.lock().await, vec![0, 2, 4]);
    }
}
