// Simple RTSP Listener Example
//
// This example demonstrates:
// - Dialing an RTSP endpoint over TCP
// - Subscribing to messages and interleaved data
// - Sending an OPTIONS request and watching the correlated response
//
// Usage:
//   cargo run --example simple_listener -- rtsp://localhost:8554/stream

use std::env;
use std::sync::Arc;

use log::{error, info};

use rtsp_listener::{
    DataHandler, ListenerConfig, MessageHandler, Result, RtspData, RtspListener, RtspMessage,
    RtspRequest, TcpTransport,
};

struct PrintHandler;

#[async_trait::async_trait]
impl MessageHandler for PrintHandler {
    async fn handle_message(&self, message: RtspMessage) -> Result<()> {
        match message {
            RtspMessage::Request(req) => {
                info!("<- {} {} (CSeq {})", req.method, req.uri, req.cseq);
            }
            RtspMessage::Response(resp) => {
                let answers = resp
                    .original_request
                    .as_ref()
                    .map(|req| req.method.clone())
                    .unwrap_or_else(|| "?".to_string());
                info!(
                    "<- {} {} answering {} (CSeq {})",
                    resp.status_code, resp.reason, answers, resp.cseq
                );
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl DataHandler for PrintHandler {
    async fn handle_data(&self, data: RtspData) -> Result<()> {
        info!("<- {} bytes on channel {}", data.payload.len(), data.channel);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <rtsp-url>", args[0]);
        eprintln!("Example:");
        eprintln!("  {} rtsp://localhost:8554/stream", args[0]);
        std::process::exit(1);
    }
    let url = &args[1];

    let config = ListenerConfig::builder().auto_reconnect(true).build()?;

    info!("Connecting to {}", url);
    let transport = TcpTransport::connect(url).await?;
    let listener = RtspListener::new(Box::new(transport), config);

    let handler = Arc::new(PrintHandler);
    listener.subscribe_messages(handler.clone()).await;
    listener.subscribe_data(handler).await;

    listener.start().await?;
    info!("Connected to {}", listener.remote_address().await);

    let request = RtspRequest::new("OPTIONS", url.as_str())
        .with_header("User-Agent", "rtsp-listener-demo");
    if listener.send_message(request).await? {
        info!("OPTIONS sent");
    } else {
        error!("Send failed: transport is down");
    }

    info!("Listening. Press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;

    info!("Disposing listener");
    listener.dispose().await;
    Ok(())
}
