// Interleaved Data Tap
//
// Connects to an RTSP endpoint, issues a DESCRIBE, and reports interleaved
// traffic per channel once a second. Useful for checking whether a server
// pushes RTP/RTCP over the RTSP connection itself.
//
// Usage:
//   cargo run --example interleaved_tap -- rtsp://localhost:8554/stream

use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::Duration;

use log::info;
use tokio::sync::Mutex;

use rtsp_listener::{
    DataHandler, ListenerState, Result, RtspData, RtspListener, RtspRequest, TcpTransport,
};

#[derive(Default)]
struct ChannelStats {
    bytes: Mutex<HashMap<u8, u64>>,
}

#[async_trait::async_trait]
impl DataHandler for ChannelStats {
    async fn handle_data(&self, data: RtspData) -> Result<()> {
        let mut bytes = self.bytes.lock().await;
        *bytes.entry(data.channel).or_insert(0) += data.payload.len() as u64;
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
        std::process::exit(1);
    }
    let url = &args[1];

    let transport = TcpTransport::connect(url).await?;
    let listener = RtspListener::with_defaults(Box::new(transport));

    let stats = Arc::new(ChannelStats::default());
    listener.subscribe_data(stats.clone()).await;

    listener.start().await?;
    info!("Tapping {}", listener.remote_address().await);

    let describe = RtspRequest::new("DESCRIBE", url.as_str())
        .with_header("Accept", "application/sdp");
    listener.send_message(describe).await?;

    while listener.state().await == ListenerState::Running {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let bytes = stats.bytes.lock().await;
        if bytes.is_empty() {
            info!("No interleaved traffic yet");
        } else {
            let mut channels: Vec<_> = bytes.iter().collect();
            channels.sort();
            for (channel, total) in channels {
                info!("Channel {}: {} bytes", channel, total);
            }
        }
    }

    info!("Connection ended");
    listener.dispose().await;
    Ok(())
}
