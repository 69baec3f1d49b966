use tokio::net::TcpStream;
use url::Url;

use crate::protocol::constants::DEFAULT_RTSP_PORT;
use crate::transport::{Transport, TransportStream};
use crate::{Error, Result};

/// TCP transport dialing an `rtsp://host[:port]` endpoint.
pub struct TcpTransport {
    addr: String,
    stream: Option<TcpStream>,
    online: bool,
}

impl TcpTransport {
    /// Parse the URL and establish the initial connection
    pub async fn connect(url: &str) -> Result<Self> {
        let parsed = Url::parse(url).map_err(|e| Error::config(format!("Invalid URL: {}", e)))?;

        match parsed.scheme() {
            "rtsp" => {}
            scheme => return Err(Error::config(format!("Unsupported scheme: {}", scheme))),
        }

        let host = parsed
            .host_str()
            .ok_or_else(|| Error::config("Missing host in URL"))?;
        let port = parsed.port().unwrap_or(DEFAULT_RTSP_PORT);
        let addr = format!("{}:{}", host, port);

        let stream = Self::dial(&addr).await?;

        Ok(TcpTransport {
            addr,
            stream: Some(stream),
            online: true,
        })
    }

    async fn dial(addr: &str) -> Result<TcpStream> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| Error::connection(format!("Failed to connect to {}: {}", addr, e)))?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}

#[async_trait::async_trait]
impl Transport for TcpTransport {
    fn connected(&self) -> bool {
        self.online
    }

    fn remote_address(&self) -> String {
        self.addr.clone()
    }

    fn take_stream(&mut self) -> Result<TransportStream> {
        let stream = self
            .stream
            .take()
            .ok_or_else(|| Error::invalid_state("No stream staged; transport not connected"))?;
        Ok(Box::new(stream))
    }

    async fn reconnect(&mut self) -> Result<()> {
        if self.online && self.stream.is_some() {
            return Ok(());
        }
        match Self::dial(&self.addr).await {
            Ok(stream) => {
                self.stream = Some(stream);
                self.online = true;
                Ok(())
            }
            Err(e) => {
                self.online = false;
                Err(e)
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        // Dropping the socket closes it
        self.stream = None;
        self.online = false;
        Ok(())
    }
}
