//! Tunnel establishment over a forward proxy
//!
//! This module drives one CONNECT exchange on a socket: it sends the request
//! built by [`ProxyHandler`], accumulates the proxy's answer until it is
//! complete, and hands the socket back once the proxy confirms the tunnel.

use crate::config::Config;
use crate::http::parser::{MAX_HEAD_SIZE, MAX_RESPONSE_SIZE};
use crate::http::response::{ConnectResponse, ProxyResponse};
use crate::http::writer::RequestWriter;
use crate::proxy::handler::{ProxyHandler, ProxyResponseResult};
use anyhow::{Context, Result};
use bytes::BytesMut;
use std::collections::HashMap;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Default buffer size for reads from the proxy
const BUFFER_SIZE: usize = 4096;

/// The proxy's full answer and how it was judged.
#[derive(Debug)]
pub struct HandshakeOutcome {
    pub response: ConnectResponse,
    pub is_success: bool,
}

impl HandshakeOutcome {
    /// The validator's verdict, borrowing the owned response.
    pub fn result(&self) -> ProxyResponseResult<'_, ConnectResponse> {
        ProxyResponseResult::new(self.is_success, &self.response)
    }

    pub fn error(&self) -> Option<String> {
        self.result().error()
    }
}

/// A socket on which the proxy has confirmed the tunnel.
#[derive(Debug)]
pub struct EstablishedTunnel {
    pub stream: TcpStream,

    /// Bytes that arrived after the proxy's response head. They already belong
    /// to the tunneled protocol.
    pub prefetched: Vec<u8>,
}

impl EstablishedTunnel {
    pub fn into_inner(self) -> (TcpStream, Vec<u8>) {
        (self.stream, self.prefetched)
    }
}

/// Opens CONNECT tunnels through a single forward proxy.
#[derive(Debug, Clone)]
pub struct Tunnel {
    handler: ProxyHandler,

    /// `host:port` of the proxy
    proxy_addr: String,

    /// CONNECT target, `host:port`
    target: String,

    /// Extra headers for the CONNECT request
    headers: HashMap<String, String>,

    connect_timeout: Duration,

    handshake_timeout: Duration,
}

impl Tunnel {
    pub fn new(proxy_addr: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            handler: ProxyHandler::new(),
            proxy_addr: proxy_addr.into(),
            target: target.into(),
            headers: HashMap::new(),
            connect_timeout: Duration::from_secs(5),
            handshake_timeout: Duration::from_secs(10),
        }
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let proxy_addr = cfg.proxy_addr()?;

        Ok(Self::new(proxy_addr, cfg.target.clone())
            .with_headers(cfg.headers.clone())
            .with_timeouts(cfg.connect_timeout(), cfg.handshake_timeout()))
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn with_timeouts(mut self, connect: Duration, handshake: Duration) -> Self {
        self.connect_timeout = connect;
        self.handshake_timeout = handshake;
        self
    }

    pub fn proxy_addr(&self) -> &str {
        &self.proxy_addr
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// The exact bytes sent to the proxy.
    pub fn request(&self) -> String {
        self.handler.create_proxy_request(&self.target, Some(&self.headers))
    }

    /// Connects to the proxy and performs the CONNECT handshake.
    ///
    /// Returns the raw socket once the proxy answers `200`. Any other answer
    /// becomes an error carrying the proxy's explanation.
    pub async fn establish(&self) -> Result<EstablishedTunnel> {
        if self.target.is_empty() {
            anyhow::bail!("Tunnel target must not be empty");
        }

        let mut stream = timeout(
            self.connect_timeout,
            TcpStream::connect(&self.proxy_addr),
        )
        .await
        .context("Proxy connection timeout")?
        .with_context(|| format!("Failed to connect to proxy {}", self.proxy_addr))?;

        tracing::trace!(proxy = %self.proxy_addr, "Connected to proxy");

        let outcome = timeout(self.handshake_timeout, self.handshake(&mut stream))
            .await
            .context("Proxy handshake timeout")??;

        if !outcome.is_success {
            let status = outcome
                .response
                .status()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "no status line".to_string());

            anyhow::bail!(
                "Proxy {} refused tunnel to {} ({}): {}",
                self.proxy_addr,
                self.target,
                status,
                outcome.error().unwrap_or_default()
            );
        }

        tracing::info!(
            proxy = %self.proxy_addr,
            host = %self.target,
            "Tunnel established"
        );

        Ok(EstablishedTunnel {
            stream,
            prefetched: outcome.response.body().to_vec(),
        })
    }

    /// Sends the CONNECT request on `stream` and judges the answer.
    ///
    /// Works on any byte stream, so it can run over an already-open socket.
    pub async fn handshake<S>(&self, stream: &mut S) -> Result<HandshakeOutcome>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let request = self.request();
        RequestWriter::new(request)
            .write_to_stream(stream)
            .await
            .context("Failed to send CONNECT request")?;

        tracing::trace!(host = %self.target, "CONNECT request sent");

        let response = read_proxy_response(stream).await?;
        let result = self.handler.validate_proxy_response(&response);
        let is_success = result.is_success();

        Ok(HandshakeOutcome {
            response,
            is_success,
        })
    }
}

/// Reads from `stream` until the proxy's response is complete.
///
/// A connection closed mid-response is not an error as long as something was
/// received; the partial answer is still worth judging. Error bodies without
/// `Content-Length` end exactly this way.
pub async fn read_proxy_response<S>(stream: &mut S) -> Result<ConnectResponse>
where
    S: AsyncRead + Unpin,
{
    let mut response = ConnectResponse::new();
    let mut buffer = BytesMut::with_capacity(BUFFER_SIZE);

    while response.is_missing_content() {
        buffer.clear();
        let n = stream.read_buf(&mut buffer).await?;

        if n == 0 {
            if response.is_empty() {
                anyhow::bail!("Connection closed before proxy response received");
            }

            tracing::debug!(
                received = response.len(),
                "Proxy closed connection, response ends here"
            );
            break;
        }

        response.push(&buffer[..n]);

        // Prevent unbounded header growth
        if !response.is_head_complete() && response.len() > MAX_HEAD_SIZE {
            anyhow::bail!("Proxy response headers too large");
        }

        if response.len() > MAX_RESPONSE_SIZE {
            anyhow::bail!("Proxy response too large");
        }
    }

    Ok(response)
}
