//! Line-oriented channel to the patching environment.
//!
//! One command line is written, then exactly one reply line is read back.
//! The channel does not interpret either side of the exchange.

use crate::error::{self, Error, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info};

/// A request/response channel carrying one line each way
#[allow(async_fn_in_trait)]
pub trait PatchChannel {
    /// Human-readable peer name for logs and errors
    fn peer(&self) -> &str;

    /// Write one command line.
    async fn send_line(&mut self, command: &str) -> Result<()>;

    /// Block until one reply line arrives. The line ending is removed.
    async fn read_reply(&mut self) -> Result<String>;

    /// Send `command` and wait for its reply.
    async fn exchange(&mut self, command: &str) -> Result<String> {
        self.send_line(command).await?;
        self.read_reply().await
    }
}

/// [`PatchChannel`] over any byte stream, newline-terminated both ways
pub struct LineChannel<S> {
    stream: BufReader<S>,
    peer: String,
    line: String,
}

pub type TcpChannel = LineChannel<TcpStream>;

impl LineChannel<TcpStream> {
    /// Connect to an environment listening at `address` (`host:port`).
    pub async fn connect(address: &str) -> Result<Self> {
        let stream = TcpStream::connect(address).await.map_err(|e| {
            Error::from(e)
                .with_operation("channel::connect")
                .with_context("peer", address)
        })?;
        info!(peer = address, "connected to patching environment");
        Ok(Self::new(stream, address))
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> LineChannel<S> {
    pub fn new(stream: S, peer: impl Into<String>) -> Self {
        Self {
            stream: BufReader::new(stream),
            peer: peer.into(),
            line: String::new(),
        }
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> PatchChannel for LineChannel<S> {
    fn peer(&self) -> &str {
        &self.peer
    }

    async fn send_line(&mut self, command: &str) -> Result<()> {
        let mut frame = String::with_capacity(command.len() + 1);
        frame.push_str(command.trim_end_matches(&['\r', '\n'][..]));
        frame.push('\n');

        let sent = match self.stream.write_all(frame.as_bytes()).await {
            Ok(()) => self.stream.flush().await,
            Err(e) => Err(e),
        };
        sent.map_err(|e| {
            Error::from(e)
                .with_operation("channel::send")
                .with_context("peer", self.peer.as_str())
                .with_context("command", command)
        })?;
        debug!(peer = %self.peer, command, "sent");
        Ok(())
    }

    async fn read_reply(&mut self) -> Result<String> {
        self.line.clear();
        let read = self.stream.read_line(&mut self.line).await.map_err(|e| {
            Error::from(e)
                .with_operation("channel::receive")
                .with_context("peer", self.peer.as_str())
        })?;
        if read == 0 {
            return Err(error::channel_closed(self.peer.as_str()).with_operation("channel::receive"));
        }

        let reply = self.line.trim_end_matches(&['\r', '\n'][..]).to_string();
        debug!(peer = %self.peer, reply = %reply, "received");
        Ok(reply)
    }
}
