//! Content-Length-framed DAP transport, speaking northbound to the editor.
//!
//! The framing (`Content-Length: N\r\n\r\n<N bytes of JSON>`) matches a
//! standard DAP transport; this process is the one whose stdin/stdout the
//! editor talks to, rather than a client driving a spawned adapter's
//! stdio.

use super::transport_trait::DapTransportTrait;
use super::types::Message;
use crate::{Error, Result};
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};

/// Generic Content-Length-framed transport over any duplex byte stream pair.
pub struct FramedTransport<R, W> {
    reader: R,
    writer: W,
}

impl<R, W> FramedTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    pub async fn read_message(&mut self) -> Result<Message> {
        let mut headers = String::new();
        loop {
            let mut line = String::new();
            let n = self.reader.read_line(&mut line).await?;
            if n == 0 {
                return Err(Error::Dap("transport closed while reading headers".to_string()));
            }
            if line == "\r\n" || line == "\n" {
                break;
            }
            headers.push_str(&line);
        }

        let content_length = headers
            .lines()
            .find(|line| line.to_ascii_lowercase().starts_with("content-length:"))
            .and_then(|line| line.split(':').nth(1))
            .and_then(|s| s.trim().parse::<usize>().ok())
            .ok_or_else(|| Error::Dap("missing Content-Length header".to_string()))?;

        let mut buffer = vec![0u8; content_length];
        self.reader.read_exact(&mut buffer).await?;

        let content = String::from_utf8(buffer).map_err(|e| Error::Dap(format!("invalid UTF-8: {}", e)))?;

        serde_json::from_str(&content).map_err(|e| Error::Dap(format!("failed to parse DAP message: {}", e)))
    }

    pub async fn write_message(&mut self, msg: &Message) -> Result<()> {
        let content = serde_json::to_string(msg).map_err(|e| Error::Dap(format!("failed to serialize DAP message: {}", e)))?;
        let header = format!("Content-Length: {}\r\n\r\n", content.len());

        self.writer.write_all(header.as_bytes()).await?;
        self.writer.write_all(content.as_bytes()).await?;
        self.writer.flush().await?;

        Ok(())
    }
}

#[async_trait]
impl<R, W> DapTransportTrait for FramedTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn read_message(&mut self) -> Result<Message> {
        self.read_message().await
    }

    async fn write_message(&mut self, msg: &Message) -> Result<()> {
        self.write_message(msg).await
    }
}

/// The concrete transport used by the `serve` binary: process stdin/stdout.
pub type DapTransport = FramedTransport<BufReader<Stdin>, Stdout>;

impl DapTransport {
    pub fn new_stdio() -> Self {
        FramedTransport::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

/// A byte-oriented transport for tests, backed by in-memory buffers.
#[cfg(test)]
pub type MemoryTransport = FramedTransport<std::io::Cursor<Vec<u8>>, Vec<u8>>;
