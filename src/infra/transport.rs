//! Output stream adapters for the scheduler.

use std::convert::Infallible;
use std::mem;

use async_stream::stream;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::application::transport::{Transport, TransportError};

/// Collects output in memory, remembering where each flush happened.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    buffer: String,
    chunks: Vec<String>,
    flushes: usize,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text committed by each non-empty flush, in order.
    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    /// Number of flush calls, including ones with nothing buffered.
    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    /// Written text not yet flushed.
    pub fn unflushed(&self) -> &str {
        &self.buffer
    }

    /// Everything written so far, flushed or not.
    pub fn output(&self) -> String {
        let mut out = self.chunks.concat();
        out.push_str(&self.buffer);
        out
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn write(&mut self, text: &str) -> Result<(), TransportError> {
        self.buffer.push_str(text);
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), TransportError> {
        self.flushes += 1;
        if !self.buffer.is_empty() {
            self.chunks.push(mem::take(&mut self.buffer));
        }
        Ok(())
    }
}

/// Any tokio writer, e.g. stdout or a socket.
pub struct WriterTransport<W> {
    writer: W,
}

impl<W> WriterTransport<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W> Transport for WriterTransport<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn write(&mut self, text: &str) -> Result<(), TransportError> {
        self.writer.write_all(text.as_bytes()).await?;
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), TransportError> {
        self.writer.flush().await?;
        Ok(())
    }
}

/// Buffers writes and hands each flush to a streaming HTTP body as one chunk.
pub struct ChannelTransport {
    buffer: String,
    sender: mpsc::Sender<Bytes>,
}

/// Create a transport together with the body stream it feeds.
///
/// The stream ends once the transport is dropped.
pub fn channel(
    capacity: usize,
) -> (
    ChannelTransport,
    impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static,
) {
    let (sender, mut receiver) = mpsc::channel::<Bytes>(capacity.max(1));
    let body = stream! {
        while let Some(chunk) = receiver.recv().await {
            yield Ok::<Bytes, Infallible>(chunk);
        }
    };
    (
        ChannelTransport {
            buffer: String::new(),
            sender,
        },
        body,
    )
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn write(&mut self, text: &str) -> Result<(), TransportError> {
        if self.sender.is_closed() {
            return Err(TransportError::Closed);
        }
        self.buffer.push_str(text);
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), TransportError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let chunk = Bytes::from(mem::take(&mut self.buffer));
        self.sender
            .send(chunk)
            .await
            .map_err(|_| TransportError::Closed)
    }
}
