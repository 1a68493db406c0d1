//! Output stream the scheduler writes fragments to.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport closed by peer")]
    Closed,
    #[error("transport i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Ordered character stream with an explicit flush.
///
/// `flush` must not return before previously written text is observable by
/// the remote peer.
#[async_trait]
pub trait Transport: Send {
    async fn write(&mut self, text: &str) -> Result<(), TransportError>;

    async fn flush(&mut self) -> Result<(), TransportError>;
}
