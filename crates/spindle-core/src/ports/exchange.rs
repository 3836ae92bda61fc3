//! HttpExchange port - フレームワーク層から渡されるリクエスト / レスポンス

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,
}

/// One HTTP request/response pair as seen by the scheduler.
///
/// The scheduler checks `headers_sent()` before touching status or headers
/// and `writable()` before every write. Transport errors are never
/// propagated to application code: the client is already gone.
#[async_trait]
pub trait HttpExchange: Send {
    fn method(&self) -> &str;

    fn status(&self) -> u16;

    fn set_status(&mut self, status: u16);

    fn set_header(&mut self, name: &str, value: &str);

    fn headers_sent(&self) -> bool;

    fn writable(&self) -> bool;

    /// Write one chunk, keeping the response open.
    async fn write(&mut self, chunk: &[u8]) -> Result<(), TransportError>;

    /// Terminal write. Called at most once per exchange.
    async fn end(&mut self, chunk: Option<&[u8]>) -> Result<(), TransportError>;
}
