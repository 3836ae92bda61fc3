//! ResponseWriter - HttpExchange への書き込みガード
//!
//! - end は 1 回だけ（2 回目以降は無視）
//! - end 後 / writable でない exchange への write は no-op
//! - transport エラーは飲み込む（クライアントはもういない）

use tracing::debug;

use crate::ports::HttpExchange;

pub struct ResponseWriter<E> {
    exchange: E,
    began: bool,
    ended: bool,
    bytes_written: usize,
}

impl<E: HttpExchange> ResponseWriter<E> {
    pub fn new(exchange: E) -> Self {
        Self {
            exchange,
            began: false,
            ended: false,
            bytes_written: 0,
        }
    }

    /// Set status 200 and the content type before the first byte goes out.
    pub fn begin(&mut self, content_type: &str) {
        if self.began {
            return;
        }
        self.began = true;
        if !self.exchange.headers_sent() {
            self.exchange.set_status(200);
            self.exchange.set_header("content-type", content_type);
        }
    }

    fn can_write(&self) -> bool {
        !self.ended && self.exchange.writable()
    }

    /// Returns whether the chunk was handed to the exchange.
    pub async fn write(&mut self, chunk: &[u8]) -> bool {
        if !self.can_write() {
            debug!(len = chunk.len(), "write skipped: response closed");
            return false;
        }
        match self.exchange.write(chunk).await {
            Ok(()) => {
                self.bytes_written += chunk.len();
                true
            }
            Err(err) => {
                debug!(error = %err, "write failed; client gone");
                false
            }
        }
    }

    /// Terminal write. Only the first call reaches the exchange.
    pub async fn end(&mut self, chunk: Option<&[u8]>) -> bool {
        if self.ended {
            return false;
        }
        self.ended = true;
        if !self.exchange.writable() {
            debug!("end skipped: response closed");
            return false;
        }
        match self.exchange.end(chunk).await {
            Ok(()) => {
                self.bytes_written += chunk.map_or(0, <[u8]>::len);
                true
            }
            Err(err) => {
                debug!(error = %err, "end failed; client gone");
                false
            }
        }
    }

    /// Answer with a plain-text error if nothing was sent yet, then end.
    pub async fn fail(&mut self, status: u16, message: &str) {
        if !self.exchange.headers_sent() {
            self.exchange.set_status(status);
            self.exchange.set_header("content-type", "text/plain; charset=utf-8");
            self.began = true;
            self.end(Some(message.as_bytes())).await;
        } else {
            self.end(None).await;
        }
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    pub fn exchange(&self) -> &E {
        &self.exchange
    }

    pub fn into_inner(self) -> E {
        self.exchange
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::MemoryExchange;

    #[tokio::test]
    async fn end_reaches_the_exchange_once() {
        let mut out = ResponseWriter::new(MemoryExchange::get("/"));
        out.begin("text/html");
        assert!(out.write(b"<p>").await);
        assert!(out.end(Some(b"</p>")).await);
        assert!(!out.end(None).await);
        assert!(!out.write(b"late").await);

        let ex = out.into_inner();
        assert_eq!(ex.end_calls(), 1);
        assert_eq!(ex.body_string(), "<p></p>");
        assert_eq!(ex.status(), 200);
        assert_eq!(ex.header("content-type"), Some("text/html"));
    }

    #[tokio::test]
    async fn writes_to_a_closed_exchange_are_swallowed() {
        let mut ex = MemoryExchange::get("/");
        ex.disconnect();
        let mut out = ResponseWriter::new(ex);
        out.begin("text/html");
        assert!(!out.write(b"x").await);
        assert!(!out.end(None).await);
        assert_eq!(out.bytes_written(), 0);
        assert!(out.is_ended());
    }

    #[tokio::test]
    async fn fail_sets_status_before_headers_are_sent() {
        let mut out = ResponseWriter::new(MemoryExchange::get("/"));
        out.fail(500, "Internal Server Error").await;
        let ex = out.into_inner();
        assert_eq!(ex.status(), 500);
        assert_eq!(ex.body_string(), "Internal Server Error");
    }

    #[tokio::test]
    async fn fail_after_headers_only_ends() {
        let mut out = ResponseWriter::new(MemoryExchange::get("/"));
        out.begin("text/html");
        out.write(b"<html>").await;
        out.fail(500, "boom").await;
        let ex = out.into_inner();
        assert_eq!(ex.status(), 200);
        assert_eq!(ex.body_string(), "<html>");
        assert_eq!(ex.end_calls(), 1);
    }
}
