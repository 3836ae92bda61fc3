//! MemoryExchange - テスト用の記録する HttpExchange
//!
//! # 実装詳細
//! - write / end に渡されたチャンクをそのまま Vec に積む
//! - 最初の write / end でヘッダ送信済みになる
//! - `disconnect()` でクライアント切断を再現する（以降 writable = false）
//!
//! # 使用例
//! ```ignore
//! let mut ctx = RequestContext::new(MemoryExchange::get("/"), NoViews);
//! ctx.render_empty();
//! ctx.respond().await?;
//! assert_eq!(ctx.into_exchange().body_string(), "{}");
//! ```

use async_trait::async_trait;

use crate::ports::{HttpExchange, TransportError};

#[derive(Debug, Clone)]
pub struct MemoryExchange {
    method: String,
    path: String,
    status: u16,
    headers: Vec<(String, String)>,
    chunks: Vec<Vec<u8>>,
    headers_sent: bool,
    ended: bool,
    end_calls: usize,
    connected: bool,
}

impl MemoryExchange {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            // 何も書かれなければ 404 のまま
            status: 404,
            headers: Vec::new(),
            chunks: Vec::new(),
            headers_sent: false,
            ended: false,
            end_calls: 0,
            connected: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new("GET", path)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Simulate the client going away.
    pub fn disconnect(&mut self) {
        self.connected = false;
    }

    /// Header value by case-insensitive name. The last one set wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Every chunk in the order the exchange received it.
    pub fn chunks(&self) -> &[Vec<u8>] {
        &self.chunks
    }

    pub fn chunk_strings(&self) -> Vec<String> {
        self.chunks
            .iter()
            .map(|c| String::from_utf8_lossy(c).into_owned())
            .collect()
    }

    pub fn body(&self) -> Vec<u8> {
        self.chunks.concat()
    }

    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body()).into_owned()
    }

    pub fn end_calls(&self) -> usize {
        self.end_calls
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }
}

#[async_trait]
impl HttpExchange for MemoryExchange {
    fn method(&self) -> &str {
        &self.method
    }

    fn status(&self) -> u16 {
        self.status
    }

    fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    fn set_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    fn headers_sent(&self) -> bool {
        self.headers_sent
    }

    fn writable(&self) -> bool {
        self.connected && !self.ended
    }

    async fn write(&mut self, chunk: &[u8]) -> Result<(), TransportError> {
        if !self.writable() {
            return Err(TransportError::Closed);
        }
        self.headers_sent = true;
        self.chunks.push(chunk.to_vec());
        Ok(())
    }

    async fn end(&mut self, chunk: Option<&[u8]>) -> Result<(), TransportError> {
        self.end_calls += 1;
        if !self.writable() {
            return Err(TransportError::Closed);
        }
        self.headers_sent = true;
        self.ended = true;
        if let Some(chunk) = chunk {
            self.chunks.push(chunk.to_vec());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_chunks_and_headers() {
        let mut ex = MemoryExchange::get("/home");
        assert_eq!(ex.status(), 404);
        assert!(!ex.headers_sent());

        ex.set_status(200);
        ex.set_header("Content-Type", "text/html");
        ex.write(b"<p>").await.unwrap();
        assert!(ex.headers_sent());
        ex.end(Some(b"</p>")).await.unwrap();

        assert_eq!(ex.header("content-type"), Some("text/html"));
        assert_eq!(ex.chunk_strings(), vec!["<p>", "</p>"]);
        assert_eq!(ex.path(), "/home");
        assert!(!ex.writable());
    }

    #[tokio::test]
    async fn disconnected_exchange_rejects_writes() {
        let mut ex = MemoryExchange::get("/");
        ex.disconnect();
        assert!(matches!(ex.write(b"x").await, Err(TransportError::Closed)));
        assert!(ex.end(None).await.is_err());
        assert_eq!(ex.end_calls(), 1);
        assert!(ex.chunks().is_empty());
    }
}
