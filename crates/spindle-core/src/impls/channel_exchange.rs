//! ChannelExchange - mpsc チャネルへ流す HttpExchange
//!
//! サーバ側はレスポンスヘッダ（`ChannelFrame::Head`）を受け取ってから
//! `ChannelFrame::Data` をボディとして流す。end で送信側を drop するので、
//! 受信側の `recv()` が `None` を返したらレスポンスは終わり。

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::ports::{HttpExchange, TransportError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelFrame {
    Head {
        status: u16,
        headers: Vec<(String, String)>,
    },
    Data(Vec<u8>),
}

pub struct ChannelExchange {
    method: String,
    status: u16,
    headers: Vec<(String, String)>,
    headers_sent: bool,
    tx: Option<mpsc::Sender<ChannelFrame>>,
}

impl ChannelExchange {
    /// Create the exchange and the receiving end of its body stream.
    pub fn new(method: impl Into<String>, buffer: usize) -> (Self, mpsc::Receiver<ChannelFrame>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let exchange = Self {
            method: method.into(),
            status: 200,
            headers: Vec::new(),
            headers_sent: false,
            tx: Some(tx),
        };
        (exchange, rx)
    }

    async fn send(&mut self, frame: ChannelFrame) -> Result<(), TransportError> {
        let tx = self.tx.as_ref().ok_or(TransportError::Closed)?;
        if tx.send(frame).await.is_err() {
            // 受信側が drop された = クライアント切断
            self.tx = None;
            return Err(TransportError::Closed);
        }
        Ok(())
    }

    async fn send_head(&mut self) -> Result<(), TransportError> {
        if self.headers_sent {
            return Ok(());
        }
        self.headers_sent = true;
        let head = ChannelFrame::Head {
            status: self.status,
            headers: std::mem::take(&mut self.headers),
        };
        self.send(head).await
    }
}

#[async_trait]
impl HttpExchange for ChannelExchange {
    fn method(&self) -> &str {
        &self.method
    }

    fn status(&self) -> u16 {
        self.status
    }

    fn set_status(&mut self, status: u16) {
        if !self.headers_sent {
            self.status = status;
        }
    }

    fn set_header(&mut self, name: &str, value: &str) {
        if !self.headers_sent {
            self.headers.push((name.to_string(), value.to_string()));
        }
    }

    fn headers_sent(&self) -> bool {
        self.headers_sent
    }

    fn writable(&self) -> bool {
        self.tx.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    async fn write(&mut self, chunk: &[u8]) -> Result<(), TransportError> {
        self.send_head().await?;
        self.send(ChannelFrame::Data(chunk.to_vec())).await
    }

    async fn end(&mut self, chunk: Option<&[u8]>) -> Result<(), TransportError> {
        self.send_head().await?;
        if let Some(chunk) = chunk {
            self.send(ChannelFrame::Data(chunk.to_vec())).await?;
        }
        self.tx = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn head_precedes_data_and_end_closes_the_stream() {
        let (mut ex, mut rx) = ChannelExchange::new("GET", 8);
        ex.set_header("content-type", "text/html");
        ex.write(b"a").await.unwrap();
        ex.set_status(500);
        ex.end(Some(b"b")).await.unwrap();

        assert_eq!(
            rx.recv().await,
            Some(ChannelFrame::Head {
                status: 200,
                headers: vec![("content-type".to_string(), "text/html".to_string())],
            })
        );
        assert_eq!(rx.recv().await, Some(ChannelFrame::Data(b"a".to_vec())));
        assert_eq!(rx.recv().await, Some(ChannelFrame::Data(b"b".to_vec())));
        assert_eq!(rx.recv().await, None);
        assert!(!ex.writable());
    }

    #[tokio::test]
    async fn dropped_receiver_means_client_gone() {
        let (mut ex, rx) = ChannelExchange::new("GET", 1);
        drop(rx);
        assert!(!ex.writable());
        assert!(matches!(ex.write(b"x").await, Err(TransportError::Closed)));
    }
}
