//! Mock transport for deterministic testing of the ELM327 protocol engine.
//!
//! [`MockTransport`] implements the [`Transport`] trait with pre-loaded
//! request/response pairs. This lets you test command encoding, prompt
//! framing, and reply decoding without a real adapter on a serial port.
//!
//! # Example
//!
//! ```
//! use obdlib_test_harness::MockTransport;
//!
//! let mut mock = MockTransport::new();
//! // Pre-load: when the engine sends this request, return this response.
//! mock.expect(b"010D1\r", b"41 0D 1E\r\r>");
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;

use obdlib_core::error::{Error, Result};
use obdlib_core::transport::Transport;

/// A pre-loaded request/response pair for the mock transport.
#[derive(Debug, Clone)]
struct Expectation {
    /// The exact bytes we expect to be sent.
    request: Vec<u8>,
    /// The chunks to return from successive `receive()` calls after the
    /// matching request is received. Usually one chunk; multiple chunks
    /// exercise prompt reassembly across read boundaries.
    response_chunks: Vec<Vec<u8>>,
}

/// A mock [`Transport`] for testing the protocol engine without hardware.
///
/// Expectations are consumed in order. When `send()` is called, the sent
/// data is recorded and matched against the next expectation. The
/// corresponding response chunks are then returned by subsequent
/// `receive()` calls, one chunk per call.
///
/// Data can also be injected directly with [`inject()`](Self::inject),
/// simulating unsolicited adapter output (banners, stray prompts).
///
/// If the sent data does not match the next expectation, or the queue is
/// exhausted, an error is returned.
#[derive(Debug)]
pub struct MockTransport {
    /// Ordered queue of expected request/response pairs.
    expectations: VecDeque<Expectation>,
    /// Chunks pending delivery through `receive()`, oldest first.
    rx_queue: VecDeque<Vec<u8>>,
    /// Whether the transport is "connected".
    connected: bool,
    /// Log of all bytes sent through this transport.
    sent_log: Vec<Vec<u8>>,
}

impl MockTransport {
    /// Create a new mock transport in the connected state.
    pub fn new() -> Self {
        MockTransport {
            expectations: VecDeque::new(),
            rx_queue: VecDeque::new(),
            connected: true,
            sent_log: Vec::new(),
        }
    }

    /// Add an expected request/response pair.
    ///
    /// When `send()` is called with data matching `request`, the subsequent
    /// `receive()` call will return `response` in one chunk.
    pub fn expect(&mut self, request: &[u8], response: &[u8]) {
        self.expectations.push_back(Expectation {
            request: request.to_vec(),
            response_chunks: vec![response.to_vec()],
        });
    }

    /// Add an expected request whose response arrives split across several
    /// `receive()` calls, one chunk each. Used to test reassembly when a
    /// reply straddles read boundaries.
    pub fn expect_chunked(&mut self, request: &[u8], chunks: &[&[u8]]) {
        self.expectations.push_back(Expectation {
            request: request.to_vec(),
            response_chunks: chunks.iter().map(|c| c.to_vec()).collect(),
        });
    }

    /// Queue bytes for delivery by the next `receive()` call without
    /// requiring a matching `send()`. Simulates unsolicited adapter output.
    pub fn inject(&mut self, data: &[u8]) {
        self.rx_queue.push_back(data.to_vec());
    }

    /// Return a reference to all data that has been sent through this transport.
    ///
    /// Each element is the byte slice from one `send()` call.
    pub fn sent_data(&self) -> &[Vec<u8>] {
        &self.sent_log
    }

    /// Return the number of expectations that have not yet been consumed.
    pub fn remaining_expectations(&self) -> usize {
        self.expectations.len()
    }

    /// Set the connected state of the mock transport.
    ///
    /// When set to `false`, subsequent `send()` and `receive()` calls will
    /// return [`Error::NotConnected`].
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }

        // Record what was sent.
        self.sent_log.push(data.to_vec());

        // Match against the next expectation.
        if let Some(expectation) = self.expectations.pop_front() {
            if data != expectation.request.as_slice() {
                return Err(Error::Protocol(format!(
                    "unexpected send data: expected {:?}, got {:?}",
                    String::from_utf8_lossy(&expectation.request),
                    String::from_utf8_lossy(data),
                )));
            }
            self.rx_queue.extend(expectation.response_chunks);
            Ok(())
        } else {
            Err(Error::Protocol(
                "no more expectations in mock transport".into(),
            ))
        }
    }

    async fn receive(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize> {
        if !self.connected {
            return Err(Error::NotConnected);
        }

        match self.rx_queue.pop_front() {
            Some(chunk) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                if n < chunk.len() {
                    // Caller's buffer was too small; keep the rest queued.
                    self.rx_queue.push_front(chunk[n..].to_vec());
                }
                Ok(n)
            }
            None => Err(Error::Timeout),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.connected = false;
        self.rx_queue.clear();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use obdlib_core::transport::Transport;

    #[tokio::test]
    async fn basic_send_receive() {
        let mut mock = MockTransport::new();
        let request = b"010D1\r";
        let response = b"41 0D 1E\r\r>";

        mock.expect(request, response);

        mock.send(request).await.unwrap();

        let mut buf = [0u8; 64];
        let n = mock
            .receive(&mut buf, Duration::from_millis(100))
            .await
            .unwrap();

        assert_eq!(n, response.len());
        assert_eq!(&buf[..n], response);
    }

    #[tokio::test]
    async fn tracks_sent_data() {
        let mut mock = MockTransport::new();
        mock.expect(b"ATZ\r", b"ELM327 v1.5\r\r>");
        mock.expect(b"ATE0\r", b"OK\r\r>");

        mock.send(b"ATZ\r").await.unwrap();
        mock.send(b"ATE0\r").await.unwrap();

        assert_eq!(mock.sent_data().len(), 2);
        assert_eq!(mock.sent_data()[0], b"ATZ\r");
        assert_eq!(mock.sent_data()[1], b"ATE0\r");
    }

    #[tokio::test]
    async fn wrong_data_errors() {
        let mut mock = MockTransport::new();
        mock.expect(b"010D1\r", b"41 0D 1E\r\r>");

        let result = mock.send(b"010C1\r").await;
        assert!(matches!(result.unwrap_err(), Error::Protocol(_)));
    }

    #[tokio::test]
    async fn no_expectations_errors() {
        let mut mock = MockTransport::new();

        let result = mock.send(b"010D1\r").await;
        assert!(matches!(result.unwrap_err(), Error::Protocol(_)));
    }

    #[tokio::test]
    async fn receive_without_send_times_out() {
        let mut mock = MockTransport::new();
        let mut buf = [0u8; 64];

        let result = mock.receive(&mut buf, Duration::from_millis(10)).await;
        assert!(matches!(result.unwrap_err(), Error::Timeout));
    }

    #[tokio::test]
    async fn chunked_response_delivery() {
        let mut mock = MockTransport::new();
        mock.expect_chunked(b"010D1\r", &[b"41 0D", b" 1E\r\r>"]);

        mock.send(b"010D1\r").await.unwrap();

        let mut buf = [0u8; 64];
        let n = mock
            .receive(&mut buf, Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(&buf[..n], b"41 0D");

        let n = mock
            .receive(&mut buf, Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(&buf[..n], b" 1E\r\r>");
    }

    #[tokio::test]
    async fn injected_data_arrives_without_send() {
        let mut mock = MockTransport::new();
        mock.inject(b"ELM327 v1.5\r\r>");

        let mut buf = [0u8; 64];
        let n = mock
            .receive(&mut buf, Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(&buf[..n], b"ELM327 v1.5\r\r>");
    }

    #[tokio::test]
    async fn small_buffer_preserves_remainder() {
        let mut mock = MockTransport::new();
        mock.inject(b"ABCD");

        let mut buf = [0u8; 2];
        let n = mock
            .receive(&mut buf, Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(&buf[..n], b"AB");

        let n = mock
            .receive(&mut buf, Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(&buf[..n], b"CD");
    }

    #[tokio::test]
    async fn disconnect() {
        let mut mock = MockTransport::new();
        assert!(mock.is_connected());

        mock.close().await.unwrap();
        assert!(!mock.is_connected());

        let result = mock.send(b"ATZ\r").await;
        assert!(matches!(result.unwrap_err(), Error::NotConnected));
    }

    #[tokio::test]
    async fn set_connected() {
        let mut mock = MockTransport::new();
        mock.set_connected(false);
        assert!(!mock.is_connected());

        let mut buf = [0u8; 8];
        let result = mock.receive(&mut buf, Duration::from_millis(10)).await;
        assert!(matches!(result.unwrap_err(), Error::NotConnected));
    }

    #[tokio::test]
    async fn remaining_expectations_counts_down() {
        let mut mock = MockTransport::new();
        mock.expect(b"ATZ\r", b">");
        mock.expect(b"ATE0\r", b">");
        assert_eq!(mock.remaining_expectations(), 2);

        mock.send(b"ATZ\r").await.unwrap();
        assert_eq!(mock.remaining_expectations(), 1);

        mock.send(b"ATE0\r").await.unwrap();
        assert_eq!(mock.remaining_expectations(), 0);
    }
}
