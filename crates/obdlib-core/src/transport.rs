//! Transport trait for adapter communication.
//!
//! The [`Transport`] trait abstracts over the physical link to an ELM327
//! adapter. Implementations exist for serial ports (USB and Bluetooth
//! RFCOMM devices both present as serial ports) and for mock transports
//! used in testing.
//!
//! The protocol engine in `obdlib-elm327` operates on a `Transport` rather
//! than directly on a serial port, enabling both real hardware use and
//! deterministic unit testing with `MockTransport` from the
//! `obdlib-test-harness` crate.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Asynchronous byte-level transport to an ELM327 adapter.
///
/// Implementations handle buffering and error recovery at the physical
/// layer. Protocol-level concerns (prompt framing, command pacing) are
/// handled by the engine that consumes this trait.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send raw bytes to the adapter.
    ///
    /// Implementations should return only after all bytes have been handed
    /// to the underlying link (serial TX buffer, socket).
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive bytes from the adapter into the provided buffer.
    ///
    /// Returns the number of bytes actually read. Will wait up to `timeout`
    /// for data to arrive; returns [`Error::Timeout`](crate::error::Error::Timeout)
    /// if no data is received within the deadline.
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Close the transport connection.
    ///
    /// After calling `close()`, subsequent `send()` and `receive()` calls
    /// should return [`Error::NotConnected`](crate::error::Error::NotConnected).
    async fn close(&mut self) -> Result<()>;

    /// Check whether the transport is currently connected.
    fn is_connected(&self) -> bool;
}
