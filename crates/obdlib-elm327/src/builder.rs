//! Elm327Builder -- fluent builder for constructing [`Elm327Engine`]
//! instances.
//!
//! Separates configuration from construction so that callers can set up
//! serial port parameters, timeouts, and buffer bounds before the
//! transport connection is established.
//!
//! # Example
//!
//! ```no_run
//! use obdlib_elm327::Elm327Builder;
//! use std::time::Duration;
//!
//! # async fn example() -> obdlib_core::Result<()> {
//! let engine = Elm327Builder::new()
//!     .serial_port("/dev/ttyUSB0")
//!     .baud_rate(115_200)
//!     .command_timeout(Duration::from_secs(1))
//!     .build()
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use obdlib_core::error::{Error, Result};
use obdlib_core::transport::Transport;
use obdlib_pids::PidRegistry;

use crate::engine::{Elm327Engine, EngineConfig};
use crate::protocol;
use crate::queue;

/// Default bound on how long one command may go unanswered before it is
/// dropped and the queue moves on.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

/// Fluent builder for [`Elm327Engine`].
///
/// All settings have defaults matching common ELM327 clones, so the
/// simplest usage is:
///
/// ```ignore
/// let engine = Elm327Builder::new()
///     .serial_port("/dev/ttyUSB0")
///     .build()
///     .await?;
/// ```
pub struct Elm327Builder {
    serial_port: Option<String>,
    baud_rate: u32,
    command_timeout: Duration,
    queue_capacity: usize,
    carry_limit: usize,
    registry: PidRegistry,
}

impl Elm327Builder {
    /// Create a builder with default settings and the standard PID
    /// registry.
    pub fn new() -> Self {
        Elm327Builder {
            serial_port: None,
            baud_rate: 38400,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            queue_capacity: queue::DEFAULT_CAPACITY,
            carry_limit: protocol::DEFAULT_CARRY_LIMIT,
            registry: PidRegistry::default(),
        }
    }

    /// Set the serial port path (e.g. `/dev/ttyUSB0`, `/dev/rfcomm0`, or
    /// `COM3`).
    pub fn serial_port(mut self, port: &str) -> Self {
        self.serial_port = Some(port.to_string());
        self
    }

    /// Override the default 38400 baud rate.
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.baud_rate = baud;
        self
    }

    /// Set how long a dispatched command may go unanswered before it is
    /// dropped (default: 2 s).
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Set the pending command queue capacity (default: 256).
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the framing carry-over bound in bytes (default: 1024).
    pub fn carry_over_limit(mut self, limit: usize) -> Self {
        self.carry_limit = limit;
        self
    }

    /// Replace the standard PID registry, e.g. with vendor extensions.
    pub fn registry(mut self, registry: PidRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Build an [`Elm327Engine`] with a caller-provided transport.
    ///
    /// This is the primary entry point for testing (pass a
    /// `MockTransport` from `obdlib-test-harness`) and for advanced use
    /// cases where the caller manages the transport lifecycle directly.
    pub async fn build_with_transport(self, transport: Box<dyn Transport>) -> Result<Elm327Engine> {
        Ok(Elm327Engine::start(
            transport,
            EngineConfig {
                command_timeout: self.command_timeout,
                queue_capacity: self.queue_capacity,
                carry_limit: self.carry_limit,
                registry: self.registry,
            },
        ))
    }

    /// Build an [`Elm327Engine`] over a serial transport.
    ///
    /// Requires that [`serial_port()`](Self::serial_port) has been called.
    pub async fn build(self) -> Result<Elm327Engine> {
        let port = self
            .serial_port
            .as_ref()
            .ok_or_else(|| Error::Transport("serial_port is required for build()".into()))?;

        let transport = obdlib_transport::SerialTransport::open(port, self.baud_rate).await?;
        self.build_with_transport(Box::new(transport)).await
    }
}

impl Default for Elm327Builder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use obdlib_test_harness::MockTransport;

    #[tokio::test]
    async fn builder_defaults() {
        let mock = MockTransport::new();
        let engine = Elm327Builder::new()
            .build_with_transport(Box::new(mock))
            .await
            .unwrap();

        assert!(engine.is_connected());
    }

    #[tokio::test]
    async fn builder_fluent_chain() {
        let mock = MockTransport::new();
        let engine = Elm327Builder::new()
            .serial_port("/dev/ttyUSB0")
            .baud_rate(115_200)
            .command_timeout(Duration::from_millis(300))
            .queue_capacity(64)
            .carry_over_limit(4096)
            .build_with_transport(Box::new(mock))
            .await
            .unwrap();

        assert!(engine.is_connected());
    }

    #[tokio::test]
    async fn builder_serial_port_required_for_build() {
        let result = Elm327Builder::new().build().await;
        assert!(result.is_err());
    }
}
