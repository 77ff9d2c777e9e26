//! Transport implementations for obdlib.
//!
//! This crate provides the concrete [`Transport`](obdlib_core::Transport)
//! implementation for serial-attached ELM327 adapters. USB adapters
//! present as virtual COM ports; Bluetooth adapters present as RFCOMM
//! serial devices (`/dev/rfcomm0`), so one serial transport covers both.
//!
//! # Example
//!
//! ```no_run
//! use obdlib_transport::SerialTransport;
//! use obdlib_core::transport::Transport;
//! use std::time::Duration;
//!
//! # async fn example() -> obdlib_core::Result<()> {
//! let mut transport = SerialTransport::open("/dev/ttyUSB0", 38400).await?;
//!
//! transport.send(b"ATZ\r").await?;
//!
//! let mut buf = [0u8; 256];
//! let n = transport.receive(&mut buf, Duration::from_secs(1)).await?;
//! # Ok(())
//! # }
//! ```

pub mod serial;

pub use serial::{DataBits, FlowControl, Parity, SerialConfig, SerialTransport, StopBits};
