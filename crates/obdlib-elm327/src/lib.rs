//! obdlib-elm327: the ELM327 protocol engine.
//!
//! The ELM327 is a serial-attached OBD-II interpreter: the host writes
//! `\r`-terminated ASCII commands (`AT` adapter commands or hex OBD
//! requests like `010D`), the adapter answers with one or more text lines
//! and then prints a `>` prompt to signal it is ready for the next command.
//!
//! This crate turns that half-duplex text exchange into an async,
//! event-driven client:
//!
//! - [`protocol`] -- prompt-delimited frame reassembly and command encoding
//! - [`decoder`] -- raw frame text to typed [`Reply`](obdlib_core::Reply)
//! - [`queue`] -- strict-FIFO command queue with one command in flight
//! - [`poller`] -- round-robin polling scheduler with last-value snapshots
//! - [`liveness`] -- ECU reachability tracking and transient-drop recovery
//! - [`engine`] -- the single-owner engine task and its public handle
//! - [`builder`] -- fluent construction of [`Elm327Engine`]
//!
//! # Example
//!
//! ```no_run
//! use obdlib_elm327::Elm327Builder;
//!
//! # async fn example() -> obdlib_core::Result<()> {
//! let engine = Elm327Builder::new()
//!     .serial_port("/dev/ttyUSB0")
//!     .build()
//!     .await?;
//!
//! let mut events = engine.subscribe();
//! engine.add_poller("vss").await?;
//! engine.start_polling(None).await?;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod decoder;
pub mod engine;
pub mod liveness;
pub mod poller;
pub mod protocol;
pub mod queue;

pub use builder::Elm327Builder;
pub use engine::Elm327Engine;
pub use queue::PendingCommand;
