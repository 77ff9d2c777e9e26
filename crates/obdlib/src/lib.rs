//! # obdlib -- Async ELM327/OBD-II Client for Rust
//!
//! `obdlib` is an asynchronous Rust library for talking to a vehicle's
//! OBD-II port through an ELM327 adapter (USB or Bluetooth serial). It is
//! designed for dashboards, data loggers, and diagnostic tools that need
//! continuous live data without blocking on a half-duplex serial link.
//!
//! ## Quick Start
//!
//! Add `obdlib` to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! obdlib = "0.1"
//! tokio = { version = "1", features = ["full"] }
//! ```
//!
//! Connect to an adapter and poll vehicle speed:
//!
//! ```no_run
//! use obdlib::{Elm327Builder, ObdEvent};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = Elm327Builder::new()
//!         .serial_port("/dev/ttyUSB0")
//!         .build()
//!         .await?;
//!
//!     let mut events = engine.subscribe();
//!     engine.add_poller("vss").await?;
//!     engine.start_polling(None).await?;
//!
//!     while let Ok(event) = events.recv().await {
//!         if let ObdEvent::Pid { name, value } = event {
//!             println!("{name} = {value}");
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized as a workspace of focused crates:
//!
//! | Crate                 | Purpose                                       |
//! |-----------------------|-----------------------------------------------|
//! | `obdlib-core`         | [`Transport`] trait, [`Reply`]/[`Value`] types, [`ObdEvent`], errors |
//! | `obdlib-pids`         | SAE J1979 parameter descriptors and decode formulas |
//! | `obdlib-elm327`       | The protocol engine: framing, decoding, queue, poller |
//! | `obdlib-transport`    | Serial transport over tokio-serial            |
//! | `obdlib-test-harness` | `MockTransport` for hardware-free testing     |
//! | **`obdlib`**          | This facade crate -- re-exports everything    |
//!
//! ## How it works
//!
//! The ELM327 is strictly half-duplex: it accepts one command at a time
//! and signals readiness with a `>` prompt. The engine serializes all
//! traffic through a FIFO queue with exactly one command in flight,
//! reassembles prompt-delimited reply frames from arbitrary read chunks,
//! and decodes them against the parameter registry. A polling scheduler
//! refreshes a set of parameters round-robin, and an ECU liveness tracker
//! turns adapter status tokens into online/offline transitions.
//!
//! All per-connection state is owned by one spawned task; the
//! [`Elm327Engine`] handle communicates with it over channels, so there
//! are no locks anywhere on the hot path.
//!
//! ## Event Subscription
//!
//! The engine emits [`ObdEvent`]s through a broadcast channel:
//!
//! ```no_run
//! use obdlib::ObdEvent;
//! # async fn example(engine: &obdlib::Elm327Engine) {
//! let mut events = engine.subscribe();
//! loop {
//!     match events.recv().await {
//!         Ok(ObdEvent::Pid { name, value }) => println!("{name} = {value}"),
//!         Ok(ObdEvent::Ecu { online, status }) => {
//!             println!("ECU {}: {status}", if online { "online" } else { "offline" });
//!         }
//!         Ok(_) => {}
//!         Err(_) => break,
//!     }
//! }
//! # }
//! ```

pub use obdlib_core::*;

pub use obdlib_elm327::{Elm327Builder, Elm327Engine, PendingCommand};

/// SAE J1979 parameter descriptors and registry lookups.
pub mod pids {
    pub use obdlib_pids::*;
}

/// Concrete transport implementations.
pub mod transport {
    pub use obdlib_transport::*;
}

/// The protocol engine internals: framing, decoding, queue, poller,
/// liveness. Most applications only need [`Elm327Builder`] and
/// [`Elm327Engine`] from the crate root; these modules are exposed for
/// advanced use and for building custom tooling on the protocol layer.
pub mod elm327 {
    pub use obdlib_elm327::*;
}
