//! Asynchronous engine event types.
//!
//! Events are emitted by the protocol engine through a
//! `tokio::sync::broadcast` channel as replies are decoded and engine
//! state changes. Dashboards and data loggers subscribe to these events
//! rather than polling the engine.

use crate::types::{Reply, Value};

/// An event emitted by the protocol engine.
///
/// Subscribe via the engine's `subscribe()` method. Events are delivered on
/// a best-effort basis through a bounded broadcast channel; slow consumers
/// may miss events under heavy poll load.
#[derive(Debug, Clone)]
pub enum ObdEvent {
    /// The transport opened and the adapter setup sequence was queued.
    Connected,

    /// The engine disconnected (deliberately or after transport loss).
    Disconnected,

    /// A complete frame was decoded. Emitted for every reply, including
    /// status tokens and replies for unknown PIDs.
    Reply(Reply),

    /// A named parameter decoded to a value. Emitted in addition to
    /// [`ObdEvent::Reply`] for replies the registry could resolve.
    Pid {
        /// Registry name of the parameter (e.g. `"vss"`).
        name: String,
        /// The decoded physical value.
        value: Value,
    },

    /// Periodic snapshot of the last known value for every active poller,
    /// in poller insertion order. `None` means no value has been received
    /// since the poller was added (or since its last transient drop).
    Snapshot(Vec<(String, Option<Value>)>),

    /// ECU liveness changed.
    Ecu {
        /// `true` when the ECU is considered reachable.
        online: bool,
        /// The status text that triggered the flip.
        status: String,
    },

    /// A non-fatal error: queue overflow, framing overflow, transport
    /// write failure, or an unanswered command. The engine keeps running.
    Error(String),
}
