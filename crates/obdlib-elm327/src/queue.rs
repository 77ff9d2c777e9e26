//! Strict-FIFO command queue with one command in flight.
//!
//! The ELM327 is half-duplex: it accepts a command only when its `>`
//! prompt is showing, and answers exactly the command it was last given.
//! The queue enforces that discipline: commands wait in FIFO order and at
//! most one is outstanding at any time. Actual dispatch lives in the
//! engine loop (it needs the transport); the queue tracks the bookkeeping.

use std::collections::VecDeque;

use obdlib_core::error::{Error, Result};

/// Default bound on the number of queued commands.
pub const DEFAULT_CAPACITY: usize = 256;

/// One queued command awaiting dispatch.
///
/// The originating parameter name travels with the command so a reply (or
/// a transient drop) can be attributed without a side table.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCommand {
    /// Command text without terminator or reply-count digit (`"010D"`,
    /// `"ATZ"`).
    pub wire_text: String,
    /// Registry name of the parameter this command polls, if any.
    pub name: Option<String>,
    /// Bounded reply count appended on the wire; `0` means unbounded.
    pub expected_replies: u8,
}

impl PendingCommand {
    /// A raw command with no parameter attribution.
    pub fn raw(wire_text: &str) -> Self {
        PendingCommand {
            wire_text: wire_text.to_string(),
            name: None,
            expected_replies: 0,
        }
    }

    /// A bounded single-reply request for a named parameter.
    pub fn for_parameter(wire_text: &str, name: &str) -> Self {
        PendingCommand {
            wire_text: wire_text.to_string(),
            name: Some(name.to_string()),
            expected_replies: 1,
        }
    }
}

/// Bounded FIFO of pending commands plus in-flight tracking.
#[derive(Debug)]
pub struct CommandQueue {
    pending: VecDeque<PendingCommand>,
    capacity: usize,
    awaiting_reply: bool,
    in_flight: Option<PendingCommand>,
}

impl CommandQueue {
    /// Create a queue with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a queue with a custom capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        CommandQueue {
            pending: VecDeque::new(),
            capacity,
            awaiting_reply: false,
            in_flight: None,
        }
    }

    /// Append a command, failing with [`Error::QueueOverflow`] at capacity.
    pub fn enqueue(&mut self, cmd: PendingCommand) -> Result<()> {
        if self.pending.len() >= self.capacity {
            return Err(Error::QueueOverflow);
        }
        self.pending.push_back(cmd);
        Ok(())
    }

    /// Take the next command for dispatch, marking it in flight.
    ///
    /// Returns `None` while a command is outstanding or the queue is
    /// empty: one in flight, always.
    pub fn next_to_send(&mut self) -> Option<PendingCommand> {
        if self.awaiting_reply {
            return None;
        }
        let cmd = self.pending.pop_front()?;
        self.awaiting_reply = true;
        self.in_flight = Some(cmd.clone());
        Some(cmd)
    }

    /// Resolve the in-flight command, freeing the queue for the next
    /// dispatch. Returns the command that was outstanding, if any.
    pub fn resolve(&mut self) -> Option<PendingCommand> {
        self.awaiting_reply = false;
        self.in_flight.take()
    }

    /// Remove all queued (unsent) commands attributed to `name`.
    /// The in-flight command, if any, is left to resolve normally.
    pub fn prune(&mut self, name: &str) {
        self.pending.retain(|cmd| cmd.name.as_deref() != Some(name));
    }

    /// Drop every queued command. In-flight state is untouched.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// `true` while a dispatched command has not yet been resolved.
    pub fn awaiting_reply(&self) -> bool {
        self.awaiting_reply
    }

    /// The command currently outstanding, if any.
    pub fn in_flight(&self) -> Option<&PendingCommand> {
        self.in_flight.as_ref()
    }

    /// Number of queued (unsent) commands.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// `true` when no commands are queued.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_enqueues_dispatch_exactly_one() {
        let mut q = CommandQueue::new();
        q.enqueue(PendingCommand::for_parameter("010D", "vss")).unwrap();
        q.enqueue(PendingCommand::for_parameter("010C", "rpm")).unwrap();
        q.enqueue(PendingCommand::for_parameter("0105", "temp")).unwrap();

        let first = q.next_to_send().expect("first dispatch");
        assert_eq!(first.wire_text, "010D");

        // One in flight: nothing else dispatches until resolution.
        assert!(q.next_to_send().is_none());
        assert!(q.awaiting_reply());
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn resolve_frees_the_queue() {
        let mut q = CommandQueue::new();
        q.enqueue(PendingCommand::for_parameter("010D", "vss")).unwrap();
        q.enqueue(PendingCommand::for_parameter("010C", "rpm")).unwrap();

        q.next_to_send().unwrap();
        let resolved = q.resolve().expect("in-flight command returned");
        assert_eq!(resolved.name.as_deref(), Some("vss"));

        let second = q.next_to_send().expect("second dispatch after resolve");
        assert_eq!(second.wire_text, "010C");
    }

    #[test]
    fn fifo_order_preserved() {
        let mut q = CommandQueue::new();
        for text in ["ATZ", "ATE0", "010D"] {
            q.enqueue(PendingCommand::raw(text)).unwrap();
        }
        let mut sent = Vec::new();
        while let Some(cmd) = q.next_to_send() {
            sent.push(cmd.wire_text);
            q.resolve();
        }
        assert_eq!(sent, vec!["ATZ", "ATE0", "010D"]);
    }

    #[test]
    fn overflow_is_reported_not_fatal() {
        let mut q = CommandQueue::with_capacity(2);
        q.enqueue(PendingCommand::raw("ATZ")).unwrap();
        q.enqueue(PendingCommand::raw("ATE0")).unwrap();

        let result = q.enqueue(PendingCommand::raw("010D"));
        assert!(matches!(result, Err(Error::QueueOverflow)));

        // Queue still works.
        assert_eq!(q.len(), 2);
        assert!(q.next_to_send().is_some());
    }

    #[test]
    fn prune_removes_only_named_commands() {
        let mut q = CommandQueue::new();
        q.enqueue(PendingCommand::for_parameter("010D", "vss")).unwrap();
        q.enqueue(PendingCommand::for_parameter("010C", "rpm")).unwrap();
        q.enqueue(PendingCommand::for_parameter("010D", "vss")).unwrap();
        q.enqueue(PendingCommand::raw("ATZ")).unwrap();

        q.prune("vss");
        assert_eq!(q.len(), 2);
        assert_eq!(q.next_to_send().unwrap().wire_text, "010C");
    }

    #[test]
    fn prune_leaves_in_flight_untouched() {
        let mut q = CommandQueue::new();
        q.enqueue(PendingCommand::for_parameter("010D", "vss")).unwrap();
        q.next_to_send().unwrap();

        q.prune("vss");
        assert!(q.awaiting_reply());
        assert_eq!(q.in_flight().unwrap().name.as_deref(), Some("vss"));
    }

    #[test]
    fn clear_empties_pending_only() {
        let mut q = CommandQueue::new();
        q.enqueue(PendingCommand::raw("ATZ")).unwrap();
        q.next_to_send().unwrap();
        q.enqueue(PendingCommand::raw("ATE0")).unwrap();

        q.clear();
        assert!(q.is_empty());
        assert!(q.awaiting_reply());
    }

    #[test]
    fn resolve_without_in_flight_is_none() {
        let mut q = CommandQueue::new();
        assert!(q.resolve().is_none());
        assert!(!q.awaiting_reply());
    }
}
