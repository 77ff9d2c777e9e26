//! Round-robin polling scheduler state.
//!
//! Pollers are parameter names the engine refreshes continuously. The
//! active set is kept in insertion order; each poll tick walks it in that
//! order, and the periodic snapshot reports last values in the same order.
//! Command dispatch and timer scheduling live in the engine loop; this
//! module owns the bookkeeping.

use std::collections::HashMap;
use std::time::Duration;

use obdlib_core::types::Value;

/// Per-command pacing used to derive the default poll interval.
///
/// The interval scales with the number of active pollers so each command
/// gets roughly this much bus time, keeping the one-in-flight queue from
/// growing without bound.
pub const PER_COMMAND_PACING: Duration = Duration::from_millis(50);

/// Active poller set and last-value store.
#[derive(Debug)]
pub struct PollerState {
    /// Active parameter names in insertion order.
    active: Vec<String>,
    /// Last decoded value per active name; `None` until a reply arrives
    /// (or after a transient drop reset).
    last_values: HashMap<String, Option<Value>>,
    /// Whether the poll timer is running.
    polling: bool,
    /// Caller-supplied interval overriding the derived default.
    interval_override: Option<Duration>,
}

impl PollerState {
    pub fn new() -> Self {
        PollerState {
            active: Vec::new(),
            last_values: HashMap::new(),
            polling: false,
            interval_override: None,
        }
    }

    /// Add a poller. Idempotent: returns `false` if already active,
    /// preserving the original insertion position.
    pub fn add(&mut self, name: &str) -> bool {
        if self.is_active(name) {
            return false;
        }
        self.active.push(name.to_string());
        self.last_values.insert(name.to_string(), None);
        true
    }

    /// Remove a poller and its last value. Returns `false` if it was not
    /// active.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.active.len();
        self.active.retain(|n| n != name);
        self.last_values.remove(name);
        self.active.len() != before
    }

    /// Remove every poller. Safe to call when none are active.
    pub fn clear(&mut self) {
        self.active.clear();
        self.last_values.clear();
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.active.iter().any(|n| n == name)
    }

    /// Active names in insertion order.
    pub fn names(&self) -> &[String] {
        &self.active
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Record a decoded value for an active poller. Ignored for names
    /// that are not active.
    pub fn record_value(&mut self, name: &str, value: Value) {
        if let Some(slot) = self.last_values.get_mut(name) {
            *slot = Some(value);
        }
    }

    /// Reset an active poller's last value after a transient drop, so the
    /// snapshot shows the data gap instead of a stale reading.
    pub fn reset_value(&mut self, name: &str) {
        if let Some(slot) = self.last_values.get_mut(name) {
            *slot = None;
        }
    }

    /// Last known values in insertion order.
    pub fn snapshot(&self) -> Vec<(String, Option<Value>)> {
        self.active
            .iter()
            .map(|name| (name.clone(), self.last_values.get(name).cloned().flatten()))
            .collect()
    }

    /// The poll interval: the caller's override if set, otherwise the
    /// active count times the per-command pacing (minimum one command).
    pub fn interval(&self) -> Duration {
        match self.interval_override {
            Some(interval) => interval,
            None => PER_COMMAND_PACING * self.active.len().max(1) as u32,
        }
    }

    pub fn set_interval(&mut self, interval: Option<Duration>) {
        self.interval_override = interval;
    }

    pub fn start(&mut self) {
        self.polling = true;
    }

    pub fn stop(&mut self) {
        self.polling = false;
    }

    pub fn is_polling(&self) -> bool {
        self.polling
    }
}

impl Default for PollerState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_preserves_insertion_order() {
        let mut p = PollerState::new();
        assert!(p.add("vss"));
        assert!(p.add("rpm"));
        assert!(p.add("temp"));
        assert_eq!(p.names(), &["vss", "rpm", "temp"]);
    }

    #[test]
    fn add_is_idempotent() {
        let mut p = PollerState::new();
        p.add("vss");
        p.add("rpm");
        assert!(!p.add("vss"));
        // Original position preserved.
        assert_eq!(p.names(), &["vss", "rpm"]);
    }

    #[test]
    fn remove_keeps_remaining_order() {
        let mut p = PollerState::new();
        p.add("vss");
        p.add("rpm");
        p.add("temp");
        assert!(p.remove("rpm"));
        assert_eq!(p.names(), &["vss", "temp"]);
        assert!(!p.remove("rpm"));
    }

    #[test]
    fn clear_twice_is_safe() {
        let mut p = PollerState::new();
        p.add("vss");
        p.clear();
        p.clear();
        assert!(p.is_empty());
    }

    #[test]
    fn snapshot_in_insertion_order() {
        let mut p = PollerState::new();
        p.add("vss");
        p.add("rpm");
        p.record_value("rpm", Value::Number(1500.0));

        let snap = p.snapshot();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0], ("vss".to_string(), None));
        assert_eq!(snap[1], ("rpm".to_string(), Some(Value::Number(1500.0))));
    }

    #[test]
    fn record_ignored_for_inactive_name() {
        let mut p = PollerState::new();
        p.add("vss");
        p.record_value("rpm", Value::Number(1500.0));
        assert_eq!(p.snapshot(), vec![("vss".to_string(), None)]);
    }

    #[test]
    fn reset_clears_stale_value() {
        let mut p = PollerState::new();
        p.add("vss");
        p.record_value("vss", Value::Number(30.0));
        p.reset_value("vss");
        assert_eq!(p.snapshot(), vec![("vss".to_string(), None)]);
    }

    #[test]
    fn remove_clears_last_value() {
        let mut p = PollerState::new();
        p.add("vss");
        p.record_value("vss", Value::Number(30.0));
        p.remove("vss");
        p.add("vss");
        // Re-added poller starts fresh.
        assert_eq!(p.snapshot(), vec![("vss".to_string(), None)]);
    }

    #[test]
    fn interval_scales_with_active_count() {
        let mut p = PollerState::new();
        assert_eq!(p.interval(), Duration::from_millis(50));
        p.add("vss");
        p.add("rpm");
        p.add("temp");
        assert_eq!(p.interval(), Duration::from_millis(150));
    }

    #[test]
    fn interval_override_wins() {
        let mut p = PollerState::new();
        p.add("vss");
        p.set_interval(Some(Duration::from_millis(500)));
        assert_eq!(p.interval(), Duration::from_millis(500));
        p.set_interval(None);
        assert_eq!(p.interval(), Duration::from_millis(50));
    }
}
