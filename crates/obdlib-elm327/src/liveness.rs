//! ECU liveness tracking.
//!
//! The adapter stays responsive even when the vehicle side is dead
//! (ignition off, wrong protocol, bus fault), so adapter-level status
//! tokens are the only signal for ECU reachability. This module tracks a
//! two-state online/offline flag and classifies which statuses warrant a
//! poll retry.

/// Status tokens after which a polled command should be retried.
///
/// All of these mean "no usable answer this time" rather than "the
/// request was wrong": the ECU may answer on the next attempt.
const RETRY_STATUSES: &[&str] = &[
    "SEARCHING...",
    "UNABLE TO CONNECT",
    "BUS BUSY",
    "CAN ERROR",
    "NO DATA",
];

/// `true` if a polled command should be re-enqueued after this status.
pub fn is_retry_status(text: &str) -> bool {
    RETRY_STATUSES.contains(&text)
}

/// Two-state ECU reachability flag.
///
/// Starts online (optimistic: most sessions begin with the engine
/// running). Flips offline only on `UNABLE TO CONNECT`; flips back online
/// on any successfully decoded named parameter reply. Flips are
/// observable via [`ObdEvent::Ecu`](obdlib_core::ObdEvent::Ecu) and never
/// fatal.
#[derive(Debug)]
pub struct LivenessState {
    online: bool,
}

impl LivenessState {
    pub fn new() -> Self {
        LivenessState { online: true }
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    /// Observe a status token. Returns `Some(false)` when this flips the
    /// ECU offline, `None` when the state is unchanged.
    pub fn observe_status(&mut self, text: &str) -> Option<bool> {
        if text == "UNABLE TO CONNECT" && self.online {
            self.online = false;
            return Some(false);
        }
        None
    }

    /// Observe a successfully decoded named parameter reply. Returns
    /// `Some(true)` when this flips the ECU back online, `None` when the
    /// state is unchanged.
    pub fn observe_named_reply(&mut self) -> Option<bool> {
        if !self.online {
            self.online = true;
            return Some(true);
        }
        None
    }
}

impl Default for LivenessState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_online() {
        assert!(LivenessState::new().is_online());
    }

    #[test]
    fn unable_to_connect_flips_offline_once() {
        let mut l = LivenessState::new();
        assert_eq!(l.observe_status("UNABLE TO CONNECT"), Some(false));
        assert!(!l.is_online());
        // Already offline: no second flip.
        assert_eq!(l.observe_status("UNABLE TO CONNECT"), None);
    }

    #[test]
    fn other_statuses_do_not_flip() {
        let mut l = LivenessState::new();
        assert_eq!(l.observe_status("NO DATA"), None);
        assert_eq!(l.observe_status("SEARCHING..."), None);
        assert_eq!(l.observe_status("BUS BUSY"), None);
        assert!(l.is_online());
    }

    #[test]
    fn named_reply_flips_back_online() {
        let mut l = LivenessState::new();
        l.observe_status("UNABLE TO CONNECT");
        assert_eq!(l.observe_named_reply(), Some(true));
        assert!(l.is_online());
        // Already online: no flip.
        assert_eq!(l.observe_named_reply(), None);
    }

    #[test]
    fn retry_status_classification() {
        for s in ["SEARCHING...", "UNABLE TO CONNECT", "BUS BUSY", "CAN ERROR", "NO DATA"] {
            assert!(is_retry_status(s), "{s} should be a retry status");
        }
        assert!(!is_retry_status("OK"));
        assert!(!is_retry_status("?"));
        assert!(!is_retry_status("ELM327 v1.5"));
    }
}
