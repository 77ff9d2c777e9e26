//! Core types used throughout obdlib.
//!
//! These types form the decoded side of the ELM327 protocol: the tagged
//! [`Reply`] produced for every complete frame, and the physical [`Value`]
//! produced by a PID descriptor's decode formula.

use std::fmt;

/// A decoded physical value for one parameter.
///
/// Most mode-01 parameters decode to a scalar ([`Value::Number`]); the
/// diagnostic modes produce structured values instead.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A scalar reading in the descriptor's unit (km/h, rpm, degrees C...).
    Number(f64),

    /// Malfunction indicator lamp status and stored trouble-code count
    /// (mode 01 PID 01).
    MilStatus {
        /// `true` if the MIL ("check engine" lamp) is commanded on.
        mil_on: bool,
        /// Number of confirmed emission-related trouble codes.
        dtc_count: u8,
    },

    /// Decoded diagnostic trouble codes (mode 03), e.g. `["P0133"]`.
    /// Empty slots in the reply frame are omitted.
    TroubleCodes(Vec<String>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::MilStatus { mil_on, dtc_count } => {
                write!(f, "MIL {} ({} DTCs)", if *mil_on { "on" } else { "off" }, dtc_count)
            }
            Value::TroubleCodes(codes) => {
                if codes.is_empty() {
                    write!(f, "no stored codes")
                } else {
                    write!(f, "{}", codes.join(", "))
                }
            }
        }
    }
}

/// One decoded protocol reply, produced per complete frame.
///
/// Replies are transient: the engine consumes them for liveness tracking
/// and poller bookkeeping, then forwards them to subscribers via
/// [`ObdEvent::Reply`](crate::events::ObdEvent::Reply).
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// A status token from the adapter or ECU, passed through verbatim:
    /// `"OK"`, `"NO DATA"`, `"SEARCHING..."`, `"UNABLE TO CONNECT"`,
    /// `"?"`, or an `ELM327 vX.X` identification banner.
    Status {
        /// The trimmed status text.
        text: String,
    },

    /// A current-data reply (response mode `41`).
    ///
    /// `name` and `value` are present only when the registry knows the PID;
    /// an unknown PID still yields a `Parameter` reply carrying the raw
    /// mode and pid -- never an error.
    Parameter {
        /// Response mode byte as a hex pair (`"41"`).
        mode: String,
        /// Parameter id byte as a hex pair (e.g. `"0D"`).
        pid: String,
        /// Registry name for the PID, if known (e.g. `"vss"`).
        name: Option<String>,
        /// Decoded physical value, if the PID was known.
        value: Option<Value>,
    },

    /// A diagnostic-trouble-code reply (response mode `43`).
    Diagnostic {
        /// Response mode byte as a hex pair (`"43"`).
        mode: String,
        /// The decoded trouble codes.
        value: Value,
    },

    /// A reply with an unrecognized response mode. Carried through so
    /// subscribers can observe it; not an error.
    Unknown {
        /// The unrecognized leading byte as a hex pair.
        mode: String,
    },
}

impl Reply {
    /// Registry name carried by this reply, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            Reply::Parameter { name, .. } => name.as_deref(),
            _ => None,
        }
    }

    /// `true` if this is a status reply with exactly the given text.
    pub fn is_status(&self, token: &str) -> bool {
        matches!(self, Reply::Status { text } if text == token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_display_number() {
        assert_eq!(Value::Number(30.0).to_string(), "30");
    }

    #[test]
    fn value_display_mil_status() {
        let v = Value::MilStatus {
            mil_on: true,
            dtc_count: 2,
        };
        assert_eq!(v.to_string(), "MIL on (2 DTCs)");
    }

    #[test]
    fn value_display_trouble_codes() {
        let v = Value::TroubleCodes(vec!["P0133".into(), "C0300".into()]);
        assert_eq!(v.to_string(), "P0133, C0300");
        assert_eq!(Value::TroubleCodes(vec![]).to_string(), "no stored codes");
    }

    #[test]
    fn reply_name_accessor() {
        let r = Reply::Parameter {
            mode: "41".into(),
            pid: "0D".into(),
            name: Some("vss".into()),
            value: Some(Value::Number(30.0)),
        };
        assert_eq!(r.name(), Some("vss"));
        assert_eq!(Reply::Status { text: "OK".into() }.name(), None);
    }

    #[test]
    fn reply_is_status() {
        let r = Reply::Status {
            text: "NO DATA".into(),
        };
        assert!(r.is_status("NO DATA"));
        assert!(!r.is_status("OK"));
    }
}
