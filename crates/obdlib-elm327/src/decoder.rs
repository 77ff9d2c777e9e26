//! Reply decoder: raw frame text to typed [`Reply`] values.
//!
//! Every complete message line from the reassembler passes through
//! [`decode`]. Decoding is total: adapter status tokens short-circuit to
//! [`Reply::Status`], hex replies are classified by response mode, and
//! anything unparseable degrades to a `Status` carrying the raw text.
//! The decoder never returns an error; a garbled frame must not take the
//! engine down.

use obdlib_core::types::Reply;
use obdlib_pids::PidRegistry;

/// Status tokens the adapter emits verbatim.
///
/// `NO DATA` and `SEARCHING...` come from the OBD side (no ECU answered,
/// protocol search in progress); `UNABLE TO CONNECT`, `BUS BUSY` and
/// `CAN ERROR` indicate bus-level trouble; `OK` acknowledges `AT`
/// commands; `?` rejects an unrecognized command.
const STATUS_TOKENS: &[&str] = &[
    "NO DATA",
    "OK",
    "?",
    "UNABLE TO CONNECT",
    "SEARCHING...",
    "BUS BUSY",
    "CAN ERROR",
];

/// Identification banner prefix printed after a reset (`ATZ`).
const BANNER_PREFIX: &str = "ELM327";

/// Decode one complete message line into a [`Reply`].
///
/// Classification order:
///
/// 1. Known status tokens and the `ELM327` banner become [`Reply::Status`].
/// 2. The line is tokenized as hex byte pairs (whitespace ignored). A line
///    that is not clean hex degrades to `Status` with the raw text.
/// 3. Response mode `41` (current data) resolves the PID against the
///    registry; an unknown PID still yields a [`Reply::Parameter`] with
///    `name: None` rather than an error.
/// 4. Response mode `43` (stored DTCs) decodes through the trouble-code
///    descriptor.
/// 5. Any other leading byte is [`Reply::Unknown`].
pub fn decode(frame: &str, registry: &PidRegistry) -> Reply {
    let text = frame.trim();

    if STATUS_TOKENS.contains(&text) || text.starts_with(BANNER_PREFIX) {
        return Reply::Status {
            text: text.to_string(),
        };
    }

    let bytes = match parse_hex_pairs(text) {
        Some(bytes) if !bytes.is_empty() => bytes,
        _ => {
            // Not a hex reply; pass the raw text through as a status.
            return Reply::Status {
                text: text.to_string(),
            };
        }
    };

    let mode = format!("{:02X}", bytes[0]);
    match bytes[0] {
        0x41 => {
            let Some(&pid_byte) = bytes.get(1) else {
                return Reply::Unknown { mode };
            };
            let pid = format!("{pid_byte:02X}");
            match registry.by_mode_pid("01", &pid) {
                Some(descriptor) => Reply::Parameter {
                    mode,
                    pid,
                    name: Some(descriptor.name.to_string()),
                    value: Some((descriptor.decode)(&bytes[2..])),
                },
                None => Reply::Parameter {
                    mode,
                    pid,
                    name: None,
                    value: None,
                },
            }
        }
        0x43 => match registry.by_mode("03") {
            Some(descriptor) => Reply::Diagnostic {
                mode,
                value: (descriptor.decode)(&bytes[1..]),
            },
            None => Reply::Unknown { mode },
        },
        _ => Reply::Unknown { mode },
    }
}

/// Tokenize a line as hex byte pairs, ignoring whitespace.
///
/// Returns `None` if the line contains non-hex characters or an odd
/// number of hex digits.
fn parse_hex_pairs(text: &str) -> Option<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    // Line noise comes out of the lossy UTF-8 conversion as multi-byte
    // replacement characters; the two-byte slices below require ASCII.
    if compact.is_empty() || compact.len() % 2 != 0 || !compact.is_ascii() {
        return None;
    }
    let mut bytes = Vec::with_capacity(compact.len() / 2);
    for i in (0..compact.len()).step_by(2) {
        bytes.push(u8::from_str_radix(&compact[i..i + 2], 16).ok()?);
    }
    Some(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use obdlib_core::types::Value;

    fn registry() -> PidRegistry {
        PidRegistry::default()
    }

    // ---------------------------------------------------------------
    // Status tokens
    // ---------------------------------------------------------------

    #[test]
    fn decode_no_data() {
        let reply = decode("NO DATA", &registry());
        assert!(reply.is_status("NO DATA"));
    }

    #[test]
    fn decode_ok() {
        assert!(decode("OK", &registry()).is_status("OK"));
    }

    #[test]
    fn decode_question_mark() {
        assert!(decode("?", &registry()).is_status("?"));
    }

    #[test]
    fn decode_unable_to_connect() {
        assert!(decode("UNABLE TO CONNECT", &registry()).is_status("UNABLE TO CONNECT"));
    }

    #[test]
    fn decode_banner() {
        let reply = decode("ELM327 v1.5", &registry());
        assert!(reply.is_status("ELM327 v1.5"));
    }

    // ---------------------------------------------------------------
    // Mode 41 (current data)
    // ---------------------------------------------------------------

    #[test]
    fn decode_speed_reply() {
        match decode("41 0D 1E", &registry()) {
            Reply::Parameter {
                mode,
                pid,
                name,
                value,
            } => {
                assert_eq!(mode, "41");
                assert_eq!(pid, "0D");
                assert_eq!(name.as_deref(), Some("vss"));
                assert_eq!(value, Some(Value::Number(30.0)));
            }
            other => panic!("expected Parameter, got {other:?}"),
        }
    }

    #[test]
    fn decode_speed_reply_no_spaces() {
        // With ATS0 in effect the adapter omits inter-byte spaces.
        match decode("410D1E", &registry()) {
            Reply::Parameter { name, value, .. } => {
                assert_eq!(name.as_deref(), Some("vss"));
                assert_eq!(value, Some(Value::Number(30.0)));
            }
            other => panic!("expected Parameter, got {other:?}"),
        }
    }

    #[test]
    fn decode_rpm_reply() {
        match decode("41 0C 1A 2B", &registry()) {
            Reply::Parameter { name, value, .. } => {
                assert_eq!(name.as_deref(), Some("rpm"));
                match value {
                    Some(Value::Number(n)) => assert!((n - 1674.75).abs() < 0.01),
                    other => panic!("expected Number, got {other:?}"),
                }
            }
            other => panic!("expected Parameter, got {other:?}"),
        }
    }

    #[test]
    fn decode_unknown_pid_is_partial_not_error() {
        match decode("41 FE 12", &registry()) {
            Reply::Parameter {
                mode,
                pid,
                name,
                value,
            } => {
                assert_eq!(mode, "41");
                assert_eq!(pid, "FE");
                assert!(name.is_none());
                assert!(value.is_none());
            }
            other => panic!("expected Parameter, got {other:?}"),
        }
    }

    #[test]
    fn decode_bare_mode_41_is_unknown() {
        match decode("41", &registry()) {
            Reply::Unknown { mode } => assert_eq!(mode, "41"),
            other => panic!("expected Unknown, got {other:?}"),
        }
    }

    // ---------------------------------------------------------------
    // Mode 43 (stored DTCs)
    // ---------------------------------------------------------------

    #[test]
    fn decode_dtc_reply() {
        match decode("43 01 33 00 00 00 00", &registry()) {
            Reply::Diagnostic { mode, value } => {
                assert_eq!(mode, "43");
                assert_eq!(value, Value::TroubleCodes(vec!["P0133".to_string()]));
            }
            other => panic!("expected Diagnostic, got {other:?}"),
        }
    }

    #[test]
    fn decode_dtc_reply_empty() {
        match decode("43 00 00 00 00 00 00", &registry()) {
            Reply::Diagnostic { value, .. } => {
                assert_eq!(value, Value::TroubleCodes(vec![]));
            }
            other => panic!("expected Diagnostic, got {other:?}"),
        }
    }

    // ---------------------------------------------------------------
    // Unknown modes and garbage
    // ---------------------------------------------------------------

    #[test]
    fn decode_unknown_mode() {
        match decode("7F 01 12", &registry()) {
            Reply::Unknown { mode } => assert_eq!(mode, "7F"),
            other => panic!("expected Unknown, got {other:?}"),
        }
    }

    #[test]
    fn decode_non_hex_degrades_to_status() {
        let reply = decode("STOPPED", &registry());
        assert!(reply.is_status("STOPPED"));
    }

    #[test]
    fn decode_odd_digit_count_degrades_to_status() {
        let reply = decode("41 0D 1", &registry());
        assert!(reply.is_status("41 0D 1"));
    }

    #[test]
    fn decode_line_noise_degrades_to_status() {
        // A raw 0xFF on the serial line reaches the decoder as a
        // three-byte U+FFFD after the reassembler's lossy conversion.
        let noisy = String::from_utf8_lossy(&[0xFF, b'A']);
        let reply = decode(&noisy, &registry());
        assert!(matches!(reply, Reply::Status { .. }));
    }

    #[test]
    fn decode_survives_noise_through_reassembly() {
        let mut r = crate::protocol::FrameReassembler::new();
        let frames = r.feed(b"\xFF\xFE41 0D 1E\r>");
        for frame in &frames {
            let reply = decode(frame, &registry());
            assert!(matches!(reply, Reply::Status { .. } | Reply::Unknown { .. }));
        }
    }
}
