//! Raw-to-physical decode formulas.
//!
//! Each function takes the raw data bytes of one reply (already stripped of
//! the mode and PID bytes) and produces a typed [`Value`]. All formulas are
//! SAE J1979 appendix formulas; units are noted on the descriptors in
//! [`registry`](crate::registry).
//!
//! Functions are defensive about short input: a truncated reply decodes to
//! zero rather than panicking, because a flaky adapter must never take the
//! engine down.

use obdlib_core::Value;

fn byte(bytes: &[u8], i: usize) -> f64 {
    bytes.get(i).copied().unwrap_or(0) as f64
}

/// A (identity): speed km/h, manifold pressure kPa.
pub fn identity(bytes: &[u8]) -> Value {
    Value::Number(byte(bytes, 0))
}

/// A - 40: coolant and intake air temperature, degrees C.
pub fn temperature(bytes: &[u8]) -> Value {
    Value::Number(byte(bytes, 0) - 40.0)
}

/// A * 100 / 255: engine load and throttle position, percent.
pub fn percentage(bytes: &[u8]) -> Value {
    Value::Number(byte(bytes, 0) * 100.0 / 255.0)
}

/// (A - 128) * 100 / 128: fuel trim, percent.
pub fn fuel_trim(bytes: &[u8]) -> Value {
    Value::Number((byte(bytes, 0) - 128.0) * 100.0 / 128.0)
}

/// A * 3: fuel rail pressure, kPa.
pub fn fuel_pressure(bytes: &[u8]) -> Value {
    Value::Number(byte(bytes, 0) * 3.0)
}

/// A / 2 - 64: timing advance, degrees before TDC.
pub fn timing_advance(bytes: &[u8]) -> Value {
    Value::Number(byte(bytes, 0) / 2.0 - 64.0)
}

/// ((A*256)+B) / 4: engine RPM.
pub fn rpm(bytes: &[u8]) -> Value {
    Value::Number((byte(bytes, 0) * 256.0 + byte(bytes, 1)) / 4.0)
}

/// ((A*256)+B) / 100: mass air flow, g/s.
pub fn maf(bytes: &[u8]) -> Value {
    Value::Number((byte(bytes, 0) * 256.0 + byte(bytes, 1)) / 100.0)
}

/// (A*256)+B: run time since engine start, seconds.
pub fn word(bytes: &[u8]) -> Value {
    Value::Number(byte(bytes, 0) * 256.0 + byte(bytes, 1))
}

/// Mode 01 PID 01: MIL lamp state (bit 7 of A) and stored DTC count
/// (bits 0-6 of A). Bytes B-D carry readiness monitor flags, which this
/// registry does not expose.
pub fn mil_status(bytes: &[u8]) -> Value {
    let a = bytes.first().copied().unwrap_or(0);
    Value::MilStatus {
        mil_on: a & 0x80 != 0,
        dtc_count: a & 0x7F,
    }
}

/// Mode 03: up to three trouble codes per frame, two bytes each.
///
/// The top two bits of the first byte select the code letter (P/C/B/U),
/// the remaining 14 bits are four BCD digits. An all-zero pair is an empty
/// slot and is skipped.
pub fn trouble_codes(bytes: &[u8]) -> Value {
    let mut codes = Vec::new();
    for pair in bytes.chunks_exact(2) {
        let (a, b) = (pair[0], pair[1]);
        if a == 0 && b == 0 {
            continue;
        }
        let letter = match a >> 6 {
            0b00 => 'P',
            0b01 => 'C',
            0b10 => 'B',
            _ => 'U',
        };
        codes.push(format!(
            "{letter}{:01X}{:01X}{:02X}",
            (a >> 4) & 0x3,
            a & 0xF,
            b
        ));
    }
    Value::TroubleCodes(codes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number(v: Value) -> f64 {
        match v {
            Value::Number(n) => n,
            other => panic!("expected Number, got {other:?}"),
        }
    }

    #[test]
    fn rpm_formula() {
        // 1A 2B => ((0x1A * 256) + 0x2B) / 4 = 1674.75
        assert!((number(rpm(&[0x1A, 0x2B])) - 1674.75).abs() < 0.01);
    }

    #[test]
    fn speed_is_identity() {
        assert_eq!(number(identity(&[0x1E])), 30.0);
    }

    #[test]
    fn coolant_temperature_offset() {
        // 0x73 = 115 => 75 degrees C
        assert_eq!(number(temperature(&[0x73])), 75.0);
    }

    #[test]
    fn load_percentage() {
        assert!((number(percentage(&[0xFF])) - 100.0).abs() < 0.01);
        assert_eq!(number(percentage(&[0x00])), 0.0);
    }

    #[test]
    fn fuel_trim_centered_at_128() {
        assert_eq!(number(fuel_trim(&[0x80])), 0.0);
        assert!((number(fuel_trim(&[0x90])) - 12.5).abs() < 0.01);
    }

    #[test]
    fn timing_advance_offset() {
        assert_eq!(number(timing_advance(&[0x80])), 0.0);
    }

    #[test]
    fn maf_scaling() {
        assert!((number(maf(&[0x02, 0x58])) - 6.0).abs() < 0.01);
    }

    #[test]
    fn short_input_degrades_to_zero() {
        assert_eq!(number(rpm(&[])), 0.0);
        assert_eq!(number(identity(&[])), 0.0);
    }

    #[test]
    fn mil_status_decode() {
        match mil_status(&[0x82, 0x07, 0x65, 0x04]) {
            Value::MilStatus { mil_on, dtc_count } => {
                assert!(mil_on);
                assert_eq!(dtc_count, 2);
            }
            other => panic!("expected MilStatus, got {other:?}"),
        }
    }

    #[test]
    fn trouble_codes_decode() {
        // 0133 => P0133, 4300 => C0300, 0000 => empty slot
        match trouble_codes(&[0x01, 0x33, 0x43, 0x00, 0x00, 0x00]) {
            Value::TroubleCodes(codes) => {
                assert_eq!(codes, vec!["P0133".to_string(), "C0300".to_string()]);
            }
            other => panic!("expected TroubleCodes, got {other:?}"),
        }
    }

    #[test]
    fn trouble_codes_all_empty() {
        match trouble_codes(&[0, 0, 0, 0, 0, 0]) {
            Value::TroubleCodes(codes) => assert!(codes.is_empty()),
            other => panic!("expected TroubleCodes, got {other:?}"),
        }
    }

    #[test]
    fn trouble_codes_letter_classes() {
        // 8133 => B, C133 => U
        match trouble_codes(&[0x81, 0x33, 0xC1, 0x33]) {
            Value::TroubleCodes(codes) => {
                assert_eq!(codes, vec!["B0133".to_string(), "U0133".to_string()]);
            }
            other => panic!("expected TroubleCodes, got {other:?}"),
        }
    }
}
