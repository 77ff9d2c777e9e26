//! The parameter descriptor table and its lookups.

use obdlib_core::Value;

use crate::decode;

/// Descriptor for one OBD-II parameter.
///
/// Descriptors are immutable and static; the engine only ever reads them.
#[derive(Clone, Copy)]
pub struct PidDescriptor {
    /// Short registry name used throughout the API (e.g. `"vss"`).
    pub name: &'static str,
    /// Human-readable description.
    pub description: &'static str,
    /// Request mode as a hex byte pair (`"01"`, `"03"`, `"04"`).
    pub mode: &'static str,
    /// Parameter id as a hex byte pair, absent for modes that take none.
    pub pid: Option<&'static str>,
    /// Number of data bytes in the reply (after mode and PID).
    pub bytes: usize,
    /// Unit of the decoded value, empty when not applicable.
    pub unit: &'static str,
    /// Raw-to-physical conversion.
    pub decode: fn(&[u8]) -> Value,
}

impl PidDescriptor {
    /// The wire command that requests this parameter: mode plus PID
    /// concatenated (`"010D"`), or the bare mode for PID-less modes
    /// (`"03"`).
    pub fn wire_command(&self) -> String {
        match self.pid {
            Some(pid) => format!("{}{}", self.mode, pid),
            None => self.mode.to_string(),
        }
    }
}

impl std::fmt::Debug for PidDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PidDescriptor")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .field("pid", &self.pid)
            .field("bytes", &self.bytes)
            .field("unit", &self.unit)
            .finish()
    }
}

/// The standard descriptor table: commonly polled mode-01 parameters plus
/// the diagnostic modes. Names follow the conventional short forms used by
/// ELM327 tooling.
pub fn standard_pids() -> &'static [PidDescriptor] {
    static TABLE: &[PidDescriptor] = &[
        PidDescriptor {
            name: "dtc_cnt",
            description: "MIL status and DTC count",
            mode: "01",
            pid: Some("01"),
            bytes: 4,
            unit: "",
            decode: decode::mil_status,
        },
        PidDescriptor {
            name: "load_pct",
            description: "Calculated engine load",
            mode: "01",
            pid: Some("04"),
            bytes: 1,
            unit: "%",
            decode: decode::percentage,
        },
        PidDescriptor {
            name: "temp",
            description: "Engine coolant temperature",
            mode: "01",
            pid: Some("05"),
            bytes: 1,
            unit: "degC",
            decode: decode::temperature,
        },
        PidDescriptor {
            name: "shrtft1",
            description: "Short term fuel trim, bank 1",
            mode: "01",
            pid: Some("06"),
            bytes: 1,
            unit: "%",
            decode: decode::fuel_trim,
        },
        PidDescriptor {
            name: "longft1",
            description: "Long term fuel trim, bank 1",
            mode: "01",
            pid: Some("07"),
            bytes: 1,
            unit: "%",
            decode: decode::fuel_trim,
        },
        PidDescriptor {
            name: "frp",
            description: "Fuel rail pressure",
            mode: "01",
            pid: Some("0A"),
            bytes: 1,
            unit: "kPa",
            decode: decode::fuel_pressure,
        },
        PidDescriptor {
            name: "map",
            description: "Intake manifold absolute pressure",
            mode: "01",
            pid: Some("0B"),
            bytes: 1,
            unit: "kPa",
            decode: decode::identity,
        },
        PidDescriptor {
            name: "rpm",
            description: "Engine RPM",
            mode: "01",
            pid: Some("0C"),
            bytes: 2,
            unit: "rev/min",
            decode: decode::rpm,
        },
        PidDescriptor {
            name: "vss",
            description: "Vehicle speed",
            mode: "01",
            pid: Some("0D"),
            bytes: 1,
            unit: "km/h",
            decode: decode::identity,
        },
        PidDescriptor {
            name: "spark_adv",
            description: "Timing advance, cylinder 1",
            mode: "01",
            pid: Some("0E"),
            bytes: 1,
            unit: "deg",
            decode: decode::timing_advance,
        },
        PidDescriptor {
            name: "iat",
            description: "Intake air temperature",
            mode: "01",
            pid: Some("0F"),
            bytes: 1,
            unit: "degC",
            decode: decode::temperature,
        },
        PidDescriptor {
            name: "maf",
            description: "Mass air flow rate",
            mode: "01",
            pid: Some("10"),
            bytes: 2,
            unit: "g/s",
            decode: decode::maf,
        },
        PidDescriptor {
            name: "throttlepos",
            description: "Absolute throttle position",
            mode: "01",
            pid: Some("11"),
            bytes: 1,
            unit: "%",
            decode: decode::percentage,
        },
        PidDescriptor {
            name: "runtm",
            description: "Run time since engine start",
            mode: "01",
            pid: Some("1F"),
            bytes: 2,
            unit: "s",
            decode: decode::word,
        },
        PidDescriptor {
            name: "requestdtc",
            description: "Stored diagnostic trouble codes",
            mode: "03",
            pid: None,
            bytes: 6,
            unit: "",
            decode: decode::trouble_codes,
        },
        PidDescriptor {
            name: "cleardtc",
            description: "Clear trouble codes and MIL",
            mode: "04",
            pid: None,
            bytes: 0,
            unit: "",
            decode: decode::identity,
        },
    ];
    TABLE
}

/// Read-only lookup over a descriptor table.
///
/// The default registry wraps [`standard_pids`]; callers with vendor
/// extensions can construct one over their own static table.
#[derive(Debug, Clone)]
pub struct PidRegistry {
    table: &'static [PidDescriptor],
}

impl PidRegistry {
    /// Build a registry over a caller-provided descriptor table.
    pub fn new(table: &'static [PidDescriptor]) -> Self {
        PidRegistry { table }
    }

    /// Look up a descriptor by registry name.
    pub fn by_name(&self, name: &str) -> Option<&PidDescriptor> {
        self.table.iter().find(|d| d.name == name)
    }

    /// Look up a descriptor by request mode and PID byte pair.
    ///
    /// `mode` is the *request* mode (`"01"`), not the response mode
    /// (`"41"`); the decoder does that translation.
    pub fn by_mode_pid(&self, mode: &str, pid: &str) -> Option<&PidDescriptor> {
        self.table
            .iter()
            .find(|d| d.mode == mode && d.pid == Some(pid))
    }

    /// Look up the descriptor for a PID-less mode (`"03"`, `"04"`).
    pub fn by_mode(&self, mode: &str) -> Option<&PidDescriptor> {
        self.table
            .iter()
            .find(|d| d.mode == mode && d.pid.is_none())
    }

    /// The wire command string for a named parameter, if known.
    pub fn command_for(&self, name: &str) -> Option<String> {
        self.by_name(name).map(|d| d.wire_command())
    }

    /// Reverse lookup: the registry name for a wire command.
    ///
    /// Tolerates a single trailing reply-count digit (`"010D1"` resolves
    /// the same as `"010D"`), since bounded poll commands carry one.
    pub fn name_for_command(&self, wire_text: &str) -> Option<&'static str> {
        let exact = self
            .table
            .iter()
            .find(|d| d.wire_command() == wire_text)
            .map(|d| d.name);
        if exact.is_some() {
            return exact;
        }
        let trimmed = wire_text.strip_suffix(|c: char| c.is_ascii_digit())?;
        self.table
            .iter()
            .find(|d| d.wire_command() == trimmed)
            .map(|d| d.name)
    }

    /// Iterate over all descriptors in table order.
    pub fn iter(&self) -> impl Iterator<Item = &PidDescriptor> {
        self.table.iter()
    }
}

impl Default for PidRegistry {
    fn default() -> Self {
        PidRegistry::new(standard_pids())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use obdlib_core::Value;

    #[test]
    fn lookup_by_name() {
        let reg = PidRegistry::default();
        let d = reg.by_name("vss").expect("vss registered");
        assert_eq!(d.mode, "01");
        assert_eq!(d.pid, Some("0D"));
        assert_eq!(d.bytes, 1);
    }

    #[test]
    fn lookup_by_name_miss() {
        let reg = PidRegistry::default();
        assert!(reg.by_name("flux_capacitor").is_none());
    }

    #[test]
    fn lookup_by_mode_pid() {
        let reg = PidRegistry::default();
        let d = reg.by_mode_pid("01", "0C").expect("rpm registered");
        assert_eq!(d.name, "rpm");
    }

    #[test]
    fn lookup_by_mode() {
        let reg = PidRegistry::default();
        let d = reg.by_mode("03").expect("mode 03 registered");
        assert_eq!(d.name, "requestdtc");
        assert_eq!(d.bytes, 6);
    }

    #[test]
    fn wire_command_with_and_without_pid() {
        let reg = PidRegistry::default();
        assert_eq!(reg.command_for("vss").as_deref(), Some("010D"));
        assert_eq!(reg.command_for("requestdtc").as_deref(), Some("03"));
        assert_eq!(reg.command_for("nope"), None);
    }

    #[test]
    fn reverse_lookup() {
        let reg = PidRegistry::default();
        assert_eq!(reg.name_for_command("010D"), Some("vss"));
        assert_eq!(reg.name_for_command("03"), Some("requestdtc"));
        assert_eq!(reg.name_for_command("FFFF"), None);
    }

    #[test]
    fn reverse_lookup_tolerates_reply_count() {
        let reg = PidRegistry::default();
        assert_eq!(reg.name_for_command("010D1"), Some("vss"));
        assert_eq!(reg.name_for_command("010C1"), Some("rpm"));
    }

    #[test]
    fn descriptor_decodes_speed() {
        let reg = PidRegistry::default();
        let d = reg.by_name("vss").unwrap();
        assert_eq!((d.decode)(&[0x1E]), Value::Number(30.0));
    }

    #[test]
    fn byte_counts_are_protocol_legal() {
        for d in PidRegistry::default().iter() {
            assert!(
                matches!(d.bytes, 0 | 1 | 2 | 4 | 6 | 8),
                "{} has byte count {}",
                d.name,
                d.bytes
            );
        }
    }
}
