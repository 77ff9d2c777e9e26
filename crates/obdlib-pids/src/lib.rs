//! obdlib-pids: SAE J1979 parameter descriptors for obdlib.
//!
//! This crate is the Parameter Registry: a read-only table mapping a
//! human-readable parameter name (`"vss"`, `"rpm"`, `"temp"`) to its OBD-II
//! mode, PID, reply byte count, and raw-to-physical decode formula. The
//! protocol engine consults it in both directions: name to wire command
//! when a request is issued, and mode+PID to descriptor when a reply is
//! decoded.
//!
//! The table covers the commonly polled mode-01 parameters plus the
//! diagnostic modes 03 (read stored trouble codes) and 04 (clear trouble
//! codes). Formulas are the standard J1979 ones.

mod decode;
mod registry;

pub use registry::{PidDescriptor, PidRegistry, standard_pids};
