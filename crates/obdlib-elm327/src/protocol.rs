//! ELM327 text-protocol framing: command encoding and prompt-delimited
//! frame reassembly.
//!
//! The ELM327 wire protocol is line-oriented ASCII over a serial link.
//! Commands are sent as text terminated with `\r`; the adapter responds
//! with one or more text lines and then prints a `>` prompt when it is
//! ready for the next command.
//!
//! # Command format
//!
//! ```text
//! <text>[<count>]\r
//! ```
//!
//! - `text`: an `AT` adapter command (`ATZ`, `ATE0`) or a hex OBD request
//!   (`010D` = mode 01, PID 0D).
//! - `count`: optional single digit bounding the number of ECU replies.
//!   Appending it lets the adapter return as soon as that many replies
//!   arrive instead of waiting out its internal timeout, which roughly
//!   doubles the achievable poll rate.
//! - Terminator: `\r` (0x0D).
//!
//! # Response format
//!
//! Responses arrive as arbitrary read chunks with no alignment to message
//! boundaries. The only reliable delimiter is the `>` prompt: everything
//! before it belongs to completed replies, anything after it is the start
//! of the next exchange. Within one prompt-delimited super-frame, replies
//! are split on `\r`/`\n` into individual message lines.

use bytes::{BufMut, BytesMut};

use obdlib_core::error::Error;

/// Prompt byte printed by the adapter when it is ready for a command.
pub const PROMPT: u8 = b'>';

/// Command terminator byte.
pub const COMMAND_TERMINATOR: u8 = b'\r';

/// Default bound on carried-over bytes between feeds.
pub const DEFAULT_CARRY_LIMIT: usize = 1024;

/// Encode a command into raw bytes ready for transmission.
///
/// Appends the bounded-reply count digit when `expected_replies` is
/// non-zero, then the `\r` terminator.
///
/// # Example
///
/// ```
/// use obdlib_elm327::protocol::encode_command;
///
/// assert_eq!(encode_command("ATZ", 0), b"ATZ\r");
/// assert_eq!(encode_command("010D", 1), b"010D1\r");
/// ```
pub fn encode_command(wire_text: &str, expected_replies: u8) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(wire_text.len() + 2);
    buf.put_slice(wire_text.as_bytes());
    if expected_replies > 0 {
        buf.put_slice(expected_replies.to_string().as_bytes());
    }
    buf.put_u8(COMMAND_TERMINATOR);
    buf.to_vec()
}

/// Incremental reassembler for prompt-delimited response frames.
///
/// Feed it raw read chunks in arrival order; it returns the complete
/// message lines found so far and carries the unterminated tail over to
/// the next feed. Chunk boundaries are invisible to the output: splitting
/// the same byte stream differently yields the same frames.
#[derive(Debug)]
pub struct FrameReassembler {
    carry: String,
    carry_limit: usize,
    overflow: Option<usize>,
}

impl FrameReassembler {
    /// Create a reassembler with the default carry-over bound.
    pub fn new() -> Self {
        Self::with_carry_limit(DEFAULT_CARRY_LIMIT)
    }

    /// Create a reassembler with a custom carry-over bound.
    pub fn with_carry_limit(carry_limit: usize) -> Self {
        FrameReassembler {
            carry: String::new(),
            carry_limit,
            overflow: None,
        }
    }

    /// Feed one read chunk, returning all message lines completed by it.
    ///
    /// Accumulated text is split on the `>` prompt; every prompt-delimited
    /// super-frame is then split on `\r`/`\n` with empty lines dropped.
    /// The tail after the last prompt is retained for the next feed.
    ///
    /// If the tail grows past the bound without a prompt, it is discarded
    /// and the overflow is recorded for [`take_overflow`](Self::take_overflow);
    /// frames completed by the same chunk are still returned, and
    /// reassembly resumes cleanly on the next feed.
    pub fn feed(&mut self, data: &[u8]) -> Vec<String> {
        self.carry.push_str(&String::from_utf8_lossy(data));

        let mut frames = Vec::new();
        while let Some(pos) = self.carry.find(PROMPT as char) {
            let super_frame: String = self.carry.drain(..=pos).collect();
            // Drop the trailing prompt, then split into message lines.
            for line in super_frame[..super_frame.len() - 1].split(['\r', '\n']) {
                let line = line.trim();
                if !line.is_empty() {
                    frames.push(line.to_string());
                }
            }
        }

        if self.carry.len() > self.carry_limit {
            self.overflow = Some(self.carry.len());
            self.carry.clear();
        }

        frames
    }

    /// The carry-over overflow recorded by the last [`feed`](Self::feed),
    /// as an [`Error::FramingOverflow`]. Taking it clears it.
    pub fn take_overflow(&mut self) -> Option<Error> {
        self.overflow
            .take()
            .map(|buffered| Error::FramingOverflow { buffered })
    }

    /// Number of bytes currently carried over awaiting a prompt.
    pub fn carry_len(&self) -> usize {
        self.carry.len()
    }
}

impl Default for FrameReassembler {
    fn default() -> Self {
        Self::new()
    }
}
