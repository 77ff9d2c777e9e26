//! Error types for obdlib.
//!
//! All fallible operations across the library return [`Result<T>`], which
//! uses [`Error`] as the error type. Transport-layer, protocol-layer, and
//! engine-layer errors are all captured here.

/// The error type for all obdlib operations.
///
/// Variants cover the full range of failure modes encountered when talking
/// to an ELM327 adapter: physical transport failures, protocol decode
/// errors, timeouts, and queue/buffer limits. None of these are fatal to
/// the engine; they surface through results and the event stream while the
/// engine keeps running.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level error (serial port, Bluetooth RFCOMM socket).
    #[error("transport error: {0}")]
    Transport(String),

    /// A protocol-level error (malformed frame, unexpected adapter reply).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The pending command queue is at capacity; the command was dropped.
    #[error("command queue full, command dropped")]
    QueueOverflow,

    /// The receive buffer grew past its bound without a prompt terminator.
    ///
    /// Indicates a wedged or misconfigured adapter (e.g. linefeeds enabled
    /// but prompt suppressed). The buffer is reset and reassembly resumes.
    #[error("framing buffer overflow ({buffered} bytes without a prompt)")]
    FramingOverflow {
        /// Number of bytes that had accumulated when the bound was hit.
        buffered: usize,
    },

    /// A parameter name or PID has no descriptor in the registry.
    #[error("unknown parameter: {0}")]
    UnknownParameter(String),

    /// Timed out waiting for a reply from the adapter.
    ///
    /// This typically indicates the ignition is off, the adapter is
    /// unpowered, or the baud rate is wrong.
    #[error("timeout waiting for reply")]
    Timeout,

    /// No connection to the adapter has been established.
    #[error("not connected")]
    NotConnected,

    /// The connection to the adapter was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_transport() {
        let e = Error::Transport("port busy".into());
        assert_eq!(e.to_string(), "transport error: port busy");
    }

    #[test]
    fn error_display_queue_overflow() {
        let e = Error::QueueOverflow;
        assert_eq!(e.to_string(), "command queue full, command dropped");
    }

    #[test]
    fn error_display_framing_overflow() {
        let e = Error::FramingOverflow { buffered: 2048 };
        assert_eq!(
            e.to_string(),
            "framing buffer overflow (2048 bytes without a prompt)"
        );
    }

    #[test]
    fn error_display_unknown_parameter() {
        let e = Error::UnknownParameter("warp_core_temp".into());
        assert_eq!(e.to_string(), "unknown parameter: warp_core_temp");
    }

    #[test]
    fn error_display_timeout() {
        assert_eq!(Error::Timeout.to_string(), "timeout waiting for reply");
    }

    #[test]
    fn error_display_not_connected() {
        assert_eq!(Error::NotConnected.to_string(), "not connected");
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broken");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
        assert!(e.to_string().contains("pipe broken"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn error_implements_std_error() {
        fn assert_std_error<T: std::error::Error>() {}
        assert_std_error::<Error>();
    }
}
