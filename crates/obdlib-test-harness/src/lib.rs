//! obdlib-test-harness: Mock transports for testing obdlib without hardware.
//!
//! Provides [`MockTransport`], an implementation of
//! [`Transport`](obdlib_core::Transport) driven by pre-loaded
//! request/response expectations. Engine-level tests use it to verify
//! command encoding, prompt framing, and reply handling deterministically.

mod mock_transport;

pub use mock_transport::MockTransport;
