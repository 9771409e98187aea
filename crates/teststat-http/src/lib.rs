//! # teststat-http
//!
//! The network side of TESTstat.
//!
//! - [`transport::HttpTransport`] implements [`teststat_core::traits::Transport`]
//!   with a blocking `reqwest` client. Every request carries the configured
//!   timeout; failures come back as `TransportOutcome` sentinels.
//! - [`envelope::EnvelopeDecoder`] validates a response body against the
//!   embedded envelope JSON Schema and decodes it into an `ActualResponse`.

pub mod envelope;
pub mod transport;

pub use envelope::EnvelopeDecoder;
pub use transport::HttpTransport;
