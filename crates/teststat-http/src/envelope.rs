//! Response envelope validation and decoding.
//!
//! A data call answers with `{"status_code": ..., "data": ..., "messages": [[kind, text], ...]}`.
//! The body is checked against `schema/envelope.schema.json` before it is
//! decoded, so a body that parses as JSON but has the wrong shape is an
//! `InvalidResponse` rather than a confusing discrepancy report.

use jsonschema::Validator;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use teststat_contracts::{
    error::{TestStatError, TestStatResult},
    execution::TransportOutcome,
    response::{ActualResponse, Message},
};

const ENVELOPE_SCHEMA: &str = include_str!("../schema/envelope.schema.json");

#[derive(Debug, Deserialize)]
struct Envelope {
    status_code: Option<u16>,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    messages: Vec<Message>,
}

/// Validates and decodes response bodies.
pub struct EnvelopeDecoder {
    validator: Validator,
}

impl EnvelopeDecoder {
    /// Compile the embedded envelope schema.
    pub fn new() -> TestStatResult<Self> {
        let schema: Value = serde_json::from_str(ENVELOPE_SCHEMA).map_err(|e| TestStatError::Transport {
            reason: format!("failed to parse envelope schema: {}", e),
        })?;
        let validator = jsonschema::validator_for(&schema).map_err(|e| TestStatError::Transport {
            reason: format!("failed to compile envelope schema: {}", e),
        })?;
        Ok(Self { validator })
    }

    /// Decode `body`, received with HTTP status `http_status`.
    ///
    /// The envelope's own `status_code` wins over the HTTP status when both
    /// are present.
    pub fn decode(&self, http_status: u16, body: &str) -> TransportOutcome {
        let value: Value = match serde_json::from_str(body) {
            Ok(value) => value,
            Err(e) => {
                warn!(http_status, error = %e, "response body is not JSON");
                return TransportOutcome::InvalidResponse(format!("body is not JSON: {}", e));
            }
        };

        let violations: Vec<String> = self
            .validator
            .iter_errors(&value)
            .map(|error| format!("{} at '{}'", error, error.instance_path))
            .collect();
        if !violations.is_empty() {
            warn!(http_status, violations = violations.len(), "response envelope rejected");
            return TransportOutcome::InvalidResponse(violations.join("; "));
        }

        let envelope: Envelope = match serde_json::from_value(value) {
            Ok(envelope) => envelope,
            Err(e) => return TransportOutcome::InvalidResponse(format!("malformed envelope: {}", e)),
        };

        let status_code = envelope.status_code.unwrap_or(http_status);
        debug!(http_status, status_code, messages = envelope.messages.len(), "response decoded");

        TransportOutcome::Response(ActualResponse {
            status_code,
            data: envelope.data,
            messages: envelope.messages,
        })
    }
}
