//! Blocking HTTP transport for data call requests.

use std::time::Duration;

use reqwest::{blocking::Client, StatusCode, Url};
use tracing::{debug, warn};

use teststat_contracts::{
    case::TestInput,
    config::RunnerConfig,
    error::{TestStatError, TestStatResult},
    execution::TransportOutcome,
};
use teststat_core::traits::Transport;

use crate::envelope::EnvelopeDecoder;

/// Issues `GET {base}/data/{data_call}/data.json?{input}` requests.
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    host: String,
    decoder: EnvelopeDecoder,
}

impl HttpTransport {
    /// Build a transport for the host described by `config`.
    ///
    /// # Errors
    ///
    /// `ConfigError` for an invalid configuration, `Transport` when the
    /// client or base URL cannot be built.
    pub fn new(config: &RunnerConfig) -> TestStatResult<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TestStatError::Transport {
                reason: format!("failed to build HTTP client: {}", e),
            })?;

        let base_url = Url::parse(&config.base_url()).map_err(|e| TestStatError::Transport {
            reason: format!("invalid base URL '{}': {}", config.base_url(), e),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(TestStatError::Transport {
                reason: format!("'{}' cannot be used as a base URL", base_url),
            });
        }

        Ok(Self {
            client,
            base_url,
            host: config.host.clone(),
            decoder: EnvelopeDecoder::new()?,
        })
    }

    /// The request URL for one case. Parameter values are percent-encoded.
    pub fn url_for(&self, data_call: &str, input: &TestInput) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["data", data_call, "data.json"]);
        }
        if !input.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(input.params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        url
    }
}

impl Transport for HttpTransport {
    fn fetch(&self, data_call: &str, input: &TestInput) -> TransportOutcome {
        let url = self.url_for(data_call, input);
        debug!(data_call = %data_call, url = %url, "sending request");

        let response = match self.client.get(url).send() {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                warn!(data_call = %data_call, host = %self.host, "request timed out");
                return TransportOutcome::Timeout;
            }
            Err(e) => {
                warn!(data_call = %data_call, host = %self.host, error = %e, "request failed");
                return TransportOutcome::ConnectionError(e.to_string());
            }
        };

        let status = response.status();
        if status == StatusCode::BAD_GATEWAY {
            warn!(data_call = %data_call, host = %self.host, "bad gateway");
            return TransportOutcome::BadGateway;
        }

        match response.text() {
            Ok(body) => self.decoder.decode(status.as_u16(), &body),
            Err(e) if e.is_timeout() => TransportOutcome::Timeout,
            Err(e) => TransportOutcome::InvalidResponse(format!("failed to read body: {}", e)),
        }
    }

    fn host(&self) -> &str {
        &self.host
    }
}
