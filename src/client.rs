use anyhow::{Context, Result};
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderValue};
use serde_json::Value;
use std::error::Error as StdError;
use thiserror::Error;
use tracing::debug;

const USER_AGENT: &str = concat!("elastic-health/", env!("CARGO_PKG_VERSION"));

// Substrings that mark a TLS handshake or certificate failure in the error chain.
const TLS_MARKERS: &[&str] = &["certificate", "ssl", "tls", "handshake"];

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("TLS validation failed for {url}: {reason}")]
    Insecure { url: String, reason: String },
    #[error("could not reach {url}: {detail}")]
    Transport {
        url: String,
        detail: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("response from {url} is not valid JSON: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    /// True when the request failed certificate or TLS validation.
    pub fn is_insecure(&self) -> bool {
        matches!(self, FetchError::Insecure { .. })
    }
}

#[derive(Debug, Clone)]
pub struct NodesClient {
    http: Client,
}

impl NodesClient {
    pub fn new(verify_tls: bool) -> Result<Self> {
        let http = Client::builder()
            .user_agent(HeaderValue::from_static(USER_AGENT))
            .danger_accept_invalid_certs(!verify_tls)
            .build()
            .context("building HTTP client")?;

        Ok(Self { http })
    }

    /// Issues a single GET and parses the body as JSON.
    pub fn fetch(&self, url: &Url) -> Result<Value, FetchError> {
        debug!(%url, "querying nodes API");

        let response = self
            .http
            .get(url.clone())
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .send()
            .map_err(|err| classify(url, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let text = response.text().map_err(|err| classify(url, err))?;
        let json: Value = serde_json::from_str(&text).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })?;
        debug!(bytes = text.len(), "parsed nodes response");
        Ok(json)
    }
}

fn classify(url: &Url, err: reqwest::Error) -> FetchError {
    // The top-level message embeds the URL, so only the causes are inspected.
    if let Some(reason) = err.source().and_then(tls_reason) {
        return FetchError::Insecure {
            url: url.to_string(),
            reason,
        };
    }

    FetchError::Transport {
        url: url.to_string(),
        detail: root_cause(&err),
        source: err,
    }
}

/// Finds the first error in the chain that looks like a TLS failure.
fn tls_reason(err: &(dyn StdError + 'static)) -> Option<String> {
    let mut current = Some(err);
    while let Some(e) = current {
        let text = e.to_string();
        let lower = text.to_ascii_lowercase();
        if TLS_MARKERS.iter().any(|marker| lower.contains(marker)) {
            return Some(text);
        }
        current = e.source();
    }
    None
}

fn root_cause(err: &(dyn StdError + 'static)) -> String {
    let mut current = err;
    while let Some(next) = current.source() {
        current = next;
    }
    current.to_string()
}
