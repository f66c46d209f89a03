//! One end-to-end request attempt against a payment-gated endpoint.
//!
//! The executor builds the HTTP request from a payment option's input
//! schema plus the collected user values, sends it through the
//! payment-capable fetch, and converts whatever happens into a
//! [`RequestOutcome`]. No failure escapes this boundary as an error
//! value: callers only ever observe outcomes.
//!
//! Failure classification is deliberately layered. Mixed-content
//! blocking is detected by comparing transport schemes before looking
//! at any error message, because a blocked insecure request does not
//! always carry a distinguishing message. Cross-origin rejection has
//! no structured error code in any fetch primitive, so it is matched
//! heuristically against known phrasings, isolated in
//! [`looks_cross_origin`] to keep the precedence rules testable.

use async_trait::async_trait;
use http::HeaderMap;
use http::header::CONTENT_TYPE;
use reqwest_middleware as rqm;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use url::Url;
use x402_probe_client::X_PAYMENT_RESPONSE;
use x402_probe_types::{PaymentOption, SettlementInfo};

/// The request handed to the payment-capable fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub url: Url,
    pub method: String,
    /// Header name/value pairs, already filtered to declared fields.
    pub headers: Vec<(String, String)>,
    /// JSON body, present only for non-GET methods with body fields.
    pub body: Option<String>,
}

/// The response produced by the payment-capable fetch.
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

/// A failed fetch: the raw message plus a coarse kind tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchFailure {
    pub kind: String,
    pub message: String,
}

/// Payment-capable fetch collaborator.
///
/// The production implementation is a reqwest client wrapped with the
/// 402-settling middleware; tests substitute recording stubs.
#[async_trait]
pub trait PaidFetch: Send + Sync {
    async fn fetch(&self, request: ProbeRequest) -> Result<ProbeResponse, FetchFailure>;
}

#[async_trait]
impl PaidFetch for rqm::ClientWithMiddleware {
    async fn fetch(&self, request: ProbeRequest) -> Result<ProbeResponse, FetchFailure> {
        let method =
            reqwest::Method::from_bytes(request.method.as_bytes()).map_err(|_| FetchFailure {
                kind: "request".to_string(),
                message: format!("Invalid HTTP method {:?}", request.method),
            })?;
        let mut builder = self.request(method, request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        let response = builder.send().await.map_err(fetch_failure)?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.text().await.map_err(|e| FetchFailure {
            kind: "body".to_string(),
            message: e.to_string(),
        })?;
        Ok(ProbeResponse {
            status,
            headers,
            body,
        })
    }
}

/// Maps a middleware-client error onto a [`FetchFailure`], preserving
/// the payment-negotiation message verbatim when the middleware raised it.
fn fetch_failure(error: rqm::Error) -> FetchFailure {
    match error {
        rqm::Error::Middleware(e) => FetchFailure {
            kind: "payment".to_string(),
            // {:#} renders the full anyhow chain on one line.
            message: format!("{e:#}"),
        },
        rqm::Error::Reqwest(e) => {
            let kind = if e.is_connect() {
                "connect"
            } else if e.is_timeout() {
                "timeout"
            } else if e.is_request() {
                "request"
            } else {
                "transport"
            };
            FetchFailure {
                kind: kind.to_string(),
                message: e.to_string(),
            }
        }
    }
}

/// Classification of a failed attempt, mutually exclusive by precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Secure app origin, insecure target: blocked by transport policy
    /// before any request leaves.
    MixedContent,
    /// The server rejected the cross-origin request, inferred from the
    /// error message.
    CrossOrigin,
    /// Anything else, surfaced with its raw message.
    Other,
}

impl FailureClass {
    /// Classification-specific explanation shown alongside the raw message.
    pub fn remediation(&self) -> &'static str {
        match self {
            FailureClass::MixedContent => {
                "Mixed Content error: Cannot load HTTP content from an HTTPS page. \
                 The endpoint must be available over HTTPS."
            }
            FailureClass::CrossOrigin => {
                "CORS error: The server must allow cross-origin requests and include \
                 the X-PAYMENT header in Access-Control-Allow-Headers. This is a \
                 server-side configuration issue."
            }
            FailureClass::Other => "Check the diagnostic log for more details",
        }
    }
}

/// The normalized result of one execution attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    /// The request completed with an HTTP status, a parsed body, and
    /// the settlement receipt when the server attached one.
    Completed {
        status: u16,
        data: serde_json::Value,
        settlement: Option<SettlementInfo>,
    },
    /// The request failed before completing.
    Failed {
        message: String,
        kind: String,
        class: FailureClass,
    },
}

impl RequestOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, RequestOutcome::Failed { .. })
    }

    pub fn is_mixed_content(&self) -> bool {
        matches!(
            self,
            RequestOutcome::Failed {
                class: FailureClass::MixedContent,
                ..
            }
        )
    }

    pub fn is_cors_error(&self) -> bool {
        matches!(
            self,
            RequestOutcome::Failed {
                class: FailureClass::CrossOrigin,
                ..
            }
        )
    }
}

/// Drives one end-to-end attempt per call and classifies the result.
pub struct RequestExecutor {
    fetch: Arc<dyn PaidFetch>,
    app_origin: Url,
}

impl RequestExecutor {
    /// `app_origin` is the origin the probing application itself is
    /// served from; its scheme drives the mixed-content pre-check.
    pub fn new(fetch: Arc<dyn PaidFetch>, app_origin: Url) -> Self {
        Self { fetch, app_origin }
    }

    /// Executes one attempt for `option` with the collected `inputs`.
    #[instrument(name = "probe.execute", skip(self, inputs), fields(url = %option.resource))]
    pub async fn execute(
        &self,
        option: &PaymentOption,
        inputs: &HashMap<String, String>,
    ) -> RequestOutcome {
        let request = build_request(option, inputs);
        debug!(method = %request.method, has_body = request.body.is_some(), "Sending probe request");
        match self.fetch.fetch(request).await {
            Ok(response) => completed(response),
            Err(failure) => self.failed(&option.resource, failure),
        }
    }

    /// Probes an arbitrary URL with a plain GET through the paid fetch.
    /// Used for ad-hoc endpoints outside the catalog: there is no
    /// schema, so no user inputs, no custom headers, and no body.
    #[instrument(name = "probe.execute_url", skip(self), fields(url = %url))]
    pub async fn execute_url(&self, url: &Url) -> RequestOutcome {
        let request = ProbeRequest {
            url: url.clone(),
            method: "GET".to_string(),
            headers: Vec::new(),
            body: None,
        };
        match self.fetch.fetch(request).await {
            Ok(response) => completed(response),
            Err(failure) => self.failed(url, failure),
        }
    }

    fn failed(&self, resource: &Url, failure: FetchFailure) -> RequestOutcome {
        let class = classify_failure(&self.app_origin, resource, &failure);
        warn!(%failure, ?class, "Probe request failed");
        RequestOutcome::Failed {
            message: failure.message,
            kind: failure.kind,
            class,
        }
    }
}

/// Builds the HTTP request from the option's schema and the collected
/// values. Only declared fields present in `inputs` are serialized;
/// anything else is silently omitted. Required-field enforcement
/// happens at collection time, not here.
fn build_request(option: &PaymentOption, inputs: &HashMap<String, String>) -> ProbeRequest {
    let schema = &option.output_schema.input;
    let method = schema.method.to_ascii_uppercase();

    let mut headers = vec![(CONTENT_TYPE.to_string(), "application/json".to_string())];
    for name in schema.header_fields.iter().flatten().map(|(name, _)| name) {
        if let Some(value) = inputs.get(name) {
            headers.push((name.clone(), value.clone()));
        }
    }

    let body = if method != "GET" {
        schema.body_fields.as_ref().map(|fields| {
            let mut data = serde_json::Map::new();
            for name in fields.keys() {
                if let Some(value) = inputs.get(name) {
                    data.insert(name.clone(), serde_json::Value::String(value.clone()));
                }
            }
            serde_json::Value::Object(data).to_string()
        })
    } else {
        None
    };

    ProbeRequest {
        url: option.resource.clone(),
        method,
        headers,
        body,
    }
}

/// Converts a completed response into an outcome: decode the settlement
/// header when present, parse the body as JSON if declared, raw text
/// otherwise.
fn completed(response: ProbeResponse) -> RequestOutcome {
    let settlement = response
        .headers
        .get(X_PAYMENT_RESPONSE)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| match SettlementInfo::from_header(raw) {
            Ok(info) => Some(info),
            Err(error) => {
                warn!(%error, "Unreadable settlement header, ignoring");
                None
            }
        });

    let is_json = response
        .headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|ct| ct.contains("application/json"))
        .unwrap_or(false);
    let data = if is_json {
        serde_json::from_str(&response.body)
            .unwrap_or_else(|_| serde_json::Value::String(response.body))
    } else {
        serde_json::Value::String(response.body)
    };

    RequestOutcome::Completed {
        status: response.status,
        data,
        settlement,
    }
}

/// Whether a request from `app_origin` to `resource` would be blocked
/// as mixed content. Checked from the schemes alone, not the error.
pub fn is_mixed_content(app_origin: &Url, resource: &Url) -> bool {
    app_origin.scheme() == "https" && resource.scheme() == "http"
}

/// Known phrasings of a cross-origin rejection. Fetch primitives do
/// not expose a structured code for this condition.
const CROSS_ORIGIN_PHRASES: [&str; 3] = ["CORS", "Failed to fetch", "Network request failed"];

/// Heuristic: does this error message look like a cross-origin rejection?
pub fn looks_cross_origin(message: &str) -> bool {
    CROSS_ORIGIN_PHRASES
        .iter()
        .any(|phrase| message.contains(phrase))
}

/// Applies the classification precedence: mixed content first (scheme
/// pre-check), then the cross-origin heuristic, then the fallback.
fn classify_failure(app_origin: &Url, resource: &Url, failure: &FetchFailure) -> FailureClass {
    if is_mixed_content(app_origin, resource) {
        FailureClass::MixedContent
    } else if looks_cross_origin(&failure.message) {
        FailureClass::CrossOrigin
    } else {
        FailureClass::Other
    }
}
