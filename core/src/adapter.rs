//! Transport adapters: the piece of a session that actually talks HTTP.
//!
//! # Design
//! An adapter is mounted on a session under a URL prefix. `HttpAdapter`
//! owns one `ureq::Agent` (and with it the connection pool), applies the
//! per-request timeout pair and redirect policy, and retries transient
//! failures against the same URL according to its `RetrySpec`. Choosing a
//! different host is never the adapter's job.

use std::{fmt, io};

use tracing::debug;
use ureq::http::{self, Method};
use ureq::{Agent, ResponseExt};

use crate::config::{PoolConfig, RetrySpec};
use crate::error::CallError;
use crate::request::PreparedRequest;
use crate::response::{Response, ResponseBody};
use crate::session::SendOptions;

/// Redirect hops followed when redirects are allowed.
pub const MAX_REDIRECTS: u32 = 30;

/// Sends prepared requests for one or more URL prefixes.
pub trait Adapter: Send + Sync {
    fn send(&self, request: &PreparedRequest, options: &SendOptions) -> Result<Response, CallError>;

    /// Called when the owning session closes, before it drops its handle
    /// to the adapter. Pooled connections go away with the last handle.
    fn close(&self) {}
}

/// `ureq`-backed adapter with pooling and retries.
pub struct HttpAdapter {
    agent: Agent,
    retry: RetrySpec,
    pool: PoolConfig,
}

impl fmt::Debug for HttpAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpAdapter")
            .field("retry", &self.retry)
            .field("pool", &self.pool)
            .finish()
    }
}

impl Default for HttpAdapter {
    fn default() -> Self {
        Self::new(RetrySpec::default(), PoolConfig::default())
    }
}

impl HttpAdapter {
    pub fn new(retry: RetrySpec, pool: PoolConfig) -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .save_redirect_history(true)
            .max_idle_connections(pool.connections)
            .max_idle_connections_per_host(pool.maxsize)
            .build()
            .new_agent();
        Self { agent, retry, pool }
    }

    pub fn retry(&self) -> &RetrySpec {
        &self.retry
    }

    pub fn pool(&self) -> PoolConfig {
        self.pool
    }

    fn run_once(
        &self,
        request: &PreparedRequest,
        options: &SendOptions,
    ) -> Result<http::Response<ureq::Body>, CallError> {
        let mut builder = http::Request::builder()
            .method(request.method.clone())
            .uri(request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        match &request.body {
            Some(body) => {
                let built = builder
                    .body(body.clone())
                    .map_err(|e| CallError::InvalidRequest(e.to_string()))?;
                self.run_configured(built, options)
            }
            None => {
                let built = builder
                    .body(())
                    .map_err(|e| CallError::InvalidRequest(e.to_string()))?;
                self.run_configured(built, options)
            }
        }
    }

    fn run_configured<S: ureq::AsSendBody>(
        &self,
        request: http::Request<S>,
        options: &SendOptions,
    ) -> Result<http::Response<ureq::Body>, CallError> {
        let (connect, read) = options.timeout;
        let redirects = if options.allow_redirects { MAX_REDIRECTS } else { 0 };
        let configured = self
            .agent
            .configure_request(request)
            .timeout_connect(Some(connect))
            .timeout_recv_response(Some(read))
            .timeout_recv_body(Some(read))
            .max_redirects(redirects)
            .build();
        Ok(self.agent.run(configured)?)
    }

    /// `outcome` is the response status or the error of one attempt.
    fn should_retry(&self, method: &Method, outcome: Result<u16, &CallError>) -> bool {
        let idempotent = is_idempotent(method);
        match outcome {
            Ok(status) => idempotent && self.retry.retries_status(status),
            Err(CallError::Transport(err)) if is_connect_error(err) => true,
            Err(CallError::Transport(ureq::Error::Timeout(_))) => idempotent,
            Err(_) => false,
        }
    }
}

impl Adapter for HttpAdapter {
    fn send(&self, request: &PreparedRequest, options: &SendOptions) -> Result<Response, CallError> {
        let mut attempt = 0;
        let response = loop {
            let outcome = self.run_once(request, options);
            let status = outcome.as_ref().map(|r| r.status().as_u16());
            if attempt >= self.retry.total || !self.should_retry(&request.method, status) {
                break outcome?;
            }
            attempt += 1;
            match &outcome {
                Ok(r) => debug!(url = %request.url, status = r.status().as_u16(), attempt, "retrying"),
                Err(e) => debug!(url = %request.url, error = %e, attempt, "retrying"),
            }
        };
        into_response(response, options.stream)
    }

    fn close(&self) {
        debug!("adapter closed");
    }
}

/// Failures where the request never reached the server.
fn is_connect_error(err: &ureq::Error) -> bool {
    match err {
        ureq::Error::ConnectionFailed | ureq::Error::HostNotFound => true,
        ureq::Error::Timeout(ureq::Timeout::Connect | ureq::Timeout::Resolve) => true,
        ureq::Error::Io(e) => matches!(
            e.kind(),
            io::ErrorKind::ConnectionRefused
                | io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::AddrNotAvailable
        ),
        _ => false,
    }
}

fn is_idempotent(method: &Method) -> bool {
    [
        Method::GET,
        Method::HEAD,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
        Method::TRACE,
    ]
    .contains(method)
}

fn into_response(mut response: http::Response<ureq::Body>, stream: bool) -> Result<Response, CallError> {
    let final_url = response.get_uri().to_string();
    let mut history: Vec<String> = response
        .get_redirect_history()
        .map(|uris| uris.iter().map(ToString::to_string).collect())
        .unwrap_or_default();
    if history.last() == Some(&final_url) {
        history.pop();
    }

    let mut out = Response::new(response.status().as_u16(), &final_url).with_history(history);
    for (name, value) in response.headers() {
        let Ok(value) = value.to_str() else {
            continue;
        };
        if *name == http::header::SET_COOKIE {
            if let Some((cookie, val)) = parse_set_cookie(value) {
                out = out.with_cookie(cookie, val);
            }
        }
        let joined = match out.header(name.as_str()) {
            Some(existing) if *name != http::header::SET_COOKIE => format!("{existing}, {value}"),
            _ => value.to_string(),
        };
        out = out.with_header(name.as_str(), &joined);
    }

    let body = if stream {
        ResponseBody::Streaming(Box::new(response.into_body().into_reader()))
    } else {
        ResponseBody::Buffered(response.body_mut().with_config().limit(u64::MAX).read_to_vec()?)
    };
    Ok(out.with_body(body))
}

/// `name=value` from a `Set-Cookie` header, attributes dropped.
fn parse_set_cookie(header: &str) -> Option<(&str, &str)> {
    let pair = header.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    (!name.is_empty()).then(|| (name, value.trim()))
}
