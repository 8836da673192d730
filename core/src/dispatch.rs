//! The dispatcher: one blocking call to an endpoint on a service.
//!
//! # Design
//! A call walks `session → request → send → (encoding) → release`:
//! 1. use the caller's session, or create one from the `SessionFactory`;
//! 2. assemble the prepared request (host choice, path, headers, params);
//! 3. log `"<METHOD> <url>"`, send with the timeout pair, the endpoint's
//!    streaming flag and redirects on, log `"<status> <final url>"`;
//! 4. apply the encoding override, if any.
//!
//! A session created here is owned by the `SessionHandle` and closed when
//! the call returns, whether it succeeded or not. Errors are returned
//! untouched; nothing is retried at this level.

use rand::RngCore;
use tracing::debug_span;

use crate::adapter::HttpAdapter;
use crate::config::{PoolConfig, RetrySpec, Timeout};
use crate::endpoint::Endpoint;
use crate::error::CallError;
use crate::logging::{CallLogger, TracingLogger};
use crate::request::{build_request_object, RequestArgs};
use crate::response::Response;
use crate::service::Service;
use crate::session::{AdaptedSessions, SendOptions, Session, SessionFactory, SessionHandle};
use crate::types::{Auth, RequestData};
use ureq::http::Method;

/// Everything a caller can set for one call. All fields default.
#[derive(Default)]
pub struct CallOptions<'a> {
    pub request: RequestArgs,
    /// Caller-owned session. When absent the call creates and closes one.
    pub session: Option<&'a dyn Session>,
    pub timeout: Timeout,
    /// Overrides the response's text encoding.
    pub encoding: Option<String>,
    /// Defaults to [`TracingLogger`].
    pub logger: Option<&'a dyn CallLogger>,
    /// Retry policy for a session created by the call.
    pub retry: RetrySpec,
    /// Pool sizing for a session created by the call.
    pub pool: PoolConfig,
    /// Random source for host selection. Defaults to `thread_rng`.
    pub rng: Option<&'a mut dyn RngCore>,
}

impl<'a> CallOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.request.method = Some(method);
        self
    }

    pub fn param(mut self, name: &str, value: &str) -> Self {
        self.request.params.insert(name.to_string(), value.to_string());
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.request.headers.insert(name.to_string(), value.to_string());
        self
    }

    pub fn cookie(mut self, name: &str, value: &str) -> Self {
        self.request.cookies.insert(name.to_string(), value.to_string());
        self
    }

    pub fn path_arg(mut self, name: &str, value: impl ToString) -> Self {
        self.request.path_args.insert(name.to_string(), value.to_string());
        self
    }

    pub fn data(mut self, data: impl Into<RequestData>) -> Self {
        self.request.data = Some(data.into());
        self
    }

    pub fn json(mut self, json: serde_json::Value) -> Self {
        self.request.json = Some(json);
        self
    }

    pub fn auth(mut self, auth: Auth) -> Self {
        self.request.auth = Some(auth);
        self
    }

    pub fn session(mut self, session: &'a dyn Session) -> Self {
        self.session = Some(session);
        self
    }

    pub fn timeout(mut self, timeout: Timeout) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn encoding(mut self, encoding: &str) -> Self {
        self.encoding = Some(encoding.to_string());
        self
    }

    pub fn logger(mut self, logger: &'a dyn CallLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn retry(mut self, retry: RetrySpec) -> Self {
        self.retry = retry;
        self
    }

    pub fn pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    pub fn rng(mut self, rng: &'a mut dyn RngCore) -> Self {
        self.rng = Some(rng);
        self
    }
}

/// Sends calls, creating per-call sessions through `F`.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher<F = AdaptedSessions> {
    factory: F,
}

impl Dispatcher<AdaptedSessions> {
    pub fn new() -> Self {
        Self {
            factory: AdaptedSessions,
        }
    }
}

impl<F: SessionFactory> Dispatcher<F> {
    pub fn with_factory(factory: F) -> Self {
        Self { factory }
    }

    /// Call `endpoint` on one of `service`'s hosts.
    pub fn call(
        &self,
        service: &dyn Service,
        endpoint: &dyn Endpoint,
        options: CallOptions<'_>,
    ) -> Result<Response, CallError> {
        let CallOptions {
            request,
            session,
            timeout,
            encoding,
            logger,
            retry,
            pool,
            rng,
        } = options;
        let _span = debug_span!("call", service = service.name(), endpoint = endpoint.path()).entered();

        let logger = logger.unwrap_or(&TracingLogger);
        let mut thread_rng;
        let rng: &mut dyn RngCore = match rng {
            Some(rng) => rng,
            None => {
                thread_rng = rand::thread_rng();
                &mut thread_rng
            }
        };

        let session = SessionHandle::acquire(session, || {
            self.factory.adapted_session(HttpAdapter::new(retry, pool))
        });

        let prepared = build_request_object(&*session, service, endpoint, request, rng)?;
        logger.info(&format!("{} {}", prepared.method(), prepared.url()));

        let send_options = SendOptions {
            timeout: timeout.pair(),
            stream: endpoint.streaming(),
            allow_redirects: true,
        };
        let mut response = session.send(&prepared, &send_options)?;
        logger.info(&format!("{} {}", response.status_code(), response.url()));

        if let Some(encoding) = encoding {
            response.set_encoding(&encoding);
        }
        Ok(response)
    }
}

/// [`Dispatcher::call`] with the default session factory.
pub fn call(
    service: &dyn Service,
    endpoint: &dyn Endpoint,
    options: CallOptions<'_>,
) -> Result<Response, CallError> {
    Dispatcher::new().call(service, endpoint, options)
}
