//! Blocking client core for calling endpoints on multi-host services.
//!
//! # Overview
//! A `Service` names a backend and lists candidate hosts; an `Endpoint`
//! names one operation on it (path template, method, header and parameter
//! rules). [`call`] picks a host at random, assembles the request, sends it
//! through a session with an explicit timeout pair and redirects enabled,
//! logs the exchange, and hands the response back.
//!
//! # Design
//! - Host selection, URL joining and header/param merging are pure
//!   functions; the random source is injected.
//! - `Session` and `Adapter` are the transport seams. The real ones wrap a
//!   `ureq::Agent`; tests plug in doubles.
//! - A session the caller did not supply is created for the call and closed
//!   when the call ends, on success and on error.
//! - Timeouts, retry and pool settings, and the logger are passed per call.
//!   There is no global mutable state.
//! - Response bodies are not parsed.

pub mod adapter;
pub mod config;
pub mod dispatch;
pub mod endpoint;
pub mod error;
pub mod host;
pub mod logging;
pub mod merge;
pub mod request;
pub mod response;
pub mod service;
pub mod session;
pub mod types;
pub mod url;

pub use adapter::{Adapter, HttpAdapter};
pub use config::{PoolConfig, RetrySpec, Timeout};
pub use dispatch::{call, CallOptions, Dispatcher};
pub use endpoint::{Endpoint, HttpEndpoint};
pub use error::CallError;
pub use host::choose_host;
pub use logging::{CallLogger, TracingLogger};
pub use merge::get_required_headers;
pub use request::{build_request_object, PreparedRequest, Request, RequestArgs};
pub use response::{Response, ResponseBody};
pub use service::{DiscoverableService, HostResolver, Service, StaticService};
pub use session::{
    get_adapted_session, AdaptedSessions, HttpSession, SendOptions, Session, SessionFactory, SessionHandle,
};
pub use types::{Auth, Cookies, Headers, Params, PathArgs, RequestData};
pub use url::build_url;

pub use ureq::http::Method;
