//! Sessions: reusable transport handles with adapters mounted per URL prefix.
//!
//! # Design
//! `Session` is the seam the dispatcher talks to; `HttpSession` is the real
//! one. A session either comes from the caller (the caller owns it and
//! closes it) or is created for a single call by a `SessionFactory` and
//! released through `SessionHandle` when that call ends, on every path.

use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::debug;

use crate::adapter::{Adapter, HttpAdapter};
use crate::error::CallError;
use crate::merge::set_header;
use crate::request::{PreparedRequest, Request};
use crate::response::Response;
use crate::types::{Cookies, Headers};

/// How a single prepared request is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendOptions {
    /// `(connect, read)` timeouts.
    pub timeout: (Duration, Duration),
    pub stream: bool,
    pub allow_redirects: bool,
}

/// A transport handle: prepares and sends requests.
pub trait Session {
    /// Fold session-level defaults (headers, persisted cookies) into
    /// `request` and encode it for the wire.
    fn prepare_request(&self, request: Request) -> Result<PreparedRequest, CallError>;

    /// Send one prepared request and block until the response headers
    /// arrive or a timeout fires.
    fn send(&self, request: &PreparedRequest, options: &SendOptions) -> Result<Response, CallError>;

    /// Release pooled connections.
    fn close(&self);
}

/// Creates the session for a call that was not given one.
pub trait SessionFactory {
    type Session: Session + 'static;

    fn adapted_session(&self, adapter: HttpAdapter) -> Self::Session;
}

/// Default factory: [`get_adapted_session`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AdaptedSessions;

impl SessionFactory for AdaptedSessions {
    type Session = HttpSession;

    fn adapted_session(&self, adapter: HttpAdapter) -> HttpSession {
        get_adapted_session(adapter)
    }
}

/// A new session with `adapter` mounted for `http://` and `https://`.
pub fn get_adapted_session<A: Adapter + 'static>(adapter: A) -> HttpSession {
    let session = HttpSession::new();
    let adapter: Arc<dyn Adapter> = Arc::new(adapter);
    session.mount("http://", Arc::clone(&adapter));
    session.mount("https://", adapter);
    debug!("created adapted session");
    session
}

/// Session backed by mounted adapters, default headers and a cookie jar.
pub struct HttpSession {
    adapters: Mutex<Vec<(String, Arc<dyn Adapter>)>>,
    headers: Headers,
    cookies: Mutex<Cookies>,
}

impl std::fmt::Debug for HttpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefixes: Vec<String> = lock(&self.adapters).iter().map(|(p, _)| p.clone()).collect();
        f.debug_struct("HttpSession")
            .field("adapters", &prefixes)
            .field("headers", &self.headers)
            .finish()
    }
}

impl Default for HttpSession {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpSession {
    /// An empty session. Nothing can be sent until an adapter is mounted.
    pub fn new() -> Self {
        let headers = Headers::from([
            (
                "User-Agent".to_string(),
                concat!("svc-core/", env!("CARGO_PKG_VERSION")).to_string(),
            ),
            ("Accept".to_string(), "*/*".to_string()),
        ]);
        Self {
            adapters: Mutex::new(Vec::new()),
            headers,
            cookies: Mutex::new(Cookies::new()),
        }
    }

    /// Replace a session-wide default header.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        set_header(&mut self.headers, name.to_string(), value.to_string());
        self
    }

    /// Mount `adapter` for every URL starting with `prefix`. Longer
    /// prefixes take precedence; remounting a prefix replaces it.
    pub fn mount(&self, prefix: &str, adapter: Arc<dyn Adapter>) {
        let mut adapters = lock(&self.adapters);
        adapters.retain(|(p, _)| p != prefix);
        adapters.push((prefix.to_string(), adapter));
        adapters.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()));
    }

    /// The adapter mounted for the longest prefix of `url`.
    pub fn get_adapter(&self, url: &str) -> Option<Arc<dyn Adapter>> {
        let lowered = url.to_ascii_lowercase();
        lock(&self.adapters)
            .iter()
            .find(|(prefix, _)| lowered.starts_with(&prefix.to_ascii_lowercase()))
            .map(|(_, adapter)| Arc::clone(adapter))
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Cookies persisted from earlier responses.
    pub fn cookies(&self) -> Cookies {
        lock(&self.cookies).clone()
    }

    pub fn set_cookie(&self, name: &str, value: &str) {
        lock(&self.cookies).insert(name.to_string(), value.to_string());
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.adapters).is_empty()
    }
}

impl Session for HttpSession {
    fn prepare_request(&self, request: Request) -> Result<PreparedRequest, CallError> {
        let jar = self.cookies();
        request.prepare(&self.headers, &jar)
    }

    fn send(&self, request: &PreparedRequest, options: &SendOptions) -> Result<Response, CallError> {
        let adapter = self
            .get_adapter(&request.url)
            .ok_or_else(|| CallError::NoAdapter(request.url.clone()))?;
        let response = adapter.send(request, options)?;
        if !response.cookies().is_empty() {
            lock(&self.cookies).extend(
                response
                    .cookies()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone())),
            );
        }
        Ok(response)
    }

    fn close(&self) {
        let adapters = std::mem::take(&mut *lock(&self.adapters));
        for (_, adapter) in &adapters {
            adapter.close();
        }
        debug!(adapters = adapters.len(), "session closed");
    }
}

/// A poisoned lock only means another thread panicked mid-update of a
/// plain map; the data is still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// The session used by one call: borrowed from the caller or owned by the
/// call. An owned session is closed when the handle drops.
pub enum SessionHandle<'a, S: Session> {
    Borrowed(&'a dyn Session),
    Owned(S),
}

impl<'a, S: Session> SessionHandle<'a, S> {
    /// Borrow `supplied`, or create one with `create`.
    pub fn acquire(supplied: Option<&'a dyn Session>, create: impl FnOnce() -> S) -> Self {
        match supplied {
            Some(session) => SessionHandle::Borrowed(session),
            None => SessionHandle::Owned(create()),
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, SessionHandle::Owned(_))
    }
}

impl<'a, S: Session + 'a> Deref for SessionHandle<'a, S> {
    type Target = dyn Session + 'a;

    fn deref(&self) -> &Self::Target {
        match self {
            SessionHandle::Borrowed(session) => *session,
            SessionHandle::Owned(session) => session,
        }
    }
}

impl<S: Session> Drop for SessionHandle<'_, S> {
    fn drop(&mut self) {
        if let SessionHandle::Owned(session) = self {
            session.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use ureq::http::Method;

    /// Answers every request with `status`, echoing the URL.
    struct CannedAdapter {
        status: u16,
        set_cookie: Option<(&'static str, &'static str)>,
        closed: AtomicUsize,
    }

    impl CannedAdapter {
        fn new(status: u16) -> Self {
            Self {
                status,
                set_cookie: None,
                closed: AtomicUsize::new(0),
            }
        }
    }

    impl Adapter for CannedAdapter {
        fn send(&self, request: &PreparedRequest, _: &SendOptions) -> Result<Response, CallError> {
            let mut response = Response::new(self.status, &request.url);
            if let Some((name, value)) = self.set_cookie {
                response = response.with_cookie(name, value);
            }
            Ok(response)
        }

        fn close(&self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn options() -> SendOptions {
        SendOptions {
            timeout: (Duration::from_secs(1), Duration::from_secs(3)),
            stream: false,
            allow_redirects: true,
        }
    }

    fn get(url: &str) -> PreparedRequest {
        PreparedRequest {
            method: Method::GET,
            url: url.to_string(),
            headers: Headers::new(),
            body: None,
        }
    }

    #[test]
    fn adapted_session_mounts_both_schemes() {
        let session = get_adapted_session(CannedAdapter::new(200));
        let http = session.get_adapter("http://foo.com").unwrap();
        let https = session.get_adapter("https://foo.com").unwrap();
        assert!(Arc::ptr_eq(&http, &https));
        assert!(session.get_adapter("ftp://foo.com").is_none());
    }

    #[test]
    fn each_adapted_session_is_independent() {
        let a = get_adapted_session(CannedAdapter::new(200));
        let b = get_adapted_session(CannedAdapter::new(200));
        a.close();
        assert!(a.is_closed());
        assert!(!b.is_closed());
    }

    #[test]
    fn longest_prefix_wins() {
        let session = get_adapted_session(CannedAdapter::new(200));
        session.mount("https://special.example.com", Arc::new(CannedAdapter::new(418)));
        let response = session.send(&get("https://special.example.com/x"), &options()).unwrap();
        assert_eq!(response.status_code(), 418);
        let response = session.send(&get("https://other.example.com/x"), &options()).unwrap();
        assert_eq!(response.status_code(), 200);
    }

    #[test]
    fn closed_session_cannot_send() {
        let session = get_adapted_session(CannedAdapter::new(200));
        session.close();
        let err = session.send(&get("http://h/"), &options()).unwrap_err();
        assert!(matches!(err, CallError::NoAdapter(_)));
    }

    #[test]
    fn close_closes_each_adapter_mount() {
        let adapter = Arc::new(CannedAdapter::new(200));
        let session = HttpSession::new();
        session.mount("http://", adapter.clone());
        session.mount("https://", adapter.clone());
        session.close();
        assert_eq!(adapter.closed.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn response_cookies_persist_into_later_requests() {
        let mut adapter = CannedAdapter::new(200);
        adapter.set_cookie = Some(("sid", "abc"));
        let session = get_adapted_session(adapter);
        session.send(&get("http://h/login"), &options()).unwrap();
        assert_eq!(session.cookies()["sid"], "abc");

        let request = Request {
            method: Method::GET,
            url: "http://h/me".to_string(),
            headers: Headers::new(),
            params: Default::default(),
            data: None,
            json: None,
            cookies: Cookies::new(),
            auth: None,
        };
        let prepared = session.prepare_request(request).unwrap();
        assert_eq!(prepared.header("Cookie"), Some("sid=abc"));
        assert!(prepared.header("User-Agent").unwrap().starts_with("svc-core/"));
    }

    #[test]
    fn owned_handle_closes_on_drop() {
        let adapter = Arc::new(CannedAdapter::new(200));
        let handle: SessionHandle<'_, HttpSession> = SessionHandle::acquire(None, || {
            let session = HttpSession::new();
            session.mount("http://", adapter.clone());
            session
        });
        assert!(handle.is_owned());
        assert!(handle.send(&get("http://h/"), &options()).is_ok());
        assert_eq!(adapter.closed.load(Ordering::SeqCst), 0);
        drop(handle);
        assert_eq!(adapter.closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn borrowed_handle_leaves_session_open() {
        let session = get_adapted_session(CannedAdapter::new(200));
        {
            let handle: SessionHandle<'_, HttpSession> =
                SessionHandle::acquire(Some(&session), || unreachable!("caller supplied a session"));
            assert!(!handle.is_owned());
        }
        assert!(!session.is_closed());
    }

    #[test]
    fn http_session_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HttpSession>();
    }

    #[test]
    fn default_header_replacement_ignores_case() {
        let session = HttpSession::new().with_header("accept", "application/json");
        let accepts: Vec<_> = session
            .headers()
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("accept"))
            .collect();
        assert_eq!(accepts.len(), 1);
        assert_eq!(accepts[0].1, "application/json");
    }
}
