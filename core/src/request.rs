//! Request assembly: from service + endpoint + call-site overrides to a
//! prepared request ready for the transport.
//!
//! # Design
//! Assembly is split in two, the way the transport sees it:
//! - `build_request_object` resolves *what* to call (host, path, method,
//!   headers, params) and never touches the network;
//! - `Request::prepare` turns that into wire form (query string, body bytes,
//!   cookie and auth headers), folding in session-level defaults. Sessions
//!   call it from `Session::prepare_request`.

use rand::Rng;
use ureq::http::Method;

use crate::endpoint::Endpoint;
use crate::error::CallError;
use crate::merge::{get_required_headers, overlay, set_header};
use crate::service::Service;
use crate::session::Session;
use crate::types::{Auth, Cookies, Headers, Params, PathArgs, RequestData};
use crate::host::choose_host;
use crate::url::build_url;

const CONTENT_TYPE: &str = "Content-Type";

/// Call-site overrides for one request. Everything is optional.
#[derive(Debug, Clone, Default)]
pub struct RequestArgs {
    pub method: Option<Method>,
    pub params: Params,
    pub data: Option<RequestData>,
    pub json: Option<serde_json::Value>,
    pub headers: Headers,
    pub cookies: Cookies,
    pub auth: Option<Auth>,
    pub path_args: PathArgs,
}

/// A fully resolved request, before session defaults are applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: Headers,
    pub params: Params,
    pub data: Option<RequestData>,
    pub json: Option<serde_json::Value>,
    pub cookies: Cookies,
    pub auth: Option<Auth>,
}

/// A request in wire form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: String,
    pub headers: Headers,
    pub body: Option<Vec<u8>>,
}

impl PreparedRequest {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl Request {
    /// Encode into wire form.
    ///
    /// `default_headers` sit under the request's headers and `jar` sits
    /// under its cookies. `data` takes precedence over `json`.
    pub fn prepare(self, default_headers: &Headers, jar: &Cookies) -> Result<PreparedRequest, CallError> {
        let mut headers = overlay(default_headers.clone(), self.headers);

        let mut url = self.url;
        if !self.params.is_empty() {
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(&self.params)
                .finish();
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(&query);
        }

        let body = match (self.data, self.json) {
            (Some(RequestData::Form(form)), _) => {
                set_default_header(&mut headers, CONTENT_TYPE, "application/x-www-form-urlencoded");
                let encoded = form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(&form)
                    .finish();
                Some(encoded.into_bytes())
            }
            (Some(RequestData::Raw(bytes)), _) => Some(bytes),
            (None, Some(json)) => {
                set_default_header(&mut headers, CONTENT_TYPE, "application/json");
                Some(serde_json::to_vec(&json)?)
            }
            (None, None) => None,
        };

        let mut cookies = jar.clone();
        cookies.extend(self.cookies);
        if !cookies.is_empty() {
            let rendered = cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; ");
            set_header(&mut headers, "Cookie".to_string(), rendered);
        }

        if let Some(auth) = &self.auth {
            set_header(&mut headers, "Authorization".to_string(), auth.header_value());
        }

        Ok(PreparedRequest {
            method: self.method,
            url,
            headers,
            body,
        })
    }
}

fn set_default_header(headers: &mut Headers, name: &str, value: &str) {
    if !headers.keys().any(|k| k.eq_ignore_ascii_case(name)) {
        headers.insert(name.to_string(), value.to_string());
    }
}

/// Resolve host, path, headers, params and method, then let the session
/// prepare the request. No network I/O happens here.
///
/// The host is chosen first, so an empty host list fails before anything
/// else about the endpoint is looked at.
pub fn build_request_object<R: Rng + ?Sized>(
    session: &dyn Session,
    service: &dyn Service,
    endpoint: &dyn Endpoint,
    args: RequestArgs,
    rng: &mut R,
) -> Result<PreparedRequest, CallError> {
    let host = choose_host(service, rng)?;
    let path = endpoint.formatted_path(&args.path_args)?;
    let url = build_url(&host, &path);

    let headers = overlay(args.headers, get_required_headers(service, endpoint));
    let params = endpoint.merged_params(&args.params)?;
    let method = args.method.unwrap_or_else(|| endpoint.default_method());

    let request = Request {
        method,
        url,
        headers,
        params,
        data: args.data,
        json: args.json,
        cookies: args.cookies,
        auth: args.auth,
    };
    session.prepare_request(request)
}
