//! Endpoints: one logical operation on a service.
//!
//! # Design
//! `Endpoint` exposes the read-only attributes the assembler needs and
//! provides path formatting and parameter merging on top of them, so test
//! doubles only implement the accessors. `HttpEndpoint` is the concrete
//! declaration type.

use std::collections::BTreeSet;

use tracing::warn;
use ureq::http::Method;

use crate::error::CallError;
use crate::types::{Headers, Params, PathArgs};

/// One operation on a service: path template, method and request rules.
pub trait Endpoint {
    /// Path template with `{placeholder}` segments, e.g. `/users/{id}`.
    fn path(&self) -> &str;

    fn default_method(&self) -> Method {
        Method::GET
    }

    fn required_headers(&self) -> Headers {
        Headers::new()
    }

    fn default_params(&self) -> Params {
        Params::new()
    }

    fn required_params(&self) -> BTreeSet<String> {
        BTreeSet::new()
    }

    /// Whether the response body is handed back unread.
    fn streaming(&self) -> bool {
        false
    }

    /// Substitute `args` into the path template.
    fn formatted_path(&self, args: &PathArgs) -> Result<String, CallError> {
        format_path(self.path(), args)
    }

    /// Default params overwritten by `overrides`, with every required
    /// param checked present.
    fn merged_params(&self, overrides: &Params) -> Result<Params, CallError> {
        let mut merged = self.default_params();
        merged.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));

        let missing: Vec<String> = self
            .required_params()
            .into_iter()
            .filter(|name| !merged.contains_key(name))
            .collect();
        if !missing.is_empty() {
            return Err(CallError::MissingRequiredParameter {
                endpoint: self.path().to_string(),
                missing,
            });
        }
        Ok(merged)
    }
}

fn format_path(template: &str, args: &PathArgs) -> Result<String, CallError> {
    let mut out = String::with_capacity(template.len());
    let mut used = BTreeSet::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    name.push(c);
                }
                if !closed {
                    return Err(CallError::InvalidRequest(format!(
                        "unclosed '{{' in path template {template}"
                    )));
                }
                let value = args
                    .get(&name)
                    .ok_or_else(|| CallError::MissingPathArgument(name.clone()))?;
                out.push_str(value);
                used.insert(name);
            }
            '}' => {
                return Err(CallError::InvalidRequest(format!(
                    "single '}}' in path template {template}"
                )));
            }
            other => out.push(other),
        }
    }

    let unused: Vec<&str> = args
        .keys()
        .filter(|k| !used.contains(*k))
        .map(String::as_str)
        .collect();
    if !unused.is_empty() {
        warn!(
            path = template,
            unused = ?unused,
            "path arguments do not match any placeholder and were ignored"
        );
    }
    Ok(out)
}

/// A declared endpoint.
#[derive(Debug, Clone)]
pub struct HttpEndpoint {
    path: String,
    default_method: Method,
    required_headers: Headers,
    default_params: Params,
    required_params: BTreeSet<String>,
    streaming: bool,
}

impl HttpEndpoint {
    pub fn new(method: Method, path: &str) -> Self {
        if path.contains('?') {
            warn!(
                path,
                "endpoint path may contain query parameters; declare them as default or required params instead"
            );
        }
        Self {
            path: path.to_string(),
            default_method: method,
            required_headers: Headers::new(),
            default_params: Params::new(),
            required_params: BTreeSet::new(),
            streaming: false,
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: &str) -> Self {
        Self::new(Method::POST, path)
    }

    /// A GET endpoint whose body is returned as an unread stream.
    pub fn streaming_get(path: &str) -> Self {
        Self::get(path).with_streaming(true)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.required_headers
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_default_param(mut self, name: &str, value: &str) -> Self {
        self.default_params
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_required_param(mut self, name: &str) -> Self {
        self.required_params.insert(name.to_string());
        self
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }
}

impl Endpoint for HttpEndpoint {
    fn path(&self) -> &str {
        &self.path
    }

    fn default_method(&self) -> Method {
        self.default_method.clone()
    }

    fn required_headers(&self) -> Headers {
        self.required_headers.clone()
    }

    fn default_params(&self) -> Params {
        self.default_params.clone()
    }

    fn required_params(&self) -> BTreeSet<String> {
        self.required_params.clone()
    }

    fn streaming(&self) -> bool {
        self.streaming
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pairs: &[(&str, &str)]) -> PathArgs {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn formats_placeholders() {
        let endpoint = HttpEndpoint::get("/users/{id}/posts/{post}");
        let path = endpoint
            .formatted_path(&args(&[("id", "42"), ("post", "7")]))
            .unwrap();
        assert_eq!(path, "/users/42/posts/7");
    }

    #[test]
    fn unused_arguments_are_ignored() {
        let endpoint = HttpEndpoint::get("/foo");
        let path = endpoint.formatted_path(&args(&[("foo", "bar")])).unwrap();
        assert_eq!(path, "/foo");
    }

    #[test]
    fn missing_placeholder_argument_fails() {
        let endpoint = HttpEndpoint::get("/users/{id}");
        let err = endpoint.formatted_path(&PathArgs::new()).unwrap_err();
        assert!(matches!(err, CallError::MissingPathArgument(name) if name == "id"));
    }

    #[test]
    fn doubled_braces_are_literal() {
        let endpoint = HttpEndpoint::get("/raw/{{literal}}/{id}");
        let path = endpoint.formatted_path(&args(&[("id", "1")])).unwrap();
        assert_eq!(path, "/raw/{literal}/1");
    }

    #[test]
    fn unclosed_placeholder_is_rejected() {
        let endpoint = HttpEndpoint::get("/users/{id");
        let err = endpoint.formatted_path(&args(&[("id", "1")])).unwrap_err();
        assert!(matches!(err, CallError::InvalidRequest(_)), "{err:?}");
    }

    #[test]
    fn single_closing_brace_is_rejected() {
        let endpoint = HttpEndpoint::get("/users/id}");
        let err = endpoint.formatted_path(&PathArgs::new()).unwrap_err();
        assert!(matches!(err, CallError::InvalidRequest(_)), "{err:?}");
    }

    #[test]
    fn call_site_params_override_defaults() {
        let endpoint = HttpEndpoint::get("/search")
            .with_default_param("page", "1")
            .with_default_param("size", "20");
        let overrides = args(&[("page", "3"), ("q", "rust")]);
        let merged = endpoint.merged_params(&overrides).unwrap();
        assert_eq!(merged, args(&[("page", "3"), ("q", "rust"), ("size", "20")]));
    }

    #[test]
    fn required_param_satisfied_by_default() {
        let endpoint = HttpEndpoint::get("/search")
            .with_default_param("q", "*")
            .with_required_param("q");
        assert!(endpoint.merged_params(&Params::new()).is_ok());
    }

    #[test]
    fn missing_required_params_fail() {
        let endpoint = HttpEndpoint::get("/search")
            .with_required_param("q")
            .with_required_param("lang");
        let err = endpoint.merged_params(&Params::new()).unwrap_err();
        match err {
            CallError::MissingRequiredParameter { endpoint, missing } => {
                assert_eq!(endpoint, "/search");
                assert_eq!(missing, vec!["lang", "q"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn streaming_constructor() {
        let endpoint = HttpEndpoint::streaming_get("/feed");
        assert!(endpoint.streaming());
        assert_eq!(endpoint.default_method(), Method::GET);
    }

    #[test]
    fn post_default_method() {
        assert_eq!(HttpEndpoint::post("/items").default_method(), Method::POST);
    }
}
