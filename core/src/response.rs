//! Responses handed back by a session.
//!
//! # Design
//! The body is either buffered (non-streaming endpoints) or an unread
//! reader (streaming endpoints). The text encoding starts out as the
//! `Content-Type` charset and can be overridden by the caller before the
//! body is decoded; nothing else about the response depends on it.

use std::fmt;
use std::io::Read;

use crate::error::CallError;
use crate::types::{Cookies, Headers};

/// Response payload.
pub enum ResponseBody {
    Buffered(Vec<u8>),
    Streaming(Box<dyn Read + Send>),
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseBody::Buffered(bytes) => write!(f, "Buffered({} bytes)", bytes.len()),
            ResponseBody::Streaming(_) => write!(f, "Streaming"),
        }
    }
}

/// An HTTP response after any redirects were followed.
#[derive(Debug)]
pub struct Response {
    status: u16,
    url: String,
    history: Vec<String>,
    headers: Headers,
    cookies: Cookies,
    encoding: Option<String>,
    body: ResponseBody,
}

impl Response {
    pub fn new(status: u16, url: &str) -> Self {
        Self {
            status,
            url: url.to_string(),
            history: Vec::new(),
            headers: Headers::new(),
            cookies: Cookies::new(),
            encoding: None,
            body: ResponseBody::Buffered(Vec::new()),
        }
    }

    /// Add a header. A `Content-Type` charset seeds the text encoding.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if name.eq_ignore_ascii_case("content-type") {
            self.encoding = charset_of(value);
        }
        self.headers.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    /// Record a cookie the server set.
    pub fn with_cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.insert(name.to_string(), value.to_string());
        self
    }

    /// URLs visited before `url`, oldest first.
    pub fn with_history(mut self, history: Vec<String>) -> Self {
        self.history = history;
        self
    }

    pub fn with_body(mut self, body: ResponseBody) -> Self {
        self.body = body;
        self
    }

    pub fn status_code(&self) -> u16 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Final URL, after redirects.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Header lookup, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Cookies set by this response.
    pub fn cookies(&self) -> &Cookies {
        &self.cookies
    }

    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    /// Override the encoding used by [`Response::text`].
    pub fn set_encoding(&mut self, encoding: &str) {
        self.encoding = Some(encoding.to_string());
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self.body, ResponseBody::Streaming(_))
    }

    /// The whole body. Drains a streaming body.
    pub fn bytes(&mut self) -> Result<Vec<u8>, CallError> {
        match &mut self.body {
            ResponseBody::Buffered(bytes) => Ok(bytes.clone()),
            ResponseBody::Streaming(reader) => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf).map_err(CallError::Body)?;
                self.body = ResponseBody::Buffered(buf.clone());
                Ok(buf)
            }
        }
    }

    /// The body decoded with the current encoding (UTF-8 when unset).
    pub fn text(&mut self) -> Result<String, CallError> {
        let label = self.encoding.clone().unwrap_or_else(|| "utf-8".to_string());
        let bytes = self.bytes()?;
        decode(&label, bytes)
    }

    /// Hand over the body as a reader.
    pub fn into_reader(self) -> Box<dyn Read + Send> {
        match self.body {
            ResponseBody::Buffered(bytes) => Box::new(std::io::Cursor::new(bytes)),
            ResponseBody::Streaming(reader) => reader,
        }
    }
}

fn charset_of(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_string())
    })
}

fn decode(label: &str, bytes: Vec<u8>) -> Result<String, CallError> {
    match label.trim().to_ascii_lowercase().as_str() {
        "utf-8" | "utf8" => {
            String::from_utf8(bytes).map_err(|_| CallError::Decode("utf-8".to_string()))
        }
        "iso-8859-1" | "latin1" | "latin-1" | "l1" => Ok(bytes.into_iter().map(char::from).collect()),
        "ascii" | "us-ascii" => {
            if bytes.is_ascii() {
                Ok(bytes.into_iter().map(char::from).collect())
            } else {
                Err(CallError::Decode("ascii".to_string()))
            }
        }
        _ => Err(CallError::UnsupportedEncoding(label.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charset_seeds_encoding() {
        let response = Response::new(200, "http://h/").with_header("Content-Type", "text/html; charset=ISO-8859-1");
        assert_eq!(response.encoding(), Some("ISO-8859-1"));
        assert_eq!(response.header("content-type"), Some("text/html; charset=ISO-8859-1"));
    }

    #[test]
    fn no_charset_means_no_encoding() {
        let response = Response::new(200, "http://h/").with_header("content-type", "application/json");
        assert_eq!(response.encoding(), None);
    }

    #[test]
    fn latin1_text() {
        let mut response = Response::new(200, "http://h/")
            .with_body(ResponseBody::Buffered(vec![b'c', b'a', b'f', 0xE9]));
        response.set_encoding("latin1");
        assert_eq!(response.text().unwrap(), "café");
    }

    #[test]
    fn invalid_utf8_is_a_decode_error() {
        let mut response = Response::new(200, "http://h/").with_body(ResponseBody::Buffered(vec![0xFF]));
        assert!(matches!(response.text(), Err(CallError::Decode(_))));
    }

    #[test]
    fn unknown_encoding_is_reported() {
        let mut response = Response::new(200, "http://h/");
        response.set_encoding("FAKE-CODEC");
        assert!(matches!(response.text(), Err(CallError::UnsupportedEncoding(l)) if l == "FAKE-CODEC"));
    }

    #[test]
    fn streaming_body_is_drained_once() {
        let reader = std::io::Cursor::new(b"line 1\nline 2\n".to_vec());
        let mut response =
            Response::new(200, "http://h/").with_body(ResponseBody::Streaming(Box::new(reader)));
        assert!(response.is_streaming());
        assert_eq!(response.text().unwrap(), "line 1\nline 2\n");
        assert!(!response.is_streaming());
        assert_eq!(response.bytes().unwrap().len(), 14);
    }

    #[test]
    fn quoted_charset() {
        assert_eq!(charset_of(r#"text/plain; charset="utf-8""#).as_deref(), Some("utf-8"));
    }
}
