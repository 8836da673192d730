//! Header merging across service and endpoint declarations.

use crate::endpoint::Endpoint;
use crate::service::Service;
use crate::types::Headers;

/// Service headers overwritten key-by-key by endpoint headers.
pub fn get_required_headers(service: &dyn Service, endpoint: &dyn Endpoint) -> Headers {
    overlay(service.required_headers(), endpoint.required_headers())
}

/// `base` overwritten key-by-key by `overlay`. Header names compare
/// case-insensitively; the overlay's spelling is kept.
pub(crate) fn overlay(mut base: Headers, overlay: Headers) -> Headers {
    for (name, value) in overlay {
        set_header(&mut base, name, value);
    }
    base
}

/// Insert `name`, replacing any header that differs from it only in case.
pub(crate) fn set_header(headers: &mut Headers, name: String, value: String) {
    headers.retain(|k, _| !k.eq_ignore_ascii_case(&name));
    headers.insert(name, value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::HttpEndpoint;
    use crate::service::StaticService;

    #[test]
    fn endpoint_headers_win() {
        let service = StaticService::new("s", ["http://a"]).with_header("a", "1");
        let endpoint = HttpEndpoint::get("/").with_header("a", "2").with_header("b", "3");
        let merged = get_required_headers(&service, &endpoint);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged["a"], "2");
        assert_eq!(merged["b"], "3");
    }

    #[test]
    fn disjoint_headers_union() {
        let service = StaticService::new("s", ["http://a"]).with_header("one", "two");
        let endpoint = HttpEndpoint::get("/").with_header("foo", "bar");
        let merged = get_required_headers(&service, &endpoint);
        assert_eq!(merged["one"], "two");
        assert_eq!(merged["foo"], "bar");
    }

    #[test]
    fn overlay_is_right_biased() {
        let base = Headers::from([("k".to_string(), "base".to_string())]);
        let top = Headers::from([("k".to_string(), "top".to_string())]);
        assert_eq!(overlay(base, top)["k"], "top");
    }

    #[test]
    fn overlay_ignores_header_case() {
        let base = Headers::from([
            ("Accept".to_string(), "*/*".to_string()),
            ("User-Agent".to_string(), "svc".to_string()),
        ]);
        let top = Headers::from([("accept".to_string(), "application/json".to_string())]);
        let merged = overlay(base, top);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged["accept"], "application/json");
        assert!(!merged.contains_key("Accept"));
    }

    #[test]
    fn endpoint_headers_win_across_case() {
        let service = StaticService::new("s", ["http://a"]).with_header("X-Env", "prod");
        let endpoint = HttpEndpoint::get("/").with_header("x-env", "staging");
        let merged = get_required_headers(&service, &endpoint);
        assert_eq!(merged, Headers::from([("x-env".to_string(), "staging".to_string())]));
    }
}
