//! Services: logical backends with one or more candidate hosts.
//!
//! # Design
//! `Service` is the read-only capability set the dispatcher needs. Hosts are
//! fetched on every call through `get_hosts`, so an implementation backed by
//! service discovery can change its answer between calls.

use crate::types::Headers;

/// A logical backend reachable at one or more base URLs.
pub trait Service {
    /// Name used in errors and logs.
    fn name(&self) -> &str;

    /// Candidate base URLs, e.g. `https://api.example.com/v2`.
    fn get_hosts(&self) -> Vec<String>;

    /// Headers sent with every request to this service.
    fn required_headers(&self) -> Headers {
        Headers::new()
    }
}

/// A service with a fixed list of hosts.
#[derive(Debug, Clone, Default)]
pub struct StaticService {
    name: String,
    hosts: Vec<String>,
    required_headers: Headers,
}

impl StaticService {
    pub fn new(name: &str, hosts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: name.to_string(),
            hosts: hosts.into_iter().map(Into::into).collect(),
            required_headers: Headers::new(),
        }
    }

    /// A service reachable at exactly one domain.
    pub fn from_domain(name: &str, domain: &str) -> Self {
        Self::new(name, [domain])
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.required_headers
            .insert(name.to_string(), value.to_string());
        self
    }
}

impl Service for StaticService {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_hosts(&self) -> Vec<String> {
        self.hosts.clone()
    }

    fn required_headers(&self) -> Headers {
        self.required_headers.clone()
    }
}

/// Looks up the current hosts for a service name.
pub trait HostResolver {
    fn resolve(&self, service_name: &str) -> Vec<String>;
}

impl<F> HostResolver for F
where
    F: Fn(&str) -> Vec<String>,
{
    fn resolve(&self, service_name: &str) -> Vec<String> {
        self(service_name)
    }
}

/// A service whose hosts come from a resolver at call time.
#[derive(Debug, Clone)]
pub struct DiscoverableService<R> {
    name: String,
    resolver: R,
    required_headers: Headers,
}

impl<R: HostResolver> DiscoverableService<R> {
    pub fn new(name: &str, resolver: R) -> Self {
        Self {
            name: name.to_string(),
            resolver,
            required_headers: Headers::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.required_headers
            .insert(name.to_string(), value.to_string());
        self
    }
}

impl<R: HostResolver> Service for DiscoverableService<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_hosts(&self) -> Vec<String> {
        self.resolver.resolve(&self.name)
    }

    fn required_headers(&self) -> Headers {
        self.required_headers.clone()
    }
}
