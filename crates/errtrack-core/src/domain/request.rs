//! Request context snapshots
//!
//! The host supplies a read-only [`RequestContext`] describing the request
//! that was being served when the fault was raised. Hosts without a request
//! (background jobs, CLIs) pass [`RequestContext::default`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// HTTP headers with case-insensitive names
///
/// Names are lowercased on insertion; a name may carry several values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Headers(BTreeMap<String, Vec<String>>);

impl Headers {
    /// Creates an empty header map
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value under `name`
    pub fn append(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.0
            .entry(name.as_ref().to_ascii_lowercase())
            .or_default()
            .push(value.into());
    }

    /// Replaces all values under `name`
    pub fn set(&mut self, name: impl AsRef<str>, values: Vec<String>) {
        self.0.insert(name.as_ref().to_ascii_lowercase(), values);
    }

    /// Builder-style [`Headers::append`]
    pub fn with(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.append(name, value);
        self
    }

    /// Returns all values for `name` (case-insensitive)
    pub fn get_all(&self, name: &str) -> Option<&[String]> {
        self.0
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
    }

    /// Returns the first value for `name` (case-insensitive)
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over `(name, values)` pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.append(name, value);
        }
        headers
    }
}

/// The authenticated principal attached to a request
///
/// Only `id`, `email` and `name` are ever copied into a report; everything
/// in `attributes` stays inside the process.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub attributes: BTreeMap<String, Value>,
}

impl AuthenticatedUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

/// Read-only snapshot of the request being served when a fault was raised
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    /// Full request URL including query string
    pub url: String,
    /// HTTP method, uppercase
    pub method: String,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub headers: Headers,
    pub query_params: Map<String, Value>,
    /// Parsed request body fields; values may nest arbitrarily
    pub body_fields: Map<String, Value>,
    pub authenticated_user: Option<AuthenticatedUser>,
}

impl RequestContext {
    /// Creates a context for the given method and URL
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_client_ip(mut self, ip: impl Into<String>) -> Self {
        self.client_ip = Some(ip.into());
        self
    }

    /// Sets the user agent; also recorded as the `user-agent` header if absent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        let user_agent = user_agent.into();
        if !self.headers.contains("user-agent") {
            self.headers.append("user-agent", user_agent.clone());
        }
        self.user_agent = Some(user_agent);
        self
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_query(mut self, query: Map<String, Value>) -> Self {
        self.query_params = query;
        self
    }

    pub fn with_body(mut self, body: Map<String, Value>) -> Self {
        self.body_fields = body;
        self
    }

    pub fn with_user(mut self, user: AuthenticatedUser) -> Self {
        self.authenticated_user = Some(user);
        self
    }
}
