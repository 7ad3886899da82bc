//! Allowed-method sets and the 405 / OPTIONS artifacts derived from them.
//!
//! HEAD and OPTIONS are admitted no matter what is configured. The `Allow`
//! header is always rebuilt by filtering [`KNOWN_METHODS`], so its order is
//! fixed and it never lists anything outside the configured set.

use axum::http::{Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Every method the gate knows about, in `Allow` header order.
pub const KNOWN_METHODS: [&str; 10] = [
    "OPTIONS", "GET", "HEAD", "POST", "PUT", "DELETE", "TRACE", "CONNECT", "PATCH", "PROPFIND",
];

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown HTTP method: {0}")]
pub struct UnknownMethod(pub String);

/// A normalized (upper-case, de-duplicated) set of HTTP method names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedMethods {
    methods: Vec<&'static str>,
}

impl AllowedMethods {
    pub fn new<I, S>(methods: I) -> Result<Self, UnknownMethod>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<&'static str> = Vec::new();
        for raw in methods {
            let upper = raw.as_ref().trim().to_ascii_uppercase();
            if upper.is_empty() {
                continue;
            }
            let known = KNOWN_METHODS
                .iter()
                .copied()
                .find(|m| *m == upper)
                .ok_or(UnknownMethod(upper))?;
            if !normalized.contains(&known) {
                normalized.push(known);
            }
        }
        Ok(Self { methods: normalized })
    }

    /// `GET, POST`
    pub fn collection_default() -> Self {
        Self {
            methods: vec!["GET", "POST"],
        }
    }

    /// `GET, PATCH, PUT, DELETE`
    pub fn entity_default() -> Self {
        Self {
            methods: vec!["GET", "PATCH", "PUT", "DELETE"],
        }
    }

    /// Parse a comma separated list such as `"get, post"`.
    pub fn parse_list(list: &str) -> Result<Self, UnknownMethod> {
        Self::new(list.split(','))
    }

    pub fn contains(&self, method: &str) -> bool {
        self.methods
            .iter()
            .any(|m| m.eq_ignore_ascii_case(method))
    }

    pub fn admits(&self, method: &Method) -> bool {
        *method == Method::HEAD || *method == Method::OPTIONS || self.contains(method.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.methods.iter().copied()
    }

    pub fn allow_header(&self) -> String {
        KNOWN_METHODS
            .iter()
            .filter(|m| self.contains(m))
            .copied()
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn method_not_allowed(&self) -> Response {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            [(header::ALLOW, self.allow_header())],
        )
            .into_response()
    }

    pub fn options_response(&self) -> Response {
        (StatusCode::NO_CONTENT, [(header::ALLOW, self.allow_header())]).into_response()
    }
}
