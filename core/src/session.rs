//! Request building and response parsing for the contacts and lists API.
//!
//! # Design
//! `Session` holds only the validated `ClientConfig` and carries no mutable
//! state between calls. Each endpoint is split into a `build_*` method that
//! produces an `HttpRequest` with the credentials already attached and a
//! `parse_*` method that turns the `HttpResponse` into an `Outcome`. The
//! round-trip in between belongs to a `Transport`.

use serde_json::Value;
use tracing::warn;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::outcome::{Operation, Outcome};
use crate::reconcile::ResourceId;
use crate::types::{ActionBy, Contact, ContactList, NewContact, NewList, ResultSet};

const API_KEY_PARAM: &str = "api_key";

/// A request path: one string, or segments joined with `/`.
///
/// A `Single` path is used as written. Each of the `Segments` is
/// percent-encoded, so an id can never add path, query or fragment parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiPath {
    Single(String),
    Segments(Vec<String>),
}

impl ApiPath {
    fn render(&self) -> String {
        match self {
            ApiPath::Single(path) => path.clone(),
            ApiPath::Segments(segments) => segments
                .iter()
                .map(|s| urlencoding::encode(s))
                .collect::<Vec<_>>()
                .join("/"),
        }
    }
}

impl From<&str> for ApiPath {
    fn from(path: &str) -> Self {
        ApiPath::Single(path.to_string())
    }
}

impl From<String> for ApiPath {
    fn from(path: String) -> Self {
        ApiPath::Single(path)
    }
}

impl From<Vec<String>> for ApiPath {
    fn from(segments: Vec<String>) -> Self {
        ApiPath::Segments(segments)
    }
}

impl From<&[&str]> for ApiPath {
    fn from(segments: &[&str]) -> Self {
        ApiPath::Segments(segments.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for ApiPath {
    fn from(segments: [&str; N]) -> Self {
        ApiPath::Segments(segments.iter().map(|s| s.to_string()).collect())
    }
}

/// Authenticated request builder bound to one API root.
#[derive(Debug, Clone)]
pub struct Session {
    config: ClientConfig,
}

impl Session {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        Ok(Self {
            config: config.validated()?,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Absolute URL for `path` under the configured API root.
    pub fn resolve(&self, path: impl Into<ApiPath>) -> String {
        let path = path.into().render();
        format!("{}{}", self.config.api_root, path.trim_start_matches('/'))
    }

    /// A body-less request carrying the credentials and `query`.
    pub fn request(
        &self,
        method: HttpMethod,
        path: impl Into<ApiPath>,
        query: &[(&str, &str)],
    ) -> HttpRequest {
        let mut params = vec![(API_KEY_PARAM.to_string(), self.config.api_key.clone())];
        for (key, value) in query {
            if *key == API_KEY_PARAM {
                warn!("ignoring call-specific api_key query parameter");
                continue;
            }
            params.push((key.to_string(), value.to_string()));
        }
        HttpRequest {
            method,
            url: self.resolve(path),
            query: params,
            headers: vec![(
                "authorization".to_string(),
                format!("Bearer {}", self.config.access_token),
            )],
            body: None,
        }
    }

    /// A request with a JSON body.
    pub fn request_with_body(
        &self,
        method: HttpMethod,
        path: impl Into<ApiPath>,
        body: &Value,
        query: &[(&str, &str)],
    ) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(body).map_err(|e| ApiError::Serialization(e.to_string()))?;
        let mut req = self.request(method, path, query);
        req.headers
            .push(("content-type".to_string(), "application/json".to_string()));
        req.body = Some(body);
        Ok(req)
    }

    pub fn build_lists(&self) -> HttpRequest {
        self.request(HttpMethod::Get, "lists", &[])
    }

    pub fn build_get_list(&self, list: &(impl ResourceId + ?Sized)) -> HttpRequest {
        self.request(HttpMethod::Get, ["lists", list.resource_id()], &[])
    }

    pub fn build_create_list(&self, input: &NewList) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_value(input).map_err(|e| ApiError::Serialization(e.to_string()))?;
        self.request_with_body(HttpMethod::Post, "lists", &body, &[])
    }

    pub fn build_create_contact(&self, input: &NewContact) -> Result<HttpRequest, ApiError> {
        self.request_with_body(
            HttpMethod::Post,
            "contacts",
            &input.to_document(),
            &[("action_by", input.action_by.as_str())],
        )
    }

    /// Lookup by email across every status, so opted-out contacts are found.
    pub fn build_contact_lookup(&self, email: &str) -> HttpRequest {
        self.request(
            HttpMethod::Get,
            "contacts",
            &[("email", email), ("status", "ALL")],
        )
    }

    pub fn build_get_contact(&self, contact: &(impl ResourceId + ?Sized)) -> HttpRequest {
        self.request(HttpMethod::Get, ["contacts", contact.resource_id()], &[])
    }

    /// Full replace of `contact`; the whole document is sent.
    pub fn build_replace_contact(
        &self,
        contact: &Contact,
        action_by: ActionBy,
    ) -> Result<HttpRequest, ApiError> {
        self.request_with_body(
            HttpMethod::Put,
            ["contacts", contact.id()],
            &contact.to_document(),
            &[("action_by", action_by.as_str())],
        )
    }

    pub fn build_delete_contact(&self, contact: &(impl ResourceId + ?Sized)) -> HttpRequest {
        self.request(HttpMethod::Delete, ["contacts", contact.resource_id()], &[])
    }

    pub fn parse_lists(&self, response: HttpResponse) -> Result<Outcome<Vec<ContactList>>, ApiError> {
        Outcome::from_response(Operation::Fetch, response, |r| r.json().map(Some))
    }

    pub fn parse_get_list(&self, response: HttpResponse) -> Result<Outcome<ContactList>, ApiError> {
        Outcome::from_response(Operation::Fetch, response, |r| r.json().map(Some))
    }

    pub fn parse_create_list(&self, response: HttpResponse) -> Result<Outcome<ContactList>, ApiError> {
        Outcome::from_response(Operation::Create, response, |r| r.json().map(Some))
    }

    pub fn parse_create_contact(&self, response: HttpResponse) -> Result<Outcome<Contact>, ApiError> {
        Outcome::from_response(Operation::Create, response, |r| r.json().map(Some))
    }

    /// First match of an email lookup; no match is an acknowledged absence.
    pub fn parse_contact_lookup(&self, response: HttpResponse) -> Result<Outcome<Contact>, ApiError> {
        Outcome::from_response(Operation::Lookup, response, |r| {
            let set: ResultSet<Contact> = r.json()?;
            Ok(set.results.into_iter().next())
        })
    }

    pub fn parse_get_contact(&self, response: HttpResponse) -> Result<Outcome<Contact>, ApiError> {
        Outcome::from_response(Operation::Fetch, response, |r| r.json().map(Some))
    }

    /// On success the payload is `sent`, the snapshot that was submitted;
    /// the server copy is not re-read.
    pub fn parse_replace_contact(
        &self,
        response: HttpResponse,
        sent: Contact,
    ) -> Result<Outcome<Contact>, ApiError> {
        Outcome::from_response(Operation::Replace, response, |_| Ok(Some(sent)))
    }

    pub fn parse_delete_contact(&self, response: HttpResponse) -> Outcome<()> {
        Outcome::deleted(response)
    }
}
