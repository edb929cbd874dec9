//! Classification of API responses.
//!
//! # Design
//! The vendor answers "nothing to do" (409 on a duplicate create, an empty
//! result set on a lookup, any non-204 on delete) with the same machinery
//! as real failures. `classify` separates the two so that callers can
//! branch on `is_ok` / `is_error` instead of reading status codes:
//!
//! | shape        | ok    | is_error | was_created | payload |
//! |--------------|-------|----------|-------------|---------|
//! | fetched      | true  | false    | false       | yes     |
//! | created      | true  | false    | true        | yes     |
//! | acknowledged | false | false    | false       | no      |
//! | failure      | false | true     | false       | no      |
//!
//! `deleted` is `acknowledged` with `ok` set when the status is 204.

use tracing::warn;

use crate::error::ApiError;
use crate::http::HttpResponse;

/// The kind of call a response belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `GET` of a collection or a single resource.
    Fetch,
    /// `GET` with a filter; an empty result set is not an error.
    Lookup,
    /// `POST` of a new resource; 409 means it already exists.
    Create,
    /// `PUT` of a full resource document.
    Replace,
    /// `DELETE`; never an error, `ok` only on 204.
    Delete,
}

impl Operation {
    pub fn expected_status(self) -> u16 {
        match self {
            Operation::Fetch | Operation::Lookup | Operation::Replace => 200,
            Operation::Create => 201,
            Operation::Delete => 204,
        }
    }
}

/// Status-level reading of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Success,
    /// The server answered, and the requested state already holds or
    /// nothing matched.
    Acknowledged,
    Failure,
}

pub fn classify(operation: Operation, status: u16) -> Verdict {
    if status == operation.expected_status() {
        return Verdict::Success;
    }
    match (operation, status) {
        (Operation::Create, 409) => Verdict::Acknowledged,
        (Operation::Delete, _) => Verdict::Acknowledged,
        _ => Verdict::Failure,
    }
}

/// Result of one API operation.
#[derive(Debug, Clone)]
pub struct Outcome<T> {
    ok: bool,
    is_error: bool,
    was_created: bool,
    payload: Option<T>,
    response: Option<HttpResponse>,
}

impl<T> Outcome<T> {
    /// A resource was read. `response` is `None` when no request was needed.
    pub fn fetched(payload: T, response: Option<HttpResponse>) -> Self {
        Self {
            ok: true,
            is_error: false,
            was_created: false,
            payload: Some(payload),
            response,
        }
    }

    pub fn created(payload: T, response: HttpResponse) -> Self {
        Self {
            ok: true,
            is_error: false,
            was_created: true,
            payload: Some(payload),
            response: Some(response),
        }
    }

    pub fn acknowledged(response: HttpResponse) -> Self {
        Self {
            ok: false,
            is_error: false,
            was_created: false,
            payload: None,
            response: Some(response),
        }
    }

    pub fn failure(response: HttpResponse) -> Self {
        Self {
            ok: false,
            is_error: true,
            was_created: false,
            payload: None,
            response: Some(response),
        }
    }

    pub fn deleted(response: HttpResponse) -> Self {
        Self {
            ok: response.status == Operation::Delete.expected_status(),
            is_error: false,
            was_created: false,
            payload: None,
            response: Some(response),
        }
    }

    /// Build the outcome for `response`. `decode` runs only on a success
    /// status and returns `None` when the body holds no resource.
    pub fn from_response<F>(
        operation: Operation,
        response: HttpResponse,
        decode: F,
    ) -> Result<Self, ApiError>
    where
        F: FnOnce(&HttpResponse) -> Result<Option<T>, ApiError>,
    {
        if operation == Operation::Delete {
            return Ok(Self::deleted(response));
        }
        match classify(operation, response.status) {
            Verdict::Success => Ok(match decode(&response)? {
                Some(payload) if operation == Operation::Create => Self::created(payload, response),
                Some(payload) => Self::fetched(payload, Some(response)),
                None => Self::acknowledged(response),
            }),
            Verdict::Acknowledged => Ok(Self::acknowledged(response)),
            Verdict::Failure => {
                warn!(
                    ?operation,
                    status = response.status,
                    body = %response.body,
                    "API request failed"
                );
                Ok(Self::failure(response))
            }
        }
    }

    pub fn is_ok(&self) -> bool {
        self.ok
    }

    pub fn is_error(&self) -> bool {
        self.is_error
    }

    pub fn was_created(&self) -> bool {
        self.was_created
    }

    pub fn payload(&self) -> Option<&T> {
        self.payload.as_ref()
    }

    pub fn into_payload(self) -> Option<T> {
        self.payload
    }

    /// The transport response, kept for diagnostics.
    pub fn response(&self) -> Option<&HttpResponse> {
        self.response.as_ref()
    }

    pub fn status(&self) -> Option<u16> {
        self.response.as_ref().map(|r| r.status)
    }

    pub fn map<U, F>(self, f: F) -> Outcome<U>
    where
        F: FnOnce(T) -> U,
    {
        Outcome {
            ok: self.ok,
            is_error: self.is_error,
            was_created: self.was_created,
            payload: self.payload.map(f),
            response: self.response,
        }
    }
}
