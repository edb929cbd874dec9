//! Synchronous client for the Constant Contact v2 contacts and lists API.
//!
//! # Overview
//! Builds authenticated requests, executes them with a blocking transport,
//! and classifies each response into an `Outcome` that separates success,
//! "already in the requested state" and genuine API errors. Contacts can be
//! subscribed to and unsubscribed from lists; both are set operations on
//! list ids that skip the network when nothing would change.
//!
//! # Design
//! - `Session` is stateless apart from its configuration: `build_*` methods
//!   produce `HttpRequest` values and `parse_*` methods consume
//!   `HttpResponse` values, so both halves are testable without I/O.
//! - `Transport` performs the single round-trip; `UreqTransport` is the
//!   default.
//! - `ConstantContact` ties the two together, one method per operation.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.
//!
//! ```no_run
//! use ctct_core::{ClientConfig, ConstantContact, NewContact};
//!
//! # fn main() -> Result<(), ctct_core::ApiError> {
//! let cc = ConstantContact::new(ClientConfig::new("key", "token"))?;
//! let created = cc.create_contact(&NewContact::new("a@example.com", "1001"))?;
//! if let Some(contact) = created.payload() {
//!     cc.subscribe(contact, ["1002", "1003"])?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod outcome;
pub mod reconcile;
pub mod session;
pub mod transport;
pub mod types;

pub use client::ConstantContact;
pub use config::ClientConfig;
pub use error::{ApiError, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use outcome::{classify, Operation, Outcome, Verdict};
pub use reconcile::{ListIds, ListRef, ResourceId};
pub use session::{ApiPath, Session};
pub use transport::{Transport, UreqTransport};
pub use types::{
    ActionBy, Contact, ContactList, EmailAddress, ListMembership, ListStatus, NewContact, NewList,
    ResultSet,
};
