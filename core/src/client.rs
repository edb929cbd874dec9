//! High-level client: one method per API operation.
//!
//! # Design
//! `ConstantContact` pairs a `Session` (request building and response
//! classification) with a `Transport` (the round-trip). It is constructed
//! explicitly and passed by reference; there is no global client. Every
//! operation makes one request, except subscribe/unsubscribe calls whose
//! requested membership already holds, which make none.

use serde_json::Value;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpResponse};
use crate::outcome::Outcome;
use crate::reconcile::{self, ListIds, ResourceId};
use crate::session::{ApiPath, Session};
use crate::transport::{Transport, UreqTransport};
use crate::types::{ActionBy, Contact, ContactList, NewContact, NewList};

/// Client for the contacts and lists endpoints.
#[derive(Debug, Clone)]
pub struct ConstantContact<T = UreqTransport> {
    session: Session,
    transport: T,
    update_action: ActionBy,
}

impl ConstantContact<UreqTransport> {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        Self::with_transport(config, UreqTransport::new())
    }

    /// Client configured from `CONSTANTCONTACT_*` environment variables.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::new(ClientConfig::from_env()?)
    }
}

impl<T: Transport> ConstantContact<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Result<Self, ApiError> {
        Ok(Self {
            session: Session::new(config)?,
            transport,
            update_action: ActionBy::Owner,
        })
    }

    /// `action_by` sent with contact updates. Defaults to `Owner`.
    pub fn with_update_action(mut self, action_by: ActionBy) -> Self {
        self.update_action = action_by;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn get(
        &self,
        path: impl Into<ApiPath>,
        query: &[(&str, &str)],
    ) -> Result<HttpResponse, ApiError> {
        self.transport
            .execute(self.session.request(HttpMethod::Get, path, query))
    }

    pub fn post(
        &self,
        path: impl Into<ApiPath>,
        body: &Value,
        query: &[(&str, &str)],
    ) -> Result<HttpResponse, ApiError> {
        let req = self
            .session
            .request_with_body(HttpMethod::Post, path, body, query)?;
        self.transport.execute(req)
    }

    pub fn put(
        &self,
        path: impl Into<ApiPath>,
        body: &Value,
        query: &[(&str, &str)],
    ) -> Result<HttpResponse, ApiError> {
        let req = self
            .session
            .request_with_body(HttpMethod::Put, path, body, query)?;
        self.transport.execute(req)
    }

    pub fn delete(&self, path: impl Into<ApiPath>) -> Result<HttpResponse, ApiError> {
        self.transport
            .execute(self.session.request(HttpMethod::Delete, path, &[]))
    }

    /// Every contact list on the account.
    pub fn lists(&self) -> Result<Outcome<Vec<ContactList>>, ApiError> {
        let response = self.transport.execute(self.session.build_lists())?;
        self.session.parse_lists(response)
    }

    pub fn get_list(
        &self,
        list: &(impl ResourceId + ?Sized),
    ) -> Result<Outcome<ContactList>, ApiError> {
        let response = self.transport.execute(self.session.build_get_list(list))?;
        self.session.parse_get_list(response)
    }

    /// Create a list. An existing list with the same name is acknowledged,
    /// not an error.
    pub fn create_list(&self, input: &NewList) -> Result<Outcome<ContactList>, ApiError> {
        let response = self
            .transport
            .execute(self.session.build_create_list(input)?)?;
        let outcome = self.session.parse_create_list(response)?;
        if let Some(list) = outcome.payload().filter(|_| outcome.was_created()) {
            info!(list_id = %list.id, name = %list.name, "created contact list");
        }
        Ok(outcome)
    }

    /// Create a contact. An already registered email is acknowledged, not
    /// an error.
    pub fn create_contact(&self, input: &NewContact) -> Result<Outcome<Contact>, ApiError> {
        let response = self
            .transport
            .execute(self.session.build_create_contact(input)?)?;
        let outcome = self.session.parse_create_contact(response)?;
        if let Some(contact) = outcome.payload().filter(|_| outcome.was_created()) {
            info!(contact_id = %contact.id(), "created contact");
        }
        Ok(outcome)
    }

    /// First contact with `email`, whatever its status.
    pub fn get_contact_by_email(&self, email: &str) -> Result<Outcome<Contact>, ApiError> {
        let response = self
            .transport
            .execute(self.session.build_contact_lookup(email))?;
        self.session.parse_contact_lookup(response)
    }

    pub fn get_contact(
        &self,
        contact: &(impl ResourceId + ?Sized),
    ) -> Result<Outcome<Contact>, ApiError> {
        let response = self
            .transport
            .execute(self.session.build_get_contact(contact))?;
        self.session.parse_get_contact(response)
    }

    /// Replace the server document with `contact`. On success the payload
    /// is `contact` itself.
    pub fn update_contact(&self, contact: &Contact) -> Result<Outcome<Contact>, ApiError> {
        let response = self
            .transport
            .execute(self.session.build_replace_contact(contact, self.update_action)?)?;
        self.session.parse_replace_contact(response, contact.clone())
    }

    /// Delete a contact. `ok` only on 204; the vendor keeps the contact
    /// with status `OPTOUT`, so a later lookup still finds it.
    pub fn delete_contact(
        &self,
        contact: &(impl ResourceId + ?Sized),
    ) -> Result<Outcome<()>, ApiError> {
        let response = self
            .transport
            .execute(self.session.build_delete_contact(contact))?;
        let outcome = self.session.parse_delete_contact(response);
        if outcome.is_ok() {
            info!(contact_id = %contact.resource_id(), "deleted contact");
        }
        Ok(outcome)
    }

    /// Add `contact` to `lists`. The payload is the snapshot with the
    /// union of old and new memberships.
    pub fn subscribe(
        &self,
        contact: &Contact,
        lists: impl ListIds,
    ) -> Result<Outcome<Contact>, ApiError> {
        let targets = lists.into_list_ids();
        match reconcile::plan_subscribe(contact, &targets) {
            Some(next) => self.update_contact(&next),
            None => {
                debug!(contact_id = %contact.id(), ?targets, "already subscribed");
                Ok(Outcome::fetched(contact.clone(), None))
            }
        }
    }

    /// Remove `contact` from `lists`. The payload is the snapshot without
    /// those memberships.
    pub fn unsubscribe(
        &self,
        contact: &Contact,
        lists: impl ListIds,
    ) -> Result<Outcome<Contact>, ApiError> {
        let targets = lists.into_list_ids();
        match reconcile::plan_unsubscribe(contact, &targets) {
            Some(next) => self.update_contact(&next),
            None => {
                debug!(contact_id = %contact.id(), ?targets, "not subscribed");
                Ok(Outcome::fetched(contact.clone(), None))
            }
        }
    }

    pub fn is_member(&self, contact: &Contact, list: impl ListIds) -> bool {
        contact.is_member(list)
    }
}
