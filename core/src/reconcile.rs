//! List-membership reconciliation.
//!
//! # Design
//! Subscribing and unsubscribing are set operations over list ids. The
//! planners here are pure: they compare the requested ids with the
//! snapshot's memberships and either return `None` (nothing to change, so no
//! request is needed) or the replacement snapshot to send. Existing
//! membership entries are carried over untouched; new ones are bare
//! `{ "id": .. }` entries appended in request order.
//!
//! Anything naming a list can be passed where lists are expected: a bare id,
//! a `ContactList`, or a sequence of either. Mixed sequences use `ListRef`.

use std::collections::HashSet;

use crate::types::{Contact, ContactList, ListMembership};

/// Access to the remote identifier of a resource.
pub trait ResourceId {
    fn resource_id(&self) -> &str;
}

impl ResourceId for str {
    fn resource_id(&self) -> &str {
        self
    }
}

impl ResourceId for String {
    fn resource_id(&self) -> &str {
        self
    }
}

impl ResourceId for ContactList {
    fn resource_id(&self) -> &str {
        &self.id
    }
}

impl ResourceId for ListMembership {
    fn resource_id(&self) -> &str {
        &self.id
    }
}

impl ResourceId for Contact {
    fn resource_id(&self) -> &str {
        self.id()
    }
}

impl<T: ResourceId + ?Sized> ResourceId for &T {
    fn resource_id(&self) -> &str {
        (**self).resource_id()
    }
}

/// A list named either by bare id or by a fetched list resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListRef<'a> {
    Id(&'a str),
    List(&'a ContactList),
}

impl ResourceId for ListRef<'_> {
    fn resource_id(&self) -> &str {
        match self {
            ListRef::Id(id) => id,
            ListRef::List(list) => &list.id,
        }
    }
}

impl<'a> From<&'a str> for ListRef<'a> {
    fn from(id: &'a str) -> Self {
        ListRef::Id(id)
    }
}

impl<'a> From<&'a String> for ListRef<'a> {
    fn from(id: &'a String) -> Self {
        ListRef::Id(id)
    }
}

impl<'a> From<&'a ContactList> for ListRef<'a> {
    fn from(list: &'a ContactList) -> Self {
        ListRef::List(list)
    }
}

/// Conversion of one or many list references into bare ids.
///
/// The result keeps input order and drops repeated ids.
pub trait ListIds {
    fn into_list_ids(self) -> Vec<String>;
}

fn collect_ids<I>(items: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: ResourceId,
{
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for item in items {
        let id = item.resource_id();
        if seen.insert(id.to_string()) {
            ids.push(id.to_string());
        }
    }
    ids
}

impl ListIds for &str {
    fn into_list_ids(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl ListIds for String {
    fn into_list_ids(self) -> Vec<String> {
        vec![self]
    }
}

impl ListIds for &String {
    fn into_list_ids(self) -> Vec<String> {
        vec![self.clone()]
    }
}

impl ListIds for &ContactList {
    fn into_list_ids(self) -> Vec<String> {
        vec![self.id.clone()]
    }
}

impl ListIds for ListRef<'_> {
    fn into_list_ids(self) -> Vec<String> {
        vec![self.resource_id().to_string()]
    }
}

impl<T: ResourceId> ListIds for &[T] {
    fn into_list_ids(self) -> Vec<String> {
        collect_ids(self)
    }
}

impl<T: ResourceId> ListIds for &Vec<T> {
    fn into_list_ids(self) -> Vec<String> {
        collect_ids(self)
    }
}

impl<T: ResourceId> ListIds for Vec<T> {
    fn into_list_ids(self) -> Vec<String> {
        collect_ids(&self)
    }
}

impl<T: ResourceId, const N: usize> ListIds for [T; N] {
    fn into_list_ids(self) -> Vec<String> {
        collect_ids(&self)
    }
}

/// The snapshot to send so that `contact` is on every list in `targets`,
/// or `None` when it already is.
pub fn plan_subscribe(contact: &Contact, targets: &[String]) -> Option<Contact> {
    let current: HashSet<&str> = contact.list_ids().collect();
    let additions: Vec<&String> = targets
        .iter()
        .filter(|id| !current.contains(id.as_str()))
        .collect();
    if additions.is_empty() {
        return None;
    }

    let mut lists = contact.lists().to_vec();
    lists.extend(additions.into_iter().map(ListMembership::new));
    Some(contact.with_lists(lists))
}

/// The snapshot to send so that `contact` is on none of the lists in
/// `targets`, or `None` when it already is on none of them.
pub fn plan_unsubscribe(contact: &Contact, targets: &[String]) -> Option<Contact> {
    let removals: HashSet<&str> = targets.iter().map(String::as_str).collect();
    if !contact.list_ids().any(|id| removals.contains(id)) {
        return None;
    }

    let lists = contact
        .lists()
        .iter()
        .filter(|l| !removals.contains(l.id.as_str()))
        .cloned()
        .collect();
    Some(contact.with_lists(lists))
}
