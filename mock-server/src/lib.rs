//! In-memory stand-in for the Constant Contact v2 contacts and lists API.
//!
//! Serves the endpoints the client consumes under `/v2`, checks the
//! `api_key` query parameter and bearer token on every request, and
//! reproduces the vendor behaviour the client relies on: 409 for duplicate
//! list names and emails, `{meta, results}` envelopes on lookup, full
//! document replacement on `PUT`, and soft deletion (`OPTOUT`) on `DELETE`.

use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::get,
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{info, warn};
use uuid::Uuid;

pub const ACTION_BY_VISITOR: &str = "ACTION_BY_VISITOR";
pub const ACTION_BY_OWNER: &str = "ACTION_BY_OWNER";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListStatus {
    Hidden,
    Active,
    Removed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContactList {
    pub id: String,
    pub name: String,
    pub status: ListStatus,
    pub created_date: String,
    pub modified_date: String,
    pub contact_count: u64,
}

#[derive(Deserialize)]
pub struct CreateList {
    pub name: String,
    pub status: ListStatus,
}

/// Credentials every request must present.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub api_key: String,
    pub access_token: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            access_token: access_token.into(),
        }
    }
}

#[derive(Default)]
pub struct Store {
    next_id: u64,
    lists: BTreeMap<String, ContactList>,
    contacts: BTreeMap<String, Map<String, Value>>,
}

impl Store {
    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        (1000 + self.next_id).to_string()
    }

    fn contact_count(&self, list_id: &str) -> u64 {
        self.contacts
            .values()
            .filter(|c| c.get("status").and_then(Value::as_str) != Some("OPTOUT"))
            .filter(|c| list_ids(c).iter().any(|id| id == list_id))
            .count() as u64
    }

    fn with_count(&self, list: &ContactList) -> ContactList {
        ContactList {
            contact_count: self.contact_count(&list.id),
            ..list.clone()
        }
    }

    /// The first list id in `lists` that does not exist.
    fn unknown_list<'a>(&self, lists: &'a [String]) -> Option<&'a str> {
        lists
            .iter()
            .find(|id| !self.lists.contains_key(id.as_str()))
            .map(String::as_str)
    }
}

pub type Db = Arc<RwLock<Store>>;

#[derive(Clone)]
pub struct AppState {
    db: Db,
    credentials: Arc<Credentials>,
}

/// Vendor-style error body: an array of `{error_key, error_message}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiFault {
    pub error_key: String,
    pub error_message: String,
}

type Failure = (StatusCode, Json<Vec<ApiFault>>);

fn failure(status: StatusCode, key: &str, message: impl Into<String>) -> Failure {
    (
        status,
        Json(vec![ApiFault {
            error_key: key.to_string(),
            error_message: message.into(),
        }]),
    )
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Primary email address of a contact document.
pub fn primary_email(doc: &Map<String, Value>) -> Option<&str> {
    doc.get("email_addresses")?
        .as_array()?
        .first()?
        .get("email_address")?
        .as_str()
}

/// List ids of a contact document's `lists` array.
pub fn list_ids(doc: &Map<String, Value>) -> Vec<String> {
    doc.get("lists")
        .and_then(Value::as_array)
        .map(|lists| {
            lists
                .iter()
                .filter_map(|l| l.get("id").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

pub fn app(credentials: Credentials) -> Router {
    let state = AppState {
        db: Arc::new(RwLock::new(Store::default())),
        credentials: Arc::new(credentials),
    };
    let api = Router::new()
        .route("/lists", get(list_lists).post(create_list))
        .route("/lists/{id}", get(get_list))
        .route("/contacts", get(lookup_contacts).post(create_contact))
        .route(
            "/contacts/{id}",
            get(get_contact).put(replace_contact).delete(delete_contact),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_credentials,
        ))
        .with_state(state);
    Router::new().nest("/v2", api)
}

pub async fn run(listener: TcpListener, credentials: Credentials) -> Result<(), std::io::Error> {
    axum::serve(listener, app(credentials)).await
}

#[derive(Deserialize)]
struct AuthParams {
    api_key: Option<String>,
}

async fn require_credentials(
    State(state): State<AppState>,
    Query(auth): Query<AuthParams>,
    request: Request,
    next: Next,
) -> Result<Response, Failure> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let key_ok = auth.api_key.as_deref() == Some(state.credentials.api_key.as_str());
    let token_ok = token == Some(state.credentials.access_token.as_str());
    if key_ok && token_ok {
        Ok(next.run(request).await)
    } else {
        warn!(key_ok, token_ok, "rejected request");
        Err(failure(
            StatusCode::UNAUTHORIZED,
            "keymanagement.unauthorized",
            "Not Authorized",
        ))
    }
}

async fn list_lists(State(state): State<AppState>) -> Json<Vec<ContactList>> {
    let store = state.db.read().await;
    Json(store.lists.values().map(|l| store.with_count(l)).collect())
}

async fn create_list(
    State(state): State<AppState>,
    Json(input): Json<CreateList>,
) -> Result<(StatusCode, Json<ContactList>), Failure> {
    let mut store = state.db.write().await;
    if store.lists.values().any(|l| l.name == input.name) {
        return Err(failure(
            StatusCode::CONFLICT,
            "http.status.list.conflict.name",
            format!("A list named {} already exists.", input.name),
        ));
    }
    let stamp = now();
    let list = ContactList {
        id: store.allocate_id(),
        name: input.name,
        status: input.status,
        created_date: stamp.clone(),
        modified_date: stamp,
        contact_count: 0,
    };
    store.lists.insert(list.id.clone(), list.clone());
    info!(list_id = %list.id, "list created");
    Ok((StatusCode::CREATED, Json(list)))
}

async fn get_list(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ContactList>, StatusCode> {
    let store = state.db.read().await;
    store
        .lists
        .get(&id)
        .map(|l| Json(store.with_count(l)))
        .ok_or(StatusCode::NOT_FOUND)
}

#[derive(Deserialize)]
struct LookupParams {
    email: Option<String>,
    status: Option<String>,
}

async fn lookup_contacts(
    State(state): State<AppState>,
    Query(params): Query<LookupParams>,
) -> Json<Value> {
    let store = state.db.read().await;
    let results: Vec<&Map<String, Value>> = store
        .contacts
        .values()
        .filter(|c| match params.email.as_deref() {
            Some(email) => primary_email(c).is_some_and(|own| own.eq_ignore_ascii_case(email)),
            None => true,
        })
        .filter(|c| {
            let status = c.get("status").and_then(Value::as_str);
            match params.status.as_deref() {
                Some("ALL") => true,
                Some(wanted) => status == Some(wanted),
                None => status != Some("OPTOUT"),
            }
        })
        .collect();
    Json(json!({
        "meta": { "pagination": {} },
        "results": results,
    }))
}

#[derive(Deserialize)]
struct ActionParams {
    action_by: Option<String>,
}

fn action_by(params: &ActionParams) -> Result<&str, Failure> {
    match params.action_by.as_deref() {
        None => Ok(ACTION_BY_OWNER),
        Some(value @ (ACTION_BY_VISITOR | ACTION_BY_OWNER)) => Ok(value),
        Some(other) => Err(failure(
            StatusCode::BAD_REQUEST,
            "query.param.invalid",
            format!("Invalid action_by value {other}."),
        )),
    }
}

fn object(input: Value) -> Result<Map<String, Value>, Failure> {
    match input {
        Value::Object(map) => Ok(map),
        _ => Err(failure(
            StatusCode::BAD_REQUEST,
            "json.type.invalid",
            "Expected a JSON object.",
        )),
    }
}

/// Rewrite `lists` as `[{id, status}]`, checking every list exists.
fn normalise_lists(store: &Store, doc: &mut Map<String, Value>) -> Result<(), Failure> {
    let ids = list_ids(doc);
    if let Some(unknown) = store.unknown_list(&ids) {
        return Err(failure(
            StatusCode::BAD_REQUEST,
            "json.field.lists.invalid",
            format!("List {unknown} does not exist."),
        ));
    }
    let lists = ids
        .iter()
        .map(|id| json!({ "id": id, "status": "ACTIVE" }))
        .collect();
    doc.insert("lists".to_string(), Value::Array(lists));
    Ok(())
}

async fn create_contact(
    State(state): State<AppState>,
    Query(params): Query<ActionParams>,
    Json(input): Json<Value>,
) -> Result<(StatusCode, Json<Value>), Failure> {
    let source = action_by(&params)?.to_string();
    let mut doc = object(input)?;
    let email = primary_email(&doc)
        .map(str::to_string)
        .ok_or_else(|| {
            failure(
                StatusCode::BAD_REQUEST,
                "json.field.email_addresses.required",
                "An email address is required.",
            )
        })?;
    if list_ids(&doc).is_empty() {
        return Err(failure(
            StatusCode::BAD_REQUEST,
            "json.field.lists.required",
            "At least one list is required.",
        ));
    }

    let mut store = state.db.write().await;
    if store
        .contacts
        .values()
        .any(|c| primary_email(c).is_some_and(|own| own.eq_ignore_ascii_case(&email)))
    {
        return Err(failure(
            StatusCode::CONFLICT,
            "http.status.email_address.conflict",
            format!("Email address {email} is already in use."),
        ));
    }
    normalise_lists(&store, &mut doc)?;

    let id = store.allocate_id();
    let stamp = now();
    doc.insert("id".to_string(), json!(id));
    doc.insert("status".to_string(), json!("ACTIVE"));
    doc.insert(
        "email_addresses".to_string(),
        json!([{
            "id": Uuid::new_v4().to_string(),
            "status": "ACTIVE",
            "confirm_status": "NO_CONFIRMATION_REQUIRED",
            "opt_in_source": source,
            "opt_in_date": stamp,
            "email_address": email,
        }]),
    );
    doc.entry("first_name").or_insert_with(|| json!(""));
    doc.entry("last_name").or_insert_with(|| json!(""));
    doc.entry("source").or_insert_with(|| json!("API"));
    doc.insert("created_date".to_string(), json!(stamp));
    doc.insert("modified_date".to_string(), json!(stamp));

    store.contacts.insert(id.clone(), doc.clone());
    info!(contact_id = %id, "contact created");
    Ok((StatusCode::CREATED, Json(Value::Object(doc))))
}

async fn get_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    let store = state.db.read().await;
    store
        .contacts
        .get(&id)
        .map(|c| Json(Value::Object(c.clone())))
        .ok_or(StatusCode::NOT_FOUND)
}

async fn replace_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ActionParams>,
    Json(input): Json<Value>,
) -> Result<Json<Value>, Failure> {
    action_by(&params)?;
    let mut doc = object(input)?;

    let mut store = state.db.write().await;
    let Some(current) = store.contacts.get(&id) else {
        return Err(failure(
            StatusCode::NOT_FOUND,
            "http.status.not_found",
            format!("Contact {id} not found."),
        ));
    };
    let status = current.get("status").cloned().unwrap_or(Value::Null);
    let created = current.get("created_date").cloned().unwrap_or(Value::Null);
    normalise_lists(&store, &mut doc)?;

    doc.insert("id".to_string(), json!(id));
    doc.insert("status".to_string(), status);
    doc.insert("created_date".to_string(), created);
    doc.insert("modified_date".to_string(), json!(now()));
    store.contacts.insert(id.clone(), doc.clone());
    info!(contact_id = %id, lists = ?list_ids(&doc), "contact replaced");
    Ok(Json(Value::Object(doc)))
}

async fn delete_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    let mut store = state.db.write().await;
    let doc = store.contacts.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    doc.insert("status".to_string(), json!("OPTOUT"));
    doc.insert("lists".to_string(), json!([]));
    if let Some(Value::Array(emails)) = doc.get_mut("email_addresses") {
        for email in emails.iter_mut().filter_map(Value::as_object_mut) {
            email.insert("status".to_string(), json!("OPTOUT"));
        }
    }
    doc.insert("modified_date".to_string(), json!(now()));
    info!(contact_id = %id, "contact opted out");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn contact_list_serializes_to_json() {
        let list = ContactList {
            id: "1001".to_string(),
            name: "Test".to_string(),
            status: ListStatus::Hidden,
            created_date: "d".to_string(),
            modified_date: "d".to_string(),
            contact_count: 0,
        };
        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(json["id"], "1001");
        assert_eq!(json["status"], "HIDDEN");
        assert_eq!(json["contact_count"], 0);
    }

    #[test]
    fn create_list_rejects_unknown_status() {
        let result: Result<CreateList, _> =
            serde_json::from_str(r#"{"name":"x","status":"ARCHIVED"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn primary_email_reads_first_address() {
        let d = doc(json!({
            "email_addresses": [
                { "email_address": "first@example.com" },
                { "email_address": "second@example.com" }
            ]
        }));
        assert_eq!(primary_email(&d), Some("first@example.com"));
        assert_eq!(primary_email(&doc(json!({ "email_addresses": [] }))), None);
        assert_eq!(primary_email(&doc(json!({}))), None);
    }

    #[test]
    fn list_ids_skips_malformed_entries() {
        let d = doc(json!({ "lists": [{ "id": "1" }, { "name": "no id" }, { "id": "2" }] }));
        assert_eq!(list_ids(&d), vec!["1", "2"]);
        assert!(list_ids(&doc(json!({}))).is_empty());
    }

    #[test]
    fn action_by_defaults_to_owner_and_rejects_unknown() {
        assert_eq!(action_by(&ActionParams { action_by: None }).unwrap(), ACTION_BY_OWNER);
        let visitor = ActionParams {
            action_by: Some(ACTION_BY_VISITOR.to_string()),
        };
        assert_eq!(action_by(&visitor).unwrap(), ACTION_BY_VISITOR);
        let bogus = ActionParams {
            action_by: Some("ACTION_BY_ROBOT".to_string()),
        };
        assert_eq!(action_by(&bogus).unwrap_err().0, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn store_ids_are_numeric_strings() {
        let mut store = Store::default();
        assert_eq!(store.allocate_id(), "1001");
        assert_eq!(store.allocate_id(), "1002");
    }
}
