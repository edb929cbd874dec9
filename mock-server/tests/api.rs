use axum::http::{self, Request, StatusCode};
use axum::Router;
use ctct_mock_server::{app, ApiFault, ContactList, Credentials};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::{Service, ServiceExt};

const AUTH: &str = "api_key=key";

fn test_app() -> Router {
    app(Credentials::new("key", "token"))
}

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn authed(method: &str, uri: &str, body: &str) -> Request<String> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::AUTHORIZATION, "Bearer token");
    if !body.is_empty() {
        builder = builder.header(http::header::CONTENT_TYPE, "application/json");
    }
    builder.body(body.to_string()).unwrap()
}

async fn send(app: &mut Router, request: Request<String>) -> axum::response::Response {
    ServiceExt::<Request<String>>::ready(app)
        .await
        .unwrap()
        .call(request)
        .await
        .unwrap()
}

// --- auth ---

#[tokio::test]
async fn missing_api_key_is_unauthorized() {
    let resp = test_app()
        .oneshot(authed("GET", "/v2/lists", ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let faults: Vec<ApiFault> = body_json(resp).await;
    assert_eq!(faults[0].error_key, "keymanagement.unauthorized");
}

#[tokio::test]
async fn wrong_token_is_unauthorized() {
    let request = Request::builder()
        .uri(format!("/v2/lists?{AUTH}"))
        .header(http::header::AUTHORIZATION, "Bearer nope")
        .body(String::new())
        .unwrap();
    let resp = test_app().oneshot(request).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- lists ---

#[tokio::test]
async fn list_lists_empty() {
    let resp = test_app()
        .oneshot(authed("GET", &format!("/v2/lists?{AUTH}"), ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let lists: Vec<ContactList> = body_json(resp).await;
    assert!(lists.is_empty());
}

#[tokio::test]
async fn create_list_twice_conflicts() {
    let mut app = test_app();
    let uri = format!("/v2/lists?{AUTH}");
    let body = r#"{"name":"Weekly","status":"HIDDEN"}"#;

    let resp = send(&mut app, authed("POST", &uri, body)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let list: ContactList = body_json(resp).await;
    assert_eq!(list.name, "Weekly");
    assert_eq!(list.contact_count, 0);

    let resp = send(&mut app, authed("POST", &uri, body)).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = send(&mut app, authed("GET", &format!("/v2/lists/{}?{AUTH}", list.id), "")).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn get_list_not_found() {
    let resp = test_app()
        .oneshot(authed("GET", &format!("/v2/lists/999?{AUTH}"), ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- contacts ---

#[tokio::test]
async fn create_contact_requires_existing_list() {
    let resp = test_app()
        .oneshot(authed(
            "POST",
            &format!("/v2/contacts?{AUTH}&action_by=ACTION_BY_OWNER"),
            r#"{"email_addresses":[{"email_address":"a@example.com"}],"lists":[{"id":"42"}]}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn lookup_unknown_email_returns_empty_results() {
    let resp = test_app()
        .oneshot(authed(
            "GET",
            &format!("/v2/contacts?{AUTH}&email=nobody@example.com&status=ALL"),
            "",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["results"], serde_json::json!([]));
}

#[tokio::test]
async fn replace_unknown_contact_not_found() {
    let resp = test_app()
        .oneshot(authed(
            "PUT",
            &format!("/v2/contacts/999?{AUTH}&action_by=ACTION_BY_OWNER"),
            r#"{"id":"999","lists":[]}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- full contact lifecycle ---

#[tokio::test]
async fn contact_lifecycle() {
    let mut app = test_app();

    // list to subscribe to
    let resp = send(
        &mut app,
        authed("POST", &format!("/v2/lists?{AUTH}"), r#"{"name":"L1","status":"ACTIVE"}"#),
    )
    .await;
    let list: ContactList = body_json(resp).await;

    // create
    let create_body = format!(
        r#"{{"email_addresses":[{{"email_address":"walk@example.com"}}],"lists":[{{"id":"{}"}}],"first_name":"Walk","last_name":"Dog"}}"#,
        list.id
    );
    let resp = send(
        &mut app,
        authed("POST", &format!("/v2/contacts?{AUTH}&action_by=ACTION_BY_OWNER"), &create_body),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = body_json(resp).await;
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["status"], "ACTIVE");
    assert_eq!(created["first_name"], "Walk");
    assert_eq!(created["email_addresses"][0]["opt_in_source"], "ACTION_BY_OWNER");
    assert_eq!(created["lists"][0]["id"], list.id.as_str());

    // duplicate email
    let resp = send(
        &mut app,
        authed("POST", &format!("/v2/contacts?{AUTH}"), &create_body),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // list count reflects the membership
    let resp = send(&mut app, authed("GET", &format!("/v2/lists/{}?{AUTH}", list.id), "")).await;
    let fetched: ContactList = body_json(resp).await;
    assert_eq!(fetched.contact_count, 1);

    // replace: drop the list, keep other fields
    let mut replacement = created.clone();
    replacement["lists"] = serde_json::json!([]);
    replacement["custom"] = serde_json::json!("kept");
    let resp = send(
        &mut app,
        authed(
            "PUT",
            &format!("/v2/contacts/{id}?{AUTH}&action_by=ACTION_BY_OWNER"),
            &replacement.to_string(),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let replaced: Value = body_json(resp).await;
    assert_eq!(replaced["lists"], serde_json::json!([]));
    assert_eq!(replaced["custom"], "kept");
    assert_eq!(replaced["first_name"], "Walk");

    // delete
    let resp = send(&mut app, authed("DELETE", &format!("/v2/contacts/{id}?{AUTH}"), "")).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    // default lookup hides opted-out contacts
    let resp = send(
        &mut app,
        authed("GET", &format!("/v2/contacts?{AUTH}&email=walk@example.com"), ""),
    )
    .await;
    let body: Value = body_json(resp).await;
    assert_eq!(body["results"], serde_json::json!([]));

    // status=ALL finds them, opted out
    let resp = send(
        &mut app,
        authed("GET", &format!("/v2/contacts?{AUTH}&email=walk@example.com&status=ALL"), ""),
    )
    .await;
    let body: Value = body_json(resp).await;
    assert_eq!(body["results"][0]["id"], id.as_str());
    assert_eq!(body["results"][0]["status"], "OPTOUT");

    // delete again: still stored, so still 204
    let resp = send(&mut app, authed("DELETE", &format!("/v2/contacts/{id}?{AUTH}"), "")).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    // unknown id
    let resp = send(&mut app, authed("DELETE", &format!("/v2/contacts/1?{AUTH}"), "")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
