use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::{app, Client, DashboardStats, Invoice, Product, Token, User};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

async fn detail(response: axum::response::Response) -> String {
    let body: serde_json::Value = body_json(response).await;
    body["detail"].as_str().unwrap().to_string()
}

fn request(method: &str, uri: &str, token: Option<&str>, body: &str) -> Request<String> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(body.to_string()).unwrap()
}

async fn send(app: &Router, req: Request<String>) -> axum::response::Response {
    app.clone().oneshot(req).await.unwrap()
}

/// Register a user and log in, returning the bearer token.
async fn sign_in(app: &Router, email: &str) -> String {
    let body = format!(r#"{{"email":"{email}","full_name":"Test User","password":"secret"}}"#);
    let resp = send(app, request("POST", "/api/v1/users/", None, &body)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body = format!(r#"{{"username":"{email}","password":"secret"}}"#);
    let resp = send(app, request("POST", "/api/v1/auth/login", None, &body)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let token: Token = body_json(resp).await;
    assert_eq!(token.token_type, "bearer");
    token.access_token
}

// --- users & auth ---

#[tokio::test]
async fn create_user_hides_password() {
    let app = app();
    let resp = send(
        &app,
        request(
            "POST",
            "/api/v1/users/",
            None,
            r#"{"email":"jane@example.com","full_name":"Jane","password":"pw"}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["email"], "jane@example.com");
    assert_eq!(body["is_active"], true);
    assert!(body.get("password").is_none());
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let app = app();
    sign_in(&app, "dup@example.com").await;
    let resp = send(
        &app,
        request(
            "POST",
            "/api/v1/users/",
            None,
            r#"{"email":"dup@example.com","full_name":"Again","password":"pw"}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(detail(resp).await, "Email already registered");
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let app = app();
    sign_in(&app, "pw@example.com").await;
    let resp = send(
        &app,
        request(
            "POST",
            "/api/v1/auth/login",
            None,
            r#"{"username":"pw@example.com","password":"nope"}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(detail(resp).await, "Incorrect email or password");
}

#[tokio::test]
async fn get_user_not_found() {
    let app = app();
    let resp = send(&app, request("GET", "/api/v1/users/42", None, "")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(detail(resp).await, "User not found");
}

#[tokio::test]
async fn users_list_paginates() {
    let app = app();
    for n in 0..3 {
        sign_in(&app, &format!("u{n}@example.com")).await;
    }
    let resp = send(&app, request("GET", "/api/v1/users/?skip=1&limit=1", None, "")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let users: Vec<User> = body_json(resp).await;
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].email, "u1@example.com");
}

// --- authentication on scoped routes ---

#[tokio::test]
async fn missing_credential_is_forbidden() {
    let app = app();
    let resp = send(&app, request("GET", "/api/v1/clients/", None, "")).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(detail(resp).await, "Not authenticated");
}

#[tokio::test]
async fn null_bearer_is_unauthorized() {
    let app = app();
    let resp = send(&app, request("GET", "/api/v1/clients/", Some("null"), "")).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(detail(resp).await, "Could not validate credentials");
}

#[tokio::test]
async fn records_are_scoped_to_owner() {
    let app = app();
    let alice = sign_in(&app, "alice@example.com").await;
    let bob = sign_in(&app, "bob@example.com").await;

    let resp = send(
        &app,
        request("POST", "/api/v1/clients/", Some(&alice), r#"{"name":"Acme","email":"a@acme.test"}"#),
    )
    .await;
    let acme: Client = body_json(resp).await;

    let resp = send(&app, request("GET", &format!("/api/v1/clients/{}", acme.id), Some(&bob), "")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(detail(resp).await, "Client not found");

    let resp = send(&app, request("GET", "/api/v1/clients/", Some(&bob), "")).await;
    let clients: Vec<Client> = body_json(resp).await;
    assert!(clients.is_empty());
}

// --- clients ---

#[tokio::test]
async fn client_update_clears_address_with_null() {
    let app = app();
    let token = sign_in(&app, "owner@example.com").await;
    let resp = send(
        &app,
        request(
            "POST",
            "/api/v1/clients/",
            Some(&token),
            r#"{"name":"Acme","email":"a@acme.test","address":"1 Main St"}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Client = body_json(resp).await;
    assert_eq!(created.address.as_deref(), Some("1 Main St"));

    let uri = format!("/api/v1/clients/{}", created.id);
    let resp = send(&app, request("PUT", &uri, Some(&token), r#"{"name":"Acme Corp"}"#)).await;
    let renamed: Client = body_json(resp).await;
    assert_eq!(renamed.name, "Acme Corp");
    assert_eq!(renamed.address.as_deref(), Some("1 Main St"));

    let resp = send(&app, request("PUT", &uri, Some(&token), r#"{"address":null}"#)).await;
    let cleared: Client = body_json(resp).await;
    assert!(cleared.address.is_none());
}

// --- products ---

#[tokio::test]
async fn product_currency_defaults_to_usd() {
    let app = app();
    let token = sign_in(&app, "seller@example.com").await;
    let resp = send(
        &app,
        request("POST", "/api/v1/products/", Some(&token), r#"{"name":"Consulting","price":150.0}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let product: Product = body_json(resp).await;
    assert_eq!(product.currency, "USD");
    assert!(product.description.is_none());
}

#[tokio::test]
async fn delete_product_returns_empty_204_then_404() {
    let app = app();
    let token = sign_in(&app, "seller@example.com").await;
    let resp = send(
        &app,
        request("POST", "/api/v1/products/", Some(&token), r#"{"name":"Widget","price":2.5}"#),
    )
    .await;
    let product: Product = body_json(resp).await;
    let uri = format!("/api/v1/products/{}", product.id);

    let resp = send(&app, request("DELETE", &uri, Some(&token), "")).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    let resp = send(&app, request("DELETE", &uri, Some(&token), "")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(detail(resp).await, "Product not found");
}

// --- invoices ---

#[tokio::test]
async fn invoice_for_unknown_client_is_404() {
    let app = app();
    let token = sign_in(&app, "biller@example.com").await;
    let resp = send(
        &app,
        request(
            "POST",
            "/api/v1/invoices/",
            Some(&token),
            r#"{"client_id":999,"due_date":"2024-02-01T00:00:00","items":[]}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(detail(resp).await, "Client not found");
}

#[tokio::test]
async fn invoice_lifecycle_and_stats() {
    let app = app();
    let token = sign_in(&app, "biller@example.com").await;

    let resp = send(
        &app,
        request("POST", "/api/v1/clients/", Some(&token), r#"{"name":"Acme","email":"a@acme.test"}"#),
    )
    .await;
    let client: Client = body_json(resp).await;
    let resp = send(
        &app,
        request("POST", "/api/v1/products/", Some(&token), r#"{"name":"Hour","price":100.0}"#),
    )
    .await;
    let product: Product = body_json(resp).await;

    let body = format!(
        r#"{{"client_id":{},"due_date":"2024-02-01T00:00:00","items":[
            {{"product_id":{p},"quantity":5,"unit_price":100.0}},
            {{"product_id":{p},"quantity":2,"unit_price":12.5}}]}}"#,
        client.id,
        p = product.id
    );
    let resp = send(&app, request("POST", "/api/v1/invoices/", Some(&token), &body)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let invoice: Invoice = body_json(resp).await;
    assert_eq!(invoice.status, "draft");
    assert_eq!(invoice.currency, "USD");
    assert_eq!(invoice.items.len(), 2);
    assert!(invoice.items.iter().all(|item| item.invoice_id == invoice.id));
    assert_eq!(invoice.total_amount, 525.0);

    let uri = format!("/api/v1/invoices/{}", invoice.id);
    let resp = send(&app, request("GET", &uri, Some(&token), "")).await;
    let fetched: Invoice = body_json(resp).await;
    assert_eq!(fetched.client.unwrap().name, "Acme");

    let resp = send(&app, request("PUT", &uri, Some(&token), r#"{"status":"paid"}"#)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let paid: Invoice = body_json(resp).await;
    assert_eq!(paid.status, "paid");
    assert_eq!(paid.total_amount, 525.0);

    let resp = send(&app, request("GET", "/api/v1/stats/", Some(&token), "")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let stats: DashboardStats = body_json(resp).await;
    assert_eq!(stats.users_count, 1);
    assert_eq!(stats.clients_count, 1);
    assert_eq!(stats.products_count, 1);
    assert_eq!(stats.invoices_count, 1);
    assert_eq!(stats.invoices_status_counts.paid_count, 1);
    assert_eq!(stats.invoices_status_counts.draft_count, 0);

    let resp = send(&app, request("DELETE", &uri, Some(&token), "")).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let resp = send(&app, request("GET", &uri, Some(&token), "")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(detail(resp).await, "Invoice not found");
}

#[tokio::test]
async fn free_text_status_is_stored_but_not_counted() {
    let app = app();
    let token = sign_in(&app, "free@example.com").await;
    let resp = send(
        &app,
        request("POST", "/api/v1/clients/", Some(&token), r#"{"name":"Acme","email":"a@acme.test"}"#),
    )
    .await;
    let client: Client = body_json(resp).await;

    let body = format!(
        r#"{{"client_id":{},"due_date":"2024-02-01T00:00:00","status":"overdue","items":[]}}"#,
        client.id
    );
    let resp = send(&app, request("POST", "/api/v1/invoices/", Some(&token), &body)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let invoice: Invoice = body_json(resp).await;
    assert_eq!(invoice.status, "overdue");

    let resp = send(&app, request("GET", "/api/v1/stats/", Some(&token), "")).await;
    let stats: DashboardStats = body_json(resp).await;
    assert_eq!(stats.invoices_count, 1);
    assert_eq!(stats.invoices_status_counts.all_count, 1);
    assert_eq!(stats.invoices_status_counts.draft_count, 0);
}

#[tokio::test]
async fn malformed_payload_is_not_a_detail_error() {
    let app = app();
    let token = sign_in(&app, "x@example.com").await;
    let resp = send(&app, request("POST", "/api/v1/clients/", Some(&token), r#"{"name":1}"#)).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_bytes(resp).await;
    assert!(serde_json::from_slice::<serde_json::Value>(&body).is_err());
}
