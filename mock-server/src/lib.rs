//! In-memory stand-in for the invoicing REST API.
//!
//! Serves the same routes, status codes and `{"detail": ...}` error bodies as
//! the real backend, under `/api/v1`. Everything except `/users/` and
//! `/auth/login` is scoped to the bearer user.

mod handlers;
pub mod models;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};

pub use models::{Client, DashboardStats, Invoice, InvoiceItem, Product, Token, User};

#[derive(Default)]
pub struct Store {
    last_id: i64,
    pub(crate) users: BTreeMap<i64, User>,
    pub(crate) clients: BTreeMap<i64, Client>,
    pub(crate) products: BTreeMap<i64, Product>,
    pub(crate) invoices: BTreeMap<i64, Invoice>,
    pub(crate) tokens: HashMap<String, i64>,
}

impl Store {
    pub(crate) fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

pub type Db = Arc<RwLock<Store>>;

/// Error response carrying the backend's `detail` convention.
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    detail: String,
}

impl HttpError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn not_found(entity: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("{entity} not found"))
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

/// Id of the user owning the request's bearer token.
pub struct CurrentUser(pub i64);

impl FromRequestParts<Db> for CurrentUser {
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, db: &Db) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| HttpError::new(StatusCode::FORBIDDEN, "Not authenticated"))?;

        let store = db.read().await;
        let user_id = store
            .tokens
            .get(token)
            .copied()
            .ok_or_else(|| HttpError::new(StatusCode::UNAUTHORIZED, "Could not validate credentials"))?;
        let user = store.users.get(&user_id).ok_or_else(|| HttpError::not_found("User"))?;
        if !user.is_active {
            return Err(HttpError::bad_request("Inactive user"));
        }
        Ok(CurrentUser(user_id))
    }
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    let api = Router::new()
        .route("/auth/login", post(handlers::login))
        .route("/users/", get(handlers::list_users).post(handlers::create_user))
        .route(
            "/users/{id}",
            get(handlers::get_user).put(handlers::update_user).delete(handlers::delete_user),
        )
        .route("/clients/", get(handlers::list_clients).post(handlers::create_client))
        .route(
            "/clients/{id}",
            get(handlers::get_client).put(handlers::update_client).delete(handlers::delete_client),
        )
        .route("/products/", get(handlers::list_products).post(handlers::create_product))
        .route(
            "/products/{id}",
            get(handlers::get_product).put(handlers::update_product).delete(handlers::delete_product),
        )
        .route("/invoices/", get(handlers::list_invoices).post(handlers::create_invoice))
        .route(
            "/invoices/{id}",
            get(handlers::get_invoice).put(handlers::update_invoice).delete(handlers::delete_invoice),
        )
        .route("/stats/", get(handlers::stats))
        .with_state(db);
    Router::new().nest("/api/v1", api)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}
