use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use log::info;
use uuid::Uuid;

use crate::models::{
    now, Client, ClientCreate, ClientUpdate, DashboardStats, Invoice, InvoiceCreate, InvoiceItem,
    InvoiceStatusCounts, InvoiceUpdate, LoginRequest, Pagination, Product, ProductCreate, ProductUpdate, Token,
    User, UserCreate, UserUpdate,
};
use crate::{CurrentUser, Db, HttpError};

type ApiResult<T> = Result<T, HttpError>;

fn paginate<'a, T: Clone + 'a>(items: impl Iterator<Item = &'a T>, page: &Pagination) -> Vec<T> {
    items.skip(page.skip).take(page.limit).cloned().collect()
}

// --- auth ---

pub async fn login(State(db): State<Db>, Json(input): Json<LoginRequest>) -> ApiResult<Json<Token>> {
    let mut store = db.write().await;
    let user = store
        .users
        .values()
        .find(|u| u.email == input.username && u.password == input.password)
        .ok_or_else(|| HttpError::bad_request("Incorrect email or password"))?;
    if !user.is_active {
        return Err(HttpError::bad_request("Inactive user"));
    }
    let user_id = user.id;
    let access_token = Uuid::new_v4().simple().to_string();
    store.tokens.insert(access_token.clone(), user_id);
    info!("issued token for user {user_id}");
    Ok(Json(Token {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

// --- users ---

pub async fn list_users(State(db): State<Db>, Query(p): Query<Pagination>) -> Json<Vec<User>> {
    let store = db.read().await;
    Json(paginate(store.users.values(), &p))
}

pub async fn create_user(
    State(db): State<Db>,
    Json(input): Json<UserCreate>,
) -> ApiResult<(StatusCode, Json<User>)> {
    if !input.email.contains('@') {
        return Err(HttpError::bad_request("Invalid email format"));
    }
    let mut store = db.write().await;
    if store.users.values().any(|u| u.email == input.email) {
        return Err(HttpError::bad_request("Email already registered"));
    }
    if let Some(username) = &input.username {
        if store.users.values().any(|u| u.username.as_ref() == Some(username)) {
            return Err(HttpError::bad_request("Username already taken"));
        }
    }
    let user = User {
        id: store.next_id(),
        email: input.email,
        username: input.username,
        full_name: input.full_name,
        password: input.password,
        is_active: true,
        created_at: now(),
        updated_at: now(),
    };
    store.users.insert(user.id, user.clone());
    info!("created user {}", user.id);
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user(State(db): State<Db>, Path(id): Path<i64>) -> ApiResult<Json<User>> {
    let store = db.read().await;
    store.users.get(&id).cloned().map(Json).ok_or_else(|| HttpError::not_found("User"))
}

pub async fn update_user(
    State(db): State<Db>,
    Path(id): Path<i64>,
    Json(input): Json<UserUpdate>,
) -> ApiResult<Json<User>> {
    let mut store = db.write().await;
    let user = store.users.get_mut(&id).ok_or_else(|| HttpError::not_found("User"))?;
    if let Some(email) = input.email {
        user.email = email;
    }
    if let Some(username) = input.username {
        user.username = Some(username);
    }
    if let Some(full_name) = input.full_name {
        user.full_name = full_name;
    }
    if let Some(password) = input.password {
        user.password = password;
    }
    if let Some(is_active) = input.is_active {
        user.is_active = is_active;
    }
    user.updated_at = now();
    Ok(Json(user.clone()))
}

pub async fn delete_user(State(db): State<Db>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    let mut store = db.write().await;
    store.users.remove(&id).ok_or_else(|| HttpError::not_found("User"))?;
    store.tokens.retain(|_, owner| *owner != id);
    Ok(StatusCode::NO_CONTENT)
}

// --- clients ---

pub async fn list_clients(
    State(db): State<Db>,
    CurrentUser(user_id): CurrentUser,
    Query(p): Query<Pagination>,
) -> Json<Vec<Client>> {
    let store = db.read().await;
    Json(paginate(store.clients.values().filter(|c| c.user_id == user_id), &p))
}

pub async fn create_client(
    State(db): State<Db>,
    CurrentUser(user_id): CurrentUser,
    Json(input): Json<ClientCreate>,
) -> (StatusCode, Json<Client>) {
    let mut store = db.write().await;
    let client = Client {
        id: store.next_id(),
        name: input.name,
        email: input.email,
        address: input.address,
        created_at: now(),
        updated_at: now(),
        user_id,
    };
    store.clients.insert(client.id, client.clone());
    info!("created client {} for user {user_id}", client.id);
    (StatusCode::CREATED, Json(client))
}

pub async fn get_client(
    State(db): State<Db>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<Client>> {
    let store = db.read().await;
    store
        .clients
        .get(&id)
        .filter(|c| c.user_id == user_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| HttpError::not_found("Client"))
}

pub async fn update_client(
    State(db): State<Db>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
    Json(input): Json<ClientUpdate>,
) -> ApiResult<Json<Client>> {
    let mut store = db.write().await;
    let client = store
        .clients
        .get_mut(&id)
        .filter(|c| c.user_id == user_id)
        .ok_or_else(|| HttpError::not_found("Client"))?;
    if let Some(name) = input.name {
        client.name = name;
    }
    if let Some(email) = input.email {
        client.email = email;
    }
    if let Some(address) = input.address {
        client.address = address;
    }
    client.updated_at = now();
    Ok(Json(client.clone()))
}

pub async fn delete_client(
    State(db): State<Db>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let mut store = db.write().await;
    if !store.clients.get(&id).is_some_and(|c| c.user_id == user_id) {
        return Err(HttpError::not_found("Client"));
    }
    store.clients.remove(&id);
    Ok(StatusCode::NO_CONTENT)
}

// --- products ---

pub async fn list_products(
    State(db): State<Db>,
    CurrentUser(user_id): CurrentUser,
    Query(p): Query<Pagination>,
) -> Json<Vec<Product>> {
    let store = db.read().await;
    Json(paginate(store.products.values().filter(|prod| prod.user_id == user_id), &p))
}

pub async fn create_product(
    State(db): State<Db>,
    CurrentUser(user_id): CurrentUser,
    Json(input): Json<ProductCreate>,
) -> (StatusCode, Json<Product>) {
    let mut store = db.write().await;
    let product = Product {
        id: store.next_id(),
        name: input.name,
        description: input.description,
        price: input.price,
        currency: input.currency,
        created_at: now(),
        updated_at: now(),
        user_id,
    };
    store.products.insert(product.id, product.clone());
    info!("created product {} for user {user_id}", product.id);
    (StatusCode::CREATED, Json(product))
}

pub async fn get_product(
    State(db): State<Db>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<Product>> {
    let store = db.read().await;
    store
        .products
        .get(&id)
        .filter(|prod| prod.user_id == user_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| HttpError::not_found("Product"))
}

pub async fn update_product(
    State(db): State<Db>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
    Json(input): Json<ProductUpdate>,
) -> ApiResult<Json<Product>> {
    let mut store = db.write().await;
    let product = store
        .products
        .get_mut(&id)
        .filter(|prod| prod.user_id == user_id)
        .ok_or_else(|| HttpError::not_found("Product"))?;
    if let Some(name) = input.name {
        product.name = name;
    }
    if let Some(description) = input.description {
        product.description = Some(description);
    }
    if let Some(price) = input.price {
        product.price = price;
    }
    if let Some(currency) = input.currency {
        product.currency = currency;
    }
    product.updated_at = now();
    Ok(Json(product.clone()))
}

pub async fn delete_product(
    State(db): State<Db>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let mut store = db.write().await;
    if !store.products.get(&id).is_some_and(|prod| prod.user_id == user_id) {
        return Err(HttpError::not_found("Product"));
    }
    store.products.remove(&id);
    Ok(StatusCode::NO_CONTENT)
}

// --- invoices ---

pub async fn list_invoices(
    State(db): State<Db>,
    CurrentUser(user_id): CurrentUser,
    Query(p): Query<Pagination>,
) -> Json<Vec<Invoice>> {
    let store = db.read().await;
    Json(paginate(store.invoices.values().filter(|inv| inv.user_id == user_id), &p))
}

pub async fn create_invoice(
    State(db): State<Db>,
    CurrentUser(user_id): CurrentUser,
    Json(input): Json<InvoiceCreate>,
) -> ApiResult<(StatusCode, Json<Invoice>)> {
    let mut store = db.write().await;
    if !store.clients.get(&input.client_id).is_some_and(|c| c.user_id == user_id) {
        return Err(HttpError::not_found("Client"));
    }
    for item in &input.items {
        if !store.products.get(&item.product_id).is_some_and(|prod| prod.user_id == user_id) {
            return Err(HttpError::not_found("Product"));
        }
    }

    let id = store.next_id();
    let mut items = Vec::with_capacity(input.items.len());
    for item in input.items {
        items.push(InvoiceItem {
            id: store.next_id(),
            invoice_id: id,
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
        });
    }
    let total_amount: f64 = items.iter().map(|i| i.quantity as f64 * i.unit_price).sum();

    let invoice = Invoice {
        id,
        client_id: input.client_id,
        user_id,
        status: input.status,
        due_date: input.due_date,
        total_amount,
        currency: input.currency,
        is_recurring: input.is_recurring,
        recurring_interval: input.recurring_interval,
        created_at: now(),
        updated_at: now(),
        items,
        client: None,
    };
    store.invoices.insert(id, invoice.clone());
    info!("created invoice {id} for user {user_id} totalling {total_amount}");
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn get_invoice(
    State(db): State<Db>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<Invoice>> {
    let store = db.read().await;
    let mut invoice = store
        .invoices
        .get(&id)
        .filter(|inv| inv.user_id == user_id)
        .cloned()
        .ok_or_else(|| HttpError::not_found("Invoice"))?;
    invoice.client = store.clients.get(&invoice.client_id).cloned();
    Ok(Json(invoice))
}

pub async fn update_invoice(
    State(db): State<Db>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
    Json(input): Json<InvoiceUpdate>,
) -> ApiResult<Json<Invoice>> {
    let mut store = db.write().await;
    let invoice = store
        .invoices
        .get_mut(&id)
        .filter(|inv| inv.user_id == user_id)
        .ok_or_else(|| HttpError::not_found("Invoice"))?;
    if let Some(status) = input.status {
        invoice.status = status;
    }
    if let Some(due_date) = input.due_date {
        invoice.due_date = due_date;
    }
    if let Some(is_recurring) = input.is_recurring {
        invoice.is_recurring = is_recurring;
    }
    if let Some(interval) = input.recurring_interval {
        invoice.recurring_interval = Some(interval);
    }
    invoice.updated_at = now();
    Ok(Json(invoice.clone()))
}

pub async fn delete_invoice(
    State(db): State<Db>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let mut store = db.write().await;
    if !store.invoices.get(&id).is_some_and(|inv| inv.user_id == user_id) {
        return Err(HttpError::not_found("Invoice"));
    }
    store.invoices.remove(&id);
    Ok(StatusCode::NO_CONTENT)
}

// --- stats ---

pub async fn stats(State(db): State<Db>, CurrentUser(user_id): CurrentUser) -> Json<DashboardStats> {
    let store = db.read().await;
    let mut counts = InvoiceStatusCounts::default();
    for invoice in store.invoices.values().filter(|inv| inv.user_id == user_id) {
        counts.all_count += 1;
        match invoice.status.as_str() {
            "draft" => counts.draft_count += 1,
            "sent" => counts.sent_count += 1,
            "paid" => counts.paid_count += 1,
            "cancelled" => counts.cancelled_count += 1,
            _ => {}
        }
    }
    Json(DashboardStats {
        users_count: store.users.len(),
        clients_count: store.clients.values().filter(|c| c.user_id == user_id).count(),
        products_count: store.products.values().filter(|prod| prod.user_id == user_id).count(),
        invoices_count: counts.all_count,
        invoices_status_counts: counts,
    })
}
