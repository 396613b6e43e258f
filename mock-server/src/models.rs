use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub(crate) fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_status() -> String {
    "draft".to_string()
}

fn default_limit() -> usize {
    100
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: Option<String>,
    pub full_name: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Deserialize)]
pub struct UserCreate {
    pub email: String,
    pub username: Option<String>,
    pub full_name: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub address: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub user_id: i64,
}

#[derive(Deserialize)]
pub struct ClientCreate {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Deserialize)]
pub struct ClientUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub address: Option<Option<String>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub currency: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub user_id: i64,
}

#[derive(Deserialize)]
pub struct ProductCreate {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

#[derive(Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub id: i64,
    pub invoice_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    pub client_id: i64,
    pub user_id: i64,
    pub status: String,
    pub due_date: NaiveDateTime,
    pub total_amount: f64,
    pub currency: String,
    pub is_recurring: bool,
    pub recurring_interval: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub items: Vec<InvoiceItem>,
    /// Only populated on single-invoice reads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<Client>,
}

#[derive(Deserialize)]
pub struct InvoiceItemCreate {
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: f64,
}

#[derive(Deserialize)]
pub struct InvoiceCreate {
    pub client_id: i64,
    pub due_date: NaiveDateTime,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub recurring_interval: Option<String>,
    pub items: Vec<InvoiceItemCreate>,
}

#[derive(Deserialize)]
pub struct InvoiceUpdate {
    pub status: Option<String>,
    pub due_date: Option<NaiveDateTime>,
    pub is_recurring: Option<bool>,
    pub recurring_interval: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct InvoiceStatusCounts {
    pub all_count: usize,
    pub draft_count: usize,
    pub sent_count: usize,
    pub paid_count: usize,
    pub cancelled_count: usize,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DashboardStats {
    pub users_count: usize,
    pub clients_count: usize,
    pub products_count: usize,
    pub invoices_count: usize,
    pub invoices_status_counts: InvoiceStatusCounts,
}

#[derive(Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub skip: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}
