//! Blocking API client core for the invoicing service.
//!
//! # Overview
//! A thin authenticated request pipeline over the invoicing REST API plus
//! the data contracts it moves (users, clients, products, invoices).
//!
//! # Design
//! - `ApiClient` reads the bearer token from an injected `SessionStore` on
//!   every call and never writes it.
//! - Each call is `build_request` → `Transport::execute` → `parse_response`,
//!   so tests can swap the transport and inspect both sides.
//! - Success bodies are decoded into the caller's type at the boundary; a
//!   mismatch is `ApiError::MalformedResponse`, not a silently mistyped value.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod resource;
pub mod session;
pub mod types;

pub use client::{ApiClient, RequestOptions};
pub use config::{ApiConfig, ConfigError};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use resource::{Entity, Resource};
pub use session::{FileSessionStore, MemorySessionStore, SessionStore, TOKEN_KEY};
pub use types::{
    Client, ClientCreate, ClientUpdate, DashboardStats, Invoice, InvoiceCreate, InvoiceItem, InvoiceItemCreate,
    InvoiceStatus, InvoiceStatusCounts, InvoiceUpdate, LoginRequest, Product, ProductCreate, ProductUpdate,
    Token, User, UserCreate, UserUpdate,
};
