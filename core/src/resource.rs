//! Typed CRUD helpers over the generic request pipeline.
//!
//! Each server collection (`/users/`, `/clients/`, ...) follows the same
//! route shape, so one `Resource` handles all of them and `Entity` ties a
//! record type to its collection path and payload types.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::http::Transport;
use crate::session::SessionStore;
use crate::types::{
    Client, ClientCreate, ClientUpdate, DashboardStats, Invoice, InvoiceCreate, InvoiceUpdate, LoginRequest,
    Product, ProductCreate, ProductUpdate, Token, User, UserCreate, UserUpdate,
};

/// A record type served from a REST collection.
pub trait Entity: DeserializeOwned {
    /// Collection path relative to the base URL, with trailing slash.
    const COLLECTION: &'static str;
    type Create: Serialize;
    type Update: Serialize;
}

impl Entity for User {
    const COLLECTION: &'static str = "/users/";
    type Create = UserCreate;
    type Update = UserUpdate;
}

impl Entity for Client {
    const COLLECTION: &'static str = "/clients/";
    type Create = ClientCreate;
    type Update = ClientUpdate;
}

impl Entity for Product {
    const COLLECTION: &'static str = "/products/";
    type Create = ProductCreate;
    type Update = ProductUpdate;
}

impl Entity for Invoice {
    const COLLECTION: &'static str = "/invoices/";
    type Create = InvoiceCreate;
    type Update = InvoiceUpdate;
}

/// CRUD operations on one collection, borrowed from an `ApiClient`.
pub struct Resource<'a, E, S, T> {
    client: &'a ApiClient<S, T>,
    _entity: PhantomData<fn() -> E>,
}

impl<'a, E: Entity, S: SessionStore, T: Transport> Resource<'a, E, S, T> {
    fn new(client: &'a ApiClient<S, T>) -> Self {
        Self {
            client,
            _entity: PhantomData,
        }
    }

    pub fn item_path(id: i64) -> String {
        format!("{}{id}", E::COLLECTION)
    }

    pub fn list(&self) -> Result<Vec<E>, ApiError> {
        self.client.get(E::COLLECTION)
    }

    /// One page via the server's `skip` / `limit` query parameters.
    pub fn list_page(&self, skip: u64, limit: u64) -> Result<Vec<E>, ApiError> {
        self.client
            .get(&format!("{}?skip={skip}&limit={limit}", E::COLLECTION))
    }

    pub fn get(&self, id: i64) -> Result<E, ApiError> {
        self.client.get(&Self::item_path(id))
    }

    pub fn create(&self, input: &E::Create) -> Result<E, ApiError> {
        self.client.post(E::COLLECTION, input)
    }

    pub fn update(&self, id: i64, input: &E::Update) -> Result<E, ApiError> {
        self.client.put(&Self::item_path(id), input)
    }

    pub fn delete(&self, id: i64) -> Result<(), ApiError> {
        self.client.delete(&Self::item_path(id))
    }
}

impl<S: SessionStore, T: Transport> ApiClient<S, T> {
    pub fn users(&self) -> Resource<'_, User, S, T> {
        Resource::new(self)
    }

    pub fn clients(&self) -> Resource<'_, Client, S, T> {
        Resource::new(self)
    }

    pub fn products(&self) -> Resource<'_, Product, S, T> {
        Resource::new(self)
    }

    pub fn invoices(&self) -> Resource<'_, Invoice, S, T> {
        Resource::new(self)
    }

    /// Exchange credentials for a bearer token.
    ///
    /// The token is returned, not stored: persisting it in the session
    /// store is up to the caller.
    pub fn login(&self, credentials: &LoginRequest) -> Result<Token, ApiError> {
        self.post("/auth/login", credentials)
    }

    /// Dashboard counters for the current user.
    pub fn stats(&self) -> Result<DashboardStats, ApiError> {
        self.get("/stats/")
    }
}
