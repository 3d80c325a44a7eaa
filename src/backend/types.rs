use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Credential attached to every backend call. Admin handles use the
/// project API key, session handles the opaque secret from the cookie.
#[derive(Debug, Clone)]
pub enum Auth {
    Key(String),
    Session(String),
}

/// Binary object stored in the service's bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketObject {
    pub id: String,
    pub name: String,
    pub size: u64,
}

/// Result of listing a table: every matching row plus the match count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowList {
    pub total: u64,
    pub rows: Vec<Value>,
}

/// Query predicates understood by the row database.
#[derive(Debug, Clone)]
pub enum Query {
    Equal(String, Value),
    Contains(String, Value),
    Or(Vec<Query>),
}

impl Query {
    pub fn equal(field: &str, value: impl Into<Value>) -> Self {
        Query::Equal(field.to_string(), value.into())
    }

    pub fn contains(field: &str, value: impl Into<Value>) -> Self {
        Query::Contains(field.to_string(), value.into())
    }
}

/// One-time-code token issued against an account identity. The secret is
/// delivered out of band (email); it never appears here for the hosted
/// backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountToken {
    pub account_id: String,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSession {
    pub id: String,
    pub secret: String,
    pub account_id: String,
}

/// Login principal as the account service sees it, distinct from the
/// application's user row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub email: String,
}

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("not found")]
    NotFound,
    #[error("backend responded {status}: {message}")]
    Api { status: u16, message: String },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed backend response: {0}")]
    Decode(#[from] serde_json::Error),
}
