//! Client boundary for the hosted backend: object storage, row database
//! and the account/session service behind one trait, with explicit
//! per-call credentials. Handles are built per request by [`ClientFactory`],
//! never held as process-wide globals.

pub mod http;
pub mod memory;
pub mod types;

pub use http::HttpBackend;
pub use memory::MemoryBackend;
pub use types::{
    Account, AccountToken, Auth, BackendError, BackendSession, BucketObject, Query, RowList,
};

use crate::config::BackendConfig;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

#[async_trait]
pub trait Backend: Send + Sync + 'static {
    // object storage
    async fn create_object(
        &self,
        auth: &Auth,
        object_id: &str,
        filename: &str,
        data: Vec<u8>,
    ) -> Result<BucketObject, BackendError>;
    async fn delete_object(&self, auth: &Auth, object_id: &str) -> Result<(), BackendError>;

    // row database
    async fn create_row(
        &self,
        auth: &Auth,
        table: &str,
        row_id: &str,
        data: Value,
    ) -> Result<Value, BackendError>;
    async fn list_rows(
        &self,
        auth: &Auth,
        table: &str,
        queries: &[Query],
    ) -> Result<RowList, BackendError>;
    /// Partial update: only the keys present in `patch` change.
    async fn update_row(
        &self,
        auth: &Auth,
        table: &str,
        row_id: &str,
        patch: Value,
    ) -> Result<Value, BackendError>;
    async fn delete_row(&self, auth: &Auth, table: &str, row_id: &str)
        -> Result<(), BackendError>;

    // account / session service
    async fn create_email_token(
        &self,
        auth: &Auth,
        candidate_account_id: &str,
        email: &str,
    ) -> Result<AccountToken, BackendError>;
    async fn create_session(
        &self,
        auth: &Auth,
        account_id: &str,
        secret: &str,
    ) -> Result<BackendSession, BackendError>;
    async fn delete_session(&self, auth: &Auth) -> Result<(), BackendError>;
    async fn get_account(&self, auth: &Auth) -> Result<Account, BackendError>;
}

/// Builds admin- and session-scoped handles against one backend.
#[derive(Clone)]
pub struct ClientFactory {
    backend: Arc<dyn Backend>,
    cfg: BackendConfig,
}

impl ClientFactory {
    pub fn new(backend: Arc<dyn Backend>, cfg: BackendConfig) -> Self {
        Self { backend, cfg }
    }

    /// Handle carrying the service API key.
    pub fn admin(&self) -> Client {
        Client {
            backend: self.backend.clone(),
            cfg: self.cfg.clone(),
            auth: Auth::Key(self.cfg.api_key.clone()),
        }
    }

    /// Handle scoped to one caller's session secret.
    pub fn session(&self, secret: &str) -> Client {
        Client {
            backend: self.backend.clone(),
            cfg: self.cfg.clone(),
            auth: Auth::Session(secret.to_string()),
        }
    }
}

/// A backend handle bound to one credential.
#[derive(Clone)]
pub struct Client {
    backend: Arc<dyn Backend>,
    cfg: BackendConfig,
    auth: Auth,
}

impl Client {
    pub async fn create_object(
        &self,
        object_id: &str,
        filename: &str,
        data: Vec<u8>,
    ) -> Result<BucketObject, BackendError> {
        self.backend
            .create_object(&self.auth, object_id, filename, data)
            .await
    }

    pub async fn delete_object(&self, object_id: &str) -> Result<(), BackendError> {
        self.backend.delete_object(&self.auth, object_id).await
    }

    pub async fn create_row(
        &self,
        table: &str,
        row_id: &str,
        data: Value,
    ) -> Result<Value, BackendError> {
        self.backend.create_row(&self.auth, table, row_id, data).await
    }

    pub async fn list_rows(&self, table: &str, queries: &[Query]) -> Result<RowList, BackendError> {
        self.backend.list_rows(&self.auth, table, queries).await
    }

    pub async fn update_row(
        &self,
        table: &str,
        row_id: &str,
        patch: Value,
    ) -> Result<Value, BackendError> {
        self.backend.update_row(&self.auth, table, row_id, patch).await
    }

    pub async fn delete_row(&self, table: &str, row_id: &str) -> Result<(), BackendError> {
        self.backend.delete_row(&self.auth, table, row_id).await
    }

    pub async fn create_email_token(
        &self,
        candidate_account_id: &str,
        email: &str,
    ) -> Result<AccountToken, BackendError> {
        self.backend
            .create_email_token(&self.auth, candidate_account_id, email)
            .await
    }

    pub async fn create_session(
        &self,
        account_id: &str,
        secret: &str,
    ) -> Result<BackendSession, BackendError> {
        self.backend.create_session(&self.auth, account_id, secret).await
    }

    pub async fn delete_session(&self) -> Result<(), BackendError> {
        self.backend.delete_session(&self.auth).await
    }

    pub async fn get_account(&self) -> Result<Account, BackendError> {
        self.backend.get_account(&self.auth).await
    }

    pub fn users_table(&self) -> &str {
        &self.cfg.users_table
    }

    pub fn files_table(&self) -> &str {
        &self.cfg.files_table
    }

    pub fn file_url(&self, object_id: &str) -> String {
        self.cfg.file_url(object_id)
    }
}
