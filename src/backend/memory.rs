//! In-process backend used for development and tests. Tables, objects,
//! accounts, one-time codes and sessions all live in DashMaps and are lost
//! on restart. One-time codes are not emailed anywhere; they are written to
//! the log and retrievable via [`MemoryBackend::issued_code`].

use super::types::{
    Account, AccountToken, Auth, BackendError, BackendSession, BucketObject, Query, RowList,
};
use super::Backend;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use rand::Rng;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};

struct StoredObject {
    name: String,
    data: Vec<u8>,
}

struct IssuedToken {
    email: String,
    secret: String,
}

#[derive(Clone)]
struct OpenSession {
    id: String,
    account_id: String,
    email: String,
}

#[derive(Default)]
pub struct MemoryBackend {
    objects: DashMap<String, StoredObject>,
    tables: DashMap<String, DashMap<String, Value>>,
    accounts: DashMap<String, String>,
    tokens: DashMap<String, IssuedToken>,
    sessions: DashMap<String, OpenSession>,
    fail_row_write: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    // The in-process backend trusts any API key; only session secrets are
    // actually checked.
    fn require_session(&self, auth: &Auth) -> Result<OpenSession, BackendError> {
        match auth {
            Auth::Session(secret) => self
                .sessions
                .get(secret)
                .map(|s| s.clone())
                .ok_or(BackendError::Unauthorized),
            Auth::Key(_) => Err(BackendError::Unauthorized),
        }
    }

    fn require_any(&self, auth: &Auth) -> Result<(), BackendError> {
        match auth {
            Auth::Key(_) => Ok(()),
            Auth::Session(secret) => {
                if self.sessions.contains_key(secret) {
                    Ok(())
                } else {
                    Err(BackendError::Unauthorized)
                }
            }
        }
    }

    /// One-time code last issued for an account, if still unconsumed.
    #[allow(dead_code)]
    pub fn issued_code(&self, account_id: &str) -> Option<String> {
        self.tokens.get(account_id).map(|t| t.secret.clone())
    }

    /// Fault injection: the next row write fails. Lets callers exercise
    /// their compensation paths against a live backend.
    #[allow(dead_code)]
    pub fn fail_next_row_write(&self) {
        self.fail_row_write.store(true, Ordering::SeqCst);
    }

    #[allow(dead_code)]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Stored name and bytes of an object, for callers poking at the dev
    /// backend directly.
    #[allow(dead_code)]
    pub fn object(&self, object_id: &str) -> Option<(String, Vec<u8>)> {
        self.objects
            .get(object_id)
            .map(|o| (o.name.clone(), o.data.clone()))
    }

    fn matches(row: &Value, query: &Query) -> bool {
        match query {
            Query::Equal(field, value) => row.get(field) == Some(value),
            Query::Contains(field, value) => row
                .get(field)
                .and_then(Value::as_array)
                .is_some_and(|items| items.contains(value)),
            Query::Or(queries) => queries.iter().any(|q| Self::matches(row, q)),
        }
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn create_object(
        &self,
        auth: &Auth,
        object_id: &str,
        filename: &str,
        data: Vec<u8>,
    ) -> Result<BucketObject, BackendError> {
        self.require_any(auth)?;
        let object = BucketObject {
            id: object_id.to_string(),
            name: filename.to_string(),
            size: data.len() as u64,
        };
        self.objects.insert(
            object_id.to_string(),
            StoredObject { name: filename.to_string(), data },
        );
        Ok(object)
    }

    async fn delete_object(&self, auth: &Auth, object_id: &str) -> Result<(), BackendError> {
        self.require_any(auth)?;
        self.objects
            .remove(object_id)
            .map(|_| ())
            .ok_or(BackendError::NotFound)
    }

    async fn create_row(
        &self,
        auth: &Auth,
        table: &str,
        row_id: &str,
        data: Value,
    ) -> Result<Value, BackendError> {
        self.require_any(auth)?;
        if self.fail_row_write.swap(false, Ordering::SeqCst) {
            return Err(BackendError::Api {
                status: 503,
                message: "row write unavailable".to_string(),
            });
        }
        let mut row = data;
        let fields = row.as_object_mut().ok_or(BackendError::Api {
            status: 400,
            message: "row data must be an object".to_string(),
        })?;
        fields.insert("id".to_string(), json!(row_id));
        fields.insert("created_at".to_string(), json!(Utc::now()));
        self.tables
            .entry(table.to_string())
            .or_default()
            .insert(row_id.to_string(), row.clone());
        Ok(row)
    }

    async fn list_rows(
        &self,
        auth: &Auth,
        table: &str,
        queries: &[Query],
    ) -> Result<RowList, BackendError> {
        self.require_any(auth)?;
        let rows: Vec<Value> = match self.tables.get(table) {
            Some(rows) => rows
                .iter()
                .filter(|entry| queries.iter().all(|q| Self::matches(entry.value(), q)))
                .map(|entry| entry.value().clone())
                .collect(),
            None => Vec::new(),
        };
        Ok(RowList { total: rows.len() as u64, rows })
    }

    async fn update_row(
        &self,
        auth: &Auth,
        table: &str,
        row_id: &str,
        patch: Value,
    ) -> Result<Value, BackendError> {
        self.require_any(auth)?;
        let table = self.tables.get(table).ok_or(BackendError::NotFound)?;
        let mut row = table.get_mut(row_id).ok_or(BackendError::NotFound)?;
        let patch = patch.as_object().cloned().ok_or(BackendError::Api {
            status: 400,
            message: "patch must be an object".to_string(),
        })?;
        let fields = row.as_object_mut().expect("stored rows are objects");
        for (key, value) in patch {
            fields.insert(key, value);
        }
        Ok(row.clone())
    }

    async fn delete_row(
        &self,
        auth: &Auth,
        table: &str,
        row_id: &str,
    ) -> Result<(), BackendError> {
        self.require_any(auth)?;
        self.tables
            .get(table)
            .and_then(|rows| rows.remove(row_id))
            .map(|_| ())
            .ok_or(BackendError::NotFound)
    }

    async fn create_email_token(
        &self,
        auth: &Auth,
        candidate_account_id: &str,
        email: &str,
    ) -> Result<AccountToken, BackendError> {
        self.require_any(auth)?;
        // A known email keeps its account identity no matter what candidate
        // id the caller supplied.
        let account_id = self
            .accounts
            .entry(email.to_string())
            .or_insert_with(|| candidate_account_id.to_string())
            .clone();
        let secret = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000u32));
        log::info!("one-time code for {email}: {secret}");
        self.tokens.insert(
            account_id.clone(),
            IssuedToken { email: email.to_string(), secret },
        );
        Ok(AccountToken {
            account_id,
            expires_at: Some(Utc::now() + Duration::minutes(15)),
        })
    }

    async fn create_session(
        &self,
        auth: &Auth,
        account_id: &str,
        secret: &str,
    ) -> Result<BackendSession, BackendError> {
        self.require_any(auth)?;
        // one-time: the code is consumed on success
        let Some((_, token)) = self
            .tokens
            .remove_if(account_id, |_, token| token.secret == secret)
        else {
            return Err(BackendError::Unauthorized);
        };
        let session = OpenSession {
            id: uuid::Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            email: token.email,
        };
        let secret = uuid::Uuid::new_v4().to_string();
        self.sessions.insert(secret.clone(), session.clone());
        Ok(BackendSession {
            id: session.id,
            secret,
            account_id: session.account_id,
        })
    }

    async fn delete_session(&self, auth: &Auth) -> Result<(), BackendError> {
        match auth {
            Auth::Session(secret) => self
                .sessions
                .remove(secret)
                .map(|_| ())
                .ok_or(BackendError::Unauthorized),
            Auth::Key(_) => Err(BackendError::Unauthorized),
        }
    }

    async fn get_account(&self, auth: &Auth) -> Result<Account, BackendError> {
        let session = self.require_session(auth)?;
        Ok(Account {
            id: session.account_id,
            email: session.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> Auth {
        Auth::Key("test-key".to_string())
    }

    #[tokio::test]
    async fn object_roundtrip() {
        let backend = MemoryBackend::new();
        let object = backend
            .create_object(&admin(), "obj-1", "report.pdf", b"hello".to_vec())
            .await
            .unwrap();
        assert_eq!(object.name, "report.pdf");
        assert_eq!(object.size, 5);

        let (name, data) = backend.object("obj-1").unwrap();
        assert_eq!(name, "report.pdf");
        assert_eq!(data, b"hello");

        backend.delete_object(&admin(), "obj-1").await.unwrap();
        assert!(backend.object("obj-1").is_none());
        let err = backend.delete_object(&admin(), "obj-1").await.unwrap_err();
        assert!(matches!(err, BackendError::NotFound));
    }

    #[tokio::test]
    async fn equal_and_contains_queries() {
        let backend = MemoryBackend::new();
        backend
            .create_row(&admin(), "files", "a", json!({"owner": "u1", "users": ["x@y.z"]}))
            .await
            .unwrap();
        backend
            .create_row(&admin(), "files", "b", json!({"owner": "u2", "users": []}))
            .await
            .unwrap();

        let mine = backend
            .list_rows(&admin(), "files", &[Query::equal("owner", "u1")])
            .await
            .unwrap();
        assert_eq!(mine.total, 1);

        let shared = backend
            .list_rows(&admin(), "files", &[Query::contains("users", "x@y.z")])
            .await
            .unwrap();
        assert_eq!(shared.total, 1);
        assert_eq!(shared.rows[0]["id"], json!("a"));

        let either = backend
            .list_rows(
                &admin(),
                "files",
                &[Query::Or(vec![
                    Query::equal("owner", "u2"),
                    Query::contains("users", "x@y.z"),
                ])],
            )
            .await
            .unwrap();
        assert_eq!(either.total, 2);
    }

    #[tokio::test]
    async fn update_only_touches_patched_keys() {
        let backend = MemoryBackend::new();
        backend
            .create_row(&admin(), "files", "a", json!({"name": "draft.docx", "size": 10}))
            .await
            .unwrap();
        let updated = backend
            .update_row(&admin(), "files", "a", json!({"name": "final.docx"}))
            .await
            .unwrap();
        assert_eq!(updated["name"], json!("final.docx"));
        assert_eq!(updated["size"], json!(10));
    }

    #[tokio::test]
    async fn token_then_session_lifecycle() {
        let backend = MemoryBackend::new();
        let token = backend
            .create_email_token(&admin(), "acct-1", "me@example.com")
            .await
            .unwrap();
        assert_eq!(token.account_id, "acct-1");

        let code = backend.issued_code("acct-1").unwrap();
        let session = backend
            .create_session(&admin(), "acct-1", &code)
            .await
            .unwrap();

        let auth = Auth::Session(session.secret.clone());
        let account = backend.get_account(&auth).await.unwrap();
        assert_eq!(account.id, "acct-1");
        assert_eq!(account.email, "me@example.com");

        backend.delete_session(&auth).await.unwrap();
        assert!(matches!(
            backend.get_account(&auth).await.unwrap_err(),
            BackendError::Unauthorized
        ));
    }

    #[tokio::test]
    async fn wrong_code_is_rejected_and_code_is_single_use() {
        let backend = MemoryBackend::new();
        backend
            .create_email_token(&admin(), "acct-1", "me@example.com")
            .await
            .unwrap();

        let code = backend.issued_code("acct-1").unwrap();
        let wrong = if code == "000000" { "000001" } else { "000000" };
        assert!(matches!(
            backend.create_session(&admin(), "acct-1", wrong).await,
            Err(BackendError::Unauthorized)
        ));
        // a failed attempt does not consume the code
        assert_eq!(backend.issued_code("acct-1").unwrap(), code);
        backend.create_session(&admin(), "acct-1", &code).await.unwrap();
        assert!(backend.issued_code("acct-1").is_none());
    }

    #[tokio::test]
    async fn known_email_keeps_its_account_id() {
        let backend = MemoryBackend::new();
        let first = backend
            .create_email_token(&admin(), "candidate-1", "me@example.com")
            .await
            .unwrap();
        let second = backend
            .create_email_token(&admin(), "candidate-2", "me@example.com")
            .await
            .unwrap();
        assert_eq!(first.account_id, second.account_id);
    }
}
