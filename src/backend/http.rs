//! REST client for the hosted backend. One struct per wire shape; the
//! service's `$`-prefixed metadata keys are normalised to plain `id` /
//! `created_at` before rows leave this module.

use super::types::{
    Account, AccountToken, Auth, BackendError, BackendSession, BucketObject, Query, RowList,
};
use super::Backend;
use crate::config::BackendConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::multipart;
use serde::Deserialize;
use serde_json::{json, Value};

pub struct HttpBackend {
    http: reqwest::Client,
    cfg: BackendConfig,
}

impl HttpBackend {
    pub fn new(cfg: BackendConfig) -> Self {
        Self { http: reqwest::Client::new(), cfg }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.cfg.endpoint.trim_end_matches('/'), path)
    }

    fn request(&self, method: reqwest::Method, path: &str, auth: &Auth) -> reqwest::RequestBuilder {
        let builder = self
            .http
            .request(method, self.url(path))
            .header("X-Appwrite-Project", &self.cfg.project_id);
        match auth {
            Auth::Key(key) => builder.header("X-Appwrite-Key", key),
            Auth::Session(secret) => builder.header("X-Appwrite-Session", secret),
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        match status.as_u16() {
            401 => Err(BackendError::Unauthorized),
            404 => Err(BackendError::NotFound),
            code => {
                let message = response
                    .json::<WireError>()
                    .await
                    .map(|e| e.message)
                    .unwrap_or_else(|_| "unreadable error body".to_string());
                Err(BackendError::Api { status: code, message })
            }
        }
    }

    fn documents_path(&self, table: &str) -> String {
        format!(
            "/databases/{}/collections/{}/documents",
            self.cfg.database_id, table
        )
    }

    fn query_json(query: &Query) -> Value {
        match query {
            Query::Equal(field, value) => {
                json!({"method": "equal", "attribute": field, "values": [value]})
            }
            Query::Contains(field, value) => {
                json!({"method": "contains", "attribute": field, "values": [value]})
            }
            Query::Or(queries) => {
                let nested: Vec<Value> = queries.iter().map(Self::query_json).collect();
                json!({"method": "or", "values": nested})
            }
        }
    }

    fn normalize_row(mut raw: Value) -> Value {
        if let Some(fields) = raw.as_object_mut() {
            if let Some(id) = fields.remove("$id") {
                fields.insert("id".to_string(), id);
            }
            if let Some(created) = fields.remove("$createdAt") {
                fields.insert("created_at".to_string(), created);
            }
            fields.retain(|key, _| !key.starts_with('$'));
        }
        raw
    }
}

#[derive(Deserialize)]
struct WireError {
    message: String,
}

#[derive(Deserialize)]
struct WireObject {
    #[serde(rename = "$id")]
    id: String,
    name: String,
    #[serde(rename = "sizeOriginal")]
    size_original: u64,
}

#[derive(Deserialize)]
struct WireDocList {
    total: u64,
    documents: Vec<Value>,
}

#[derive(Deserialize)]
struct WireToken {
    #[serde(rename = "userId")]
    user_id: String,
    expire: String,
}

#[derive(Deserialize)]
struct WireSession {
    #[serde(rename = "$id")]
    id: String,
    secret: String,
    #[serde(rename = "userId")]
    user_id: String,
}

#[derive(Deserialize)]
struct WireAccount {
    #[serde(rename = "$id")]
    id: String,
    email: String,
}

#[async_trait]
impl Backend for HttpBackend {
    async fn create_object(
        &self,
        auth: &Auth,
        object_id: &str,
        filename: &str,
        data: Vec<u8>,
    ) -> Result<BucketObject, BackendError> {
        let form = multipart::Form::new()
            .text("fileId", object_id.to_string())
            .part("file", multipart::Part::bytes(data).file_name(filename.to_string()));
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/storage/buckets/{}/files", self.cfg.bucket_id),
                auth,
            )
            .multipart(form)
            .send()
            .await?;
        let object: WireObject = Self::check(response).await?.json().await?;
        Ok(BucketObject {
            id: object.id,
            name: object.name,
            size: object.size_original,
        })
    }

    async fn delete_object(&self, auth: &Auth, object_id: &str) -> Result<(), BackendError> {
        let response = self
            .request(
                reqwest::Method::DELETE,
                &format!("/storage/buckets/{}/files/{}", self.cfg.bucket_id, object_id),
                auth,
            )
            .send()
            .await?;
        Self::check(response).await.map(|_| ())
    }

    async fn create_row(
        &self,
        auth: &Auth,
        table: &str,
        row_id: &str,
        data: Value,
    ) -> Result<Value, BackendError> {
        let response = self
            .request(reqwest::Method::POST, &self.documents_path(table), auth)
            .json(&json!({"documentId": row_id, "data": data}))
            .send()
            .await?;
        let row: Value = Self::check(response).await?.json().await?;
        Ok(Self::normalize_row(row))
    }

    async fn list_rows(
        &self,
        auth: &Auth,
        table: &str,
        queries: &[Query],
    ) -> Result<RowList, BackendError> {
        let params: Vec<(String, String)> = queries
            .iter()
            .map(|q| ("queries[]".to_string(), Self::query_json(q).to_string()))
            .collect();
        let response = self
            .request(reqwest::Method::GET, &self.documents_path(table), auth)
            .query(&params)
            .send()
            .await?;
        let list: WireDocList = Self::check(response).await?.json().await?;
        Ok(RowList {
            total: list.total,
            rows: list.documents.into_iter().map(Self::normalize_row).collect(),
        })
    }

    async fn update_row(
        &self,
        auth: &Auth,
        table: &str,
        row_id: &str,
        patch: Value,
    ) -> Result<Value, BackendError> {
        let response = self
            .request(
                reqwest::Method::PATCH,
                &format!("{}/{}", self.documents_path(table), row_id),
                auth,
            )
            .json(&json!({"data": patch}))
            .send()
            .await?;
        let row: Value = Self::check(response).await?.json().await?;
        Ok(Self::normalize_row(row))
    }

    async fn delete_row(
        &self,
        auth: &Auth,
        table: &str,
        row_id: &str,
    ) -> Result<(), BackendError> {
        let response = self
            .request(
                reqwest::Method::DELETE,
                &format!("{}/{}", self.documents_path(table), row_id),
                auth,
            )
            .send()
            .await?;
        Self::check(response).await.map(|_| ())
    }

    async fn create_email_token(
        &self,
        auth: &Auth,
        candidate_account_id: &str,
        email: &str,
    ) -> Result<AccountToken, BackendError> {
        let response = self
            .request(reqwest::Method::POST, "/account/tokens/email", auth)
            .json(&json!({"userId": candidate_account_id, "email": email}))
            .send()
            .await?;
        let token: WireToken = Self::check(response).await?.json().await?;
        let expires_at = DateTime::parse_from_rfc3339(&token.expire)
            .ok()
            .map(|dt| dt.with_timezone(&Utc));
        Ok(AccountToken {
            account_id: token.user_id,
            expires_at,
        })
    }

    async fn create_session(
        &self,
        auth: &Auth,
        account_id: &str,
        secret: &str,
    ) -> Result<BackendSession, BackendError> {
        let response = self
            .request(reqwest::Method::POST, "/account/sessions/token", auth)
            .json(&json!({"userId": account_id, "secret": secret}))
            .send()
            .await?;
        let session: WireSession = Self::check(response).await?.json().await?;
        Ok(BackendSession {
            id: session.id,
            secret: session.secret,
            account_id: session.user_id,
        })
    }

    async fn delete_session(&self, auth: &Auth) -> Result<(), BackendError> {
        let response = self
            .request(reqwest::Method::DELETE, "/account/sessions/current", auth)
            .send()
            .await?;
        Self::check(response).await.map(|_| ())
    }

    async fn get_account(&self, auth: &Auth) -> Result<Account, BackendError> {
        let response = self
            .request(reqwest::Method::GET, "/account", auth)
            .send()
            .await?;
        let account: WireAccount = Self::check(response).await?.json().await?;
        Ok(Account {
            id: account.id,
            email: account.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queries_serialize_to_wire_shape() {
        let q = Query::Or(vec![
            Query::equal("owner", "u1"),
            Query::contains("users", "a@b.c"),
        ]);
        let wire = HttpBackend::query_json(&q);
        assert_eq!(wire["method"], "or");
        assert_eq!(wire["values"][0]["method"], "equal");
        assert_eq!(wire["values"][0]["attribute"], "owner");
        assert_eq!(wire["values"][1]["values"][0], "a@b.c");
    }

    #[test]
    fn metadata_keys_are_normalised() {
        let raw = json!({
            "$id": "row-1",
            "$createdAt": "2026-01-01T00:00:00.000+00:00",
            "$permissions": [],
            "name": "report.pdf"
        });
        let row = HttpBackend::normalize_row(raw);
        assert_eq!(row["id"], "row-1");
        assert_eq!(row["created_at"], "2026-01-01T00:00:00.000+00:00");
        assert_eq!(row["name"], "report.pdf");
        assert!(row.get("$permissions").is_none());
    }
}
