//! File actions against the hosted backend: upload with a compensating
//! object delete, the owner-or-shared listing, rename, sharing updates and
//! paired row/object deletion.

use crate::actions::user::get_current_user;
use crate::backend::{ClientFactory, Query};
use crate::cache::ViewCache;
use crate::errors::ApiError;
use crate::models::{file_kind, FileRow};
use crate::session::SessionSecret;
use serde::Serialize;
use serde_json::json;

pub struct UploadFile {
    pub name: String,
    pub data: Vec<u8>,
    pub owner_id: String,
    pub owner_name: String,
    pub account_id: String,
    pub path: String,
}

#[derive(Serialize, Debug)]
pub struct FileList {
    pub total: u64,
    pub files: Vec<FileRow>,
}

#[derive(Serialize)]
pub struct DeleteStatus {
    pub status: &'static str,
}

/// Writes the object, then the metadata row. The two live and die as a
/// pair: when the row write fails, the fresh object is deleted before the
/// error propagates. The cleanup itself is best effort; its failure is
/// logged and discarded, accepting a possible orphan object.
pub async fn upload_file(
    factory: &ClientFactory,
    cache: &ViewCache,
    upload: UploadFile,
) -> Result<FileRow, ApiError> {
    let admin = factory.admin();

    let object_id = uuid::Uuid::new_v4().to_string();
    let object = admin
        .create_object(&object_id, &upload.name, upload.data)
        .await
        .map_err(|e| {
            log::error!("failed to upload file {}: {e}", upload.name);
            ApiError::Write(e.to_string())
        })?;

    let (kind, extension) = file_kind(&object.name);
    let row_data = json!({
        "name": object.name,
        "type": kind,
        "extension": extension,
        "size": object.size,
        "url": admin.file_url(&object.id),
        "owner": upload.owner_id,
        "owner_name": upload.owner_name,
        "account_id": upload.account_id,
        "users": [],
        "bucket_file_id": object.id,
    });

    let row = match admin
        .create_row(admin.files_table(), &uuid::Uuid::new_v4().to_string(), row_data)
        .await
    {
        Ok(row) => row,
        Err(write_err) => {
            if let Err(cleanup) = admin.delete_object(&object.id).await {
                log::warn!(
                    "compensation failed, object {} may be orphaned: {cleanup}",
                    object.id
                );
            }
            log::error!("failed to create file row: {write_err}");
            return Err(ApiError::Write(write_err.to_string()));
        }
    };

    cache.revalidate(&upload.path);
    Ok(serde_json::from_value(row)?)
}

/// Every file the caller owns or that is shared with their email. No
/// pagination, no backend-side sort; ordering is a client concern.
pub async fn get_files(
    factory: &ClientFactory,
    session: &SessionSecret,
) -> Result<FileList, ApiError> {
    let user = get_current_user(factory, session)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    let admin = factory.admin();
    let result = admin
        .list_rows(
            admin.files_table(),
            &[Query::Or(vec![
                Query::equal("owner", user.id),
                Query::contains("users", user.email),
            ])],
        )
        .await
        .map_err(|e| {
            log::error!("failed to list files: {e}");
            ApiError::from(e)
        })?;

    let files = result
        .rows
        .into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<FileRow>, _>>()?;
    Ok(FileList { total: result.total, files })
}

/// Updates only the row's `name` to `"{name}.{extension}"`.
pub async fn rename_file(
    factory: &ClientFactory,
    cache: &ViewCache,
    file_id: &str,
    name: &str,
    extension: &str,
    path: &str,
) -> Result<FileRow, ApiError> {
    let new_name = format!("{name}.{extension}");
    let admin = factory.admin();
    let row = admin
        .update_row(admin.files_table(), file_id, json!({"name": new_name}))
        .await
        .map_err(|e| {
            log::error!("failed to rename file {file_id}: {e}");
            ApiError::from(e)
        })?;
    cache.revalidate(path);
    Ok(serde_json::from_value(row)?)
}

/// Replaces the sharing list wholesale.
pub async fn update_file_users(
    factory: &ClientFactory,
    cache: &ViewCache,
    file_id: &str,
    emails: &[String],
    path: &str,
) -> Result<FileRow, ApiError> {
    let admin = factory.admin();
    let row = admin
        .update_row(admin.files_table(), file_id, json!({"users": emails}))
        .await
        .map_err(|e| {
            log::error!("failed to update sharing for file {file_id}: {e}");
            ApiError::from(e)
        })?;
    cache.revalidate(path);
    Ok(serde_json::from_value(row)?)
}

/// Deletes the row first; only then the object. An object-deletion failure
/// after the row is gone leaves an orphan: fail open, logged only, no
/// reconciliation.
pub async fn delete_file(
    factory: &ClientFactory,
    cache: &ViewCache,
    file_id: &str,
    bucket_file_id: &str,
    path: &str,
) -> Result<DeleteStatus, ApiError> {
    let admin = factory.admin();

    admin
        .delete_row(admin.files_table(), file_id)
        .await
        .map_err(|e| {
            log::error!("failed to delete file row {file_id}: {e}");
            ApiError::from(e)
        })?;

    if let Err(e) = admin.delete_object(bucket_file_id).await {
        log::warn!("object {bucket_file_id} orphaned after row delete: {e}");
    }

    cache.revalidate(path);
    Ok(DeleteStatus { status: "success" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::user::{create_account, verify_secret};
    use crate::backend::{BackendError, MemoryBackend};
    use crate::config::BackendConfig;
    use crate::models::FileKind;
    use std::sync::Arc;

    fn setup() -> (Arc<MemoryBackend>, ClientFactory, ViewCache) {
        let backend = Arc::new(MemoryBackend::new());
        let factory = ClientFactory::new(backend.clone(), BackendConfig::default());
        (backend, factory, ViewCache::new())
    }

    async fn signed_in(
        backend: &MemoryBackend,
        factory: &ClientFactory,
        name: &str,
        email: &str,
    ) -> (SessionSecret, crate::models::UserRow) {
        let account = create_account(factory, name, email).await.unwrap();
        let code = backend.issued_code(&account.account_id).unwrap();
        let session = verify_secret(factory, &account.account_id, &code).await.unwrap();
        let secret = SessionSecret(session.secret);
        let user = get_current_user(factory, &secret).await.unwrap().unwrap();
        (secret, user)
    }

    fn upload_for(user: &crate::models::UserRow, name: &str, data: &[u8]) -> UploadFile {
        UploadFile {
            name: name.to_string(),
            data: data.to_vec(),
            owner_id: user.id.clone(),
            owner_name: user.full_name.clone(),
            account_id: user.account_id.clone(),
            path: "/documents".to_string(),
        }
    }

    #[tokio::test]
    async fn upload_classifies_and_records_size() {
        let (backend, factory, cache) = setup();
        let (_, user) = signed_in(&backend, &factory, "Ada", "ada@example.com").await;

        let payload = vec![0u8; 1337];
        let row = upload_file(&factory, &cache, upload_for(&user, "report.pdf", &payload))
            .await
            .unwrap();

        assert_eq!(row.size, 1337);
        assert_eq!(row.extension, "pdf");
        assert_eq!(row.kind, FileKind::Document);
        assert_eq!(row.name, "report.pdf");
        assert_eq!(row.owner, user.id);
        assert_eq!(row.owner_name, "Ada");
        assert!(row.users.is_empty());
        assert!(row.url.contains(&row.bucket_file_id));
        assert_eq!(cache.generation("/documents"), 1);
    }

    #[tokio::test]
    async fn failed_row_write_deletes_the_fresh_object() {
        let (backend, factory, cache) = setup();
        let (_, user) = signed_in(&backend, &factory, "Ada", "ada@example.com").await;

        backend.fail_next_row_write();
        let err = upload_file(&factory, &cache, upload_for(&user, "report.pdf", b"data"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Write(_)));

        // the object was compensated away; a second delete finds nothing
        assert_eq!(backend.object_count(), 0);
        let admin = factory.admin();
        let files = admin.list_rows(admin.files_table(), &[]).await.unwrap();
        assert_eq!(files.total, 0);
    }

    #[tokio::test]
    async fn listing_returns_owned_and_shared_only() {
        let (backend, factory, cache) = setup();
        let (ada_session, ada) = signed_in(&backend, &factory, "Ada", "ada@example.com").await;
        let (bob_session, bob) = signed_in(&backend, &factory, "Bob", "bob@example.com").await;

        let ada_file = upload_file(&factory, &cache, upload_for(&ada, "mine.txt", b"a"))
            .await
            .unwrap();
        let bob_file = upload_file(&factory, &cache, upload_for(&bob, "theirs.txt", b"b"))
            .await
            .unwrap();
        let shared = upload_file(&factory, &cache, upload_for(&bob, "shared.txt", b"c"))
            .await
            .unwrap();
        update_file_users(&factory, &cache, &shared.id, &[ada.email.clone()], "/documents")
            .await
            .unwrap();

        let ada_files = get_files(&factory, &ada_session).await.unwrap();
        assert_eq!(ada_files.total, 2);
        let ids: Vec<&str> = ada_files.files.iter().map(|f| f.id.as_str()).collect();
        assert!(ids.contains(&ada_file.id.as_str()));
        assert!(ids.contains(&shared.id.as_str()));
        assert!(!ids.contains(&bob_file.id.as_str()));

        let bob_files = get_files(&factory, &bob_session).await.unwrap();
        assert_eq!(bob_files.total, 2);
    }

    #[tokio::test]
    async fn listing_without_a_session_is_unauthorized() {
        let (_, factory, _) = setup();
        let err = get_files(&factory, &SessionSecret("bogus".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
    }

    #[tokio::test]
    async fn rename_touches_only_the_name() {
        let (backend, factory, cache) = setup();
        let (_, user) = signed_in(&backend, &factory, "Ada", "ada@example.com").await;

        let row = upload_file(&factory, &cache, upload_for(&user, "draft.docx", b"text"))
            .await
            .unwrap();
        let renamed = rename_file(&factory, &cache, &row.id, "final", "docx", "/documents")
            .await
            .unwrap();

        assert_eq!(renamed.name, "final.docx");
        assert_eq!(renamed.id, row.id);
        assert_eq!(renamed.size, row.size);
        assert_eq!(renamed.extension, row.extension);
        assert_eq!(renamed.bucket_file_id, row.bucket_file_id);
        assert_eq!(renamed.created_at, row.created_at);
    }

    #[tokio::test]
    async fn sharing_list_is_replaced_wholesale() {
        let (backend, factory, cache) = setup();
        let (_, user) = signed_in(&backend, &factory, "Ada", "ada@example.com").await;

        let row = upload_file(&factory, &cache, upload_for(&user, "notes.md", b"#"))
            .await
            .unwrap();
        update_file_users(
            &factory,
            &cache,
            &row.id,
            &["x@example.com".to_string(), "y@example.com".to_string()],
            "/documents",
        )
        .await
        .unwrap();
        let replaced = update_file_users(
            &factory,
            &cache,
            &row.id,
            &["z@example.com".to_string()],
            "/documents",
        )
        .await
        .unwrap();
        assert_eq!(replaced.users, vec!["z@example.com".to_string()]);
    }

    #[tokio::test]
    async fn delete_removes_row_and_object() {
        let (backend, factory, cache) = setup();
        let (session, user) = signed_in(&backend, &factory, "Ada", "ada@example.com").await;

        let row = upload_file(&factory, &cache, upload_for(&user, "gone.txt", b"bye"))
            .await
            .unwrap();
        let status = delete_file(&factory, &cache, &row.id, &row.bucket_file_id, "/documents")
            .await
            .unwrap();
        assert_eq!(status.status, "success");

        assert_eq!(get_files(&factory, &session).await.unwrap().total, 0);
        assert!(matches!(
            factory.admin().delete_object(&row.bucket_file_id).await,
            Err(BackendError::NotFound)
        ));
    }

    #[tokio::test]
    async fn delete_is_fail_open_when_object_is_already_gone() {
        let (backend, factory, cache) = setup();
        let (_, user) = signed_in(&backend, &factory, "Ada", "ada@example.com").await;

        let row = upload_file(&factory, &cache, upload_for(&user, "gone.txt", b"bye"))
            .await
            .unwrap();
        // the object vanishes out from under us
        factory.admin().delete_object(&row.bucket_file_id).await.unwrap();

        let status = delete_file(&factory, &cache, &row.id, &row.bucket_file_id, "/documents")
            .await
            .unwrap();
        assert_eq!(status.status, "success");
    }

    #[tokio::test]
    async fn mutations_bump_the_view_stamp() {
        let (backend, factory, cache) = setup();
        let (_, user) = signed_in(&backend, &factory, "Ada", "ada@example.com").await;

        let row = upload_file(&factory, &cache, upload_for(&user, "a.txt", b"1"))
            .await
            .unwrap();
        rename_file(&factory, &cache, &row.id, "b", "txt", "/documents").await.unwrap();
        update_file_users(&factory, &cache, &row.id, &[], "/documents").await.unwrap();
        delete_file(&factory, &cache, &row.id, &row.bucket_file_id, "/documents")
            .await
            .unwrap();
        assert_eq!(cache.generation("/documents"), 4);
    }
}
