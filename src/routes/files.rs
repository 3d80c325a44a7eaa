use crate::actions::file as file_actions;
use crate::actions::user::get_current_user;
use crate::backend::ClientFactory;
use crate::cache::ViewCache;
use crate::config::Config;
use crate::errors::ApiError;
use crate::session::SessionSecret;
use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use futures_util::TryStreamExt as _;
use sanitize_filename::sanitize;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct PathQuery {
    #[serde(default = "default_path")]
    pub path: String,
}

fn default_path() -> String {
    "/".to_string()
}

pub async fn upload_file(
    cfg: web::Data<Config>,
    factory: web::Data<ClientFactory>,
    cache: web::Data<ViewCache>,
    session: SessionSecret,
    query: web::Query<PathQuery>,
    mut payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let user = get_current_user(&factory, &session)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    let mut part: Option<(String, Vec<u8>)> = None;
    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|_| ApiError::BadRequest("invalid multipart".into()))?
    {
        let original = field
            .content_disposition()
            .and_then(|cd| cd.get_filename().map(|s| s.to_string()))
            .unwrap_or_else(|| "upload.bin".into());
        let mut data: Vec<u8> = Vec::new();
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|_| ApiError::BadRequest("upload read error".into()))?
        {
            data.extend_from_slice(&chunk);
            if data.len() > cfg.max_upload_size {
                return Err(ApiError::BadRequest("file too large".into()));
            }
        }
        part = Some((sanitize(&original), data));
        break;
    }
    let (mut name, data) = part.ok_or(ApiError::BadRequest("no file part".into()))?;

    // clients that send a bare name get an extension from content sniffing
    if !name.contains('.') {
        if let Some(kind) = infer::get(&data) {
            name = format!("{name}.{}", kind.extension());
        }
    }

    let row = file_actions::upload_file(
        &factory,
        &cache,
        file_actions::UploadFile {
            name,
            data,
            owner_id: user.id,
            owner_name: user.full_name,
            account_id: user.account_id,
            path: query.into_inner().path,
        },
    )
    .await?;
    Ok(HttpResponse::Ok().json(row))
}

pub async fn list_files(
    factory: web::Data<ClientFactory>,
    session: SessionSecret,
) -> Result<HttpResponse, ApiError> {
    let files = file_actions::get_files(&factory, &session).await?;
    Ok(HttpResponse::Ok().json(files))
}

#[derive(Deserialize)]
pub struct RenameReq {
    pub name: String,
    pub extension: String,
    #[serde(default = "default_path")]
    pub path: String,
}

pub async fn rename_file(
    factory: web::Data<ClientFactory>,
    cache: web::Data<ViewCache>,
    _session: SessionSecret,
    file_id: web::Path<String>,
    body: web::Json<RenameReq>,
) -> Result<HttpResponse, ApiError> {
    let row = file_actions::rename_file(
        &factory,
        &cache,
        &file_id.into_inner(),
        &body.name,
        &body.extension,
        &body.path,
    )
    .await?;
    Ok(HttpResponse::Ok().json(row))
}

#[derive(Deserialize)]
pub struct ShareReq {
    pub emails: Vec<String>,
    #[serde(default = "default_path")]
    pub path: String,
}

pub async fn update_file_users(
    factory: web::Data<ClientFactory>,
    cache: web::Data<ViewCache>,
    _session: SessionSecret,
    file_id: web::Path<String>,
    body: web::Json<ShareReq>,
) -> Result<HttpResponse, ApiError> {
    let row = file_actions::update_file_users(
        &factory,
        &cache,
        &file_id.into_inner(),
        &body.emails,
        &body.path,
    )
    .await?;
    Ok(HttpResponse::Ok().json(row))
}

#[derive(Deserialize)]
pub struct DeleteReq {
    pub bucket_file_id: String,
    #[serde(default = "default_path")]
    pub path: String,
}

pub async fn delete_file(
    factory: web::Data<ClientFactory>,
    cache: web::Data<ViewCache>,
    _session: SessionSecret,
    file_id: web::Path<String>,
    body: web::Json<DeleteReq>,
) -> Result<HttpResponse, ApiError> {
    let status = file_actions::delete_file(
        &factory,
        &cache,
        &file_id.into_inner(),
        &body.bucket_file_id,
        &body.path,
    )
    .await?;
    Ok(HttpResponse::Ok().json(status))
}
