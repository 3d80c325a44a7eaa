use crate::{actions::user as user_actions, backend::ClientFactory, errors::ApiError};
use crate::session::{clear_session_cookie, session_cookie, SessionSecret};
use actix_web::{http::header, HttpResponse, web};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct SignUpReq {
    pub full_name: String,
    pub email: String,
}

pub async fn sign_up(
    factory: web::Data<ClientFactory>,
    body: web::Json<SignUpReq>,
) -> Result<HttpResponse, ApiError> {
    if body.full_name.trim().is_empty() || !body.email.contains('@') {
        return Err(ApiError::BadRequest("invalid name/email".into()));
    }
    let created = user_actions::create_account(&factory, body.full_name.trim(), &body.email).await?;
    Ok(HttpResponse::Ok().json(created))
}

#[derive(Deserialize)]
pub struct EmailReq {
    pub email: String,
}

pub async fn sign_in(
    factory: web::Data<ClientFactory>,
    body: web::Json<EmailReq>,
) -> Result<HttpResponse, ApiError> {
    let result = user_actions::sign_in_user(&factory, &body.email).await?;
    Ok(HttpResponse::Ok().json(result))
}

pub async fn resend_otp(
    factory: web::Data<ClientFactory>,
    body: web::Json<EmailReq>,
) -> Result<HttpResponse, ApiError> {
    let account_id = user_actions::send_email_otp(&factory, &body.email).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "account_id": account_id })))
}

#[derive(Deserialize)]
pub struct VerifyReq {
    pub account_id: String,
    pub otp: String,
}

#[derive(Serialize)]
struct VerifyResp {
    session_id: String,
}

pub async fn verify(
    factory: web::Data<ClientFactory>,
    body: web::Json<VerifyReq>,
) -> Result<HttpResponse, ApiError> {
    let session = user_actions::verify_secret(&factory, &body.account_id, &body.otp).await?;
    Ok(HttpResponse::Ok()
        .cookie(session_cookie(&session.secret))
        .json(VerifyResp { session_id: session.id }))
}

pub async fn me(
    factory: web::Data<ClientFactory>,
    session: SessionSecret,
) -> Result<HttpResponse, ApiError> {
    let user = user_actions::get_current_user(&factory, &session)
        .await?
        .ok_or(ApiError::Unauthorized)?;
    Ok(HttpResponse::Ok().json(user))
}

/// The cookie is cleared and the caller redirected whatever the backend
/// says; a dangling backend session only expires later.
pub async fn sign_out(
    factory: web::Data<ClientFactory>,
    session: Option<SessionSecret>,
) -> HttpResponse {
    if let Some(session) = &session {
        user_actions::sign_out_user(&factory, session).await;
    }
    HttpResponse::SeeOther()
        .cookie(clear_session_cookie())
        .insert_header((header::LOCATION, "/sign-in"))
        .finish()
}
