//! Account and session actions: OTP issuance, lazy user-row creation,
//! OTP verification, current-user resolution, sign-in and sign-out.

use crate::backend::{BackendError, BackendSession, ClientFactory, Query};
use crate::errors::ApiError;
use crate::models::{UserRow, PLACEHOLDER_AVATAR};
use crate::session::SessionSecret;
use serde::Serialize;
use serde_json::json;

#[derive(Serialize)]
pub struct CreatedAccount {
    pub account_id: String,
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum SignIn {
    OtpSent { account_id: String },
    UserNotFound { error: String },
}

pub async fn get_user_by_email(
    factory: &ClientFactory,
    email: &str,
) -> Result<Option<UserRow>, ApiError> {
    let admin = factory.admin();
    let result = admin
        .list_rows(admin.users_table(), &[Query::equal("email", email)])
        .await?;
    match result.rows.into_iter().next() {
        Some(row) => Ok(Some(serde_json::from_value(row)?)),
        None => Ok(None),
    }
}

/// Asks the backend to email a one-time code for this address. The backend
/// resolves a known email to its existing account, so the returned identity
/// is stable across calls.
pub async fn send_email_otp(factory: &ClientFactory, email: &str) -> Result<String, ApiError> {
    let candidate = uuid::Uuid::new_v4().to_string();
    let token = factory
        .admin()
        .create_email_token(&candidate, email)
        .await
        .map_err(|e| {
            log::error!("failed to send email OTP to {email}: {e}");
            ApiError::Dispatch(e.to_string())
        })?;
    Ok(token.account_id)
}

/// Sends an OTP and lazily creates the user row on first contact. Calling
/// twice with one email reuses the existing row.
pub async fn create_account(
    factory: &ClientFactory,
    full_name: &str,
    email: &str,
) -> Result<CreatedAccount, ApiError> {
    let existing = get_user_by_email(factory, email).await?;

    let account_id = send_email_otp(factory, email).await?;

    if existing.is_none() {
        let admin = factory.admin();
        admin
            .create_row(
                admin.users_table(),
                &uuid::Uuid::new_v4().to_string(),
                json!({
                    "full_name": full_name,
                    "email": email,
                    "avatar": PLACEHOLDER_AVATAR,
                    "account_id": account_id,
                }),
            )
            .await
            .map_err(|e| {
                log::error!("failed to create user row for {email}: {e}");
                ApiError::Write(e.to_string())
            })?;
    }

    Ok(CreatedAccount { account_id })
}

/// Exchanges an account identity and submitted one-time code for a backend
/// session. The route layer turns the secret into the session cookie.
pub async fn verify_secret(
    factory: &ClientFactory,
    account_id: &str,
    otp: &str,
) -> Result<BackendSession, ApiError> {
    factory
        .admin()
        .create_session(account_id, otp)
        .await
        .map_err(|e| {
            log::error!("failed to verify one-time code for {account_id}: {e}");
            ApiError::from(e)
        })
}

/// Resolves the caller's user row from their session. An invalid or expired
/// session is an anonymous caller, not an error.
pub async fn get_current_user(
    factory: &ClientFactory,
    session: &SessionSecret,
) -> Result<Option<UserRow>, ApiError> {
    let client = factory.session(&session.0);
    let account = match client.get_account().await {
        Ok(account) => account,
        Err(BackendError::Unauthorized) => return Ok(None),
        Err(e) => {
            log::error!("failed to fetch current account: {e}");
            return Err(e.into());
        }
    };
    let result = client
        .list_rows(
            client.users_table(),
            &[Query::equal("account_id", account.id)],
        )
        .await?;
    match result.rows.into_iter().next() {
        Some(row) => Ok(Some(serde_json::from_value(row)?)),
        None => Ok(None),
    }
}

/// Deletes the backend session. Fail open: a backend failure here is logged
/// and discarded, the caller clears the cookie and redirects regardless.
pub async fn sign_out_user(factory: &ClientFactory, session: &SessionSecret) {
    if let Err(e) = factory.session(&session.0).delete_session().await {
        log::warn!("sign-out: backend session deletion failed, session will expire on its own: {e}");
    }
}

/// Re-entry for an existing email: resend the OTP if the user exists,
/// otherwise report not-found without raising.
pub async fn sign_in_user(factory: &ClientFactory, email: &str) -> Result<SignIn, ApiError> {
    match get_user_by_email(factory, email).await? {
        Some(user) => {
            send_email_otp(factory, email).await?;
            Ok(SignIn::OtpSent { account_id: user.account_id })
        }
        None => Ok(SignIn::UserNotFound { error: "user not found".to_string() }),
    }
}
