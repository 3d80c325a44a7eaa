use crate::errors::ApiError;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::{Ready, err, ok};

/// Cookie carrying the opaque backend session secret. Its presence is the
/// sole authentication signal.
pub const SESSION_COOKIE: &str = "appwrite-session";

#[derive(Debug, Clone)]
pub struct SessionSecret(pub String);

impl FromRequest for SessionSecret {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        match req.cookie(SESSION_COOKIE) {
            Some(cookie) if !cookie.value().is_empty() => {
                ok(SessionSecret(cookie.value().to_string()))
            }
            _ => err(ApiError::Unauthorized),
        }
    }
}

pub fn session_cookie(secret: &str) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, secret.to_string())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(true)
        .finish()
}

pub fn clear_session_cookie() -> Cookie<'static> {
    let mut cookie = session_cookie("");
    cookie.make_removal();
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_attributes() {
        let cookie = session_cookie("secret-1");
        assert_eq!(cookie.name(), "appwrite-session");
        assert_eq!(cookie.value(), "secret-1");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.secure(), Some(true));
    }

    #[test]
    fn removal_cookie_expires_immediately() {
        let cookie = clear_session_cookie();
        assert_eq!(cookie.name(), "appwrite-session");
        assert_eq!(cookie.max_age(), Some(actix_web::cookie::time::Duration::ZERO));
    }
}
