use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use axum_extra::extract::cookie::CookieJar;

use super::{responses::auth_error_to_response, ApiError, AppState};
use crate::models::{AuthError, AuthUser};

pub const ACCESS_TOKEN_COOKIE: &str = "sb-access-token";
pub const REFRESH_TOKEN_COOKIE: &str = "sb-refresh-token";

/// Access token issued by the session middleware during this request
#[derive(Debug, Clone)]
pub struct RefreshedAccessToken(pub String);

/// The user behind the request's access token.
///
/// Extraction fails with an `UNAUTHORIZED` envelope before the handler runs.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub AuthUser);

/// Token from the `Authorization` header, else the refreshed session, else the cookie
pub fn access_token_from_parts(parts: &Parts) -> Option<String> {
    if let Some(token) = bearer_token(parts) {
        return Some(token);
    }

    if let Some(RefreshedAccessToken(token)) = parts.extensions.get::<RefreshedAccessToken>() {
        return Some(token.clone());
    }

    CookieJar::from_headers(&parts.headers)
        .get(ACCESS_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);

        let Some(token) = access_token_from_parts(parts) else {
            state.metrics.record_auth_check("rejected");
            return Err(auth_error_to_response(AuthError::MissingToken));
        };

        match state.auth.get_user(&token).await {
            Ok(user) => {
                state.metrics.record_auth_check("authenticated");
                Ok(AuthenticatedUser(user))
            }
            Err(e) if e.is_rejection() => {
                state.metrics.record_auth_check("rejected");
                crate::warn_with_trace!(error = %e, "Rejected access token");
                Err(auth_error_to_response(e))
            }
            Err(e) => {
                state.metrics.record_auth_check("error");
                Err(auth_error_to_response(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_header_wins() {
        let mut parts = parts(
            Request::builder()
                .header(AUTHORIZATION, "Bearer header-token")
                .header("cookie", "sb-access-token=cookie-token"),
        );
        parts
            .extensions
            .insert(RefreshedAccessToken("fresh-token".to_string()));

        assert_eq!(
            access_token_from_parts(&parts).as_deref(),
            Some("header-token")
        );
    }

    #[test]
    fn test_refreshed_token_beats_cookie() {
        let mut parts = parts(Request::builder().header("cookie", "sb-access-token=cookie-token"));
        parts
            .extensions
            .insert(RefreshedAccessToken("fresh-token".to_string()));

        assert_eq!(
            access_token_from_parts(&parts).as_deref(),
            Some("fresh-token")
        );
    }

    #[test]
    fn test_cookie_fallback() {
        let parts = parts(
            Request::builder().header("cookie", "theme=dark; sb-access-token=cookie-token"),
        );
        assert_eq!(
            access_token_from_parts(&parts).as_deref(),
            Some("cookie-token")
        );
    }

    #[test]
    fn test_no_token() {
        let parts = parts(Request::builder().header(AUTHORIZATION, "Basic dXNlcjpwYXNz"));
        assert!(access_token_from_parts(&parts).is_none());

        let parts = parts_with_empty_bearer();
        assert!(access_token_from_parts(&parts).is_none());
    }

    fn parts_with_empty_bearer() -> Parts {
        parts(Request::builder().header(AUTHORIZATION, "Bearer   "))
    }
}
