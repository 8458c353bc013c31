use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderMap, HeaderName, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::auth::{RefreshedAccessToken, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
use super::{error_response, ApiError};
use crate::models::{AuthSession, ErrorCode};
use crate::security::{content_security_policy, is_matched_route};
use crate::services::auth_service::{token_expires_within, REFRESH_WINDOW_SECONDS};
use crate::services::AuthProvider;

const STATIC_SECURITY_HEADERS: &[(&str, &str)] = &[
    ("x-frame-options", "DENY"),
    ("x-content-type-options", "nosniff"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    ("x-xss-protection", "1; mode=block"),
];

/// Security headers middleware
pub async fn security_headers_middleware(request: Request<Body>, next: Next) -> Response {
    let matched = is_matched_route(request.uri().path());
    let mut response = next.run(request).await;

    if matched {
        apply_security_headers(response.headers_mut());
    }

    response
}

fn apply_security_headers(headers: &mut HeaderMap) {
    for &(name, value) in STATIC_SECURITY_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }

    match HeaderValue::from_str(content_security_policy()) {
        Ok(policy) => {
            headers.insert(header::CONTENT_SECURITY_POLICY, policy);
        }
        Err(e) => error!(error = %e, "Content-Security-Policy is not a valid header value"),
    }
}

/// What the session middleware needs from the app
#[derive(Clone)]
pub struct SessionRefresh {
    pub auth: Arc<dyn AuthProvider>,
    pub secure_cookies: bool,
}

enum RefreshOutcome {
    Refreshed(AuthSession),
    Rejected,
    Skipped,
}

/// Keep the cookie session alive.
///
/// When the access token is missing or about to expire and a refresh token is
/// present, the session is refreshed before the handler runs and the rotated
/// cookies are written on the way out.
pub async fn session_refresh_middleware(
    session: SessionRefresh,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if !is_matched_route(request.uri().path()) {
        return next.run(request).await;
    }

    let jar = CookieJar::from_headers(request.headers());
    let outcome = refresh_if_needed(&session, &jar, chrono::Utc::now().timestamp()).await;

    if let RefreshOutcome::Refreshed(fresh) = &outcome {
        request
            .extensions_mut()
            .insert(RefreshedAccessToken(fresh.access_token.clone()));
    }

    let mut response = next.run(request).await;

    let cookies = match outcome {
        RefreshOutcome::Refreshed(fresh) => vec![
            session_cookie(ACCESS_TOKEN_COOKIE, fresh.access_token, session.secure_cookies),
            session_cookie(REFRESH_TOKEN_COOKIE, fresh.refresh_token, session.secure_cookies),
        ],
        RefreshOutcome::Rejected => vec![
            removal_cookie(ACCESS_TOKEN_COOKIE, session.secure_cookies),
            removal_cookie(REFRESH_TOKEN_COOKIE, session.secure_cookies),
        ],
        RefreshOutcome::Skipped => Vec::new(),
    };

    for cookie in cookies {
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => error!(error = %e, cookie = cookie.name(), "Unable to encode session cookie"),
        }
    }

    response
}

async fn refresh_if_needed(session: &SessionRefresh, jar: &CookieJar, now: i64) -> RefreshOutcome {
    let Some(refresh_token) = jar
        .get(REFRESH_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
    else {
        return RefreshOutcome::Skipped;
    };

    let needs_refresh = match jar.get(ACCESS_TOKEN_COOKIE) {
        Some(cookie) if !cookie.value().is_empty() => {
            token_expires_within(cookie.value(), now, REFRESH_WINDOW_SECONDS)
        }
        _ => true,
    };
    if !needs_refresh {
        return RefreshOutcome::Skipped;
    }

    match session.auth.refresh_session(&refresh_token).await {
        Ok(fresh) => {
            debug!("Session refreshed");
            RefreshOutcome::Refreshed(fresh)
        }
        Err(e) if e.is_rejection() => {
            warn!(error = %e, "Refresh token rejected, clearing session cookies");
            RefreshOutcome::Rejected
        }
        Err(e) => {
            warn!(error = %e, "Session refresh failed, leaving cookies untouched");
            RefreshOutcome::Skipped
        }
    }
}

fn session_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

fn removal_cookie(name: &'static str, secure: bool) -> Cookie<'static> {
    let mut cookie = session_cookie(name, String::new(), secure);
    cookie.make_removal();
    cookie
}

/// Content-type and size pre-checks for the unauthenticated routes that take a body
pub async fn request_validation_middleware(
    max_request_size: usize,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    validate_content_type(&request)?;
    validate_request_size(&request, max_request_size)?;

    Ok(next.run(request).await)
}

fn has_body(method: &Method) -> bool {
    method == Method::POST || method == Method::PUT || method == Method::PATCH
}

/// Validate content type for requests with body
pub fn validate_content_type(request: &Request<Body>) -> Result<(), ApiError> {
    if !has_body(request.method()) {
        return Ok(());
    }

    match request.headers().get(header::CONTENT_TYPE) {
        Some(content_type) => {
            let content_type = content_type.to_str().unwrap_or("");
            if !content_type.starts_with("application/json") {
                warn!("Invalid content type: {}", content_type);
                return Err(error_response(
                    ErrorCode::BadRequest,
                    "Content-Type must be application/json",
                ));
            }
            Ok(())
        }
        None => {
            warn!("Missing content type header");
            Err(error_response(
                ErrorCode::BadRequest,
                "Content-Type header is required for requests with body",
            ))
        }
    }
}

/// Validate request size
pub fn validate_request_size(request: &Request<Body>, max_request_size: usize) -> Result<(), ApiError> {
    let Some(length) = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<usize>().ok())
    else {
        return Ok(());
    };

    if length > max_request_size {
        error!("Request too large: {} bytes", length);
        return Err(error_response(
            ErrorCode::BadRequest,
            format!(
                "Request size {} bytes exceeds maximum of {} bytes",
                length, max_request_size
            ),
        ));
    }

    Ok(())
}
