use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::models::{AuthError, AuthSession, AuthUser};

/// Refresh the session when the access token expires within this many seconds
pub const REFRESH_WINDOW_SECONDS: i64 = 60;

/// Identity provider operations used by the request pipeline
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Resolve the user behind an access token
    async fn get_user(&self, access_token: &str) -> Result<AuthUser, AuthError>;

    /// Exchange a refresh token for a fresh session
    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, AuthError>;
}

/// Supabase Auth (GoTrue) client
pub struct SupabaseAuthClient {
    http: Client,
    auth_url: String,
    anon_key: String,
}

impl SupabaseAuthClient {
    pub fn new(http: Client, supabase_url: &str, anon_key: impl Into<String>) -> Self {
        Self {
            http,
            auth_url: format!("{}/auth/v1", supabase_url.trim_end_matches('/')),
            anon_key: anon_key.into(),
        }
    }

    async fn rejection_or_upstream(response: Response, rejected: &[StatusCode]) -> AuthError {
        let status = response.status();
        if rejected.contains(&status) {
            return AuthError::InvalidToken;
        }

        let message = response.text().await.unwrap_or_default();
        AuthError::Upstream {
            status: status.as_u16(),
            message: message.chars().take(200).collect(),
        }
    }
}

fn map_transport_error(error: reqwest::Error) -> AuthError {
    AuthError::Http {
        message: error.to_string(),
    }
}

#[async_trait]
impl AuthProvider for SupabaseAuthClient {
    #[instrument(name = "auth_get_user", skip_all, fields(otel.kind = "client", peer.service = "supabase-auth"))]
    async fn get_user(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        if access_token.trim().is_empty() {
            return Err(AuthError::MissingToken);
        }

        let response = self
            .http
            .get(format!("{}/user", self.auth_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            let error = Self::rejection_or_upstream(
                response,
                &[StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN],
            )
            .await;
            warn!(error = %error, "Access token was not accepted");
            return Err(error);
        }

        response.json::<AuthUser>().await.map_err(|e| AuthError::Upstream {
            status: StatusCode::OK.as_u16(),
            message: format!("invalid user payload: {}", e),
        })
    }

    #[instrument(name = "auth_refresh_session", skip_all, fields(otel.kind = "client", peer.service = "supabase-auth"))]
    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
        if refresh_token.trim().is_empty() {
            return Err(AuthError::MissingToken);
        }

        let response = self
            .http
            .post(format!("{}/token", self.auth_url))
            .query(&[("grant_type", "refresh_token")])
            .header("apikey", &self.anon_key)
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            // GoTrue answers 400 invalid_grant for revoked or reused refresh tokens
            let error = Self::rejection_or_upstream(
                response,
                &[StatusCode::BAD_REQUEST, StatusCode::UNAUTHORIZED],
            )
            .await;
            warn!(error = %error, "Session refresh failed");
            return Err(error);
        }

        let session = response
            .json::<AuthSession>()
            .await
            .map_err(|e| AuthError::Upstream {
                status: StatusCode::OK.as_u16(),
                message: format!("invalid session payload: {}", e),
            })?;

        info!("Session refreshed");
        Ok(session)
    }
}

#[derive(Debug, Deserialize)]
struct ExpiryClaims {
    exp: i64,
}

/// Read the `exp` claim of an access token without verifying its signature.
///
/// The signature is checked by the auth provider on every `get_user` call; this
/// only decides whether a refresh is worth attempting.
pub fn access_token_expiry(token: &str) -> Option<i64> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;

    decode::<ExpiryClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .ok()
        .map(|data| data.claims.exp)
}

/// True when `token` is unreadable or expires within `window_seconds` of `now`
pub fn token_expires_within(token: &str, now: i64, window_seconds: i64) -> bool {
    match access_token_expiry(token) {
        Some(exp) => exp - now <= window_seconds,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use uuid::Uuid;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn token_with_exp(exp: i64) -> String {
        encode(
            &Header::default(),
            &json!({ "sub": "user", "exp": exp }),
            &EncodingKey::from_secret(b"some-project-secret"),
        )
        .unwrap()
    }

    #[test]
    fn test_access_token_expiry_ignores_signature() {
        let token = token_with_exp(1_700_000_000);
        assert_eq!(access_token_expiry(&token), Some(1_700_000_000));
    }

    #[test]
    fn test_token_expires_within_window() {
        let now = 1_700_000_000;

        assert!(token_expires_within(&token_with_exp(now + 30), now, 60));
        assert!(token_expires_within(&token_with_exp(now - 10), now, 60));
        assert!(!token_expires_within(&token_with_exp(now + 3600), now, 60));
    }

    #[test]
    fn test_garbage_token_counts_as_expired() {
        assert!(access_token_expiry("not-a-jwt").is_none());
        assert!(token_expires_within("not-a-jwt", 0, 60));
    }

    #[tokio::test]
    async fn test_get_user_success() {
        let server = MockServer::start().await;
        let user_id = Uuid::new_v4();

        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .and(header("apikey", "anon-key"))
            .and(header("authorization", "Bearer access-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": user_id,
                "email": "ada@example.com",
                "user_metadata": { "full_name": "Ada Lovelace" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = SupabaseAuthClient::new(reqwest::Client::new(), &server.uri(), "anon-key");
        let user = client.get_user("access-token").await.unwrap();

        assert_eq!(user.id, user_id);
        assert_eq!(user.display_name().as_deref(), Some("Ada Lovelace"));
    }

    #[tokio::test]
    async fn test_get_user_rejected_token() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "msg": "invalid JWT"
            })))
            .mount(&server)
            .await;

        let client = SupabaseAuthClient::new(reqwest::Client::new(), &server.uri(), "anon-key");
        let error = client.get_user("expired").await.unwrap_err();

        assert!(matches!(error, AuthError::InvalidToken));
        assert!(error.is_rejection());
    }

    #[tokio::test]
    async fn test_get_user_provider_outage() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let client = SupabaseAuthClient::new(reqwest::Client::new(), &server.uri(), "anon-key");
        let error = client.get_user("token").await.unwrap_err();

        assert!(matches!(error, AuthError::Upstream { status: 503, .. }));
        assert!(!error.is_rejection());
    }

    #[tokio::test]
    async fn test_empty_token_skips_provider() {
        let client =
            SupabaseAuthClient::new(reqwest::Client::new(), "http://127.0.0.1:9", "anon-key");

        assert!(matches!(
            client.get_user("  ").await,
            Err(AuthError::MissingToken)
        ));
        assert!(matches!(
            client.refresh_session("").await,
            Err(AuthError::MissingToken)
        ));
    }

    #[tokio::test]
    async fn test_refresh_session_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "refresh_token"))
            .and(header("apikey", "anon-key"))
            .and(body_json(json!({ "refresh_token": "refresh-1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "access-2",
                "token_type": "bearer",
                "expires_in": 3600,
                "expires_at": 1_700_003_600,
                "refresh_token": "refresh-2",
                "user": { "id": Uuid::new_v4() }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = SupabaseAuthClient::new(reqwest::Client::new(), &server.uri(), "anon-key");
        let session = client.refresh_session("refresh-1").await.unwrap();

        assert_eq!(session.access_token, "access-2");
        assert_eq!(session.refresh_token, "refresh-2");
        assert_eq!(session.expires_in, Some(3600));
    }

    #[tokio::test]
    async fn test_refresh_session_invalid_grant() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid Refresh Token: Already Used"
            })))
            .mount(&server)
            .await;

        let client = SupabaseAuthClient::new(reqwest::Client::new(), &server.uri(), "anon-key");

        assert!(matches!(
            client.refresh_session("used").await,
            Err(AuthError::InvalidToken)
        ));
    }
}
