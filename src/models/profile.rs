use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// User returned by the auth provider for a valid access token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Value,
}

impl AuthUser {
    fn metadata_str(&self, key: &str) -> Option<&str> {
        self.user_metadata
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn display_name(&self) -> Option<String> {
        self.metadata_str("full_name")
            .or_else(|| self.metadata_str("name"))
            .map(str::to_string)
    }

    /// Avatar URL exactly as the identity provider reported it; unsanitized
    pub fn raw_avatar_url(&self) -> Option<&str> {
        self.metadata_str("avatar_url")
            .or_else(|| self.metadata_str("picture"))
    }
}

/// Session issued by the auth provider on refresh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<i64>,
}

/// Data returned by `GET /api/me`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: Uuid,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user_with_metadata(metadata: Value) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: Some("ada@example.com".to_string()),
            user_metadata: metadata,
        }
    }

    #[test]
    fn test_display_name_prefers_full_name() {
        let user = user_with_metadata(json!({ "full_name": "Ada Lovelace", "name": "ada" }));
        assert_eq!(user.display_name().as_deref(), Some("Ada Lovelace"));

        let user = user_with_metadata(json!({ "name": "ada" }));
        assert_eq!(user.display_name().as_deref(), Some("ada"));

        let user = user_with_metadata(Value::Null);
        assert_eq!(user.display_name(), None);
    }

    #[test]
    fn test_raw_avatar_url_falls_back_to_picture() {
        let user = user_with_metadata(json!({ "picture": "https://lh3.googleusercontent.com/a" }));
        assert_eq!(
            user.raw_avatar_url(),
            Some("https://lh3.googleusercontent.com/a")
        );
    }

    #[test]
    fn test_auth_user_deserializes_without_metadata() {
        let user: AuthUser = serde_json::from_value(json!({
            "id": "9a8b7c6d-5e4f-4a3b-8c2d-1e0f9a8b7c6d",
            "aud": "authenticated"
        }))
        .unwrap();

        assert!(user.email.is_none());
        assert!(user.raw_avatar_url().is_none());
    }
}
