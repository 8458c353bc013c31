use axum::response::Json;
use tracing::instrument;

use super::{ApiError, AuthenticatedUser};
use crate::models::{ApiResponse, AuthUser, ProfileResponse};
use crate::security::get_safe_avatar_url;

/// Profile of the signed-in user
#[instrument(name = "get_profile", skip(user), fields(user_id = %user.0.id))]
pub async fn get_profile(
    user: AuthenticatedUser,
) -> Result<Json<ApiResponse<ProfileResponse>>, ApiError> {
    Ok(Json(ApiResponse::ok(profile_for(&user.0))))
}

pub fn profile_for(user: &AuthUser) -> ProfileResponse {
    ProfileResponse {
        id: user.id,
        email: user.email.clone(),
        display_name: user.display_name(),
        avatar_url: get_safe_avatar_url(user.raw_avatar_url()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn test_profile_drops_untrusted_avatar() {
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: Some("ada@example.com".to_string()),
            user_metadata: json!({
                "full_name": "Ada Lovelace",
                "avatar_url": "http://evil.example.com/a.png"
            }),
        };

        let profile = profile_for(&user);
        assert_eq!(profile.display_name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(profile.avatar_url, None);
    }

    #[test]
    fn test_profile_keeps_allowed_avatar() {
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: None,
            user_metadata: json!({
                "avatar_url": "https://avatars.githubusercontent.com/u/1?v=4"
            }),
        };

        let profile = profile_for(&user);
        assert_eq!(
            profile.avatar_url.as_deref(),
            Some("https://avatars.githubusercontent.com/u/1?v=4")
        );
    }
}
