use uuid::Uuid;

use super::{CreateUploadRequest, ValidationError, ValidationResult, WaitlistRequest};

/// Trait for validating input models
pub trait Validate {
    fn validate(&self) -> ValidationResult<()>;
}

/// Validation constants
pub const MAX_TITLE_LENGTH: usize = 100;
pub const MAX_DESCRIPTION_LENGTH: usize = 5000;
pub const MAX_EMAIL_LENGTH: usize = 254;
pub const MAX_SOURCE_LENGTH: usize = 50;

impl Validate for CreateUploadRequest {
    fn validate(&self) -> ValidationResult<()> {
        parse_channel_id(&self.channel_id)?;
        validate_video_title(&self.title)?;
        validate_video_description(self.description.as_deref())?;
        Ok(())
    }
}

impl Validate for WaitlistRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_email(&self.email)?;
        validate_waitlist_source(self.source.as_deref())?;
        Ok(())
    }
}

/// Parse and validate a channel id
pub fn parse_channel_id(channel_id: &str) -> ValidationResult<Uuid> {
    let trimmed = channel_id.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::RequiredField {
            field: "channelId".to_string(),
        });
    }

    Uuid::parse_str(trimmed).map_err(|_| ValidationError::InvalidFormat {
        field: "channelId".to_string(),
        expected: "UUID".to_string(),
    })
}

/// Validate video title
pub fn validate_video_title(title: &str) -> ValidationResult<()> {
    let trimmed = title.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::RequiredField {
            field: "title".to_string(),
        });
    }

    let length = trimmed.chars().count();

    if length > MAX_TITLE_LENGTH {
        return Err(ValidationError::TooLong {
            field: "title".to_string(),
            max_length: MAX_TITLE_LENGTH,
            actual_length: length,
        });
    }

    if trimmed.chars().any(char::is_control) {
        return Err(ValidationError::InvalidValue {
            field: "title".to_string(),
            value: title.to_string(),
            reason: "Contains invalid control characters".to_string(),
        });
    }

    Ok(())
}

/// Validate optional video description
pub fn validate_video_description(description: Option<&str>) -> ValidationResult<()> {
    if let Some(description) = description {
        let length = description.trim().chars().count();

        if length > MAX_DESCRIPTION_LENGTH {
            return Err(ValidationError::TooLong {
                field: "description".to_string(),
                max_length: MAX_DESCRIPTION_LENGTH,
                actual_length: length,
            });
        }
    }

    Ok(())
}

/// Validate email address shape
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::RequiredField {
            field: "email".to_string(),
        });
    }

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max_length: MAX_EMAIL_LENGTH,
            actual_length: trimmed.len(),
        });
    }

    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        expected: "a valid email address".to_string(),
    };

    if trimmed.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(invalid());
    }

    let (local, domain) = trimmed.split_once('@').ok_or_else(invalid)?;

    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
        return Err(invalid());
    }

    Ok(())
}

/// Validate optional waitlist source tag
pub fn validate_waitlist_source(source: Option<&str>) -> ValidationResult<()> {
    if let Some(source) = source {
        let trimmed = source.trim();

        if trimmed.len() > MAX_SOURCE_LENGTH {
            return Err(ValidationError::TooLong {
                field: "source".to_string(),
                max_length: MAX_SOURCE_LENGTH,
                actual_length: trimmed.len(),
            });
        }

        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ValidationError::InvalidFormat {
                field: "source".to_string(),
                expected: "Only letters, digits, hyphens, and underscores".to_string(),
            });
        }
    }

    Ok(())
}
