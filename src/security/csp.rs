use once_cell::sync::Lazy;

/// Directives making up the Content-Security-Policy, in emission order
pub const CSP_DIRECTIVES: &[&str] = &[
    "default-src 'self'",
    "script-src 'self' 'unsafe-inline'",
    "style-src 'self' 'unsafe-inline'",
    "img-src 'self' data: blob: https://*.googleusercontent.com https://*.githubusercontent.com https://*.gravatar.com https://gravatar.com https://*.supabase.co https://image.mux.com",
    "media-src 'self' blob: https://stream.mux.com",
    "connect-src 'self' https://*.supabase.co wss://*.supabase.co https://*.mux.com https://storage.googleapis.com",
    "font-src 'self' data:",
    "object-src 'none'",
    "base-uri 'self'",
    "form-action 'self'",
    "frame-ancestors 'none'",
];

static CONTENT_SECURITY_POLICY: Lazy<String> = Lazy::new(|| CSP_DIRECTIVES.join("; "));

/// The policy string sent on every matched route
pub fn content_security_policy() -> &'static str {
    CONTENT_SECURITY_POLICY.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_policy_joins_every_directive() {
        let policy = content_security_policy();

        for directive in CSP_DIRECTIVES {
            assert!(policy.contains(directive), "missing directive: {}", directive);
        }
        assert_eq!(policy.matches("; ").count(), CSP_DIRECTIVES.len() - 1);
        assert!(policy.starts_with("default-src 'self'"));
        assert!(!policy.ends_with(';'));
    }

    #[test]
    fn test_policy_is_built_once() {
        assert!(std::ptr::eq(content_security_policy(), content_security_policy()));
    }

    #[test]
    fn test_policy_is_a_valid_header_value() {
        assert!(HeaderValue::from_str(content_security_policy()).is_ok());
    }
}
