use url::Url;

/// Hosts we let the browser load avatars from, matched exactly or as a parent domain
pub const ALLOWED_AVATAR_DOMAINS: &[&str] = &[
    "googleusercontent.com",
    "githubusercontent.com",
    "gravatar.com",
    "supabase.co",
];

/// Return the avatar URL only if it is HTTPS and served from an allow-listed host.
///
/// Any parse failure, non-HTTPS scheme, embedded credentials, or host outside
/// [`ALLOWED_AVATAR_DOMAINS`] yields `None`. Subdomains of an allowed domain are
/// accepted; look-alike suffixes such as `evilgravatar.com` are not.
pub fn get_safe_avatar_url(url: Option<&str>) -> Option<String> {
    let raw = url?.trim();
    if raw.is_empty() {
        return None;
    }

    let parsed = Url::parse(raw).ok()?;

    if parsed.scheme() != "https" {
        return None;
    }

    if !parsed.username().is_empty() || parsed.password().is_some() {
        return None;
    }

    let host = parsed.host_str()?.to_ascii_lowercase();
    if !is_allowed_avatar_host(host.trim_end_matches('.')) {
        return None;
    }

    Some(parsed.to_string())
}

/// Exact or subdomain match against the allow-list
pub fn is_allowed_avatar_host(host: &str) -> bool {
    ALLOWED_AVATAR_DOMAINS.iter().any(|domain| {
        host == *domain
            || host
                .strip_suffix(domain)
                .is_some_and(|prefix| prefix.ends_with('.') && prefix.len() > 1)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_exact_and_subdomain_matches() {
        assert_eq!(
            get_safe_avatar_url(Some("https://gravatar.com/avatar/abc")).as_deref(),
            Some("https://gravatar.com/avatar/abc")
        );
        assert!(get_safe_avatar_url(Some("https://lh3.googleusercontent.com/a/photo.jpg")).is_some());
        assert!(get_safe_avatar_url(Some("https://avatars.githubusercontent.com/u/1?v=4")).is_some());
        assert!(get_safe_avatar_url(Some(
            "https://abcdefgh.supabase.co/storage/v1/object/public/avatars/1.png"
        ))
        .is_some());
    }

    #[test]
    fn test_rejects_non_https() {
        assert!(get_safe_avatar_url(Some("http://gravatar.com/avatar/abc")).is_none());
        assert!(get_safe_avatar_url(Some("javascript:alert(1)")).is_none());
        assert!(get_safe_avatar_url(Some("data:image/png;base64,AAAA")).is_none());
        assert!(get_safe_avatar_url(Some("//gravatar.com/avatar/abc")).is_none());
    }

    #[test]
    fn test_rejects_hosts_outside_allow_list() {
        assert!(get_safe_avatar_url(Some("https://example.com/a.png")).is_none());
        assert!(get_safe_avatar_url(Some("https://evilgravatar.com/a.png")).is_none());
        assert!(get_safe_avatar_url(Some("https://gravatar.com.evil.net/a.png")).is_none());
        assert!(get_safe_avatar_url(Some("https://127.0.0.1/a.png")).is_none());
    }

    #[test]
    fn test_rejects_credentials_and_garbage() {
        assert!(get_safe_avatar_url(Some("https://user:pw@gravatar.com/a.png")).is_none());
        assert!(get_safe_avatar_url(Some("not a url")).is_none());
        assert!(get_safe_avatar_url(Some("   ")).is_none());
        assert!(get_safe_avatar_url(None).is_none());
    }

    #[test]
    fn test_host_matching_is_case_insensitive() {
        assert!(get_safe_avatar_url(Some("https://LH3.GoogleUserContent.COM/a")).is_some());
        assert!(is_allowed_avatar_host("cdn.supabase.co"));
        assert!(!is_allowed_avatar_host(".supabase.co"));
        assert!(!is_allowed_avatar_host("notsupabase.co"));
    }
}
