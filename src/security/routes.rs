/// Path prefixes served as static assets
const ASSET_PREFIXES: &[&str] = &["/assets/", "/static/"];

/// Path prefix for provider callbacks, which carry their own signature auth
pub const WEBHOOK_PREFIX: &str = "/api/webhooks/";

const ASSET_EXTENSIONS: &[&str] = &["svg", "png", "jpg", "jpeg", "gif", "webp", "ico"];

/// Whether the security-header and session middleware apply to `path`.
///
/// Everything matches except static assets, image files, the favicon, and
/// webhook routes.
pub fn is_matched_route(path: &str) -> bool {
    if path == "/favicon.ico" {
        return false;
    }

    if path.starts_with(WEBHOOK_PREFIX) {
        return false;
    }

    if ASSET_PREFIXES.iter().any(|prefix| path.starts_with(prefix)) {
        return false;
    }

    let file_name = path.rsplit('/').next().unwrap_or(path);
    match file_name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => !ASSET_EXTENSIONS
            .iter()
            .any(|candidate| extension.eq_ignore_ascii_case(candidate)),
        _ => true,
    }
}
