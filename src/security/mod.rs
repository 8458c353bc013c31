pub mod avatar;
pub mod csp;
pub mod routes;

pub use avatar::{get_safe_avatar_url, is_allowed_avatar_host, ALLOWED_AVATAR_DOMAINS};
pub use csp::{content_security_policy, CSP_DIRECTIVES};
pub use routes::{is_matched_route, WEBHOOK_PREFIX};
