use axum::response::Html;
use tracing::instrument;

const LANDING_PAGE: &str = include_str!("../../assets/landing.html");

/// Landing page with the waitlist form
#[instrument(name = "landing_page")]
pub async fn landing_page() -> Html<&'static str> {
    Html(LANDING_PAGE)
}
