use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use crate::error::ApiError;
use crate::AppState;

/// Header carrying the session token handed out by the login route.
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Lets the request through when its token matches the stored session.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .ok_or_else(ApiError::unauthorized)?;

    let auth = state.repo.auth().await?;
    if !auth.authenticated || auth.token.as_deref() != Some(token.as_str()) {
        debug!("Rejected admin request to {}", req.uri().path());
        return Err(ApiError::unauthorized());
    }
    Ok(next.run(req).await)
}
