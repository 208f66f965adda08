use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod catalog;
pub mod error;
pub mod handlers;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use handlers::{admin, public};

fn admin_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/logout", post(admin::logout))
        .route("/stories", get(admin::list_stories).post(admin::create_story))
        .route("/stories/bulk", post(admin::bulk_stories))
        .route(
            "/stories/:id",
            get(admin::get_story)
                .put(admin::update_story)
                .delete(admin::delete_story),
        )
        .route("/schedule", get(admin::list_schedule).post(admin::create_schedule))
        .route("/schedule/check", post(admin::check_schedule))
        .route("/schedule/:id", delete(admin::cancel_schedule))
        .route("/import/url", post(admin::import_url))
        .route("/import/feed", post(admin::import_feed))
        .route("/import/run", post(admin::import_run))
        .route("/auto-import", get(admin::get_auto_import).put(admin::put_auto_import))
        .route("/seo", post(admin::seo))
        .route("/cleanup", post(admin::cleanup))
        .route_layer(from_fn_with_state(state, auth::require_admin))
        // Login sits outside the auth layer.
        .route("/login", post(admin::login))
}

pub async fn create_app(state: AppState) -> Router {
    let state = Arc::new(state);
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/api/health", get(public::health))
        .route("/api/home", get(public::home))
        .route("/api/articles", get(public::list_articles))
        .route("/api/articles/:slug", get(public::get_article))
        .route("/api/articles/:slug/related", get(public::related_articles))
        .route("/api/categories", get(public::categories))
        .route("/api/categories/:category", get(public::category_page))
        .route("/api/communities/:community", get(public::community_page))
        .nest("/api/admin", admin_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub mod prelude {
    pub use crate::{create_app, AppState};
    pub use ln_core::{Article, Error, Result};
}
