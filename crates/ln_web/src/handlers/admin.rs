use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use ln_core::bulk::{apply_bulk, BulkAction};
use ln_core::cleanup::{cleanup_stored, cutoff, CleanupReport};
use ln_core::repository::{keys, AuthState, AutoImportSettings};
use ln_core::scheduler::ScheduleOutcome;
use ln_core::types::{new_story_id, ArticleDraft};
use ln_core::{Article, ScheduledPublish};
use ln_inference::SeoReport;
use ln_sources::CycleReport;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::catalog;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

type AppStateRef = State<Arc<AppState>>;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
}

pub async fn login(State(state): AppStateRef, Json(req): Json<LoginRequest>) -> ApiResult<Json<LoginResponse>> {
    if !state.config.credentials_match(&req.username, &req.password) {
        warn!("Failed admin login for '{}'", req.username);
        return Err(ApiError::new(StatusCode::UNAUTHORIZED, "Invalid username or password"));
    }
    let token = uuid::Uuid::new_v4().to_string();
    state
        .repo
        .set_auth(&AuthState {
            authenticated: true,
            username: Some(req.username.clone()),
            token: Some(token.clone()),
            logged_in_at: Some(Utc::now()),
        })
        .await?;
    info!("🔑 {} logged in", req.username);
    Ok(Json(LoginResponse {
        token,
        username: req.username,
    }))
}

pub async fn logout(State(state): AppStateRef) -> ApiResult<StatusCode> {
    state.repo.set_auth(&AuthState::default()).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_stories(State(state): AppStateRef) -> ApiResult<Json<Vec<Article>>> {
    let mut stories = state.repo.admin_stories().await?;
    stories.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    Ok(Json(stories))
}

pub async fn create_story(
    State(state): AppStateRef,
    Json(draft): Json<ArticleDraft>,
) -> ApiResult<(StatusCode, Json<Article>)> {
    draft.validate()?;
    let now = Utc::now();
    let article = draft.into_article(new_story_id(now), now, |text| state.classify(text));
    state
        .repo
        .update(keys::ADMIN_STORIES, |stories: &mut Vec<Article>| stories.push(article.clone()))
        .await?;
    info!("📝 Created story {} ({})", article.id, article.category);
    Ok((StatusCode::CREATED, Json(article)))
}

pub async fn get_story(State(state): AppStateRef, Path(id): Path<String>) -> ApiResult<Json<Article>> {
    state
        .repo
        .admin_stories()
        .await?
        .into_iter()
        .find(|a| a.id == id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("story '{}'", id)))
}

pub async fn update_story(
    State(state): AppStateRef,
    Path(id): Path<String>,
    Json(draft): Json<ArticleDraft>,
) -> ApiResult<Json<Article>> {
    draft.validate()?;
    let updated = state
        .repo
        .update(keys::ADMIN_STORIES, |stories: &mut Vec<Article>| {
            stories.iter_mut().find(|a| a.id == id).map(|article| {
                draft.clone().apply_to(article);
                article.clone()
            })
        })
        .await?;
    updated
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("story '{}'", id)))
}

pub async fn delete_story(State(state): AppStateRef, Path(id): Path<String>) -> ApiResult<StatusCode> {
    let removed = state
        .repo
        .update(keys::ADMIN_STORIES, |stories: &mut Vec<Article>| {
            let before = stories.len();
            stories.retain(|a| a.id != id);
            before != stories.len()
        })
        .await?;
    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(format!("story '{}'", id)))
    }
}

#[derive(Debug, Deserialize)]
pub struct BulkRequest {
    pub ids: Vec<String>,
    pub action: BulkAction,
}

#[derive(Debug, Serialize)]
pub struct BulkResponse {
    pub affected: usize,
    pub summary: String,
}

pub async fn bulk_stories(State(state): AppStateRef, Json(req): Json<BulkRequest>) -> ApiResult<Json<BulkResponse>> {
    let selected: HashSet<String> = req.ids.into_iter().collect();
    let (affected, summary) = state
        .repo
        .update(keys::ADMIN_STORIES, |stories: &mut Vec<Article>| {
            let outcome = apply_bulk(std::mem::take(stories), &selected, req.action);
            *stories = outcome.items;
            (outcome.affected, outcome.summary)
        })
        .await?;
    info!("📦 {}", summary);
    Ok(Json(BulkResponse { affected, summary }))
}

#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    pub story: ArticleDraft,
    pub publish_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ScheduleResponse {
    Published { article: Article },
    Scheduled { record: ScheduledPublish },
}

pub async fn list_schedule(State(state): AppStateRef) -> ApiResult<Json<Vec<ScheduledPublish>>> {
    Ok(Json(state.scheduler.list().await?))
}

pub async fn create_schedule(
    State(state): AppStateRef,
    Json(req): Json<ScheduleRequest>,
) -> ApiResult<(StatusCode, Json<ScheduleResponse>)> {
    req.story.validate()?;
    let now = Utc::now();
    let article = req
        .story
        .into_article(new_story_id(now), now, |text| state.classify(text));
    let response = match state.scheduler.schedule(article, req.publish_at, now).await? {
        ScheduleOutcome::Published(article) => ScheduleResponse::Published { article },
        ScheduleOutcome::Pending(record) => ScheduleResponse::Scheduled { record },
    };
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn cancel_schedule(State(state): AppStateRef, Path(id): Path<String>) -> ApiResult<StatusCode> {
    if state.scheduler.cancel(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(format!("scheduled story '{}'", id)))
    }
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub published: Vec<Article>,
}

pub async fn check_schedule(State(state): AppStateRef) -> ApiResult<Json<CheckResponse>> {
    let published = state.scheduler.check_due(Utc::now()).await?;
    Ok(Json(CheckResponse { published }))
}

#[derive(Debug, Deserialize)]
pub struct ImportUrlRequest {
    pub url: String,
    /// Store the draft as an admin story instead of only returning it.
    #[serde(default)]
    pub save: bool,
}

pub async fn import_url(State(state): AppStateRef, Json(req): Json<ImportUrlRequest>) -> ApiResult<Json<Article>> {
    let article = state.ingestor.import_page(&req.url, Utc::now()).await?;
    if req.save {
        state
            .repo
            .update(keys::ADMIN_STORIES, |stories: &mut Vec<Article>| {
                stories.retain(|a| a.id != article.id);
                stories.push(article.clone());
            })
            .await?;
        info!("📥 Imported {} as a story", req.url);
    }
    Ok(Json(article))
}

#[derive(Debug, Deserialize)]
pub struct FeedRequest {
    pub url: String,
}

pub async fn import_feed(State(state): AppStateRef, Json(req): Json<FeedRequest>) -> ApiResult<Json<Vec<Article>>> {
    Ok(Json(state.ingestor.preview_feed(&req.url, Utc::now()).await?))
}

pub async fn import_run(State(state): AppStateRef) -> ApiResult<Json<CycleReport>> {
    Ok(Json(state.ingestor.run_cycle(Utc::now()).await?))
}

pub async fn get_auto_import(State(state): AppStateRef) -> ApiResult<Json<AutoImportSettings>> {
    Ok(Json(state.repo.auto_import_settings().await?))
}

#[derive(Debug, Deserialize)]
pub struct AutoImportUpdate {
    pub enabled: bool,
    #[serde(default)]
    pub interval_minutes: Option<u64>,
}

pub async fn put_auto_import(
    State(state): AppStateRef,
    Json(req): Json<AutoImportUpdate>,
) -> ApiResult<Json<AutoImportSettings>> {
    let current = state.repo.auto_import_settings().await?;
    let interval = req.interval_minutes.unwrap_or(current.interval_minutes);
    state.repo.set_auto_import(req.enabled, interval).await?;
    info!(
        "⚙️ Auto-import {} every {} minutes",
        if req.enabled { "enabled" } else { "disabled" },
        interval.max(1)
    );
    Ok(Json(state.repo.auto_import_settings().await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct SeoRequest {
    /// Id or slug of a published article.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub story: Option<ArticleDraft>,
}

pub async fn seo(State(state): AppStateRef, Json(req): Json<SeoRequest>) -> ApiResult<Json<SeoReport>> {
    let article = match (req.id, req.story) {
        (Some(id), _) => catalog::published(&state.repo)
            .await?
            .into_iter()
            .find(|a| a.id == id || a.slug == id)
            .ok_or_else(|| ApiError::not_found(format!("article '{}'", id)))?,
        (None, Some(draft)) => {
            let now = Utc::now();
            draft.into_article("draft".to_string(), now, |text| state.classify(text))
        }
        (None, None) => {
            return Err(ApiError::new(StatusCode::BAD_REQUEST, "Provide an article id or a story"));
        }
    };
    Ok(Json(state.seo.analyze(&article)))
}

fn default_days() -> u32 {
    30
}

#[derive(Debug, Deserialize)]
pub struct CleanupRequest {
    #[serde(default = "default_days")]
    pub older_than_days: u32,
}

pub async fn cleanup(State(state): AppStateRef, Json(req): Json<CleanupRequest>) -> ApiResult<Json<CleanupReport>> {
    if req.older_than_days == 0 {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "older_than_days must be at least 1"));
    }
    let report = cleanup_stored(&state.repo, cutoff(Utc::now(), req.older_than_days)?).await?;
    info!("🧹 Removed {} old articles", report.total());
    Ok(Json(report))
}
