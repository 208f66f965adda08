use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use ln_core::{Article, Category};
use serde::Serialize;
use serde_json::{json, Value};

use crate::catalog::{self, ArticleQuery, CategoryCount, HomePage};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn home(State(state): State<Arc<AppState>>) -> ApiResult<Json<HomePage>> {
    let all = catalog::published(&state.repo).await?;
    Ok(Json(catalog::home(&all)))
}

pub async fn list_articles(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ArticleQuery>,
) -> ApiResult<Json<Vec<Article>>> {
    let all = catalog::published(&state.repo).await?;
    Ok(Json(catalog::filter(all, &query)?))
}

pub async fn get_article(State(state): State<Arc<AppState>>, Path(slug): Path<String>) -> ApiResult<Json<Article>> {
    let all = catalog::published(&state.repo).await?;
    catalog::by_slug(&all, &slug)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("article '{}'", slug)))
}

pub async fn related_articles(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> ApiResult<Json<Vec<Article>>> {
    let all = catalog::published(&state.repo).await?;
    let article = catalog::by_slug(&all, &slug).ok_or_else(|| ApiError::not_found(format!("article '{}'", slug)))?;
    Ok(Json(catalog::related(&all, article, catalog::RELATED_LIMIT)))
}

pub async fn categories(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<CategoryCount>>> {
    let all = catalog::published(&state.repo).await?;
    Ok(Json(catalog::category_counts(&all)))
}

#[derive(Debug, Serialize)]
pub struct CategoryPage {
    pub category: Category,
    pub articles: Vec<Article>,
}

pub async fn category_page(
    State(state): State<Arc<AppState>>,
    Path(category): Path<String>,
) -> ApiResult<Json<CategoryPage>> {
    let category: Category = category
        .parse()
        .map_err(|_| ApiError::not_found(format!("category '{}'", category)))?;
    let all = catalog::published(&state.repo).await?;
    let articles = all.into_iter().filter(|a| a.category == category).collect();
    Ok(Json(CategoryPage { category, articles }))
}

#[derive(Debug, Serialize)]
pub struct CommunityPage {
    pub community: String,
    pub articles: Vec<Article>,
}

pub async fn community_page(
    State(state): State<Arc<AppState>>,
    Path(community): Path<String>,
) -> ApiResult<Json<CommunityPage>> {
    let all = catalog::published(&state.repo).await?;
    let query = ArticleQuery {
        community: Some(community.clone()),
        ..Default::default()
    };
    Ok(Json(CommunityPage {
        community,
        articles: catalog::filter(all, &query)?,
    }))
}
