//! Category API handlers

use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;

use crate::core::ServerState;
use crate::store::Category;
use crate::utils::error::{AppError, AppResult, ok};
use shared::ApiResponse;
use shared::util::snowflake_id;

#[derive(Debug, Deserialize)]
pub struct CategoryCreate {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Deserialize)]
pub struct CategoryUpdate {
    pub name: Option<String>,
}

/// GET /api/categories
pub async fn list(
    State(state): State<ServerState>,
) -> AppResult<Json<ApiResponse<Vec<Category>>>> {
    Ok(ok(state.store.list_categories()?))
}

/// GET /api/categories/:id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Category>>> {
    let category = state
        .store
        .get_category(id)?
        .ok_or_else(|| AppError::NotFound(format!("Category {}", id)))?;
    Ok(ok(category))
}

/// POST /api/categories
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<CategoryCreate>,
) -> AppResult<Json<ApiResponse<Category>>> {
    if payload.slug.trim().is_empty() {
        return Err(AppError::Validation("slug must not be empty".into()));
    }
    if state
        .store
        .list_categories()?
        .iter()
        .any(|c| c.slug == payload.slug)
    {
        return Err(AppError::InvalidState(format!(
            "Category slug already exists: {}",
            payload.slug
        )));
    }

    let category = Category {
        id: snowflake_id(),
        name: payload.name,
        slug: payload.slug,
    };
    let txn = state.store.begin_write()?;
    state.store.put_category(&txn, &category)?;
    txn.commit().map_err(crate::store::StorageError::from)?;
    Ok(ok(category))
}

/// PUT /api/categories/:id
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<CategoryUpdate>,
) -> AppResult<Json<ApiResponse<Category>>> {
    let txn = state.store.begin_write()?;
    let mut category = state
        .store
        .get_category(id)?
        .ok_or_else(|| AppError::NotFound(format!("Category {}", id)))?;

    if let Some(name) = payload.name {
        category.name = name;
    }

    state.store.put_category(&txn, &category)?;
    txn.commit().map_err(crate::store::StorageError::from)?;
    Ok(ok(category))
}
