//! Product API handlers

use axum::Json;
use axum::extract::{Path, State};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::core::ServerState;
use crate::store::Product;
use crate::utils::error::{AppError, AppResult, ok};
use shared::ApiResponse;
use shared::util::snowflake_id;

#[derive(Debug, Deserialize)]
pub struct ProductCreate {
    pub category_id: i64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct ProductUpdate {
    pub category_id: Option<i64>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub is_active: Option<bool>,
}

fn validate_price(price: Decimal) -> AppResult<()> {
    if price <= Decimal::ZERO {
        return Err(AppError::Validation("price must be positive".into()));
    }
    Ok(())
}

/// GET /api/products
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<ApiResponse<Vec<Product>>>> {
    Ok(ok(state.store.list_products()?))
}

/// GET /api/products/:id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let product = state
        .store
        .get_product(id)?
        .ok_or_else(|| AppError::NotFound(format!("Product {}", id)))?;
    Ok(ok(product))
}

/// POST /api/products
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<ProductCreate>,
) -> AppResult<Json<ApiResponse<Product>>> {
    validate_price(payload.price)?;
    if payload.slug.trim().is_empty() {
        return Err(AppError::Validation("slug must not be empty".into()));
    }
    if state
        .store
        .list_products()?
        .iter()
        .any(|p| p.slug == payload.slug)
    {
        return Err(AppError::InvalidState(format!(
            "Product slug already exists: {}",
            payload.slug
        )));
    }

    let product = Product {
        id: snowflake_id(),
        category_id: payload.category_id,
        name: payload.name,
        slug: payload.slug,
        description: payload.description,
        price: payload.price,
        is_active: payload.is_active,
    };
    let txn = state.store.begin_write()?;
    state.store.put_product(&txn, &product)?;
    txn.commit().map_err(crate::store::StorageError::from)?;
    Ok(ok(product))
}

/// PUT /api/products/:id
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<ProductUpdate>,
) -> AppResult<Json<ApiResponse<Product>>> {
    if let Some(price) = payload.price {
        validate_price(price)?;
    }

    let txn = state.store.begin_write()?;
    let mut product = state
        .store
        .get_product_txn(&txn, id)?
        .ok_or_else(|| AppError::NotFound(format!("Product {}", id)))?;

    if let Some(category_id) = payload.category_id {
        product.category_id = category_id;
    }
    if let Some(name) = payload.name {
        product.name = name;
    }
    if let Some(description) = payload.description {
        product.description = description;
    }
    if let Some(price) = payload.price {
        product.price = price;
    }
    if let Some(is_active) = payload.is_active {
        product.is_active = is_active;
    }

    state.store.put_product(&txn, &product)?;
    txn.commit().map_err(crate::store::StorageError::from)?;
    Ok(ok(product))
}
