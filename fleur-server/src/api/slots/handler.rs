//! Slot API handlers

use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;

use crate::core::ServerState;
use crate::store::Slot;
use crate::utils::error::{AppError, AppResult, ok};
use shared::ApiResponse;
use shared::util::snowflake_id;

/// Relay channels wired on the cabinet board
const MAX_RELAY_CHANNEL: u8 = 12;

#[derive(Debug, Deserialize)]
pub struct SlotCreate {
    pub code: String,
    pub relay_channel: u8,
    #[serde(default)]
    pub product_id: Option<i64>,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default = "default_enabled")]
    pub is_enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct SlotUpdate {
    pub product_id: Option<Option<i64>>,
    pub quantity: Option<u32>,
    pub is_enabled: Option<bool>,
    pub relay_channel: Option<u8>,
}

fn validate_channel(channel: u8) -> AppResult<()> {
    if channel == 0 || channel > MAX_RELAY_CHANNEL {
        return Err(AppError::Validation(format!(
            "relay_channel must be 1..={}, got {}",
            MAX_RELAY_CHANNEL, channel
        )));
    }
    Ok(())
}

/// GET /api/slots
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<ApiResponse<Vec<Slot>>>> {
    Ok(ok(state.store.list_slots()?))
}

/// GET /api/slots/:id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Slot>>> {
    let slot = state
        .store
        .get_slot(id)?
        .ok_or_else(|| AppError::NotFound(format!("Slot {}", id)))?;
    Ok(ok(slot))
}

/// POST /api/slots
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<SlotCreate>,
) -> AppResult<Json<ApiResponse<Slot>>> {
    validate_channel(payload.relay_channel)?;
    if payload.code.trim().is_empty() {
        return Err(AppError::Validation("code must not be empty".into()));
    }

    let slot = Slot {
        id: snowflake_id(),
        code: payload.code,
        product_id: payload.product_id,
        quantity: payload.quantity,
        is_enabled: payload.is_enabled,
        relay_channel: payload.relay_channel,
    };
    let txn = state.store.begin_write()?;
    state.store.put_slot(&txn, &slot)?;
    txn.commit().map_err(crate::store::StorageError::from)?;
    Ok(ok(slot))
}

/// PUT /api/slots/:id
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<SlotUpdate>,
) -> AppResult<Json<ApiResponse<Slot>>> {
    if let Some(channel) = payload.relay_channel {
        validate_channel(channel)?;
    }

    let txn = state.store.begin_write()?;
    let mut slot = state
        .store
        .get_slot_txn(&txn, id)?
        .ok_or_else(|| AppError::NotFound(format!("Slot {}", id)))?;

    if let Some(product_id) = payload.product_id {
        slot.product_id = product_id;
    }
    if let Some(quantity) = payload.quantity {
        slot.quantity = quantity;
    }
    if let Some(is_enabled) = payload.is_enabled {
        slot.is_enabled = is_enabled;
    }
    if let Some(channel) = payload.relay_channel {
        slot.relay_channel = channel;
    }

    state.store.put_slot(&txn, &slot)?;
    txn.commit().map_err(crate::store::StorageError::from)?;
    Ok(ok(slot))
}

/// POST /api/slots/seed
///
/// Create the twelve cabinet slots, codes "1" through "12", each wired to the
/// matching relay channel. Existing codes are left untouched.
pub async fn seed(State(state): State<ServerState>) -> AppResult<Json<ApiResponse<Vec<Slot>>>> {
    let existing: std::collections::HashSet<String> = state
        .store
        .list_slots()?
        .into_iter()
        .map(|s| s.code)
        .collect();

    let txn = state.store.begin_write()?;
    let mut created = Vec::new();
    for channel in 1..=MAX_RELAY_CHANNEL {
        let code = channel.to_string();
        if existing.contains(&code) {
            continue;
        }
        let slot = Slot {
            id: snowflake_id(),
            code,
            product_id: None,
            quantity: 0,
            is_enabled: true,
            relay_channel: channel,
        };
        state.store.put_slot(&txn, &slot)?;
        created.push(slot);
    }
    txn.commit().map_err(crate::store::StorageError::from)?;
    Ok(ok(created))
}
