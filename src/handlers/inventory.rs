use std::collections::HashMap;

use axum::extract::{Path, State};
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, Item, Saved, json::Json};
use crate::state::AppState;
use crate::store::models::{InventoryItem, NewInventoryItem, NewPurchaseEntry, PurchaseEntry};

/// POST /api/inventory
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<NewInventoryItem>,
) -> ApiResult<Saved<InventoryItem>> {
    if input.name.trim().is_empty() {
        return Err(field_error("name", "item name is required"));
    }
    if input.current_stock < 0 || input.min_quantity < 0 {
        return Err(field_error("current_stock", "stock counts must not be negative"));
    }
    state.store.get_branch(input.branch_id).await?;
    let item = state.store.create_inventory_item(input).await?;
    Ok(ApiResponse::created(Saved::new("inventory item created", item)))
}

/// GET /api/inventory/:id
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Item<InventoryItem>> {
    let item = state.store.get_inventory_item(id).await?;
    Ok(ApiResponse::success(Item { item }))
}

/// POST /api/inventory/:id/purchases
///
/// Records the delivery and bumps the item's stock in one atomic store
/// operation; a failed insert never leaves the stock count changed.
pub async fn record_purchase(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<NewPurchaseEntry>,
) -> ApiResult<Saved<PurchaseEntry>> {
    if input.quantity <= 0 {
        return Err(field_error("quantity", "quantity must be positive"));
    }
    let entry = state.store.record_purchase(id, input).await?;
    Ok(ApiResponse::created(Saved::new("purchase recorded", entry)))
}

fn field_error(field: &str, message: &str) -> ApiError {
    let mut field_errors = HashMap::new();
    field_errors.insert(field.to_string(), message.to_string());
    ApiError::validation_error("invalid input", Some(field_errors))
}
