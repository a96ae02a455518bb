//! Menu API Handlers

use axum::{
    Json,
    extract::{Extension, Path, State},
};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::utils::AppResult;
use shared::models::{MenuItem, MenuItemCreate, MenuItemUpdate};

/// GET /api/menu - 可售商品
pub async fn list_available(State(state): State<ServerState>) -> AppResult<Json<Vec<MenuItem>>> {
    let items = state.ledger.blocking(|l| l.list_available_menu()).await?;
    Ok(Json(items))
}

/// GET /api/menu/all - 全部商品 (含下架)
pub async fn list_all(State(state): State<ServerState>) -> AppResult<Json<Vec<MenuItem>>> {
    let items = state.ledger.blocking(|l| l.list_all_menu()).await?;
    Ok(Json(items))
}

/// POST /api/menu - 新增商品
pub async fn create(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<MenuItemCreate>,
) -> AppResult<Json<MenuItem>> {
    let item = state
        .ledger
        .blocking(move |l| l.create_menu_item(&current_user, payload))
        .await?;
    Ok(Json(item))
}

/// PUT /api/menu/{id} - 修改商品 (价格、库存、上下架)
pub async fn update(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(payload): Json<MenuItemUpdate>,
) -> AppResult<Json<MenuItem>> {
    let item = state
        .ledger
        .blocking(move |l| l.update_menu_item(&current_user, id, payload))
        .await?;
    Ok(Json(item))
}
