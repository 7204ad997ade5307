use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::TransactionTrait;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::{
        cart::{AddCartItemRequest, Cart, CartItem, CartProduct, UpdateCartItemRequest},
        money,
    },
    entity::carts::Model as CartModel,
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    repository::{CartLine, CartRepository, ProductRepository},
    state::AppState,
};

fn ensure_positive(quantity: i32) -> AppResult<()> {
    if quantity <= 0 {
        return Err(AppError::BadRequest(
            "Quantity must be greater than 0.".to_string(),
        ));
    }
    Ok(())
}

/// The caller's cart priced at current product prices; created on first access.
pub async fn get_cart(state: &AppState, user: &AuthUser) -> AppResult<Cart> {
    let carts = CartRepository::new(&state.orm);
    let cart = carts.get_or_create(user.user_id).await?;
    let lines = carts.list_items(cart.id).await?;
    Ok(cart_view(cart, lines))
}

pub async fn add_item(
    state: &AppState,
    user: &AuthUser,
    payload: AddCartItemRequest,
) -> AppResult<Cart> {
    ensure_positive(payload.quantity)?;

    if ProductRepository::new(&state.orm)
        .current_price(payload.product_id)
        .await?
        .is_none()
    {
        return Err(AppError::BadRequest(
            "No product with the given ID was found.".to_string(),
        ));
    }

    let txn = state.orm.begin().await?;
    let carts = CartRepository::new(&txn);
    carts.get_or_create(user.user_id).await?;
    // Same lock as checkout, so an add cannot slip in between checkout's read and clear.
    let cart = carts
        .lock_by_user(user.user_id)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("cart vanished after creation")))?;
    let item = carts
        .add_item(cart.id, payload.product_id, payload.quantity)
        .await?;
    let lines = carts.list_items(cart.id).await?;
    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.orm,
        Some(user.user_id),
        "cart_update",
        Some("cart_items"),
        Some(serde_json::json!({
            "product_id": payload.product_id,
            "quantity": item.quantity,
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(cart_view(cart, lines))
}

pub async fn update_item(
    state: &AppState,
    user: &AuthUser,
    item_id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<Cart> {
    ensure_positive(payload.quantity)?;

    let carts = CartRepository::new(&state.orm);
    let cart = carts
        .find_by_user(user.user_id)
        .await?
        .ok_or(AppError::NotFound)?;
    let item = carts
        .find_item(cart.id, item_id)
        .await?
        .ok_or(AppError::NotFound)?;

    carts.set_quantity(item, payload.quantity).await?;
    let lines = carts.list_items(cart.id).await?;
    Ok(cart_view(cart, lines))
}

pub async fn remove_item(state: &AppState, user: &AuthUser, item_id: Uuid) -> AppResult<()> {
    let carts = CartRepository::new(&state.orm);
    let cart = carts
        .find_by_user(user.user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    if carts.remove_item(cart.id, item_id).await? == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        &state.orm,
        Some(user.user_id),
        "cart_remove",
        Some("cart_items"),
        Some(serde_json::json!({ "item_id": item_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(())
}

fn cart_view(cart: CartModel, lines: Vec<CartLine>) -> Cart {
    let total: Decimal = lines.iter().map(CartLine::subtotal).sum();
    let items = lines
        .into_iter()
        .map(|line| CartItem {
            id: line.item_id,
            total_price: money(line.subtotal()),
            quantity: line.quantity,
            product: CartProduct {
                id: line.product_id,
                name: line.product_name,
                price: money(line.unit_price),
            },
        })
        .collect();

    Cart {
        id: cart.id,
        items,
        total_price: money(total),
        created_at: cart.created_at.with_timezone(&Utc),
    }
}
