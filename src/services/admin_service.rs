use uuid::Uuid;

use crate::{
    dto::orders::{Order, OrderSummary, UpdateOrderStatusRequest},
    error::{AppError, AppResult},
    hooks::OrderEvent,
    middleware::auth::{AuthUser, ensure_admin},
    repository::OrderRepository,
    response::{Meta, Page},
    routes::params::OrderListQuery,
    services::order_service::load_order_detail,
    state::AppState,
};

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<Page<OrderSummary>> {
    ensure_admin(user)?;

    let (page, limit, offset) = query.pagination().normalize();
    let (orders, total) = OrderRepository::new(&state.orm)
        .list(None, query.status, limit as u64, offset as u64)
        .await?;

    let items = orders.into_iter().map(OrderSummary::from).collect();
    Ok(Page::new(items, Meta::new(page, limit, total as i64)))
}

pub async fn get_order(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<Order> {
    ensure_admin(user)?;

    let order = OrderRepository::new(&state.orm)
        .find(id)
        .await?
        .ok_or(AppError::NotFound)?;
    load_order_detail(&state.orm, order).await
}

/// Move an order along the fulfilment ladder.
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<OrderSummary> {
    ensure_admin(user)?;

    let orders = OrderRepository::new(&state.orm);
    let order = orders.find(id).await?.ok_or(AppError::NotFound)?;
    let (from, to) = (order.status, payload.status);

    if from.is_terminal() {
        return Err(AppError::BadRequest(format!("Order is already {from}.")));
    }
    if !from.can_transition_to(to) {
        return Err(AppError::BadRequest(format!(
            "Cannot change order status from {from} to {to}."
        )));
    }

    // Conditional on the status read above; a concurrent change (e.g. the
    // payment webhook) makes this a no-op that the caller must retry.
    if !orders.transition(id, from, to).await? {
        return Err(AppError::BadRequest(
            "Order status changed concurrently, retry the request.".to_string(),
        ));
    }

    tracing::info!(order_id = %id, actor_id = %user.user_id, %from, %to, "order status changed");

    state
        .hooks
        .dispatch(OrderEvent::StatusChanged {
            order_id: id,
            user_id: order.user_id,
            actor_id: user.user_id,
            from,
            to,
        })
        .await;

    let order = orders.find(id).await?.ok_or(AppError::NotFound)?;
    Ok(OrderSummary::from(order))
}
