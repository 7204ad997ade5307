use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ConnectionTrait, TransactionTrait};
use uuid::Uuid;

use crate::{
    dto::{
        addresses::Address,
        money,
        orders::{CreateOrderRequest, Order, OrderItem, OrderSummary},
        products::ProductSummary,
    },
    entity::{
        addresses::Model as AddressModel, order_items::Model as OrderItemModel,
        orders::Model as OrderModel,
    },
    error::{AppError, AppResult, CheckoutError},
    hooks::OrderEvent,
    middleware::auth::AuthUser,
    repository::{AddressRepository, CartRepository, OrderRepository},
    response::{Meta, Page},
    routes::params::OrderListQuery,
    state::AppState,
};

struct PlacedOrder {
    order: OrderModel,
    address: AddressModel,
    items: Vec<(OrderItemModel, String)>,
}

/// Turn the user's cart into a pending order.
///
/// Runs as one transaction: the order, its price-snapshotted items and the
/// emptied cart become visible together or not at all.
pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<Order> {
    let txn = state.orm.begin().await?;
    let placed = place_order(&txn, user.user_id, payload.address_id).await?;
    txn.commit().await?;

    tracing::info!(
        order_id = %placed.order.id,
        user_id = %user.user_id,
        total_price = %placed.order.total_price,
        items = placed.items.len(),
        "order placed"
    );

    state
        .hooks
        .dispatch(OrderEvent::Placed {
            order_id: placed.order.id,
            user_id: user.user_id,
            total_price: placed.order.total_price,
            item_count: placed.items.len(),
        })
        .await;

    Ok(order_detail(placed.order, placed.address, placed.items))
}

async fn place_order<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    address_id: Uuid,
) -> AppResult<PlacedOrder> {
    let carts = CartRepository::new(conn);

    // The cart row lock serialises concurrent checkouts of the same user: the
    // loser waits, then sees an empty cart.
    let cart = carts
        .lock_by_user(user_id)
        .await?
        .ok_or(CheckoutError::CartMissing)?;

    let lines = carts.list_items(cart.id).await?;
    if lines.is_empty() {
        return Err(CheckoutError::EmptyCart.into());
    }

    let address = AddressRepository::new(conn)
        .find_owned(user_id, address_id)
        .await?
        .ok_or(CheckoutError::InvalidAddress)?;

    let orders = OrderRepository::new(conn);
    let order = orders.insert_pending(user_id, address.id).await?;

    let mut total = Decimal::ZERO;
    let mut items = Vec::with_capacity(lines.len());
    let mut names = Vec::with_capacity(lines.len());
    for (position, line) in lines.into_iter().enumerate() {
        total += line.subtotal();
        items.push(OrderItemModel {
            id: Uuid::new_v4(),
            order_id: order.id,
            product_id: line.product_id,
            quantity: line.quantity,
            price: line.unit_price,
            position: position as i32,
        });
        names.push(line.product_name);
    }

    orders.insert_items(&items).await?;
    let order = orders.set_total(order, total).await?;
    carts.clear_items(cart.id).await?;

    Ok(PlacedOrder {
        order,
        address,
        items: items.into_iter().zip(names).collect(),
    })
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<Page<OrderSummary>> {
    let (page, limit, offset) = query.pagination().normalize();
    let (orders, total) = OrderRepository::new(&state.orm)
        .list(Some(user.user_id), query.status, limit as u64, offset as u64)
        .await?;

    let items = orders.into_iter().map(OrderSummary::from).collect();
    Ok(Page::new(items, Meta::new(page, limit, total as i64)))
}

pub async fn get_order(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<Order> {
    let order = OrderRepository::new(&state.orm)
        .find_owned(id, user.user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    load_order_detail(&state.orm, order).await
}

pub(crate) async fn load_order_detail<C: ConnectionTrait>(
    conn: &C,
    order: OrderModel,
) -> AppResult<Order> {
    let address = AddressRepository::new(conn)
        .find(order.shipping_address_id)
        .await?
        .ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "order {} references a missing address",
                order.id
            ))
        })?;

    let items = OrderRepository::new(conn)
        .items(order.id)
        .await?
        .into_iter()
        .map(|(item, product)| {
            let name = product.map(|p| p.name).unwrap_or_default();
            (item, name)
        })
        .collect();

    Ok(order_detail(order, address, items))
}

fn order_detail(
    order: OrderModel,
    address: AddressModel,
    items: Vec<(OrderItemModel, String)>,
) -> Order {
    Order {
        id: order.id,
        user_id: order.user_id,
        status: order.status,
        total_price: money(order.total_price),
        shipping_address: Address::from(address),
        items: items.into_iter().map(order_item_from_entity).collect(),
        created_at: order.created_at.with_timezone(&Utc),
        updated_at: order.updated_at.with_timezone(&Utc),
    }
}

fn order_item_from_entity((model, name): (OrderItemModel, String)) -> OrderItem {
    OrderItem {
        id: model.id,
        product: ProductSummary {
            id: model.product_id,
            name,
        },
        quantity: model.quantity,
        price: money(model.price),
    }
}
