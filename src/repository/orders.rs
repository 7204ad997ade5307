use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::entity::{
    order_items::{
        ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
        Model as OrderItemModel,
    },
    orders::{
        ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel,
        OrderStatus,
    },
    products::{Entity as Products, Model as ProductModel},
};

pub struct OrderRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> OrderRepository<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn find(&self, order_id: Uuid) -> Result<Option<OrderModel>, DbErr> {
        Orders::find_by_id(order_id).one(self.conn).await
    }

    /// Lookup scoped to the owner; other users' orders are indistinguishable from missing ones.
    pub async fn find_owned(
        &self,
        order_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<OrderModel>, DbErr> {
        Orders::find()
            .filter(
                Condition::all()
                    .add(OrderCol::Id.eq(order_id))
                    .add(OrderCol::UserId.eq(user_id)),
            )
            .one(self.conn)
            .await
    }

    /// Newest first. `user_id = None` lists every user's orders.
    pub async fn list(
        &self,
        user_id: Option<Uuid>,
        status: Option<OrderStatus>,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<OrderModel>, u64), DbErr> {
        let mut condition = Condition::all();
        if let Some(user_id) = user_id {
            condition = condition.add(OrderCol::UserId.eq(user_id));
        }
        if let Some(status) = status {
            condition = condition.add(OrderCol::Status.eq(status));
        }

        let finder = Orders::find()
            .filter(condition)
            .order_by_desc(OrderCol::CreatedAt)
            .order_by_desc(OrderCol::Id);
        let total = finder.clone().count(self.conn).await?;
        let orders = finder.limit(limit).offset(offset).all(self.conn).await?;
        Ok((orders, total))
    }

    pub async fn items(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<(OrderItemModel, Option<ProductModel>)>, DbErr> {
        OrderItems::find()
            .find_also_related(Products)
            .filter(OrderItemCol::OrderId.eq(order_id))
            .order_by_asc(OrderItemCol::Position)
            .all(self.conn)
            .await
    }

    pub async fn insert_pending(
        &self,
        user_id: Uuid,
        shipping_address_id: Uuid,
    ) -> Result<OrderModel, DbErr> {
        let now = Utc::now();
        OrderActive {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            shipping_address_id: Set(shipping_address_id),
            status: Set(OrderStatus::Pending),
            total_price: Set(Decimal::ZERO),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(self.conn)
        .await
    }

    /// Single multi-row insert.
    pub async fn insert_items(&self, items: &[OrderItemModel]) -> Result<(), DbErr> {
        if items.is_empty() {
            return Ok(());
        }
        let rows = items.iter().map(|item| OrderItemActive {
            id: Set(item.id),
            order_id: Set(item.order_id),
            product_id: Set(item.product_id),
            quantity: Set(item.quantity),
            price: Set(item.price),
            position: Set(item.position),
        });
        OrderItems::insert_many(rows)
            .exec_without_returning(self.conn)
            .await?;
        Ok(())
    }

    pub async fn set_total(
        &self,
        order: OrderModel,
        total_price: Decimal,
    ) -> Result<OrderModel, DbErr> {
        let mut active: OrderActive = order.into();
        active.total_price = Set(total_price);
        active.update(self.conn).await
    }

    /// Compare-and-set on status. Returns `false` when the order was not in `from`
    /// (or does not exist); nothing is written in that case.
    pub async fn transition(
        &self,
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, DbErr> {
        let result = Orders::update_many()
            .set(OrderActive {
                status: Set(to),
                updated_at: Set(Utc::now().into()),
                ..Default::default()
            })
            .filter(OrderCol::Id.eq(order_id))
            .filter(OrderCol::Status.eq(from))
            .exec(self.conn)
            .await?;
        Ok(result.rows_affected == 1)
    }

    pub async fn references_address(&self, address_id: Uuid) -> Result<bool, DbErr> {
        let count = Orders::find()
            .filter(OrderCol::ShippingAddressId.eq(address_id))
            .count(self.conn)
            .await?;
        Ok(count > 0)
    }
}
