use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
    sea_query::{Expr, LockType, OnConflict},
};
use uuid::Uuid;

use crate::entity::{
    cart_items::{
        ActiveModel as CartItemActive, Column as CartItemCol, Entity as CartItems,
        Model as CartItemModel,
    },
    carts::{ActiveModel as CartActive, Column as CartCol, Entity as Carts, Model as CartModel},
    products::Entity as Products,
};

/// A cart item joined with its product, priced at the product's current price.
#[derive(Debug, Clone)]
pub struct CartLine {
    pub item_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

impl CartLine {
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

pub struct CartRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> CartRepository<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn find_by_user(&self, user_id: Uuid) -> Result<Option<CartModel>, DbErr> {
        Carts::find()
            .filter(CartCol::UserId.eq(user_id))
            .one(self.conn)
            .await
    }

    /// Row-lock the user's cart for the rest of the surrounding transaction.
    pub async fn lock_by_user(&self, user_id: Uuid) -> Result<Option<CartModel>, DbErr> {
        Carts::find()
            .filter(CartCol::UserId.eq(user_id))
            .lock(LockType::Update)
            .one(self.conn)
            .await
    }

    pub async fn get_or_create(&self, user_id: Uuid) -> Result<CartModel, DbErr> {
        if let Some(cart) = self.find_by_user(user_id).await? {
            return Ok(cart);
        }

        // A concurrent request may create the cart first; the unique user_id wins.
        Carts::insert(CartActive {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            created_at: Set(Utc::now().into()),
        })
        .on_conflict(OnConflict::column(CartCol::UserId).do_nothing().to_owned())
        .exec_without_returning(self.conn)
        .await?;

        self.find_by_user(user_id)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("cart for user {user_id}")))
    }

    /// Items in insertion order, with live product prices.
    pub async fn list_items(&self, cart_id: Uuid) -> Result<Vec<CartLine>, DbErr> {
        // Item ids are v7: they sort by creation, even within one clock tick.
        let rows = CartItems::find()
            .find_also_related(Products)
            .filter(CartItemCol::CartId.eq(cart_id))
            .order_by_asc(CartItemCol::Id)
            .all(self.conn)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(item, product)| {
                let product = product?;
                Some(CartLine {
                    item_id: item.id,
                    product_id: product.id,
                    product_name: product.name,
                    unit_price: product.price,
                    quantity: item.quantity,
                })
            })
            .collect())
    }

    pub async fn find_item(
        &self,
        cart_id: Uuid,
        item_id: Uuid,
    ) -> Result<Option<CartItemModel>, DbErr> {
        CartItems::find_by_id(item_id)
            .filter(CartItemCol::CartId.eq(cart_id))
            .one(self.conn)
            .await
    }

    /// Add `quantity` of a product, merging into the existing row if there is one.
    /// Callers hold the cart lock so the read-then-write cannot interleave.
    pub async fn add_item(
        &self,
        cart_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartItemModel, DbErr> {
        let existing = CartItems::find()
            .filter(CartItemCol::CartId.eq(cart_id))
            .filter(CartItemCol::ProductId.eq(product_id))
            .one(self.conn)
            .await?;

        match existing {
            Some(item) => {
                CartItems::update_many()
                    .col_expr(
                        CartItemCol::Quantity,
                        Expr::col(CartItemCol::Quantity).add(quantity),
                    )
                    .filter(CartItemCol::Id.eq(item.id))
                    .exec(self.conn)
                    .await?;
                CartItems::find_by_id(item.id)
                    .one(self.conn)
                    .await?
                    .ok_or_else(|| DbErr::RecordNotFound(format!("cart item {}", item.id)))
            }
            None => {
                CartItemActive {
                    id: Set(Uuid::now_v7()),
                    cart_id: Set(cart_id),
                    product_id: Set(product_id),
                    quantity: Set(quantity),
                    created_at: Set(Utc::now().into()),
                }
                .insert(self.conn)
                .await
            }
        }
    }

    pub async fn set_quantity(
        &self,
        item: CartItemModel,
        quantity: i32,
    ) -> Result<CartItemModel, DbErr> {
        let mut active: CartItemActive = item.into();
        active.quantity = Set(quantity);
        active.update(self.conn).await
    }

    pub async fn remove_item(&self, cart_id: Uuid, item_id: Uuid) -> Result<u64, DbErr> {
        let result = CartItems::delete_many()
            .filter(CartItemCol::CartId.eq(cart_id))
            .filter(CartItemCol::Id.eq(item_id))
            .exec(self.conn)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn clear_items(&self, cart_id: Uuid) -> Result<u64, DbErr> {
        let result = CartItems::delete_many()
            .filter(CartItemCol::CartId.eq(cart_id))
            .exec(self.conn)
            .await?;
        Ok(result.rows_affected)
    }
}
