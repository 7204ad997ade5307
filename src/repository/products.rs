use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, sea_query::LockType,
};
use uuid::Uuid;

use crate::entity::products::{
    ActiveModel as ProductActive, Column as ProductCol, Entity as Products, Model as ProductModel,
};

pub struct ProductRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> ProductRepository<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn find(&self, product_id: Uuid) -> Result<Option<ProductModel>, DbErr> {
        Products::find_by_id(product_id).one(self.conn).await
    }

    pub async fn current_price(&self, product_id: Uuid) -> Result<Option<Decimal>, DbErr> {
        Ok(self.find(product_id).await?.map(|product| product.price))
    }

    pub async fn list(&self, limit: u64, offset: u64) -> Result<(Vec<ProductModel>, u64), DbErr> {
        let finder = Products::find()
            .order_by_desc(ProductCol::CreatedAt)
            .order_by_asc(ProductCol::Name);
        let total = finder.clone().count(self.conn).await?;
        let items = finder.limit(limit).offset(offset).all(self.conn).await?;
        Ok((items, total))
    }

    /// Row-lock the product for the rest of the surrounding transaction.
    pub async fn lock(&self, product_id: Uuid) -> Result<Option<ProductModel>, DbErr> {
        Products::find_by_id(product_id)
            .lock(LockType::Update)
            .one(self.conn)
            .await
    }

    pub async fn set_rating(
        &self,
        product_id: Uuid,
        average_rating: Decimal,
        review_count: i32,
    ) -> Result<(), DbErr> {
        Products::update_many()
            .set(ProductActive {
                average_rating: Set(average_rating),
                review_count: Set(review_count),
                ..Default::default()
            })
            .filter(ProductCol::Id.eq(product_id))
            .exec(self.conn)
            .await?;
        Ok(())
    }
}
