use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};
use uuid::Uuid;

use crate::entity::reviews::{
    ActiveModel as ReviewActive, Column as ReviewCol, Entity as Reviews, Model as ReviewModel,
};

pub struct ReviewRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> ReviewRepository<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Newest first.
    pub async fn list_for_product(
        &self,
        product_id: Uuid,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<ReviewModel>, u64), DbErr> {
        let finder = Reviews::find()
            .filter(ReviewCol::ProductId.eq(product_id))
            .order_by_desc(ReviewCol::CreatedAt)
            .order_by_desc(ReviewCol::Id);
        let total = finder.clone().count(self.conn).await?;
        let items = finder.limit(limit).offset(offset).all(self.conn).await?;
        Ok((items, total))
    }

    /// A review only counts as found under the product it was written for.
    pub async fn find_for_product(
        &self,
        product_id: Uuid,
        review_id: Uuid,
    ) -> Result<Option<ReviewModel>, DbErr> {
        Reviews::find_by_id(review_id)
            .filter(ReviewCol::ProductId.eq(product_id))
            .one(self.conn)
            .await
    }

    pub async fn find_by_author(
        &self,
        product_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ReviewModel>, DbErr> {
        Reviews::find()
            .filter(ReviewCol::ProductId.eq(product_id))
            .filter(ReviewCol::UserId.eq(user_id))
            .one(self.conn)
            .await
    }

    pub async fn insert(&self, review: ReviewActive) -> Result<ReviewModel, DbErr> {
        review.insert(self.conn).await
    }

    pub async fn update(&self, review: ReviewActive) -> Result<ReviewModel, DbErr> {
        review.update(self.conn).await
    }

    pub async fn delete(&self, review: ReviewModel) -> Result<(), DbErr> {
        Reviews::delete_by_id(review.id).exec(self.conn).await?;
        Ok(())
    }

    pub async fn ratings(&self, product_id: Uuid) -> Result<Vec<i32>, DbErr> {
        Reviews::find()
            .select_only()
            .column(ReviewCol::Rating)
            .filter(ReviewCol::ProductId.eq(product_id))
            .into_tuple::<i32>()
            .all(self.conn)
            .await
    }
}
