use async_trait::async_trait;
use rust_decimal::Decimal;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, TransactionTrait};
use uuid::Uuid;

use crate::{
    hooks::{Hook, ReviewEvent},
    repository::{ProductRepository, ReviewRepository},
};

/// Mean of `ratings` to two decimals (half to even), zero when there are none.
pub fn average_rating(ratings: &[i32]) -> Decimal {
    if ratings.is_empty() {
        return Decimal::ZERO;
    }
    let sum: i64 = ratings.iter().map(|&rating| i64::from(rating)).sum();
    (Decimal::from(sum) / Decimal::from(ratings.len())).round_dp(2)
}

/// Rewrite the product's `average_rating` and `review_count` from its reviews.
pub async fn recompute_product_rating<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
) -> Result<(), DbErr> {
    let products = ProductRepository::new(conn);
    // A deleted product takes its reviews with it.
    if products.lock(product_id).await?.is_none() {
        return Ok(());
    }

    let ratings = ReviewRepository::new(conn).ratings(product_id).await?;
    let average = average_rating(&ratings);
    let count = i32::try_from(ratings.len()).unwrap_or(i32::MAX);
    products.set_rating(product_id, average, count).await?;

    tracing::debug!(%product_id, %average, count, "product rating recomputed");
    Ok(())
}

/// Keeps product rating aggregates in step with review writes.
pub struct ProductRatingHook {
    orm: DatabaseConnection,
}

impl ProductRatingHook {
    pub fn new(orm: DatabaseConnection) -> Self {
        Self { orm }
    }
}

#[async_trait]
impl Hook<ReviewEvent> for ProductRatingHook {
    async fn after_commit(&self, event: &ReviewEvent) -> anyhow::Result<()> {
        // The product row lock orders concurrent recomputes of one product.
        let txn = self.orm.begin().await?;
        recompute_product_rating(&txn, event.product_id()).await?;
        txn.commit().await?;
        Ok(())
    }
}
