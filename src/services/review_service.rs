use chrono::Utc;
use sea_orm::{ConnectionTrait, DbErr, Set, SqlErr, TransactionTrait};
use uuid::Uuid;

use crate::{
    dto::reviews::{CreateReviewRequest, Review, UpdateReviewRequest},
    entity::reviews::{ActiveModel as ReviewActive, Model as ReviewModel},
    error::{AppError, AppResult},
    hooks::ReviewEvent,
    middleware::auth::AuthUser,
    repository::{ProductRepository, ReviewRepository},
    response::{Meta, Page},
    routes::params::Pagination,
    state::AppState,
};

const DUPLICATE_REVIEW: &str = "You have already reviewed this product.";

fn validate_rating(rating: i32) -> AppResult<i32> {
    if (1..=5).contains(&rating) {
        Ok(rating)
    } else {
        Err(AppError::BadRequest(
            "Rating must be between 1 and 5.".to_string(),
        ))
    }
}

fn duplicate_or(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::BadRequest(DUPLICATE_REVIEW.to_string())
        }
        _ => AppError::from(err),
    }
}

pub async fn list_reviews(
    state: &AppState,
    product_id: Uuid,
    pagination: Pagination,
) -> AppResult<Page<Review>> {
    ProductRepository::new(&state.orm)
        .find(product_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let (page, limit, offset) = pagination.normalize();
    let (reviews, total) = ReviewRepository::new(&state.orm)
        .list_for_product(product_id, limit as u64, offset as u64)
        .await?;

    let items = reviews.into_iter().map(Review::from).collect();
    Ok(Page::new(items, Meta::new(page, limit, total as i64)))
}

/// One review per user and product.
pub async fn create_review(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: CreateReviewRequest,
) -> AppResult<Review> {
    let rating = validate_rating(payload.rating)?;

    let txn = state.orm.begin().await?;
    ProductRepository::new(&txn)
        .find(product_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let reviews = ReviewRepository::new(&txn);
    if reviews
        .find_by_author(product_id, user.user_id)
        .await?
        .is_some()
    {
        return Err(AppError::BadRequest(DUPLICATE_REVIEW.to_string()));
    }

    // The unique (product, user) pair catches a concurrent second review.
    let review = reviews
        .insert(ReviewActive {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            user_id: Set(user.user_id),
            rating: Set(rating),
            comment: Set(payload.comment),
            created_at: Set(Utc::now().into()),
        })
        .await
        .map_err(duplicate_or)?;
    txn.commit().await?;

    tracing::info!(review_id = %review.id, %product_id, user_id = %user.user_id, rating, "review created");

    state
        .review_hooks
        .dispatch(ReviewEvent::Created {
            review_id: review.id,
            product_id,
            user_id: user.user_id,
            rating,
        })
        .await;

    Ok(Review::from(review))
}

/// Only the author may edit a review.
pub async fn update_review(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    review_id: Uuid,
    payload: UpdateReviewRequest,
) -> AppResult<Review> {
    let rating = payload.rating.map(validate_rating).transpose()?;

    let reviews = ReviewRepository::new(&state.orm);
    let review = find_authored(&reviews, user, product_id, review_id).await?;

    let mut active: ReviewActive = review.into();
    if let Some(rating) = rating {
        active.rating = Set(rating);
    }
    if let Some(comment) = payload.comment {
        active.comment = Set(comment);
    }
    let review = reviews.update(active).await?;

    state
        .review_hooks
        .dispatch(ReviewEvent::Updated {
            review_id: review.id,
            product_id,
            user_id: user.user_id,
            rating: review.rating,
        })
        .await;

    Ok(Review::from(review))
}

/// Only the author may delete a review.
pub async fn delete_review(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    review_id: Uuid,
) -> AppResult<()> {
    let reviews = ReviewRepository::new(&state.orm);
    let review = find_authored(&reviews, user, product_id, review_id).await?;
    reviews.delete(review).await?;

    tracing::info!(%review_id, %product_id, user_id = %user.user_id, "review deleted");

    state
        .review_hooks
        .dispatch(ReviewEvent::Deleted {
            review_id,
            product_id,
            user_id: user.user_id,
        })
        .await;

    Ok(())
}

async fn find_authored<C: ConnectionTrait>(
    reviews: &ReviewRepository<'_, C>,
    user: &AuthUser,
    product_id: Uuid,
    review_id: Uuid,
) -> AppResult<ReviewModel> {
    let review = reviews
        .find_for_product(product_id, review_id)
        .await?
        .ok_or(AppError::NotFound)?;
    if review.user_id != user.user_id {
        return Err(AppError::Forbidden);
    }
    Ok(review)
}
