use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
};
use uuid::Uuid;

use crate::{
    dto::reviews::{CreateReviewRequest, Review, UpdateReviewRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    response::{ErrorBody, Page},
    routes::params::Pagination,
    services::review_service,
    state::AppState,
};

/// Nested under `/products`; reading is public, writing needs a token.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/reviews", get(list_reviews).post(create_review))
        .route(
            "/{id}/reviews/{review_id}",
            patch(update_review).delete(delete_review),
        )
}

#[utoipa::path(
    get,
    path = "/api/products/{id}/reviews",
    params(
        ("id" = Uuid, Path, description = "Product id"),
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
    ),
    responses(
        (status = 200, description = "Reviews, newest first", body = Page<Review>),
        (status = 404, description = "Product not found", body = ErrorBody),
    ),
    tag = "Reviews"
)]
pub async fn list_reviews(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<Page<Review>>> {
    let page = review_service::list_reviews(&state, id, pagination).await?;
    Ok(Json(page))
}

#[utoipa::path(
    post,
    path = "/api/products/{id}/reviews",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = CreateReviewRequest,
    responses(
        (status = 201, description = "Review created", body = Review),
        (status = 400, description = "Rating out of range or product already reviewed", body = ErrorBody),
        (status = 404, description = "Product not found", body = ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn create_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateReviewRequest>,
) -> AppResult<(StatusCode, Json<Review>)> {
    let review = review_service::create_review(&state, &user, id, payload).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

#[utoipa::path(
    patch,
    path = "/api/products/{id}/reviews/{review_id}",
    params(
        ("id" = Uuid, Path, description = "Product id"),
        ("review_id" = Uuid, Path, description = "Review id"),
    ),
    request_body = UpdateReviewRequest,
    responses(
        (status = 200, description = "Review updated", body = Review),
        (status = 400, description = "Rating out of range", body = ErrorBody),
        (status = 403, description = "Not the author", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn update_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, review_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateReviewRequest>,
) -> AppResult<Json<Review>> {
    let review = review_service::update_review(&state, &user, id, review_id, payload).await?;
    Ok(Json(review))
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}/reviews/{review_id}",
    params(
        ("id" = Uuid, Path, description = "Product id"),
        ("review_id" = Uuid, Path, description = "Review id"),
    ),
    responses(
        (status = 204, description = "Review deleted"),
        (status = 403, description = "Not the author", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn delete_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, review_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    review_service::delete_review(&state, &user, id, review_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
