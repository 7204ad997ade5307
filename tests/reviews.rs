mod common;

use axum::http::StatusCode;
use common::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;
use storefront_api::{
    dto::reviews::{CreateReviewRequest, UpdateReviewRequest},
    entity::Products,
    error::AppError,
    hooks::ReviewEvent,
    middleware::auth::AuthUser,
    services::{product_service, review_service},
    state::AppState,
};
use uuid::Uuid;

async fn review(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    rating: i32,
) -> Result<Uuid, AppError> {
    let review = review_service::create_review(
        state,
        user,
        product_id,
        CreateReviewRequest {
            rating,
            comment: format!("{rating} stars"),
        },
    )
    .await?;
    Ok(review.id)
}

async fn rating_of(app: &TestApp, product_id: Uuid) -> anyhow::Result<(Decimal, i32)> {
    let product = Products::find_by_id(product_id)
        .one(app.db())
        .await?
        .ok_or_else(|| anyhow::anyhow!("product {product_id} missing"))?;
    Ok((product.average_rating, product.review_count))
}

#[tokio::test]
async fn product_rating_follows_review_writes() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let alice = create_user(app.db(), "user").await?;
    let bob = create_user(app.db(), "user").await?;
    let widget = create_product(app.db(), "Widget", dec!(10.00)).await?;

    assert_eq!(rating_of(&app, widget).await?, (dec!(0), 0));

    let first = review(&app.state, &alice, widget, 4).await?;
    let second = review(&app.state, &bob, widget, 5).await?;
    assert_eq!(rating_of(&app, widget).await?, (dec!(4.5), 2));
    assert_eq!(
        product_service::get_product(&app.state, widget)
            .await?
            .average_rating,
        dec!(4.50)
    );

    review_service::update_review(
        &app.state,
        &bob,
        widget,
        second,
        UpdateReviewRequest {
            rating: Some(3),
            comment: None,
        },
    )
    .await?;
    assert_eq!(rating_of(&app, widget).await?, (dec!(3.5), 2));

    review_service::delete_review(&app.state, &alice, widget, first).await?;
    assert_eq!(rating_of(&app, widget).await?, (dec!(3), 1));

    review_service::delete_review(&app.state, &bob, widget, second).await?;
    assert_eq!(rating_of(&app, widget).await?, (dec!(0), 0));

    let events = app.hook.review_events();
    assert_eq!(events.len(), 5);
    assert!(matches!(events[0], ReviewEvent::Created { rating: 4, .. }));
    assert!(matches!(events[2], ReviewEvent::Updated { rating: 3, .. }));
    assert!(matches!(events[4], ReviewEvent::Deleted { review_id, .. } if review_id == second));
    Ok(())
}

#[tokio::test]
async fn ratings_are_per_product() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let alice = create_user(app.db(), "user").await?;
    let widget = create_product(app.db(), "Widget", dec!(10.00)).await?;
    let gadget = create_product(app.db(), "Gadget", dec!(20.00)).await?;

    review(&app.state, &alice, widget, 2).await?;
    review(&app.state, &alice, gadget, 5).await?;

    assert_eq!(rating_of(&app, widget).await?, (dec!(2), 1));
    assert_eq!(rating_of(&app, gadget).await?, (dec!(5), 1));
    Ok(())
}

#[tokio::test]
async fn one_review_per_user_and_product() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let alice = create_user(app.db(), "user").await?;
    let widget = create_product(app.db(), "Widget", dec!(10.00)).await?;

    review(&app.state, &alice, widget, 4).await?;
    let err = review(&app.state, &alice, widget, 1).await.unwrap_err();
    match err {
        AppError::BadRequest(message) => {
            assert_eq!(message, "You have already reviewed this product.")
        }
        other => panic!("unexpected error: {other:?}"),
    }

    assert_eq!(rating_of(&app, widget).await?, (dec!(4), 1));
    assert_eq!(app.hook.review_events().len(), 1);
    Ok(())
}

#[tokio::test]
async fn rating_must_be_between_one_and_five() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let alice = create_user(app.db(), "user").await?;
    let widget = create_product(app.db(), "Widget", dec!(10.00)).await?;

    for rating in [0, 6, -1] {
        let err = review(&app.state, &alice, widget, rating).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    let id = review(&app.state, &alice, widget, 5).await?;
    let err = review_service::update_review(
        &app.state,
        &alice,
        widget,
        id,
        UpdateReviewRequest {
            rating: Some(9),
            comment: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = review(&app.state, &alice, Uuid::new_v4(), 3).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    Ok(())
}

#[tokio::test]
async fn only_the_author_changes_a_review() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let alice = create_user(app.db(), "user").await?;
    let mallory = create_user(app.db(), "user").await?;
    let widget = create_product(app.db(), "Widget", dec!(10.00)).await?;
    let gadget = create_product(app.db(), "Gadget", dec!(20.00)).await?;
    let id = review(&app.state, &alice, widget, 5).await?;

    let err = review_service::update_review(
        &app.state,
        &mallory,
        widget,
        id,
        UpdateReviewRequest {
            rating: Some(1),
            comment: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let err = review_service::delete_review(&app.state, &mallory, widget, id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    // A review is addressed through the product it was written for.
    let err = review_service::delete_review(&app.state, &alice, gadget, id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    assert_eq!(rating_of(&app, widget).await?, (dec!(5), 1));
    Ok(())
}

#[tokio::test]
async fn reviews_over_http() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let alice = create_user(app.db(), "user").await?;
    let bob = create_user(app.db(), "user").await?;
    let widget = create_product(app.db(), "Widget", dec!(10.00)).await?;
    let reviews_uri = format!("/api/products/{widget}/reviews");
    let body = serde_json::json!({ "rating": 4, "comment": "Solid." });

    let (status, _) = app
        .request("POST", &reviews_uri, None, Some(body.clone()))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, created) = app
        .request("POST", &reviews_uri, Some(&token_for(&alice)), Some(body))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["rating"], 4);
    assert_eq!(created["comment"], "Solid.");
    let review_id = created["id"].as_str().unwrap_or_default().to_string();

    let (status, page) = app.request("GET", &reviews_uri, None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["meta"]["total"], 1);
    assert_eq!(page["items"][0]["id"], review_id.as_str());

    let (status, product) = app
        .request("GET", &format!("/api/products/{widget}"), None, None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(product["average_rating"], "4.00");
    assert_eq!(product["review_count"], 1);

    let review_uri = format!("{reviews_uri}/{review_id}");
    let (status, body) = app
        .request("DELETE", &review_uri, Some(&token_for(&bob)), None)
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["detail"].is_string());

    let (status, _) = app
        .request("DELETE", &review_uri, Some(&token_for(&alice)), None)
        .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, page) = app.request("GET", &reviews_uri, None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["meta"]["total"], 0);

    let (status, _) = app
        .request(
            "GET",
            &format!("/api/products/{}/reviews", Uuid::new_v4()),
            None,
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}
