mod common;

use common::*;
use rust_decimal_macros::dec;
use storefront_api::{
    dto::orders::CreateOrderRequest,
    entity::orders::OrderStatus,
    error::AppError,
    middleware::auth::AuthUser,
    payments::PaymentError,
    repository::OrderRepository,
    services::{order_service, payment_service},
};
use uuid::Uuid;

async fn place_order(app: &TestApp, quantity: i32) -> anyhow::Result<(AuthUser, Uuid)> {
    let user = create_user(app.db(), "user").await?;
    let widget = create_product(app.db(), "Widget", dec!(10.00)).await?;
    let address_id = create_address(app.db(), user.user_id).await?;
    add_to_cart(&app.state, &user, widget, quantity).await?;
    let order =
        order_service::create_order(&app.state, &user, CreateOrderRequest { address_id }).await?;
    Ok((user, order.id))
}

#[tokio::test]
async fn payment_intent_charges_order_total_in_minor_units() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let (user, order_id) = place_order(&app, 2).await?;

    let intent = payment_service::create_payment_intent(&app.state, &user, order_id).await?;
    assert_eq!(intent.client_secret, "pi_test_1_secret_abc");

    let requests = app.payments.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].amount, 2000);
    assert_eq!(requests[0].currency, "usd");
    assert_eq!(
        requests[0].metadata.get("order_id"),
        Some(&order_id.to_string())
    );
    Ok(())
}

#[tokio::test]
async fn payment_intent_requires_a_pending_order() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let (user, order_id) = place_order(&app, 1).await?;

    OrderRepository::new(app.db())
        .transition(order_id, OrderStatus::Pending, OrderStatus::Processing)
        .await?;

    let err = payment_service::create_payment_intent(&app.state, &user, order_id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Payment(PaymentError::InvalidOrderState(OrderStatus::Processing))
    ));
    assert!(app.payments.requests().is_empty());
    Ok(())
}

#[tokio::test]
async fn payment_intent_for_someone_elses_order_is_not_found() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let (_, order_id) = place_order(&app, 1).await?;
    let stranger = create_user(app.db(), "user").await?;

    for id in [order_id, Uuid::new_v4()] {
        let err = payment_service::create_payment_intent(&app.state, &stranger, id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }
    assert!(app.payments.requests().is_empty());
    Ok(())
}

#[tokio::test]
async fn provider_failure_surfaces_its_message() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let (user, order_id) = place_order(&app, 1).await?;
    app.payments.fail_with("Your card was declined.");

    let err = payment_service::create_payment_intent(&app.state, &user, order_id)
        .await
        .unwrap_err();
    assert!(matches!(
        &err,
        AppError::Payment(PaymentError::Provider(message)) if message == "Your card was declined."
    ));
    assert_eq!(err.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);

    let order = order_service::get_order(&app.state, &user, order_id).await?;
    assert_eq!(order.status, OrderStatus::Pending);
    Ok(())
}
