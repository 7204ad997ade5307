use std::collections::BTreeMap;

use uuid::Uuid;

use crate::{
    dto::orders::PaymentIntentResponse,
    entity::orders::OrderStatus,
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    payments::{ORDER_ID_METADATA_KEY, PaymentError, PaymentIntentRequest, to_minor_units},
    repository::OrderRepository,
    state::AppState,
};

/// Open a payment intent for one of the caller's pending orders.
///
/// The order id travels in the intent metadata; the webhook uses it to find
/// the order again once the payment succeeds.
pub async fn create_payment_intent(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<PaymentIntentResponse> {
    let order = OrderRepository::new(&state.orm)
        .find_owned(order_id, user.user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    if order.status != OrderStatus::Pending {
        return Err(PaymentError::InvalidOrderState(order.status).into());
    }

    let amount = to_minor_units(order.total_price).ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!(
            "order {} total {} does not fit in minor units",
            order.id,
            order.total_price
        ))
    })?;

    let mut metadata = BTreeMap::new();
    metadata.insert(ORDER_ID_METADATA_KEY.to_string(), order.id.to_string());

    let intent = state
        .payments
        .create_payment_intent(PaymentIntentRequest {
            amount,
            currency: state.config.payments.currency.clone(),
            metadata,
        })
        .await?;

    tracing::info!(
        order_id = %order.id,
        payment_intent = %intent.id,
        amount,
        "payment intent created"
    );

    Ok(PaymentIntentResponse {
        client_secret: intent.client_secret,
    })
}
