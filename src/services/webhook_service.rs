use crate::{
    entity::orders::OrderStatus,
    error::AppResult,
    hooks::OrderEvent,
    payments::webhook::{PAYMENT_INTENT_SUCCEEDED, WebhookError},
    repository::OrderRepository,
    state::AppState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The order moved from pending to processing.
    Confirmed,
    /// The order had already left pending; nothing was written.
    AlreadyProcessed,
    /// Event type this service does not act on.
    Ignored,
}

impl WebhookOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookOutcome::Confirmed => "confirmed",
            WebhookOutcome::AlreadyProcessed => "already_processed",
            WebhookOutcome::Ignored => "ignored",
        }
    }
}

/// Verify and apply one processor callback.
///
/// Deliveries are at-least-once, so the status change is a compare-and-set on
/// `pending`: a redelivery finds the order already moved and is acknowledged
/// without side effects.
pub async fn handle_event(
    state: &AppState,
    payload: &[u8],
    signature: Option<&str>,
) -> AppResult<WebhookOutcome> {
    let event = state
        .webhooks
        .construct_event(payload, signature)
        .inspect_err(|err| tracing::warn!(error = %err, "rejected webhook delivery"))?;

    if event.event_type != PAYMENT_INTENT_SUCCEEDED {
        tracing::debug!(event_id = %event.id, event_type = %event.event_type, "ignoring webhook event");
        return Ok(WebhookOutcome::Ignored);
    }

    let order_id = event.order_id()?;
    let orders = OrderRepository::new(&state.orm);

    if orders
        .transition(order_id, OrderStatus::Pending, OrderStatus::Processing)
        .await?
    {
        tracing::info!(event_id = %event.id, %order_id, "payment confirmed, order processing");
        if let Some(order) = orders.find(order_id).await? {
            state
                .hooks
                .dispatch(OrderEvent::PaymentConfirmed {
                    order_id,
                    user_id: order.user_id,
                    event_id: event.id,
                })
                .await;
        }
        return Ok(WebhookOutcome::Confirmed);
    }

    match orders.find(order_id).await? {
        Some(order) => {
            tracing::info!(
                event_id = %event.id,
                %order_id,
                status = %order.status,
                "payment already applied, acknowledging redelivery"
            );
            Ok(WebhookOutcome::AlreadyProcessed)
        }
        None => {
            tracing::warn!(event_id = %event.id, %order_id, "webhook references unknown order");
            Err(WebhookError::OrderNotFound(order_id).into())
        }
    }
}
