//! Post-commit hooks for domain events.
//!
//! Services call [`Hooks::dispatch`] only after their transaction has
//! committed. A failing hook is logged and never undoes the committed change.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::entity::orders::OrderStatus;

pub trait DomainEvent: Send + Sync {
    fn name(&self) -> &'static str;

    /// Id of the record the event is about, for log correlation.
    fn subject_id(&self) -> Uuid;

    /// User the record belongs to.
    fn user_id(&self) -> Uuid;
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderEvent {
    Placed {
        order_id: Uuid,
        user_id: Uuid,
        total_price: Decimal,
        item_count: usize,
    },
    PaymentConfirmed {
        order_id: Uuid,
        user_id: Uuid,
        event_id: String,
    },
    StatusChanged {
        order_id: Uuid,
        user_id: Uuid,
        actor_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    },
}

impl OrderEvent {
    pub fn order_id(&self) -> Uuid {
        match self {
            OrderEvent::Placed { order_id, .. }
            | OrderEvent::PaymentConfirmed { order_id, .. }
            | OrderEvent::StatusChanged { order_id, .. } => *order_id,
        }
    }
}

impl DomainEvent for OrderEvent {
    fn name(&self) -> &'static str {
        match self {
            OrderEvent::Placed { .. } => "order_placed",
            OrderEvent::PaymentConfirmed { .. } => "order_payment_confirmed",
            OrderEvent::StatusChanged { .. } => "order_status_changed",
        }
    }

    fn subject_id(&self) -> Uuid {
        self.order_id()
    }

    fn user_id(&self) -> Uuid {
        match self {
            OrderEvent::Placed { user_id, .. }
            | OrderEvent::PaymentConfirmed { user_id, .. }
            | OrderEvent::StatusChanged { user_id, .. } => *user_id,
        }
    }
}

/// A review was written, edited or removed. Product rating aggregates follow these.
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewEvent {
    Created {
        review_id: Uuid,
        product_id: Uuid,
        user_id: Uuid,
        rating: i32,
    },
    Updated {
        review_id: Uuid,
        product_id: Uuid,
        user_id: Uuid,
        rating: i32,
    },
    Deleted {
        review_id: Uuid,
        product_id: Uuid,
        user_id: Uuid,
    },
}

impl ReviewEvent {
    pub fn product_id(&self) -> Uuid {
        match self {
            ReviewEvent::Created { product_id, .. }
            | ReviewEvent::Updated { product_id, .. }
            | ReviewEvent::Deleted { product_id, .. } => *product_id,
        }
    }
}

impl DomainEvent for ReviewEvent {
    fn name(&self) -> &'static str {
        match self {
            ReviewEvent::Created { .. } => "review_created",
            ReviewEvent::Updated { .. } => "review_updated",
            ReviewEvent::Deleted { .. } => "review_deleted",
        }
    }

    fn subject_id(&self) -> Uuid {
        match self {
            ReviewEvent::Created { review_id, .. }
            | ReviewEvent::Updated { review_id, .. }
            | ReviewEvent::Deleted { review_id, .. } => *review_id,
        }
    }

    fn user_id(&self) -> Uuid {
        match self {
            ReviewEvent::Created { user_id, .. }
            | ReviewEvent::Updated { user_id, .. }
            | ReviewEvent::Deleted { user_id, .. } => *user_id,
        }
    }
}

#[async_trait]
pub trait Hook<E: DomainEvent>: Send + Sync {
    async fn after_commit(&self, event: &E) -> anyhow::Result<()>;
}

pub struct Hooks<E> {
    hooks: Vec<Arc<dyn Hook<E>>>,
}

pub type OrderHooks = Hooks<OrderEvent>;
pub type ReviewHooks = Hooks<ReviewEvent>;

impl<E> Clone for Hooks<E> {
    fn clone(&self) -> Self {
        Self {
            hooks: self.hooks.clone(),
        }
    }
}

impl<E> Default for Hooks<E> {
    fn default() -> Self {
        Self { hooks: Vec::new() }
    }
}

impl<E: DomainEvent> Hooks<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, hook: Arc<dyn Hook<E>>) {
        self.hooks.push(hook);
    }

    pub async fn dispatch(&self, event: E) {
        tracing::debug!(event = event.name(), subject_id = %event.subject_id(), "dispatching event");
        for hook in &self.hooks {
            if let Err(err) = hook.after_commit(&event).await {
                tracing::warn!(
                    error = %err,
                    event = event.name(),
                    subject_id = %event.subject_id(),
                    "post-commit hook failed"
                );
            }
        }
    }
}
