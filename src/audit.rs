use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, DatabaseConnection, Set};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    entity::audit_logs::ActiveModel as AuditActive,
    error::AppResult,
    hooks::{DomainEvent, Hook, OrderEvent, ReviewEvent},
};

pub async fn log_audit<C: ConnectionTrait>(
    conn: &C,
    user_id: Option<Uuid>,
    action: &str,
    resource: Option<&str>,
    metadata: Option<Value>,
) -> AppResult<()> {
    AuditActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        action: Set(action.to_string()),
        resource: Set(resource.map(str::to_string)),
        metadata: Set(metadata),
        created_at: Set(Utc::now().into()),
    }
    .insert(conn)
    .await?;

    Ok(())
}

/// Writes one audit row per order or review event.
pub struct AuditLogHook {
    orm: DatabaseConnection,
}

impl AuditLogHook {
    pub fn new(orm: DatabaseConnection) -> Self {
        Self { orm }
    }
}

#[async_trait]
impl Hook<OrderEvent> for AuditLogHook {
    async fn after_commit(&self, event: &OrderEvent) -> anyhow::Result<()> {
        let metadata = match event {
            OrderEvent::Placed {
                order_id,
                total_price,
                item_count,
                ..
            } => serde_json::json!({
                "order_id": order_id,
                "total_price": total_price.to_string(),
                "item_count": item_count,
            }),
            OrderEvent::PaymentConfirmed {
                order_id, event_id, ..
            } => serde_json::json!({ "order_id": order_id, "event_id": event_id }),
            OrderEvent::StatusChanged {
                order_id,
                actor_id,
                from,
                to,
                ..
            } => serde_json::json!({
                "order_id": order_id,
                "actor_id": actor_id,
                "from": from,
                "to": to,
            }),
        };

        log_audit(
            &self.orm,
            Some(event.user_id()),
            event.name(),
            Some("orders"),
            Some(metadata),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Hook<ReviewEvent> for AuditLogHook {
    async fn after_commit(&self, event: &ReviewEvent) -> anyhow::Result<()> {
        let metadata = match event {
            ReviewEvent::Created {
                review_id,
                product_id,
                rating,
                ..
            }
            | ReviewEvent::Updated {
                review_id,
                product_id,
                rating,
                ..
            } => serde_json::json!({
                "review_id": review_id,
                "product_id": product_id,
                "rating": rating,
            }),
            ReviewEvent::Deleted {
                review_id,
                product_id,
                ..
            } => serde_json::json!({ "review_id": review_id, "product_id": product_id }),
        };

        log_audit(
            &self.orm,
            Some(event.user_id()),
            event.name(),
            Some("reviews"),
            Some(metadata),
        )
        .await?;
        Ok(())
    }
}
