use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{
    audit::AuditLogHook,
    config::AppConfig,
    hooks::{Hook, OrderEvent, OrderHooks, ReviewEvent, ReviewHooks},
    payments::{PaymentProvider, stripe::StripeClient, webhook::WebhookVerifier},
    ratings::ProductRatingHook,
};

#[derive(Clone)]
pub struct AppState {
    pub orm: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub payments: Arc<dyn PaymentProvider>,
    pub webhooks: WebhookVerifier,
    pub hooks: OrderHooks,
    pub review_hooks: ReviewHooks,
}

impl AppState {
    /// Production wiring: Stripe gateway, the audit-log hook and the rating recompute.
    pub fn new(orm: DatabaseConnection, config: AppConfig) -> anyhow::Result<Self> {
        let payments = Arc::new(StripeClient::new(&config.payments)?);
        let webhooks = WebhookVerifier::from_config(&config.payments)?;
        let audit = Arc::new(AuditLogHook::new(orm.clone()));

        let mut hooks = OrderHooks::new();
        hooks.register(audit.clone());

        let mut review_hooks = ReviewHooks::new();
        review_hooks.register(Arc::new(ProductRatingHook::new(orm.clone())));
        review_hooks.register(audit);

        Ok(Self {
            orm,
            config: Arc::new(config),
            payments,
            webhooks,
            hooks,
            review_hooks,
        })
    }

    pub fn with_payment_provider(mut self, provider: Arc<dyn PaymentProvider>) -> Self {
        self.payments = provider;
        self
    }

    pub fn with_hook(mut self, hook: Arc<dyn Hook<OrderEvent>>) -> Self {
        self.hooks.register(hook);
        self
    }

    pub fn with_review_hook(mut self, hook: Arc<dyn Hook<ReviewEvent>>) -> Self {
        self.review_hooks.register(hook);
        self
    }
}
