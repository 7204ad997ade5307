#![allow(dead_code)]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::Utc;
use http_body_util::BodyExt;
use jsonwebtoken::{EncodingKey, Header, encode};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend,
    EntityTrait, PaginatorTrait, Schema, Set,
};
use storefront_api::{
    config::{AppConfig, PaymentConfig},
    dto::{auth::Claims, cart::AddCartItemRequest},
    entity::{
        AuditLogs, CartItems, Carts, OrderItems, Orders, Products, Reviews, Users, Addresses,
        addresses::ActiveModel as AddressActive, products::ActiveModel as ProductActive,
        users::ActiveModel as UserActive,
    },
    hooks::{Hook, OrderEvent, ReviewEvent},
    middleware::auth::AuthUser,
    payments::{PaymentError, PaymentIntent, PaymentIntentRequest, PaymentProvider},
    routes::build_router,
    services::cart_service,
    state::AppState,
};
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-jwt-secret";
pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

/// Stands in for the processor: records every request, optionally fails.
#[derive(Default)]
pub struct MockPaymentProvider {
    pub requests: Mutex<Vec<PaymentIntentRequest>>,
    pub fail_with: Mutex<Option<String>>,
}

impl MockPaymentProvider {
    pub fn requests(&self) -> Vec<PaymentIntentRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn fail_with(&self, message: &str) {
        *self.fail_with.lock().unwrap() = Some(message.to_string());
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn create_payment_intent(
        &self,
        request: PaymentIntentRequest,
    ) -> Result<PaymentIntent, PaymentError> {
        if let Some(message) = self.fail_with.lock().unwrap().clone() {
            return Err(PaymentError::Provider(message));
        }
        let mut requests = self.requests.lock().unwrap();
        requests.push(request);
        let n = requests.len();
        Ok(PaymentIntent {
            id: format!("pi_test_{n}"),
            client_secret: format!("pi_test_{n}_secret_abc"),
        })
    }
}

#[derive(Default)]
pub struct RecordingHook {
    pub events: Mutex<Vec<OrderEvent>>,
    pub review_events: Mutex<Vec<ReviewEvent>>,
}

impl RecordingHook {
    pub fn events(&self) -> Vec<OrderEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn payment_confirmations(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, OrderEvent::PaymentConfirmed { .. }))
            .count()
    }

    pub fn review_events(&self) -> Vec<ReviewEvent> {
        self.review_events.lock().unwrap().clone()
    }
}

#[async_trait]
impl Hook<OrderEvent> for RecordingHook {
    async fn after_commit(&self, event: &OrderEvent) -> anyhow::Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

#[async_trait]
impl Hook<ReviewEvent> for RecordingHook {
    async fn after_commit(&self, event: &ReviewEvent) -> anyhow::Result<()> {
        self.review_events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

pub struct TestApp {
    pub state: AppState,
    pub payments: Arc<MockPaymentProvider>,
    pub hook: Arc<RecordingHook>,
}

impl TestApp {
    pub fn db(&self) -> &DatabaseConnection {
        &self.state.orm
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> anyhow::Result<(StatusCode, serde_json::Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body)?).await
    }

    /// POST a raw webhook body with an optional `Stripe-Signature` header.
    pub async fn deliver_webhook(
        &self,
        payload: &[u8],
        signature: Option<String>,
    ) -> anyhow::Result<(StatusCode, serde_json::Value)> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/payments/webhook")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(signature) = signature {
            builder = builder.header("Stripe-Signature", signature);
        }
        self.send(builder.body(Body::from(payload.to_vec()))?).await
    }

    async fn send(&self, request: Request<Body>) -> anyhow::Result<(StatusCode, serde_json::Value)> {
        let response = build_router(self.state.clone()).oneshot(request).await?;
        let status = response.status();
        let bytes = response.into_body().collect().await?.to_bytes();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, json))
    }

    pub fn sign(&self, payload: &[u8]) -> String {
        self.state.webhooks.sign(payload, Utc::now().timestamp())
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        jwt_secret: JWT_SECRET.to_string(),
        payments: PaymentConfig {
            secret_key: "sk_test_unused".to_string(),
            webhook_secret: WEBHOOK_SECRET.to_string(),
            api_base: "http://127.0.0.1:9".to_string(),
            currency: "usd".to_string(),
            request_timeout: Duration::from_secs(1),
            webhook_tolerance: Duration::from_secs(300),
        },
    }
}

/// Fresh in-memory database with the schema built from the entities.
pub async fn setup_db() -> anyhow::Result<DatabaseConnection> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    // One connection: every pooled connection would otherwise get its own database.
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options).await?;

    let schema = Schema::new(DbBackend::Sqlite);
    let backend = db.get_database_backend();
    db.execute(backend.build(&schema.create_table_from_entity(Users)))
        .await?;
    db.execute(backend.build(&schema.create_table_from_entity(Products)))
        .await?;
    db.execute(backend.build(&schema.create_table_from_entity(Addresses)))
        .await?;
    db.execute(backend.build(&schema.create_table_from_entity(Carts)))
        .await?;
    db.execute(backend.build(&schema.create_table_from_entity(CartItems)))
        .await?;
    db.execute(backend.build(&schema.create_table_from_entity(Orders)))
        .await?;
    db.execute(backend.build(&schema.create_table_from_entity(OrderItems)))
        .await?;
    db.execute(backend.build(&schema.create_table_from_entity(AuditLogs)))
        .await?;
    db.execute(backend.build(&schema.create_table_from_entity(Reviews)))
        .await?;
    db.execute_unprepared(
        "CREATE UNIQUE INDEX ux_cart_items_cart_product ON cart_items (cart_id, product_id)",
    )
    .await?;
    db.execute_unprepared(
        "CREATE UNIQUE INDEX ux_reviews_product_user ON reviews (product_id, user_id)",
    )
    .await?;

    Ok(db)
}

pub async fn spawn_app() -> anyhow::Result<TestApp> {
    let db = setup_db().await?;
    let payments = Arc::new(MockPaymentProvider::default());
    let hook = Arc::new(RecordingHook::default());
    let state = AppState::new(db, test_config())?
        .with_payment_provider(payments.clone())
        .with_hook(hook.clone())
        .with_review_hook(hook.clone());

    Ok(TestApp {
        state,
        payments,
        hook,
    })
}

pub async fn create_user(db: &DatabaseConnection, role: &str) -> anyhow::Result<AuthUser> {
    let id = Uuid::new_v4();
    UserActive {
        id: Set(id),
        email: Set(format!("{id}@example.com")),
        role: Set(role.to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await?;

    Ok(AuthUser {
        user_id: id,
        role: role.to_string(),
    })
}

pub async fn create_product(
    db: &DatabaseConnection,
    name: &str,
    price: Decimal,
) -> anyhow::Result<Uuid> {
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        description: Set(Some(format!("{name} for testing"))),
        price: Set(price),
        average_rating: Set(Decimal::ZERO),
        review_count: Set(0),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await?;
    Ok(product.id)
}

pub async fn set_price(db: &DatabaseConnection, product_id: Uuid, price: Decimal) -> anyhow::Result<()> {
    let product = Products::find_by_id(product_id)
        .one(db)
        .await?
        .ok_or_else(|| anyhow::anyhow!("product {product_id} missing"))?;
    let mut active: ProductActive = product.into();
    active.price = Set(price);
    active.update(db).await?;
    Ok(())
}

pub async fn create_address(db: &DatabaseConnection, user_id: Uuid) -> anyhow::Result<Uuid> {
    let address = AddressActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        street_address: Set("1 Main Street".to_string()),
        city: Set("Springfield".to_string()),
        state: Set("IL".to_string()),
        postal_code: Set("62701".to_string()),
        country: Set("US".to_string()),
        is_default: Set(true),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await?;
    Ok(address.id)
}

pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    quantity: i32,
) -> anyhow::Result<()> {
    cart_service::add_item(
        state,
        user,
        AddCartItemRequest {
            product_id,
            quantity,
        },
    )
    .await?;
    Ok(())
}

pub async fn count_orders(db: &DatabaseConnection) -> anyhow::Result<u64> {
    Ok(Orders::find().count(db).await?)
}

pub async fn count_order_items(db: &DatabaseConnection) -> anyhow::Result<u64> {
    Ok(OrderItems::find().count(db).await?)
}

pub async fn count_cart_items(db: &DatabaseConnection) -> anyhow::Result<u64> {
    Ok(CartItems::find().count(db).await?)
}

pub fn token_for(user: &AuthUser) -> String {
    let claims = Claims {
        sub: user.user_id.to_string(),
        role: user.role.clone(),
        exp: (Utc::now().timestamp() + 3600) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn payment_succeeded(order_id: Uuid) -> Vec<u8> {
    webhook_event("payment_intent.succeeded", serde_json::json!({ "order_id": order_id }))
}

pub fn webhook_event(event_type: &str, metadata: serde_json::Value) -> Vec<u8> {
    serde_json::json!({
        "id": format!("evt_{}", Uuid::new_v4().simple()),
        "type": event_type,
        "data": {
            "object": {
                "id": "pi_test_1",
                "object": "payment_intent",
                "metadata": metadata,
            }
        }
    })
    .to_string()
    .into_bytes()
}
