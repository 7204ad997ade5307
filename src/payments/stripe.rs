use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use super::{PaymentError, PaymentIntent, PaymentIntentRequest, PaymentProvider};
use crate::config::PaymentConfig;

/// Stripe REST client for payment intents.
#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    secret_key: String,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    message: Option<String>,
}

impl StripeClient {
    pub fn new(config: &PaymentConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            client,
            secret_key: config.secret_key.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PaymentProvider for StripeClient {
    #[instrument(skip(self, request), fields(amount = request.amount, currency = %request.currency))]
    async fn create_payment_intent(
        &self,
        request: PaymentIntentRequest,
    ) -> Result<PaymentIntent, PaymentError> {
        let mut params: Vec<(String, String)> = vec![
            ("amount".to_string(), request.amount.to_string()),
            ("currency".to_string(), request.currency.clone()),
        ];
        for (key, value) in &request.metadata {
            params.push((format!("metadata[{key}]"), value.clone()));
        }

        let response = self
            .client
            .post(format!("{}/v1/payment_intents", self.api_base))
            .basic_auth(&self.secret_key, Some(""))
            .form(&params)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    PaymentError::Provider("Payment provider timed out".to_string())
                } else {
                    PaymentError::Provider(format!("Payment provider unreachable: {err}"))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            warn!(%status, body = %text, "stripe rejected payment intent");
            let message = serde_json::from_str::<StripeErrorEnvelope>(&text)
                .ok()
                .and_then(|envelope| envelope.error.message)
                .unwrap_or_else(|| format!("Payment provider returned {status}"));
            return Err(PaymentError::Provider(message));
        }

        let intent: PaymentIntent = response.json().await.map_err(|err| {
            PaymentError::Provider(format!("Invalid payment provider response: {err}"))
        })?;

        info!(payment_intent = %intent.id, "payment intent created");
        Ok(intent)
    }
}
