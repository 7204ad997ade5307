use std::time::Duration;

use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

use super::ORDER_ID_METADATA_KEY;
use crate::config::PaymentConfig;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "stripe-signature";
pub const PAYMENT_INTENT_SUCCEEDED: &str = "payment_intent.succeeded";

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Missing webhook signature header.")]
    MissingSignature,

    #[error("Malformed webhook signature header.")]
    MalformedSignatureHeader,

    #[error("Webhook timestamp is outside the tolerance window.")]
    TimestampOutsideTolerance,

    #[error("Webhook signature does not match the payload.")]
    SignatureMismatch,

    #[error("Invalid webhook payload: {0}")]
    MalformedPayload(String),

    #[error("Webhook event does not carry a valid order id.")]
    MissingOrderId,

    #[error("Order {0} referenced by the webhook does not exist.")]
    OrderNotFound(Uuid),
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

impl WebhookEvent {
    /// Order id stored in the payment intent metadata at creation time.
    pub fn order_id(&self) -> Result<Uuid, WebhookError> {
        self.data
            .object
            .get("metadata")
            .and_then(|metadata| metadata.get(ORDER_ID_METADATA_KEY))
            .and_then(|value| value.as_str())
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .ok_or(WebhookError::MissingOrderId)
    }
}

struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    // Format: `t=<unix seconds>,v1=<hex>[,v1=<hex>...]`; other schemes are ignored.
    fn parse(header: &str) -> Result<Self, WebhookError> {
        let mut timestamp = None;
        let mut signatures = Vec::new();
        for part in header.split(',') {
            let Some((key, value)) = part.trim().split_once('=') else {
                continue;
            };
            match key {
                "t" => {
                    timestamp = Some(
                        value
                            .parse::<i64>()
                            .map_err(|_| WebhookError::MalformedSignatureHeader)?,
                    )
                }
                "v1" => {
                    if let Ok(bytes) = hex::decode(value) {
                        signatures.push(bytes);
                    }
                }
                _ => {}
            }
        }

        match timestamp {
            Some(timestamp) if !signatures.is_empty() => Ok(Self {
                timestamp,
                signatures,
            }),
            _ => Err(WebhookError::MalformedSignatureHeader),
        }
    }
}

/// Verifies processor callbacks against the shared endpoint secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    mac: HmacSha256,
    tolerance: Duration,
}

impl WebhookVerifier {
    pub fn new(secret: &str, tolerance: Duration) -> anyhow::Result<Self> {
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| anyhow::anyhow!("invalid webhook secret"))?;
        Ok(Self { mac, tolerance })
    }

    pub fn from_config(config: &PaymentConfig) -> anyhow::Result<Self> {
        Self::new(&config.webhook_secret, config.webhook_tolerance)
    }

    pub fn construct_event(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookEvent, WebhookError> {
        self.construct_event_at(payload, signature, Utc::now().timestamp())
    }

    /// Verify `payload` as of `now` (unix seconds) and decode it.
    pub fn construct_event_at(
        &self,
        payload: &[u8],
        signature: Option<&str>,
        now: i64,
    ) -> Result<WebhookEvent, WebhookError> {
        let header = signature.ok_or(WebhookError::MissingSignature)?;
        self.verify(payload, header, now)?;
        serde_json::from_slice(payload)
            .map_err(|err| WebhookError::MalformedPayload(err.to_string()))
    }

    fn verify(&self, payload: &[u8], header: &str, now: i64) -> Result<(), WebhookError> {
        let header = SignatureHeader::parse(header)?;

        // The header is unauthenticated at this point, so the timestamp may be any i64.
        if !self.tolerance.is_zero()
            && now.abs_diff(header.timestamp) > self.tolerance.as_secs()
        {
            return Err(WebhookError::TimestampOutsideTolerance);
        }

        let matched = header.signatures.iter().any(|candidate| {
            self.signed(header.timestamp, payload)
                .verify_slice(candidate)
                .is_ok()
        });
        if matched {
            Ok(())
        } else {
            Err(WebhookError::SignatureMismatch)
        }
    }

    /// Build a `Stripe-Signature` header value for `payload`.
    pub fn sign(&self, payload: &[u8], timestamp: i64) -> String {
        let digest = self.signed(timestamp, payload).finalize().into_bytes();
        format!("t={timestamp},v1={}", hex::encode(digest))
    }

    fn signed(&self, timestamp: i64, payload: &[u8]) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn verifier() -> WebhookVerifier {
        WebhookVerifier::new("whsec_test", Duration::from_secs(300)).unwrap()
    }

    fn payload(order_id: &str) -> Vec<u8> {
        serde_json::json!({
            "id": "evt_1",
            "type": PAYMENT_INTENT_SUCCEEDED,
            "data": { "object": { "id": "pi_1", "metadata": { "order_id": order_id } } }
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn accepts_correctly_signed_payload() {
        let order_id = Uuid::new_v4();
        let body = payload(&order_id.to_string());
        let header = verifier().sign(&body, NOW);

        let event = verifier()
            .construct_event_at(&body, Some(&header), NOW + 10)
            .unwrap();
        assert_eq!(event.event_type, PAYMENT_INTENT_SUCCEEDED);
        assert_eq!(event.order_id().unwrap(), order_id);
    }

    #[test]
    fn rejects_tampered_payload() {
        let body = payload(&Uuid::new_v4().to_string());
        let header = verifier().sign(&body, NOW);
        let tampered = payload(&Uuid::new_v4().to_string());

        let err = verifier()
            .construct_event_at(&tampered, Some(&header), NOW)
            .unwrap_err();
        assert!(matches!(err, WebhookError::SignatureMismatch));
    }

    #[test]
    fn rejects_signature_made_with_another_secret() {
        let body = payload(&Uuid::new_v4().to_string());
        let other = WebhookVerifier::new("whsec_other", Duration::from_secs(300)).unwrap();
        let header = other.sign(&body, NOW);

        let err = verifier()
            .construct_event_at(&body, Some(&header), NOW)
            .unwrap_err();
        assert!(matches!(err, WebhookError::SignatureMismatch));
    }

    #[test]
    fn rejects_stale_timestamp() {
        let body = payload(&Uuid::new_v4().to_string());
        let header = verifier().sign(&body, NOW);

        let err = verifier()
            .construct_event_at(&body, Some(&header), NOW + 301)
            .unwrap_err();
        assert!(matches!(err, WebhookError::TimestampOutsideTolerance));
    }

    #[test]
    fn extreme_timestamps_are_rejected_without_overflow() {
        let body = payload(&Uuid::new_v4().to_string());
        let digest = "00".repeat(32);
        for timestamp in [i64::MIN, i64::MAX] {
            let header = format!("t={timestamp},v1={digest}");
            assert!(matches!(
                verifier().construct_event_at(&body, Some(&header), NOW),
                Err(WebhookError::TimestampOutsideTolerance)
            ));
        }

        let signed_at_min = verifier().sign(&body, i64::MIN);
        assert!(matches!(
            verifier().construct_event_at(&body, Some(&signed_at_min), i64::MAX),
            Err(WebhookError::TimestampOutsideTolerance)
        ));
    }

    #[test]
    fn rejects_missing_and_malformed_headers() {
        let body = payload(&Uuid::new_v4().to_string());
        assert!(matches!(
            verifier().construct_event_at(&body, None, NOW),
            Err(WebhookError::MissingSignature)
        ));
        assert!(matches!(
            verifier().construct_event_at(&body, Some("garbage"), NOW),
            Err(WebhookError::MalformedSignatureHeader)
        ));
        assert!(matches!(
            verifier().construct_event_at(&body, Some("t=abc,v1=00"), NOW),
            Err(WebhookError::MalformedSignatureHeader)
        ));
    }

    #[test]
    fn any_matching_v1_signature_is_enough() {
        let body = payload(&Uuid::new_v4().to_string());
        let valid = verifier().sign(&body, NOW);
        let v1 = valid.split("v1=").nth(1).unwrap();
        let header = format!("t={NOW},v1={},v1={v1},v0=deadbeef", "ab".repeat(32));

        assert!(verifier().construct_event_at(&body, Some(&header), NOW).is_ok());
    }

    #[test]
    fn signed_garbage_is_a_malformed_payload() {
        let body = b"not json".to_vec();
        let header = verifier().sign(&body, NOW);
        assert!(matches!(
            verifier().construct_event_at(&body, Some(&header), NOW),
            Err(WebhookError::MalformedPayload(_))
        ));
    }

    #[test]
    fn order_id_must_be_a_uuid() {
        let body = payload("42");
        let header = verifier().sign(&body, NOW);
        let event = verifier()
            .construct_event_at(&body, Some(&header), NOW)
            .unwrap();
        assert!(matches!(event.order_id(), Err(WebhookError::MissingOrderId)));
    }
}
