use std::{env, time::Duration};

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub payments: PaymentConfig,
}

/// Credentials and knobs for the payment processor, handed to the gateway
/// client and the webhook verifier when they are built.
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    pub api_base: String,
    pub currency: String,
    pub request_timeout: Duration,
    pub webhook_tolerance: Duration,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).with_context(|| format!("{key} is not set"));

        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;
        let host = lookup("APP_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = lookup("APP_PORT")
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);

        let payments = PaymentConfig {
            secret_key: required("STRIPE_SECRET_KEY")?,
            webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,
            api_base: lookup("STRIPE_API_BASE")
                .unwrap_or_else(|| "https://api.stripe.com".to_string()),
            currency: lookup("PAYMENT_CURRENCY")
                .map(|c| c.to_lowercase())
                .unwrap_or_else(|| "usd".to_string()),
            request_timeout: Duration::from_secs(
                lookup("PAYMENT_TIMEOUT_SECS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10),
            ),
            webhook_tolerance: Duration::from_secs(
                lookup("STRIPE_WEBHOOK_TOLERANCE_SECS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(300),
            ),
        };

        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            payments,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_fill_in_optional_settings() {
        let env = vars(&[
            ("DATABASE_URL", "postgres://localhost/shop"),
            ("JWT_SECRET", "jwt"),
            ("STRIPE_SECRET_KEY", "sk_test"),
            ("STRIPE_WEBHOOK_SECRET", "whsec_test"),
        ]);
        let config = AppConfig::from_lookup(|k| env.get(k).cloned()).unwrap();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3000);
        assert_eq!(config.payments.currency, "usd");
        assert_eq!(config.payments.api_base, "https://api.stripe.com");
        assert_eq!(config.payments.request_timeout, Duration::from_secs(10));
        assert_eq!(config.payments.webhook_tolerance, Duration::from_secs(300));
    }

    #[test]
    fn missing_webhook_secret_is_an_error() {
        let env = vars(&[
            ("DATABASE_URL", "postgres://localhost/shop"),
            ("JWT_SECRET", "jwt"),
            ("STRIPE_SECRET_KEY", "sk_test"),
        ]);
        let err = AppConfig::from_lookup(|k| env.get(k).cloned()).unwrap_err();
        assert!(err.to_string().contains("STRIPE_WEBHOOK_SECRET"));
    }
}
