use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    payments::{PaymentError, webhook::WebhookError},
    response::ErrorBody,
};

/// Reasons a cart cannot be turned into an order.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("You do not have a cart.")]
    CartMissing,

    #[error("Your cart is empty.")]
    EmptyCart,

    #[error("Invalid address specified.")]
    InvalidAddress,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found.")]
    NotFound,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("You do not have permission to perform this action.")]
    Forbidden,

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Webhook(#[from] WebhookError),

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::Checkout(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Payment(PaymentError::InvalidOrderState(_)) => StatusCode::BAD_REQUEST,
            AppError::Payment(PaymentError::Provider(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Webhook(WebhookError::OrderNotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Webhook(_) => StatusCode::BAD_REQUEST,
            AppError::OrmError(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::OrmError(err) => {
                tracing::error!(error = %err, "database error");
                ErrorBody::error("Internal Server Error")
            }
            AppError::Internal(err) => {
                tracing::error!(error = ?err, "internal error");
                ErrorBody::error("Internal Server Error")
            }
            // Provider messages are passed through so the client can decide to retry.
            AppError::Payment(PaymentError::Provider(message)) => {
                tracing::error!(error = %message, "payment provider error");
                ErrorBody::error(message.clone())
            }
            other => ErrorBody::detail(other.to_string()),
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
