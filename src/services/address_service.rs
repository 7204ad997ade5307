use chrono::Utc;
use sea_orm::{Set, SqlErr, TransactionTrait};
use uuid::Uuid;

use crate::{
    dto::addresses::{Address, CreateAddressRequest},
    entity::addresses::ActiveModel as AddressActive,
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    repository::{AddressRepository, OrderRepository},
    state::AppState,
};

pub async fn list_addresses(state: &AppState, user: &AuthUser) -> AppResult<Vec<Address>> {
    let addresses = AddressRepository::new(&state.orm)
        .list_for_user(user.user_id)
        .await?;
    Ok(addresses.into_iter().map(Address::from).collect())
}

pub async fn create_address(
    state: &AppState,
    user: &AuthUser,
    payload: CreateAddressRequest,
) -> AppResult<Address> {
    let required = [
        ("street_address", &payload.street_address),
        ("city", &payload.city),
        ("postal_code", &payload.postal_code),
        ("country", &payload.country),
    ];
    if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
        return Err(AppError::BadRequest(format!("{field} must not be blank.")));
    }

    // At most one default per user.
    let txn = state.orm.begin().await?;
    let addresses = AddressRepository::new(&txn);
    if payload.is_default {
        addresses.clear_default(user.user_id).await?;
    }
    let address = addresses
        .insert(AddressActive {
            id: Set(Uuid::new_v4()),
            user_id: Set(user.user_id),
            street_address: Set(payload.street_address),
            city: Set(payload.city),
            state: Set(payload.state),
            postal_code: Set(payload.postal_code),
            country: Set(payload.country),
            is_default: Set(payload.is_default),
            created_at: Set(Utc::now().into()),
        })
        .await
        .map_err(|err| match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                AppError::BadRequest("This address already exists.".to_string())
            }
            _ => AppError::from(err),
        })?;
    txn.commit().await?;

    Ok(Address::from(address))
}

/// Addresses used as an order's shipping address are kept for the order's sake.
pub async fn delete_address(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<()> {
    let addresses = AddressRepository::new(&state.orm);
    let address = addresses
        .find_owned(user.user_id, id)
        .await?
        .ok_or(AppError::NotFound)?;

    if OrderRepository::new(&state.orm)
        .references_address(address.id)
        .await?
    {
        return Err(AppError::BadRequest(
            "This address is used by an order and cannot be deleted.".to_string(),
        ));
    }

    addresses.delete(address).await?;
    Ok(())
}
