use rust_decimal::Decimal;

pub mod addresses;
pub mod auth;
pub mod cart;
pub mod orders;
pub mod products;
pub mod reviews;

/// Money is always rendered with two decimal places.
pub(crate) fn money(value: Decimal) -> Decimal {
    let mut value = value;
    value.rescale(2);
    value
}
