use uuid::Uuid;

use crate::{
    dto::products::Product,
    error::{AppError, AppResult},
    repository::ProductRepository,
    response::{Meta, Page},
    routes::params::Pagination,
    state::AppState,
};

pub async fn list_products(state: &AppState, pagination: Pagination) -> AppResult<Page<Product>> {
    let (page, limit, offset) = pagination.normalize();
    let (products, total) = ProductRepository::new(&state.orm)
        .list(limit as u64, offset as u64)
        .await?;

    let items = products.into_iter().map(Product::from).collect();
    Ok(Page::new(items, Meta::new(page, limit, total as i64)))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<Product> {
    let product = ProductRepository::new(&state.orm)
        .find(id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Product::from(product))
}
