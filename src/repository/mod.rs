//! Per-entity persistence. Every repository borrows a connection, so the same
//! code runs against the pool or inside a transaction.

pub mod addresses;
pub mod cart;
pub mod orders;
pub mod products;
pub mod reviews;

pub use addresses::AddressRepository;
pub use cart::{CartLine, CartRepository};
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use reviews::ReviewRepository;
