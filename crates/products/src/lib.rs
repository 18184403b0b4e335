//! Products module: the product stock counter and its price history.
//!
//! This crate contains business rules only (no IO, no storage). Stock counters
//! are changed exclusively by the stock adjuster in `backoffice-infra`.

pub mod price;
pub mod product;

pub use price::{NewPrice, Price, PriceUpdate, current_prices};
pub use product::{Product, StockLevel};
