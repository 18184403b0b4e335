//! Sales module: sales, their line items and sale planning.
//!
//! Planning is pure: given the client's lines and a snapshot of the products
//! involved, it either rejects the sale or produces every row the coordinator
//! in `backoffice-infra` has to write. No IO happens here.

pub mod plan;
pub mod sale;

pub use plan::{Catalog, CatalogEntry, PlannedLine, SalePlan};
pub use sale::{CreateSale, Sale, SaleDetail, SaleLine, SaleState, SaleSummary, UpdateSale};
