//! Sale planning: validate every line before anything is written.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use backoffice_core::{
    ClientId, DomainError, DomainResult, EntityKind, Money, ProductId, SaleDetailId, SaleId,
    UserId,
};
use backoffice_products::{Price, Product};

use crate::sale::{CreateSale, Sale, SaleDetail, SaleLine};

/// What the coordinator read for one product inside its transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub product: Product,
    pub current_price: Option<Price>,
}

/// Products referenced by a sale, keyed by id.
pub type Catalog = BTreeMap<ProductId, CatalogEntry>;

/// A validated line, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLine {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: Money,
    pub discount_amount: Money,
    pub subtotal: Money,
}

/// Outcome of a successful validation: every row a sale needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalePlan {
    pub client_id: ClientId,
    pub user_id: UserId,
    pub lines: Vec<PlannedLine>,
    pub total_amount: Money,
    /// Units requested per product across all lines.
    pub demand: BTreeMap<ProductId, i64>,
}

impl SalePlan {
    /// Validate `cmd` against `catalog`.
    ///
    /// Lines are checked in order; the first failing line rejects the whole
    /// sale. Stock is checked against the running demand per product so that
    /// two lines of the same product cannot together exceed what is on hand.
    pub fn build(cmd: &CreateSale, catalog: &Catalog) -> DomainResult<Self> {
        if cmd.lines.is_empty() {
            return Err(DomainError::invalid_argument(
                "a sale needs at least one line",
            ));
        }

        let mut demand: BTreeMap<ProductId, i64> = BTreeMap::new();
        let mut lines = Vec::with_capacity(cmd.lines.len());
        let mut total_amount = Money::ZERO;

        for line in &cmd.lines {
            let entry = catalog
                .get(&line.product_id)
                .ok_or_else(|| DomainError::not_found(EntityKind::Product, line.product_id))?;

            if line.quantity <= 0 {
                return Err(DomainError::invalid_argument(format!(
                    "quantity for product {} must be greater than zero",
                    line.product_id
                )));
            }
            entry.product.ensure_active()?;

            let requested = demand.entry(line.product_id).or_insert(0);
            *requested += line.quantity;
            entry.product.ensure_available(*requested)?;

            let planned = plan_line(line, entry)?;
            total_amount = total_amount.checked_add(planned.subtotal)?;
            lines.push(planned);
        }

        Ok(Self {
            client_id: cmd.client_id,
            user_id: cmd.user_id,
            lines,
            total_amount,
            demand,
        })
    }

    /// Materialize the sale and its details with fresh ids.
    pub fn into_sale(self, sale_id: SaleId, now: DateTime<Utc>) -> Sale {
        let details = self
            .lines
            .into_iter()
            .map(|l| SaleDetail {
                id: SaleDetailId::new(),
                sale_id,
                product_id: l.product_id,
                quantity: l.quantity,
                unit_price: l.unit_price,
                discount_amount: l.discount_amount,
                subtotal: l.subtotal,
            })
            .collect();

        Sale {
            id: sale_id,
            client_id: self.client_id,
            user_id: self.user_id,
            total_amount: self.total_amount,
            sale_date: now,
            details,
        }
    }
}

fn plan_line(line: &SaleLine, entry: &CatalogEntry) -> DomainResult<PlannedLine> {
    let unit_price = match (line.unit_price, &entry.current_price) {
        (Some(price), _) => price,
        (None, Some(current)) => current.selling_price,
        (None, None) => {
            return Err(DomainError::invalid_argument(format!(
                "product {} has no current price; supply a unit price",
                line.product_id
            )));
        }
    };
    if unit_price.is_negative() {
        return Err(DomainError::invalid_argument("unit_price cannot be negative"));
    }

    let discount_amount = line.discount_amount.unwrap_or(Money::ZERO);
    if discount_amount.is_negative() {
        return Err(DomainError::invalid_argument(
            "discount_amount cannot be negative",
        ));
    }

    let gross = unit_price.times(line.quantity)?;
    if discount_amount > gross {
        return Err(DomainError::invalid_argument(format!(
            "discount {discount_amount} exceeds line amount {gross}"
        )));
    }

    Ok(PlannedLine {
        product_id: line.product_id,
        quantity: line.quantity,
        unit_price,
        discount_amount,
        subtotal: gross - discount_amount,
    })
}
