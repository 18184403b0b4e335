use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use backoffice_core::{DomainError, DomainResult, Entity, EntityKind, Money, PriceId, ProductId};

/// Price row of a product's price history.
///
/// At most one row per product has `is_current_price = true`. The current row
/// has `valid_to = None`; demoted rows carry the instant they stopped being
/// current.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub id: PriceId,
    pub product_id: ProductId,
    pub purchase_price: Money,
    pub selling_price: Money,
    pub is_current_price: bool,
    pub valid_from: DateTime<Utc>,
    pub valid_to: Option<DateTime<Utc>>,
}

impl Price {
    /// Stop being the current price as of `at`.
    pub fn demote(&mut self, at: DateTime<Utc>) {
        self.is_current_price = false;
        self.valid_to = Some(at);
    }

    /// Become the current price again. `valid_from` keeps the original start.
    pub fn promote(&mut self) {
        self.is_current_price = true;
        self.valid_to = None;
    }

    /// A current price cannot be deleted.
    pub fn ensure_deletable(&self) -> DomainResult<()> {
        if self.is_current_price {
            return Err(DomainError::invalid_argument(
                "cannot delete the current price; create a new price or promote another first",
            ));
        }
        Ok(())
    }

    /// Apply the non-flag fields of an update.
    pub fn apply_amounts(&mut self, update: &PriceUpdate) {
        if let Some(purchase) = update.purchase_price {
            self.purchase_price = purchase;
        }
        if let Some(selling) = update.selling_price {
            self.selling_price = selling;
        }
    }
}

impl Entity for Price {
    type Id = PriceId;
    const KIND: EntityKind = EntityKind::Price;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Input: create a price for a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPrice {
    pub product_id: ProductId,
    pub purchase_price: Money,
    pub selling_price: Money,
    pub is_current: bool,
}

impl NewPrice {
    pub fn validate(&self) -> DomainResult<()> {
        ensure_positive("purchase_price", self.purchase_price)?;
        ensure_positive("selling_price", self.selling_price)
    }

    pub fn into_price(self, id: PriceId, now: DateTime<Utc>) -> Price {
        Price {
            id,
            product_id: self.product_id,
            purchase_price: self.purchase_price,
            selling_price: self.selling_price,
            is_current_price: self.is_current,
            valid_from: now,
            valid_to: None,
        }
    }
}

/// Input: update an existing price. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub purchase_price: Option<Money>,
    pub selling_price: Option<Money>,
    pub is_current_price: Option<bool>,
}

impl PriceUpdate {
    /// Validate against the stored row.
    ///
    /// Clearing the flag of the current price would leave the product without
    /// one through the back door; promote another price instead.
    pub fn validate(&self, stored: &Price) -> DomainResult<()> {
        if let Some(purchase) = self.purchase_price {
            ensure_positive("purchase_price", purchase)?;
        }
        if let Some(selling) = self.selling_price {
            ensure_positive("selling_price", selling)?;
        }
        if stored.is_current_price && self.is_current_price == Some(false) {
            return Err(DomainError::invalid_argument(
                "cannot unset the current price; promote another price instead",
            ));
        }
        Ok(())
    }

    /// Whether this update promotes a non-current price.
    pub fn promotes(&self, stored: &Price) -> bool {
        self.is_current_price == Some(true) && !stored.is_current_price
    }
}

/// Current prices among `prices` (at most one per product when consistent).
pub fn current_prices<'a>(
    prices: impl IntoIterator<Item = &'a Price>,
    product_id: ProductId,
) -> Vec<&'a Price> {
    prices
        .into_iter()
        .filter(|p| p.product_id == product_id && p.is_current_price)
        .collect()
}

fn ensure_positive(field: &str, amount: Money) -> DomainResult<()> {
    if !amount.is_positive() {
        return Err(DomainError::invalid_argument(format!(
            "{field} must be greater than zero"
        )));
    }
    Ok(())
}
