use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use backoffice_core::{
    ClientId, Entity, EntityKind, Money, ProductId, SaleDetailId, SaleId, UserId,
};

/// Lifecycle of a sale as seen by the coordinator.
///
/// `Validating → Committed` or `Validating → Rejected`; cancellation is the
/// separate `Committed → Reversed` transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaleState {
    Validating,
    Committed,
    Rejected,
    Reversed,
}

impl SaleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleState::Validating => "validating",
            SaleState::Committed => "committed",
            SaleState::Rejected => "rejected",
            SaleState::Reversed => "reversed",
        }
    }

    pub fn can_transition_to(self, next: SaleState) -> bool {
        matches!(
            (self, next),
            (SaleState::Validating, SaleState::Committed)
                | (SaleState::Validating, SaleState::Rejected)
                | (SaleState::Committed, SaleState::Reversed)
        )
    }
}

/// Sale line item. `unit_price` is a snapshot taken when the sale was made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleDetail {
    pub id: SaleDetailId,
    pub sale_id: SaleId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: Money,
    pub discount_amount: Money,
    /// `unit_price * quantity - discount_amount`.
    pub subtotal: Money,
}

/// Sale with its line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub id: SaleId,
    pub client_id: ClientId,
    pub user_id: UserId,
    /// Always the sum of the details' subtotals.
    pub total_amount: Money,
    pub sale_date: DateTime<Utc>,
    pub details: Vec<SaleDetail>,
}

impl Sale {
    pub fn computed_total(&self) -> Money {
        self.details.iter().map(|d| d.subtotal).sum()
    }

    pub fn is_consistent(&self) -> bool {
        self.total_amount == self.computed_total()
    }

    pub fn summary(&self) -> SaleSummary {
        SaleSummary {
            id: self.id,
            client_id: self.client_id,
            total_amount: self.total_amount,
            sale_date: self.sale_date,
        }
    }
}

/// Header of a sale without its lines, attached to movements that reference it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleSummary {
    pub id: SaleId,
    pub client_id: ClientId,
    pub total_amount: Money,
    pub sale_date: DateTime<Utc>,
}

impl Entity for Sale {
    type Id = SaleId;
    const KIND: EntityKind = EntityKind::Sale;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// One requested line of a new sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLine {
    pub product_id: ProductId,
    pub quantity: i64,
    /// Defaults to the product's current selling price.
    pub unit_price: Option<Money>,
    /// Defaults to zero.
    pub discount_amount: Option<Money>,
}

impl SaleLine {
    pub fn new(product_id: ProductId, quantity: i64) -> Self {
        Self {
            product_id,
            quantity,
            unit_price: None,
            discount_amount: None,
        }
    }

    pub fn at_price(mut self, unit_price: Money) -> Self {
        self.unit_price = Some(unit_price);
        self
    }

    pub fn with_discount(mut self, discount: Money) -> Self {
        self.discount_amount = Some(discount);
        self
    }
}

/// Input: create a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSale {
    pub client_id: ClientId,
    pub user_id: UserId,
    pub lines: Vec<SaleLine>,
}

/// Input: non-structural sale update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSale {
    pub client_id: Option<ClientId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(sale_id: SaleId, subtotal: &str) -> SaleDetail {
        SaleDetail {
            id: SaleDetailId::new(),
            sale_id,
            product_id: ProductId::new(),
            quantity: 1,
            unit_price: subtotal.parse().unwrap(),
            discount_amount: Money::ZERO,
            subtotal: subtotal.parse().unwrap(),
        }
    }

    #[test]
    fn total_is_sum_of_subtotals() {
        let id = SaleId::new();
        let mut sale = Sale {
            id,
            client_id: ClientId::new(),
            user_id: UserId::new(),
            total_amount: "15.75".parse().unwrap(),
            sale_date: Utc::now(),
            details: vec![detail(id, "10.25"), detail(id, "5.50")],
        };
        assert!(sale.is_consistent());

        sale.total_amount = Money::ZERO;
        assert!(!sale.is_consistent());
    }

    #[test]
    fn only_documented_transitions_are_allowed() {
        assert!(SaleState::Validating.can_transition_to(SaleState::Committed));
        assert!(SaleState::Validating.can_transition_to(SaleState::Rejected));
        assert!(SaleState::Committed.can_transition_to(SaleState::Reversed));
        assert!(!SaleState::Rejected.can_transition_to(SaleState::Reversed));
        assert!(!SaleState::Reversed.can_transition_to(SaleState::Committed));
    }
}
