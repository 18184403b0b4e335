//! Ledger arithmetic: the net of a product's movements.

use serde::{Deserialize, Serialize};

use backoffice_core::ProductId;

use crate::movement::{InventoryMovement, MovementType};

/// Totals of a product's movement ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub entries: i64,
    pub exits: i64,
}

impl LedgerSummary {
    pub fn from_movements<'a>(movements: impl IntoIterator<Item = &'a InventoryMovement>) -> Self {
        movements
            .into_iter()
            .fold(Self::default(), |mut acc, m| {
                match m.movement_type {
                    MovementType::Entry => acc.entries += m.quantity,
                    MovementType::Exit => acc.exits += m.quantity,
                }
                acc
            })
    }

    pub fn net(&self) -> i64 {
        self.entries - self.exits
    }
}

/// Result of comparing a stock counter with its ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub product_id: ProductId,
    pub recorded_stock: i64,
    pub ledger_net: i64,
    pub entries: i64,
    pub exits: i64,
    pub consistent: bool,
}

impl Reconciliation {
    pub fn new(product_id: ProductId, recorded_stock: i64, summary: LedgerSummary) -> Self {
        let ledger_net = summary.net();
        Self {
            product_id,
            recorded_stock,
            ledger_net,
            entries: summary.entries,
            exits: summary.exits,
            consistent: recorded_stock == ledger_net,
        }
    }

    /// Units the counter is off by (positive: counter above ledger).
    pub fn drift(&self) -> i64 {
        self.recorded_stock - self.ledger_net
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backoffice_core::{MovementId, SupplierId, UserId};
    use chrono::Utc;
    use proptest::prelude::*;

    fn movement(movement_type: MovementType, quantity: i64) -> InventoryMovement {
        InventoryMovement {
            id: MovementId::new(),
            movement_type,
            quantity,
            product_id: ProductId::new(),
            supplier_id: Some(SupplierId::new()),
            sale_id: None,
            user_id: UserId::new(),
            reason: None,
            notes: None,
            movement_date: Utc::now(),
        }
    }

    #[test]
    fn summary_splits_entries_and_exits() {
        let ledger = vec![
            movement(MovementType::Entry, 50),
            movement(MovementType::Entry, 30),
            movement(MovementType::Exit, 20),
            movement(MovementType::Entry, 10),
            movement(MovementType::Exit, 15),
        ];
        let summary = LedgerSummary::from_movements(&ledger);
        assert_eq!(summary.entries, 90);
        assert_eq!(summary.exits, 35);
        assert_eq!(summary.net(), 55);
    }

    #[test]
    fn reconciliation_flags_drift() {
        let summary = LedgerSummary {
            entries: 10,
            exits: 4,
        };
        let ok = Reconciliation::new(ProductId::new(), 6, summary);
        assert!(ok.consistent);
        assert_eq!(ok.drift(), 0);

        let off = Reconciliation::new(ProductId::new(), 9, summary);
        assert!(!off.consistent);
        assert_eq!(off.drift(), 3);
    }

    proptest! {
        #[test]
        fn net_is_sum_of_signed_quantities(ops in proptest::collection::vec((any::<bool>(), 1i64..1000), 0..100)) {
            let ledger: Vec<_> = ops
                .iter()
                .map(|(is_entry, q)| {
                    let t = if *is_entry { MovementType::Entry } else { MovementType::Exit };
                    movement(t, *q)
                })
                .collect();
            let expected: i64 = ledger.iter().map(|m| m.signed_quantity()).sum();
            prop_assert_eq!(LedgerSummary::from_movements(&ledger).net(), expected);
        }
    }
}
