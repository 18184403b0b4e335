use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use backoffice_core::{
    DomainError, DomainResult, Entity, EntityKind, MovementId, ProductId, SaleId, SupplierId,
    UserId,
};

/// Well-known movement reasons written by the sale coordinator.
pub mod reason {
    pub const SALE: &str = "SALE";
    pub const SALE_CANCELLATION: &str = "SALE_CANCELLATION";
}

/// Direction of a movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementType {
    /// Stock increase (delivery, return, sale cancellation).
    Entry,
    /// Stock decrease (sale, shrinkage).
    Exit,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Entry => "ENTRY",
            MovementType::Exit => "EXIT",
        }
    }

    /// Signed stock delta for `quantity` units moving in this direction.
    pub fn signed(&self, quantity: i64) -> i64 {
        match self {
            MovementType::Entry => quantity,
            MovementType::Exit => -quantity,
        }
    }
}

impl core::str::FromStr for MovementType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ENTRY" => Ok(MovementType::Entry),
            "EXIT" => Ok(MovementType::Exit),
            other => Err(DomainError::invalid_argument(format!(
                "unknown movement type '{other}'"
            ))),
        }
    }
}

/// Ledger entry. Immutable once recorded, except `reason` and `notes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryMovement {
    pub id: MovementId,
    pub movement_type: MovementType,
    /// Always positive; direction comes from `movement_type`.
    pub quantity: i64,
    pub product_id: ProductId,
    pub supplier_id: Option<SupplierId>,
    pub sale_id: Option<SaleId>,
    pub user_id: UserId,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub movement_date: DateTime<Utc>,
}

impl InventoryMovement {
    pub fn signed_quantity(&self) -> i64 {
        self.movement_type.signed(self.quantity)
    }

    /// Movements are permanent audit records.
    pub fn ensure_deletable(&self) -> DomainResult<()> {
        Err(DomainError::invalid_argument(format!(
            "movement {} cannot be deleted; movements are permanent audit records",
            self.id
        )))
    }
}

impl Entity for InventoryMovement {
    type Id = MovementId;
    const KIND: EntityKind = EntityKind::Movement;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Who a movement is recorded for.
///
/// Only the sale coordinator records `Sale` and `SaleCancellation`
/// movements; everything arriving from outside is `Manual`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementOrigin {
    Manual,
    /// EXIT of a committed sale.
    Sale,
    /// Compensating ENTRY of a cancelled sale. Needs no supplier and is
    /// allowed on inactive products.
    SaleCancellation,
}

impl MovementOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementOrigin::Manual => "manual",
            MovementOrigin::Sale => "sale",
            MovementOrigin::SaleCancellation => "sale cancellation",
        }
    }

    fn movement_type(&self) -> MovementType {
        match self {
            MovementOrigin::Manual | MovementOrigin::SaleCancellation => MovementType::Entry,
            MovementOrigin::Sale => MovementType::Exit,
        }
    }

    /// Whether the product must be active for this movement.
    pub fn requires_active_product(&self) -> bool {
        *self != MovementOrigin::SaleCancellation
    }
}

/// Input: record one movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMovement {
    pub movement_type: MovementType,
    pub quantity: i64,
    pub product_id: ProductId,
    pub supplier_id: Option<SupplierId>,
    pub sale_id: Option<SaleId>,
    pub user_id: UserId,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

impl RecordMovement {
    /// EXIT movement taking `quantity` units out for a sale.
    pub fn sale_exit(product_id: ProductId, quantity: i64, sale_id: SaleId, user_id: UserId) -> Self {
        Self {
            movement_type: MovementType::Exit,
            quantity,
            product_id,
            supplier_id: None,
            sale_id: Some(sale_id),
            user_id,
            reason: Some(reason::SALE.to_string()),
            notes: None,
        }
    }

    /// ENTRY movement putting back `quantity` units of a cancelled sale.
    ///
    /// Compensating entries carry no supplier: the stock returns from the
    /// sale, not from a delivery.
    pub fn sale_reversal(
        product_id: ProductId,
        quantity: i64,
        sale_id: SaleId,
        user_id: UserId,
    ) -> Self {
        Self {
            movement_type: MovementType::Entry,
            quantity,
            product_id,
            supplier_id: None,
            sale_id: Some(sale_id),
            user_id,
            reason: Some(reason::SALE_CANCELLATION.to_string()),
            notes: None,
        }
    }

    /// Structural checks that need no stored state.
    ///
    /// Manual ENTRY movements need a supplier, and the sale reasons are
    /// reserved for movements written by the sale coordinator.
    pub fn validate(&self, origin: MovementOrigin) -> DomainResult<()> {
        if self.quantity <= 0 {
            return Err(DomainError::invalid_argument(
                "quantity must be greater than zero",
            ));
        }
        match origin {
            MovementOrigin::Manual => {
                if let Some(reserved) = self
                    .reason
                    .as_deref()
                    .filter(|r| [reason::SALE, reason::SALE_CANCELLATION].contains(r))
                {
                    return Err(DomainError::invalid_argument(format!(
                        "reason {reserved} is reserved for sale movements"
                    )));
                }
                if self.movement_type == MovementType::Entry && self.supplier_id.is_none() {
                    return Err(DomainError::invalid_argument(
                        "supplier_id is required for ENTRY movements",
                    ));
                }
            }
            MovementOrigin::Sale | MovementOrigin::SaleCancellation => {
                if self.movement_type != origin.movement_type() || self.sale_id.is_none() {
                    return Err(DomainError::invalid_argument(format!(
                        "{} movement of a sale must be {} and reference the sale",
                        origin.as_str(),
                        origin.movement_type().as_str()
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn into_movement(self, id: MovementId, now: DateTime<Utc>) -> InventoryMovement {
        InventoryMovement {
            id,
            movement_type: self.movement_type,
            quantity: self.quantity,
            product_id: self.product_id,
            supplier_id: self.supplier_id,
            sale_id: self.sale_id,
            user_id: self.user_id,
            reason: self.reason,
            notes: self.notes,
            movement_date: now,
        }
    }
}

/// Input: update a recorded movement.
///
/// Only `reason` and `notes` may change. Supplying any other field is an
/// attempt to rewrite history and is rejected, whatever its value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementUpdate {
    pub movement_type: Option<MovementType>,
    pub quantity: Option<i64>,
    pub product_id: Option<ProductId>,
    pub supplier_id: Option<SupplierId>,
    pub sale_id: Option<SaleId>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

impl MovementUpdate {
    pub fn validate(&self) -> DomainResult<()> {
        let locked = [
            ("type", self.movement_type.is_some()),
            ("quantity", self.quantity.is_some()),
            ("product_id", self.product_id.is_some()),
            ("supplier_id", self.supplier_id.is_some()),
            ("sale_id", self.sale_id.is_some()),
        ];
        let touched: Vec<&str> = locked
            .iter()
            .filter(|(_, present)| *present)
            .map(|(name, _)| *name)
            .collect();

        if !touched.is_empty() {
            return Err(DomainError::invalid_argument(format!(
                "cannot modify {} of a recorded movement; create a new movement instead",
                touched.join(", ")
            )));
        }
        Ok(())
    }

    pub fn apply(&self, movement: &mut InventoryMovement) {
        if let Some(reason) = &self.reason {
            movement.reason = Some(reason.clone());
        }
        if let Some(notes) = &self.notes {
            movement.notes = Some(notes.clone());
        }
    }
}
