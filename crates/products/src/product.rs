use serde::{Deserialize, Serialize};

use backoffice_core::{DomainError, DomainResult, Entity, EntityKind, ProductId, SupplierId};

/// Stock level of a product relative to its configured thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockLevel {
    /// `current_stock < min_quantity`.
    Low,
    Normal,
    /// `max_quantity` is set and `current_stock > max_quantity`.
    High,
}

/// Product row: identity, thresholds and the materialized stock counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub supplier_id: SupplierId,
    /// Net of every movement recorded for this product. Never negative.
    pub current_stock: i64,
    pub min_quantity: i64,
    pub max_quantity: Option<i64>,
    pub is_active: bool,
}

impl Product {
    /// A new product starts with zero stock; stock only arrives via movements.
    pub fn new(
        name: impl Into<String>,
        supplier_id: SupplierId,
        min_quantity: i64,
        max_quantity: Option<i64>,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::invalid_argument("product name cannot be empty"));
        }
        if min_quantity < 0 {
            return Err(DomainError::invalid_argument("min_quantity cannot be negative"));
        }
        if let Some(max) = max_quantity {
            if max < min_quantity {
                return Err(DomainError::invalid_argument(
                    "max_quantity cannot be lower than min_quantity",
                ));
            }
        }
        Ok(Self {
            id: ProductId::new(),
            name,
            supplier_id,
            current_stock: 0,
            min_quantity,
            max_quantity,
            is_active: true,
        })
    }

    pub fn stock_level(&self) -> StockLevel {
        if self.current_stock < self.min_quantity {
            return StockLevel::Low;
        }
        match self.max_quantity {
            Some(max) if self.current_stock > max => StockLevel::High,
            _ => StockLevel::Normal,
        }
    }

    /// Inactive products cannot be sold or move stock.
    pub fn ensure_active(&self) -> DomainResult<()> {
        if !self.is_active {
            return Err(DomainError::invalid_argument(format!(
                "product {} is inactive",
                self.id
            )));
        }
        Ok(())
    }

    /// Check that `requested` units can be taken out of stock.
    pub fn ensure_available(&self, requested: i64) -> DomainResult<()> {
        if self.current_stock < requested {
            return Err(DomainError::insufficient_stock(
                self.id,
                self.current_stock,
                requested,
            ));
        }
        Ok(())
    }
}

impl Entity for Product {
    type Id = ProductId;
    const KIND: EntityKind = EntityKind::Product;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
