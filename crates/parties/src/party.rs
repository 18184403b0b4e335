use serde::{Deserialize, Serialize};

use backoffice_core::{ClientId, DomainError, DomainResult, Entity, EntityKind, SupplierId};

/// Supplier directory record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: SupplierId,
    pub name: String,
    pub is_active: bool,
}

impl Supplier {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: SupplierId::new(),
            name: name.into(),
            is_active: true,
        }
    }

    /// Inactive suppliers cannot deliver stock.
    pub fn ensure_can_deliver(&self) -> DomainResult<()> {
        if !self.is_active {
            return Err(DomainError::invalid_argument(format!(
                "supplier {} is inactive",
                self.id
            )));
        }
        Ok(())
    }
}

impl Entity for Supplier {
    type Id = SupplierId;
    const KIND: EntityKind = EntityKind::Supplier;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Client directory record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    pub is_active: bool,
}

impl Client {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ClientId::new(),
            name: name.into(),
            is_active: true,
        }
    }

    /// Inactive clients cannot buy.
    pub fn ensure_can_buy(&self) -> DomainResult<()> {
        if !self.is_active {
            return Err(DomainError::invalid_argument(format!(
                "client {} is inactive",
                self.id
            )));
        }
        Ok(())
    }
}

impl Entity for Client {
    type Id = ClientId;
    const KIND: EntityKind = EntityKind::Client;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
