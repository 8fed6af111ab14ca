use serde::{Deserialize, Serialize};

use stockguard_core::{DomainError, DomainResult, Entity, SupplierId};

/// Longest accepted supplier display name, in characters.
pub const MAX_SUPPLIER_NAME_LEN: usize = 200;

/// A supplier of products. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: SupplierId,
    pub name: String,
    /// Free-form contact string (e.g. `"mail@example.com | +1 555 0100"`).
    pub contact: String,
}

impl Entity for Supplier {
    type Id = SupplierId;

    fn id(&self) -> SupplierId {
        self.id
    }
}

/// Input for creating a supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSupplier {
    pub name: String,
    pub contact: String,
}

impl NewSupplier {
    pub fn new(name: impl Into<String>, contact: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contact: contact.into(),
        }
    }

    /// Validate and assign an identity.
    pub fn into_supplier(self, id: SupplierId) -> DomainResult<Supplier> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("supplier name cannot be empty"));
        }
        if name.chars().count() > MAX_SUPPLIER_NAME_LEN {
            return Err(DomainError::validation(format!(
                "supplier name exceeds {MAX_SUPPLIER_NAME_LEN} characters"
            )));
        }
        Ok(Supplier {
            id,
            name,
            contact: self.contact.trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_accepts_valid_supplier() {
        let id = SupplierId::new();
        let s = NewSupplier::new("  Acme Corp ", " sales@acme.test ")
            .into_supplier(id)
            .unwrap();
        assert_eq!(s.id(), id);
        assert_eq!(s.name, "Acme Corp");
        assert_eq!(s.contact, "sales@acme.test");
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = NewSupplier::new("   ", "x").into_supplier(SupplierId::new()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("empty")));
    }

    #[test]
    fn overlong_name_is_rejected() {
        let name = "x".repeat(MAX_SUPPLIER_NAME_LEN + 1);
        assert!(NewSupplier::new(name, "").into_supplier(SupplierId::new()).is_err());
    }
}
