//! Bulk catalog loading (suppliers and products).
//!
//! This is the seeding path: rows are validated and inserted in bulk, opening
//! stock included, without going through the ledger or the audit log.

use std::collections::BTreeSet;

use tracing::{info, instrument};

use stockguard_core::{DomainError, ProductId, SupplierId};
use stockguard_parties::{NewSupplier, Supplier};
use stockguard_products::{NewProduct, Product};

use crate::error::OperationError;
use crate::store::{ReadStore, Store};

#[derive(Debug, Clone)]
pub struct Catalog<S> {
    store: S,
}

impl<S> Catalog<S>
where
    S: Store + ReadStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[instrument(skip(self, suppliers), fields(count = suppliers.len()), err)]
    pub async fn add_suppliers(
        &self,
        suppliers: Vec<NewSupplier>,
    ) -> Result<Vec<Supplier>, OperationError> {
        let suppliers = suppliers
            .into_iter()
            .map(|s| s.into_supplier(SupplierId::new()))
            .collect::<Result<Vec<_>, _>>()?;
        self.store.insert_suppliers(&suppliers).await?;
        info!(count = suppliers.len(), "suppliers inserted");
        Ok(suppliers)
    }

    /// Insert products after checking every referenced supplier exists.
    #[instrument(skip(self, products), fields(count = products.len()), err)]
    pub async fn add_products(
        &self,
        products: Vec<NewProduct>,
    ) -> Result<Vec<Product>, OperationError> {
        let products = products
            .into_iter()
            .map(|p| p.into_product(ProductId::new()))
            .collect::<Result<Vec<_>, _>>()?;

        let suppliers: BTreeSet<SupplierId> = products.iter().map(|p| p.supplier_id).collect();
        for supplier_id in suppliers {
            if !self.store.supplier_exists(supplier_id).await? {
                return Err(DomainError::SupplierNotFound(supplier_id).into());
            }
        }

        self.store.insert_products(&products).await?;
        info!(count = products.len(), "products inserted");
        Ok(products)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockguard_core::Money;

    use crate::error::StoreError;
    use crate::store::InMemoryStore;

    fn new_product(sku: &str, supplier_id: SupplierId) -> NewProduct {
        NewProduct {
            sku: sku.to_string(),
            name: "Widget".to_string(),
            unit_price: Money::from_cents(999),
            initial_stock: 5,
            supplier_id,
        }
    }

    #[tokio::test]
    async fn products_require_a_known_supplier() {
        let catalog = Catalog::new(InMemoryStore::new());
        let missing = SupplierId::new();
        let err = catalog
            .add_products(vec![new_product("SKU-1", missing)])
            .await
            .unwrap_err();
        assert_eq!(err, OperationError::Domain(DomainError::SupplierNotFound(missing)));
    }

    #[tokio::test]
    async fn bulk_load_assigns_ids_and_keeps_opening_stock() {
        let store = InMemoryStore::new();
        let catalog = Catalog::new(store.clone());
        let suppliers = catalog
            .add_suppliers(vec![NewSupplier::new("Acme", "acme@example.com")])
            .await
            .unwrap();
        let products = catalog
            .add_products(vec![
                new_product("SKU-1", suppliers[0].id),
                new_product("SKU-2", suppliers[0].id),
            ])
            .await
            .unwrap();
        assert_eq!(products.len(), 2);
        let stored = store.product(products[1].id).await.unwrap().unwrap();
        assert_eq!(stored.stock, 5);
        // Bulk path writes no audit records.
        assert_eq!(store.entity_counts().await.unwrap().audit_records, 0);
    }

    #[tokio::test]
    async fn duplicate_sku_is_a_constraint_violation() {
        let catalog = Catalog::new(InMemoryStore::new());
        let supplier = catalog
            .add_suppliers(vec![NewSupplier::new("Acme", "")])
            .await
            .unwrap()[0]
            .id;
        let err = catalog
            .add_products(vec![new_product("SKU-1", supplier), new_product("SKU-1", supplier)])
            .await
            .unwrap_err();
        assert!(matches!(err, OperationError::Store(StoreError::Constraint(_))));
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_before_storage() {
        let catalog = Catalog::new(InMemoryStore::new());
        let err = catalog
            .add_suppliers(vec![NewSupplier::new("   ", "")])
            .await
            .unwrap_err();
        assert!(matches!(err, OperationError::Domain(DomainError::Validation(_))));
    }
}
