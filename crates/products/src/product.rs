use serde::{Deserialize, Serialize};

use stockguard_core::{DomainError, DomainResult, Entity, Money, ProductId, SupplierId, ValueObject};

/// Longest accepted SKU, in characters.
pub const MAX_SKU_LEN: usize = 64;

/// Stock-keeping unit: the product's unique business key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sku(String);

impl ValueObject for Sku {}

impl Sku {
    pub fn parse(raw: impl AsRef<str>) -> DomainResult<Self> {
        let sku = raw.as_ref().trim();
        if sku.is_empty() {
            return Err(DomainError::validation("SKU cannot be empty"));
        }
        if sku.chars().count() > MAX_SKU_LEN {
            return Err(DomainError::validation(format!(
                "SKU exceeds {MAX_SKU_LEN} characters"
            )));
        }
        if sku.chars().any(char::is_whitespace) {
            return Err(DomainError::validation("SKU cannot contain whitespace"));
        }
        Ok(Self(sku.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Sku {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Sku::parse(value)
    }
}

impl From<Sku> for String {
    fn from(value: Sku) -> Self {
        value.0
    }
}

impl core::fmt::Display for Sku {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A product row, including its current stock.
///
/// `stock` is only ever changed by the movement and fulfillment paths, which
/// keep it non-negative and audit every change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub sku: Sku,
    pub name: String,
    pub unit_price: Money,
    pub stock: i64,
    pub supplier_id: SupplierId,
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> ProductId {
        self.id
    }
}

/// Input for creating a product (bulk seeding path).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub unit_price: Money,
    /// Opening stock. Seeding has no prior stock to violate, so this is set
    /// directly instead of through a movement.
    pub initial_stock: i64,
    pub supplier_id: SupplierId,
}

impl NewProduct {
    /// Validate and assign an identity.
    ///
    /// Supplier existence and SKU uniqueness need storage and are enforced there.
    pub fn into_product(self, id: ProductId) -> DomainResult<Product> {
        let sku = Sku::parse(&self.sku)?;
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if self.initial_stock < 0 {
            return Err(DomainError::validation("initial stock cannot be negative"));
        }
        Ok(Product {
            id,
            sku,
            name,
            unit_price: self.unit_price,
            stock: self.initial_stock,
            supplier_id: self.supplier_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_product(sku: &str, stock: i64) -> NewProduct {
        NewProduct {
            sku: sku.to_string(),
            name: "Widget".to_string(),
            unit_price: Money::from_cents(500),
            initial_stock: stock,
            supplier_id: SupplierId::new(),
        }
    }

    #[test]
    fn valid_product_is_created() {
        let id = ProductId::new();
        let p = new_product(" SKU-00001 ", 10).into_product(id).unwrap();
        assert_eq!(p.id(), id);
        assert_eq!(p.sku.as_str(), "SKU-00001");
        assert_eq!(p.stock, 10);
    }

    #[test]
    fn empty_sku_is_rejected() {
        let err = new_product("  ", 1).into_product(ProductId::new()).unwrap_err();
        match err {
            DomainError::Validation(msg) if msg.contains("SKU cannot be empty") => {}
            _ => panic!("Expected validation error for empty SKU"),
        }
    }

    #[test]
    fn negative_opening_stock_is_rejected() {
        let err = new_product("SKU-1", -1).into_product(ProductId::new()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: well-formed SKUs always parse and keep their text.
            #[test]
            fn well_formed_skus_parse(sku in "[A-Z0-9-]{1,64}") {
                let parsed = Sku::parse(&sku).unwrap();
                prop_assert_eq!(parsed.as_str(), sku.as_str());
            }

            /// Property: a product's price survives creation unchanged.
            #[test]
            fn price_is_preserved(cents in 0u64..100_000_000u64) {
                let mut input = new_product("SKU-1", 0);
                input.unit_price = Money::from_cents(cents);
                let p = input.into_product(ProductId::new()).unwrap();
                prop_assert_eq!(p.unit_price, Money::from_cents(cents));
                prop_assert_eq!(p.unit_price.amount(), rust_decimal::Decimal::new(cents as i64, 2));
            }
        }
    }
}
