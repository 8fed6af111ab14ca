//! Deterministic synthetic catalog data.
//!
//! Everything is drawn from the caller's RNG, so a fixed seed always yields
//! the same suppliers, products and customer names.

use rand::seq::SliceRandom;
use rand::Rng;

use stockguard_core::{Money, SupplierId};
use stockguard_parties::NewSupplier;
use stockguard_products::NewProduct;

const COMPANY_STEMS: &[&str] = &[
    "Northwind", "Bluebird", "Ironbark", "Silverline", "Redwood", "Summit", "Harbor", "Keystone",
    "Meridian", "Pioneer", "Granite", "Cobalt", "Evergreen", "Lakeside", "Brightwater", "Falcon",
];

const COMPANY_SUFFIXES: &[&str] = &[
    "Supply", "Traders", "Wholesale", "Distribution", "Logistics", "Industries", "& Sons", "Group",
];

const FIRST_NAMES: &[&str] = &[
    "Alice", "Bruno", "Carmen", "Deepak", "Elena", "Farid", "Grace", "Hiro", "Ines", "Jonas",
    "Kamala", "Luis", "Mei", "Nora", "Omar", "Priya", "Quinn", "Rosa", "Sam", "Tomas",
];

const LAST_NAMES: &[&str] = &[
    "Anders", "Baptiste", "Chen", "Diaz", "Eriksen", "Fontaine", "Garcia", "Haddad", "Ito",
    "Jensen", "Kowalski", "Lopez", "Moreau", "Nakamura", "Okafor", "Petrov", "Rossi", "Silva",
];

const PRODUCT_WORDS: &[&str] = &[
    "Bracket", "Valve", "Gasket", "Lantern", "Kettle", "Hinge", "Spindle", "Ratchet", "Cable",
    "Pulley", "Clamp", "Nozzle", "Bearing", "Socket", "Filter", "Anchor", "Spring", "Washer",
];

const PRODUCT_ADJECTIVES: &[&str] = &[
    "Compact", "Heavy", "Steel", "Brass", "Premium", "Basic", "Sealed", "Folding", "Rapid",
    "Quiet", "Outdoor", "Precision",
];

fn pick<'a, R: Rng + ?Sized>(rng: &mut R, words: &[&'a str]) -> &'a str {
    words.choose(rng).copied().unwrap_or_default()
}

pub fn company_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("{} {}", pick(rng, COMPANY_STEMS), pick(rng, COMPANY_SUFFIXES))
}

pub fn person_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("{} {}", pick(rng, FIRST_NAMES), pick(rng, LAST_NAMES))
}

/// `n` suppliers with `"email | phone"` contact strings.
pub fn suppliers<R: Rng + ?Sized>(rng: &mut R, n: usize) -> Vec<NewSupplier> {
    (0..n)
        .map(|i| {
            let name = company_name(rng);
            let handle = name
                .split_whitespace()
                .next()
                .unwrap_or("supplier")
                .to_lowercase();
            let phone = format!("+1 555 {:04}", rng.gen_range(0..10_000));
            NewSupplier::new(name, format!("{handle}{i}@example.com | {phone}"))
        })
        .collect()
}

/// `n` products with SKUs `SKU-00001…`, prices 1.00–1000.00 and opening
/// stock 0–100, each owned by a randomly chosen supplier.
pub fn products<R: Rng + ?Sized>(
    rng: &mut R,
    supplier_ids: &[SupplierId],
    n: usize,
) -> Vec<NewProduct> {
    if supplier_ids.is_empty() {
        return Vec::new();
    }
    (1..=n)
        .map(|i| {
            let name = format!("{} {}", pick(rng, PRODUCT_ADJECTIVES), pick(rng, PRODUCT_WORDS));
            let unit_price = Money::from_cents(rng.gen_range(100..=100_000));
            let initial_stock = rng.gen_range(0..=100);
            let supplier_id = supplier_ids[rng.gen_range(0..supplier_ids.len())];
            NewProduct {
                sku: format!("SKU-{i:05}"),
                name,
                unit_price,
                initial_stock,
                supplier_id,
            }
        })
        .collect()
}
