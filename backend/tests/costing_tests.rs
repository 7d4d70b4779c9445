//! Unit conversion and daily costing tests
//!
//! Tests for the pure calculation layer shared with the frontend:
//! - Conversions within a group are exact and reversible
//! - Cross-group and unknown units never convert
//! - Day totals are deterministic and add up per category

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::costing::{compute_day_total, CostCategory, CostError, PriceSource};
use shared::models::{DailyLineItem, DayRecord, OtherExpense, ProductCatalog, ProductCatalogEntry, ProductType};
use shared::units::{convert, is_convertible, normalize_unit, try_convert, unit_group, UnitGroup};
use std::str::FromStr;
use uuid::Uuid;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn entry(product_type: ProductType, price: &str, unit: &str) -> ProductCatalogEntry {
    ProductCatalogEntry {
        id: Uuid::new_v4(),
        name: product_type.as_str().to_string(),
        product_type,
        price_per_unit: dec(price),
        unit: unit.to_string(),
        brand: None,
        supplier: None,
    }
}

fn line(product_id: Option<Uuid>, amount: &str, unit: &str) -> DailyLineItem {
    DailyLineItem {
        product_id,
        amount: dec(amount),
        unit: unit.to_string(),
        price: None,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_conversion_table() {
        assert_eq!(convert(dec("1"), "kg", "g"), dec("1000"));
        assert_eq!(convert(dec("250"), "g", "kg"), dec("0.25"));
        assert_eq!(convert(dec("1.5"), "L", "ml"), dec("1500"));
        assert_eq!(convert(dec("2"), "m3", "L"), dec("2000"));
        assert_eq!(convert(dec("500000"), "ml", "m3"), dec("0.5"));
    }

    #[test]
    fn test_spanish_unit_names() {
        assert_eq!(convert(dec("2"), "Kilos", "gramos"), dec("2000"));
        assert_eq!(convert(dec("3"), "litros", "cc"), dec("3000"));
        assert_eq!(normalize_unit(" Litros "), "L");
        assert_eq!(normalize_unit("jornal"), "jornal");
    }

    #[test]
    fn test_groups() {
        assert_eq!(unit_group("kg"), UnitGroup::Mass);
        assert_eq!(unit_group("m³"), UnitGroup::Volume);
        assert_eq!(unit_group("unidad"), UnitGroup::Other);
        assert!(is_convertible("g", "kg"));
        assert!(!is_convertible("kg", "kg"));
        assert!(!is_convertible("kg", "L"));
        assert!(!is_convertible("día", "kg"));
    }

    /// 500 g priced per kg at 2 costs 1.00
    #[test]
    fn test_grams_against_kilogram_price() {
        let urea = entry(ProductType::Fertilizer, "2", "kg");
        let day = DayRecord {
            date: None,
            fertilizers: vec![line(Some(urea.id), "500", "g")],
            phytosanitaries: vec![],
            water: None,
        };
        let catalog: ProductCatalog = vec![urea].into_iter().collect();

        let cost = compute_day_total(&day, &catalog, &[]).unwrap();
        assert_eq!(cost.total, dec("1.00"));
        assert_eq!(cost.lines[0].quantity, dec("0.5"));
        assert_eq!(cost.lines[0].price_source, PriceSource::Catalog);
    }

    /// Fertilizer 1.00 + water 0.60 + labour 15.00 = 16.60
    #[test]
    fn test_day_total_with_water_and_labour() {
        let urea = entry(ProductType::Fertilizer, "2", "kg");
        let water = entry(ProductType::Water, "0.30", "m3");
        let day = DayRecord {
            date: None,
            fertilizers: vec![line(Some(urea.id), "500", "g")],
            phytosanitaries: vec![],
            water: Some(line(None, "2", "m3")),
        };
        let labour = OtherExpense {
            concept: "Jornal".to_string(),
            amount: dec("1"),
            unit: "día".to_string(),
            price: dec("15"),
        };
        let catalog: ProductCatalog = vec![urea, water].into_iter().collect();

        let cost = compute_day_total(&day, &catalog, &[labour]).unwrap();
        assert_eq!(cost.fertilizer_total, dec("1.00"));
        assert_eq!(cost.water_total, dec("0.60"));
        assert_eq!(cost.other_total, dec("15"));
        assert_eq!(cost.total, dec("16.60"));
    }

    #[test]
    fn test_catalog_from_loose_records() {
        let id = Uuid::new_v4();
        let json = format!(
            r#"[{{"_id":"{}","name":"Cobre","type":"phytosanitary","price":"12.5","unit":"L"}}]"#,
            id
        );
        let catalog = ProductCatalog::from_json(&json).unwrap();
        let entry = catalog.get(&id).unwrap();

        assert_eq!(entry.price_per_unit, dec("12.5"));
        assert_eq!(entry.product_type, ProductType::Phytosanitary);

        let day = DayRecord {
            date: None,
            fertilizers: vec![],
            phytosanitaries: vec![line(Some(id), "200", "ml")],
            water: None,
        };
        let cost = compute_day_total(&day, &catalog, &[]).unwrap();
        assert_eq!(cost.phytosanitary_total, dec("2.5"));
        assert_eq!(cost.lines[0].category, CostCategory::Phytosanitary);
    }

    /// Amounts too large to scale are left as entered instead of panicking
    #[test]
    fn test_huge_amounts_do_not_panic() {
        let huge = Decimal::from_i128_with_scale(10_i128.pow(26), 0);
        assert_eq!(convert(huge, "kg", "g"), huge);
        assert_eq!(try_convert(huge, "m3", "ml"), None);
        assert_eq!(try_convert(huge, "ml", "m3"), Some(Decimal::from_i128_with_scale(10_i128.pow(20), 0)));

        let water = entry(ProductType::Water, "0.30", "L");
        let day = DayRecord {
            date: None,
            fertilizers: vec![],
            phytosanitaries: vec![],
            water: Some(DailyLineItem {
                product_id: None,
                amount: huge,
                unit: "m3".to_string(),
                price: None,
            }),
        };
        let catalog: ProductCatalog = vec![water].into_iter().collect();
        assert_eq!(
            compute_day_total(&day, &catalog, &[]),
            Err(CostError::Overflow(CostCategory::Water))
        );
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..100_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn same_group_pair() -> impl Strategy<Value = (&'static str, &'static str)> {
    prop_oneof![
        Just(("kg", "g")),
        Just(("g", "kg")),
        Just(("L", "ml")),
        Just(("ml", "L")),
        Just(("m3", "L")),
        Just(("L", "m3")),
        Just(("m3", "ml")),
    ]
}

proptest! {
    /// Converting there and back returns the original amount exactly
    #[test]
    fn prop_conversion_round_trip(amount in amount_strategy(), (from, to) in same_group_pair()) {
        let there = convert(amount, from, to);
        prop_assert_eq!(convert(there, to, from), amount);
    }

    /// Mass and volume never convert into each other
    #[test]
    fn prop_cross_group_is_identity(
        amount in amount_strategy(),
        mass in prop::sample::select(vec!["kg", "g"]),
        volume in prop::sample::select(vec!["L", "ml", "m3"])
    ) {
        prop_assert_eq!(convert(amount, mass, volume), amount);
        prop_assert_eq!(convert(amount, volume, mass), amount);
    }

    /// Unknown units leave the amount untouched
    #[test]
    fn prop_unknown_unit_is_identity(amount in amount_strategy(), unit in "[a-z]{5,10}") {
        prop_assume!(unit_group(&unit) == UnitGroup::Other);
        prop_assert_eq!(convert(amount, &unit, "kg"), amount);
        prop_assert_eq!(convert(amount, "L", &unit), amount);
    }

    /// Same inputs always give the same breakdown, and the total is the sum of the lines
    #[test]
    fn prop_day_total_is_deterministic(
        grams in prop::collection::vec(1u32..50_000, 0..6),
        water_m3 in 0u32..100,
        labour in 0u32..500
    ) {
        let urea = entry(ProductType::Fertilizer, "1.85", "kg");
        let water = entry(ProductType::Water, "0.42", "m3");
        let day = DayRecord {
            date: None,
            fertilizers: grams
                .iter()
                .map(|g| line(Some(urea.id), &g.to_string(), "g"))
                .collect(),
            phytosanitaries: vec![],
            water: Some(line(None, &water_m3.to_string(), "m3")),
        };
        let expenses = vec![OtherExpense {
            concept: "Jornal".to_string(),
            amount: Decimal::ONE,
            unit: "día".to_string(),
            price: Decimal::from(labour),
        }];
        let catalog: ProductCatalog = vec![urea, water].into_iter().collect();

        let first = compute_day_total(&day, &catalog, &expenses).unwrap();
        let second = compute_day_total(&day, &catalog, &expenses).unwrap();
        prop_assert_eq!(&first, &second);

        let line_sum: Decimal = first.lines.iter().map(|l| l.cost).sum();
        prop_assert_eq!(first.total, line_sum);
        prop_assert!(first.total >= Decimal::ZERO);
    }
}
