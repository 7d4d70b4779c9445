//! Activity-day line items entered by the farmer

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{MovementContext, StockAdjustment};

/// A product applied or consumed during one activity day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyLineItem {
    #[serde(default)]
    pub product_id: Option<Uuid>,
    pub amount: Decimal,
    #[serde(default)]
    pub unit: String,
    /// Price stored with the line, used when the catalog has no entry for it
    #[serde(default)]
    pub price: Option<Decimal>,
}

/// Free-form expense (labour, machinery rental, ...); units are never converted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtherExpense {
    #[serde(default)]
    pub concept: String,
    pub amount: Decimal,
    #[serde(default)]
    pub unit: String,
    pub price: Decimal,
}

/// Line items of one activity day
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayRecord {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub fertilizers: Vec<DailyLineItem>,
    #[serde(default)]
    pub phytosanitaries: Vec<DailyLineItem>,
    #[serde(default)]
    pub water: Option<DailyLineItem>,
}

impl DayRecord {
    /// Stock consumption implied by this day's fertilizer and phytosanitary lines.
    ///
    /// Lines without a catalog link or with a non-positive amount do not touch
    /// inventory. Water and other expenses never do.
    pub fn stock_adjustments(&self, context: &MovementContext) -> Vec<StockAdjustment> {
        let fertilizers = self.fertilizers.iter().map(|l| (l, "fertilizer_application"));
        let phytosanitaries = self
            .phytosanitaries
            .iter()
            .map(|l| (l, "phytosanitary_treatment"));

        fertilizers
            .chain(phytosanitaries)
            .filter(|(line, _)| line.amount > Decimal::ZERO)
            .filter_map(|(line, reason)| {
                line.product_id.map(|product_id| {
                    StockAdjustment::subtract(product_id, line.amount, line.unit.clone())
                        .with_reason(reason)
                        .with_context(context.clone())
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StockOperation;

    fn line(product_id: Option<Uuid>, amount: i64, unit: &str) -> DailyLineItem {
        DailyLineItem {
            product_id,
            amount: Decimal::from(amount),
            unit: unit.to_string(),
            price: None,
        }
    }

    #[test]
    fn test_stock_adjustments_skip_unlinked_and_empty_lines() {
        let urea = Uuid::new_v4();
        let copper = Uuid::new_v4();
        let day = DayRecord {
            date: None,
            fertilizers: vec![line(Some(urea), 500, "g"), line(None, 3, "kg"), line(Some(urea), 0, "kg")],
            phytosanitaries: vec![line(Some(copper), 2, "L")],
            water: Some(line(Some(Uuid::new_v4()), 10, "m3")),
        };
        let context = MovementContext {
            activity_id: Some(Uuid::new_v4()),
            module: Some("fertigation".to_string()),
            day_index: Some(2),
        };

        let ops = day.stock_adjustments(&context);
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].product_id, urea);
        assert_eq!(ops[0].amount_unit.as_deref(), Some("g"));
        assert_eq!(ops[0].reason.as_deref(), Some("fertilizer_application"));
        assert_eq!(ops[1].product_id, copper);
        assert!(ops.iter().all(|o| o.operation == StockOperation::Subtract));
        assert!(ops.iter().all(|o| o.context.as_ref() == Some(&context)));
    }

    #[test]
    fn test_day_record_deserializes_camel_case() {
        let json = r#"{"fertilizers":[{"productId":"6f1c2d3e-0000-4000-8000-000000000001","amount":"1.5","unit":"kg"}],"water":{"amount":2,"unit":"m3"}}"#;
        let day: DayRecord = serde_json::from_str(json).unwrap();
        assert_eq!(day.fertilizers.len(), 1);
        assert!(day.phytosanitaries.is_empty());
        assert_eq!(day.water.unwrap().amount, Decimal::from(2));
    }
}
