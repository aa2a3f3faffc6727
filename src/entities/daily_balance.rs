use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-day, per-product balance snapshot derived from the movement ledger.
///
/// Unique on (product_id, balance_date). Always written by a full
/// re-derivation, so an upsert can never leave partial sums behind.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "daily_balances")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    pub balance_date: Date,
    pub opening_quantity: i32,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub opening_value: Decimal,
    pub added_quantity: i32,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub added_value: Decimal,
    pub sold_quantity: i32,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub sold_value: Decimal,
    pub returned_quantity: i32,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub returned_value: Decimal,
    pub transferred_in_quantity: i32,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub transferred_in_value: Decimal,
    pub transferred_out_quantity: i32,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub transferred_out_value: Decimal,
    pub closing_quantity: i32,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub closing_value: Decimal,
    pub computed_at: DateTime<Utc>,
}

impl Model {
    /// Checks the snapshot's own books: closing must equal opening plus the
    /// increasing buckets minus the decreasing ones, quantity and value each.
    pub fn is_balanced(&self) -> bool {
        let quantity_ok = self.closing_quantity
            == self.opening_quantity + self.added_quantity + self.returned_quantity
                + self.transferred_in_quantity
                - self.sold_quantity
                - self.transferred_out_quantity;
        let value_ok = self.closing_value
            == self.opening_value + self.added_value + self.returned_value
                + self.transferred_in_value
                - self.sold_value
                - self.transferred_out_value;
        quantity_ok && value_ok
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn snapshot() -> Model {
        Model {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            balance_date: chrono::NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
            opening_quantity: 10,
            opening_value: dec!(1000),
            added_quantity: 0,
            added_value: dec!(0),
            sold_quantity: 2,
            sold_value: dec!(200),
            returned_quantity: 0,
            returned_value: dec!(0),
            transferred_in_quantity: 5,
            transferred_in_value: dec!(450),
            transferred_out_quantity: 0,
            transferred_out_value: dec!(0),
            closing_quantity: 13,
            closing_value: dec!(1250),
            computed_at: Utc::now(),
        }
    }

    #[test]
    fn closing_formula_holds() {
        assert!(snapshot().is_balanced());
    }

    #[test]
    fn imbalance_is_detected() {
        let mut s = snapshot();
        s.closing_quantity = 12;
        assert!(!s.is_balanced());
    }
}
