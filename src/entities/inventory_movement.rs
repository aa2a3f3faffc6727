use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Whether a movement type grows or shrinks the on-hand balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockDirection {
    Increase,
    Decrease,
}

/// Types of inventory movements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementType {
    Sale,
    Return,
    TransferIn,
    TransferOut,
    Addition,
    Adjustment,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Sale => "sale",
            MovementType::Return => "return",
            MovementType::TransferIn => "transfer_in",
            MovementType::TransferOut => "transfer_out",
            MovementType::Addition => "addition",
            MovementType::Adjustment => "adjustment",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "sale" => Some(MovementType::Sale),
            "return" => Some(MovementType::Return),
            "transfer_in" => Some(MovementType::TransferIn),
            "transfer_out" => Some(MovementType::TransferOut),
            "addition" => Some(MovementType::Addition),
            "adjustment" => Some(MovementType::Adjustment),
            _ => None,
        }
    }

    /// The sign of the effect on balance is fixed by type; corrections are
    /// new entries, never a sign flip on an existing one.
    pub fn direction(&self) -> StockDirection {
        match self {
            MovementType::Sale | MovementType::TransferOut => StockDirection::Decrease,
            MovementType::Return
            | MovementType::TransferIn
            | MovementType::Addition
            | MovementType::Adjustment => StockDirection::Increase,
        }
    }
}

/// One row of the append-only inventory movement ledger.
///
/// Rows are inserted and read, never updated or deleted.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_movements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    pub tag_code: Option<String>,
    pub movement_type: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_amount: Decimal,
    pub branch_code: String,
    pub counter_code: Option<String>,
    pub category: Option<String>,
    pub reference_number: Option<String>,
    pub reference_type: Option<String>,
    pub remarks: Option<String>,
    pub moved_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Model {
    pub fn movement_type(&self) -> Option<MovementType> {
        MovementType::from_str(&self.movement_type)
    }

    /// Quantity with the sign its type fixes.
    pub fn signed_quantity(&self) -> i32 {
        match self.movement_type().map(|t| t.direction()) {
            Some(StockDirection::Decrease) => -self.quantity,
            _ => self.quantity,
        }
    }

    /// Total amount with the sign its type fixes.
    pub fn signed_amount(&self) -> Decimal {
        match self.movement_type().map(|t| t.direction()) {
            Some(StockDirection::Decrease) => -self.total_amount,
            _ => self.total_amount,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        if let ActiveValue::NotSet = active_model.created_at {
            active_model.created_at = Set(Utc::now());
        }
        Ok(active_model)
    }
}
