use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Catalog row for a jewelry product.
///
/// The catalog itself is owned elsewhere; this core reads it for
/// existence, price fallback and current location, and only transfer
/// completion may move `branch_code`/`counter_code`/`box_code`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub sku: String,
    pub name: String,
    pub category: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub unit_price: Decimal,
    pub branch_code: String,
    pub counter_code: Option<String>,
    pub box_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::tag_assignment::Entity")]
    TagAssignment,
}

impl Related<super::tag_assignment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TagAssignment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
