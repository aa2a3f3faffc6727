use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::entities::inventory_movement::{self, Entity as InventoryMovementEntity};
use crate::entities::product::Entity as ProductEntity;
use crate::errors::ServiceError;
use crate::services::day_bounds;
use crate::tenant::TenantContext;

/// Point-in-time on-hand figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockPosition {
    pub quantity: i32,
    pub value: Decimal,
}

impl StockPosition {
    pub const ZERO: StockPosition = StockPosition {
        quantity: 0,
        value: Decimal::ZERO,
    };
}

/// Read-only aggregation over snapshots and the ledger tail.
///
/// Has no write path; every query is derivable from the ledger alone, and
/// the snapshot-plus-tail shortcut must agree with the full replay.
#[derive(Clone, Default)]
pub struct StockService;

impl StockService {
    pub fn new() -> Self {
        Self
    }

    /// Current overall position for a product: latest snapshot plus the
    /// ledger entries recorded after the snapshot's day.
    #[instrument(skip(self, ctx), fields(tenant = %ctx.tenant_code()))]
    pub async fn current_position(
        &self,
        ctx: &TenantContext,
        product_id: Uuid,
    ) -> Result<StockPosition, ServiceError> {
        self.ensure_product(ctx, product_id).await?;

        let latest = crate::services::balances::BalanceService::latest_snapshot_up_to(
            ctx,
            product_id,
            chrono::Utc::now().date_naive(),
        )
        .await?;

        let (base, tail_query) = match &latest {
            Some(snapshot) => {
                let (_, snapshot_day_end) = day_bounds(snapshot.balance_date);
                (
                    StockPosition {
                        quantity: snapshot.closing_quantity,
                        value: snapshot.closing_value,
                    },
                    InventoryMovementEntity::find()
                        .filter(inventory_movement::Column::ProductId.eq(product_id))
                        .filter(inventory_movement::Column::MovedAt.gte(snapshot_day_end)),
                )
            }
            None => (
                StockPosition::ZERO,
                InventoryMovementEntity::find()
                    .filter(inventory_movement::Column::ProductId.eq(product_id)),
            ),
        };

        let tail = tail_query
            .all(ctx.db())
            .await
            .map_err(ServiceError::db_error)?;

        Ok(Self::fold(base, &tail))
    }

    /// Position for a product replayed from the full ledger, ignoring
    /// snapshots. Agrees with `current_position` by construction.
    #[instrument(skip(self, ctx), fields(tenant = %ctx.tenant_code()))]
    pub async fn position_from_ledger(
        &self,
        ctx: &TenantContext,
        product_id: Uuid,
    ) -> Result<StockPosition, ServiceError> {
        self.ensure_product(ctx, product_id).await?;

        let entries = InventoryMovementEntity::find()
            .filter(inventory_movement::Column::ProductId.eq(product_id))
            .all(ctx.db())
            .await
            .map_err(ServiceError::db_error)?;

        Ok(Self::fold(StockPosition::ZERO, &entries))
    }

    /// Position for a product at one branch.
    #[instrument(skip(self, ctx), fields(tenant = %ctx.tenant_code()))]
    pub async fn branch_position(
        &self,
        ctx: &TenantContext,
        product_id: Uuid,
        branch_code: &str,
    ) -> Result<StockPosition, ServiceError> {
        self.ensure_product(ctx, product_id).await?;

        let entries = InventoryMovementEntity::find()
            .filter(inventory_movement::Column::ProductId.eq(product_id))
            .filter(inventory_movement::Column::BranchCode.eq(branch_code))
            .all(ctx.db())
            .await
            .map_err(ServiceError::db_error)?;

        Ok(Self::fold(StockPosition::ZERO, &entries))
    }

    /// Position for a product at one counter.
    #[instrument(skip(self, ctx), fields(tenant = %ctx.tenant_code()))]
    pub async fn counter_position(
        &self,
        ctx: &TenantContext,
        product_id: Uuid,
        counter_code: &str,
    ) -> Result<StockPosition, ServiceError> {
        self.ensure_product(ctx, product_id).await?;

        let entries = InventoryMovementEntity::find()
            .filter(inventory_movement::Column::ProductId.eq(product_id))
            .filter(inventory_movement::Column::CounterCode.eq(counter_code))
            .all(ctx.db())
            .await
            .map_err(ServiceError::db_error)?;

        Ok(Self::fold(StockPosition::ZERO, &entries))
    }

    /// Total position across every product in a category.
    #[instrument(skip(self, ctx), fields(tenant = %ctx.tenant_code()))]
    pub async fn category_total(
        &self,
        ctx: &TenantContext,
        category: &str,
    ) -> Result<StockPosition, ServiceError> {
        let entries = InventoryMovementEntity::find()
            .filter(inventory_movement::Column::Category.eq(category))
            .all(ctx.db())
            .await
            .map_err(ServiceError::db_error)?;

        Ok(Self::fold(StockPosition::ZERO, &entries))
    }

    fn fold(base: StockPosition, entries: &[inventory_movement::Model]) -> StockPosition {
        entries.iter().fold(base, |acc, entry| StockPosition {
            quantity: acc.quantity + entry.signed_quantity(),
            value: acc.value + entry.signed_amount(),
        })
    }

    async fn ensure_product(
        &self,
        ctx: &TenantContext,
        product_id: Uuid,
    ) -> Result<(), ServiceError> {
        ProductEntity::find_by_id(product_id)
            .one(ctx.db())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;
        Ok(())
    }
}
