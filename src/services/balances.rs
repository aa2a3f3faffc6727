use chrono::{Duration, NaiveDate, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::entities::daily_balance::{self, Entity as DailyBalanceEntity};
use crate::entities::inventory_movement::{self, Entity as InventoryMovementEntity, MovementType};
use crate::entities::product::Entity as ProductEntity;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::day_bounds;
use crate::tenant::TenantContext;

/// One product/date pair that could not be recomputed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecalculationFailure {
    pub product_id: Uuid,
    pub date: NaiveDate,
    pub error: String,
}

/// Outcome of a ledger-wide balance repair run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecalculationReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub days_processed: u64,
    pub snapshots_written: u64,
    pub failures: Vec<RecalculationFailure>,
}

/// Replays the movement ledger into per-day per-product balance snapshots.
///
/// Every write is a full re-derivation of one (product, date) key, and
/// recomputation of the same key is serialized through a keyed mutex, so
/// recomputing never interleaves partial sums and re-running is always
/// safe.
#[derive(Clone)]
pub struct BalanceService {
    event_sender: EventSender,
    recalc_max_days: i64,
    locks: Arc<DashMap<(Uuid, NaiveDate), Arc<Mutex<()>>>>,
}

impl BalanceService {
    pub fn new(event_sender: EventSender, recalc_max_days: i64) -> Self {
        Self {
            event_sender,
            recalc_max_days,
            locks: Arc::new(DashMap::new()),
        }
    }

    /// Derives (or re-derives) the snapshot for one product on one date.
    ///
    /// Opening figures come from the latest snapshot before `date` (zero
    /// when none exists); per-type totals are summed from the day's
    /// ledger entries; closing follows from the balance identity. The
    /// result is upserted on the (product, date) key. With an unchanged
    /// ledger this reproduces the same numbers exactly.
    #[instrument(skip(self, ctx), fields(tenant = %ctx.tenant_code()))]
    pub async fn calculate_daily_balance(
        &self,
        ctx: &TenantContext,
        product_id: Uuid,
        date: NaiveDate,
    ) -> Result<daily_balance::Model, ServiceError> {
        ProductEntity::find_by_id(product_id)
            .one(ctx.db())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let lock = self
            .locks
            .entry((product_id, date))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let snapshot = self.derive_and_upsert(ctx, product_id, date).await?;

        self.event_sender
            .publish_best_effort(Event::DailyBalanceCalculated {
                product_id,
                balance_date: date,
                closing_quantity: snapshot.closing_quantity,
                closing_value: snapshot.closing_value,
            })
            .await;

        Ok(snapshot)
    }

    /// Derives snapshots for every product on one date.
    #[instrument(skip(self, ctx), fields(tenant = %ctx.tenant_code()))]
    pub async fn calculate_for_all_products(
        &self,
        ctx: &TenantContext,
        date: NaiveDate,
    ) -> Result<Vec<daily_balance::Model>, ServiceError> {
        let products = ProductEntity::find()
            .all(ctx.db())
            .await
            .map_err(ServiceError::db_error)?;

        let mut snapshots = Vec::with_capacity(products.len());
        for product in products {
            snapshots.push(self.calculate_daily_balance(ctx, product.id, date).await?);
        }

        Ok(snapshots)
    }

    /// Derives snapshots for one product across a date range, carrying
    /// each day's closing into the next day's opening.
    #[instrument(skip(self, ctx), fields(tenant = %ctx.tenant_code()))]
    pub async fn calculate_range(
        &self,
        ctx: &TenantContext,
        product_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<daily_balance::Model>, ServiceError> {
        self.check_range(from, to)?;

        let mut snapshots = Vec::new();
        let mut date = from;
        while date <= to {
            snapshots.push(self.calculate_daily_balance(ctx, product_id, date).await?);
            date = date + Duration::days(1);
        }

        Ok(snapshots)
    }

    /// The consistency-repair tool: recomputes every product over the
    /// range, day by day.
    ///
    /// Required whenever historical movements were inserted out of order
    /// or corrected after snapshots were taken. Day-granular: a failure
    /// on one product/date is recorded in the report and the run carries
    /// on, so re-running only has to redo what actually failed. Safe to
    /// re-run arbitrarily.
    #[instrument(skip(self, ctx), fields(tenant = %ctx.tenant_code()))]
    pub async fn recalculate_balances(
        &self,
        ctx: &TenantContext,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<RecalculationReport, ServiceError> {
        self.check_range(from, to)?;

        let products = ProductEntity::find()
            .all(ctx.db())
            .await
            .map_err(ServiceError::db_error)?;

        let mut report = RecalculationReport {
            from,
            to,
            days_processed: 0,
            snapshots_written: 0,
            failures: Vec::new(),
        };

        let mut date = from;
        while date <= to {
            for product in &products {
                match self.calculate_daily_balance(ctx, product.id, date).await {
                    Ok(_) => report.snapshots_written += 1,
                    Err(e) => {
                        warn!(
                            product_id = %product.id,
                            %date,
                            error = %e,
                            "Snapshot recomputation failed; continuing with remaining keys"
                        );
                        report.failures.push(RecalculationFailure {
                            product_id: product.id,
                            date,
                            error: e.to_string(),
                        });
                    }
                }
            }
            report.days_processed += 1;
            date = date + Duration::days(1);
        }

        info!(
            days = report.days_processed,
            written = report.snapshots_written,
            failed = report.failures.len(),
            "Balance recalculation finished"
        );

        self.event_sender
            .publish_best_effort(Event::BalancesRecalculated {
                from,
                to,
                products_processed: report.snapshots_written,
                failures: report.failures.len() as u64,
            })
            .await;

        Ok(report)
    }

    /// Fetches the stored snapshot for a key, if any.
    #[instrument(skip(self, ctx))]
    pub async fn get_snapshot(
        &self,
        ctx: &TenantContext,
        product_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<daily_balance::Model>, ServiceError> {
        DailyBalanceEntity::find()
            .filter(daily_balance::Column::ProductId.eq(product_id))
            .filter(daily_balance::Column::BalanceDate.eq(date))
            .one(ctx.db())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Latest stored snapshot at or before `date`.
    pub(crate) async fn latest_snapshot_up_to(
        ctx: &TenantContext,
        product_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<daily_balance::Model>, ServiceError> {
        DailyBalanceEntity::find()
            .filter(daily_balance::Column::ProductId.eq(product_id))
            .filter(daily_balance::Column::BalanceDate.lte(date))
            .order_by_desc(daily_balance::Column::BalanceDate)
            .one(ctx.db())
            .await
            .map_err(ServiceError::db_error)
    }

    fn check_range(&self, from: NaiveDate, to: NaiveDate) -> Result<(), ServiceError> {
        if from > to {
            return Err(ServiceError::ValidationError(format!(
                "Range start {} is after range end {}",
                from, to
            )));
        }
        let days = (to - from).num_days() + 1;
        if days > self.recalc_max_days {
            return Err(ServiceError::ValidationError(format!(
                "Range of {} days exceeds the {}-day ceiling",
                days, self.recalc_max_days
            )));
        }
        Ok(())
    }

    async fn derive_and_upsert(
        &self,
        ctx: &TenantContext,
        product_id: Uuid,
        date: NaiveDate,
    ) -> Result<daily_balance::Model, ServiceError> {
        // Opening = latest prior closing; zero on the first tracked day.
        let prior = DailyBalanceEntity::find()
            .filter(daily_balance::Column::ProductId.eq(product_id))
            .filter(daily_balance::Column::BalanceDate.lt(date))
            .order_by_desc(daily_balance::Column::BalanceDate)
            .one(ctx.db())
            .await
            .map_err(ServiceError::db_error)?;

        let (opening_quantity, opening_value) = prior
            .map(|s| (s.closing_quantity, s.closing_value))
            .unwrap_or((0, Decimal::ZERO));

        let (start, end) = day_bounds(date);
        let entries = InventoryMovementEntity::find()
            .filter(inventory_movement::Column::ProductId.eq(product_id))
            .filter(inventory_movement::Column::MovedAt.gte(start))
            .filter(inventory_movement::Column::MovedAt.lt(end))
            .all(ctx.db())
            .await
            .map_err(ServiceError::db_error)?;

        let mut added_quantity = 0;
        let mut added_value = Decimal::ZERO;
        let mut sold_quantity = 0;
        let mut sold_value = Decimal::ZERO;
        let mut returned_quantity = 0;
        let mut returned_value = Decimal::ZERO;
        let mut transferred_in_quantity = 0;
        let mut transferred_in_value = Decimal::ZERO;
        let mut transferred_out_quantity = 0;
        let mut transferred_out_value = Decimal::ZERO;

        for entry in &entries {
            match entry.movement_type() {
                Some(MovementType::Addition) | Some(MovementType::Adjustment) => {
                    added_quantity += entry.quantity;
                    added_value += entry.total_amount;
                }
                Some(MovementType::Sale) => {
                    sold_quantity += entry.quantity;
                    sold_value += entry.total_amount;
                }
                Some(MovementType::Return) => {
                    returned_quantity += entry.quantity;
                    returned_value += entry.total_amount;
                }
                Some(MovementType::TransferIn) => {
                    transferred_in_quantity += entry.quantity;
                    transferred_in_value += entry.total_amount;
                }
                Some(MovementType::TransferOut) => {
                    transferred_out_quantity += entry.quantity;
                    transferred_out_value += entry.total_amount;
                }
                None => {
                    // The ledger never stores unknown types; an unreadable
                    // row means the store itself is damaged.
                    return Err(ServiceError::InternalError(format!(
                        "Ledger entry {} has unknown movement type '{}'",
                        entry.id, entry.movement_type
                    )));
                }
            }
        }

        let closing_quantity = opening_quantity + added_quantity + returned_quantity
            + transferred_in_quantity
            - sold_quantity
            - transferred_out_quantity;
        let closing_value = opening_value + added_value + returned_value + transferred_in_value
            - sold_value
            - transferred_out_value;

        let row = daily_balance::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            balance_date: Set(date),
            opening_quantity: Set(opening_quantity),
            opening_value: Set(opening_value),
            added_quantity: Set(added_quantity),
            added_value: Set(added_value),
            sold_quantity: Set(sold_quantity),
            sold_value: Set(sold_value),
            returned_quantity: Set(returned_quantity),
            returned_value: Set(returned_value),
            transferred_in_quantity: Set(transferred_in_quantity),
            transferred_in_value: Set(transferred_in_value),
            transferred_out_quantity: Set(transferred_out_quantity),
            transferred_out_value: Set(transferred_out_value),
            closing_quantity: Set(closing_quantity),
            closing_value: Set(closing_value),
            computed_at: Set(Utc::now()),
        };

        // Self-contained upsert on the snapshot key: a concurrent writer
        // that loses the race still leaves a fully re-derived row behind.
        DailyBalanceEntity::insert(row)
            .on_conflict(
                OnConflict::columns([
                    daily_balance::Column::ProductId,
                    daily_balance::Column::BalanceDate,
                ])
                .update_columns([
                    daily_balance::Column::OpeningQuantity,
                    daily_balance::Column::OpeningValue,
                    daily_balance::Column::AddedQuantity,
                    daily_balance::Column::AddedValue,
                    daily_balance::Column::SoldQuantity,
                    daily_balance::Column::SoldValue,
                    daily_balance::Column::ReturnedQuantity,
                    daily_balance::Column::ReturnedValue,
                    daily_balance::Column::TransferredInQuantity,
                    daily_balance::Column::TransferredInValue,
                    daily_balance::Column::TransferredOutQuantity,
                    daily_balance::Column::TransferredOutValue,
                    daily_balance::Column::ClosingQuantity,
                    daily_balance::Column::ClosingValue,
                    daily_balance::Column::ComputedAt,
                ])
                .to_owned(),
            )
            .exec_without_returning(ctx.db())
            .await
            .map_err(ServiceError::db_error)?;

        self.get_snapshot(ctx, product_id, date)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "Snapshot for product {} on {} missing after upsert",
                    product_id, date
                ))
            })
    }
}
