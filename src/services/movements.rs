use chrono::{DateTime, NaiveDate, Utc};
use lazy_static::lazy_static;
use prometheus::IntCounter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::entities::inventory_movement::{
    self, Entity as InventoryMovementEntity, MovementType,
};
use crate::entities::product::{self, Entity as ProductEntity};
use crate::entities::tag_assignment::{self, Entity as TagAssignmentEntity};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::day_bounds;
use crate::tenant::TenantContext;

lazy_static! {
    static ref MOVEMENTS_RECORDED: IntCounter = IntCounter::new(
        "inventory_movements_recorded_total",
        "Total number of ledger entries recorded"
    )
    .expect("metric can be created");
    static ref MOVEMENT_FAILURES: IntCounter = IntCounter::new(
        "inventory_movement_failures_total",
        "Total number of rejected ledger entries"
    )
    .expect("metric can be created");
}

/// Input for one ledger entry. Either `product_id` or `tag_code` must be
/// set; price, total and timestamp fall back to catalog/derived values.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewMovement {
    pub product_id: Option<Uuid>,

    #[validate(length(min = 1, message = "Tag code cannot be empty"))]
    pub tag_code: Option<String>,

    pub movement_type: MovementType,

    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,

    pub unit_price: Option<Decimal>,

    pub total_amount: Option<Decimal>,

    pub branch_code: Option<String>,

    pub counter_code: Option<String>,

    pub category: Option<String>,

    pub reference_number: Option<String>,

    pub reference_type: Option<String>,

    pub remarks: Option<String>,

    pub moved_at: Option<DateTime<Utc>>,
}

/// Per-entry failure inside a bulk record call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkRecordFailure {
    pub index: usize,
    pub error: String,
}

/// Outcome of `record_movements`: what went in, what was rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkRecordOutcome {
    pub recorded: Vec<inventory_movement::Model>,
    pub failures: Vec<BulkRecordFailure>,
}

/// Filter for ledger listing queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MovementFilter {
    pub product_id: Option<Uuid>,
    pub branch_code: Option<String>,
    pub counter_code: Option<String>,
    pub category: Option<String>,
    pub movement_type: Option<MovementType>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Appends immutable entries to the per-tenant movement ledger.
#[derive(Clone)]
pub struct MovementService {
    event_sender: EventSender,
    bulk_cap: usize,
}

impl MovementService {
    pub fn new(event_sender: EventSender, bulk_cap: usize) -> Self {
        Self {
            event_sender,
            bulk_cap,
        }
    }

    /// Records a single movement entry.
    ///
    /// Validates the input, resolves the product (directly or through the
    /// tag registry), fills defaults and inserts the row. The entry is
    /// visible to balance and stock queries as soon as this returns.
    #[instrument(skip(self, ctx, input), fields(tenant = %ctx.tenant_code()))]
    pub async fn record_movement(
        &self,
        ctx: &TenantContext,
        input: NewMovement,
    ) -> Result<inventory_movement::Model, ServiceError> {
        let recorded = self.insert_entry(ctx, input).await.map_err(|e| {
            MOVEMENT_FAILURES.inc();
            e
        })?;

        MOVEMENTS_RECORDED.inc();
        info!(
            movement_id = %recorded.id,
            product_id = %recorded.product_id,
            movement_type = %recorded.movement_type,
            quantity = recorded.quantity,
            "Recorded inventory movement"
        );

        self.event_sender
            .publish_best_effort(Event::MovementRecorded {
                movement_id: recorded.id,
                product_id: recorded.product_id,
                movement_type: recorded.movement_type.clone(),
                quantity: recorded.quantity,
                total_amount: recorded.total_amount,
                branch_code: recorded.branch_code.clone(),
            })
            .await;

        Ok(recorded)
    }

    /// Records a batch of movements with continue-on-error semantics.
    ///
    /// Each failing entry is reported by index while the rest are still
    /// recorded; a bad bookkeeping row must never take the batch down
    /// with it. Batches above the configured ceiling are rejected whole.
    #[instrument(skip(self, ctx, inputs), fields(tenant = %ctx.tenant_code(), batch = inputs.len()))]
    pub async fn record_movements(
        &self,
        ctx: &TenantContext,
        inputs: Vec<NewMovement>,
    ) -> Result<BulkRecordOutcome, ServiceError> {
        if inputs.len() > self.bulk_cap {
            return Err(ServiceError::ValidationError(format!(
                "Batch of {} exceeds the {}-item ceiling",
                inputs.len(),
                self.bulk_cap
            )));
        }

        let mut outcome = BulkRecordOutcome {
            recorded: Vec::with_capacity(inputs.len()),
            failures: Vec::new(),
        };

        for (index, input) in inputs.into_iter().enumerate() {
            match self.record_movement(ctx, input).await {
                Ok(entry) => outcome.recorded.push(entry),
                Err(e) => {
                    warn!(index, error = %e, "Bulk entry rejected; continuing");
                    outcome.failures.push(BulkRecordFailure {
                        index,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            recorded = outcome.recorded.len(),
            failed = outcome.failures.len(),
            "Bulk movement record finished"
        );

        Ok(outcome)
    }

    /// Records a movement as a secondary bookkeeping effect.
    ///
    /// The primary business event has already committed; a failure here is
    /// logged and swallowed so it cannot roll the primary back.
    #[instrument(skip(self, ctx, input), fields(tenant = %ctx.tenant_code()))]
    pub async fn record_movement_best_effort(&self, ctx: &TenantContext, input: NewMovement) {
        if let Err(e) = self.record_movement(ctx, input).await {
            warn!(error = %e, "Secondary bookkeeping movement failed; continuing");
        }
    }

    /// All entries for a product whose movement date falls on `date`.
    #[instrument(skip(self, ctx))]
    pub async fn movements_for_product_on(
        &self,
        ctx: &TenantContext,
        product_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<inventory_movement::Model>, ServiceError> {
        let (start, end) = day_bounds(date);

        let entries = InventoryMovementEntity::find()
            .filter(inventory_movement::Column::ProductId.eq(product_id))
            .filter(inventory_movement::Column::MovedAt.gte(start))
            .filter(inventory_movement::Column::MovedAt.lt(end))
            .order_by_asc(inventory_movement::Column::MovedAt)
            .all(ctx.db())
            .await
            .map_err(ServiceError::db_error)?;

        Ok(entries)
    }

    /// Newest-first ledger listing with pagination.
    #[instrument(skip(self, ctx, filter))]
    pub async fn list_movements(
        &self,
        ctx: &TenantContext,
        filter: MovementFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<inventory_movement::Model>, u64), ServiceError> {
        if page == 0 {
            return Err(ServiceError::ValidationError(
                "Page number must be greater than 0".to_string(),
            ));
        }
        if limit == 0 || limit > 1000 {
            return Err(ServiceError::ValidationError(
                "Limit must be between 1 and 1000".to_string(),
            ));
        }

        let mut query = InventoryMovementEntity::find();

        if let Some(product_id) = filter.product_id {
            query = query.filter(inventory_movement::Column::ProductId.eq(product_id));
        }
        if let Some(branch) = filter.branch_code {
            query = query.filter(inventory_movement::Column::BranchCode.eq(branch));
        }
        if let Some(counter) = filter.counter_code {
            query = query.filter(inventory_movement::Column::CounterCode.eq(counter));
        }
        if let Some(category) = filter.category {
            query = query.filter(inventory_movement::Column::Category.eq(category));
        }
        if let Some(movement_type) = filter.movement_type {
            query = query.filter(inventory_movement::Column::MovementType.eq(movement_type.as_str()));
        }
        if let Some(from) = filter.from {
            query = query.filter(inventory_movement::Column::MovedAt.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(inventory_movement::Column::MovedAt.lt(to));
        }

        query = query.order_by_desc(inventory_movement::Column::MovedAt);

        let paginator = query.paginate(ctx.db(), limit);
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let entries = paginator
            .fetch_page(page - 1)
            .await
            .map_err(ServiceError::db_error)?;

        Ok((entries, total))
    }

    /// Resolves the product a movement refers to, by id or active tag.
    pub(crate) async fn resolve_product(
        ctx: &TenantContext,
        product_id: Option<Uuid>,
        tag_code: Option<&str>,
    ) -> Result<product::Model, ServiceError> {
        let product_id = match (product_id, tag_code) {
            (Some(id), _) => id,
            (None, Some(tag)) => {
                let assignment = TagAssignmentEntity::find()
                    .filter(tag_assignment::Column::TagCode.eq(tag))
                    .filter(tag_assignment::Column::Active.eq(true))
                    .one(ctx.db())
                    .await
                    .map_err(ServiceError::db_error)?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("No active assignment for tag {}", tag))
                    })?;
                assignment.product_id
            }
            (None, None) => {
                return Err(ServiceError::ValidationError(
                    "Either product_id or tag_code must be provided".to_string(),
                ))
            }
        };

        ProductEntity::find_by_id(product_id)
            .one(ctx.db())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    async fn insert_entry(
        &self,
        ctx: &TenantContext,
        input: NewMovement,
    ) -> Result<inventory_movement::Model, ServiceError> {
        input.validate()?;

        let product =
            Self::resolve_product(ctx, input.product_id, input.tag_code.as_deref()).await?;

        let unit_price = input.unit_price.unwrap_or(product.unit_price);
        let total_amount = input
            .total_amount
            .unwrap_or_else(|| unit_price * Decimal::from(input.quantity));
        let moved_at = input.moved_at.unwrap_or_else(Utc::now);

        let entry = inventory_movement::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product.id),
            tag_code: Set(input.tag_code),
            movement_type: Set(input.movement_type.as_str().to_string()),
            quantity: Set(input.quantity),
            unit_price: Set(unit_price),
            total_amount: Set(total_amount),
            branch_code: Set(input.branch_code.unwrap_or_else(|| product.branch_code.clone())),
            counter_code: Set(input.counter_code.or_else(|| product.counter_code.clone())),
            category: Set(input.category.or_else(|| product.category.clone())),
            reference_number: Set(input.reference_number),
            reference_type: Set(input.reference_type),
            remarks: Set(input.remarks),
            moved_at: Set(moved_at),
            ..Default::default()
        };

        entry.insert(ctx.db()).await.map_err(ServiceError::db_error)
    }
}
