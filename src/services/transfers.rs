use chrono::Utc;
use lazy_static::lazy_static;
use prometheus::IntCounter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::entities::inventory_movement::{self, MovementType};
use crate::entities::product::{self, Entity as ProductEntity};
use crate::entities::transfer::{self, Entity as TransferEntity, TransferStatus, TransferType};
use crate::entities::transfer_item::{self, Entity as TransferItemEntity};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::movements::MovementService;
use crate::services::stock::StockService;
use crate::tenant::TenantContext;

lazy_static! {
    static ref TRANSFERS_CREATED: IntCounter = IntCounter::new(
        "stock_transfers_created_total",
        "Total number of stock transfers created"
    )
    .expect("metric can be created");
    static ref TRANSFERS_COMPLETED: IntCounter = IntCounter::new(
        "stock_transfers_completed_total",
        "Total number of stock transfers completed"
    )
    .expect("metric can be created");
    static ref TRANSFER_FAILURES: IntCounter = IntCounter::new(
        "stock_transfer_failures_total",
        "Total number of failed stock transfer operations"
    )
    .expect("metric can be created");
}

/// A physical location inside a tenant: branch, optionally narrowed to a
/// counter and a storage box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Location {
    #[validate(length(min = 1, message = "Branch code cannot be empty"))]
    pub branch_code: String,
    pub counter_code: Option<String>,
    pub box_code: Option<String>,
}

impl Location {
    pub fn branch(branch_code: impl Into<String>) -> Self {
        Self {
            branch_code: branch_code.into(),
            counter_code: None,
            box_code: None,
        }
    }

    pub fn counter(branch_code: impl Into<String>, counter_code: impl Into<String>) -> Self {
        Self {
            branch_code: branch_code.into(),
            counter_code: Some(counter_code.into()),
            box_code: None,
        }
    }
}

/// One line of a transfer request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewTransferItem {
    pub product_id: Option<Uuid>,

    #[validate(length(min = 1, message = "Tag code cannot be empty"))]
    pub tag_code: Option<String>,

    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

/// Input for `create_transfer`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewTransfer {
    #[validate]
    pub source: Location,

    #[validate]
    pub destination: Location,

    #[validate(length(min = 1, message = "Requester cannot be empty"))]
    pub requested_by: String,

    #[validate(length(min = 1, message = "Transfer needs at least one item"))]
    pub items: Vec<NewTransferItem>,

    pub remarks: Option<String>,
}

/// A transfer header together with its lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferDetails {
    pub transfer: transfer::Model,
    pub items: Vec<transfer_item::Model>,
}

/// Drives the transfer lifecycle:
/// `Pending → {InTransit, Rejected, Cancelled}`,
/// `InTransit → {Completed, Cancelled}`.
///
/// Creation only reserves intent; completion is the single transition
/// that touches inventory, and it does so in one database transaction.
#[derive(Clone)]
pub struct TransferService {
    event_sender: EventSender,
    stock: StockService,
    bulk_cap: usize,
}

impl TransferService {
    pub fn new(event_sender: EventSender, stock: StockService, bulk_cap: usize) -> Self {
        Self {
            event_sender,
            stock,
            bulk_cap,
        }
    }

    /// Creates a transfer in Pending state.
    ///
    /// Rejects a source equal to the destination, items already held by
    /// another open transfer (Conflict), and quantities above what the
    /// stock resolver reports available at the source at validation time.
    /// No stock moves here.
    #[instrument(skip(self, ctx, input), fields(tenant = %ctx.tenant_code()))]
    pub async fn create_transfer(
        &self,
        ctx: &TenantContext,
        input: NewTransfer,
    ) -> Result<TransferDetails, ServiceError> {
        let details = self.create_transfer_inner(ctx, input).await.map_err(|e| {
            TRANSFER_FAILURES.inc();
            e
        })?;

        TRANSFERS_CREATED.inc();
        info!(
            transfer_id = %details.transfer.id,
            transfer_number = %details.transfer.transfer_number,
            items = details.items.len(),
            "Created stock transfer"
        );

        self.event_sender
            .publish_best_effort(Event::TransferCreated {
                transfer_id: details.transfer.id,
                transfer_number: details.transfer.transfer_number.clone(),
            })
            .await;

        Ok(details)
    }

    /// Pending → InTransit.
    #[instrument(skip(self, ctx), fields(tenant = %ctx.tenant_code()))]
    pub async fn approve_transfer(
        &self,
        ctx: &TenantContext,
        transfer_id: Uuid,
        approved_by: &str,
    ) -> Result<transfer::Model, ServiceError> {
        let (existing, _) = self
            .load_for_transition(ctx, transfer_id, TransferStatus::InTransit)
            .await?;

        let now = Utc::now();
        let mut active: transfer::ActiveModel = existing.into();
        active.status = Set(TransferStatus::InTransit.as_str().to_string());
        active.approved_by = Set(Some(approved_by.to_string()));
        active.approved_at = Set(Some(now));
        active.updated_at = Set(now);

        let updated = active.update(ctx.db()).await.map_err(ServiceError::db_error)?;

        info!(transfer_id = %transfer_id, "Approved stock transfer");
        self.event_sender
            .publish_best_effort(Event::TransferApproved { transfer_id })
            .await;

        Ok(updated)
    }

    /// Pending → Rejected. Releases the reservation; no stock moves.
    #[instrument(skip(self, ctx), fields(tenant = %ctx.tenant_code()))]
    pub async fn reject_transfer(
        &self,
        ctx: &TenantContext,
        transfer_id: Uuid,
        rejected_by: &str,
        reason: Option<String>,
    ) -> Result<transfer::Model, ServiceError> {
        let (existing, current) = self
            .load_for_transition(ctx, transfer_id, TransferStatus::Rejected)
            .await?;

        let now = Utc::now();
        let mut active: transfer::ActiveModel = existing.into();
        active.status = Set(TransferStatus::Rejected.as_str().to_string());
        active.rejected_by = Set(Some(rejected_by.to_string()));
        active.rejected_at = Set(Some(now));
        active.reason = Set(reason.clone());
        active.updated_at = Set(now);

        let updated = active.update(ctx.db()).await.map_err(ServiceError::db_error)?;

        info!(transfer_id = %transfer_id, from = current.as_str(), "Rejected stock transfer");
        self.event_sender
            .publish_best_effort(Event::TransferRejected {
                transfer_id,
                reason,
            })
            .await;

        Ok(updated)
    }

    /// InTransit → Completed. The only transition that mutates inventory.
    ///
    /// One transaction emits the TransferOut entry at the source, the
    /// matching TransferIn entry at the destination (equal quantity,
    /// carried-over value), moves each item's product to the destination
    /// location, and flips the status. On any failure the whole unit
    /// rolls back and the transfer stays InTransit, so the call is
    /// safely retryable.
    #[instrument(skip(self, ctx), fields(tenant = %ctx.tenant_code()))]
    pub async fn complete_transfer(
        &self,
        ctx: &TenantContext,
        transfer_id: Uuid,
        completed_by: &str,
    ) -> Result<transfer::Model, ServiceError> {
        let (existing, _) = self
            .load_for_transition(ctx, transfer_id, TransferStatus::Completed)
            .await?;

        let completed_by = completed_by.to_string();
        let updated = ctx
            .db()
            .transaction::<_, transfer::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let items = TransferItemEntity::find()
                        .filter(transfer_item::Column::TransferId.eq(existing.id))
                        .all(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    let now = Utc::now();

                    for item in &items {
                        let product = ProductEntity::find_by_id(item.product_id)
                            .one(txn)
                            .await
                            .map_err(ServiceError::db_error)?
                            .ok_or_else(|| {
                                ServiceError::NotFound(format!(
                                    "Product {} not found",
                                    item.product_id
                                ))
                            })?;

                        let total =
                            item.unit_price * rust_decimal::Decimal::from(item.quantity);

                        // Paired ledger entries: out at the source...
                        let out_entry = inventory_movement::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            product_id: Set(item.product_id),
                            tag_code: Set(item.tag_code.clone()),
                            movement_type: Set(MovementType::TransferOut.as_str().to_string()),
                            quantity: Set(item.quantity),
                            unit_price: Set(item.unit_price),
                            total_amount: Set(total),
                            branch_code: Set(existing.source_branch.clone()),
                            counter_code: Set(existing.source_counter.clone()),
                            category: Set(product.category.clone()),
                            reference_number: Set(Some(existing.transfer_number.clone())),
                            reference_type: Set(Some("stock_transfer".to_string())),
                            remarks: Set(None),
                            moved_at: Set(now),
                            ..Default::default()
                        };
                        out_entry.insert(txn).await.map_err(ServiceError::db_error)?;

                        // ...and the matching entry in at the destination.
                        let in_entry = inventory_movement::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            product_id: Set(item.product_id),
                            tag_code: Set(item.tag_code.clone()),
                            movement_type: Set(MovementType::TransferIn.as_str().to_string()),
                            quantity: Set(item.quantity),
                            unit_price: Set(item.unit_price),
                            total_amount: Set(total),
                            branch_code: Set(existing.destination_branch.clone()),
                            counter_code: Set(existing.destination_counter.clone()),
                            category: Set(product.category.clone()),
                            reference_number: Set(Some(existing.transfer_number.clone())),
                            reference_type: Set(Some("stock_transfer".to_string())),
                            remarks: Set(None),
                            moved_at: Set(now),
                            ..Default::default()
                        };
                        in_entry.insert(txn).await.map_err(ServiceError::db_error)?;

                        let mut product_active: product::ActiveModel = product.into();
                        product_active.branch_code = Set(existing.destination_branch.clone());
                        product_active.counter_code = Set(existing.destination_counter.clone());
                        product_active.box_code = Set(existing.destination_box.clone());
                        product_active.updated_at = Set(now);
                        product_active
                            .update(txn)
                            .await
                            .map_err(ServiceError::db_error)?;
                    }

                    let mut active: transfer::ActiveModel = existing.into();
                    active.status = Set(TransferStatus::Completed.as_str().to_string());
                    active.completed_by = Set(Some(completed_by));
                    active.completed_at = Set(Some(now));
                    active.updated_at = Set(now);

                    active.update(txn).await.map_err(ServiceError::db_error)
                })
            })
            .await
            .map_err(|e| {
                TRANSFER_FAILURES.inc();
                ServiceError::from(e)
            })?;

        TRANSFERS_COMPLETED.inc();
        info!(transfer_id = %transfer_id, "Completed stock transfer");

        self.event_sender
            .publish_best_effort(Event::TransferCompleted {
                transfer_id,
                completed_at: updated.completed_at.unwrap_or_else(Utc::now),
            })
            .await;

        Ok(updated)
    }

    /// Pending or InTransit → Cancelled. Releases the reservation and
    /// records no inventory movement.
    #[instrument(skip(self, ctx), fields(tenant = %ctx.tenant_code()))]
    pub async fn cancel_transfer(
        &self,
        ctx: &TenantContext,
        transfer_id: Uuid,
        cancelled_by: &str,
        reason: Option<String>,
    ) -> Result<transfer::Model, ServiceError> {
        let (existing, current) = self
            .load_for_transition(ctx, transfer_id, TransferStatus::Cancelled)
            .await?;

        let now = Utc::now();
        let mut active: transfer::ActiveModel = existing.into();
        active.status = Set(TransferStatus::Cancelled.as_str().to_string());
        active.cancelled_by = Set(Some(cancelled_by.to_string()));
        active.cancelled_at = Set(Some(now));
        active.reason = Set(reason);
        active.updated_at = Set(now);

        let updated = active.update(ctx.db()).await.map_err(ServiceError::db_error)?;

        info!(transfer_id = %transfer_id, from = current.as_str(), "Cancelled stock transfer");
        self.event_sender
            .publish_best_effort(Event::TransferCancelled { transfer_id })
            .await;

        Ok(updated)
    }

    /// Fetches a transfer with its items.
    #[instrument(skip(self, ctx))]
    pub async fn get_transfer(
        &self,
        ctx: &TenantContext,
        transfer_id: Uuid,
    ) -> Result<TransferDetails, ServiceError> {
        let transfer = TransferEntity::find_by_id(transfer_id)
            .one(ctx.db())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Transfer {} not found", transfer_id)))?;

        let items = TransferItemEntity::find()
            .filter(transfer_item::Column::TransferId.eq(transfer_id))
            .all(ctx.db())
            .await
            .map_err(ServiceError::db_error)?;

        Ok(TransferDetails { transfer, items })
    }

    /// Newest-first listing of transfers in one status.
    #[instrument(skip(self, ctx))]
    pub async fn list_by_status(
        &self,
        ctx: &TenantContext,
        status: TransferStatus,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<transfer::Model>, u64), ServiceError> {
        Self::check_page(page, limit)?;

        let paginator = TransferEntity::find()
            .filter(transfer::Column::Status.eq(status.as_str()))
            .order_by_desc(transfer::Column::CreatedAt)
            .paginate(ctx.db(), limit);

        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let transfers = paginator
            .fetch_page(page - 1)
            .await
            .map_err(ServiceError::db_error)?;

        Ok((transfers, total))
    }

    /// Newest-first listing of transfers touching a branch on either end.
    #[instrument(skip(self, ctx))]
    pub async fn list_by_branch(
        &self,
        ctx: &TenantContext,
        branch_code: &str,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<transfer::Model>, u64), ServiceError> {
        Self::check_page(page, limit)?;

        let paginator = TransferEntity::find()
            .filter(
                Condition::any()
                    .add(transfer::Column::SourceBranch.eq(branch_code))
                    .add(transfer::Column::DestinationBranch.eq(branch_code)),
            )
            .order_by_desc(transfer::Column::CreatedAt)
            .paginate(ctx.db(), limit);

        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let transfers = paginator
            .fetch_page(page - 1)
            .await
            .map_err(ServiceError::db_error)?;

        Ok((transfers, total))
    }

    async fn create_transfer_inner(
        &self,
        ctx: &TenantContext,
        input: NewTransfer,
    ) -> Result<TransferDetails, ServiceError> {
        input.validate()?;

        if input.source == input.destination {
            return Err(ServiceError::ValidationError(
                "Source and destination locations are the same".to_string(),
            ));
        }
        if input.items.len() > self.bulk_cap {
            return Err(ServiceError::ValidationError(format!(
                "Transfer of {} items exceeds the {}-item ceiling",
                input.items.len(),
                self.bulk_cap
            )));
        }

        // Resolve and vet every line before anything is written.
        let mut resolved = Vec::with_capacity(input.items.len());
        for item in &input.items {
            item.validate()?;

            let product =
                MovementService::resolve_product(ctx, item.product_id, item.tag_code.as_deref())
                    .await?;

            self.check_reservation(ctx, product.id, item.tag_code.as_deref())
                .await?;

            let available = self
                .stock
                .branch_position(ctx, product.id, &input.source.branch_code)
                .await?;
            if available.quantity < item.quantity {
                return Err(ServiceError::InsufficientStock(format!(
                    "Product {} has {} on hand at branch {}, requested {}",
                    product.id, available.quantity, input.source.branch_code, item.quantity
                )));
            }

            resolved.push((product, item.clone()));
        }

        let transfer_type = derive_transfer_type(&input.source, &input.destination);
        let transfer_id = Uuid::new_v4();
        let transfer_number = format!(
            "TRF-{}",
            transfer_id.simple().to_string()[..8].to_uppercase()
        );
        let now = Utc::now();

        let header = transfer::ActiveModel {
            id: Set(transfer_id),
            transfer_number: Set(transfer_number),
            transfer_type: Set(transfer_type.as_str().to_string()),
            status: Set(TransferStatus::Pending.as_str().to_string()),
            source_branch: Set(input.source.branch_code.clone()),
            source_counter: Set(input.source.counter_code.clone()),
            source_box: Set(input.source.box_code.clone()),
            destination_branch: Set(input.destination.branch_code.clone()),
            destination_counter: Set(input.destination.counter_code.clone()),
            destination_box: Set(input.destination.box_code.clone()),
            requested_by: Set(input.requested_by.clone()),
            approved_by: Set(None),
            completed_by: Set(None),
            cancelled_by: Set(None),
            rejected_by: Set(None),
            reason: Set(input.remarks.clone()),
            created_at: Set(now),
            approved_at: Set(None),
            completed_at: Set(None),
            cancelled_at: Set(None),
            rejected_at: Set(None),
            updated_at: Set(now),
        };

        let details = ctx
            .db()
            .transaction::<_, TransferDetails, ServiceError>(move |txn| {
                Box::pin(async move {
                    let transfer = header.insert(txn).await.map_err(ServiceError::db_error)?;

                    let mut items = Vec::with_capacity(resolved.len());
                    for (product, item) in resolved {
                        let line = transfer_item::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            transfer_id: Set(transfer.id),
                            product_id: Set(product.id),
                            tag_code: Set(item.tag_code),
                            quantity: Set(item.quantity),
                            unit_price: Set(product.unit_price),
                        };
                        items.push(line.insert(txn).await.map_err(ServiceError::db_error)?);
                    }

                    Ok(TransferDetails { transfer, items })
                })
            })
            .await
            .map_err(ServiceError::from)?;

        Ok(details)
    }

    /// Conflict when the product (or the exact tag) is already held by an
    /// open transfer. An untagged line on either side reserves the whole
    /// product.
    async fn check_reservation(
        &self,
        ctx: &TenantContext,
        product_id: Uuid,
        tag_code: Option<&str>,
    ) -> Result<(), ServiceError> {
        let open_items = TransferItemEntity::find()
            .inner_join(TransferEntity)
            .filter(transfer_item::Column::ProductId.eq(product_id))
            .filter(
                transfer::Column::Status.is_in([
                    TransferStatus::Pending.as_str(),
                    TransferStatus::InTransit.as_str(),
                ]),
            )
            .all(ctx.db())
            .await
            .map_err(ServiceError::db_error)?;

        for open in &open_items {
            let blocked = match (tag_code, open.tag_code.as_deref()) {
                (Some(incoming), Some(held)) => incoming == held,
                _ => true,
            };
            if blocked {
                warn!(
                    product_id = %product_id,
                    open_transfer_id = %open.transfer_id,
                    "Item already reserved by an open transfer"
                );
                return Err(ServiceError::Conflict(format!(
                    "Product {} is already part of open transfer {}",
                    product_id, open.transfer_id
                )));
            }
        }

        Ok(())
    }

    /// Loads a transfer and checks the requested transition against the
    /// state table. Terminal states and undocumented edges come back as
    /// InvalidOperation with both states named.
    async fn load_for_transition(
        &self,
        ctx: &TenantContext,
        transfer_id: Uuid,
        next: TransferStatus,
    ) -> Result<(transfer::Model, TransferStatus), ServiceError> {
        let existing = TransferEntity::find_by_id(transfer_id)
            .one(ctx.db())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Transfer {} not found", transfer_id)))?;

        let current = existing.status().ok_or_else(|| {
            ServiceError::InternalError(format!(
                "Transfer {} has unknown status '{}'",
                transfer_id, existing.status
            ))
        })?;

        if !current.can_transition_to(next) {
            TRANSFER_FAILURES.inc();
            return Err(ServiceError::InvalidOperation(format!(
                "Transfer {} cannot move from {} to {}",
                transfer_id,
                current.as_str(),
                next.as_str()
            )));
        }

        Ok((existing, current))
    }

    fn check_page(page: u64, limit: u64) -> Result<(), ServiceError> {
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
        Ok(())
    }
}

/// The relocation kind falls out of which location parts differ.
fn derive_transfer_type(source: &Location, destination: &Location) -> TransferType {
    if source.branch_code != destination.branch_code {
        TransferType::Branch
    } else {
        let counter_changed = source.counter_code != destination.counter_code;
        let box_changed = source.box_code != destination.box_code;
        match (counter_changed, box_changed) {
            (true, true) => TransferType::Mixed,
            (true, false) => TransferType::Counter,
            _ => TransferType::Box,
        }
    }
}
