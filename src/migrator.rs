use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_products_table::Migration),
            Box::new(m20240101_000002_create_tag_assignments_table::Migration),
            Box::new(m20240101_000003_create_inventory_movements_table::Migration),
            Box::new(m20240101_000004_create_daily_balances_table::Migration),
            Box::new(m20240101_000005_create_transfers_tables::Migration),
        ]
    }
}

// Migration implementations

mod m20240101_000001_create_products_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_products_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Products::Sku)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::Category).string().null())
                        .col(
                            ColumnDef::new(Products::UnitPrice)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Products::BranchCode).string().not_null())
                        .col(ColumnDef::new(Products::CounterCode).string().null())
                        .col(ColumnDef::new(Products::BoxCode).string().null())
                        .col(ColumnDef::new(Products::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Products::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_branch_code")
                        .table(Products::Table)
                        .col(Products::BranchCode)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_category")
                        .table(Products::Table)
                        .col(Products::Category)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Products {
        Table,
        Id,
        Sku,
        Name,
        Category,
        UnitPrice,
        BranchCode,
        CounterCode,
        BoxCode,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_tag_assignments_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_tag_assignments_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(TagAssignments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TagAssignments::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(TagAssignments::TagCode).string().not_null())
                        .col(ColumnDef::new(TagAssignments::ProductId).uuid().not_null())
                        .col(
                            ColumnDef::new(TagAssignments::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(TagAssignments::AssignedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_tag_assignments_tag_code")
                        .table(TagAssignments::Table)
                        .col(TagAssignments::TagCode)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_tag_assignments_product_id")
                        .table(TagAssignments::Table)
                        .col(TagAssignments::ProductId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(TagAssignments::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum TagAssignments {
        Table,
        Id,
        TagCode,
        ProductId,
        Active,
        AssignedAt,
    }
}

mod m20240101_000003_create_inventory_movements_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_inventory_movements_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(InventoryMovements::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryMovements::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryMovements::ProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryMovements::TagCode).string().null())
                        .col(
                            ColumnDef::new(InventoryMovements::MovementType)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryMovements::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryMovements::UnitPrice)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(InventoryMovements::TotalAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(InventoryMovements::BranchCode)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryMovements::CounterCode)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(InventoryMovements::Category).string().null())
                        .col(
                            ColumnDef::new(InventoryMovements::ReferenceNumber)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(InventoryMovements::ReferenceType)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(InventoryMovements::Remarks).string().null())
                        .col(
                            ColumnDef::new(InventoryMovements::MovedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryMovements::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // Query paths: by (product, date), by branch, by counter, by category
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_movements_product_moved_at")
                        .table(InventoryMovements::Table)
                        .col(InventoryMovements::ProductId)
                        .col(InventoryMovements::MovedAt)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_movements_branch_code")
                        .table(InventoryMovements::Table)
                        .col(InventoryMovements::BranchCode)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_movements_counter_code")
                        .table(InventoryMovements::Table)
                        .col(InventoryMovements::CounterCode)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_movements_category")
                        .table(InventoryMovements::Table)
                        .col(InventoryMovements::Category)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(InventoryMovements::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum InventoryMovements {
        Table,
        Id,
        ProductId,
        TagCode,
        MovementType,
        Quantity,
        UnitPrice,
        TotalAmount,
        BranchCode,
        CounterCode,
        Category,
        ReferenceNumber,
        ReferenceType,
        Remarks,
        MovedAt,
        CreatedAt,
    }
}

mod m20240101_000004_create_daily_balances_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_daily_balances_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(DailyBalances::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DailyBalances::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DailyBalances::ProductId).uuid().not_null())
                        .col(ColumnDef::new(DailyBalances::BalanceDate).date().not_null())
                        .col(
                            ColumnDef::new(DailyBalances::OpeningQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(DailyBalances::OpeningValue)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(DailyBalances::AddedQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(DailyBalances::AddedValue)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(DailyBalances::SoldQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(DailyBalances::SoldValue)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(DailyBalances::ReturnedQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(DailyBalances::ReturnedValue)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(DailyBalances::TransferredInQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(DailyBalances::TransferredInValue)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(DailyBalances::TransferredOutQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(DailyBalances::TransferredOutValue)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(DailyBalances::ClosingQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(DailyBalances::ClosingValue)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(DailyBalances::ComputedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // The snapshot key; upserts target this index.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uidx_daily_balances_product_date")
                        .table(DailyBalances::Table)
                        .col(DailyBalances::ProductId)
                        .col(DailyBalances::BalanceDate)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(DailyBalances::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum DailyBalances {
        Table,
        Id,
        ProductId,
        BalanceDate,
        OpeningQuantity,
        OpeningValue,
        AddedQuantity,
        AddedValue,
        SoldQuantity,
        SoldValue,
        ReturnedQuantity,
        ReturnedValue,
        TransferredInQuantity,
        TransferredInValue,
        TransferredOutQuantity,
        TransferredOutValue,
        ClosingQuantity,
        ClosingValue,
        ComputedAt,
    }
}

mod m20240101_000005_create_transfers_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_transfers_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Transfers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Transfers::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Transfers::TransferNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Transfers::TransferType).string().not_null())
                        .col(ColumnDef::new(Transfers::Status).string().not_null())
                        .col(ColumnDef::new(Transfers::SourceBranch).string().not_null())
                        .col(ColumnDef::new(Transfers::SourceCounter).string().null())
                        .col(ColumnDef::new(Transfers::SourceBox).string().null())
                        .col(
                            ColumnDef::new(Transfers::DestinationBranch)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Transfers::DestinationCounter)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(Transfers::DestinationBox).string().null())
                        .col(ColumnDef::new(Transfers::RequestedBy).string().not_null())
                        .col(ColumnDef::new(Transfers::ApprovedBy).string().null())
                        .col(ColumnDef::new(Transfers::CompletedBy).string().null())
                        .col(ColumnDef::new(Transfers::CancelledBy).string().null())
                        .col(ColumnDef::new(Transfers::RejectedBy).string().null())
                        .col(ColumnDef::new(Transfers::Reason).string().null())
                        .col(ColumnDef::new(Transfers::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Transfers::ApprovedAt).timestamp().null())
                        .col(ColumnDef::new(Transfers::CompletedAt).timestamp().null())
                        .col(ColumnDef::new(Transfers::CancelledAt).timestamp().null())
                        .col(ColumnDef::new(Transfers::RejectedAt).timestamp().null())
                        .col(ColumnDef::new(Transfers::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transfers_status")
                        .table(Transfers::Table)
                        .col(Transfers::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transfers_source_branch")
                        .table(Transfers::Table)
                        .col(Transfers::SourceBranch)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transfers_destination_branch")
                        .table(Transfers::Table)
                        .col(Transfers::DestinationBranch)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(TransferItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TransferItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(TransferItems::TransferId).uuid().not_null())
                        .col(ColumnDef::new(TransferItems::ProductId).uuid().not_null())
                        .col(ColumnDef::new(TransferItems::TagCode).string().null())
                        .col(ColumnDef::new(TransferItems::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(TransferItems::UnitPrice)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_transfer_items_transfer_id")
                                .from(TransferItems::Table, TransferItems::TransferId)
                                .to(Transfers::Table, Transfers::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transfer_items_transfer_id")
                        .table(TransferItems::Table)
                        .col(TransferItems::TransferId)
                        .to_owned(),
                )
                .await?;

            // Open-reservation lookups scan by product
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transfer_items_product_id")
                        .table(TransferItems::Table)
                        .col(TransferItems::ProductId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(TransferItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Transfers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Transfers {
        Table,
        Id,
        TransferNumber,
        TransferType,
        Status,
        SourceBranch,
        SourceCounter,
        SourceBox,
        DestinationBranch,
        DestinationCounter,
        DestinationBox,
        RequestedBy,
        ApprovedBy,
        CompletedBy,
        CancelledBy,
        RejectedBy,
        Reason,
        CreatedAt,
        ApprovedAt,
        CompletedAt,
        CancelledAt,
        RejectedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum TransferItems {
        Table,
        Id,
        TransferId,
        ProductId,
        TagCode,
        Quantity,
        UnitPrice,
    }
}
