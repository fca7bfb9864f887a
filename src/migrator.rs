use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_stock_records_table::Migration),
            Box::new(m20240101_000002_create_inventory_log_table::Migration),
            Box::new(m20240101_000003_create_inbound_tables::Migration),
            Box::new(m20240101_000004_create_outbound_tables::Migration),
            Box::new(m20240101_000005_create_stock_moves_table::Migration),
            Box::new(m20240101_000006_create_stock_taking_tables::Migration),
            Box::new(m20240101_000007_create_picking_tables::Migration),
            Box::new(m20240101_000008_create_stock_snapshots_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240101_000001_create_stock_records_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_stock_records_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockRecords::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockRecords::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockRecords::WarehouseId).uuid().not_null())
                        .col(ColumnDef::new(StockRecords::GoodsId).uuid().not_null())
                        .col(ColumnDef::new(StockRecords::LocationId).uuid().not_null())
                        .col(ColumnDef::new(StockRecords::BatchNo).string().not_null())
                        .col(
                            ColumnDef::new(StockRecords::Quantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(StockRecords::LockQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(StockRecords::ExpireDate).date())
                        .col(
                            ColumnDef::new(StockRecords::Version)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(StockRecords::UpdatedBy).string())
                        .col(
                            ColumnDef::new(StockRecords::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockRecords::UpdatedAt).timestamp())
                        .to_owned(),
                )
                .await?;

            // One row per stock key; the store relies on this to upsert safely.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uidx_stock_records_key")
                        .table(StockRecords::Table)
                        .col(StockRecords::WarehouseId)
                        .col(StockRecords::GoodsId)
                        .col(StockRecords::LocationId)
                        .col(StockRecords::BatchNo)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_records_expire_date")
                        .table(StockRecords::Table)
                        .col(StockRecords::ExpireDate)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockRecords::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum StockRecords {
        Table,
        Id,
        WarehouseId,
        GoodsId,
        LocationId,
        BatchNo,
        Quantity,
        LockQuantity,
        ExpireDate,
        Version,
        UpdatedBy,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_inventory_log_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_inventory_log_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(InventoryLog::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryLog::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryLog::WarehouseId).uuid().not_null())
                        .col(ColumnDef::new(InventoryLog::GoodsId).uuid().not_null())
                        .col(ColumnDef::new(InventoryLog::LocationId).uuid().not_null())
                        .col(ColumnDef::new(InventoryLog::BatchNo).string().not_null())
                        .col(
                            ColumnDef::new(InventoryLog::OperationType)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryLog::BusinessType)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryLog::BusinessNo).string().not_null())
                        .col(
                            ColumnDef::new(InventoryLog::BusinessLine)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryLog::QuantityBefore)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryLog::QuantityChange)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryLog::QuantityAfter)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryLog::Operator).string().not_null())
                        .col(
                            ColumnDef::new(InventoryLog::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // Idempotency guard: one posting per (operation, business ref, key).
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uidx_inventory_log_posting")
                        .table(InventoryLog::Table)
                        .col(InventoryLog::OperationType)
                        .col(InventoryLog::BusinessNo)
                        .col(InventoryLog::BusinessLine)
                        .col(InventoryLog::WarehouseId)
                        .col(InventoryLog::GoodsId)
                        .col(InventoryLog::LocationId)
                        .col(InventoryLog::BatchNo)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_log_key")
                        .table(InventoryLog::Table)
                        .col(InventoryLog::WarehouseId)
                        .col(InventoryLog::GoodsId)
                        .col(InventoryLog::LocationId)
                        .col(InventoryLog::BatchNo)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_log_business_no")
                        .table(InventoryLog::Table)
                        .col(InventoryLog::BusinessNo)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_log_created_at")
                        .table(InventoryLog::Table)
                        .col(InventoryLog::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(InventoryLog::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum InventoryLog {
        Table,
        Id,
        WarehouseId,
        GoodsId,
        LocationId,
        BatchNo,
        OperationType,
        BusinessType,
        BusinessNo,
        BusinessLine,
        QuantityBefore,
        QuantityChange,
        QuantityAfter,
        Operator,
        CreatedAt,
    }
}

mod m20240101_000003_create_inbound_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_inbound_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(InboundOrders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InboundOrders::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InboundOrders::InboundNo)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(InboundOrders::WarehouseId).uuid().not_null())
                        .col(ColumnDef::new(InboundOrders::SupplierId).uuid())
                        .col(ColumnDef::new(InboundOrders::Status).string().not_null())
                        .col(ColumnDef::new(InboundOrders::Remark).string())
                        .col(ColumnDef::new(InboundOrders::CreatedBy).string().not_null())
                        .col(
                            ColumnDef::new(InboundOrders::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InboundOrders::UpdatedBy).string())
                        .col(ColumnDef::new(InboundOrders::UpdatedAt).timestamp())
                        .col(ColumnDef::new(InboundOrders::DeletedAt).timestamp())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inbound_orders_status")
                        .table(InboundOrders::Table)
                        .col(InboundOrders::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(InboundItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InboundItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InboundItems::InboundId).uuid().not_null())
                        .col(ColumnDef::new(InboundItems::LineNo).integer().not_null())
                        .col(ColumnDef::new(InboundItems::GoodsId).uuid().not_null())
                        .col(ColumnDef::new(InboundItems::LocationId).uuid().not_null())
                        .col(ColumnDef::new(InboundItems::BatchNo).string().not_null())
                        .col(ColumnDef::new(InboundItems::ExpireDate).date())
                        .col(
                            ColumnDef::new(InboundItems::PlanQuantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InboundItems::ReceivedQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(InboundItems::QualifiedQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(InboundItems::UnqualifiedQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(InboundItems::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InboundItems::UpdatedAt).timestamp())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inbound_items_inbound_id")
                        .table(InboundItems::Table)
                        .col(InboundItems::InboundId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(InboundItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(InboundOrders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum InboundOrders {
        Table,
        Id,
        InboundNo,
        WarehouseId,
        SupplierId,
        Status,
        Remark,
        CreatedBy,
        CreatedAt,
        UpdatedBy,
        UpdatedAt,
        DeletedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum InboundItems {
        Table,
        Id,
        InboundId,
        LineNo,
        GoodsId,
        LocationId,
        BatchNo,
        ExpireDate,
        PlanQuantity,
        ReceivedQuantity,
        QualifiedQuantity,
        UnqualifiedQuantity,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000004_create_outbound_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_outbound_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(OutboundOrders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OutboundOrders::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OutboundOrders::OutboundNo)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(OutboundOrders::WarehouseId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OutboundOrders::CustomerId).uuid())
                        .col(ColumnDef::new(OutboundOrders::Status).string().not_null())
                        .col(ColumnDef::new(OutboundOrders::WaveId).uuid())
                        .col(ColumnDef::new(OutboundOrders::Remark).string())
                        .col(
                            ColumnDef::new(OutboundOrders::CreatedBy)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OutboundOrders::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OutboundOrders::UpdatedBy).string())
                        .col(ColumnDef::new(OutboundOrders::UpdatedAt).timestamp())
                        .col(ColumnDef::new(OutboundOrders::DeletedAt).timestamp())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_outbound_orders_status")
                        .table(OutboundOrders::Table)
                        .col(OutboundOrders::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_outbound_orders_wave_id")
                        .table(OutboundOrders::Table)
                        .col(OutboundOrders::WaveId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OutboundItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OutboundItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OutboundItems::OutboundId).uuid().not_null())
                        .col(ColumnDef::new(OutboundItems::LineNo).integer().not_null())
                        .col(ColumnDef::new(OutboundItems::GoodsId).uuid().not_null())
                        .col(ColumnDef::new(OutboundItems::LocationId).uuid().not_null())
                        .col(ColumnDef::new(OutboundItems::BatchNo).string().not_null())
                        .col(
                            ColumnDef::new(OutboundItems::PlanQuantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OutboundItems::PickedQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(OutboundItems::ShippedQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(OutboundItems::ReservedQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(OutboundItems::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OutboundItems::UpdatedAt).timestamp())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_outbound_items_outbound_id")
                        .table(OutboundItems::Table)
                        .col(OutboundItems::OutboundId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OutboundItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(OutboundOrders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum OutboundOrders {
        Table,
        Id,
        OutboundNo,
        WarehouseId,
        CustomerId,
        Status,
        WaveId,
        Remark,
        CreatedBy,
        CreatedAt,
        UpdatedBy,
        UpdatedAt,
        DeletedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum OutboundItems {
        Table,
        Id,
        OutboundId,
        LineNo,
        GoodsId,
        LocationId,
        BatchNo,
        PlanQuantity,
        PickedQuantity,
        ShippedQuantity,
        ReservedQuantity,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000005_create_stock_moves_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_stock_moves_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockMoves::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockMoves::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockMoves::MoveNo)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(StockMoves::WarehouseId).uuid().not_null())
                        .col(ColumnDef::new(StockMoves::GoodsId).uuid().not_null())
                        .col(ColumnDef::new(StockMoves::BatchNo).string().not_null())
                        .col(
                            ColumnDef::new(StockMoves::FromLocationId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockMoves::ToLocationId).uuid().not_null())
                        .col(ColumnDef::new(StockMoves::Quantity).integer().not_null())
                        .col(ColumnDef::new(StockMoves::Status).string().not_null())
                        .col(ColumnDef::new(StockMoves::Remark).string())
                        .col(ColumnDef::new(StockMoves::CreatedBy).string().not_null())
                        .col(
                            ColumnDef::new(StockMoves::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockMoves::UpdatedBy).string())
                        .col(ColumnDef::new(StockMoves::UpdatedAt).timestamp())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_moves_status")
                        .table(StockMoves::Table)
                        .col(StockMoves::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockMoves::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum StockMoves {
        Table,
        Id,
        MoveNo,
        WarehouseId,
        GoodsId,
        BatchNo,
        FromLocationId,
        ToLocationId,
        Quantity,
        Status,
        Remark,
        CreatedBy,
        CreatedAt,
        UpdatedBy,
        UpdatedAt,
    }
}

mod m20240101_000006_create_stock_taking_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000006_create_stock_taking_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockTakingPlans::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockTakingPlans::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTakingPlans::PlanNo)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(StockTakingPlans::WarehouseId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockTakingPlans::LocationId).uuid())
                        .col(ColumnDef::new(StockTakingPlans::GoodsId).uuid())
                        .col(
                            ColumnDef::new(StockTakingPlans::Status)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTakingPlans::LineCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(StockTakingPlans::CompletedCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(StockTakingPlans::DiffCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(StockTakingPlans::Remark).string())
                        .col(
                            ColumnDef::new(StockTakingPlans::CreatedBy)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTakingPlans::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockTakingPlans::UpdatedBy).string())
                        .col(ColumnDef::new(StockTakingPlans::UpdatedAt).timestamp())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(StockTakingLines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockTakingLines::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockTakingLines::PlanId).uuid().not_null())
                        .col(
                            ColumnDef::new(StockTakingLines::WarehouseId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockTakingLines::GoodsId).uuid().not_null())
                        .col(
                            ColumnDef::new(StockTakingLines::LocationId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTakingLines::BatchNo)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTakingLines::BookQuantity)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockTakingLines::ActualQuantity).integer())
                        .col(
                            ColumnDef::new(StockTakingLines::Status)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockTakingLines::CountedBy).string())
                        .col(ColumnDef::new(StockTakingLines::ReviewedBy).string())
                        .col(
                            ColumnDef::new(StockTakingLines::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockTakingLines::UpdatedAt).timestamp())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_taking_lines_plan_id")
                        .table(StockTakingLines::Table)
                        .col(StockTakingLines::PlanId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockTakingLines::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(StockTakingPlans::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum StockTakingPlans {
        Table,
        Id,
        PlanNo,
        WarehouseId,
        LocationId,
        GoodsId,
        Status,
        LineCount,
        CompletedCount,
        DiffCount,
        Remark,
        CreatedBy,
        CreatedAt,
        UpdatedBy,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum StockTakingLines {
        Table,
        Id,
        PlanId,
        WarehouseId,
        GoodsId,
        LocationId,
        BatchNo,
        BookQuantity,
        ActualQuantity,
        Status,
        CountedBy,
        ReviewedBy,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000007_create_picking_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000007_create_picking_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PickingWaves::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PickingWaves::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PickingWaves::WaveNo)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(PickingWaves::WarehouseId).uuid().not_null())
                        .col(ColumnDef::new(PickingWaves::Status).string().not_null())
                        .col(
                            ColumnDef::new(PickingWaves::OrderCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(PickingWaves::TaskCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(PickingWaves::CreatedBy).string().not_null())
                        .col(
                            ColumnDef::new(PickingWaves::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PickingWaves::UpdatedBy).string())
                        .col(ColumnDef::new(PickingWaves::UpdatedAt).timestamp())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PickingTasks::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PickingTasks::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PickingTasks::WaveId).uuid().not_null())
                        .col(ColumnDef::new(PickingTasks::WarehouseId).uuid().not_null())
                        .col(ColumnDef::new(PickingTasks::GoodsId).uuid().not_null())
                        .col(ColumnDef::new(PickingTasks::LocationId).uuid().not_null())
                        .col(ColumnDef::new(PickingTasks::BatchNo).string().not_null())
                        .col(
                            ColumnDef::new(PickingTasks::RequiredQuantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PickingTasks::PickedQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(PickingTasks::Status).string().not_null())
                        .col(ColumnDef::new(PickingTasks::PickedBy).string())
                        .col(
                            ColumnDef::new(PickingTasks::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PickingTasks::UpdatedAt).timestamp())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_picking_tasks_wave_id")
                        .table(PickingTasks::Table)
                        .col(PickingTasks::WaveId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PickingTasks::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PickingWaves::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum PickingWaves {
        Table,
        Id,
        WaveNo,
        WarehouseId,
        Status,
        OrderCount,
        TaskCount,
        CreatedBy,
        CreatedAt,
        UpdatedBy,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum PickingTasks {
        Table,
        Id,
        WaveId,
        WarehouseId,
        GoodsId,
        LocationId,
        BatchNo,
        RequiredQuantity,
        PickedQuantity,
        Status,
        PickedBy,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000008_create_stock_snapshots_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000008_create_stock_snapshots_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockSnapshots::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockSnapshots::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockSnapshots::SnapshotDate)
                                .date()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockSnapshots::WarehouseId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockSnapshots::GoodsId).uuid().not_null())
                        .col(
                            ColumnDef::new(StockSnapshots::LocationId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockSnapshots::BatchNo).string().not_null())
                        .col(
                            ColumnDef::new(StockSnapshots::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockSnapshots::LockQuantity)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockSnapshots::ExpireDate).date())
                        .col(
                            ColumnDef::new(StockSnapshots::CreatedAt)
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
                        .name("idx_stock_snapshots_date")
                        .table(StockSnapshots::Table)
                        .col(StockSnapshots::SnapshotDate)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockSnapshots::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum StockSnapshots {
        Table,
        Id,
        SnapshotDate,
        WarehouseId,
        GoodsId,
        LocationId,
        BatchNo,
        Quantity,
        LockQuantity,
        ExpireDate,
        CreatedAt,
    }
}
