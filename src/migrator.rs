use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20241001_000001_create_inventory_tables::Migration),
            Box::new(m20241001_000002_create_production_tables::Migration),
            Box::new(m20241001_000003_create_stock_reservations_table::Migration),
            Box::new(m20241001_000004_create_audit_and_notification_tables::Migration),
            Box::new(m20241001_000005_create_customer_order_tables::Migration),
        ]
    }
}

mod m20241001_000001_create_inventory_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20241001_000001_create_inventory_tables"
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
                        .col(
                            ColumnDef::new(Products::Unit)
                                .string()
                                .not_null()
                                .default("pcs"),
                        )
                        .col(
                            ColumnDef::new(Products::CurrentStock)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::MinStock)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Products::UnitCost).decimal_len(12, 2).null())
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(StockTransactions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockTransactions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockTransactions::ProductId).uuid().not_null())
                        .col(
                            ColumnDef::new(StockTransactions::TransactionType)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransactions::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransactions::PreviousQuantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransactions::NewQuantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransactions::ReferenceType)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(StockTransactions::ReferenceId).uuid().null())
                        .col(ColumnDef::new(StockTransactions::Note).text().null())
                        .col(ColumnDef::new(StockTransactions::CreatedBy).uuid().null())
                        .col(
                            ColumnDef::new(StockTransactions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_transactions_product")
                                .from(StockTransactions::Table, StockTransactions::ProductId)
                                .to(Products::Table, Products::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_transactions_product_id")
                        .table(StockTransactions::Table)
                        .col(StockTransactions::ProductId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockTransactions::Table).to_owned())
                .await?;
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
        Unit,
        CurrentStock,
        MinStock,
        UnitCost,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum StockTransactions {
        Table,
        Id,
        ProductId,
        TransactionType,
        Quantity,
        PreviousQuantity,
        NewQuantity,
        ReferenceType,
        ReferenceId,
        Note,
        CreatedBy,
        CreatedAt,
    }
}

mod m20241001_000002_create_production_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20241001_000002_create_production_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ProductionJobs::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductionJobs::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionJobs::JobNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(ProductionJobs::OrderId).uuid().null())
                        .col(ColumnDef::new(ProductionJobs::ProductSku).string().null())
                        .col(ColumnDef::new(ProductionJobs::Title).string().not_null())
                        .col(ColumnDef::new(ProductionJobs::GarmentType).string().null())
                        .col(ColumnDef::new(ProductionJobs::PrintMethod).string().null())
                        .col(ColumnDef::new(ProductionJobs::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(ProductionJobs::ProducedQty)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ProductionJobs::PassedQty)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ProductionJobs::FailedQty)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(ProductionJobs::Status).string().not_null())
                        .col(ColumnDef::new(ProductionJobs::Priority).string().not_null())
                        .col(
                            ColumnDef::new(ProductionJobs::ProgressPercent)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(ProductionJobs::DueDate).date().null())
                        .col(ColumnDef::new(ProductionJobs::AssignedTo).string().null())
                        .col(
                            ColumnDef::new(ProductionJobs::StartedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProductionJobs::CompletedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProductionJobs::IsRework)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(ProductionJobs::ReworkOf).uuid().null())
                        .col(
                            ColumnDef::new(ProductionJobs::ReworkCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(ProductionJobs::ReworkReason).text().null())
                        .col(ColumnDef::new(ProductionJobs::Notes).text().null())
                        .col(ColumnDef::new(ProductionJobs::CreatedBy).uuid().null())
                        .col(
                            ColumnDef::new(ProductionJobs::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionJobs::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_production_jobs_status")
                        .table(ProductionJobs::Table)
                        .col(ProductionJobs::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductionJobLogs::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductionJobLogs::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductionJobLogs::JobId).uuid().not_null())
                        .col(ColumnDef::new(ProductionJobLogs::FromStatus).string().null())
                        .col(
                            ColumnDef::new(ProductionJobLogs::ToStatus)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductionJobLogs::Note).text().null())
                        .col(ColumnDef::new(ProductionJobLogs::ActorId).uuid().null())
                        .col(ColumnDef::new(ProductionJobLogs::ActorName).string().null())
                        .col(
                            ColumnDef::new(ProductionJobLogs::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_production_job_logs_job")
                                .from(ProductionJobLogs::Table, ProductionJobLogs::JobId)
                                .to(ProductionJobs::Table, ProductionJobs::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(QcRecords::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(QcRecords::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(QcRecords::JobId).uuid().not_null())
                        .col(ColumnDef::new(QcRecords::Checkpoint).string().not_null())
                        .col(ColumnDef::new(QcRecords::Passed).boolean().not_null())
                        .col(ColumnDef::new(QcRecords::Note).text().null())
                        .col(ColumnDef::new(QcRecords::InspectorId).uuid().null())
                        .col(ColumnDef::new(QcRecords::InspectorName).string().null())
                        .col(
                            ColumnDef::new(QcRecords::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_qc_records_job")
                                .from(QcRecords::Table, QcRecords::JobId)
                                .to(ProductionJobs::Table, ProductionJobs::Id),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(QcRecords::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProductionJobLogs::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProductionJobs::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum ProductionJobs {
        Table,
        Id,
        JobNumber,
        OrderId,
        ProductSku,
        Title,
        GarmentType,
        PrintMethod,
        Quantity,
        ProducedQty,
        PassedQty,
        FailedQty,
        Status,
        Priority,
        ProgressPercent,
        DueDate,
        AssignedTo,
        StartedAt,
        CompletedAt,
        IsRework,
        ReworkOf,
        ReworkCount,
        ReworkReason,
        Notes,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum ProductionJobLogs {
        Table,
        Id,
        JobId,
        FromStatus,
        ToStatus,
        Note,
        ActorId,
        ActorName,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum QcRecords {
        Table,
        Id,
        JobId,
        Checkpoint,
        Passed,
        Note,
        InspectorId,
        InspectorName,
        CreatedAt,
    }
}

mod m20241001_000003_create_stock_reservations_table {

    use super::m20241001_000001_create_inventory_tables::Products;
    use super::m20241001_000002_create_production_tables::ProductionJobs;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20241001_000003_create_stock_reservations_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockReservations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockReservations::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockReservations::JobId).uuid().not_null())
                        .col(ColumnDef::new(StockReservations::ProductId).uuid().not_null())
                        .col(
                            ColumnDef::new(StockReservations::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockReservations::Status).string().not_null())
                        .col(ColumnDef::new(StockReservations::ReservedBy).uuid().null())
                        .col(
                            ColumnDef::new(StockReservations::ReleasedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(StockReservations::UsedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(StockReservations::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockReservations::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_reservations_job")
                                .from(StockReservations::Table, StockReservations::JobId)
                                .to(ProductionJobs::Table, ProductionJobs::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_reservations_product")
                                .from(StockReservations::Table, StockReservations::ProductId)
                                .to(Products::Table, Products::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_reservations_product_status")
                        .table(StockReservations::Table)
                        .col(StockReservations::ProductId)
                        .col(StockReservations::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockReservations::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum StockReservations {
        Table,
        Id,
        JobId,
        ProductId,
        Quantity,
        Status,
        ReservedBy,
        ReleasedAt,
        UsedAt,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20241001_000004_create_audit_and_notification_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20241001_000004_create_audit_and_notification_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(AuditLogs::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(AuditLogs::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(AuditLogs::ActorId).uuid().null())
                        .col(ColumnDef::new(AuditLogs::ActorName).string().null())
                        .col(ColumnDef::new(AuditLogs::Action).string().not_null())
                        .col(ColumnDef::new(AuditLogs::EntityType).string().not_null())
                        .col(ColumnDef::new(AuditLogs::EntityId).uuid().not_null())
                        .col(ColumnDef::new(AuditLogs::OldData).json().null())
                        .col(ColumnDef::new(AuditLogs::NewData).json().null())
                        .col(ColumnDef::new(AuditLogs::RequestId).string().null())
                        .col(
                            ColumnDef::new(AuditLogs::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_audit_logs_entity")
                        .table(AuditLogs::Table)
                        .col(AuditLogs::EntityType)
                        .col(AuditLogs::EntityId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Notifications::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Notifications::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Notifications::Kind).string().not_null())
                        .col(ColumnDef::new(Notifications::Title).string().not_null())
                        .col(ColumnDef::new(Notifications::Message).text().not_null())
                        .col(ColumnDef::new(Notifications::EntityType).string().null())
                        .col(ColumnDef::new(Notifications::EntityId).uuid().null())
                        .col(
                            ColumnDef::new(Notifications::Read)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Notifications::Delivered)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Notifications::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Notifications::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(AuditLogs::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum AuditLogs {
        Table,
        Id,
        ActorId,
        ActorName,
        Action,
        EntityType,
        EntityId,
        OldData,
        NewData,
        RequestId,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Notifications {
        Table,
        Id,
        Kind,
        Title,
        Message,
        EntityType,
        EntityId,
        Read,
        Delivered,
        CreatedAt,
    }
}

mod m20241001_000005_create_customer_order_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20241001_000005_create_customer_order_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Customers::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Customers::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Customers::Name).string().not_null())
                        .col(ColumnDef::new(Customers::Phone).string().null())
                        .col(ColumnDef::new(Customers::Email).string().null())
                        .col(ColumnDef::new(Customers::Company).string().null())
                        .col(ColumnDef::new(Customers::Address).text().null())
                        .col(ColumnDef::new(Customers::Notes).text().null())
                        .col(
                            ColumnDef::new(Customers::Status)
                                .string()
                                .not_null()
                                .default("active"),
                        )
                        .col(
                            ColumnDef::new(Customers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Customers::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Orders::OrderNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Orders::CustomerId).uuid().not_null())
                        .col(ColumnDef::new(Orders::Status).string().not_null())
                        .col(
                            ColumnDef::new(Orders::Subtotal)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Orders::Discount)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Orders::TaxRate)
                                .decimal_len(6, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Orders::Tax)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Orders::Total)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Orders::DueDate).date().null())
                        .col(ColumnDef::new(Orders::Notes).text().null())
                        .col(ColumnDef::new(Orders::CreatedBy).uuid().null())
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_customer")
                                .from(Orders::Table, Orders::CustomerId)
                                .to(Customers::Table, Customers::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(OrderItems::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(OrderItems::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::Description).string().not_null())
                        .col(ColumnDef::new(OrderItems::GarmentType).string().null())
                        .col(ColumnDef::new(OrderItems::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(OrderItems::UnitPrice)
                                .decimal_len(12, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderItems::LineTotal)
                                .decimal_len(12, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_order")
                                .from(OrderItems::Table, OrderItems::OrderId)
                                .to(Orders::Table, Orders::Id),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Customers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Customers {
        Table,
        Id,
        Name,
        Phone,
        Email,
        Company,
        Address,
        Notes,
        Status,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
        OrderNumber,
        CustomerId,
        Status,
        Subtotal,
        Discount,
        TaxRate,
        Tax,
        Total,
        DueDate,
        Notes,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum OrderItems {
        Table,
        Id,
        OrderId,
        Description,
        GarmentType,
        Quantity,
        UnitPrice,
        LineTotal,
        CreatedAt,
    }
}
