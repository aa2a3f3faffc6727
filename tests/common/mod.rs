#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use tempfile::TempDir;
use tokio::sync::mpsc;
use uuid::Uuid;

use gemtrack::config::AppConfig;
use gemtrack::db::{self, DbConfig};
use gemtrack::entities::inventory_movement::MovementType;
use gemtrack::entities::{product, tag_assignment};
use gemtrack::events::Event;
use gemtrack::services::movements::NewMovement;
use gemtrack::tenant::TenantContext;
use gemtrack::AppServices;

/// Harness for one tenant backed by a throwaway sqlite store.
pub struct TestTenant {
    pub services: AppServices,
    pub ctx: TenantContext,
    #[allow(dead_code)]
    pub events: mpsc::Receiver<Event>,
    _dir: TempDir,
}

impl TestTenant {
    /// Fresh store with the full schema applied.
    pub async fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let db_path = dir.path().join("gemtrack_test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());

        let pool = db::establish_connection_with_config(&DbConfig {
            url: url.clone(),
            max_connections: 1,
            min_connections: 1,
            idle_timeout: Duration::from_secs(3600),
            ..Default::default()
        })
        .await
        .expect("connect");

        db::run_migrations(&pool).await.expect("migrate");

        let config = AppConfig::new(url, "test");
        let (services, events) = AppServices::build(config);
        let ctx = TenantContext::new("acme-jewels", Arc::new(pool));

        Self {
            services,
            ctx,
            events,
            _dir: dir,
        }
    }

    /// Inserts a catalog row the way the surrounding system would have.
    pub async fn seed_product(
        &self,
        sku: &str,
        unit_price: Decimal,
        category: Option<&str>,
        branch_code: &str,
        counter_code: Option<&str>,
    ) -> product::Model {
        let now = Utc::now();
        let row = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            sku: Set(sku.to_string()),
            name: Set(format!("Item {}", sku)),
            category: Set(category.map(str::to_string)),
            unit_price: Set(unit_price),
            branch_code: Set(branch_code.to_string()),
            counter_code: Set(counter_code.map(str::to_string)),
            box_code: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        row.insert(self.ctx.db()).await.expect("seed product")
    }

    /// Registers an active tag assignment for a product.
    pub async fn assign_tag(&self, tag_code: &str, product_id: Uuid) -> tag_assignment::Model {
        let row = tag_assignment::ActiveModel {
            id: Set(Uuid::new_v4()),
            tag_code: Set(tag_code.to_string()),
            product_id: Set(product_id),
            active: Set(true),
            assigned_at: Set(Utc::now()),
        };
        row.insert(self.ctx.db()).await.expect("assign tag")
    }

    /// Records an Addition entry dated `moved_at`, the usual way stock
    /// enters a branch in these tests.
    pub async fn add_stock(
        &self,
        product_id: Uuid,
        quantity: i32,
        unit_price: Decimal,
        moved_at: DateTime<Utc>,
    ) {
        self.services
            .movements
            .record_movement(
                &self.ctx,
                NewMovement {
                    moved_at: Some(moved_at),
                    unit_price: Some(unit_price),
                    ..movement(product_id, MovementType::Addition, quantity)
                },
            )
            .await
            .expect("add stock");
    }
}

/// Minimal movement input; tests override the fields they exercise.
pub fn movement(product_id: Uuid, movement_type: MovementType, quantity: i32) -> NewMovement {
    NewMovement {
        product_id: Some(product_id),
        tag_code: None,
        movement_type,
        quantity,
        unit_price: None,
        total_amount: None,
        branch_code: None,
        counter_code: None,
        category: None,
        reference_number: None,
        reference_type: None,
        remarks: None,
        moved_at: None,
    }
}

pub fn day(year: i32, month: u32, dayno: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, dayno).expect("valid date")
}

/// Noon UTC on the given date, safely inside the day's bounds.
pub fn at_noon(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(12, 0, 0).expect("valid time"))
}
