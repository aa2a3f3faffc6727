mod common;

use assert_matches::assert_matches;
use common::{at_noon, day, movement, TestTenant};
use rust_decimal_macros::dec;
use uuid::Uuid;

use gemtrack::entities::inventory_movement::MovementType;
use gemtrack::errors::ServiceError;
use gemtrack::services::movements::{MovementFilter, NewMovement};

#[tokio::test]
async fn record_movement_fills_defaults_from_catalog() {
    let tenant = TestTenant::new().await;
    let product = tenant
        .seed_product("RING-001", dec!(100), Some("rings"), "BR-01", Some("C1"))
        .await;

    let recorded = tenant
        .services
        .movements
        .record_movement(&tenant.ctx, movement(product.id, MovementType::Sale, 2))
        .await
        .unwrap();

    assert_eq!(recorded.unit_price, dec!(100));
    assert_eq!(recorded.total_amount, dec!(200));
    assert_eq!(recorded.branch_code, "BR-01");
    assert_eq!(recorded.counter_code.as_deref(), Some("C1"));
    assert_eq!(recorded.category.as_deref(), Some("rings"));
    assert_eq!(recorded.movement_type, "sale");
}

#[tokio::test]
async fn supplied_price_and_total_win_over_defaults() {
    let tenant = TestTenant::new().await;
    let product = tenant
        .seed_product("RING-002", dec!(100), None, "BR-01", None)
        .await;

    let recorded = tenant
        .services
        .movements
        .record_movement(
            &tenant.ctx,
            NewMovement {
                unit_price: Some(dec!(90)),
                total_amount: Some(dec!(175)),
                ..movement(product.id, MovementType::Return, 2)
            },
        )
        .await
        .unwrap();

    assert_eq!(recorded.unit_price, dec!(90));
    assert_eq!(recorded.total_amount, dec!(175));
}

#[tokio::test]
async fn tag_code_resolves_to_its_product() {
    let tenant = TestTenant::new().await;
    let product = tenant
        .seed_product("NECK-001", dec!(250), None, "BR-01", None)
        .await;
    tenant.assign_tag("E2000017221101441890", product.id).await;

    let recorded = tenant
        .services
        .movements
        .record_movement(
            &tenant.ctx,
            NewMovement {
                product_id: None,
                tag_code: Some("E2000017221101441890".to_string()),
                ..movement(product.id, MovementType::Addition, 1)
            },
        )
        .await
        .unwrap();

    assert_eq!(recorded.product_id, product.id);
    assert_eq!(recorded.tag_code.as_deref(), Some("E2000017221101441890"));
}

#[tokio::test]
async fn unknown_product_and_tag_are_not_found() {
    let tenant = TestTenant::new().await;

    let err = tenant
        .services
        .movements
        .record_movement(
            &tenant.ctx,
            movement(Uuid::new_v4(), MovementType::Sale, 1),
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    let err = tenant
        .services
        .movements
        .record_movement(
            &tenant.ctx,
            NewMovement {
                product_id: None,
                tag_code: Some("NO-SUCH-TAG".to_string()),
                ..movement(Uuid::new_v4(), MovementType::Sale, 1)
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn zero_quantity_is_rejected() {
    let tenant = TestTenant::new().await;
    let product = tenant
        .seed_product("RING-003", dec!(100), None, "BR-01", None)
        .await;

    let err = tenant
        .services
        .movements
        .record_movement(&tenant.ctx, movement(product.id, MovementType::Sale, 0))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn missing_product_and_tag_is_rejected() {
    let tenant = TestTenant::new().await;

    let err = tenant
        .services
        .movements
        .record_movement(
            &tenant.ctx,
            NewMovement {
                product_id: None,
                tag_code: None,
                ..movement(Uuid::new_v4(), MovementType::Sale, 1)
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn bulk_record_continues_past_bad_entries() {
    let tenant = TestTenant::new().await;
    let product = tenant
        .seed_product("RING-004", dec!(100), None, "BR-01", None)
        .await;

    let outcome = tenant
        .services
        .movements
        .record_movements(
            &tenant.ctx,
            vec![
                movement(product.id, MovementType::Addition, 5),
                movement(product.id, MovementType::Sale, 0), // invalid
                movement(product.id, MovementType::Sale, 1),
            ],
        )
        .await
        .unwrap();

    assert_eq!(outcome.recorded.len(), 2);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].index, 1);

    let (entries, total) = tenant
        .services
        .movements
        .list_movements(&tenant.ctx, MovementFilter::default(), 1, 100)
        .await
        .unwrap();
    assert_eq!(total, 2);
    assert_eq!(entries.len(), 2);
}

#[tokio::test]
async fn bulk_record_rejects_oversized_batches() {
    let tenant = TestTenant::new().await;
    let product = tenant
        .seed_product("RING-005", dec!(100), None, "BR-01", None)
        .await;

    let batch: Vec<_> = (0..101)
        .map(|_| movement(product.id, MovementType::Addition, 1))
        .collect();

    let err = tenant
        .services
        .movements
        .record_movements(&tenant.ctx, batch)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn best_effort_recording_never_propagates() {
    let tenant = TestTenant::new().await;

    // Unknown product: would be NotFound on the strict path.
    tenant
        .services
        .movements
        .record_movement_best_effort(
            &tenant.ctx,
            movement(Uuid::new_v4(), MovementType::Adjustment, 1),
        )
        .await;

    let (_, total) = tenant
        .services
        .movements
        .list_movements(&tenant.ctx, MovementFilter::default(), 1, 10)
        .await
        .unwrap();
    assert_eq!(total, 0);
}

#[tokio::test]
async fn listing_filters_by_branch_and_type() {
    let tenant = TestTenant::new().await;
    let ring = tenant
        .seed_product("RING-006", dec!(100), None, "BR-01", None)
        .await;
    let neck = tenant
        .seed_product("NECK-002", dec!(300), None, "BR-02", None)
        .await;

    let d = day(2025, 6, 1);
    tenant.add_stock(ring.id, 5, dec!(100), at_noon(d)).await;
    tenant.add_stock(neck.id, 2, dec!(300), at_noon(d)).await;
    tenant
        .services
        .movements
        .record_movement(&tenant.ctx, movement(ring.id, MovementType::Sale, 1))
        .await
        .unwrap();

    let (entries, total) = tenant
        .services
        .movements
        .list_movements(
            &tenant.ctx,
            MovementFilter {
                branch_code: Some("BR-02".to_string()),
                ..Default::default()
            },
            1,
            10,
        )
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(entries[0].product_id, neck.id);

    let (entries, total) = tenant
        .services
        .movements
        .list_movements(
            &tenant.ctx,
            MovementFilter {
                movement_type: Some(MovementType::Sale),
                ..Default::default()
            },
            1,
            10,
        )
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(entries[0].product_id, ring.id);

    let err = tenant
        .services
        .movements
        .list_movements(&tenant.ctx, MovementFilter::default(), 0, 10)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn movements_for_product_on_respects_day_bounds() {
    let tenant = TestTenant::new().await;
    let product = tenant
        .seed_product("RING-007", dec!(100), None, "BR-01", None)
        .await;

    let d1 = day(2025, 6, 1);
    let d2 = day(2025, 6, 2);
    tenant.add_stock(product.id, 3, dec!(100), at_noon(d1)).await;
    tenant.add_stock(product.id, 4, dec!(100), at_noon(d2)).await;

    let on_d1 = tenant
        .services
        .movements
        .movements_for_product_on(&tenant.ctx, product.id, d1)
        .await
        .unwrap();
    assert_eq!(on_d1.len(), 1);
    assert_eq!(on_d1[0].quantity, 3);
}
