mod common;

use assert_matches::assert_matches;
use common::{at_noon, day, movement, TestTenant};
use rust_decimal_macros::dec;
use uuid::Uuid;

use gemtrack::entities::inventory_movement::MovementType;
use gemtrack::errors::ServiceError;
use gemtrack::services::movements::NewMovement;

#[tokio::test]
async fn snapshot_shortcut_agrees_with_full_replay() {
    let tenant = TestTenant::new().await;
    let product = tenant
        .seed_product("RING-200", dec!(100), None, "BR-01", None)
        .await;

    let d1 = day(2025, 6, 1);
    let d2 = day(2025, 6, 2);

    // Ledger before the snapshot...
    tenant.add_stock(product.id, 10, dec!(100), at_noon(d1)).await;
    tenant
        .services
        .movements
        .record_movement(
            &tenant.ctx,
            NewMovement {
                moved_at: Some(at_noon(d1)),
                ..movement(product.id, MovementType::Sale, 2)
            },
        )
        .await
        .unwrap();
    tenant
        .services
        .balances
        .calculate_daily_balance(&tenant.ctx, product.id, d1)
        .await
        .unwrap();

    // ...and a tail recorded after it.
    tenant
        .services
        .movements
        .record_movement(
            &tenant.ctx,
            NewMovement {
                moved_at: Some(at_noon(d2)),
                ..movement(product.id, MovementType::Sale, 1)
            },
        )
        .await
        .unwrap();
    tenant.add_stock(product.id, 3, dec!(100), at_noon(d2)).await;

    let shortcut = tenant
        .services
        .stock
        .current_position(&tenant.ctx, product.id)
        .await
        .unwrap();
    let replay = tenant
        .services
        .stock
        .position_from_ledger(&tenant.ctx, product.id)
        .await
        .unwrap();

    assert_eq!(shortcut, replay);
    assert_eq!(shortcut.quantity, 10);
    assert_eq!(shortcut.value, dec!(1000));
}

#[tokio::test]
async fn positions_without_snapshots_come_from_the_ledger() {
    let tenant = TestTenant::new().await;
    let product = tenant
        .seed_product("RING-201", dec!(100), None, "BR-01", None)
        .await;

    tenant
        .add_stock(product.id, 4, dec!(100), at_noon(day(2025, 6, 1)))
        .await;

    let position = tenant
        .services
        .stock
        .current_position(&tenant.ctx, product.id)
        .await
        .unwrap();
    assert_eq!(position.quantity, 4);
    assert_eq!(position.value, dec!(400));
}

#[tokio::test]
async fn branch_and_counter_positions_follow_entry_locations() {
    let tenant = TestTenant::new().await;
    let product = tenant
        .seed_product("RING-202", dec!(100), None, "BR-01", Some("C1"))
        .await;

    let d = day(2025, 6, 1);
    tenant.add_stock(product.id, 6, dec!(100), at_noon(d)).await;
    tenant
        .services
        .movements
        .record_movement(
            &tenant.ctx,
            NewMovement {
                branch_code: Some("BR-02".to_string()),
                counter_code: Some("C9".to_string()),
                moved_at: Some(at_noon(d)),
                ..movement(product.id, MovementType::TransferIn, 2)
            },
        )
        .await
        .unwrap();

    let br1 = tenant
        .services
        .stock
        .branch_position(&tenant.ctx, product.id, "BR-01")
        .await
        .unwrap();
    let br2 = tenant
        .services
        .stock
        .branch_position(&tenant.ctx, product.id, "BR-02")
        .await
        .unwrap();
    let c1 = tenant
        .services
        .stock
        .counter_position(&tenant.ctx, product.id, "C1")
        .await
        .unwrap();

    assert_eq!(br1.quantity, 6);
    assert_eq!(br2.quantity, 2);
    assert_eq!(c1.quantity, 6);

    let overall = tenant
        .services
        .stock
        .current_position(&tenant.ctx, product.id)
        .await
        .unwrap();
    assert_eq!(overall.quantity, br1.quantity + br2.quantity);
}

#[tokio::test]
async fn category_totals_span_products() {
    let tenant = TestTenant::new().await;
    let ring_a = tenant
        .seed_product("RING-203", dec!(100), Some("rings"), "BR-01", None)
        .await;
    let ring_b = tenant
        .seed_product("RING-204", dec!(150), Some("rings"), "BR-01", None)
        .await;
    let neck = tenant
        .seed_product("NECK-200", dec!(300), Some("necklaces"), "BR-01", None)
        .await;

    let d = day(2025, 6, 1);
    tenant.add_stock(ring_a.id, 2, dec!(100), at_noon(d)).await;
    tenant.add_stock(ring_b.id, 1, dec!(150), at_noon(d)).await;
    tenant.add_stock(neck.id, 5, dec!(300), at_noon(d)).await;

    let rings = tenant
        .services
        .stock
        .category_total(&tenant.ctx, "rings")
        .await
        .unwrap();
    assert_eq!(rings.quantity, 3);
    assert_eq!(rings.value, dec!(350));
}

#[tokio::test]
async fn unknown_product_fails_not_found() {
    let tenant = TestTenant::new().await;

    let err = tenant
        .services
        .stock
        .current_position(&tenant.ctx, Uuid::new_v4())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}
